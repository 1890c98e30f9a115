//! 任务事件定义

use chrono::{DateTime, Utc};

use super::types::TaskKind;

/// 任务事件（通过 broadcast 通道分发）
#[derive(Debug, Clone)]
pub enum TaskEvent {
    Created {
        task_id: String,
        kind: TaskKind,
        total_urls: usize,
        timestamp: DateTime<Utc>,
    },
    UrlsAppended {
        task_id: String,
        added: usize,
        total_urls: usize,
        timestamp: DateTime<Utc>,
    },
    Started {
        task_id: String,
        timestamp: DateTime<Utc>,
    },
    Completed {
        task_id: String,
        results: usize,
        errors: usize,
        duration_ms: i64,
        timestamp: DateTime<Utc>,
    },
    Failed {
        task_id: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
    Cancelled {
        task_id: String,
        timestamp: DateTime<Utc>,
    },
    Swept {
        removed: usize,
        remaining: usize,
        timestamp: DateTime<Utc>,
    },
}
