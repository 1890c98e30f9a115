//! Read-only views of a task as returned to callers.
//!
//! All collections are ordered (insertion order or sorted), so serializing the same
//! unmodified task twice yields identical bytes.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::{ErrorRecord, Progress, ResultRecord, Task, TaskKind, TaskStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub task_id: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub progress: Progress,
    pub results_count: usize,
    pub errors_count: usize,
    pub produced_results: usize,
    pub produced_errors: usize,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Task> for StatusSnapshot {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            kind: task.kind,
            status: task.status,
            progress: task.progress,
            results_count: task.results.len(),
            errors_count: task.errors.len(),
            produced_results: task.produced.results,
            produced_errors: task.produced.errors,
            created_at: task.created_at,
            started_at: task.started_at,
            completed_at: task.completed_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResultsSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub processing: usize,
}

impl From<&Task> for ResultsSummary {
    fn from(task: &Task) -> Self {
        Self {
            total: task.urls.len(),
            completed: task.produced.results,
            failed: task.produced.errors,
            processing: task.currently_processing.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsSnapshot {
    pub task_id: String,
    pub status: TaskStatus,
    pub results: Vec<ResultRecord>,
    pub errors: Vec<ErrorRecord>,
    pub currently_processing: Vec<String>,
    pub summary: ResultsSummary,
}

impl From<&Task> for ResultsSnapshot {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            status: task.status,
            results: task.results.clone(),
            errors: task.errors.clone(),
            currently_processing: task.currently_processing.iter().cloned().collect(),
            summary: ResultsSummary::from(task),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RealtimeSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub processing: usize,
    pub remaining: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeSnapshot {
    pub task_id: String,
    pub status: TaskStatus,
    pub progress: Progress,
    pub recent_results: Vec<ResultRecord>,
    pub recent_errors: Vec<ErrorRecord>,
    pub currently_processing: Vec<String>,
    pub summary: RealtimeSummary,
}

impl RealtimeSnapshot {
    pub fn from_task(task: &Task, window: usize) -> Self {
        let base = ResultsSummary::from(task);
        let remaining = base
            .total
            .saturating_sub(base.completed + base.failed + base.processing);
        Self {
            task_id: task.id.clone(),
            status: task.status,
            progress: task.progress,
            recent_results: tail(&task.results, window),
            recent_errors: tail(&task.errors, window),
            currently_processing: task.currently_processing.iter().cloned().collect(),
            summary: RealtimeSummary {
                total: base.total,
                completed: base.completed,
                failed: base.failed,
                processing: base.processing,
                remaining,
            },
        }
    }
}

fn tail<T: Clone>(items: &[T], n: usize) -> Vec<T> {
    items[items.len().saturating_sub(n)..].to_vec()
}

/// Presence report for the task's AI configuration. Never includes the key itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigStatus {
    pub task_id: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub has_api_key: bool,
    pub api_key_length: usize,
    pub api_url: String,
    pub model_name: String,
    pub has_prompt_template: bool,
    pub prompt_template_length: usize,
}

impl From<&Task> for ConfigStatus {
    fn from(task: &Task) -> Self {
        let cfg = &task.ai_config;
        Self {
            task_id: task.id.clone(),
            kind: task.kind,
            has_api_key: cfg.has_api_key(),
            api_key_length: cfg.api_key.chars().count(),
            api_url: cfg.api_url.clone(),
            model_name: cfg.model_name.clone(),
            has_prompt_template: !cfg.prompt_template.trim().is_empty(),
            prompt_template_length: cfg.prompt_template.chars().count(),
        }
    }
}

/// Row in the task listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub task_id: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub progress: Progress,
    pub total_urls: usize,
    pub results_count: usize,
    pub errors_count: usize,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Task> for TaskSummary {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            kind: task.kind,
            status: task.status,
            progress: task.progress,
            total_urls: task.urls.len(),
            results_count: task.results.len(),
            errors_count: task.errors.len(),
            created_at: task.created_at,
            started_at: task.started_at,
            completed_at: task.completed_at,
        }
    }
}

/// Counts by status across the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistrySummary {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}
