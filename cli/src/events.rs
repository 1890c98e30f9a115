//! 任务事件日志

use prospector_core::api::TaskEvent;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

/// 订阅注册表事件并写入日志，直到通道关闭
pub fn spawn_event_logger(mut rx: broadcast::Receiver<TaskEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(target: "prospector.task", skipped, "event logger lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn log_event(event: &TaskEvent) {
    match event {
        TaskEvent::Created {
            task_id,
            kind,
            total_urls,
            ..
        } => {
            tracing::debug!(target: "prospector.task", "Task {} created ({}, {} urls)", task_id, kind, total_urls);
        }
        TaskEvent::UrlsAppended {
            task_id,
            added,
            total_urls,
            ..
        } => {
            tracing::debug!(target: "prospector.task", "Task {} +{} urls ({} total)", task_id, added, total_urls);
        }
        TaskEvent::Started { task_id, .. } => {
            tracing::debug!(target: "prospector.task", "Task {} started", task_id);
        }
        TaskEvent::Completed {
            task_id,
            results,
            errors,
            duration_ms,
            ..
        } => {
            tracing::info!(
                target: "prospector.task",
                "Task {} completed ({} results, {} errors, {}ms)",
                task_id,
                results,
                errors,
                duration_ms
            );
        }
        TaskEvent::Failed { task_id, error, .. } => {
            tracing::error!(target: "prospector.task", "Task {} failed: {}", task_id, error);
        }
        TaskEvent::Cancelled { task_id, .. } => {
            tracing::info!(target: "prospector.task", "Task {} cancelled", task_id);
        }
        TaskEvent::Swept {
            removed, remaining, ..
        } => {
            if *removed > 0 {
                tracing::debug!(target: "prospector.task", "Swept {} tasks ({} remaining)", removed, remaining);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_logger_exits_when_channel_closes() {
        let (tx, rx) = broadcast::channel(8);
        let handle = spawn_event_logger(rx);
        tx.send(TaskEvent::Started {
            task_id: "t1".into(),
            timestamp: Utc::now(),
        })
        .unwrap();
        drop(tx);
        handle.await.unwrap();
    }
}
