//! Periodic registry cleanup.

use chrono::Utc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::registry::TaskRegistry;

/// Sweeps `registry` every `interval` until `shutdown` fires or its sender is dropped.
pub fn spawn_sweeper(
    registry: TaskRegistry,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = registry.sweep(Utc::now()).await;
                    debug!(
                        target: "prospector.task",
                        removed = report.removed(),
                        remaining = report.remaining,
                        "periodic sweep"
                    );
                }
                _ = shutdown.recv() => {
                    info!(target: "prospector.task", "sweeper stopped");
                    break;
                }
            }
        }
    })
}
