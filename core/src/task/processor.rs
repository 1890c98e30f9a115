//! Background batch processor.
//!
//! Drives one task from `running` to a terminal state: URLs are read from the registry
//! in batches, each batch runs under a concurrency cap, and the loop re-reads the URL
//! count before finishing so URLs merged in mid-run are still processed.

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::abort::AbortSignal;
use super::registry::{FinishOutcome, TaskRegistry};
use super::types::{ErrorRecord, ExtractedSummary, ResultRecord, TaskKind};
use crate::classify::AiConfig;
use crate::config::{AppConfig, MemoryPressureConfig, TaskConfig};
use crate::error::{ClassifyError, Stage, TaskError};
use crate::pipeline::{SiteClassifier, SiteFetcher};
use crate::pressure::{sample_level, MemoryLevel, MemoryProbe, SysinfoProbe};

/// Batch sizing chosen from the current URL count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    pub batch_size: usize,
    pub concurrency: usize,
    pub large: bool,
}

impl BatchPlan {
    pub fn for_total(total: usize, cfg: &TaskConfig) -> Self {
        let large = total > cfg.large_task_threshold;
        let batch_size = if total > cfg.huge_task_threshold {
            cfg.huge_batch_size
        } else if large {
            cfg.large_batch_size
        } else {
            cfg.batch_size
        };
        let concurrency = if large {
            cfg.concurrency_large
        } else {
            cfg.concurrency_normal
        };
        Self {
            batch_size: batch_size.max(1),
            concurrency: concurrency.max(1),
            large,
        }
    }

    /// Pause between batches: base delay, doubled for large tasks, scaled by memory level.
    pub fn delay(&self, base_ms: u64, level: MemoryLevel) -> Duration {
        let size_factor = if self.large { 2 } else { 1 };
        Duration::from_millis(base_ms * size_factor * level.delay_factor())
    }
}

#[derive(Clone)]
pub struct BatchProcessor {
    registry: TaskRegistry,
    fetcher: Arc<dyn SiteFetcher>,
    classifier: Arc<dyn SiteClassifier>,
    probe: Arc<dyn MemoryProbe>,
    tasks_cfg: TaskConfig,
    pressure_cfg: MemoryPressureConfig,
    stored_content_chars: usize,
}

impl BatchProcessor {
    pub fn new(
        registry: TaskRegistry,
        fetcher: Arc<dyn SiteFetcher>,
        classifier: Arc<dyn SiteClassifier>,
        config: &AppConfig,
    ) -> Self {
        Self {
            registry,
            fetcher,
            classifier,
            probe: Arc::new(SysinfoProbe::new()),
            tasks_cfg: config.tasks.clone(),
            pressure_cfg: config.memory_pressure.clone(),
            stored_content_chars: config.crawl.stored_content_chars,
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Runs the task on the tokio runtime; the caller only holds the handle.
    pub fn spawn(&self, task_id: String) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.run(&task_id).await {
                warn!(target: "prospector.task", task_id = %task_id, error = %e, "background task did not run");
            }
        })
    }

    /// Processes the task to completion. Errors only when the task cannot be started;
    /// failures after that are recorded on the task itself.
    pub async fn run(&self, task_id: &str) -> Result<(), TaskError> {
        let started = Instant::now();
        let abort = self.registry.start(task_id).await?;
        let (kind, ai_config) = self.registry.spec(task_id).await?;
        let total = self.registry.url_count(task_id).await?;

        info!(
            target: "prospector.task",
            task_id = %task_id,
            kind = %kind,
            total_urls = total,
            "task started"
        );

        if kind == TaskKind::Classify {
            if let Some(missing) = missing_ai_field(&ai_config) {
                let err = ClassifyError::MissingConfig(missing.to_string());
                warn!(target: "prospector.task", task_id = %task_id, error = %err, "task rejected before processing");
                self.registry
                    .fail(task_id, ErrorRecord::initialization(&err))
                    .await?;
                return Ok(());
            }
        }

        if let Err(e) = self.drive(task_id, kind, &ai_config, &abort).await {
            warn!(target: "prospector.task", task_id = %task_id, error = %e, "task execution failed");
            self.registry
                .fail(task_id, ErrorRecord::task_execution(e.to_string()))
                .await?;
        }

        let status = self.registry.status(task_id).await?;
        info!(
            target: "prospector.task",
            task_id = %task_id,
            status = %status.status,
            results = status.produced_results,
            errors = status.produced_errors,
            duration_ms = started.elapsed().as_millis() as u64,
            "task finished"
        );

        self.registry.sweep(Utc::now()).await;
        Ok(())
    }

    async fn drive(
        &self,
        task_id: &str,
        kind: TaskKind,
        ai_config: &AiConfig,
        abort: &AbortSignal,
    ) -> Result<(), TaskError> {
        let mut offset = 0usize;
        let mut since_check = 0usize;
        let mut level = MemoryLevel::Normal;

        loop {
            if abort.is_aborted() {
                return Ok(());
            }

            let total = self.registry.url_count(task_id).await?;
            let plan = BatchPlan::for_total(total, &self.tasks_cfg);

            let Some(batch) = self
                .registry
                .next_batch(task_id, offset, plan.batch_size)
                .await?
            else {
                match self.registry.finish_if_drained(task_id, offset).await? {
                    FinishOutcome::MoreWork => continue,
                    FinishOutcome::Completed | FinishOutcome::AlreadyTerminal => return Ok(()),
                }
            };

            let n = batch.len();
            debug!(
                target: "prospector.task",
                task_id = %task_id,
                offset,
                batch = n,
                concurrency = plan.concurrency,
                "processing batch"
            );
            self.run_batch(task_id, batch, plan.concurrency, kind, ai_config, abort)
                .await?;
            offset += n;
            since_check += n;

            self.registry.trim(task_id).await;

            let interval = self.tasks_cfg.memory_check_interval.max(1);
            if since_check >= interval {
                since_check %= interval;
                level = self.relieve_pressure(task_id).await;
            }

            if offset < self.registry.url_count(task_id).await? && !abort.is_aborted() {
                tokio::time::sleep(plan.delay(self.tasks_cfg.batch_delay_ms, level)).await;
            }
        }
    }

    async fn run_batch(
        &self,
        task_id: &str,
        batch: Vec<String>,
        concurrency: usize,
        kind: TaskKind,
        ai_config: &AiConfig,
        abort: &AbortSignal,
    ) -> Result<(), TaskError> {
        let sem = Arc::new(Semaphore::new(concurrency));
        let mut futs = FuturesUnordered::new();

        for url in batch {
            let sem = sem.clone();
            futs.push(async move {
                let _permit = sem
                    .acquire_owned()
                    .await
                    .map_err(|_| TaskError::Scheduler("semaphore closed unexpectedly".into()))?;
                self.process_url(task_id, &url, kind, ai_config, abort)
                    .await;
                Ok::<(), TaskError>(())
            });
        }

        while let Some(res) = futs.next().await {
            res?;
        }
        Ok(())
    }

    /// One URL unit. Settles exactly once unless the task was cancelled mid-flight.
    async fn process_url(
        &self,
        task_id: &str,
        url: &str,
        kind: TaskKind,
        ai_config: &AiConfig,
        abort: &AbortSignal,
    ) {
        if abort.is_aborted() || !self.registry.mark_in_flight(task_id, url).await {
            return;
        }

        let site = match self.fetcher.crawl(url).await {
            Ok(site) => site,
            Err(err) => {
                if abort.is_aborted() {
                    self.registry.clear_in_flight(task_id, url).await;
                    return;
                }
                debug!(target: "prospector.task", task_id = %task_id, url, error = %err, "crawl failed");
                self.registry
                    .record_error(task_id, ErrorRecord::from_fetch(url, &err))
                    .await;
                return;
            }
        };

        if abort.is_aborted() {
            self.registry.clear_in_flight(task_id, url).await;
            return;
        }

        let classification = match kind {
            TaskKind::CrawlOnly => None,
            TaskKind::Classify => match self.classifier.classify(ai_config, &site).await {
                Ok(c) => Some(c),
                Err(err) => {
                    if abort.is_aborted() {
                        self.registry.clear_in_flight(task_id, url).await;
                        return;
                    }
                    debug!(target: "prospector.task", task_id = %task_id, url, error = %err, "classification failed");
                    self.registry
                        .record_error(
                            task_id,
                            ErrorRecord::from_classify(url, Stage::AiAnalysis, &err),
                        )
                        .await;
                    return;
                }
            },
        };

        if abort.is_aborted() {
            self.registry.clear_in_flight(task_id, url).await;
            return;
        }

        let record = ResultRecord {
            url: url.to_string(),
            extracted_summary: ExtractedSummary::from_site(&site, self.stored_content_chars),
            classification,
            completed_at: Utc::now(),
        };
        self.registry.record_result(task_id, record).await;
    }

    async fn relieve_pressure(&self, task_id: &str) -> MemoryLevel {
        let level = sample_level(self.probe.as_ref(), &self.pressure_cfg);
        let pause = match level {
            MemoryLevel::Normal => return level,
            MemoryLevel::ShouldCleanup => None,
            MemoryLevel::High => Some(self.pressure_cfg.high_pause_ms),
            MemoryLevel::Critical => Some(self.pressure_cfg.critical_pause_ms),
        };

        warn!(target: "prospector.task", task_id = %task_id, level = ?level, "memory pressure, sweeping registry");
        self.registry.sweep(Utc::now()).await;
        if let Some(ms) = pause {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        level
    }
}

fn missing_ai_field(cfg: &AiConfig) -> Option<&'static str> {
    if !cfg.has_api_key() {
        Some("apiKey")
    } else if cfg.api_url.trim().is_empty() {
        Some("apiUrl")
    } else if cfg.model_name.trim().is_empty() {
        Some("modelName")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_plan_scales_with_size() {
        let cfg = TaskConfig::default();
        assert_eq!(
            BatchPlan::for_total(100, &cfg),
            BatchPlan {
                batch_size: 20,
                concurrency: 8,
                large: false
            }
        );
        assert_eq!(BatchPlan::for_total(1001, &cfg).batch_size, 15);
        assert_eq!(BatchPlan::for_total(1001, &cfg).concurrency, 4);
        assert_eq!(BatchPlan::for_total(5001, &cfg).batch_size, 10);
    }

    #[test]
    fn test_delay_factors() {
        let cfg = TaskConfig::default();
        let small = BatchPlan::for_total(10, &cfg);
        let large = BatchPlan::for_total(2000, &cfg);
        assert_eq!(small.delay(200, MemoryLevel::Normal), Duration::from_millis(200));
        assert_eq!(large.delay(200, MemoryLevel::Normal), Duration::from_millis(400));
        assert_eq!(large.delay(200, MemoryLevel::High), Duration::from_millis(1200));
    }

    #[test]
    fn test_missing_ai_field() {
        let mut cfg = AiConfig::default();
        assert_eq!(missing_ai_field(&cfg), Some("apiKey"));
        cfg.api_key = "sk-test".into();
        cfg.api_url = "https://llm.test/v1/chat/completions".into();
        cfg.model_name = "m".into();
        assert_eq!(missing_ai_field(&cfg), None);
    }
}
