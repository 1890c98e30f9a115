//! 任务注册表
//!
//! 进程内唯一的任务存储，构造一次后注入到所有 handler 和 processor。
//! 所有写操作都在同一把 `RwLock` 下完成，终态任务拒绝任何追加。

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

use super::abort::AbortSignal;
use super::events::TaskEvent;
use super::snapshot::{
    ConfigStatus, RealtimeSnapshot, RegistrySummary, ResultsSnapshot, StatusSnapshot, TaskSummary,
};
use super::transitions::TaskTransition;
use super::types::{ErrorRecord, ResultRecord, Task, TaskKind, TaskStatus};
use crate::classify::AiConfig;
use crate::config::{ActiveTaskPolicy, TaskConfig};
use crate::error::TaskError;

/// 保留上限
#[derive(Debug, Clone)]
pub struct RetentionLimits {
    pub max_tasks: usize,
    pub max_results: usize,
    pub max_errors: usize,
    pub retention: Duration,
}

impl From<&TaskConfig> for RetentionLimits {
    fn from(cfg: &TaskConfig) -> Self {
        Self {
            max_tasks: cfg.max_tasks,
            max_results: cfg.max_results_per_task,
            max_errors: cfg.max_errors_per_task,
            retention: cfg.retention(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created {
        task_id: String,
        total_urls: usize,
    },
    AddedToExisting {
        task_id: String,
        added: usize,
        total_urls: usize,
    },
}

impl CreateOutcome {
    pub fn task_id(&self) -> &str {
        match self {
            Self::Created { task_id, .. } | Self::AddedToExisting { task_id, .. } => task_id,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::Created { .. })
    }
}

/// Result of `finish_if_drained`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishOutcome {
    Completed,
    /// URLs were appended after the last batch was read.
    MoreWork,
    /// Cancelled or failed elsewhere.
    AlreadyTerminal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub expired: usize,
    pub over_capacity: usize,
    pub trimmed_results: usize,
    pub trimmed_errors: usize,
    pub remaining: usize,
}

impl SweepReport {
    pub fn removed(&self) -> usize {
        self.expired + self.over_capacity
    }
}

struct TaskEntry {
    task: Task,
    abort: AbortSignal,
}

/// 任务注册表
#[derive(Clone)]
pub struct TaskRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    /// 所有任务
    tasks: RwLock<HashMap<String, TaskEntry>>,
    /// 事件广播通道
    event_tx: broadcast::Sender<TaskEvent>,
    limits: RetentionLimits,
    policy: ActiveTaskPolicy,
    recent_window: usize,
}

impl TaskRegistry {
    /// 创建新的任务注册表
    pub fn new(cfg: &TaskConfig) -> Self {
        let (event_tx, _) = broadcast::channel(1000);

        let inner = RegistryInner {
            tasks: RwLock::new(HashMap::new()),
            event_tx,
            limits: RetentionLimits::from(cfg),
            policy: cfg.active_task_policy,
            recent_window: cfg.recent_window,
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn limits(&self) -> &RetentionLimits {
        &self.inner.limits
    }

    pub fn policy(&self) -> ActiveTaskPolicy {
        self.inner.policy
    }

    /// 订阅任务事件
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.inner.event_tx.subscribe()
    }

    fn emit(&self, event: TaskEvent) {
        let _ = self.inner.event_tx.send(event);
    }

    /// 创建任务；按 `ActiveTaskPolicy` 决定是否并入已有的活跃任务
    pub async fn create(
        &self,
        urls: Vec<String>,
        kind: TaskKind,
        ai_config: AiConfig,
    ) -> Result<CreateOutcome, TaskError> {
        if urls.is_empty() {
            return Err(TaskError::EmptyUrls);
        }

        let mut tasks = self.inner.tasks.write().await;

        if self.inner.policy == ActiveTaskPolicy::MergeIntoActive {
            let active = tasks
                .values_mut()
                .filter(|e| e.task.status.is_active() && e.task.kind == kind)
                .min_by_key(|e| e.task.created_at);

            if let Some(entry) = active {
                let added = urls.len();
                entry.task.append_urls(urls);
                let task_id = entry.task.id.clone();
                let total_urls = entry.task.urls.len();
                drop(tasks);

                info!(target: "prospector.task", task_id = %task_id, added, total_urls, "urls appended to active task");
                self.emit(TaskEvent::UrlsAppended {
                    task_id: task_id.clone(),
                    added,
                    total_urls,
                    timestamp: Utc::now(),
                });
                return Ok(CreateOutcome::AddedToExisting {
                    task_id,
                    added,
                    total_urls,
                });
            }
        }

        let task = Task::new(kind, urls, ai_config);
        let task_id = task.id.clone();
        let total_urls = task.urls.len();
        tasks.insert(
            task_id.clone(),
            TaskEntry {
                task,
                abort: AbortSignal::new(),
            },
        );
        let evicted = evict_over_capacity(&mut tasks, self.inner.limits.max_tasks);
        drop(tasks);

        if evicted > 0 {
            debug!(target: "prospector.task", evicted, "evicted terminal tasks over capacity");
        }
        info!(target: "prospector.task", task_id = %task_id, kind = %kind, total_urls, "task created");
        self.emit(TaskEvent::Created {
            task_id: task_id.clone(),
            kind,
            total_urls,
            timestamp: Utc::now(),
        });

        Ok(CreateOutcome::Created {
            task_id,
            total_urls,
        })
    }

    /// 获取任务副本
    pub async fn get(&self, task_id: &str) -> Result<Task, TaskError> {
        self.read_with(task_id, |e| e.task.clone()).await
    }

    pub async fn status(&self, task_id: &str) -> Result<StatusSnapshot, TaskError> {
        self.read_with(task_id, |e| StatusSnapshot::from(&e.task))
            .await
    }

    pub async fn results(&self, task_id: &str) -> Result<ResultsSnapshot, TaskError> {
        self.read_with(task_id, |e| ResultsSnapshot::from(&e.task))
            .await
    }

    pub async fn realtime(&self, task_id: &str) -> Result<RealtimeSnapshot, TaskError> {
        let window = self.inner.recent_window;
        self.read_with(task_id, |e| RealtimeSnapshot::from_task(&e.task, window))
            .await
    }

    pub async fn config_status(&self, task_id: &str) -> Result<ConfigStatus, TaskError> {
        self.read_with(task_id, |e| ConfigStatus::from(&e.task))
            .await
    }

    /// Kind and AI config the processor needs for every unit.
    pub async fn spec(&self, task_id: &str) -> Result<(TaskKind, AiConfig), TaskError> {
        self.read_with(task_id, |e| (e.task.kind, e.task.ai_config.clone()))
            .await
    }

    pub async fn abort_signal(&self, task_id: &str) -> Result<AbortSignal, TaskError> {
        self.read_with(task_id, |e| e.abort.clone()).await
    }

    async fn read_with<R>(
        &self,
        task_id: &str,
        f: impl FnOnce(&TaskEntry) -> R,
    ) -> Result<R, TaskError> {
        let tasks = self.inner.tasks.read().await;
        tasks
            .get(task_id)
            .map(f)
            .ok_or_else(|| TaskError::NotFound(task_id.to_string()))
    }

    /// 所有任务（按创建时间倒序）
    pub async fn list(&self) -> Vec<TaskSummary> {
        let tasks = self.inner.tasks.read().await;
        let mut out: Vec<TaskSummary> = tasks.values().map(|e| TaskSummary::from(&e.task)).collect();
        out.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.task_id.cmp(&b.task_id))
        });
        out
    }

    pub async fn summary(&self) -> RegistrySummary {
        let tasks = self.inner.tasks.read().await;
        let mut summary = RegistrySummary {
            total: tasks.len(),
            ..Default::default()
        };
        for entry in tasks.values() {
            match entry.task.status {
                TaskStatus::Pending => summary.pending += 1,
                TaskStatus::Running => summary.running += 1,
                TaskStatus::Completed => summary.completed += 1,
                TaskStatus::Failed => summary.failed += 1,
            }
        }
        summary
    }

    pub async fn len(&self) -> usize {
        self.inner.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// pending -> running
    pub async fn start(&self, task_id: &str) -> Result<AbortSignal, TaskError> {
        let signal = {
            let mut tasks = self.inner.tasks.write().await;
            let entry = tasks
                .get_mut(task_id)
                .ok_or_else(|| TaskError::NotFound(task_id.to_string()))?;
            TaskTransition::validate(entry.task.status, TaskStatus::Running)
                .map_err(|e| TaskError::transition(task_id, e))?;
            entry.task.status = TaskStatus::Running;
            entry.task.started_at = Some(Utc::now());
            entry.abort.clone()
        };

        self.emit(TaskEvent::Started {
            task_id: task_id.to_string(),
            timestamp: Utc::now(),
        });
        Ok(signal)
    }

    /// Next slice of URLs starting at `offset`, or `None` when drained or no longer running.
    pub async fn next_batch(
        &self,
        task_id: &str,
        offset: usize,
        size: usize,
    ) -> Result<Option<Vec<String>>, TaskError> {
        self.read_with(task_id, |e| {
            let urls = &e.task.urls;
            if e.task.status != TaskStatus::Running || offset >= urls.len() {
                return None;
            }
            let end = offset.saturating_add(size.max(1)).min(urls.len());
            Some(urls[offset..end].to_vec())
        })
        .await
    }

    pub async fn url_count(&self, task_id: &str) -> Result<usize, TaskError> {
        self.read_with(task_id, |e| e.task.urls.len()).await
    }

    /// Marks a URL in flight. Returns `false` once the task is no longer running.
    pub async fn mark_in_flight(&self, task_id: &str, url: &str) -> bool {
        let mut tasks = self.inner.tasks.write().await;
        match tasks.get_mut(task_id) {
            Some(e) if e.task.status == TaskStatus::Running => {
                e.task.currently_processing.insert(url.to_string());
                true
            }
            _ => false,
        }
    }

    pub async fn clear_in_flight(&self, task_id: &str, url: &str) {
        let mut tasks = self.inner.tasks.write().await;
        if let Some(e) = tasks.get_mut(task_id) {
            e.task.currently_processing.remove(url);
        }
    }

    /// Appends a result. Discarded (returns `false`) if the task is gone or not running.
    pub async fn record_result(&self, task_id: &str, record: ResultRecord) -> bool {
        let mut tasks = self.inner.tasks.write().await;
        let Some(e) = tasks.get_mut(task_id) else {
            return false;
        };
        if e.task.status != TaskStatus::Running {
            return false;
        }
        e.task.settle_unit(&record.url);
        e.task.results.push(record);
        e.task.produced.results += 1;
        true
    }

    /// Appends a per-URL error. Same discard rule as `record_result`.
    pub async fn record_error(&self, task_id: &str, record: ErrorRecord) -> bool {
        let mut tasks = self.inner.tasks.write().await;
        let Some(e) = tasks.get_mut(task_id) else {
            return false;
        };
        if e.task.status != TaskStatus::Running {
            return false;
        }
        if let Some(url) = record.url.as_deref() {
            e.task.settle_unit(url);
        }
        e.task.errors.push(record);
        e.task.produced.errors += 1;
        true
    }

    /// 裁剪单个任务的结果/错误列表
    pub async fn trim(&self, task_id: &str) -> (usize, usize) {
        let limits = &self.inner.limits;
        let mut tasks = self.inner.tasks.write().await;
        match tasks.get_mut(task_id) {
            Some(e) => e.task.trim_to(limits.max_results, limits.max_errors),
            None => (0, 0),
        }
    }

    /// running -> completed, unless URLs beyond `processed` arrived meanwhile.
    pub async fn finish_if_drained(
        &self,
        task_id: &str,
        processed: usize,
    ) -> Result<FinishOutcome, TaskError> {
        let event = {
            let mut tasks = self.inner.tasks.write().await;
            let entry = tasks
                .get_mut(task_id)
                .ok_or_else(|| TaskError::NotFound(task_id.to_string()))?;
            let task = &mut entry.task;

            if task.status.is_terminal() {
                return Ok(FinishOutcome::AlreadyTerminal);
            }
            if task.urls.len() > processed {
                return Ok(FinishOutcome::MoreWork);
            }
            TaskTransition::validate(task.status, TaskStatus::Completed)
                .map_err(|e| TaskError::transition(task_id, e))?;

            let now = Utc::now();
            task.status = TaskStatus::Completed;
            task.completed_at = Some(now);
            task.currently_processing.clear();

            TaskEvent::Completed {
                task_id: task_id.to_string(),
                results: task.produced.results,
                errors: task.produced.errors,
                duration_ms: task
                    .started_at
                    .map(|s| (now - s).num_milliseconds())
                    .unwrap_or(0),
                timestamp: now,
            }
        };

        self.emit(event);
        Ok(FinishOutcome::Completed)
    }

    /// Marks the task failed and appends `record` (a task-level error, not counted as
    /// a produced per-URL error). Returns `false` if it already reached a terminal state.
    pub async fn fail(&self, task_id: &str, record: ErrorRecord) -> Result<bool, TaskError> {
        let message = record.message.clone();
        {
            let mut tasks = self.inner.tasks.write().await;
            let entry = tasks
                .get_mut(task_id)
                .ok_or_else(|| TaskError::NotFound(task_id.to_string()))?;
            let task = &mut entry.task;
            if task.status.is_terminal() {
                return Ok(false);
            }
            task.status = TaskStatus::Failed;
            task.completed_at = Some(Utc::now());
            task.currently_processing.clear();
            task.errors.push(record);
        }

        self.emit(TaskEvent::Failed {
            task_id: task_id.to_string(),
            error: message,
            timestamp: Utc::now(),
        });
        Ok(true)
    }

    /// 取消任务：置位中止信号，标记失败并追加 "cancelled by user" 记录。
    /// 已是终态的任务返回 `false`。
    pub async fn cancel(&self, task_id: &str) -> Result<bool, TaskError> {
        {
            let mut tasks = self.inner.tasks.write().await;
            let entry = tasks
                .get_mut(task_id)
                .ok_or_else(|| TaskError::NotFound(task_id.to_string()))?;
            if entry.task.status.is_terminal() {
                return Ok(false);
            }
            entry.abort.abort();
            let task = &mut entry.task;
            task.status = TaskStatus::Failed;
            task.completed_at = Some(Utc::now());
            task.currently_processing.clear();
            task.errors.push(ErrorRecord::cancelled());
        }

        info!(target: "prospector.task", task_id = %task_id, "task cancelled");
        self.emit(TaskEvent::Cancelled {
            task_id: task_id.to_string(),
            timestamp: Utc::now(),
        });
        Ok(true)
    }

    /// 清理：过期终态任务 -> 超出容量的最旧终态任务 -> 逐任务裁剪
    pub async fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let limits = &self.inner.limits;
        let report = {
            let mut tasks = self.inner.tasks.write().await;

            let before = tasks.len();
            tasks.retain(|_, e| !is_expired(&e.task, now, limits.retention));
            let expired = before - tasks.len();

            let over_capacity = evict_over_capacity(&mut tasks, limits.max_tasks);

            let mut report = SweepReport {
                expired,
                over_capacity,
                ..Default::default()
            };
            for entry in tasks.values_mut() {
                let (r, e) = entry.task.trim_to(limits.max_results, limits.max_errors);
                report.trimmed_results += r;
                report.trimmed_errors += e;
            }
            report.remaining = tasks.len();
            report
        };

        if report.removed() > 0 {
            info!(
                target: "prospector.task",
                expired = report.expired,
                over_capacity = report.over_capacity,
                remaining = report.remaining,
                "registry swept"
            );
            self.emit(TaskEvent::Swept {
                removed: report.removed(),
                remaining: report.remaining,
                timestamp: now,
            });
        }
        report
    }

    /// Removes `completed` tasks that finished more than `age` ago. Failed tasks are kept.
    pub async fn cleanup_completed_older_than(&self, age: Duration, now: DateTime<Utc>) -> usize {
        let mut tasks = self.inner.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|_, e| {
            !(e.task.status == TaskStatus::Completed
                && e.task.completed_at.map(|t| now - t > age).unwrap_or(false))
        });
        before - tasks.len()
    }

    #[cfg(test)]
    async fn insert_for_test(&self, task: Task) {
        let mut tasks = self.inner.tasks.write().await;
        tasks.insert(
            task.id.clone(),
            TaskEntry {
                task,
                abort: AbortSignal::new(),
            },
        );
    }
}

fn reference_time(task: &Task) -> DateTime<Utc> {
    task.completed_at.unwrap_or(task.created_at)
}

fn is_expired(task: &Task, now: DateTime<Utc>, retention: Duration) -> bool {
    task.status.is_terminal() && now - reference_time(task) > retention
}

/// Removes the oldest terminal tasks until `len <= max`. Active tasks are never removed.
fn evict_over_capacity(tasks: &mut HashMap<String, TaskEntry>, max: usize) -> usize {
    if tasks.len() <= max {
        return 0;
    }
    let excess = tasks.len() - max;

    let mut terminal: Vec<(DateTime<Utc>, String)> = tasks
        .values()
        .filter(|e| e.task.status.is_terminal())
        .map(|e| (reference_time(&e.task), e.task.id.clone()))
        .collect();
    terminal.sort();

    let victims: Vec<String> = terminal.into_iter().take(excess).map(|(_, id)| id).collect();
    for id in &victims {
        tasks.remove(id);
    }
    victims.len()
}
