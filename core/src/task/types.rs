use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::classify::{AiConfig, Classification};
use crate::error::{ClassifyError, ErrorKind, FetchError, Stage};
use crate::pipeline::{CrawledPage, CrawledSite};
use crate::util::truncate_chars;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    /// Crawl, then classify with the caller's AI config.
    #[serde(alias = "analyze")]
    Classify,
    /// Crawl only; no model calls.
    #[serde(alias = "crawl")]
    CrawlOnly,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Classify => "classify",
            Self::CrawlOnly => "crawl-only",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `completed` counts settled URL units and never decreases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

/// Records ever produced, unaffected by retention trimming.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducedCounts {
    pub results: usize,
    pub errors: usize,
}

/// Bounded copy of a crawl kept inside a task result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedSummary {
    pub url: String,
    pub title: String,
    pub description: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<CrawledPage>,
}

impl ExtractedSummary {
    pub fn from_site(site: &CrawledSite, content_chars: usize) -> Self {
        Self {
            url: site.url.clone(),
            title: site.title.clone(),
            description: site.description.clone(),
            content: truncate_chars(&site.content, content_chars),
            pages: site.pages.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub url: String,
    pub extracted_summary: ExtractedSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub stage: Stage,
    pub error_kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
    pub timestamp: DateTime<Utc>,
}

pub const CANCELLED_MESSAGE: &str = "cancelled by user";

impl ErrorRecord {
    pub fn from_fetch(url: &str, err: &FetchError) -> Self {
        Self {
            url: Some(url.to_string()),
            stage: Stage::Crawling,
            error_kind: err.error_kind(),
            message: err.to_string(),
            retryable: err.is_retryable(),
            timestamp: Utc::now(),
        }
    }

    pub fn from_classify(url: &str, stage: Stage, err: &ClassifyError) -> Self {
        Self {
            url: Some(url.to_string()),
            stage,
            error_kind: err.error_kind(),
            message: err.to_string(),
            retryable: err.is_retryable(),
            timestamp: Utc::now(),
        }
    }

    /// Synthetic record for a failure of the driving loop itself.
    pub fn task_execution(message: impl Into<String>) -> Self {
        Self {
            url: None,
            stage: Stage::TaskExecution,
            error_kind: ErrorKind::UnknownError,
            message: message.into(),
            retryable: false,
            timestamp: Utc::now(),
        }
    }

    /// Task-level configuration failure detected before any URL is processed.
    pub fn initialization(err: &ClassifyError) -> Self {
        Self {
            url: None,
            stage: Stage::Initialization,
            error_kind: err.error_kind(),
            message: err.to_string(),
            retryable: false,
            timestamp: Utc::now(),
        }
    }

    pub fn cancelled() -> Self {
        Self::task_execution(CANCELLED_MESSAGE)
    }
}

/// One batch crawl/classify job.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: String,
    pub kind: TaskKind,
    pub urls: Vec<String>,
    pub ai_config: AiConfig,
    pub status: TaskStatus,
    pub progress: Progress,
    pub results: Vec<ResultRecord>,
    pub errors: Vec<ErrorRecord>,
    pub produced: ProducedCounts,
    pub currently_processing: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(kind: TaskKind, urls: Vec<String>, ai_config: AiConfig) -> Self {
        let total = urls.len();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            urls,
            ai_config,
            status: TaskStatus::Pending,
            progress: Progress {
                completed: 0,
                total,
            },
            results: Vec::new(),
            errors: Vec::new(),
            produced: ProducedCounts::default(),
            currently_processing: BTreeSet::new(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn append_urls(&mut self, urls: Vec<String>) {
        self.urls.extend(urls);
        self.progress.total = self.urls.len();
    }

    /// Drops the oldest entries beyond the caps. Returns `(results, errors)` removed.
    pub fn trim_to(&mut self, max_results: usize, max_errors: usize) -> (usize, usize) {
        let drop_results = self.results.len().saturating_sub(max_results);
        let drop_errors = self.errors.len().saturating_sub(max_errors);
        if drop_results > 0 {
            self.results.drain(..drop_results);
        }
        if drop_errors > 0 {
            self.errors.drain(..drop_errors);
        }
        (drop_results, drop_errors)
    }

    pub(crate) fn settle_unit(&mut self, url: &str) {
        self.currently_processing.remove(url);
        self.progress.completed = (self.progress.completed + 1).min(self.progress.total);
    }
}
