//! Error taxonomy attached to per-URL error records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse failure category shown to callers and used for retry hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    CrawlError,
    AiError,
    NetworkError,
    TimeoutError,
    ConfigError,
    UnknownError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CrawlError => "crawl_error",
            Self::AiError => "ai_error",
            Self::NetworkError => "network_error",
            Self::TimeoutError => "timeout_error",
            Self::ConfigError => "config_error",
            Self::UnknownError => "unknown_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline step during which an error record was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Crawling,
    AiAnalysis,
    InfoExtraction,
    Initialization,
    TaskExecution,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Crawling => "crawling",
            Self::AiAnalysis => "ai_analysis",
            Self::InfoExtraction => "info_extraction",
            Self::Initialization => "initialization",
            Self::TaskExecution => "task_execution",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
