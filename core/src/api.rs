//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `prospector_core::api` instead of reaching into internal modules.

pub use crate::classify::{
    filter_emails, parse_company_info, parse_emails, parse_verdict, render_content_prompt,
    render_template, AiConfig, Classification, Verdict,
};
pub use crate::classify::prompt::{
    DEFAULT_CLASSIFY_TEMPLATE, DEFAULT_COMPANY_PROMPT, DEFAULT_EMAIL_PROMPT,
};
pub use crate::config::{
    apply_env_overrides, load_default, load_from_path, ActiveTaskPolicy, AppConfig, ClassifierConfig, CrawlConfig,
    HttpServerConfig, LoggingConfig, MemoryPressureConfig, ProxyConfig, ProxyEntry,
    ProxyStrategy, StorageConfig, StorageProvider, TaskConfig,
};
pub use crate::error::{CliError, ClassifyError, ErrorKind, FetchError, Stage, TaskError};
pub use crate::export::{
    build_export, export_filename, items_from_task, ExportDocument, ExportError, ExportFormat,
    ExportItem,
};
pub use crate::pipeline::{
    CompanyInfo, ConnectionCheck, CrawledPage, CrawledSite, EmailInfo, InfoExtractor,
    SiteClassifier, SiteFetcher,
};
pub use crate::pressure::{MemoryLevel, MemoryProbe, SysinfoProbe};
pub use crate::progress::ProgressMonitor;
pub use crate::storage::{sanitize_key, KvStore, StoredEnvelope};
pub use crate::task::{
    spawn_sweeper, BatchProcessor, ConfigStatus, CreateOutcome, RealtimeSnapshot,
    RegistrySummary, ResultsSnapshot, StatusSnapshot, SweepReport, Task, TaskEvent, TaskKind,
    TaskRegistry, TaskStatus, TaskSummary,
};
pub use crate::util::{collapse_whitespace, truncate_chars};
