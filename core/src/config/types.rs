use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub http_server: HttpServerConfig,

    #[serde(default)]
    pub tasks: TaskConfig,

    #[serde(default)]
    pub memory_pressure: MemoryPressureConfig,

    #[serde(default)]
    pub crawl: CrawlConfig,

    #[serde(default)]
    pub proxy: ProxyConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "prospector_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_host")]
    pub host: String,

    #[serde(default = "default_http_port")]
    pub port: u16,

    /// Upper bound for one request, including crawl and model calls made inline.
    #[serde(default = "default_http_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Origin prefixes allowed by CORS, e.g. a local dashboard on `http://localhost:3000`.
    #[serde(default = "default_http_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_http_host() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_http_request_timeout_secs() -> u64 {
    120
}

fn default_http_cors_origins() -> Vec<String> {
    vec!["http://localhost".to_string(), "http://127.0.0.1".to_string()]
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: default_http_host(),
            port: default_http_port(),
            request_timeout_secs: default_http_request_timeout_secs(),
            cors_origins: default_http_cors_origins(),
        }
    }
}

/// What `create` does when a pending or running task already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActiveTaskPolicy {
    /// Append the new URLs to the existing active task.
    #[default]
    MergeIntoActive,
    /// Always create a separate task.
    AlwaysCreate,
}

/// Retention caps, batch planning and pacing for background tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    #[serde(default = "default_max_tasks")]
    pub max_tasks: usize,

    #[serde(default = "default_max_results_per_task")]
    pub max_results_per_task: usize,

    #[serde(default = "default_max_errors_per_task")]
    pub max_errors_per_task: usize,

    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,

    /// Terminal tasks older than this are evicted by the sweeper.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,

    /// Age used by the explicit `cleanup` action.
    #[serde(default = "default_manual_cleanup_age_secs")]
    pub manual_cleanup_age_secs: u64,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_large_task_threshold")]
    pub large_task_threshold: usize,

    #[serde(default = "default_large_batch_size")]
    pub large_batch_size: usize,

    #[serde(default = "default_huge_task_threshold")]
    pub huge_task_threshold: usize,

    #[serde(default = "default_huge_batch_size")]
    pub huge_batch_size: usize,

    #[serde(default = "default_concurrency_normal")]
    pub concurrency_normal: usize,

    #[serde(default = "default_concurrency_large")]
    pub concurrency_large: usize,

    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Sample process memory every N settled URLs.
    #[serde(default = "default_memory_check_interval")]
    pub memory_check_interval: usize,

    #[serde(default)]
    pub active_task_policy: ActiveTaskPolicy,

    /// Number of recent results/errors returned by `realtime-status`.
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,
}

fn default_max_tasks() -> usize {
    50
}

fn default_max_results_per_task() -> usize {
    10_000
}

fn default_max_errors_per_task() -> usize {
    5_000
}

fn default_cleanup_interval_secs() -> u64 {
    120
}

fn default_retention_hours() -> u64 {
    24 * 7
}

fn default_manual_cleanup_age_secs() -> u64 {
    3_600
}

fn default_batch_size() -> usize {
    20
}

fn default_large_task_threshold() -> usize {
    1_000
}

fn default_large_batch_size() -> usize {
    15
}

fn default_huge_task_threshold() -> usize {
    5_000
}

fn default_huge_batch_size() -> usize {
    10
}

fn default_concurrency_normal() -> usize {
    8
}

fn default_concurrency_large() -> usize {
    4
}

fn default_batch_delay_ms() -> u64 {
    200
}

fn default_memory_check_interval() -> usize {
    50
}

fn default_recent_window() -> usize {
    5
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            max_tasks: default_max_tasks(),
            max_results_per_task: default_max_results_per_task(),
            max_errors_per_task: default_max_errors_per_task(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            retention_hours: default_retention_hours(),
            manual_cleanup_age_secs: default_manual_cleanup_age_secs(),
            batch_size: default_batch_size(),
            large_task_threshold: default_large_task_threshold(),
            large_batch_size: default_large_batch_size(),
            huge_task_threshold: default_huge_task_threshold(),
            huge_batch_size: default_huge_batch_size(),
            concurrency_normal: default_concurrency_normal(),
            concurrency_large: default_concurrency_large(),
            batch_delay_ms: default_batch_delay_ms(),
            memory_check_interval: default_memory_check_interval(),
            active_task_policy: ActiveTaskPolicy::default(),
            recent_window: default_recent_window(),
        }
    }
}

impl TaskConfig {
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::hours(self.retention_hours as i64)
    }

    pub fn manual_cleanup_age(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.manual_cleanup_age_secs as i64)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }
}

/// Resident-set thresholds in megabytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryPressureConfig {
    pub enabled: bool,
    pub cleanup_rss_mb: u64,
    pub high_rss_mb: u64,
    pub critical_rss_mb: u64,
    pub high_pause_ms: u64,
    pub critical_pause_ms: u64,
}

impl Default for MemoryPressureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cleanup_rss_mb: 300,
            high_rss_mb: 400,
            critical_rss_mb: 600,
            high_pause_ms: 2_000,
            critical_pause_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_subpage_timeout_ms")]
    pub subpage_timeout_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Pick a browser user agent at random per request instead of `user_agent`.
    #[serde(default)]
    pub random_user_agent: bool,

    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    #[serde(default = "default_follow_key_pages")]
    pub follow_key_pages: bool,

    #[serde(default = "default_max_key_pages")]
    pub max_key_pages: usize,

    #[serde(default = "default_key_page_delay_ms")]
    pub key_page_delay_ms: u64,

    #[serde(default = "default_page_char_limit")]
    pub page_char_limit: usize,

    #[serde(default = "default_min_page_chars")]
    pub min_page_chars: usize,

    /// Stop following key pages once the accumulated text reaches this size.
    #[serde(default = "default_follow_stop_chars")]
    pub follow_stop_chars: usize,

    #[serde(default = "default_content_char_limit")]
    pub content_char_limit: usize,

    /// Content length kept in a stored task result.
    #[serde(default = "default_stored_content_chars")]
    pub stored_content_chars: usize,
}

fn default_request_timeout_ms() -> u64 {
    15_000
}

fn default_subpage_timeout_ms() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

fn default_max_redirects() -> usize {
    3
}

fn default_follow_key_pages() -> bool {
    true
}

fn default_max_key_pages() -> usize {
    4
}

fn default_key_page_delay_ms() -> u64 {
    500
}

fn default_page_char_limit() -> usize {
    1_500
}

fn default_min_page_chars() -> usize {
    50
}

fn default_follow_stop_chars() -> usize {
    5_000
}

fn default_content_char_limit() -> usize {
    6_000
}

fn default_stored_content_chars() -> usize {
    2_000
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            subpage_timeout_ms: default_subpage_timeout_ms(),
            user_agent: default_user_agent(),
            random_user_agent: false,
            max_redirects: default_max_redirects(),
            follow_key_pages: default_follow_key_pages(),
            max_key_pages: default_max_key_pages(),
            key_page_delay_ms: default_key_page_delay_ms(),
            page_char_limit: default_page_char_limit(),
            min_page_chars: default_min_page_chars(),
            follow_stop_chars: default_follow_stop_chars(),
            content_char_limit: default_content_char_limit(),
            stored_content_chars: default_stored_content_chars(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProxyStrategy {
    #[default]
    RoundRobin,
    Random,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyEntry {
    /// `http://`, `https://` or `socks5://` URL.
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub enabled: bool,
    pub strategy: ProxyStrategy,
    pub proxies: Vec<ProxyEntry>,
}

/// Request knobs for the chat-completion endpoint. Endpoint, model and key are
/// supplied per request by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub timeout_ms: u64,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: String,
    pub reason_char_limit: usize,
    pub extraction_timeout_ms: u64,
    pub extraction_temperature: f32,
    pub extraction_max_tokens: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 45_000,
            temperature: 0.1,
            max_tokens: 800,
            system_prompt: "You are a professional website analyst. Decide whether the website \
                belongs to a target customer and answer strictly in JSON: \
                {\"result\": \"Y\" or \"N\", \"reason\": \"...\"}."
                .to_string(),
            reason_char_limit: 500,
            extraction_timeout_ms: 30_000,
            extraction_temperature: 0.3,
            extraction_max_tokens: 1_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageProvider {
    /// Cloud backend when its credentials are present in the environment, otherwise
    /// memory in production and local files elsewhere.
    #[default]
    Auto,
    File,
    Memory,
    KvRest,
    Supabase,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub provider: StorageProvider,

    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Written into file envelopes; `production` switches `auto` to the memory store.
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default = "default_storage_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_storage_timeout_ms() -> u64 {
    10_000
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: StorageProvider::default(),
            data_dir: default_data_dir(),
            environment: default_environment(),
            timeout_ms: default_storage_timeout_ms(),
        }
    }
}
