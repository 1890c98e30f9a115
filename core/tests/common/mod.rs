#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use prospector_core::api::{
    AiConfig, AppConfig, BatchProcessor, Classification, ClassifyError, ConnectionCheck,
    CrawledSite, FetchError, MemoryProbe, SiteClassifier, SiteFetcher, TaskRegistry, Verdict,
};

/// Routes processor logs to the test harness; `RUST_LOG=prospector.task=debug` shows them.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Fetcher that times out on a fixed set of URLs and succeeds on the rest.
#[derive(Default)]
pub struct MockFetcher {
    pub timeouts: HashSet<String>,
    pub delay: Duration,
    pub calls: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeouts<I: IntoIterator<Item = String>>(mut self, urls: I) -> Self {
        self.timeouts = urls.into_iter().collect();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl SiteFetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn crawl(&self, url: &str) -> Result<CrawledSite, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.timeouts.contains(url) {
            return Err(FetchError::Timeout { timeout_ms: 15_000 });
        }
        Ok(CrawledSite {
            url: url.to_string(),
            title: format!("Title of {url}"),
            content: "Industrial pumps and valves for water treatment plants.".into(),
            ..Default::default()
        })
    }
}

/// Classifier that answers `Y` for every site.
#[derive(Default)]
pub struct MockClassifier {
    pub calls: AtomicUsize,
}

#[async_trait]
impl SiteClassifier for MockClassifier {
    fn name(&self) -> &str {
        "mock"
    }

    async fn classify(
        &self,
        _config: &AiConfig,
        site: &CrawledSite,
    ) -> Result<Classification, ClassifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Classification {
            result: Verdict::Yes,
            reason: format!("{} sells pumps", site.url),
            confidence: Some(0.9),
        })
    }

    async fn check_connection(&self, config: &AiConfig) -> Result<ConnectionCheck, ClassifyError> {
        Ok(ConnectionCheck {
            model: config.model_name.clone(),
            response_time_ms: 1,
            reply: "ok".into(),
        })
    }
}

pub struct FixedProbe(pub Option<u64>);

impl MemoryProbe for FixedProbe {
    fn rss_mb(&self) -> Option<u64> {
        self.0
    }
}

/// Counts samples; always reports a normal RSS.
#[derive(Default)]
pub struct CountingProbe {
    pub samples: AtomicUsize,
}

impl MemoryProbe for CountingProbe {
    fn rss_mb(&self) -> Option<u64> {
        self.samples.fetch_add(1, Ordering::SeqCst);
        Some(50)
    }
}

pub fn ai_config() -> AiConfig {
    AiConfig {
        api_url: "https://llm.test/v1/chat/completions".into(),
        api_key: "sk-test".into(),
        model_name: "test-model".into(),
        ..Default::default()
    }
}

/// Defaults with inter-batch delays and memory pauses removed.
pub fn fast_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.tasks.batch_delay_ms = 0;
    cfg.memory_pressure.high_pause_ms = 0;
    cfg.memory_pressure.critical_pause_ms = 0;
    cfg
}

pub fn urls(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("https://{prefix}{i}.test")).collect()
}

pub fn processor(
    cfg: &AppConfig,
    fetcher: Arc<MockFetcher>,
    classifier: Arc<MockClassifier>,
) -> BatchProcessor {
    let registry = TaskRegistry::new(&cfg.tasks);
    BatchProcessor::new(registry, fetcher, classifier, cfg).with_probe(Arc::new(FixedProbe(Some(50))))
}
