//! HTTP服务器状态管理

use chrono::{DateTime, Local};
use prospector_core::api::{
    AppConfig, BatchProcessor, InfoExtractor, KvStore, SiteClassifier, SiteFetcher, TaskRegistry,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// 路由依赖的外部能力（抓取 / 模型 / 存储）
#[derive(Clone)]
pub struct Services {
    pub fetcher: Arc<dyn SiteFetcher>,
    pub classifier: Arc<dyn SiteClassifier>,
    pub extractor: Arc<dyn InfoExtractor>,
    pub store: Arc<dyn KvStore>,
}

/// 应用状态（在所有handlers间共享）
#[derive(Clone)]
pub struct AppState {
    pub session_id: String,
    pub registry: TaskRegistry,
    pub processor: BatchProcessor,
    pub services: Services,
    pub config: Arc<AppConfig>,
    pub stats: Arc<RwLock<ServerStats>>,
    pub shutdown_tx: broadcast::Sender<()>,
}

impl AppState {
    /// 注册表与批处理器在这里构造一次，之后所有 handler 共享同一份
    pub fn new(
        session_id: String,
        services: Services,
        config: AppConfig,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        let registry = TaskRegistry::new(&config.tasks);
        let processor = BatchProcessor::new(
            registry.clone(),
            services.fetcher.clone(),
            services.classifier.clone(),
            &config,
        );
        Self {
            session_id,
            registry,
            processor,
            services,
            config: Arc::new(config),
            stats: Arc::new(RwLock::new(ServerStats::new())),
            shutdown_tx,
        }
    }

    pub fn record_request(&self, endpoint: &str) {
        let mut stats = self.stats.write().unwrap_or_else(|e| e.into_inner());
        stats.increment_request(endpoint);
    }

    pub fn record_error(&self) {
        let mut stats = self.stats.write().unwrap_or_else(|e| e.into_inner());
        stats.increment_error();
    }
}

/// 服务器统计信息
pub struct ServerStats {
    pub requests_total: u64,
    pub requests_by_endpoint: HashMap<String, u64>,
    pub errors_total: u64,
    pub start_time: DateTime<Local>,
}

impl ServerStats {
    pub fn new() -> Self {
        Self {
            requests_total: 0,
            requests_by_endpoint: HashMap::new(),
            errors_total: 0,
            start_time: Local::now(),
        }
    }

    pub fn increment_request(&mut self, endpoint: &str) {
        self.requests_total += 1;
        *self
            .requests_by_endpoint
            .entry(endpoint.to_string())
            .or_insert(0) += 1;
    }

    pub fn increment_error(&mut self) {
        self.errors_total += 1;
    }

    pub fn uptime_seconds(&self) -> f64 {
        (Local::now() - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_stats_counts() {
        let mut stats = ServerStats::new();
        stats.increment_request("/api/background-task");
        stats.increment_request("/api/background-task");
        stats.increment_request("/health");
        stats.increment_error();

        assert_eq!(stats.requests_total, 3);
        assert_eq!(stats.requests_by_endpoint["/api/background-task"], 2);
        assert_eq!(stats.errors_total, 1);
        assert!(stats.uptime_seconds() < 1.0);
    }
}
