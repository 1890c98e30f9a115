//! HTTP服务器生命周期管理

use super::{
    middleware::{create_middleware_stack, create_trace_layer, request_logger},
    routes::create_router,
    AppState, Services,
};
use crate::commands::cli::ServeArgs;
use crate::events::spawn_event_logger;
use axum::middleware;
use prospector_core::api::{spawn_sweeper, AppConfig, CliError};
use prospector_plugins::factory::{build_classifier, build_crawler, build_store};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

/// HTTP服务器配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout: Duration,
    pub cors_origins: Vec<String>,
}

/// 根据配置构建抓取器、模型客户端与存储后端
pub fn build_services(cfg: &AppConfig) -> Result<Services, CliError> {
    let crawler = build_crawler(cfg).map_err(|e| CliError::Config(format!("crawler: {e}")))?;
    let chat = build_classifier(cfg).map_err(|e| CliError::Config(format!("classifier: {e}")))?;
    let store = build_store(&cfg.storage, |key| std::env::var(key).ok())
        .map_err(|e| CliError::Config(format!("storage: {e}")))?;

    Ok(Services {
        fetcher: crawler,
        classifier: chat.clone(),
        extractor: chat,
        store,
    })
}

/// 处理 serve 命令
pub async fn handle_serve(args: ServeArgs, cfg: AppConfig) -> Result<(), CliError> {
    let session_id = Uuid::new_v4().to_string();

    // CLI 参数优先，配置文件作为默认值
    let config = ServerConfig {
        host: args.host.unwrap_or_else(|| cfg.http_server.host.clone()),
        port: args.port.unwrap_or(cfg.http_server.port),
        request_timeout: Duration::from_secs(cfg.http_server.request_timeout_secs.max(1)),
        cors_origins: cfg.http_server.cors_origins.clone(),
    };

    let services = build_services(&cfg)?;
    let sweep_interval = cfg.tasks.cleanup_interval();

    let (shutdown_tx, _) = broadcast::channel(4);
    let state = AppState::new(session_id.clone(), services, cfg, shutdown_tx.clone());

    let _events = spawn_event_logger(state.registry.subscribe());
    let sweeper = spawn_sweeper(state.registry.clone(), sweep_interval, shutdown_tx.subscribe());

    let registry = state.registry.clone();
    let served = start_server(session_id, config, state).await;

    // Ctrl+C / SIGTERM 路径下清理任务还没收到信号
    let _ = shutdown_tx.send(());
    if let Err(e) = sweeper.await {
        warn!("sweeper task ended abnormally: {e}");
    }

    let summary = registry.summary().await;
    if summary.pending + summary.running > 0 {
        warn!(
            pending = summary.pending,
            running = summary.running,
            "unfinished tasks are dropped on shutdown"
        );
    }

    served.map_err(|e| CliError::Command(e.to_string()))
}

/// 启动HTTP服务器，直到收到关闭信号
pub async fn start_server(
    session_id: String,
    config: ServerConfig,
    state: AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!(
        "Starting HTTP server on {}:{} (session: {})",
        config.host, config.port, session_id
    );

    let mut shutdown_rx = state.shutdown_tx.subscribe();

    let app = create_router(state)
        .layer(middleware::from_fn(request_logger))
        .layer(create_trace_layer())
        .layer(create_middleware_stack(
            config.request_timeout,
            config.cors_origins.clone(),
        ));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = signal::ctrl_c() => {
                    info!("Received Ctrl+C signal");
                }
                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal from API");
                }
                _ = wait_for_sigterm() => {
                    info!("Received SIGTERM signal");
                }
            }

            info!("Starting graceful shutdown...");
        })
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// 等待 SIGTERM 信号（Unix系统）
#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!("Failed to setup SIGTERM handler: {e}");
            std::future::pending::<()>().await
        }
    }
}

/// Windows 系统不支持 SIGTERM
#[cfg(not(unix))]
async fn wait_for_sigterm() {
    std::future::pending::<()>().await
}
