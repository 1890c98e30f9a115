//! HTTP路由handlers

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, Utc};
use prospector_core::api::{
    build_export, export_filename, items_from_task, CreateOutcome, ExportDocument, ExportFormat,
    Stage, TaskKind,
};
use prospector_plugins::crawl::{ProxyPool, DEFAULT_PROXY_TEST_URL};

use crate::http::{
    models::*,
    state::AppState,
    validation::{validate_content, validate_storage_key, validate_task_id, validate_urls},
};

/// 创建所有路由
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/background-task",
            post(background_task_handler).get(background_task_query_handler),
        )
        .route(
            "/api/background-task/:task_id/export",
            get(export_task_handler),
        )
        .route("/api/crawl", post(crawl_handler))
        .route("/api/analyze", post(analyze_handler))
        .route("/api/extract-company-info", post(extract_company_info_handler))
        .route("/api/extract-emails", post(extract_emails_handler))
        .route("/api/test-api", post(test_api_handler))
        .route("/api/test-proxy", post(test_proxy_handler))
        .route(
            "/api/storage",
            post(storage_save_handler).get(storage_load_handler),
        )
        .route("/api/export", post(export_handler))
        .route("/health", get(health_handler))
        .route("/api/shutdown", post(shutdown_handler))
        .with_state(state)
}

/// 失败时计入错误统计
fn tracked<T>(state: &AppState, result: Result<T, HttpServerError>) -> Result<T, HttpServerError> {
    if result.is_err() {
        state.record_error();
    }
    result
}

fn json_attachment(doc: ExportDocument) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", export_filename(Utc::now()));
    ([(header::CONTENT_DISPOSITION, disposition)], Json(doc)).into_response()
}

/// POST /api/background-task - 按 action 分发
async fn background_task_handler(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<BackgroundTaskRequest>,
) -> Result<Response, HttpServerError> {
    state.record_request("/api/background-task");
    let result = dispatch_task_action(&state, req).await;
    tracked(&state, result)
}

async fn dispatch_task_action(
    state: &AppState,
    req: BackgroundTaskRequest,
) -> Result<Response, HttpServerError> {
    let registry = &state.registry;
    match req.action.as_str() {
        "create" => {
            let urls = validate_urls(&req.urls)?;
            let kind = req.kind.unwrap_or(TaskKind::Classify);
            let outcome = registry.create(urls, kind, req.config).await?;

            let response = match outcome {
                CreateOutcome::Created {
                    task_id,
                    total_urls,
                } => {
                    // 处理在后台运行，请求立即返回
                    drop(state.processor.spawn(task_id.clone()));
                    CreateTaskResponse {
                        message: format!("Background task created, processing {total_urls} urls"),
                        task_id,
                        status: "created",
                        total_urls,
                    }
                }
                CreateOutcome::AddedToExisting {
                    task_id,
                    added,
                    total_urls,
                } => CreateTaskResponse {
                    message: format!("Added {added} urls to the active task ({total_urls} total)"),
                    task_id,
                    status: "added_to_existing",
                    total_urls,
                },
            };
            Ok(Success::new(response).into_response())
        }
        "status" => {
            let id = validate_task_id(req.task_id.as_deref())?;
            Ok(Success::new(registry.status(&id).await?).into_response())
        }
        "results" => {
            let id = validate_task_id(req.task_id.as_deref())?;
            Ok(Success::new(registry.results(&id).await?).into_response())
        }
        "realtime-status" | "realtime" => {
            let id = validate_task_id(req.task_id.as_deref())?;
            Ok(Success::new(registry.realtime(&id).await?).into_response())
        }
        "config-check" => {
            let id = validate_task_id(req.task_id.as_deref())?;
            Ok(Success::new(registry.config_status(&id).await?).into_response())
        }
        "cancel" => {
            let id = validate_task_id(req.task_id.as_deref())?;
            let cancelled = registry.cancel(&id).await?;
            let message = if cancelled {
                "Task cancelled".to_string()
            } else {
                "Task already finished".to_string()
            };
            Ok(Success::new(CancelResponse {
                task_id: id,
                cancelled,
                message,
            })
            .into_response())
        }
        "list" => Ok(Success::new(ListResponse {
            tasks: registry.list().await,
            summary: registry.summary().await,
        })
        .into_response()),
        "cleanup" => {
            let removed = registry
                .cleanup_completed_older_than(state.config.tasks.manual_cleanup_age(), Utc::now())
                .await;
            Ok(Success::new(CleanupResponse {
                removed,
                remaining: registry.len().await,
                message: format!("Removed {removed} completed tasks"),
            })
            .into_response())
        }
        other => Err(HttpServerError::InvalidRequest(format!(
            "unknown action: {other}"
        ))),
    }
}

/// GET /api/background-task[?taskId=] - 单个任务状态或全部任务
async fn background_task_query_handler(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> Result<Response, HttpServerError> {
    state.record_request("/api/background-task");

    let result = match query.task_id {
        Some(id) => match validate_task_id(Some(&id)) {
            Ok(id) => state
                .registry
                .status(&id)
                .await
                .map(|s| Success::new(s).into_response())
                .map_err(HttpServerError::from),
            Err(e) => Err(e),
        },
        None => Ok(Success::new(ListResponse {
            tasks: state.registry.list().await,
            summary: state.registry.summary().await,
        })
        .into_response()),
    };
    tracked(&state, result)
}

/// GET /api/background-task/{id}/export - 导出任务结果
async fn export_task_handler(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Response, HttpServerError> {
    state.record_request("/api/background-task/export");

    let result = async {
        let id = validate_task_id(Some(&task_id))?;
        let task = state.registry.get(&id).await?;
        let doc = build_export(ExportFormat::Json, items_from_task(&task), Utc::now())?;
        Ok::<_, HttpServerError>(json_attachment(doc))
    }
    .await;
    tracked(&state, result)
}

/// POST /api/crawl - 抓取单个站点
async fn crawl_handler(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CrawlRequest>,
) -> Result<Response, HttpServerError> {
    state.record_request("/api/crawl");

    let url = req.url.trim();
    if url.is_empty() {
        state.record_error();
        return Err(HttpServerError::InvalidRequest("url cannot be empty".into()));
    }

    let result = state
        .services
        .fetcher
        .crawl(url)
        .await
        .map(|site| Success::new(site).into_response())
        .map_err(|e| HttpServerError::from(e).at_stage(Stage::Crawling));
    tracked(&state, result)
}

/// POST /api/analyze - 对已抓取内容做 Y/N 判定
async fn analyze_handler(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AnalyzeRequest>,
) -> Result<Response, HttpServerError> {
    state.record_request("/api/analyze");

    let result = state
        .services
        .classifier
        .classify(&req.config, &req.crawled_content)
        .await
        .map(|c| Success::new(c).into_response())
        .map_err(|e| HttpServerError::from(e).at_stage(Stage::AiAnalysis));
    tracked(&state, result)
}

/// POST /api/extract-company-info
async fn extract_company_info_handler(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ContentRequest>,
) -> Result<Response, HttpServerError> {
    state.record_request("/api/extract-company-info");

    let result = async {
        validate_content(&req.content)?;
        let company_info = state
            .services
            .extractor
            .extract_company_info(&req.config, &req.content)
            .await
            .map_err(|e| HttpServerError::from(e).at_stage(Stage::InfoExtraction))?;
        Ok::<_, HttpServerError>(Success::new(CompanyInfoResponse { company_info }).into_response())
    }
    .await;
    tracked(&state, result)
}

/// POST /api/extract-emails
async fn extract_emails_handler(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ContentRequest>,
) -> Result<Response, HttpServerError> {
    state.record_request("/api/extract-emails");

    let result = async {
        validate_content(&req.content)?;
        let emails = state
            .services
            .extractor
            .extract_emails(&req.config, &req.content)
            .await
            .map_err(|e| HttpServerError::from(e).at_stage(Stage::InfoExtraction))?;
        Ok::<_, HttpServerError>(Success::new(EmailsResponse {
            count: emails.len(),
            emails,
        })
        .into_response())
    }
    .await;
    tracked(&state, result)
}

/// POST /api/test-api - 连通性测试
async fn test_api_handler(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<TestApiRequest>,
) -> Result<Response, HttpServerError> {
    state.record_request("/api/test-api");

    let result = state
        .services
        .classifier
        .check_connection(&req.config)
        .await
        .map(|check| Success::new(check).into_response())
        .map_err(HttpServerError::from);
    tracked(&state, result)
}

/// POST /api/test-proxy - 代理可用性检测
async fn test_proxy_handler(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<TestProxyRequest>,
) -> Result<Response, HttpServerError> {
    state.record_request("/api/test-proxy");

    let test_url = req
        .test_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or(DEFAULT_PROXY_TEST_URL)
        .to_string();

    let result = match (req.proxy, req.proxies) {
        (Some(proxy), _) => {
            let result = ProxyPool::test(&proxy, &test_url).await;
            Ok(Success::new(ProxyCheckResponse { result }).into_response())
        }
        (None, Some(proxies)) if !proxies.is_empty() => {
            let results = ProxyPool::test_all(&proxies, &test_url).await;
            Ok(Success::new(ProxyChecksResponse { results }).into_response())
        }
        _ => Err(HttpServerError::InvalidRequest(
            "proxy or proxies is required".into(),
        )),
    };
    tracked(&state, result)
}

/// POST /api/storage - 保存
async fn storage_save_handler(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<StorageSaveRequest>,
) -> Result<Response, HttpServerError> {
    state.record_request("/api/storage");

    let result = async {
        if req.action != "save" {
            return Err(HttpServerError::InvalidRequest(format!(
                "unknown storage action: {}",
                req.action
            )));
        }
        validate_storage_key(&req.key)?;
        state
            .services
            .store
            .save(req.key.trim(), req.data)
            .await
            .map_err(HttpServerError::storage)?;
        Ok::<_, HttpServerError>(Success::new(MessageResponse {
            message: format!("Saved to {} storage", state.services.store.name()),
        })
        .into_response())
    }
    .await;
    tracked(&state, result)
}

/// GET /api/storage?key= - 读取
async fn storage_load_handler(
    State(state): State<AppState>,
    Query(query): Query<StorageQuery>,
) -> Result<Response, HttpServerError> {
    state.record_request("/api/storage");

    let result = async {
        let key = query.key.unwrap_or_default();
        validate_storage_key(&key)?;
        let key = key.trim().to_string();
        let data = state
            .services
            .store
            .load(&key)
            .await
            .map_err(HttpServerError::storage)?;
        Ok::<_, HttpServerError>(Success::new(StorageLoadResponse {
            key,
            found: data.is_some(),
            data,
        })
        .into_response())
    }
    .await;
    tracked(&state, result)
}

/// POST /api/export - 导出调用方提供的行
async fn export_handler(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ExportRequest>,
) -> Result<Response, HttpServerError> {
    state.record_request("/api/export");

    let result = async {
        let format: ExportFormat = req.format.parse()?;
        let doc = build_export(format, req.data, Utc::now())?;
        Ok::<_, HttpServerError>(json_attachment(doc))
    }
    .await;
    tracked(&state, result)
}

/// GET /health - 健康检查
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let summary = state.registry.summary().await;
    let (uptime_seconds, requests_handled) = {
        let stats = state.stats.read().unwrap_or_else(|e| e.into_inner());
        (stats.uptime_seconds(), stats.requests_total)
    };

    Json(HealthResponse {
        status: "healthy".into(),
        session_id: state.session_id.clone(),
        uptime_seconds,
        requests_handled,
        active_tasks: summary.pending + summary.running,
        storage: state.services.store.name().to_string(),
        timestamp: Local::now().to_rfc3339(),
    })
}

/// POST /api/shutdown - 触发优雅关闭
async fn shutdown_handler(State(state): State<AppState>) -> Json<Success<MessageResponse>> {
    tracing::info!(target: "prospector.http", "shutdown requested via API");
    let _ = state.shutdown_tx.send(());
    Success::new(MessageResponse {
        message: "Server is shutting down".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::state::Services;
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use pretty_assertions::assert_eq;
    use prospector_core::api::{
        AiConfig, AppConfig, Classification, ClassifyError, CompanyInfo, ConnectionCheck,
        CrawledSite, EmailInfo, FetchError, InfoExtractor, SiteClassifier, SiteFetcher, Verdict,
    };
    use prospector_plugins::storage::MemoryStore;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tokio::sync::broadcast;
    use tower::ServiceExt;

    struct StubPipeline;

    #[async_trait]
    impl SiteFetcher for StubPipeline {
        fn name(&self) -> &str {
            "stub"
        }

        async fn crawl(&self, url: &str) -> Result<CrawledSite, FetchError> {
            if url.contains("timeout") {
                return Err(FetchError::Timeout { timeout_ms: 10 });
            }
            Ok(CrawledSite {
                url: url.to_string(),
                title: "Acme".into(),
                content: "We build pumps".into(),
                ..Default::default()
            })
        }
    }

    #[async_trait]
    impl SiteClassifier for StubPipeline {
        fn name(&self) -> &str {
            "stub"
        }

        async fn classify(
            &self,
            config: &AiConfig,
            _site: &CrawledSite,
        ) -> Result<Classification, ClassifyError> {
            if !config.has_api_key() {
                return Err(ClassifyError::MissingConfig("apiKey".into()));
            }
            Ok(Classification {
                result: Verdict::Yes,
                reason: "sells pumps".into(),
                confidence: None,
            })
        }

        async fn check_connection(
            &self,
            config: &AiConfig,
        ) -> Result<ConnectionCheck, ClassifyError> {
            Ok(ConnectionCheck {
                model: config.model_name.clone(),
                response_time_ms: 3,
                reply: "OK".into(),
            })
        }
    }

    #[async_trait]
    impl InfoExtractor for StubPipeline {
        async fn extract_company_info(
            &self,
            _config: &AiConfig,
            content: &str,
        ) -> Result<CompanyInfo, ClassifyError> {
            if content.contains("silent") {
                return Err(ClassifyError::EmptyResponse);
            }
            Ok(CompanyInfo {
                primary_name: "Acme".into(),
                ..Default::default()
            })
        }

        async fn extract_emails(
            &self,
            _config: &AiConfig,
            _content: &str,
        ) -> Result<Vec<EmailInfo>, ClassifyError> {
            Ok(vec![EmailInfo {
                email: "sales@acme.test".into(),
                source: None,
                context: None,
            }])
        }
    }

    fn state() -> AppState {
        let stub = Arc::new(StubPipeline);
        let services = Services {
            fetcher: stub.clone(),
            classifier: stub.clone(),
            extractor: stub,
            store: Arc::new(MemoryStore::new()),
        };
        let (shutdown_tx, _) = broadcast::channel(1);
        AppState::new("test-session".into(), services, AppConfig::default(), shutdown_tx)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_create_then_status() {
        let app = create_router(state());
        let (status, body) = call(
            &app,
            "POST",
            "/api/background-task",
            Some(json!({"action": "create", "type": "crawl", "urls": ["https://a.test", " "]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "created");
        assert_eq!(body["totalUrls"], 1);

        let task_id = body["taskId"].as_str().unwrap().to_string();
        let (status, body) = call(
            &app,
            "POST",
            "/api/background-task",
            Some(json!({"action": "status", "taskId": task_id})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["taskId"], task_id);
    }

    #[tokio::test]
    async fn test_unknown_task_is_404() {
        let app = create_router(state());
        let (status, body) = call(
            &app,
            "POST",
            "/api/background-task",
            Some(json!({"action": "results", "taskId": "does-not-exist"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["errorCode"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_bad_actions_are_400() {
        let app = create_router(state());
        let (status, body) = call(
            &app,
            "POST",
            "/api/background-task",
            Some(json!({"action": "explode"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errorCode"], "INVALID_REQUEST");

        let (status, _) = call(
            &app,
            "POST",
            "/api/background-task",
            Some(json!({"action": "create", "urls": []})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_and_cleanup() {
        let app = create_router(state());
        let (status, body) = call(&app, "GET", "/api/background-task", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tasks"], json!([]));
        assert_eq!(body["summary"]["total"], 0);

        let (status, body) = call(
            &app,
            "POST",
            "/api/background-task",
            Some(json!({"action": "cleanup"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["removed"], 0);
    }

    #[tokio::test]
    async fn test_crawl_timeout_maps_to_502() {
        let app = create_router(state());
        let (status, body) = call(
            &app,
            "POST",
            "/api/crawl",
            Some(json!({"url": "https://timeout.test"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["errorCode"], "TIMEOUT_ERROR");
        assert_eq!(body["errorDetails"]["retryable"], true);

        let (status, body) = call(&app, "POST", "/api/crawl", Some(json!({"url": "acme.test"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Acme");
    }

    #[tokio::test]
    async fn test_analyze_and_missing_key() {
        let app = create_router(state());
        let site = json!({"url": "https://a.test", "title": "A", "content": "pumps"});
        let (status, body) = call(
            &app,
            "POST",
            "/api/analyze",
            Some(json!({"config": {"apiKey": "sk", "apiUrl": "u", "modelName": "m"}, "crawledContent": site})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], "Y");
        assert_eq!(body["reason"], "sells pumps");

        let (status, _) = call(
            &app,
            "POST",
            "/api/analyze",
            Some(json!({"config": {}, "crawledContent": site})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_extraction_routes() {
        let app = create_router(state());
        let (status, body) = call(
            &app,
            "POST",
            "/api/extract-company-info",
            Some(json!({"content": "Acme Ltd", "config": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["companyInfo"]["primaryName"], "Acme");

        let (status, body) = call(
            &app,
            "POST",
            "/api/extract-emails",
            Some(json!({"content": "mail sales@acme.test", "config": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);

        let (status, _) = call(
            &app,
            "POST",
            "/api/extract-emails",
            Some(json!({"content": "", "config": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(
            &app,
            "POST",
            "/api/extract-company-info",
            Some(json!({"content": "silent model", "config": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["errorCode"], "AI_ERROR");
        assert_eq!(body["errorDetails"]["stage"], "info_extraction");
    }

    #[tokio::test]
    async fn test_malformed_bodies_use_error_envelope() {
        let app = create_router(state());
        let req = Request::builder()
            .method("POST")
            .uri("/api/crawl")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["errorCode"], "INVALID_REQUEST");

        let (status, body) = call(
            &app,
            "POST",
            "/api/background-task",
            Some(json!({"action": "create", "type": "sideways", "urls": ["https://a.test"]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errorCode"], "INVALID_REQUEST");
        assert!(body["error"].as_str().unwrap().contains("sideways"));
    }

    #[tokio::test]
    async fn test_proxy_checks() {
        let mut upstream = mockito::Server::new_async().await;
        let _m = upstream
            .mock("GET", "/ip")
            .with_status(200)
            .expect_at_least(1)
            .create_async()
            .await;
        let app = create_router(state());

        let (status, body) = call(
            &app,
            "POST",
            "/api/test-proxy",
            Some(json!({"proxy": {"url": upstream.url()}, "testUrl": "http://target.test/ip"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["status"], "working");
        assert!(body["result"]["lastChecked"].is_string());

        let (status, body) = call(
            &app,
            "POST",
            "/api/test-proxy",
            Some(json!({
                "proxies": [{"url": upstream.url()}, {"url": "http://127.0.0.1:1"}],
                "testUrl": "http://target.test/ip"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"][0]["status"], "working");
        assert_eq!(body["results"][1]["status"], "failed");

        let (status, body) = call(&app, "POST", "/api/test-proxy", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errorCode"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_storage_round_trip() {
        let app = create_router(state());
        let (status, _) = call(
            &app,
            "POST",
            "/api/storage",
            Some(json!({"action": "save", "key": "results", "data": {"rows": 2}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, "GET", "/api/storage?key=results", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["found"], true);
        assert_eq!(body["data"], json!({"rows": 2}));

        let (_, body) = call(&app, "GET", "/api/storage?key=absent", None).await;
        assert_eq!(body["found"], false);
        assert_eq!(body["data"], Value::Null);
    }

    #[tokio::test]
    async fn test_export_formats() {
        let app = create_router(state());
        let req = Request::builder()
            .method("POST")
            .uri("/api/export")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"format": "json", "data": [{"url": "https://a.test", "result": "Y"}]})
                    .to_string(),
            ))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let disposition = resp.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.starts_with("attachment; filename=\"prospector-results-"));

        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let doc: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(doc["totalCount"], 1);
        assert_eq!(doc["data"][0]["index"], 1);

        let (status, _) = call(
            &app,
            "POST",
            "/api/export",
            Some(json!({"format": "csv", "data": []})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_and_shutdown() {
        let state = state();
        let mut rx = state.shutdown_tx.subscribe();
        let app = create_router(state);

        let (status, body) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["storage"], "memory");

        let (status, _) = call(&app, "POST", "/api/shutdown", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(rx.try_recv().is_ok());
    }
}
