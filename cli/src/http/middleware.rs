//! HTTP中间件配置

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{header, HeaderName, HeaderValue, Method, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// 超过该耗时的请求（通常是内联的抓取 / 模型调用）记为慢请求
const SLOW_REQUEST: Duration = Duration::from_secs(30);

/// 创建中间件栈
pub fn create_middleware_stack(
    request_timeout: Duration,
    cors_origins: Vec<String>,
) -> tower::layer::util::Stack<CorsLayer, TimeoutLayer> {
    tower::layer::util::Stack::new(
        create_cors_layer(cors_origins),
        TimeoutLayer::new(request_timeout),
    )
}

/// 按配置的 origin 前缀放行，供本地前端调用
fn create_cors_layer(origins: Vec<String>) -> CorsLayer {
    let origins = Arc::new(origins);
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin
                .to_str()
                .map(|s| origin_allowed(&origins, s))
                .unwrap_or(false)
        }))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        // 导出接口通过 Content-Disposition 给出文件名
        .expose_headers([header::CONTENT_DISPOSITION, REQUEST_ID_HEADER])
        .max_age(Duration::from_secs(600))
}

/// `http://localhost` 匹配 `http://localhost:3000`，但不匹配 `http://localhost.evil.test`
fn origin_allowed(allowed: &[String], origin: &str) -> bool {
    allowed.iter().any(|prefix| {
        let prefix = prefix.trim_end_matches('/');
        match origin.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with(':'),
            None => false,
        }
    })
}

/// span 只在 debug 级别输出，请求摘要由 `request_logger` 负责
pub fn create_trace_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::DEBUG))
}

/// 请求日志中间件：按路由模板记录，并回写 x-request-id
pub async fn request_logger(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "<unmatched>".to_string());
    let request_id = req
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let start = Instant::now();

    let mut response = next.run(req).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16();
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    if response.status().is_client_error() || response.status().is_server_error() {
        warn!(
            target: "prospector.http",
            request_id = %request_id,
            method = %method,
            route = %route,
            status,
            duration_ms = elapsed.as_millis() as u64,
            "request failed"
        );
    } else if elapsed >= SLOW_REQUEST {
        warn!(
            target: "prospector.http",
            request_id = %request_id,
            method = %method,
            route = %route,
            status,
            duration_ms = elapsed.as_millis() as u64,
            "slow request"
        );
    } else {
        info!(
            target: "prospector.http",
            request_id = %request_id,
            method = %method,
            route = %route,
            status,
            duration_ms = elapsed.as_millis() as u64,
            "request completed"
        );
    }

    response
}
