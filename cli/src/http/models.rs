//! HTTP请求/响应数据模型

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use prospector_core::api::{
    AiConfig, ClassifyError, CompanyInfo, CrawledSite, EmailInfo, ExportError, ExportItem,
    FetchError, ProxyEntry, RegistrySummary, Stage, TaskError, TaskKind, TaskSummary,
};
use prospector_plugins::crawl::ProxyCheck;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 成功响应：`success: true` 加上展开的负载字段
#[derive(Debug, Serialize)]
pub struct Success<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> Success<T> {
    pub fn new(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

/// POST /api/background-task 请求
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundTaskRequest {
    pub action: String,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub config: AiConfig,
    #[serde(default, rename = "type")]
    pub kind: Option<TaskKind>,
}

/// GET /api/background-task 查询参数
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    #[serde(default)]
    pub task_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskResponse {
    pub task_id: String,
    pub status: &'static str,
    pub message: String,
    pub total_urls: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub task_id: String,
    pub cancelled: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResponse {
    pub removed: usize,
    pub remaining: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResponse {
    pub tasks: Vec<TaskSummary>,
    pub summary: RegistrySummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfoResponse {
    pub company_info: CompanyInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailsResponse {
    pub count: usize,
    pub emails: Vec<EmailInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StorageLoadResponse {
    pub key: String,
    pub found: bool,
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrawlRequest {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub config: AiConfig,
    pub crawled_content: CrawledSite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub config: AiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestApiRequest {
    #[serde(default)]
    pub config: AiConfig,
}

/// 单个 `proxy` 或批量 `proxies` 二选一
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestProxyRequest {
    #[serde(default)]
    pub proxy: Option<ProxyEntry>,
    #[serde(default)]
    pub proxies: Option<Vec<ProxyEntry>>,
    #[serde(default)]
    pub test_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProxyCheckResponse {
    pub result: ProxyCheck,
}

#[derive(Debug, Serialize)]
pub struct ProxyChecksResponse {
    pub results: Vec<ProxyCheck>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSaveRequest {
    #[serde(default = "default_storage_action")]
    pub action: String,
    pub key: String,
    #[serde(default)]
    pub data: Value,
}

fn default_storage_action() -> String {
    "save".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageQuery {
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub data: Vec<ExportItem>,
    #[serde(default = "default_export_format")]
    pub format: String,
}

fn default_export_format() -> String {
    "json".to_string()
}

/// GET /health 响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub session_id: String,
    pub uptime_seconds: f64,
    pub requests_handled: u64,
    pub active_tasks: usize,
    pub storage: String,
    pub timestamp: String,
}

/// JSON 请求体提取器，解析失败时返回统一的错误响应而不是 axum 的纯文本拒绝
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = HttpServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// HTTP服务器错误
#[derive(Debug)]
pub enum HttpServerError {
    InvalidRequest(String),
    NotFound(String),
    /// 上游（站点抓取 / 模型接口 / 云存储）失败
    Upstream {
        code: String,
        message: String,
        details: Option<Value>,
    },
    Internal(String),
}

impl IntoResponse for HttpServerError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            Self::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST".to_string(), msg, None)
            }
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND".to_string(), msg, None),
            Self::Upstream {
                code,
                message,
                details,
            } => (StatusCode::BAD_GATEWAY, code, message, details),
            Self::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR".to_string(),
                msg,
                None,
            ),
        };

        let mut body = serde_json::json!({
            "success": false,
            "error": message,
            "errorCode": error_code,
        });
        if let Some(details) = details {
            body["errorDetails"] = details;
        }

        (status, Json(body)).into_response()
    }
}

impl From<TaskError> for HttpServerError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::NotFound(id) => Self::NotFound(format!("task not found: {id}")),
            TaskError::EmptyUrls => Self::InvalidRequest("urls cannot be empty".into()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<FetchError> for HttpServerError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::InvalidUrl(_) => Self::InvalidRequest(err.to_string()),
            other => Self::Upstream {
                code: other.error_kind().as_str().to_ascii_uppercase(),
                details: Some(serde_json::json!({ "retryable": other.is_retryable() })),
                message: other.to_string(),
            },
        }
    }
}

impl From<ClassifyError> for HttpServerError {
    fn from(err: ClassifyError) -> Self {
        match err {
            ClassifyError::MissingConfig(_) => Self::InvalidRequest(err.to_string()),
            other => Self::Upstream {
                code: other.error_kind().as_str().to_ascii_uppercase(),
                details: Some(serde_json::json!({ "retryable": other.is_retryable() })),
                message: other.to_string(),
            },
        }
    }
}

impl From<JsonRejection> for HttpServerError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<ExportError> for HttpServerError {
    fn from(err: ExportError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

impl HttpServerError {
    /// 在上游错误的 errorDetails 中标注失败所处的处理阶段
    pub fn at_stage(self, stage: Stage) -> Self {
        match self {
            Self::Upstream {
                code,
                message,
                details,
            } => {
                let mut details = details.unwrap_or_else(|| serde_json::json!({}));
                if let Some(obj) = details.as_object_mut() {
                    obj.insert("stage".into(), Value::String(stage.as_str().into()));
                }
                Self::Upstream {
                    code,
                    message,
                    details: Some(details),
                }
            }
            other => other,
        }
    }

    pub fn storage(err: anyhow::Error) -> Self {
        Self::Upstream {
            code: "STORAGE_ERROR".into(),
            message: err.to_string(),
            details: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_task_request_create() {
        let json = r#"{
            "action": "create",
            "urls": ["https://a.test"],
            "type": "crawl",
            "config": {"apiUrl": "https://llm.test/v1", "apiKey": "sk", "modelName": "m"}
        }"#;
        let req: BackgroundTaskRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.action, "create");
        assert_eq!(req.kind, Some(TaskKind::CrawlOnly));
        assert_eq!(req.config.api_key, "sk");
        assert!(req.task_id.is_none());
    }

    #[test]
    fn test_background_task_request_status() {
        let json = r#"{"action":"status","taskId":"abc"}"#;
        let req: BackgroundTaskRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.task_id.as_deref(), Some("abc"));
        assert!(req.urls.is_empty());
        assert!(req.kind.is_none());
    }

    #[test]
    fn test_export_request_defaults_to_json() {
        let req: ExportRequest = serde_json::from_str(r#"{"data":[{"url":"https://a.test"}]}"#).unwrap();
        assert_eq!(req.format, "json");
        assert_eq!(req.data.len(), 1);
    }

    #[test]
    fn test_success_flattens_payload() {
        let Json(body) = Success::new(CancelResponse {
            task_id: "t1".into(),
            cancelled: true,
            message: "ok".into(),
        });
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["success"], true);
        assert_eq!(v["taskId"], "t1");
    }

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            HttpServerError::from(TaskError::NotFound("x".into())),
            HttpServerError::NotFound(_)
        ));
        assert!(matches!(
            HttpServerError::from(ClassifyError::MissingConfig("apiKey".into())),
            HttpServerError::InvalidRequest(_)
        ));
        match HttpServerError::from(FetchError::Timeout { timeout_ms: 100 }) {
            HttpServerError::Upstream { code, details, .. } => {
                assert_eq!(code, "TIMEOUT_ERROR");
                assert_eq!(details, Some(serde_json::json!({"retryable": true})));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_stage_is_added_to_upstream_details() {
        let err = HttpServerError::from(ClassifyError::EmptyResponse).at_stage(Stage::InfoExtraction);
        match err {
            HttpServerError::Upstream { details, .. } => {
                let details = details.unwrap();
                assert_eq!(details["stage"], "info_extraction");
                assert_eq!(details["retryable"], false);
            }
            other => panic!("unexpected {other:?}"),
        }

        let err = HttpServerError::InvalidRequest("x".into()).at_stage(Stage::Crawling);
        assert!(matches!(err, HttpServerError::InvalidRequest(_)));
    }
}
