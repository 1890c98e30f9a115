//! 基础请求验证逻辑

use super::models::HttpServerError;

const MAX_URLS_PER_REQUEST: usize = 10_000;
const MAX_CONTENT_CHARS: usize = 100_000;
const MAX_KEY_CHARS: usize = 200;

/// 清理URL列表：去掉空白行，保留顺序
pub fn validate_urls(urls: &[String]) -> Result<Vec<String>, HttpServerError> {
    let cleaned: Vec<String> = urls
        .iter()
        .map(|u| u.trim())
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .collect();

    if cleaned.is_empty() {
        return Err(HttpServerError::InvalidRequest(
            "urls cannot be empty".to_string(),
        ));
    }
    if cleaned.len() > MAX_URLS_PER_REQUEST {
        return Err(HttpServerError::InvalidRequest(format!(
            "too many urls ({}, max {MAX_URLS_PER_REQUEST})",
            cleaned.len()
        )));
    }
    Ok(cleaned)
}

/// 验证taskId格式（仅允许字母数字、连字符）
pub fn validate_task_id(task_id: Option<&str>) -> Result<String, HttpServerError> {
    let task_id = task_id.map(str::trim).unwrap_or_default();
    if task_id.is_empty() {
        return Err(HttpServerError::InvalidRequest(
            "taskId is required".to_string(),
        ));
    }
    if task_id.len() > 100 {
        return Err(HttpServerError::InvalidRequest(format!(
            "taskId too long ({} chars, max 100)",
            task_id.len()
        )));
    }
    if !task_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(HttpServerError::InvalidRequest(
            "taskId can only contain alphanumeric and hyphen characters".to_string(),
        ));
    }
    Ok(task_id.to_string())
}

pub fn validate_content(content: &str) -> Result<(), HttpServerError> {
    if content.trim().is_empty() {
        return Err(HttpServerError::InvalidRequest(
            "content cannot be empty".to_string(),
        ));
    }
    let chars = content.chars().count();
    if chars > MAX_CONTENT_CHARS {
        return Err(HttpServerError::InvalidRequest(format!(
            "content too long ({chars} chars, max {MAX_CONTENT_CHARS})"
        )));
    }
    Ok(())
}

pub fn validate_storage_key(key: &str) -> Result<(), HttpServerError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(HttpServerError::InvalidRequest(
            "key cannot be empty".to_string(),
        ));
    }
    if key.chars().count() > MAX_KEY_CHARS {
        return Err(HttpServerError::InvalidRequest(format!(
            "key too long (max {MAX_KEY_CHARS} chars)"
        )));
    }
    Ok(())
}
