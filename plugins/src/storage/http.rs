use serde_json::Value;
use std::{error::Error as StdError, fmt};

const BODY_PREVIEW_LIMIT: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestHttpErrorKind {
    Timeout,
    Connect,
    Request,
    Body,
    Decode,
    Status,
    Unknown,
}

impl RestHttpErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Request => "request",
            Self::Body => "body",
            Self::Decode => "decode",
            Self::Status => "status",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RestHttpErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport failure talking to a cloud storage REST endpoint.
#[derive(Debug)]
pub struct RestHttpError {
    kind: RestHttpErrorKind,
    status: Option<u16>,
    url: Option<String>,
    message: String,
    source: Option<anyhow::Error>,
}

impl RestHttpError {
    pub fn kind(&self) -> RestHttpErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub(crate) fn from_reqwest(err: reqwest::Error, url: &str) -> Self {
        let kind = if err.is_timeout() {
            RestHttpErrorKind::Timeout
        } else if err.is_connect() {
            RestHttpErrorKind::Connect
        } else if err.is_request() {
            RestHttpErrorKind::Request
        } else if err.is_body() {
            RestHttpErrorKind::Body
        } else if err.is_decode() {
            RestHttpErrorKind::Decode
        } else {
            RestHttpErrorKind::Unknown
        };
        RestHttpError {
            kind,
            status: err.status().map(|s| s.as_u16()),
            url: Some(redact(url)),
            message: err.to_string(),
            source: Some(anyhow::Error::new(err)),
        }
    }

    fn status_error(status: u16, url: &str, preview: String) -> Self {
        RestHttpError {
            kind: RestHttpErrorKind::Status,
            status: Some(status),
            url: Some(redact(url)),
            message: preview,
            source: None,
        }
    }

    fn decode_error(status: u16, url: &str, err: serde_json::Error, preview: String) -> Self {
        RestHttpError {
            kind: RestHttpErrorKind::Decode,
            status: Some(status),
            url: Some(redact(url)),
            message: format!("failed to decode response body: {} | body={}", err, preview),
            source: Some(anyhow::Error::new(err)),
        }
    }
}

impl fmt::Display for RestHttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "storage http error kind={}", self.kind)?;
        if let Some(status) = self.status {
            write!(f, " status={}", status)?;
        }
        if let Some(url) = &self.url {
            write!(f, " url={}", url)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl StdError for RestHttpError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|err| &**err as &(dyn StdError + 'static))
    }
}

/// Drops the query string, which may carry credentials.
fn redact(url: &str) -> String {
    url.split('?').next().unwrap_or(url).to_string()
}

fn preview_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }
    let mut out: String = trimmed.chars().take(BODY_PREVIEW_LIMIT).collect();
    if trimmed.chars().count() > BODY_PREVIEW_LIMIT {
        out.push_str("...");
    }
    out
}

/// Reads the body, failing on non-2xx. An empty body decodes to `Value::Null`.
pub(crate) async fn parse_json_response(resp: reqwest::Response) -> anyhow::Result<Value> {
    let status = resp.status();
    let url = resp.url().to_string();
    let body = resp
        .text()
        .await
        .map_err(|err| RestHttpError::from_reqwest(err, &url))?;

    if !status.is_success() {
        return Err(RestHttpError::status_error(status.as_u16(), &url, preview_body(&body)).into());
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str::<Value>(&body).map_err(|err| {
        RestHttpError::decode_error(status.as_u16(), &url, err, preview_body(&body)).into()
    })
}

pub(crate) async fn ensure_success(resp: reqwest::Response) -> anyhow::Result<()> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let url = resp.url().to_string();
    let body = resp
        .text()
        .await
        .map_err(|err| RestHttpError::from_reqwest(err, &url))?;
    Err(RestHttpError::status_error(status.as_u16(), &url, preview_body(&body)).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_body_truncates() {
        assert_eq!(preview_body("   "), "<empty body>");
        let long = "x".repeat(BODY_PREVIEW_LIMIT + 10);
        let preview = preview_body(&long);
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), BODY_PREVIEW_LIMIT + 3);
    }

    #[test]
    fn test_display_includes_kind_status_and_redacted_url() {
        let err = RestHttpError::status_error(503, "https://kv.test/get/k?token=secret", "down".into());
        let text = err.to_string();
        assert_eq!(text, "storage http error kind=status status=503 url=https://kv.test/get/k: down");
        assert_eq!(err.kind(), RestHttpErrorKind::Status);
        assert_eq!(err.status(), Some(503));
    }
}
