//! Typed failures raised by the crawl and classification steps.
//!
//! The `ErrorKind` of a record is decided here, where the failure is produced, never by
//! inspecting message text afterwards.

use thiserror::Error;

use super::kind::ErrorKind;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("cannot connect to host: {0}")]
    ConnectionRefused(String),
    #[error("access forbidden (403)")]
    Forbidden,
    #[error("page not found (404)")]
    NotFound,
    #[error("server error ({0})")]
    ServerError(u16),
    #[error("unexpected http status {0}")]
    HttpStatus(u16),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("no extractable content")]
    NoContent,
    #[error("fetch failed: {0}")]
    Unknown(String),
}

impl FetchError {
    /// Maps a non-success HTTP status to its failure variant.
    pub fn from_status(status: u16) -> Self {
        match status {
            403 => Self::Forbidden,
            404 => Self::NotFound,
            s if s >= 500 => Self::ServerError(s),
            s => Self::HttpStatus(s),
        }
    }

    pub fn error_kind(&self) -> ErrorKind {
        match self {
            Self::Timeout { .. } => ErrorKind::TimeoutError,
            Self::ConnectionRefused(_) => ErrorKind::NetworkError,
            Self::Forbidden
            | Self::NotFound
            | Self::ServerError(_)
            | Self::HttpStatus(_)
            | Self::InvalidUrl(_)
            | Self::NoContent
            | Self::Unknown(_) => ErrorKind::CrawlError,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::ConnectionRefused(_) | Self::ServerError(_) => true,
            Self::HttpStatus(status) => *status == 429,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("API key is invalid or expired (401)")]
    InvalidKey,
    #[error("API rate limit exceeded (429), retry later")]
    RateLimited,
    #[error("bad request (400), check model name and API url: {0}")]
    BadRequest(String),
    #[error("AI request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("missing configuration: {0}")]
    MissingConfig(String),
    #[error("AI endpoint returned an empty response")]
    EmptyResponse,
    #[error("AI endpoint returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("AI request failed: {0}")]
    Transport(String),
    #[error("cannot parse AI response: {0}")]
    Parse(String),
}

impl ClassifyError {
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => Self::InvalidKey,
            429 => Self::RateLimited,
            400 => Self::BadRequest(message),
            _ => Self::Status { status, message },
        }
    }

    pub fn error_kind(&self) -> ErrorKind {
        match self {
            Self::Timeout { .. } => ErrorKind::TimeoutError,
            Self::MissingConfig(_) => ErrorKind::ConfigError,
            Self::Transport(_) => ErrorKind::NetworkError,
            Self::InvalidKey
            | Self::RateLimited
            | Self::BadRequest(_)
            | Self::EmptyResponse
            | Self::Status { .. }
            | Self::Parse(_) => ErrorKind::AiError,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::RateLimited | Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_status_mapping() {
        assert_eq!(FetchError::from_status(403), FetchError::Forbidden);
        assert_eq!(FetchError::from_status(404), FetchError::NotFound);
        assert_eq!(FetchError::from_status(503), FetchError::ServerError(503));
        assert_eq!(FetchError::from_status(418), FetchError::HttpStatus(418));
    }

    #[test]
    fn test_fetch_error_kinds() {
        assert_eq!(
            FetchError::Timeout { timeout_ms: 15_000 }.error_kind(),
            ErrorKind::TimeoutError
        );
        assert_eq!(
            FetchError::ConnectionRefused("example.com".into()).error_kind(),
            ErrorKind::NetworkError
        );
        assert_eq!(FetchError::NotFound.error_kind(), ErrorKind::CrawlError);
        assert!(FetchError::ServerError(502).is_retryable());
        assert!(FetchError::HttpStatus(429).is_retryable());
        assert!(!FetchError::Forbidden.is_retryable());
    }

    #[test]
    fn test_classify_error_kinds() {
        assert_eq!(
            ClassifyError::from_status(401, String::new()),
            ClassifyError::InvalidKey
        );
        assert_eq!(
            ClassifyError::from_status(429, String::new()),
            ClassifyError::RateLimited
        );
        assert_eq!(
            ClassifyError::MissingConfig("apiKey".into()).error_kind(),
            ErrorKind::ConfigError
        );
        assert_eq!(ClassifyError::InvalidKey.error_kind(), ErrorKind::AiError);
        assert!(ClassifyError::RateLimited.is_retryable());
        assert!(!ClassifyError::InvalidKey.is_retryable());
        assert!(ClassifyError::Status {
            status: 500,
            message: String::new()
        }
        .is_retryable());
    }
}
