use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key-value persistence for arbitrary JSON documents.
#[async_trait]
pub trait KvStore: Send + Sync {
    fn name(&self) -> &str;
    async fn save(&self, key: &str, data: Value) -> anyhow::Result<()>;
    async fn load(&self, key: &str) -> anyhow::Result<Option<Value>>;
}

/// Wrapper written by backends that store metadata next to the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEnvelope {
    pub key: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
    pub environment: String,
}

impl StoredEnvelope {
    pub fn new(key: &str, data: Value, environment: &str) -> Self {
        Self {
            key: key.to_string(),
            data,
            timestamp: Utc::now(),
            environment: environment.to_string(),
        }
    }
}

/// Replaces every character outside `[A-Za-z0-9_]` with `_`.
pub fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("user-42/results.v2"), "user_42_results_v2");
        assert_eq!(sanitize_key("plain_key9"), "plain_key9");
        assert_eq!(sanitize_key("客户"), "__");
    }
}
