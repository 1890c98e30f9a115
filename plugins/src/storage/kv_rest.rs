use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use prospector_core::api::KvStore;

use super::http::{ensure_success, parse_json_response, RestHttpError};
use super::encode_path_segment;

/// Redis-over-REST store (`/set/{key}`, `/get/{key}`). Values are stored as JSON text.
pub struct KvRestStore {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl KvRestStore {
    pub fn new(base_url: &str, token: String, timeout_ms: u64) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }
}

#[async_trait]
impl KvStore for KvRestStore {
    fn name(&self) -> &str {
        "kv-rest"
    }

    async fn save(&self, key: &str, data: Value) -> anyhow::Result<()> {
        let url = format!("{}/set/{}", self.base_url, encode_path_segment(key));
        let payload = serde_json::to_string(&data)?;
        tracing::debug!(target: "prospector.storage", stage = "kv.set.in", key, bytes = payload.len());
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .body(payload)
            .send()
            .await
            .map_err(|err| RestHttpError::from_reqwest(err, &url))?;
        ensure_success(resp).await
    }

    async fn load(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let url = format!("{}/get/{}", self.base_url, encode_path_segment(key));
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|err| RestHttpError::from_reqwest(err, &url))?;
        let body = parse_json_response(resp).await?;
        match body.get("result") {
            Some(Value::String(text)) => Ok(Some(serde_json::from_str(text)?)),
            Some(Value::Null) | None => Ok(None),
            Some(other) => Ok(Some(other.clone())),
        }
    }
}
