use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::time::Duration;

use prospector_core::api::KvStore;

use super::http::{ensure_success, parse_json_response, RestHttpError};

const TABLE: &str = "storage_data";

/// PostgREST table store: rows of `{key, data, updated_at}` with `data` as JSON text.
pub struct SupabaseStore {
    http: reqwest::Client,
    table_url: String,
    anon_key: String,
}

impl SupabaseStore {
    pub fn new(base_url: &str, anon_key: String, timeout_ms: u64) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;
        Ok(Self {
            http,
            table_url: format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), TABLE),
            anon_key,
        })
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }
}

#[async_trait]
impl KvStore for SupabaseStore {
    fn name(&self) -> &str {
        "supabase"
    }

    async fn save(&self, key: &str, data: Value) -> anyhow::Result<()> {
        let row = json!({
            "key": key,
            "data": serde_json::to_string(&data)?,
            "updated_at": Utc::now().to_rfc3339(),
        });
        let req = self
            .http
            .post(&self.table_url)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&row);
        let resp = self
            .auth(req)
            .send()
            .await
            .map_err(|err| RestHttpError::from_reqwest(err, &self.table_url))?;
        ensure_success(resp).await
    }

    async fn load(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let filter = format!("eq.{key}");
        let req = self
            .http
            .get(&self.table_url)
            .query(&[("key", filter.as_str()), ("select", "data")]);
        let resp = self
            .auth(req)
            .send()
            .await
            .map_err(|err| RestHttpError::from_reqwest(err, &self.table_url))?;
        let rows = parse_json_response(resp).await?;
        match rows.pointer("/0/data") {
            Some(Value::String(text)) => Ok(Some(serde_json::from_str(text)?)),
            Some(Value::Null) | None => Ok(None),
            Some(other) => Ok(Some(other.clone())),
        }
    }
}
