use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, USER_AGENT};
use std::time::Duration;
use url::Url;

use prospector_core::api::{CrawlConfig, FetchError, ProxyConfig};

use super::proxy::{random_user_agent, ProxyPool};

/// Adds `https://` when the scheme is missing and validates the result.
pub fn normalize_url(raw: &str) -> Result<Url, FetchError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FetchError::InvalidUrl(raw.to_string()));
    }
    let candidate = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let url = Url::parse(&candidate).map_err(|_| FetchError::InvalidUrl(raw.to_string()))?;
    if url.host_str().is_none() {
        return Err(FetchError::InvalidUrl(raw.to_string()));
    }
    Ok(url)
}

fn map_reqwest(err: reqwest::Error, timeout_ms: u64) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout { timeout_ms }
    } else if err.is_connect() {
        FetchError::ConnectionRefused(err.to_string())
    } else if err.is_builder() {
        FetchError::InvalidUrl(err.to_string())
    } else if let Some(status) = err.status() {
        FetchError::from_status(status.as_u16())
    } else {
        FetchError::Unknown(err.to_string())
    }
}

/// One GET per call with browser-like headers.
pub struct HttpFetcher {
    pool: ProxyPool,
    user_agent: String,
    random_user_agent: bool,
}

impl HttpFetcher {
    pub fn new(crawl: &CrawlConfig, proxy: &ProxyConfig) -> anyhow::Result<Self> {
        Ok(Self {
            pool: ProxyPool::from_config(proxy, crawl)?,
            user_agent: crawl.user_agent.clone(),
            random_user_agent: crawl.random_user_agent,
        })
    }

    fn user_agent(&self) -> &str {
        if self.random_user_agent {
            random_user_agent()
        } else {
            &self.user_agent
        }
    }

    pub async fn fetch_html(&self, url: &Url, timeout: Duration) -> Result<String, FetchError> {
        let timeout_ms = timeout.as_millis() as u64;
        tracing::debug!(target: "prospector.crawl", url = %url, timeout_ms, "fetch.in");

        let resp = self
            .pool
            .pick()
            .get(url.clone())
            .timeout(timeout)
            .header(USER_AGENT, self.user_agent())
            .header(
                ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            )
            .header(ACCEPT_LANGUAGE, "zh-CN,zh;q=0.9,en;q=0.8")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| map_reqwest(e, timeout_ms))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status.as_u16()));
        }

        let body = resp.text().await.map_err(|e| map_reqwest(e, timeout_ms))?;
        if body.trim().is_empty() {
            return Err(FetchError::NoContent);
        }

        tracing::debug!(target: "prospector.crawl", url = %url, status = %status, bytes = body.len(), "fetch.out");
        Ok(body)
    }
}
