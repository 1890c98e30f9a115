use anyhow::Context;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use rand::Rng;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use prospector_core::api::{CrawlConfig, ProxyConfig, ProxyEntry, ProxyStrategy};

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

pub const DEFAULT_PROXY_TEST_URL: &str = "https://httpbin.org/ip";
const PROXY_TEST_TIMEOUT: Duration = Duration::from_secs(10);
const PROXY_TEST_CONCURRENCY: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyHealth {
    Working,
    Failed,
}

/// Outcome of one proxy check. Credentials are never echoed back.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyCheck {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub status: ProxyHealth,
    pub last_checked: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn random_user_agent() -> &'static str {
    USER_AGENTS[rand::thread_rng().gen_range(0..USER_AGENTS.len())]
}

/// Prebuilt HTTP clients, one per configured proxy (or a single direct client).
pub struct ProxyPool {
    clients: Vec<reqwest::Client>,
    strategy: ProxyStrategy,
    next: AtomicUsize,
}

impl ProxyPool {
    pub fn from_config(proxy: &ProxyConfig, crawl: &CrawlConfig) -> anyhow::Result<Self> {
        let clients = if proxy.enabled && !proxy.proxies.is_empty() {
            proxy
                .proxies
                .iter()
                .map(|entry| build_client(crawl, Some(entry)))
                .collect::<anyhow::Result<Vec<_>>>()?
        } else {
            vec![build_client(crawl, None)?]
        };

        tracing::debug!(
            target: "prospector.crawl",
            clients = clients.len(),
            strategy = ?proxy.strategy,
            "proxy pool ready"
        );

        Ok(Self {
            clients,
            strategy: proxy.strategy,
            next: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn pick(&self) -> &reqwest::Client {
        let idx = match self.strategy {
            ProxyStrategy::RoundRobin => self.next.fetch_add(1, Ordering::Relaxed) % self.clients.len(),
            ProxyStrategy::Random => rand::thread_rng().gen_range(0..self.clients.len()),
        };
        &self.clients[idx]
    }
}

impl ProxyPool {
    /// One GET to `test_url` through `entry`; only a 200 counts as working.
    pub async fn test(entry: &ProxyEntry, test_url: &str) -> ProxyCheck {
        let outcome = async {
            let client = reqwest::Client::builder()
                .timeout(PROXY_TEST_TIMEOUT)
                .proxy(to_reqwest_proxy(entry)?)
                .build()?;
            let resp = client
                .get(test_url)
                .header(reqwest::header::USER_AGENT, random_user_agent())
                .send()
                .await?;
            if resp.status() == reqwest::StatusCode::OK {
                Ok::<(), anyhow::Error>(())
            } else {
                Err(anyhow::anyhow!("test url answered {}", resp.status()))
            }
        }
        .await;

        if let Err(e) = &outcome {
            tracing::debug!(target: "prospector.crawl", proxy = %entry.url, error = %e, "proxy check failed");
        }
        ProxyCheck {
            url: entry.url.clone(),
            username: entry.username.clone(),
            status: if outcome.is_ok() {
                ProxyHealth::Working
            } else {
                ProxyHealth::Failed
            },
            last_checked: Utc::now(),
            error: outcome.err().map(|e| e.to_string()),
        }
    }

    /// Checks proxies five at a time; results keep the input order.
    pub async fn test_all(entries: &[ProxyEntry], test_url: &str) -> Vec<ProxyCheck> {
        let mut checks = Vec::with_capacity(entries.len());
        for chunk in entries.chunks(PROXY_TEST_CONCURRENCY) {
            checks.extend(join_all(chunk.iter().map(|e| Self::test(e, test_url))).await);
        }
        checks
    }
}

fn to_reqwest_proxy(entry: &ProxyEntry) -> anyhow::Result<reqwest::Proxy> {
    let mut proxy = reqwest::Proxy::all(&entry.url)
        .with_context(|| format!("invalid proxy url: {}", entry.url))?;
    if let (Some(user), Some(pass)) = (&entry.username, &entry.password) {
        proxy = proxy.basic_auth(user, pass);
    }
    Ok(proxy)
}

fn build_client(crawl: &CrawlConfig, entry: Option<&ProxyEntry>) -> anyhow::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(Duration::from_millis(crawl.request_timeout_ms))
        .redirect(reqwest::redirect::Policy::limited(crawl.max_redirects));

    if let Some(entry) = entry {
        builder = builder.proxy(to_reqwest_proxy(entry)?);
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(url: &str) -> ProxyEntry {
        ProxyEntry {
            url: url.to_string(),
            username: None,
            password: None,
        }
    }

    #[test]
    fn test_direct_client_when_disabled() {
        let pool = ProxyPool::from_config(&ProxyConfig::default(), &CrawlConfig::default()).unwrap();
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_round_robin_cycles() {
        let cfg = ProxyConfig {
            enabled: true,
            strategy: ProxyStrategy::RoundRobin,
            proxies: vec![
                entry("http://127.0.0.1:8001"),
                entry("socks5://127.0.0.1:1080"),
            ],
        };
        let pool = ProxyPool::from_config(&cfg, &CrawlConfig::default()).unwrap();
        assert_eq!(pool.len(), 2);
        let first = pool.pick() as *const _;
        let second = pool.pick() as *const _;
        let third = pool.pick() as *const _;
        assert_ne!(first, second);
        assert_eq!(first, third);
    }

    #[test]
    fn test_invalid_proxy_is_an_error() {
        let cfg = ProxyConfig {
            enabled: true,
            strategy: ProxyStrategy::Random,
            proxies: vec![entry("not a url")],
        };
        assert!(ProxyPool::from_config(&cfg, &CrawlConfig::default()).is_err());
    }

    #[tokio::test]
    async fn test_proxy_check_working_through_proxy() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/ip")
            .with_status(200)
            .with_body(r#"{"origin":"10.0.0.1"}"#)
            .create_async()
            .await;

        let check = ProxyPool::test(&entry(&server.url()), "http://target.test/ip").await;
        assert_eq!(check.status, ProxyHealth::Working);
        assert!(check.error.is_none());
        assert_eq!(check.url, server.url());
    }

    #[tokio::test]
    async fn test_proxy_check_non_200_is_failed() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/ip")
            .with_status(502)
            .create_async()
            .await;

        let check = ProxyPool::test(&entry(&server.url()), "http://target.test/ip").await;
        assert_eq!(check.status, ProxyHealth::Failed);
        assert!(check.error.unwrap().contains("502"));
    }

    #[tokio::test]
    async fn test_test_all_keeps_order_and_hides_password() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/ip")
            .with_status(200)
            .expect_at_least(1)
            .create_async()
            .await;

        let mut with_auth = entry(&server.url());
        with_auth.username = Some("user".into());
        with_auth.password = Some("secret".into());
        let entries = vec![entry("not a url"), with_auth, entry(&server.url())];

        let checks = ProxyPool::test_all(&entries, "http://target.test/ip").await;
        let statuses: Vec<ProxyHealth> = checks.iter().map(|c| c.status).collect();
        assert_eq!(
            statuses,
            vec![ProxyHealth::Failed, ProxyHealth::Working, ProxyHealth::Working]
        );

        let json = serde_json::to_value(&checks[1]).unwrap();
        assert_eq!(json["status"], "working");
        assert_eq!(json["username"], "user");
        assert!(json.get("password").is_none());
        assert!(json.get("lastChecked").is_some());
    }

    #[test]
    fn test_random_user_agent_is_known() {
        assert!(USER_AGENTS.contains(&random_user_agent()));
    }
}
