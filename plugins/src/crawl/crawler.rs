use async_trait::async_trait;
use std::time::Duration;

use prospector_core::api::{
    collapse_whitespace, truncate_chars, CrawlConfig, CrawledPage, CrawledSite, FetchError,
    ProxyConfig, SiteFetcher,
};

use super::extractor::extract_page;
use super::fetcher::{normalize_url, HttpFetcher};

/// Home page plus up to `max_key_pages` same-host key pages.
pub struct SiteCrawler {
    fetcher: HttpFetcher,
    cfg: CrawlConfig,
}

impl SiteCrawler {
    pub fn new(cfg: CrawlConfig, proxy: &ProxyConfig) -> anyhow::Result<Self> {
        Ok(Self {
            fetcher: HttpFetcher::new(&cfg, proxy)?,
            cfg,
        })
    }
}

fn is_kept_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || c == '_'
        || c.is_whitespace()
        || ('\u{4e00}'..='\u{9fff}').contains(&c)
        || ".,;:!?-()[]".contains(c)
}

/// Collapses whitespace, blanks out symbols outside word chars, CJK and basic
/// punctuation, then truncates.
pub fn sanitize_content(raw: &str, limit: usize) -> String {
    let kept: String = raw
        .chars()
        .map(|c| if is_kept_char(c) { c } else { ' ' })
        .collect();
    truncate_chars(&collapse_whitespace(&kept), limit)
}

#[async_trait]
impl SiteFetcher for SiteCrawler {
    fn name(&self) -> &str {
        "site_crawler"
    }

    async fn crawl(&self, url: &str) -> Result<CrawledSite, FetchError> {
        let target = normalize_url(url)?;
        let home_html = self
            .fetcher
            .fetch_html(&target, Duration::from_millis(self.cfg.request_timeout_ms))
            .await?;

        let max_links = if self.cfg.follow_key_pages {
            self.cfg.max_key_pages
        } else {
            0
        };
        let home = extract_page(&home_html, &target, self.cfg.page_char_limit, max_links);

        let mut all = format!("=== Home ===\n{}\n\n", home.content);
        let mut pages = Vec::new();

        for link in &home.key_links {
            if all.chars().count() >= self.cfg.follow_stop_chars {
                break;
            }
            tokio::time::sleep(Duration::from_millis(self.cfg.key_page_delay_ms)).await;

            let html = match self
                .fetcher
                .fetch_html(&link.url, Duration::from_millis(self.cfg.subpage_timeout_ms))
                .await
            {
                Ok(html) => html,
                Err(e) => {
                    tracing::debug!(target: "prospector.crawl", url = %link.url, kind = link.kind, error = %e, "key page skipped");
                    continue;
                }
            };

            let page = extract_page(&html, &link.url, self.cfg.page_char_limit, 0);
            let len = page.content.chars().count();
            if len <= self.cfg.min_page_chars {
                continue;
            }
            all.push_str(&format!("=== {} ===\n{}\n\n", link.kind, page.content));
            pages.push(CrawledPage {
                url: link.url.to_string(),
                title: page.title,
                kind: link.kind.to_string(),
                content_length: len,
            });
        }

        let content = sanitize_content(&all, self.cfg.content_char_limit);
        tracing::info!(
            target: "prospector.crawl",
            url = %target,
            chars = content.chars().count(),
            pages = pages.len() + 1,
            "site crawled"
        );

        Ok(CrawledSite {
            url: target.to_string(),
            title: home.title,
            description: home.description,
            content,
            footer_content: home.footer_content,
            company_info: home.company_info,
            keywords: home.keywords,
            pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crawler() -> SiteCrawler {
        let cfg = CrawlConfig {
            key_page_delay_ms: 0,
            ..Default::default()
        };
        SiteCrawler::new(cfg, &ProxyConfig::default()).unwrap()
    }

    #[test]
    fn test_sanitize_content() {
        assert_eq!(
            sanitize_content("=== Home ===\nPumps™ & valves, 关于我们!  ", 100),
            "Home Pumps valves, 关于我们!"
        );
        assert_eq!(sanitize_content("abcdef", 3), "abc");
    }

    #[tokio::test]
    async fn test_crawl_follows_key_pages() {
        let mut server = mockito::Server::new_async().await;
        let home = r#"<html><head><title>Acme</title>
            <meta name="description" content="Pumps"></head>
            <body><nav><a href="/about">About us</a><a href="/contact">Contact</a></nav>
            <main><p>Home page text about industrial pumps.</p></main>
            <footer>Acme Ltd</footer></body></html>"#;
        let about = format!(
            "<html><body><main><p>{}</p></main></body></html>",
            "We have built pumps for thirty years in three countries. ".repeat(2)
        );
        let _h = server.mock("GET", "/").with_body(home).create_async().await;
        let _a = server.mock("GET", "/about").with_body(about).create_async().await;
        let _c = server
            .mock("GET", "/contact")
            .with_body("<html><body><main>tiny</main></body></html>")
            .create_async()
            .await;

        let site = crawler().crawl(&server.url()).await.unwrap();
        assert_eq!(site.title, "Acme");
        assert_eq!(site.description, "Pumps");
        assert_eq!(site.footer_content, "Acme Ltd");
        assert_eq!(site.pages.len(), 1);
        assert_eq!(site.pages[0].kind, "about");
        assert!(site.content.contains("Home page text"));
        assert!(site.content.contains("thirty years"));
        assert!(!site.content.contains("tiny"));
    }

    #[tokio::test]
    async fn test_key_page_failures_are_skipped() {
        let mut server = mockito::Server::new_async().await;
        let home = r#"<html><body><a href="/products">Products</a><p>Home</p></body></html>"#;
        let _h = server.mock("GET", "/").with_body(home).create_async().await;
        let _p = server.mock("GET", "/products").with_status(500).create_async().await;

        let site = crawler().crawl(&server.url()).await.unwrap();
        assert!(site.pages.is_empty());
        assert_eq!(site.crawled_count(), 1);
    }

    #[tokio::test]
    async fn test_home_failure_is_typed() {
        let mut server = mockito::Server::new_async().await;
        let _h = server.mock("GET", "/").with_status(404).create_async().await;
        let err = crawler().crawl(&server.url()).await.unwrap_err();
        assert_eq!(err, FetchError::NotFound);
    }
}
