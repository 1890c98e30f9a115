pub mod crawler;
pub mod extractor;
pub mod fetcher;
pub mod proxy;

pub use crawler::{sanitize_content, SiteCrawler};
pub use extractor::{extract_page, KeyLink, PageExtract};
pub use fetcher::{normalize_url, HttpFetcher};
pub use proxy::{random_user_agent, ProxyCheck, ProxyHealth, ProxyPool, DEFAULT_PROXY_TEST_URL};
