use async_trait::async_trait;

use super::types::{CompanyInfo, ConnectionCheck, CrawledSite, EmailInfo};
use crate::classify::{AiConfig, Classification};
use crate::error::{ClassifyError, FetchError};

/// Crawls one site (home page and key pages) into extracted text.
#[async_trait]
pub trait SiteFetcher: Send + Sync {
    fn name(&self) -> &str;

    async fn crawl(&self, url: &str) -> Result<CrawledSite, FetchError>;
}

/// Y/N target-customer verdict from a chat-completion endpoint.
#[async_trait]
pub trait SiteClassifier: Send + Sync {
    fn name(&self) -> &str;

    async fn classify(
        &self,
        config: &AiConfig,
        site: &CrawledSite,
    ) -> Result<Classification, ClassifyError>;

    async fn check_connection(&self, config: &AiConfig) -> Result<ConnectionCheck, ClassifyError>;
}

#[async_trait]
pub trait InfoExtractor: Send + Sync {
    async fn extract_company_info(
        &self,
        config: &AiConfig,
        content: &str,
    ) -> Result<CompanyInfo, ClassifyError>;

    async fn extract_emails(
        &self,
        config: &AiConfig,
        content: &str,
    ) -> Result<Vec<EmailInfo>, ClassifyError>;
}
