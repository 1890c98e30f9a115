use serde::{Deserialize, Serialize};

/// A key page followed from the home page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawledPage {
    pub url: String,
    pub title: String,
    /// Keyword group that matched the link (`about`, `products`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    pub content_length: usize,
}

/// Text extracted from one site: home page plus any followed key pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawledSite {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub footer_content: String,
    #[serde(default)]
    pub company_info: String,
    #[serde(default)]
    pub keywords: String,
    #[serde(default)]
    pub pages: Vec<CrawledPage>,
}

impl CrawledSite {
    pub fn crawled_count(&self) -> usize {
        self.pages.len() + 1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfo {
    #[serde(default)]
    pub primary_name: String,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub founder_names: Vec<String>,
    #[serde(default)]
    pub brand_names: Vec<String>,
    #[serde(default)]
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailInfo {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Result of a connectivity probe against a chat-completion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionCheck {
    pub model: String,
    pub response_time_ms: u64,
    pub reply: String,
}
