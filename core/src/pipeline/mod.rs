//! Seams between the batch processor and the network-facing plugins.

pub mod traits;
pub mod types;

pub use traits::{InfoExtractor, SiteClassifier, SiteFetcher};
pub use types::{CompanyInfo, ConnectionCheck, CrawledPage, CrawledSite, EmailInfo};
