pub mod classifier;
pub mod crawl;
pub mod factory;
pub mod storage;
