use anyhow::Result;
use std::sync::Arc;

use prospector_core::api::{AppConfig, KvStore, StorageConfig, StorageProvider};

use crate::classifier::ChatCompletionClient;
use crate::crawl::SiteCrawler;
use crate::storage::{FileStore, KvRestStore, MemoryStore, SupabaseStore};

const KV_URL: &str = "KV_REST_API_URL";
const KV_TOKEN: &str = "KV_REST_API_TOKEN";
const SUPABASE_URL: &str = "SUPABASE_URL";
const SUPABASE_KEY: &str = "SUPABASE_ANON_KEY";

pub fn build_crawler(cfg: &AppConfig) -> Result<Arc<SiteCrawler>> {
    Ok(Arc::new(SiteCrawler::new(cfg.crawl.clone(), &cfg.proxy)?))
}

pub fn build_classifier(cfg: &AppConfig) -> Result<Arc<ChatCompletionClient>> {
    Ok(Arc::new(ChatCompletionClient::new(cfg.classifier.clone())?))
}

/// Resolves the storage backend once at startup. Credentials come from `lookup`
/// (normally the process environment).
pub fn build_store<F>(cfg: &StorageConfig, lookup: F) -> Result<Arc<dyn KvStore>>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    let kv = get(KV_URL).zip(get(KV_TOKEN));
    let supabase = get(SUPABASE_URL).zip(get(SUPABASE_KEY));

    let provider = match cfg.provider {
        StorageProvider::Auto if kv.is_some() => StorageProvider::KvRest,
        StorageProvider::Auto if supabase.is_some() => StorageProvider::Supabase,
        StorageProvider::Auto if cfg.environment.eq_ignore_ascii_case("production") => {
            StorageProvider::Memory
        }
        StorageProvider::Auto => StorageProvider::File,
        explicit => explicit,
    };

    let store: Arc<dyn KvStore> = match provider {
        StorageProvider::KvRest => {
            let (url, token) = kv
                .ok_or_else(|| anyhow::anyhow!("kv-rest storage needs {KV_URL} and {KV_TOKEN}"))?;
            Arc::new(KvRestStore::new(&url, token, cfg.timeout_ms)?)
        }
        StorageProvider::Supabase => {
            let (url, key) = supabase.ok_or_else(|| {
                anyhow::anyhow!("supabase storage needs {SUPABASE_URL} and {SUPABASE_KEY}")
            })?;
            Arc::new(SupabaseStore::new(&url, key, cfg.timeout_ms)?)
        }
        StorageProvider::Memory => Arc::new(MemoryStore::new()),
        StorageProvider::File | StorageProvider::Auto => {
            Arc::new(FileStore::new(&cfg.data_dir, cfg.environment.clone()))
        }
    };

    tracing::info!(target: "prospector.storage", provider = store.name(), "storage backend selected");
    Ok(store)
}
