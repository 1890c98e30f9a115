use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};

use prospector_core::api::{sanitize_key, KvStore, StoredEnvelope};

/// One pretty-printed JSON envelope per key under `data_dir`.
pub struct FileStore {
    data_dir: PathBuf,
    environment: String,
}

impl FileStore {
    pub fn new(data_dir: impl Into<PathBuf>, environment: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            environment: environment.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", sanitize_key(key)))
    }
}

#[async_trait]
impl KvStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn save(&self, key: &str, data: Value) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        let path = self.path_for(key);
        let envelope = StoredEnvelope::new(key, data, &self.environment);
        tokio::fs::write(&path, serde_json::to_vec_pretty(&envelope)?).await?;
        tracing::debug!(target: "prospector.storage", path = %path.display(), "saved");
        Ok(())
    }

    async fn load(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let envelope: StoredEnvelope = serde_json::from_slice(&bytes)?;
        Ok(Some(envelope.data))
    }
}
