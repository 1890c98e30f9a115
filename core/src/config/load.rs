use std::path::{Path, PathBuf};

use super::types::{AppConfig, StorageProvider};

/// Get the default prospector data directory: ~/.prospector
pub fn get_prospector_data_dir() -> anyhow::Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".prospector"))
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.prospector/config.toml (highest)
    let data_dir = get_prospector_data_dir()?;
    let home_config = data_dir.join("config.toml");

    // Priority 2: ./config.toml (current directory)
    let local_config = Path::new("config.toml");

    let mut cfg: AppConfig = if home_config.exists() {
        load_from_path(&home_config)?
    } else if local_config.exists() {
        load_from_path(local_config)?
    } else {
        AppConfig::default()
    };

    if cfg
        .logging
        .directory
        .as_deref()
        .map(|s| s.trim().is_empty())
        .unwrap_or(true)
    {
        let logs_dir = data_dir.join("logs");
        std::fs::create_dir_all(&logs_dir)?;
        cfg.logging.directory = Some(logs_dir.to_string_lossy().to_string());
    }

    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())?;

    Ok(cfg)
}

pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)?;
    let cfg = toml::from_str::<AppConfig>(&s)
        .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;
    Ok(cfg)
}

/// Environment variable overrides (highest priority). Empty values are ignored.
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("PROSPECTOR_HOST") {
        cfg.http_server.host = v;
    }
    if let Some(v) = get("PROSPECTOR_PORT") {
        cfg.http_server.port = v
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("PROSPECTOR_PORT is not a valid port: {v}"))?;
    }
    if let Some(v) = get("PROSPECTOR_LOG_LEVEL") {
        cfg.logging.level = v;
    }
    if let Some(v) = get("PROSPECTOR_DATA_DIR") {
        cfg.storage.data_dir = v;
    }
    if let Some(v) = get("PROSPECTOR_ENV") {
        cfg.storage.environment = v;
    }
    if let Some(v) = get("PROSPECTOR_STORAGE_PROVIDER") {
        cfg.storage.provider = parse_storage_provider(&v)?;
    }

    Ok(())
}

fn parse_storage_provider(v: &str) -> anyhow::Result<StorageProvider> {
    match v.trim().to_ascii_lowercase().as_str() {
        "auto" => Ok(StorageProvider::Auto),
        "file" => Ok(StorageProvider::File),
        "memory" => Ok(StorageProvider::Memory),
        "kv-rest" | "kv" => Ok(StorageProvider::KvRest),
        "supabase" => Ok(StorageProvider::Supabase),
        other => Err(anyhow::anyhow!("unknown storage provider: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_env_overrides_apply() {
        let vars = env(&[
            ("PROSPECTOR_PORT", "9090"),
            ("PROSPECTOR_STORAGE_PROVIDER", "memory"),
            ("PROSPECTOR_HOST", "  "),
        ]);
        let mut cfg = AppConfig::default();
        apply_env_overrides(&mut cfg, |k| vars.get(k).cloned()).unwrap();

        assert_eq!(cfg.http_server.port, 9090);
        assert_eq!(cfg.http_server.host, "127.0.0.1");
        assert_eq!(cfg.storage.provider, StorageProvider::Memory);
    }

    #[test]
    fn test_invalid_port_rejected() {
        let vars = env(&[("PROSPECTOR_PORT", "not-a-port")]);
        let mut cfg = AppConfig::default();
        assert!(apply_env_overrides(&mut cfg, |k| vars.get(k).cloned()).is_err());
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[crawl]\nmax_key_pages = 2\n").unwrap();

        let cfg = load_from_path(&path).unwrap();
        assert_eq!(cfg.crawl.max_key_pages, 2);
        assert_eq!(cfg.crawl.page_char_limit, 1_500);
    }
}
