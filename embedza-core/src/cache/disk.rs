//! Disk-based cache: one JSON file per key.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use super::Cache;
use crate::error::StoreError;

/// Disk-based cache.
///
/// Files live at `{cache_dir}/{hash[0:2]}/{hash}.json` where `hash` is the
/// SHA-256 of the key.
#[derive(Debug, Clone)]
pub struct DiskCache {
    cache_dir: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedEntry {
    key: String,
    cached_at: DateTime<Utc>,
    value: JsonValue,
}

/// Cache statistics.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub entries: usize,
}

impl DiskCache {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Get the default cache directory: ~/.embedza/cache
    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".embedza").join("cache"))
            .unwrap_or_else(|| PathBuf::from(".cache/embedza"))
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let hash = sha256_hex(key);
        self.cache_dir
            .join(&hash[..2])
            .join(format!("{}.json", hash))
    }

    /// Count stored entries.
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();

        if let Ok(shards) = fs::read_dir(&self.cache_dir) {
            for shard in shards.filter_map(|e| e.ok()) {
                if let Ok(entries) = fs::read_dir(shard.path()) {
                    stats.entries += entries
                        .filter_map(|e| e.ok())
                        .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
                        .count();
                }
            }
        }

        stats
    }

    /// Remove all cached entries.
    pub fn clear(&self) -> std::io::Result<()> {
        if self.cache_dir.exists() {
            fs::remove_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }
}

#[async_trait]
impl Cache for DiskCache {
    async fn get(&self, key: &str) -> Result<Option<JsonValue>, StoreError> {
        let path = self.entry_path(key);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry: CachedEntry = serde_json::from_str(&content)?;
        tracing::debug!(key, "disk cache hit");
        Ok(Some(entry.value))
    }

    async fn set(&self, key: &str, value: JsonValue) -> Result<(), StoreError> {
        let path = self.entry_path(key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let entry = CachedEntry {
            key: key.to_string(),
            cached_at: Utc::now(),
            value,
        };

        tokio::fs::write(&path, serde_json::to_string_pretty(&entry)?).await?;
        Ok(())
    }
}

/// Compute SHA256 hash and return as hex string.
fn sha256_hex(input: &str) -> String {
    Sha256::digest(input.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_roundtrip_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let cache = DiskCache::new(temp_dir.path().to_path_buf());

        assert_eq!(cache.get("image#http://a/1.png").await.unwrap(), None);

        cache
            .set("image#http://a/1.png", json!({ "ts": 5 }))
            .await
            .unwrap();
        cache
            .set("image#http://a/2.png", json!({ "ts": 6 }))
            .await
            .unwrap();

        assert_eq!(
            cache.get("image#http://a/1.png").await.unwrap(),
            Some(json!({ "ts": 5 }))
        );
        assert_eq!(cache.stats().entries, 2);

        cache.clear().unwrap();
        assert_eq!(cache.stats().entries, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_writers() {
        let temp_dir = TempDir::new().unwrap();
        let cache = std::sync::Arc::new(DiskCache::new(temp_dir.path().to_path_buf()));

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..8 {
            let cache = cache.clone();
            tasks.spawn(async move {
                let key = format!("image#http://a/{}.png", i);
                cache.set(&key, json!({ "ts": i })).await.unwrap();
                cache.get(&key).await.unwrap()
            });
        }

        let mut read_back = 0;
        while let Some(joined) = tasks.join_next().await {
            assert!(joined.unwrap().is_some());
            read_back += 1;
        }

        assert_eq!(read_back, 8);
        assert_eq!(cache.stats().entries, 8);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let cache = DiskCache::new(temp_dir.path().to_path_buf());

        let path = cache.entry_path("broken");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();

        assert!(cache.get("broken").await.is_err());
    }
}
