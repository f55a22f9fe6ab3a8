//! Catalog listing cache, used when the backend is unreachable

use crate::error::Result;
use crate::types::{CacheEntry, Video};
use crate::utils::paths::{ensure_dir, get_cache_dir};
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

const DEFAULT_TTL: u64 = 3600; // 1 hour

/// Cache key for a user's listing on a given backend
pub fn get_cache_key(base_url: &str, user_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(base_url.as_bytes());
    hasher.update(b"|");
    hasher.update(user_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone)]
pub struct CatalogCache {
    dir: PathBuf,
    ttl: u64,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new(get_cache_dir())
    }
}

impl CatalogCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = ttl;
        self
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Cached data if present and unexpired. Expired entries are removed.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path(key);
        let content = fs::read_to_string(&path).await.ok()?;
        let entry: CacheEntry<T> = serde_json::from_str(&content).ok()?;

        let now = Utc::now().timestamp();
        if now - entry.timestamp > entry.ttl as i64 {
            debug!(key, "cache entry expired");
            let _ = fs::remove_file(&path).await;
            return None;
        }

        Some(entry.data)
    }

    pub async fn set<T: Serialize>(&self, key: &str, data: &T) -> Result<()> {
        ensure_dir(&self.dir).await?;

        let entry = CacheEntry {
            data,
            timestamp: Utc::now().timestamp(),
            ttl: self.ttl,
        };

        let content = serde_json::to_string(&entry)?;
        fs::write(self.path(key), content).await?;
        Ok(())
    }

    pub async fn videos(&self, base_url: &str, user_id: &str) -> Option<Vec<Video>> {
        self.get(&get_cache_key(base_url, user_id)).await
    }

    pub async fn store_videos(&self, base_url: &str, user_id: &str, videos: &[Video]) -> Result<()> {
        self.set(&get_cache_key(base_url, user_id), &videos).await
    }

    /// Remove every cached entry
    pub async fn clear(&self) -> Result<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir).await?;
        }
        Ok(())
    }
}
