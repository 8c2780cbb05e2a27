//! Persistent resolution cache
//!
//! Remembers which URL a book record last resolved to, across CLI
//! invocations. Distinct from the core's in-process status cache: this one
//! is keyed by book (not URL) and survives the process.

use anyhow::{Context, Result};
use async_trait::async_trait;
use coverfall_core::resolver::Resolution;
use coverfall_core::types::CandidateSource;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;

use crate::config::CacheConfig;

/// Persisted resolutions expire after a week; cover URLs go stale slowly
pub const DEFAULT_RESULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// One persisted resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResolution {
    pub url: String,
    pub source: CandidateSource,
    pub resolved_at: SystemTime,
    pub expires_at: SystemTime,
}

impl StoredResolution {
    pub fn from_resolution(resolution: &Resolution) -> Self {
        let now = SystemTime::now();
        Self {
            url: resolution.url.clone(),
            source: resolution.source,
            resolved_at: now,
            expires_at: now + DEFAULT_RESULT_TTL,
        }
    }

    pub fn is_expired(&self) -> bool {
        SystemTime::now() > self.expires_at
    }
}

/// Trait for resolution cache implementations
#[async_trait]
pub trait ResolutionCache: Send + Sync {
    /// Fetch a stored resolution; `Ok(None)` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<StoredResolution>>;

    /// Store a resolution under a book key
    async fn put(&self, key: &str, value: &StoredResolution) -> Result<()>;

    /// Remove one entry
    async fn invalidate(&self, key: &str) -> Result<()>;

    /// Remove all entries
    async fn clear(&self) -> Result<()>;

    /// Number of stored entries (expired included until compaction)
    async fn len(&self) -> Result<usize>;
}

/// In-memory cache; useful for batch runs with `cache.backend = "memory"`
pub struct MemoryCache {
    entries: RwLock<HashMap<String, StoredResolution>>,
    max_entries: usize,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries,
        }
    }
}

#[async_trait]
impl ResolutionCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<StoredResolution>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).filter(|e| !e.is_expired()).cloned())
    }

    async fn put(&self, key: &str, value: &StoredResolution) -> Result<()> {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(key) && entries.len() >= self.max_entries {
            evict_oldest(&mut entries);
        }
        entries.insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }
}

/// File-backed cache persisted as JSON under the user cache directory
pub struct FileCache {
    cache_file: PathBuf,
    entries: RwLock<HashMap<String, StoredResolution>>,
    max_entries: usize,
}

impl FileCache {
    pub fn new(cache_dir: PathBuf, max_entries: usize) -> Result<Self> {
        if !cache_dir.exists() {
            std::fs::create_dir_all(&cache_dir).with_context(|| {
                format!("Failed to create cache directory {}", cache_dir.display())
            })?;
        }

        let cache_file = cache_dir.join("resolutions.json");
        let entries = Self::load_from_disk(&cache_file).unwrap_or_default();

        Ok(Self {
            cache_file,
            entries: RwLock::new(entries),
            max_entries,
        })
    }

    fn load_from_disk(cache_file: &PathBuf) -> Result<HashMap<String, StoredResolution>> {
        if !cache_file.exists() {
            return Ok(HashMap::new());
        }

        let data = std::fs::read_to_string(cache_file)
            .with_context(|| format!("Failed to read cache file {}", cache_file.display()))?;
        let entries: HashMap<String, StoredResolution> =
            serde_json::from_str(&data).context("Failed to parse resolution cache")?;

        // Expired entries are dropped at load time
        Ok(entries.into_iter().filter(|(_, e)| !e.is_expired()).collect())
    }

    async fn persist(&self, entries: &HashMap<String, StoredResolution>) -> Result<()> {
        let data = serde_json::to_string_pretty(entries)?;
        tokio::fs::write(&self.cache_file, data)
            .await
            .with_context(|| format!("Failed to write cache file {}", self.cache_file.display()))
    }
}

#[async_trait]
impl ResolutionCache for FileCache {
    async fn get(&self, key: &str) -> Result<Option<StoredResolution>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).filter(|e| !e.is_expired()).cloned())
    }

    async fn put(&self, key: &str, value: &StoredResolution) -> Result<()> {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(key) && entries.len() >= self.max_entries {
            evict_oldest(&mut entries);
        }
        entries.insert(key.to_string(), value.clone());
        self.persist(&entries).await
    }

    async fn invalidate(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        self.persist(&entries).await
    }

    async fn clear(&self) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.clear();
        self.persist(&entries).await
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }
}

/// Cache that stores nothing; selected by `cache.backend = "none"`
pub struct NoOpCache;

#[async_trait]
impl ResolutionCache for NoOpCache {
    async fn get(&self, _key: &str) -> Result<Option<StoredResolution>> {
        Ok(None)
    }

    async fn put(&self, _key: &str, _value: &StoredResolution) -> Result<()> {
        Ok(())
    }

    async fn invalidate(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(0)
    }
}

fn evict_oldest(entries: &mut HashMap<String, StoredResolution>) {
    if let Some(oldest) = entries
        .iter()
        .min_by_key(|(_, e)| e.resolved_at)
        .map(|(k, _)| k.clone())
    {
        entries.remove(&oldest);
    }
}

/// Factory for creating cache implementations from configuration
pub struct CacheFactory;

impl CacheFactory {
    pub fn create(config: &CacheConfig) -> Result<Arc<dyn ResolutionCache>> {
        match config.backend.as_str() {
            "file" => {
                let cache = FileCache::new(default_cache_dir(), config.max_entries)?;
                Ok(Arc::new(cache))
            }
            "memory" => Ok(Arc::new(MemoryCache::new(config.max_entries))),
            "none" => Ok(Arc::new(NoOpCache)),
            other => anyhow::bail!("Unknown cache backend '{other}'"),
        }
    }

    pub fn noop() -> Arc<dyn ResolutionCache> {
        Arc::new(NoOpCache)
    }
}

/// XDG-compliant cache directory
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join("coverfall"))
        .unwrap_or_else(|| PathBuf::from(".coverfall/cache"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(url: &str) -> StoredResolution {
        let now = SystemTime::now();
        StoredResolution {
            url: url.to_string(),
            source: CandidateSource::OpenLibrary,
            resolved_at: now,
            expires_at: now + DEFAULT_RESULT_TTL,
        }
    }

    #[tokio::test]
    async fn test_memory_cache_round_trip() {
        let cache = MemoryCache::new(10);
        cache.put("isbn:1", &stored("https://a")).await.unwrap();

        let hit = cache.get("isbn:1").await.unwrap().unwrap();
        assert_eq!(hit.url, "https://a");
        assert!(cache.get("isbn:2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_cache_expired_entries_are_absent() {
        let cache = MemoryCache::new(10);
        let mut entry = stored("https://a");
        entry.expires_at = SystemTime::now() - Duration::from_secs(1);
        cache.put("isbn:1", &entry).await.unwrap();

        assert!(cache.get("isbn:1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_cache_evicts_oldest_at_capacity() {
        let cache = MemoryCache::new(2);
        let mut old = stored("https://old");
        old.resolved_at = SystemTime::now() - Duration::from_secs(100);
        cache.put("old", &old).await.unwrap();
        cache.put("new", &stored("https://new")).await.unwrap();
        cache.put("newest", &stored("https://newest")).await.unwrap();

        assert_eq!(cache.len().await.unwrap(), 2);
        assert!(cache.get("old").await.unwrap().is_none());
        assert!(cache.get("newest").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_noop_cache_stores_nothing() {
        let cache = NoOpCache;
        cache.put("k", &stored("https://a")).await.unwrap();
        assert!(cache.get("k").await.unwrap().is_none());
        assert_eq!(cache.len().await.unwrap(), 0);
    }
}
