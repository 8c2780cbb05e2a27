//! Shared image status cache
//!
//! A TTL cache of probe results keyed by URL (not by book: the same external
//! URL can be probed on behalf of many books, the placeholder most of all).
//! Entries expire 30 minutes after they were written and a failed URL is
//! retried at most [`MAX_RETRIES`] times before the failure becomes terminal
//! until TTL expiry.
//!
//! The cache is a plain struct: callers construct one and share it with an
//! `Arc`. Nothing here is process-global.

use crate::probe::ImageProber;
use crate::types::LoadStatus;
use futures::future::join_all;
use log::{debug, trace};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Retry budget for a URL whose probes keep failing
pub const MAX_RETRIES: u32 = 2;

/// Entry cap; reaching it triggers a bulk eviction of the oldest entries
pub const MAX_CACHE_SIZE: usize = 1000;

/// Entries older than this are treated as absent and re-probed
pub const ENTRY_TTL: Duration = Duration::from_secs(30 * 60);

/// Fraction of the cache evicted in bulk when the size cap is hit
const EVICTION_FRACTION: f64 = 0.2;

/// One cached probe result
#[derive(Debug, Clone)]
pub struct StatusEntry {
    pub status: LoadStatus,
    pub timestamp: Instant,
    pub retry_count: u32,
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entry_count: usize,
    pub hit_count: u64,
    pub miss_count: u64,
    pub eviction_count: u64,
}

/// TTL cache of per-URL load status, shared across resolutions
pub struct ImageStatusCache {
    entries: Mutex<HashMap<String, StatusEntry>>,
    stats: Mutex<CacheStats>,
    ttl: Duration,
    max_entries: usize,
}

impl ImageStatusCache {
    /// Create a cache with the default TTL and size cap
    pub fn new() -> Self {
        Self::with_limits(ENTRY_TTL, MAX_CACHE_SIZE)
    }

    /// Create a cache with custom limits (tests construct small ones)
    pub fn with_limits(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            stats: Mutex::new(CacheStats::default()),
            ttl,
            max_entries,
        }
    }

    /// Look up a URL. Entries past the TTL are removed and reported absent.
    pub fn get(&self, url: &str) -> Option<StatusEntry> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        let mut stats = self.stats.lock().expect("stats lock poisoned");

        match entries.get(url) {
            Some(entry) if entry.timestamp.elapsed() > self.ttl => {
                trace!("Cache entry for {url} expired, dropping");
                entries.remove(url);
                stats.entry_count = entries.len();
                stats.miss_count += 1;
                None
            }
            Some(entry) => {
                stats.hit_count += 1;
                Some(entry.clone())
            }
            None => {
                stats.miss_count += 1;
                None
            }
        }
    }

    /// Record a status for a URL, preserving its accumulated retry count.
    pub fn set(&self, url: &str, status: LoadStatus) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        let mut stats = self.stats.lock().expect("stats lock poisoned");

        let retry_count = entries.get(url).map(|e| e.retry_count).unwrap_or(0);

        if !entries.contains_key(url) && entries.len() >= self.max_entries {
            let evicted = Self::evict_oldest(&mut entries, self.max_entries);
            stats.eviction_count += evicted as u64;
            debug!("Status cache full, evicted {evicted} oldest entries");
        }

        entries.insert(
            url.to_string(),
            StatusEntry {
                status,
                timestamp: Instant::now(),
                retry_count,
            },
        );
        stats.entry_count = entries.len();
    }

    /// Whether a fresh probe of this URL is warranted: true when the URL is
    /// unknown (or expired), or has failed fewer than [`MAX_RETRIES`] times.
    /// A loaded or in-flight entry needs no retry.
    pub fn should_retry(&self, url: &str) -> bool {
        match self.get(url) {
            None => true,
            Some(entry) => entry.status == LoadStatus::Error && entry.retry_count < MAX_RETRIES,
        }
    }

    /// Bump the retry counter for a URL, creating an error entry if absent
    pub fn increment_retry(&self, url: &str) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        let mut stats = self.stats.lock().expect("stats lock poisoned");

        match entries.get_mut(url) {
            Some(entry) => {
                entry.retry_count = entry.retry_count.saturating_add(1);
            }
            None => {
                // Same capacity discipline as `set`: this path also inserts.
                if entries.len() >= self.max_entries {
                    let evicted = Self::evict_oldest(&mut entries, self.max_entries);
                    stats.eviction_count += evicted as u64;
                    debug!("Status cache full, evicted {evicted} oldest entries");
                }
                entries.insert(
                    url.to_string(),
                    StatusEntry {
                        status: LoadStatus::Error,
                        timestamp: Instant::now(),
                        retry_count: 1,
                    },
                );
            }
        }
        stats.entry_count = entries.len();
    }

    /// Best-effort parallel preload: probe every URL concurrently, record the
    /// outcome of each, and swallow individual failures. Returns the number
    /// of URLs that probed as loadable.
    pub async fn preload_images(&self, prober: &dyn ImageProber, urls: &[String]) -> usize {
        let probes = urls.iter().map(|url| async move {
            self.set(url, LoadStatus::Loading);
            let outcome = prober.probe(url).await;
            if outcome.is_valid() {
                self.set(url, LoadStatus::Loaded);
                true
            } else {
                self.set(url, LoadStatus::Error);
                self.increment_retry(url);
                false
            }
        });

        let results = join_all(probes).await;
        let loaded = results.into_iter().filter(|ok| *ok).count();
        debug!("Preloaded {loaded}/{} URLs", urls.len());
        loaded
    }

    /// Snapshot of the cache statistics
    pub fn stats(&self) -> CacheStats {
        *self.stats.lock().expect("stats lock poisoned")
    }

    /// Number of live entries (expired entries may still be counted until
    /// the next read touches them)
    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all entries and reset statistics
    pub fn clear(&self) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        let mut stats = self.stats.lock().expect("stats lock poisoned");
        entries.clear();
        *stats = CacheStats::default();
    }

    /// Remove the oldest [`EVICTION_FRACTION`] of entries by timestamp.
    /// Returns how many were evicted.
    fn evict_oldest(entries: &mut HashMap<String, StatusEntry>, capacity: usize) -> usize {
        let to_evict = ((capacity as f64 * EVICTION_FRACTION).ceil() as usize).max(1);

        let mut by_age: Vec<(String, Instant)> = entries
            .iter()
            .map(|(url, entry)| (url.clone(), entry.timestamp))
            .collect();
        by_age.sort_by_key(|(_, ts)| *ts);

        for (url, _) in by_age.into_iter().take(to_evict) {
            entries.remove(&url);
        }
        to_evict
    }
}

impl Default for ImageStatusCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get() {
        let cache = ImageStatusCache::new();
        cache.set("https://example.com/a.jpg", LoadStatus::Loaded);

        let entry = cache.get("https://example.com/a.jpg").unwrap();
        assert_eq!(entry.status, LoadStatus::Loaded);
        assert_eq!(entry.retry_count, 0);
    }

    #[test]
    fn test_miss_recorded_in_stats() {
        let cache = ImageStatusCache::new();
        assert!(cache.get("https://example.com/missing.jpg").is_none());

        let stats = cache.stats();
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.hit_count, 0);
    }

    #[test]
    fn test_set_preserves_retry_count() {
        let cache = ImageStatusCache::new();
        cache.set("u", LoadStatus::Error);
        cache.increment_retry("u");
        cache.set("u", LoadStatus::Error);

        assert_eq!(cache.get("u").unwrap().retry_count, 1);
    }

    #[test]
    fn test_should_retry_respects_budget() {
        let cache = ImageStatusCache::new();
        assert!(cache.should_retry("u"), "unknown URL is retryable");

        cache.set("u", LoadStatus::Error);
        cache.increment_retry("u");
        assert!(cache.should_retry("u"));

        cache.increment_retry("u");
        assert!(!cache.should_retry("u"), "budget of {MAX_RETRIES} exhausted");
    }

    #[test]
    fn test_should_retry_false_for_settled_entries() {
        let cache = ImageStatusCache::new();
        cache.set("loaded", LoadStatus::Loaded);
        cache.set("loading", LoadStatus::Loading);

        assert!(!cache.should_retry("loaded"));
        assert!(!cache.should_retry("loading"));
    }

    #[test]
    fn test_clear_resets_everything() {
        let cache = ImageStatusCache::new();
        cache.set("a", LoadStatus::Loaded);
        cache.set("b", LoadStatus::Error);
        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn test_bulk_eviction_removes_oldest_fifth() {
        let cache = ImageStatusCache::with_limits(ENTRY_TTL, 10);
        for i in 0..10 {
            cache.set(&format!("u{i}"), LoadStatus::Loaded);
        }
        assert_eq!(cache.len(), 10);

        // 11th distinct URL: 20% of 10 = 2 oldest entries go first
        cache.set("u10", LoadStatus::Loaded);
        assert_eq!(cache.len(), 9);
        assert_eq!(cache.stats().eviction_count, 2);
        assert!(cache.get("u10").is_some());
    }

    #[test]
    fn test_increment_retry_insert_respects_capacity() {
        let cache = ImageStatusCache::with_limits(ENTRY_TTL, 2);
        cache.set("a", LoadStatus::Loaded);
        cache.set("b", LoadStatus::Loaded);

        // Inserting a fresh error entry through the retry path must evict,
        // not grow past the cap
        cache.increment_retry("c");
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().eviction_count, 1);
        assert_eq!(cache.get("c").unwrap().retry_count, 1);
    }
}
