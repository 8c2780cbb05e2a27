//! Scrape response cache
//!
//! Short-lived cache of external-lookup results, keyed by the full
//! serialized lookup options so any difference in inputs is a different
//! entry. Distinct from the per-URL status cache: this one remembers *which
//! candidates a scrape produced*, not whether a URL loads.

use crate::types::ImageCandidate;
use log::trace;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Scrape results expire after an hour
pub const RESPONSE_TTL: Duration = Duration::from_secs(60 * 60);

struct CachedResponse {
    candidates: Vec<ImageCandidate>,
    stored_at: Instant,
}

/// In-memory response cache with a fixed TTL
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CachedResponse>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::with_ttl(RESPONSE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Cached candidate list for a key, if present and fresh
    pub fn get(&self, key: &str) -> Option<Vec<ImageCandidate>> {
        let mut entries = self.entries.lock().expect("response cache lock poisoned");
        match entries.get(key) {
            Some(cached) if cached.stored_at.elapsed() > self.ttl => {
                trace!("Scrape cache entry expired for key {key}");
                entries.remove(key);
                None
            }
            Some(cached) => Some(cached.candidates.clone()),
            None => None,
        }
    }

    /// Store a candidate list (empty lists are cached too: a fruitless
    /// scrape should not be repeated inside the TTL window)
    pub fn put(&self, key: &str, candidates: Vec<ImageCandidate>) {
        let mut entries = self.entries.lock().expect("response cache lock poisoned");
        entries.insert(
            key.to_string(),
            CachedResponse {
                candidates,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .expect("response cache lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .expect("response cache lock poisoned")
            .clear();
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CandidateSource;

    #[test]
    fn test_put_then_get() {
        let cache = ResponseCache::new();
        let candidates = vec![ImageCandidate::new(
            "https://example.com/a.jpg",
            CandidateSource::GoogleBooks,
            0.9,
        )];
        cache.put("key", candidates.clone());
        assert_eq!(cache.get("key"), Some(candidates));
    }

    #[test]
    fn test_empty_result_is_cached() {
        let cache = ResponseCache::new();
        cache.put("fruitless", Vec::new());
        assert_eq!(cache.get("fruitless"), Some(Vec::new()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = ResponseCache::new();
        cache.put("key", Vec::new());

        tokio::time::advance(RESPONSE_TTL - Duration::from_secs(1)).await;
        assert!(cache.get("key").is_some(), "fresh inside the window");

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("key").is_none(), "expired past the window");
        assert!(cache.is_empty(), "expired entry dropped on read");
    }
}
