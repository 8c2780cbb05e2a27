//! Coverfall Core Library
//!
//! This is the core library for the coverfall resolution pipeline: fallback
//! candidate generation, candidate probing, a shared TTL status cache,
//! external cover scraping, and the orchestrator tying them together.

pub mod cache;
pub mod candidates;
pub mod error;
pub mod observer;
pub mod probe;
pub mod resolver;
pub mod scrape;
pub mod state;
pub mod types;

// Re-export main types
pub use cache::{CacheStats, ImageStatusCache, StatusEntry, ENTRY_TTL, MAX_CACHE_SIZE, MAX_RETRIES};
pub use candidates::{generate_fallbacks, FallbackInputs, PLACEHOLDER_PATH};
pub use error::{Error, Result};
pub use observer::{NullObserver, ResolveObserver, SharedObserver};
pub use probe::{HttpProber, ImageProber, ProbeOutcome};
pub use resolver::{CoverResolver, Resolution, ResolveOptions};
pub use scrape::{CoverScraper, GoogleBooksLookup, ScrapeOptions, VolumeHit, VolumeLookup};
pub use state::ResolveState;
pub use types::{BookRef, CandidateSource, ImageCandidate, LoadStatus};

use std::sync::Arc;
use std::time::Duration;

/// Core resolver configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ResolverConfig {
    /// Bound on existence probes, in seconds
    pub probe_timeout_secs: u64,
    /// Bound on preload probes, in seconds
    pub preload_timeout_secs: u64,
    /// Bound on external lookup requests, in seconds
    pub lookup_timeout_secs: u64,
    /// User agent presented to external hosts
    pub user_agent: String,
    /// Scraper candidate budget
    pub max_results: usize,
    /// Scraper confidence floor
    pub min_confidence: f32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            probe_timeout_secs: 3,
            preload_timeout_secs: 5,
            lookup_timeout_secs: 10,
            user_agent: format!("coverfall/{}", env!("CARGO_PKG_VERSION")),
            max_results: 3,
            min_confidence: 0.5,
        }
    }
}

impl ResolverConfig {
    /// Create a test configuration with short timeouts
    pub fn test() -> Self {
        Self {
            probe_timeout_secs: 1,
            preload_timeout_secs: 1,
            lookup_timeout_secs: 1,
            user_agent: "coverfall-test".to_string(),
            max_results: 3,
            min_confidence: 0.5,
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn preload_timeout(&self) -> Duration {
        Duration::from_secs(self.preload_timeout_secs)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }
}

/// Build a fully wired HTTP-backed resolver from a configuration.
///
/// Convenience for binaries; tests wire up [`CoverResolver::new`] with mock
/// collaborators instead.
pub fn build_resolver(config: &ResolverConfig) -> Result<CoverResolver> {
    let prober: Arc<dyn ImageProber> = Arc::new(HttpProber::with_timeout(
        &config.user_agent,
        config.probe_timeout(),
    )?);
    let lookup: Arc<dyn VolumeLookup> = Arc::new(GoogleBooksLookup::with_timeout(
        &config.user_agent,
        config.lookup_timeout(),
    )?);
    let cache = Arc::new(ImageStatusCache::new());
    let scraper = Arc::new(CoverScraper::new(lookup, Arc::clone(&prober)));

    Ok(CoverResolver::new(prober, cache, scraper))
}
