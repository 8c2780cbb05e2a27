//! External cover scraping
//!
//! When the static fallback chain is exhausted, the scraper consults
//! external sources in a fixed tier order: Google Books by ISBN, Google
//! Books by title + author, OpenLibrary by ISBN, OpenLibrary by title, and
//! finally pattern guesses against the retailer's CDN. Results are ranked
//! by per-tier confidence and cached for an hour keyed by the full set of
//! lookup options.

use crate::error::Result;
use crate::probe::ImageProber;
use crate::types::{CandidateSource, ImageCandidate};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod google_books;
pub mod open_library;
pub mod response_cache;
pub mod retailer;

pub use google_books::{GoogleBooksLookup, VolumeHit, VolumeLookup};
pub use response_cache::ResponseCache;

/// Per-tier confidence ranking
pub const GOOGLE_BOOKS_ISBN_CONFIDENCE: f32 = 0.9;
pub const OPENLIBRARY_ISBN_CONFIDENCE: f32 = 0.8;
pub const GOOGLE_BOOKS_TITLE_CONFIDENCE: f32 = 0.7;
pub const RETAILER_CDN_CONFIDENCE: f32 = 0.7;
pub const OPENLIBRARY_TITLE_CONFIDENCE: f32 = 0.6;

/// Options for one scrape pass. Serialized wholesale as the response-cache
/// key, so every field participates in cache identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeOptions {
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    /// Stop collecting once this many candidates have been gathered
    pub max_results: usize,
    /// Candidates below this confidence are discarded
    pub min_confidence: f32,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            isbn: None,
            title: None,
            author: None,
            source_url: None,
            max_results: 3,
            min_confidence: 0.5,
        }
    }
}

impl ScrapeOptions {
    /// Response-cache key: the serialized options. Serialization of a plain
    /// struct cannot realistically fail, but fall back to the debug
    /// rendering rather than panicking in library code.
    pub fn cache_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

/// Scraper coordinating the external lookup tiers
pub struct CoverScraper {
    lookup: Arc<dyn VolumeLookup>,
    prober: Arc<dyn ImageProber>,
    cache: ResponseCache,
}

impl CoverScraper {
    pub fn new(lookup: Arc<dyn VolumeLookup>, prober: Arc<dyn ImageProber>) -> Self {
        Self {
            lookup,
            prober,
            cache: ResponseCache::new(),
        }
    }

    /// Scraper with a custom response-cache TTL (tests shrink it)
    pub fn with_cache(
        lookup: Arc<dyn VolumeLookup>,
        prober: Arc<dyn ImageProber>,
        cache: ResponseCache,
    ) -> Self {
        Self {
            lookup,
            prober,
            cache,
        }
    }

    /// Find cover candidates for the given options, best first.
    ///
    /// Never fails: a tier whose lookup errors is logged and skipped. The
    /// (possibly empty) ranked result is cached for [`response_cache::RESPONSE_TTL`].
    pub async fn find_covers(&self, options: &ScrapeOptions) -> Vec<ImageCandidate> {
        let key = options.cache_key();
        if let Some(cached) = self.cache.get(&key) {
            debug!("Scrape cache hit for {key}");
            return cached;
        }

        let mut candidates = self.gather(options).await;
        candidates.retain(|c| c.confidence >= options.min_confidence);
        candidates.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        self.cache.put(&key, candidates.clone());
        candidates
    }

    /// The single best candidate, if any tier produced one
    pub async fn best_cover(&self, options: &ScrapeOptions) -> Option<ImageCandidate> {
        self.find_covers(options).await.into_iter().next()
    }

    /// Number of cached scrape responses
    pub fn cached_responses(&self) -> usize {
        self.cache.len()
    }

    /// Drop all cached scrape responses
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Tiers whose fixed confidence sits below the floor are skipped
    /// outright: their hits could never survive the confidence filter, but
    /// they would still count against `max_results` and starve later,
    /// qualifying tiers.
    async fn gather(&self, options: &ScrapeOptions) -> Vec<ImageCandidate> {
        let mut found: Vec<ImageCandidate> = Vec::new();
        let qualifies = |confidence: f32| confidence >= options.min_confidence;

        // Tier 1: Google Books by ISBN
        if let Some(isbn) = &options.isbn
            && qualifies(GOOGLE_BOOKS_ISBN_CONFIDENCE)
        {
            self.google_tier(
                &google_books::isbn_query(isbn),
                GOOGLE_BOOKS_ISBN_CONFIDENCE,
                &mut found,
            )
            .await;
            if found.len() >= options.max_results {
                return found;
            }
        }

        // Tier 2: Google Books by title + author
        if let (Some(title), Some(author)) = (&options.title, &options.author)
            && qualifies(GOOGLE_BOOKS_TITLE_CONFIDENCE)
        {
            self.google_tier(
                &google_books::title_author_query(title, author),
                GOOGLE_BOOKS_TITLE_CONFIDENCE,
                &mut found,
            )
            .await;
            if found.len() >= options.max_results {
                return found;
            }
        }

        // Tier 3: OpenLibrary by ISBN
        if let Some(isbn) = &options.isbn
            && qualifies(OPENLIBRARY_ISBN_CONFIDENCE)
        {
            if let Some(hit) = open_library::lookup_by_isbn(self.prober.as_ref(), isbn).await {
                found.push(hit);
            }
            if found.len() >= options.max_results {
                return found;
            }
        }

        // Tier 4: OpenLibrary by title
        if let Some(title) = &options.title
            && qualifies(OPENLIBRARY_TITLE_CONFIDENCE)
        {
            if let Some(hit) = open_library::lookup_by_title(self.prober.as_ref(), title).await {
                found.push(hit);
            }
            if found.len() >= options.max_results {
                return found;
            }
        }

        // Tier 5: retailer CDN pattern guesses
        if let Some(source_url) = &options.source_url
            && qualifies(RETAILER_CDN_CONFIDENCE)
            && let Some(hit) = retailer::lookup_by_source_url(self.prober.as_ref(), source_url).await
        {
            found.push(hit);
        }

        found
    }

    async fn google_tier(&self, query: &str, confidence: f32, found: &mut Vec<ImageCandidate>) {
        match self.lookup.search(query).await {
            Ok(hits) => {
                for hit in hits {
                    if let Some(thumbnail) = hit.thumbnail {
                        found.push(ImageCandidate::new(
                            thumbnail,
                            CandidateSource::GoogleBooks,
                            confidence,
                        ));
                    }
                }
            }
            Err(e) => {
                warn!("Google Books lookup '{query}' failed: {e}");
            }
        }
    }
}
