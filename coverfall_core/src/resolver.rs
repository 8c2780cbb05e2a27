//! Cover resolution orchestrator
//!
//! Tries, in order: the primary URL from the scraped record (unless it is
//! structurally invalid or points at a known-broken host), the generated
//! static fallbacks, one external scrape pass, and finally the local
//! placeholder. Resolution never fails; it degrades.

use crate::cache::ImageStatusCache;
use crate::candidates::{self, FallbackInputs, PLACEHOLDER_PATH};
use crate::observer::{NullObserver, ResolveObserver};
use crate::probe::ImageProber;
use crate::scrape::{CoverScraper, ScrapeOptions};
use crate::state::ResolveState;
use crate::types::{BookRef, CandidateSource, ImageCandidate, LoadStatus};
use log::{debug, trace, warn};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;

/// Host patterns whose images are known to be dead; a primary URL matching
/// one of these is skipped without a probe.
pub const BROKEN_HOST_PATTERNS: &[&str] = &["images.worldofbooks.com"];

/// Options for one resolution
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Bypass the shared status cache (probe everything fresh)
    pub skip_cache: bool,
    /// Suppress the external scrape pass
    pub no_scrape: bool,
    /// Passed through to the scraper; `None` keeps the scraper defaults
    pub min_confidence: Option<f32>,
    /// Passed through to the scraper; `None` keeps the scraper defaults
    pub max_results: Option<usize>,
    /// Cancellation handle tied to the caller's lifetime. The resolver
    /// checks it before every probe and before every cache write; a
    /// cancelled resolution commits nothing further.
    pub cancel: Option<CancellationToken>,
}

/// Outcome of a resolution. Always carries a usable URL; at worst the
/// placeholder path.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub url: String,
    pub source: CandidateSource,
    /// Number of probes issued for this resolution
    pub attempts: u32,
    /// The winning URL came out of the status cache without a fresh probe
    pub from_cache: bool,
    /// The resolution was abandoned because its token fired
    pub cancelled: bool,
    pub state: ResolveState,
}

impl Resolution {
    pub fn is_placeholder(&self) -> bool {
        self.source == CandidateSource::Placeholder
    }

    fn placeholder(attempts: u32, cancelled: bool) -> Self {
        Self {
            url: PLACEHOLDER_PATH.to_string(),
            source: CandidateSource::Placeholder,
            attempts,
            from_cache: false,
            cancelled,
            state: ResolveState::Failed,
        }
    }

    fn loaded(url: &str, source: CandidateSource, attempts: u32, from_cache: bool) -> Self {
        Self {
            url: url.to_string(),
            source,
            attempts,
            from_cache,
            cancelled: false,
            state: ResolveState::Loaded {
                url: url.to_string(),
                source,
            },
        }
    }
}

/// Whether a scraped primary URL is worth probing at all: it must parse, it
/// must carry an http(s) scheme (or be a local asset path), and its host
/// must not be known to serve nothing.
pub fn is_plausible_primary(url: &str) -> bool {
    if url.starts_with('/') {
        return true;
    }
    let Ok(parsed) = url::Url::parse(url) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    match parsed.host_str() {
        Some(host) => !BROKEN_HOST_PATTERNS.iter().any(|p| host.contains(p)),
        None => false,
    }
}

fn cache_bust_url(url: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}cb={millis}")
}

enum Attempt {
    Loaded,
    Failed,
    Cancelled,
}

/// Orchestrator for cover resolution. Collaborators are injected and shared
/// by `Arc`; construct one resolver and reuse it across resolutions.
pub struct CoverResolver {
    prober: Arc<dyn ImageProber>,
    cache: Arc<ImageStatusCache>,
    scraper: Arc<CoverScraper>,
}

impl CoverResolver {
    pub fn new(
        prober: Arc<dyn ImageProber>,
        cache: Arc<ImageStatusCache>,
        scraper: Arc<CoverScraper>,
    ) -> Self {
        Self {
            prober,
            cache,
            scraper,
        }
    }

    /// Shared status cache, for preloading and stats
    pub fn status_cache(&self) -> &Arc<ImageStatusCache> {
        &self.cache
    }

    /// Resolve without observation
    pub async fn resolve(&self, book: &BookRef, options: &ResolveOptions) -> Resolution {
        self.resolve_with_observer(book, options, &NullObserver)
            .await
    }

    /// Resolve, reporting terminal per-URL outcomes to the observer
    pub async fn resolve_with_observer(
        &self,
        book: &BookRef,
        options: &ResolveOptions,
        observer: &dyn ResolveObserver,
    ) -> Resolution {
        let mut state = ResolveState::Initializing;
        let mut attempts = 0u32;

        let chain = self.build_chain(book);
        debug!(
            "Resolving cover for {:?} across {} static candidates",
            book.cache_key(),
            chain.len()
        );

        for candidate in &chain {
            if Self::is_cancelled(options) {
                return Resolution::placeholder(attempts, true);
            }

            if !options.skip_cache {
                if let Some(entry) = self.cache.get(&candidate.url) {
                    match entry.status {
                        LoadStatus::Loaded => {
                            trace!("Cache hit for {}", candidate.url);
                            observer.on_image_loaded(&candidate.url);
                            return Resolution::loaded(
                                &candidate.url,
                                candidate.source,
                                attempts,
                                true,
                            );
                        }
                        LoadStatus::Error if !self.cache.should_retry(&candidate.url) => {
                            trace!("Skipping {} (retry budget exhausted)", candidate.url);
                            continue;
                        }
                        // A loading entry from a racing resolution is not a
                        // coordination point: probe independently,
                        // last write wins.
                        _ => {}
                    }
                }
            }

            match self
                .attempt(&candidate.url, candidate.source, &mut state, &mut attempts, options)
                .await
            {
                Attempt::Loaded => {
                    observer.on_image_loaded(&candidate.url);
                    return Resolution::loaded(&candidate.url, candidate.source, attempts, false);
                }
                Attempt::Cancelled => return Resolution::placeholder(attempts, true),
                Attempt::Failed => {}
            }

            // One cache-busting retry of a still-plausible primary: its
            // first failure may be a stale CDN edge rather than a dead URL.
            if candidate.source == CandidateSource::Primary {
                let busted = cache_bust_url(&candidate.url);
                debug!("Primary failed once, retrying with cache buster: {busted}");

                match self
                    .attempt(&busted, candidate.source, &mut state, &mut attempts, options)
                    .await
                {
                    Attempt::Loaded => {
                        observer.on_image_loaded(&busted);
                        return Resolution::loaded(
                            &busted,
                            candidate.source,
                            attempts,
                            false,
                        );
                    }
                    Attempt::Cancelled => return Resolution::placeholder(attempts, true),
                    Attempt::Failed => {}
                }
            }

            observer.on_image_error(&candidate.url);
        }

        // Static fallbacks exhausted: one scrape pass, if the record gives
        // the scraper anything to search on.
        if !options.no_scrape && book.is_searchable() {
            if Self::is_cancelled(options) {
                return Resolution::placeholder(attempts, true);
            }

            let scraped = self.scrape_once(book, options).await;
            if let Some(best) = scraped
                && !best.is_placeholder()
            {
                match self
                    .attempt(&best.url, best.source, &mut state, &mut attempts, options)
                    .await
                {
                    Attempt::Loaded => {
                        observer.on_image_loaded(&best.url);
                        return Resolution::loaded(&best.url, best.source, attempts, false);
                    }
                    Attempt::Cancelled => return Resolution::placeholder(attempts, true),
                    Attempt::Failed => {
                        observer.on_image_error(&best.url);
                    }
                }
            }
        }

        debug!("All candidates exhausted, settling on placeholder");
        Resolution::placeholder(attempts, false)
    }

    fn is_cancelled(options: &ResolveOptions) -> bool {
        options.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }

    /// Static candidate chain: plausible primary first, then generated
    /// fallbacks. The placeholder candidate is implicit; it needs no probe.
    fn build_chain(&self, book: &BookRef) -> Vec<ImageCandidate> {
        let mut chain = Vec::new();

        if let Some(primary) = &book.image_url {
            if is_plausible_primary(primary) {
                chain.push(ImageCandidate::new(
                    primary.clone(),
                    CandidateSource::Primary,
                    1.0,
                ));
            } else {
                debug!("Skipping implausible primary URL: {primary}");
            }
        }

        let fallbacks = candidates::generate_fallbacks(&FallbackInputs {
            isbn: book.isbn.as_deref(),
            title: book.title.as_deref(),
            source_id: book.source_id.as_deref(),
        });
        chain.extend(fallbacks.into_iter().filter(|c| !c.is_placeholder()));
        chain
    }

    /// Probe one candidate, recording the outcome in the status cache.
    /// Cancellation is re-checked after the probe settles so a cancelled
    /// resolution never commits a result it no longer wants.
    async fn attempt(
        &self,
        url: &str,
        source: CandidateSource,
        state: &mut ResolveState,
        attempts: &mut u32,
        options: &ResolveOptions,
    ) -> Attempt {
        if Self::is_cancelled(options) {
            return Attempt::Cancelled;
        }

        let next = ResolveState::Loading {
            url: url.to_string(),
            source,
        };
        debug_assert!(state.can_transition_to(&next));
        *state = next;

        self.cache.set(url, LoadStatus::Loading);
        *attempts += 1;

        let outcome = self.prober.probe(url).await;

        if Self::is_cancelled(options) {
            return Attempt::Cancelled;
        }

        if outcome.is_valid() {
            self.cache.set(url, LoadStatus::Loaded);
            *state = ResolveState::Loaded {
                url: url.to_string(),
                source,
            };
            Attempt::Loaded
        } else {
            warn!("Candidate {url} failed to load ({outcome:?})");
            self.cache.set(url, LoadStatus::Error);
            self.cache.increment_retry(url);
            Attempt::Failed
        }
    }

    async fn scrape_once(
        &self,
        book: &BookRef,
        options: &ResolveOptions,
    ) -> Option<ImageCandidate> {
        let defaults = ScrapeOptions::default();
        let scrape_options = ScrapeOptions {
            isbn: book.isbn.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            source_url: book.source_url.clone(),
            max_results: options.max_results.unwrap_or(defaults.max_results),
            min_confidence: options.min_confidence.unwrap_or(defaults.min_confidence),
        };
        self.scraper.best_cover(&scrape_options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plausible_primary_rules() {
        assert!(is_plausible_primary("https://example.com/cover.jpg"));
        assert!(is_plausible_primary("http://example.com/cover.jpg"));
        assert!(is_plausible_primary("/images/local.jpg"));
        assert!(!is_plausible_primary("ftp://example.com/cover.jpg"));
        assert!(!is_plausible_primary("example.com/cover.jpg"));
        assert!(!is_plausible_primary(
            "https://images.worldofbooks.com/x.jpg"
        ));
    }

    #[test]
    fn test_plausible_primary_rejects_unparseable_urls() {
        assert!(!is_plausible_primary("https://[broken/x.jpg"));
        assert!(!is_plausible_primary("https://exa mple.com/x.jpg"));
        assert!(!is_plausible_primary("https://"));
    }

    #[test]
    fn test_broken_host_match_is_on_the_host_not_the_path() {
        assert!(is_plausible_primary(
            "https://example.com/mirror/images.worldofbooks.com/x.jpg"
        ));
        assert!(!is_plausible_primary(
            "http://images.worldofbooks.com/covers/y.jpg"
        ));
    }

    #[test]
    fn test_cache_bust_url_separator() {
        let plain = cache_bust_url("https://example.com/a.jpg");
        assert!(plain.contains("?cb="));

        let with_query = cache_bust_url("https://example.com/a.jpg?w=300");
        assert!(with_query.contains("&cb="));
    }

    #[test]
    fn test_placeholder_resolution_shape() {
        let resolution = Resolution::placeholder(3, false);
        assert!(resolution.is_placeholder());
        assert_eq!(resolution.url, PLACEHOLDER_PATH);
        assert_eq!(resolution.state, ResolveState::Failed);
        assert_eq!(resolution.attempts, 3);
    }
}
