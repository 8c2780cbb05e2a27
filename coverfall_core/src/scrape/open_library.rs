//! OpenLibrary cover lookups
//!
//! The covers endpoint has no search API worth speaking of: a cover either
//! exists at the constructed URL or it does not. So a "lookup" here is URL
//! construction (shared with the static fallback generator) plus a probe.

use crate::candidates::{self, CoverSize};
use crate::probe::ImageProber;
use crate::types::{CandidateSource, ImageCandidate};
use log::trace;

use super::{OPENLIBRARY_ISBN_CONFIDENCE, OPENLIBRARY_TITLE_CONFIDENCE};

/// Probe the ISBN-based cover URL; Some when the cover exists
pub async fn lookup_by_isbn(prober: &dyn ImageProber, isbn: &str) -> Option<ImageCandidate> {
    let url = candidates::isbn_cover_url(isbn, CoverSize::Large);
    if prober.probe(&url).await.is_valid() {
        trace!("OpenLibrary ISBN cover found: {url}");
        Some(ImageCandidate::new(
            url,
            CandidateSource::OpenLibrary,
            OPENLIBRARY_ISBN_CONFIDENCE,
        ))
    } else {
        None
    }
}

/// Probe the title-slug cover URL; Some when the cover exists
pub async fn lookup_by_title(prober: &dyn ImageProber, title: &str) -> Option<ImageCandidate> {
    if candidates::title_slug(title).is_empty() {
        return None;
    }
    let url = candidates::title_cover_url(title);
    if prober.probe(&url).await.is_valid() {
        trace!("OpenLibrary title cover found: {url}");
        Some(ImageCandidate::new(
            url,
            CandidateSource::OpenLibrary,
            OPENLIBRARY_TITLE_CONFIDENCE,
        ))
    } else {
        None
    }
}
