//! Shared types for the cover resolution pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

/// A book record as scraped from the source retailer.
///
/// Every field is optional: the resolver is expected to make the best of
/// whatever subset survived scraping, down to an empty record (which resolves
/// straight to the placeholder).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookRef {
    /// Book title
    #[serde(default)]
    pub title: Option<String>,
    /// Author name
    #[serde(default)]
    pub author: Option<String>,
    /// ISBN, possibly containing hyphens or spaces
    #[serde(default)]
    pub isbn: Option<String>,
    /// Identifier assigned by the source retailer
    #[serde(default)]
    pub source_id: Option<String>,
    /// Product page URL at the source retailer
    #[serde(default)]
    pub source_url: Option<String>,
    /// Primary image URL from the scrape, possibly dead
    #[serde(default)]
    pub image_url: Option<String>,
}

impl BookRef {
    /// Whether the record carries anything the scraper can search on
    pub fn is_searchable(&self) -> bool {
        self.title.is_some() || self.isbn.is_some()
    }

    /// Whether the record identifies a book at all
    pub fn is_identifiable(&self) -> bool {
        self.title.is_some()
            || self.isbn.is_some()
            || self.source_url.is_some()
            || self.image_url.is_some()
    }

    /// Stable key for result caching: ISBN when present, otherwise
    /// title/author, otherwise the source URL.
    pub fn cache_key(&self) -> Option<String> {
        if let Some(isbn) = &self.isbn {
            return Some(format!("isbn:{isbn}"));
        }
        if let Some(title) = &self.title {
            let author = self.author.as_deref().unwrap_or("");
            return Some(format!("title:{title}|author:{author}"));
        }
        self.source_url.as_ref().map(|u| format!("url:{u}"))
    }
}

/// Provenance of an image candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateSource {
    /// The primary URL from the scraped record
    Primary,
    /// OpenLibrary covers API
    OpenLibrary,
    /// Google Books volumes API
    GoogleBooks,
    /// Pattern guess against the retailer's CDN
    RetailerCdn,
    /// Local static placeholder asset
    Placeholder,
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CandidateSource::Primary => "primary",
            CandidateSource::OpenLibrary => "openlibrary",
            CandidateSource::GoogleBooks => "google-books",
            CandidateSource::RetailerCdn => "retailer-cdn",
            CandidateSource::Placeholder => "placeholder",
        };
        write!(f, "{name}")
    }
}

/// One URL considered as a possible image source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageCandidate {
    pub url: String,
    pub source: CandidateSource,
    /// Confidence in [0, 1] that this URL shows the right cover
    pub confidence: f32,
}

impl ImageCandidate {
    pub fn new(url: impl Into<String>, source: CandidateSource, confidence: f32) -> Self {
        Self {
            url: url.into(),
            source,
            confidence,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.source == CandidateSource::Placeholder
    }
}

/// Load status tracked per URL in the shared status cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    /// A probe is (or was) in flight
    Loading,
    /// The URL resolved to a loadable image
    Loaded,
    /// The URL failed to load
    Error,
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStatus::Loading => write!(f, "loading"),
            LoadStatus::Loaded => write!(f, "loaded"),
            LoadStatus::Error => write!(f, "error"),
        }
    }
}
