//! Google Books volumes API lookup
//!
//! Read-only, unauthenticated access to the public volumes endpoint. The
//! lookup sits behind the [`VolumeLookup`] trait so tests can substitute a
//! scripted implementation and assert call counts.

use crate::error::{NetworkError, Result};
use async_trait::async_trait;
use log::{debug, trace};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const VOLUMES_URL: &str = "https://www.googleapis.com/books/v1/volumes";

/// How many volumes to request per query
const LOOKUP_MAX_RESULTS: u32 = 3;

/// Default bound for a volumes API request
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// One volume hit, reduced to the fields the resolver cares about
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeHit {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub thumbnail: Option<String>,
}

/// Trait for volume search implementations
#[async_trait]
pub trait VolumeLookup: Send + Sync {
    /// Run one volumes query (e.g. `isbn:9780441013593` or
    /// `intitle:"Dune" inauthor:"Frank Herbert"`).
    async fn search(&self, query: &str) -> Result<Vec<VolumeHit>>;
}

/// Query string for an ISBN lookup
pub fn isbn_query(isbn: &str) -> String {
    format!("isbn:{}", crate::candidates::normalize_isbn(isbn))
}

/// Query string for a title + author lookup
pub fn title_author_query(title: &str, author: &str) -> String {
    format!("intitle:\"{title}\" inauthor:\"{author}\"")
}

// Wire format of the volumes endpoint, reduced to what we read.

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<VolumeItem>,
}

#[derive(Debug, Deserialize)]
struct VolumeItem {
    #[serde(rename = "volumeInfo")]
    volume_info: RawVolumeInfo,
}

#[derive(Debug, Deserialize, Default)]
struct RawVolumeInfo {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(rename = "imageLinks")]
    image_links: Option<ImageLinks>,
}

#[derive(Debug, Deserialize)]
struct ImageLinks {
    thumbnail: Option<String>,
    #[serde(rename = "smallThumbnail")]
    small_thumbnail: Option<String>,
}

impl ImageLinks {
    /// Pick the best available link, upgraded to https. The API hands out
    /// plain-http thumbnail URLs that redirect anyway.
    fn best(&self) -> Option<String> {
        self.thumbnail
            .as_deref()
            .or(self.small_thumbnail.as_deref())
            .map(|link| link.replacen("http://", "https://", 1))
    }
}

/// HTTP implementation of [`VolumeLookup`]
pub struct GoogleBooksLookup {
    client: Client,
    timeout: Duration,
}

impl GoogleBooksLookup {
    /// Create a lookup with the default request timeout
    pub fn new(user_agent: &str) -> Result<Self> {
        Self::with_timeout(user_agent, DEFAULT_LOOKUP_TIMEOUT)
    }

    /// Create a lookup with a custom request timeout
    pub fn with_timeout(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent.to_string())
            .timeout(timeout)
            .build()
            .map_err(|e| NetworkError::ClientBuild {
                message: e.to_string(),
            })?;

        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl VolumeLookup for GoogleBooksLookup {
    async fn search(&self, query: &str) -> Result<Vec<VolumeHit>> {
        debug!("Google Books query: {query}");

        let max_results = LOOKUP_MAX_RESULTS.to_string();
        let request = self
            .client
            .get(VOLUMES_URL)
            .query(&[("q", query), ("maxResults", max_results.as_str())]);

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| NetworkError::timeout(VOLUMES_URL, self.timeout.as_secs()))??;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::http(VOLUMES_URL, status.as_u16()).into());
        }

        let body: VolumesResponse = response
            .json()
            .await
            .map_err(|e| NetworkError::decode(VOLUMES_URL, e.to_string()))?;

        let hits: Vec<VolumeHit> = body
            .items
            .into_iter()
            .map(|item| VolumeHit {
                title: item.volume_info.title,
                authors: item.volume_info.authors,
                thumbnail: item.volume_info.image_links.and_then(|links| links.best()),
            })
            .collect();

        trace!("Google Books returned {} hits for '{query}'", hits.len());
        Ok(hits)
    }
}
