//! Retailer CDN pattern guesses
//!
//! Unauthenticated, best-effort URL templates interpolating the product id
//! extracted from the source URL's trailing path segment. Most of these
//! 404; each guess is probed before it is offered as a candidate.

use crate::probe::ImageProber;
use crate::types::{CandidateSource, ImageCandidate};
use log::trace;

use super::RETAILER_CDN_CONFIDENCE;

/// Hardcoded CDN templates, `{id}` interpolated
const CDN_TEMPLATES: &[&str] = &[
    "https://cdn.worldofbooks.com/images/{id}.jpg",
    "https://cdn.worldofbooks.com/product/{id}/cover.jpg",
    "https://www.worldofbooks.com/cdn/shop/products/{id}.jpg",
];

/// Extract the product id from a retailer product URL: the trailing path
/// segment, with any query string and `.html` suffix stripped.
pub fn extract_product_id(source_url: &str) -> Option<String> {
    let without_fragment = source_url.split('#').next().unwrap_or(source_url);
    let without_query = without_fragment.split('?').next().unwrap_or(without_fragment);

    let segment = without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && !s.contains(':'))?;

    let id = segment.strip_suffix(".html").unwrap_or(segment);
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Probe the CDN pattern guesses for a source URL, returning the first that
/// resolves. Templates are tried in order; the first hit wins.
pub async fn lookup_by_source_url(
    prober: &dyn ImageProber,
    source_url: &str,
) -> Option<ImageCandidate> {
    let id = extract_product_id(source_url)?;

    for template in CDN_TEMPLATES {
        let url = template.replace("{id}", &id);
        if prober.probe(&url).await.is_valid() {
            trace!("Retailer CDN guess resolved: {url}");
            return Some(ImageCandidate::new(
                url,
                CandidateSource::RetailerCdn,
                RETAILER_CDN_CONFIDENCE,
            ));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeOutcome;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[test]
    fn test_extract_trailing_segment() {
        assert_eq!(
            extract_product_id("https://www.worldofbooks.com/en-gb/books/frank-herbert/dune/GOR001234567").as_deref(),
            Some("GOR001234567")
        );
    }

    #[test]
    fn test_extract_strips_query_and_html() {
        assert_eq!(
            extract_product_id("https://shop.example.com/p/abc123.html?ref=grid#top").as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn test_extract_handles_trailing_slash() {
        assert_eq!(
            extract_product_id("https://shop.example.com/p/abc123/").as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn test_extract_rejects_bare_host() {
        assert_eq!(extract_product_id("https:"), None);
        assert_eq!(extract_product_id(""), None);
    }

    struct ScriptedProber {
        valid_url: String,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ImageProber for ScriptedProber {
        async fn probe(&self, url: &str) -> ProbeOutcome {
            self.calls.lock().unwrap().push(url.to_string());
            if url == self.valid_url {
                ProbeOutcome::Loadable
            } else {
                ProbeOutcome::Unreachable
            }
        }
    }

    #[tokio::test]
    async fn test_templates_tried_in_order_first_hit_wins() {
        let prober = ScriptedProber {
            valid_url: "https://cdn.worldofbooks.com/product/GOR1/cover.jpg".to_string(),
            calls: Mutex::new(Vec::new()),
        };

        let hit = lookup_by_source_url(&prober, "https://www.worldofbooks.com/p/GOR1")
            .await
            .unwrap();
        assert_eq!(hit.url, "https://cdn.worldofbooks.com/product/GOR1/cover.jpg");
        assert_eq!(hit.confidence, RETAILER_CDN_CONFIDENCE);

        let calls = prober.calls.lock().unwrap();
        assert_eq!(calls.len(), 2, "stops probing after the first hit");
        assert_eq!(calls[0], "https://cdn.worldofbooks.com/images/GOR1.jpg");
    }

    #[tokio::test]
    async fn test_all_guesses_missing_yields_none() {
        let prober = ScriptedProber {
            valid_url: String::new(),
            calls: Mutex::new(Vec::new()),
        };
        assert!(
            lookup_by_source_url(&prober, "https://www.worldofbooks.com/p/GOR2")
                .await
                .is_none()
        );
    }
}
