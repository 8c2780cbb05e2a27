//! Fallback candidate generation
//!
//! Pure string-to-URL construction: given whatever identifying fields
//! survived scraping, produce the ordered list of image candidates to try.
//! No network I/O happens here; validity is the prober's job.

use crate::types::{CandidateSource, ImageCandidate};

/// Local static asset served by the application itself. Always the last
/// candidate, so resolution can never come up empty.
pub const PLACEHOLDER_PATH: &str = "/images/placeholder-book.svg";

/// Maximum length of a title slug before the URL suffix
pub const TITLE_SLUG_MAX_LEN: usize = 50;

const OPENLIBRARY_COVERS_BASE: &str = "https://covers.openlibrary.org/b";

/// Confidence assigned to each static candidate tier
const ISBN_LARGE_CONFIDENCE: f32 = 0.8;
const ISBN_MEDIUM_CONFIDENCE: f32 = 0.7;
const TITLE_CONFIDENCE: f32 = 0.5;
const PLACEHOLDER_CONFIDENCE: f32 = 0.1;

/// OpenLibrary cover image size selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverSize {
    Large,
    Medium,
}

impl CoverSize {
    fn suffix(&self) -> &'static str {
        match self {
            CoverSize::Large => "L",
            CoverSize::Medium => "M",
        }
    }
}

/// Inputs to fallback generation. All optional; the output is never empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackInputs<'a> {
    pub isbn: Option<&'a str>,
    pub title: Option<&'a str>,
    /// Accepted for parity with the scraped record; not currently used for
    /// URL construction.
    pub source_id: Option<&'a str>,
}

/// Strip hyphens and whitespace from a raw ISBN
pub fn normalize_isbn(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect()
}

/// Slug a title for the OpenLibrary by-title endpoint: lowercase, drop
/// everything that is not alphanumeric or a space, collapse runs of spaces
/// to a single underscore, truncate to [`TITLE_SLUG_MAX_LEN`] characters.
pub fn title_slug(title: &str) -> String {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();

    let slug: String = cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");

    slug.chars().take(TITLE_SLUG_MAX_LEN).collect()
}

/// OpenLibrary cover URL for an ISBN (normalized before substitution)
pub fn isbn_cover_url(isbn: &str, size: CoverSize) -> String {
    let normalized = normalize_isbn(isbn);
    format!(
        "{OPENLIBRARY_COVERS_BASE}/isbn/{normalized}-{}.jpg",
        size.suffix()
    )
}

/// OpenLibrary cover URL for a title slug
pub fn title_cover_url(title: &str) -> String {
    let slug = title_slug(title);
    format!("{OPENLIBRARY_COVERS_BASE}/title/{slug}-L.jpg")
}

/// The terminal placeholder candidate
pub fn placeholder_candidate() -> ImageCandidate {
    ImageCandidate::new(
        PLACEHOLDER_PATH,
        CandidateSource::Placeholder,
        PLACEHOLDER_CONFIDENCE,
    )
}

/// Generate the ordered static fallback chain for a book.
///
/// ISBN candidates come first (large, then medium cover), then the by-title
/// candidate, then exactly one placeholder. The list is never empty.
pub fn generate_fallbacks(inputs: &FallbackInputs<'_>) -> Vec<ImageCandidate> {
    let mut candidates = Vec::new();

    if let Some(isbn) = inputs.isbn
        && !normalize_isbn(isbn).is_empty()
    {
        candidates.push(ImageCandidate::new(
            isbn_cover_url(isbn, CoverSize::Large),
            CandidateSource::OpenLibrary,
            ISBN_LARGE_CONFIDENCE,
        ));
        candidates.push(ImageCandidate::new(
            isbn_cover_url(isbn, CoverSize::Medium),
            CandidateSource::OpenLibrary,
            ISBN_MEDIUM_CONFIDENCE,
        ));
    }

    if let Some(title) = inputs.title
        && !title_slug(title).is_empty()
    {
        candidates.push(ImageCandidate::new(
            title_cover_url(title),
            CandidateSource::OpenLibrary,
            TITLE_CONFIDENCE,
        ));
    }

    candidates.push(placeholder_candidate());
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallbacks_never_empty_and_end_with_placeholder() {
        let empty = generate_fallbacks(&FallbackInputs::default());
        assert_eq!(empty.len(), 1);
        assert!(empty.last().unwrap().is_placeholder());

        let full = generate_fallbacks(&FallbackInputs {
            isbn: Some("978-0-13-468599-1"),
            title: Some("The Pragmatic Programmer"),
            source_id: Some("wob-123"),
        });
        assert_eq!(full.len(), 4);
        assert!(full.last().unwrap().is_placeholder());
        assert_eq!(
            full.iter().filter(|c| c.is_placeholder()).count(),
            1,
            "exactly one placeholder"
        );
    }

    #[test]
    fn test_isbn_urls_strip_hyphens_and_spaces() {
        let candidates = generate_fallbacks(&FallbackInputs {
            isbn: Some("978-0 13-468599 1"),
            ..Default::default()
        });
        assert_eq!(
            candidates[0].url,
            "https://covers.openlibrary.org/b/isbn/9780134685991-L.jpg"
        );
        assert_eq!(
            candidates[1].url,
            "https://covers.openlibrary.org/b/isbn/9780134685991-M.jpg"
        );
    }

    #[test]
    fn test_large_cover_precedes_medium() {
        let candidates = generate_fallbacks(&FallbackInputs {
            isbn: Some("9780441013593"),
            ..Default::default()
        });
        assert!(candidates[0].url.ends_with("-L.jpg"));
        assert!(candidates[1].url.ends_with("-M.jpg"));
        assert!(candidates[0].confidence > candidates[1].confidence);
    }

    #[test]
    fn test_title_slug_basic() {
        assert_eq!(title_slug("Dune"), "dune");
        assert_eq!(title_slug("The Pragmatic Programmer"), "the_pragmatic_programmer");
        assert_eq!(title_slug("C++ In A Nutshell!"), "c_in_a_nutshell");
    }

    #[test]
    fn test_title_slug_collapses_whitespace() {
        assert_eq!(title_slug("  a   b\t c "), "a_b_c");
    }

    #[test]
    fn test_title_slug_truncates() {
        let long = "x".repeat(200);
        assert_eq!(title_slug(&long).len(), TITLE_SLUG_MAX_LEN);
    }

    #[test]
    fn test_blank_isbn_emits_no_isbn_candidates() {
        let candidates = generate_fallbacks(&FallbackInputs {
            isbn: Some(" - - "),
            title: Some("Dune"),
            ..Default::default()
        });
        assert_eq!(candidates.len(), 2);
        assert_eq!(
            candidates[0].url,
            "https://covers.openlibrary.org/b/title/dune-L.jpg"
        );
    }

    #[test]
    fn test_punctuation_only_title_emits_no_title_candidate() {
        let candidates = generate_fallbacks(&FallbackInputs {
            title: Some("!!!"),
            ..Default::default()
        });
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].is_placeholder());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_fallbacks_terminate_with_placeholder(
                isbn in proptest::option::of("[0-9Xx -]{0,20}"),
                title in proptest::option::of(".{0,80}"),
            ) {
                let candidates = generate_fallbacks(&FallbackInputs {
                    isbn: isbn.as_deref(),
                    title: title.as_deref(),
                    source_id: None,
                });
                prop_assert!(!candidates.is_empty());
                prop_assert!(candidates.last().unwrap().is_placeholder());
            }

            #[test]
            fn prop_normalized_isbn_has_no_hyphens_or_spaces(raw in "[0-9Xx \\-]{1,30}") {
                let normalized = normalize_isbn(&raw);
                prop_assert!(!normalized.contains('-'));
                prop_assert!(!normalized.contains(char::is_whitespace));
            }

            #[test]
            fn prop_title_slug_charset_and_length(title in ".{0,200}") {
                let slug = title_slug(&title);
                prop_assert!(slug.len() <= TITLE_SLUG_MAX_LEN);
                prop_assert!(
                    slug.chars().all(|c| c.is_ascii_lowercase()
                        || c.is_ascii_digit()
                        || c == '_')
                );
                prop_assert!(!slug.starts_with('_'));
                prop_assert!(!slug.ends_with('_') || slug.len() == TITLE_SLUG_MAX_LEN);
            }
        }
    }
}
