//! Batch resolution from JSONL input
//!
//! Reads one book record per line and resolves them with bounded
//! concurrency. A cancellation token aborts the remainder of the batch;
//! resolutions already settled are still reported.

use anyhow::{Context, Result};
use coverfall_core::resolver::{CoverResolver, Resolution, ResolveOptions};
use coverfall_core::types::BookRef;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// How many resolutions run concurrently
    pub concurrency: usize,
    pub skip_cache: bool,
    pub no_scrape: bool,
    pub show_progress: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            skip_cache: false,
            no_scrape: false,
            show_progress: false,
        }
    }
}

/// Parse a JSONL file of book records. Blank lines are skipped; a malformed
/// line fails the whole batch with its line number.
pub async fn read_books(path: &Path) -> Result<Vec<BookRef>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut books = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let book: BookRef = serde_json::from_str(line)
            .with_context(|| format!("Invalid record on line {}", index + 1))?;
        books.push(book);
    }

    debug!("Read {} book records from {}", books.len(), path.display());
    Ok(books)
}

/// Resolve a batch of books, preserving input order in the output
pub async fn run_batch(
    resolver: Arc<CoverResolver>,
    books: Vec<BookRef>,
    options: &BatchOptions,
    cancel: CancellationToken,
) -> Vec<(BookRef, Resolution)> {
    let bar = if options.show_progress {
        let bar = ProgressBar::new(books.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar
    } else {
        ProgressBar::hidden()
    };

    let concurrency = options.concurrency.max(1);
    let resolve_options = ResolveOptions {
        skip_cache: options.skip_cache,
        no_scrape: options.no_scrape,
        cancel: Some(cancel),
        ..Default::default()
    };

    let results: Vec<(BookRef, Resolution)> = stream::iter(books)
        .map(|book| {
            let resolver = Arc::clone(&resolver);
            let resolve_options = resolve_options.clone();
            let bar = bar.clone();
            async move {
                let resolution = resolver.resolve(&book, &resolve_options).await;
                bar.inc(1);
                (book, resolution)
            }
        })
        .buffered(concurrency)
        .collect()
        .await;

    bar.finish_and_clear();
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_jsonl(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    #[tokio::test]
    async fn test_read_books_skips_blank_lines() {
        let file = write_jsonl(&[
            r#"{"isbn": "9780441013593"}"#,
            "",
            r#"{"title": "Dune", "author": "Frank Herbert"}"#,
        ]);

        let books = read_books(file.path()).await.unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].isbn.as_deref(), Some("9780441013593"));
        assert_eq!(books[1].title.as_deref(), Some("Dune"));
    }

    #[tokio::test]
    async fn test_read_books_reports_line_of_bad_record() {
        let file = write_jsonl(&[r#"{"isbn": "9780441013593"}"#, "not json"]);

        let err = read_books(file.path()).await.unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[tokio::test]
    async fn test_read_books_missing_file() {
        assert!(read_books(Path::new("/nonexistent/books.jsonl"))
            .await
            .is_err());
    }
}
