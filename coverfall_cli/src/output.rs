//! Result rendering for the CLI
//!
//! Text output is colorized when interactive; JSON and CSV are stable
//! machine formats for piping.

use anyhow::Result;
use colored::Colorize;
use coverfall_core::resolver::Resolution;
use coverfall_core::types::BookRef;
use serde::Serialize;

use crate::terminal;

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_config(name: &str) -> Self {
        match name {
            "json" => OutputFormat::Json,
            "csv" => OutputFormat::Csv,
            _ => OutputFormat::Text,
        }
    }
}

/// One resolution, flattened for serialization
#[derive(Debug, Serialize)]
pub struct ResolveReport {
    pub book: Option<String>,
    pub url: String,
    pub source: String,
    pub attempts: u32,
    pub from_cache: bool,
    pub placeholder: bool,
}

impl ResolveReport {
    pub fn new(book: &BookRef, resolution: &Resolution) -> Self {
        Self {
            book: book.cache_key(),
            url: resolution.url.clone(),
            source: resolution.source.to_string(),
            attempts: resolution.attempts,
            from_cache: resolution.from_cache,
            placeholder: resolution.is_placeholder(),
        }
    }
}

/// Print a batch of reports in the requested format
pub fn print_reports(reports: &[ResolveReport], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for report in reports {
                print_text(report);
            }
        }
        OutputFormat::Json => {
            let json = if reports.len() == 1 {
                serde_json::to_string_pretty(&reports[0])?
            } else {
                serde_json::to_string_pretty(reports)?
            };
            println!("{json}");
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            for report in reports {
                writer.serialize(report)?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}

fn print_text(report: &ResolveReport) {
    if terminal::is_interactive() {
        if let Some(book) = &report.book {
            eprintln!("Book: {}", book.cyan());
        }
        let url = if report.placeholder {
            report.url.yellow()
        } else {
            report.url.green()
        };
        println!("{url}");
        eprintln!(
            "Source: {}  Attempts: {}{}",
            report.source.yellow(),
            report.attempts,
            if report.from_cache { "  (cached)" } else { "" }
        );
    } else {
        // Bare URL for piping
        println!("{}", report.url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coverfall_core::types::CandidateSource;

    #[test]
    fn test_report_flattens_resolution() {
        let book = BookRef {
            isbn: Some("9780441013593".to_string()),
            ..Default::default()
        };
        let resolution = Resolution {
            url: "https://covers.openlibrary.org/b/isbn/9780441013593-L.jpg".to_string(),
            source: CandidateSource::OpenLibrary,
            attempts: 1,
            from_cache: false,
            cancelled: false,
            state: coverfall_core::state::ResolveState::Failed,
        };

        let report = ResolveReport::new(&book, &resolution);
        assert_eq!(report.book.as_deref(), Some("isbn:9780441013593"));
        assert_eq!(report.source, "openlibrary");
        assert!(!report.placeholder);
    }

    #[test]
    fn test_format_from_config_falls_back_to_text() {
        assert_eq!(OutputFormat::from_config("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::from_config("garbage"), OutputFormat::Text);
    }
}
