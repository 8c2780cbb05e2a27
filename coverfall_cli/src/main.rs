use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;

use coverfall_cli::batch::{self, BatchOptions};
use coverfall_cli::config::{AppConfig, ConfigManager, get_config};
use coverfall_cli::output::{self, OutputFormat, ResolveReport};
use coverfall_cli::result_cache::{CacheFactory, ResolutionCache, StoredResolution};
use coverfall_cli::terminal;
use coverfall_core::cache::ImageStatusCache;
use coverfall_core::probe::{HttpProber, ImageProber};
use coverfall_core::resolver::ResolveOptions;
use coverfall_core::types::{BookRef, LoadStatus};
use coverfall_core::{Resolution, ResolveState, build_resolver};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "coverfall")]
#[command(author, version, about = "Coverfall - book cover image resolution", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the cover image for one book
    Resolve {
        /// Book title
        #[arg(short, long)]
        title: Option<String>,

        /// Author name
        #[arg(short, long)]
        author: Option<String>,

        /// ISBN (hyphens and spaces are fine)
        #[arg(short, long)]
        isbn: Option<String>,

        /// Primary image URL from an existing record
        #[arg(long)]
        image_url: Option<String>,

        /// Product page URL at the source retailer
        #[arg(long)]
        source_url: Option<String>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Bypass both caches and probe everything fresh
        #[arg(long)]
        no_cache: bool,

        /// Skip the external scrape pass
        #[arg(long)]
        no_scrape: bool,

        /// Minimum confidence for scraped candidates
        #[arg(long)]
        min_confidence: Option<f32>,
    },

    /// Resolve covers for a JSONL file of book records
    Batch {
        /// Input file, one JSON book record per line
        path: PathBuf,

        /// Number of concurrent resolutions
        #[arg(short, long, default_value = "4")]
        concurrency: usize,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Bypass both caches and probe everything fresh
        #[arg(long)]
        no_cache: bool,

        /// Skip the external scrape pass
        #[arg(long)]
        no_scrape: bool,

        /// Disable progress bar display
        #[arg(long)]
        no_progress: bool,
    },

    /// Probe a single image URL for existence
    Probe {
        /// URL to probe
        url: String,
    },

    /// Probe a batch of image URLs concurrently, reporting any that fail
    Preload {
        /// URLs to preload
        urls: Vec<String>,

        /// Read URLs from a file instead, one per line
        #[arg(short = 'F', long, conflicts_with = "urls")]
        file: Option<PathBuf>,
    },

    /// Manage the persistent resolution cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Show cache statistics
    Stats,

    /// Remove all cached resolutions
    Clear,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Get a configuration value
    Get {
        /// Configuration key (e.g., resolver.probe_timeout_secs)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., resolver.probe_timeout_secs)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration values
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on debug flag
    if cli.debug {
        env_logger::Builder::from_env(env_logger::Env::default())
            .filter_level(log::LevelFilter::Debug)
            .filter_module("coverfall_core", log::LevelFilter::Debug)
            .filter_module("coverfall_cli", log::LevelFilter::Debug)
            .format_timestamp_millis()
            .init();
        eprintln!("Debug logging enabled");
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match cli.command {
        Commands::Resolve {
            title,
            author,
            isbn,
            image_url,
            source_url,
            format,
            no_cache,
            no_scrape,
            min_confidence,
        } => {
            let config = get_config().context("Failed to load configuration")?;
            let book = BookRef {
                title,
                author,
                isbn,
                source_id: None,
                source_url,
                image_url,
            };
            resolve_command(config, book, format, no_cache, no_scrape, min_confidence).await?;
        }
        Commands::Batch {
            path,
            concurrency,
            format,
            no_cache,
            no_scrape,
            no_progress,
        } => {
            let config = get_config().context("Failed to load configuration")?;
            batch_command(config, path, concurrency, format, no_cache, no_scrape, no_progress)
                .await?;
        }
        Commands::Probe { url } => {
            let config = get_config().context("Failed to load configuration")?;
            probe_command(config, url).await?;
        }
        Commands::Preload { urls, file } => {
            let config = get_config().context("Failed to load configuration")?;
            preload_command(config, urls, file).await?;
        }
        Commands::Cache { command } => {
            let config = get_config().context("Failed to load configuration")?;
            cache_command(config, command).await?;
        }
        Commands::Config { command } => {
            config_command(command)?;
        }
        Commands::Completions { shell } => {
            generate_completions(shell);
        }
    }

    Ok(())
}

/// Token that fires on Ctrl-C, so in-flight resolutions stop cleanly
fn cancellation_token() -> CancellationToken {
    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Interrupted, finishing up...".yellow());
            signal_token.cancel();
        }
    });
    token
}

async fn resolve_command(
    config: AppConfig,
    book: BookRef,
    format: Option<OutputFormat>,
    no_cache: bool,
    no_scrape: bool,
    min_confidence: Option<f32>,
) -> Result<()> {
    if !book.is_identifiable() {
        anyhow::bail!(
            "Nothing to resolve: provide at least one of --title, --isbn, --image-url, or --source-url"
        );
    }

    let format = format.unwrap_or(OutputFormat::from_config(&config.output.default_format));

    let result_cache = if no_cache {
        CacheFactory::noop()
    } else {
        CacheFactory::create(&config.cache)?
    };

    // Persistent cache short-circuits the whole pipeline
    if let Some(key) = book.cache_key()
        && let Some(stored) = result_cache.get(&key).await?
    {
        log::debug!("Resolution cache hit for {key}");
        let resolution = Resolution {
            url: stored.url.clone(),
            source: stored.source,
            attempts: 0,
            from_cache: true,
            cancelled: false,
            state: ResolveState::Loaded {
                url: stored.url,
                source: stored.source,
            },
        };
        let report = ResolveReport::new(&book, &resolution);
        return output::print_reports(&[report], format);
    }

    let resolver = build_resolver(&config.resolver).context("Failed to build resolver")?;
    let options = ResolveOptions {
        skip_cache: no_cache,
        no_scrape,
        min_confidence: min_confidence.or(Some(config.resolver.min_confidence)),
        max_results: Some(config.resolver.max_results),
        cancel: Some(cancellation_token()),
    };

    let resolution = resolver.resolve(&book, &options).await;

    // Placeholder and cancelled outcomes are not worth persisting
    if let Some(key) = book.cache_key()
        && !resolution.is_placeholder()
        && !resolution.cancelled
    {
        result_cache
            .put(&key, &StoredResolution::from_resolution(&resolution))
            .await?;
    }

    let report = ResolveReport::new(&book, &resolution);
    output::print_reports(&[report], format)
}

async fn batch_command(
    config: AppConfig,
    path: PathBuf,
    concurrency: usize,
    format: Option<OutputFormat>,
    no_cache: bool,
    no_scrape: bool,
    no_progress: bool,
) -> Result<()> {
    let format = format.unwrap_or(OutputFormat::from_config(&config.output.default_format));
    let books = batch::read_books(&path).await?;
    if books.is_empty() {
        eprintln!("{}", "No book records found.".yellow());
        return Ok(());
    }

    let resolver = Arc::new(build_resolver(&config.resolver).context("Failed to build resolver")?);
    let result_cache = if no_cache {
        CacheFactory::noop()
    } else {
        CacheFactory::create(&config.cache)?
    };

    let show_progress = !no_progress
        && config.output.progress_enabled
        && terminal::should_show_progress_by_default();

    let options = BatchOptions {
        concurrency,
        skip_cache: no_cache,
        no_scrape,
        show_progress,
    };

    let results = batch::run_batch(resolver, books, &options, cancellation_token()).await;

    let mut reports = Vec::with_capacity(results.len());
    for (book, resolution) in &results {
        if let Some(key) = book.cache_key()
            && !resolution.is_placeholder()
            && !resolution.cancelled
        {
            result_cache
                .put(&key, &StoredResolution::from_resolution(resolution))
                .await?;
        }
        reports.push(ResolveReport::new(book, resolution));
    }

    output::print_reports(&reports, format)?;

    let placeholders = results
        .iter()
        .filter(|(_, r)| r.is_placeholder())
        .count();
    eprintln!(
        "\n{} {} resolved, {} placeholder(s)",
        "Done:".bold().green(),
        results.len() - placeholders,
        placeholders
    );

    Ok(())
}

async fn probe_command(config: AppConfig, url: String) -> Result<()> {
    let prober = HttpProber::with_timeout(
        &config.resolver.user_agent,
        config.resolver.probe_timeout(),
    )?;

    let outcome = prober.probe(&url).await;
    if outcome.is_valid() {
        println!("{} {url} ({outcome:?})", "ok".green());
        Ok(())
    } else {
        eprintln!("{} {url} ({outcome:?})", "failed".red());
        std::process::exit(1);
    }
}

async fn preload_command(
    config: AppConfig,
    mut urls: Vec<String>,
    file: Option<PathBuf>,
) -> Result<()> {
    if let Some(path) = file {
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        urls = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
    }

    if urls.is_empty() {
        anyhow::bail!("No URLs to preload");
    }

    let prober = HttpProber::with_timeout(
        &config.resolver.user_agent,
        config.resolver.preload_timeout(),
    )?;

    // The status cache lives only for this invocation; the value of the
    // pass is the fetches themselves and the per-URL report below.
    let cache = ImageStatusCache::new();
    let loaded = cache.preload_images(&prober, &urls).await;

    for url in &urls {
        if let Some(entry) = cache.get(url)
            && entry.status == LoadStatus::Error
        {
            eprintln!("{} {url}", "failed".red());
        }
    }
    eprintln!("Preloaded {loaded}/{} URLs", urls.len());

    if loaded < urls.len() {
        std::process::exit(1);
    }
    Ok(())
}

async fn cache_command(config: AppConfig, command: CacheCommand) -> Result<()> {
    let cache = CacheFactory::create(&config.cache)?;

    match command {
        CacheCommand::Stats => {
            let count = cache.len().await?;
            eprintln!("{}", "Resolution cache:".bold().blue());
            eprintln!("Backend: {}", config.cache.backend);
            eprintln!("Entries: {count}");
            if config.cache.backend == "file" {
                eprintln!(
                    "Location: {}",
                    coverfall_cli::result_cache::default_cache_dir().display()
                );
            }
        }
        CacheCommand::Clear => {
            cache.clear().await?;
            eprintln!("{}", "Resolution cache cleared".green());
        }
    }
    Ok(())
}

fn config_command(command: ConfigCommand) -> Result<()> {
    let mut manager = ConfigManager::new();

    match command {
        ConfigCommand::Init { force } => {
            manager.init(force)?;
        }
        ConfigCommand::Get { key } => match manager.get(&key) {
            Ok(value) => {
                println!("{value}");
            }
            Err(e) => {
                eprintln!("{}", format!("Error: {e}").red());
                std::process::exit(1);
            }
        },
        ConfigCommand::Set { key, value } => match manager.set(&key, &value) {
            Ok(()) => {
                eprintln!("{}", format!("Set {key} = {value}").green());
                eprintln!(
                    "Configuration saved to: {}",
                    manager.get_config_path().display()
                );
            }
            Err(e) => {
                eprintln!("{}", format!("Error: {e}").red());
                std::process::exit(1);
            }
        },
        ConfigCommand::List => match manager.list() {
            Ok(items) => {
                eprintln!("{}", "Configuration:".bold().blue());
                eprintln!("Config file: {}", manager.get_config_path().display());
                eprintln!();

                // Group items by section
                let mut sections: std::collections::HashMap<String, Vec<(String, String)>> =
                    std::collections::HashMap::new();

                for (key, value) in items {
                    let section = key.split('.').next().unwrap_or("general");
                    sections
                        .entry(section.to_string())
                        .or_default()
                        .push((key, value));
                }

                for (section, mut items) in sections {
                    eprintln!("[{}]", section.yellow());
                    items.sort_by(|a, b| a.0.cmp(&b.0));

                    for (key, value) in items {
                        let key_parts: Vec<&str> = key.split('.').collect();
                        let display_key = key_parts[1..].join(".");
                        eprintln!("  {} = {}", display_key.cyan(), value);
                    }
                    eprintln!();
                }
            }
            Err(e) => {
                eprintln!("{}", format!("Error: {e}").red());
                std::process::exit(1);
            }
        },
    }

    Ok(())
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
