//! Pagesift main entry point
//!
//! This is the command-line interface for the Pagesift page scraper.

use anyhow::Context;
use clap::{ArgGroup, Parser};
use pagesift::config::{load_config, validate, Config};
use pagesift::output::print_summary;
use pagesift::source::{resolve, DbRange, UrlSource, DEFAULT_STORE_LIMIT};
use pagesift::{Capabilities, ScrapeMode, Session, TargetUrl};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Pagesift: a paced page scraper with image text extraction
///
/// Pagesift fetches web pages, saves their HTML and visible text, downloads
/// their images and classifies the text found in each one. With tracking
/// enabled, URLs that already completed are skipped on later runs.
#[derive(Parser, Debug)]
#[command(name = "pagesift")]
#[command(version)]
#[command(about = "A paced page scraper with image text extraction", long_about = None)]
#[command(group(ArgGroup::new("source").required(true).args(["url", "url_file", "from_db"])))]
struct Cli {
    /// Scrape a single URL
    #[arg(long)]
    url: Option<String>,

    /// Scrape every URL in a file (one per line)
    #[arg(long, value_name = "PATH")]
    url_file: Option<PathBuf>,

    /// Scrape company websites from the tracking database
    #[arg(long)]
    from_db: bool,

    /// Number of URLs to read from the database
    #[arg(long, default_value_t = DEFAULT_STORE_LIMIT, requires = "from_db")]
    num_urls: u64,

    /// 1-indexed inclusive range of database rows, e.g. 1-100 (overrides --num-urls)
    #[arg(long, value_name = "START-END", requires = "from_db")]
    db_range: Option<String>,

    /// What to extract from each page
    #[arg(long, value_enum)]
    mode: Option<ScrapeMode>,

    /// Directory under which the run directory is created
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Name prefix for the run directory
    #[arg(long)]
    run_name: Option<String>,

    /// Path to TOML configuration file
    #[arg(long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Record per-URL state in the tracking database
    #[arg(long)]
    track: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resolve and print the target URLs without scraping
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;
    let source = url_source(&cli)?;

    let targets = resolve(&source, &config).context("Failed to resolve target URLs")?;

    if cli.dry_run {
        handle_dry_run(&config, &targets);
        return Ok(());
    }

    handle_scrape(config, targets, cli.quiet).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("pagesift=info,warn"),
            1 => EnvFilter::new("pagesift=debug,info"),
            2 => EnvFilter::new("pagesift=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file, if any, and applies command-line overrides
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(mode) = cli.mode {
        config.scrape.mode = mode;
    }
    if let Some(dir) = &cli.output_dir {
        config.output.root = dir.clone();
    }
    if let Some(name) = &cli.run_name {
        config.output.run_name = Some(name.clone());
    }
    if cli.track {
        config.tracking.enabled = true;
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

fn url_source(cli: &Cli) -> anyhow::Result<UrlSource> {
    if let Some(url) = &cli.url {
        return Ok(UrlSource::Single(url.clone()));
    }
    if let Some(path) = &cli.url_file {
        return Ok(UrlSource::File(path.clone()));
    }

    let range = cli
        .db_range
        .as_deref()
        .map(DbRange::parse)
        .transpose()
        .context("Invalid --db-range")?;

    Ok(UrlSource::Store {
        range,
        limit: cli.num_urls,
    })
}

/// Handles the --dry-run mode: shows what would be scraped
fn handle_dry_run(config: &Config, targets: &[TargetUrl]) {
    println!("=== Pagesift Dry Run ===\n");

    println!("Scrape:");
    println!("  Mode: {}", config.scrape.mode.as_str());
    println!("  Page timeout: {}s", config.scrape.page_timeout_secs);
    println!("  Image timeout: {}s", config.scrape.image_timeout_secs);
    match config.scrape.max_images_per_page {
        Some(max) => println!("  Max images per page: {}", max),
        None => println!("  Max images per page: unlimited"),
    }

    println!("\nRate Limit:");
    println!(
        "  {} requests/second, burst {}",
        config.rate_limit.requests_per_second, config.rate_limit.burst
    );

    println!("\nOutput:");
    println!("  Root: {}", config.output.root.display());

    println!("\nTracking:");
    if config.tracking.enabled {
        println!("  Database: {}", config.tracking.database_path.display());
    } else {
        println!("  Disabled");
    }

    println!("\nTargets ({}):", targets.len());
    for target in targets {
        match &target.external_id {
            Some(id) => println!("  - {} ({})", target.url, id),
            None => println!("  - {}", target.url),
        }
    }

    println!("\n✓ Would scrape {} URLs", targets.len());
}

/// Handles the main scrape operation
async fn handle_scrape(config: Config, targets: Vec<TargetUrl>, quiet: bool) -> anyhow::Result<()> {
    let capabilities =
        Capabilities::from_config(&config).context("Failed to set up scraping capabilities")?;
    let mut session = Session::new(config, capabilities)?;

    let stop = Arc::new(AtomicBool::new(false));
    let signal = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing the current URL");
            signal.store(true, Ordering::SeqCst);
        }
    });

    let summary = session.run(targets, stop).await?;

    if !quiet {
        print_summary(&summary);
    }

    Ok(())
}
