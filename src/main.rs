//! Scrape-Pipeline main entry point
//!
//! This is the command-line interface for the crawl-and-extract pipeline.

use anyhow::Context;
use clap::Parser;
use scrape_pipeline::config::{load_config_with_hash, write_default_config, Config};
use scrape_pipeline::observe::{Observer, TracingObserver};
use scrape_pipeline::output::{generate_markdown_summary, print_statistics, MarkdownNormalizer};
use scrape_pipeline::pipeline::run_scrapers;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Scrape-Pipeline: a polite crawl-and-extract pipeline
///
/// Crawls the configured sites under per-domain rate, concurrency, retry and
/// robots.txt policy, and writes each extracted article as markdown.
#[derive(Parser, Debug)]
#[command(name = "scrape-pipeline")]
#[command(version = "1.0.0")]
#[command(about = "A polite crawl-and-extract pipeline", long_about = None)]
struct Cli {
    /// Path to the YAML or TOML configuration file
    #[arg(short, long, value_name = "CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,

    /// Write a starter configuration to the --config path and exit
    #[arg(long, conflicts_with = "dry_run")]
    init: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    if cli.init {
        if cli.config.exists() {
            anyhow::bail!("{} already exists", cli.config.display());
        }
        write_default_config(&cli.config)
            .with_context(|| format!("failed to write {}", cli.config.display()))?;
        println!("Default configuration written to {}", cli.config.display());
        return Ok(());
    }

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_scrape(config, &config_hash).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("scrape_pipeline=info,warn"),
            1 => EnvFilter::new("scrape_pipeline=debug,info"),
            2 => EnvFilter::new("scrape_pipeline=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective scraper configuration
fn handle_dry_run(config: &Config) {
    println!("=== Scrape-Pipeline Dry Run ===\n");

    for scraper in &config.scrapers {
        println!("Scraper: {}", scraper.name);
        println!("  Seeds:");
        for seed in scraper.seed_urls() {
            println!("    - {}", seed);
        }
        println!("  User agent: {}", scraper.user_agent);
        println!("  Rate limit: {} req/s", scraper.rate_limit);
        for (domain, rate) in &scraper.rate_limit_rules {
            println!("    {}: {} req/s", domain, rate);
        }
        println!("  Concurrency per domain: {}", scraper.concurrency);
        println!("  Max depth: {}", scraper.max_depth);
        println!(
            "  Retries: {} ({}ms apart)",
            scraper.retry_count, scraper.retry_delay_ms
        );
        println!("  Timeout: {}s", scraper.timeout_secs);
        println!("  Respect robots.txt: {}", scraper.respect_robots_txt);
        if !scraper.proxy_urls.is_empty() {
            println!("  Proxies: {}", scraper.proxy_urls.len());
        }
        println!();
    }

    println!("Extraction:");
    println!("  Preserve headings: {}", config.extraction.preserve_headings);
    println!("  Extract images: {}", config.extraction.extract_images);

    println!("\nOutput:");
    println!("  Articles: {}", config.output.articles_dir);
    println!("  Summary: {}", config.output.summary_path);

    println!("\n✓ Configuration is valid");
}

/// Runs every scraper until done or interrupted, then writes the summary
async fn handle_scrape(config: Config, config_hash: &str) -> anyhow::Result<()> {
    let seed_count: usize = config.scrapers.iter().map(|s| s.seed_urls().len()).sum();
    tracing::info!(
        "Starting {} scraper(s) with {} seed URL(s)",
        config.scrapers.len(),
        seed_count
    );

    let normalizer = Arc::new(
        MarkdownNormalizer::new(&config.output.articles_dir)
            .with_context(|| format!("failed to create {}", config.output.articles_dir))?,
    );
    let observer: Arc<dyn Observer> = Arc::new(TracingObserver);

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown_signal(cancel.clone()));

    let reports = run_scrapers(&config, normalizer.clone(), observer, cancel).await?;

    tracing::info!("Wrote {} article(s)", normalizer.written());

    let summary_path = Path::new(&config.output.summary_path);
    generate_markdown_summary(&reports, Some(config_hash), summary_path)
        .with_context(|| format!("failed to write {}", summary_path.display()))?;
    tracing::info!("Summary written to {}", summary_path.display());

    print_statistics(&reports);
    Ok(())
}

/// Cancels the run on Ctrl-C or SIGTERM
async fn cancel_on_shutdown_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received, cancelling run");
    cancel.cancel();
}
