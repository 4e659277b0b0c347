//! Hotel-Harvest main entry point
//!
//! This is the command-line interface for the Hotel-Harvest listing extractor.

use anyhow::Context;
use clap::Parser;
use hotel_harvest::config::{load_config, validate, Config};
use hotel_harvest::output::{print_run_summary, write_records, OutputFormat};
use hotel_harvest::Pipeline;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Hotel-Harvest: a polite hotel listing extractor
///
/// Fetches a hotel search-results page, follows its result pages one at a
/// time, and writes one row per listing to a CSV (or JSON) file.
#[derive(Parser, Debug)]
#[command(name = "hotel-harvest")]
#[command(version)]
#[command(about = "A polite hotel listing extractor", long_about = None)]
struct Cli {
    /// Search-results URL to start from
    #[arg(value_name = "URL")]
    url: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output file (replaced on every run)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Seconds to wait after each fetched page
    #[arg(long, value_name = "SECONDS")]
    delay: Option<f64>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Retries per page for transient failures
    #[arg(long)]
    max_retries: Option<u32>,

    /// Stop after this many pages
    #[arg(long)]
    max_pages: Option<u32>,

    /// Output format: csv or json
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate and print the merged configuration without fetching anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run_cli(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("hotel_harvest=info,warn"),
            1 => EnvFilter::new("hotel_harvest=debug,info"),
            2 => EnvFilter::new("hotel_harvest=trace,debug"),
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

async fn run_cli(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = build_config(&cli)?;

    if cli.dry_run {
        handle_dry_run(&config, &cli.url)?;
        return Ok(ExitCode::SUCCESS);
    }

    handle_run(config, &cli.url).await
}

/// Loads the config file (if any), applies CLI overrides and validates
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(output) = &cli.output {
        config.output.path = output.display().to_string();
    }
    if let Some(delay) = cli.delay {
        config.scraper.delay_seconds = delay;
    }
    if let Some(timeout) = cli.timeout {
        config.scraper.timeout_seconds = timeout;
    }
    if let Some(max_retries) = cli.max_retries {
        config.scraper.max_retries = max_retries;
    }
    if let Some(max_pages) = cli.max_pages {
        config.scraper.max_pages = Some(max_pages);
    }
    if let Some(format) = cli.format {
        config.output.format = format;
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Handles the --dry-run mode: prints the merged configuration
fn handle_dry_run(config: &Config, start_url: &str) -> anyhow::Result<()> {
    url::Url::parse(start_url).with_context(|| format!("Invalid start URL '{}'", start_url))?;

    println!("=== Hotel-Harvest Dry Run ===\n");
    println!("Start URL: {}\n", start_url);
    println!("{}", toml::to_string_pretty(config)?);
    println!("✓ Configuration is valid");
    println!("✓ Would write {} to: {}", config.output.format, config.output.path);

    Ok(())
}

/// Handles the main run: page loop, then output, then summary
async fn handle_run(config: Config, start_url: &str) -> anyhow::Result<ExitCode> {
    let shutdown = setup_shutdown_handler();
    let pipeline = Pipeline::new(&config)?.with_shutdown(shutdown);

    let result = pipeline.run(start_url).await?;

    let path = Path::new(&config.output.path);
    let written = match write_records(&result.records, path, config.output.format) {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(path = %path.display(), "Failed to write records: {}", e);
            false
        }
    };

    print_run_summary(&result, written.then_some(path));

    if !result.any_page_fetched() {
        tracing::error!("No page was fetched successfully");
        return Ok(ExitCode::FAILURE);
    }

    Ok(if written {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// First Ctrl+C stops the run after the current page; the partial result is
/// still written
fn setup_shutdown_handler() -> watch::Receiver<bool> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl+C, stopping after the current page...");
            let _ = shutdown_tx.send(true);

            // Second Ctrl+C skips the remaining page.
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nForce quit requested, exiting immediately...");
                std::process::exit(130);
            }
        }
    });

    shutdown_rx
}
