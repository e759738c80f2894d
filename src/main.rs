//! Auction-Harvest main entry point
//!
//! This is the command-line interface for the auction-listing harvester.

use auction_harvest::config::{load_config_or_default, validate, Config};
use auction_harvest::harvester::harvest;
use auction_harvest::output::print_final_report;
use auction_harvest::state::load_checkpoint;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Auction-Harvest: a resumable auction-listing harvester
///
/// Walks the paginated auction listing page by page, extracts one record
/// per listing row, appends them to a CSV file, and checkpoints its
/// progress so an interrupted run can pick up where it left off.
#[derive(Parser, Debug)]
#[command(name = "auction-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resumable auction-listing harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resume an interrupted harvest (default behavior)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Start a fresh harvest, ignoring previous state and output
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Validate config and show what would be harvested without fetching
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show persisted progress from the checkpoint file and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Override the page cap for this run
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Override the worker count for this run
    #[arg(long, value_name = "N")]
    workers: Option<u32>,

    /// Override the CSV output path for this run
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load configuration, falling back to built-in defaults
    let mut config = match load_config_or_default(cli.config.as_deref()) {
        Ok(cfg) => {
            match &cli.config {
                Some(path) => tracing::info!("Configuration loaded from {}", path.display()),
                None => tracing::info!("No config file given; using built-in defaults"),
            }
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // CLI flags take precedence over the config file
    apply_overrides(&mut config, &cli);
    validate(&config)?;

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config);
    } else {
        handle_harvest(config, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("auction_harvest=info,warn"),
            1 => EnvFilter::new("auction_harvest=debug,info"),
            2 => EnvFilter::new("auction_harvest=trace,debug"),
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

/// Applies CLI override flags onto the loaded configuration
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(max_pages) = cli.max_pages {
        config.harvester.max_pages = max_pages;
    }
    if let Some(workers) = cli.workers {
        config.harvester.workers = workers;
    }
    if let Some(output) = &cli.output {
        config.output.csv_path = output.to_string_lossy().into_owned();
    }
}

/// Handles the --dry-run mode: validates config and shows the plan
fn handle_dry_run(config: &Config) {
    println!("=== Auction-Harvest Dry Run ===\n");

    println!("Request:");
    println!("  Base URL: {}", config.request.base_url);
    println!("  Timeout: {}s", config.request.timeout_secs);
    println!(
        "  Retries: {} ({}s between attempts)",
        config.request.max_retries, config.request.retry_delay_secs
    );

    println!("\nHarvester:");
    println!("  Page size: {}", config.harvester.page_size);
    println!("  Page cap: {}", config.harvester.max_pages);
    println!("  Workers: {}", config.harvester.workers);
    println!(
        "  Delay: {:.1}-{:.1}s between requests",
        config.harvester.delay_min_secs, config.harvester.delay_max_secs
    );

    println!("\nSearch parameters: {}", config.search.signature());

    println!("\nOutput:");
    println!("  CSV: {}", config.output.csv_path);
    println!("  Checkpoint: {}", config.output.checkpoint_path);
    println!("  Flush every: {} records", config.output.flush_every);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows persisted progress from the checkpoint
fn handle_stats(config: &Config) {
    println!("Checkpoint: {}\n", config.output.checkpoint_path);

    match load_checkpoint(Path::new(&config.output.checkpoint_path)) {
        Some(checkpoint) => {
            println!("Saved at:        {}", checkpoint.saved_at);
            println!("Next offset:     {}", checkpoint.next_offset);
            println!("Pages scraped:   {}", checkpoint.pages_scraped);
            println!("Records scraped: {}", checkpoint.records_scraped);
            println!("Fetch errors:    {}", checkpoint.errors);
            println!("Search params:   {}", checkpoint.search_params);
        }
        None => {
            println!("No checkpoint found; nothing has been harvested yet.");
        }
    }
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, fresh: bool) -> Result<(), Box<dyn std::error::Error>> {
    if fresh {
        tracing::info!("Starting fresh harvest (ignoring previous state)");
    } else {
        tracing::info!("Starting harvest (will resume if a checkpoint exists)");
    }

    tracing::info!("Search parameters: {}", config.search.signature());

    let csv_path = PathBuf::from(&config.output.csv_path);

    match harvest(config, fresh).await {
        Ok(report) => {
            print_final_report(&report, &csv_path);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
