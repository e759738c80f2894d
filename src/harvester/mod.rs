//! Harvester module for paginated listing scraping
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching with a bounded retry loop
//! - Record and total-count extraction from listing pages
//! - Shared request rate limiting
//! - The harvest loop itself, in sequential and worker-pool variants

mod client;
mod extract;
mod limiter;
mod page;
mod runner;

pub use client::{build_http_client, fetch_with_retry, FetchOutcome};
pub use extract::{extract_records, read_total_count, AuctionRecord};
pub use limiter::RateLimiter;
pub use page::{build_page_url, harvest_page, PageResult};
pub use runner::{HarvestReport, HarvestRunner, StopReason};

use crate::config::{compute_params_hash, Config};
use crate::output::{backup_existing, CsvSink};
use crate::state::{clear_checkpoint, load_checkpoint};
use crate::Result;
use std::path::PathBuf;
use std::sync::atomic::Ordering;

/// Runs a complete harvest operation
///
/// This is the main entry point for a harvest run. It will:
/// 1. Load the progress checkpoint (unless `fresh`), verifying it was
///    written for the same search parameters
/// 2. Open the CSV sink, backing the old file up first on a fresh run
/// 3. Drive the harvest loop to one of its terminal states
/// 4. Leave a final checkpoint behind for the next run
///
/// A Ctrl-C during the run stops the loop at the next page boundary;
/// partial results stay in the CSV and the checkpoint reflects them.
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `fresh` - Discard any previous checkpoint and output file
///
/// # Returns
///
/// * `Ok(HarvestReport)` - The loop reached a terminal state
/// * `Err(HarvestError)` - Setup failed (client, sink, or output paths)
pub async fn harvest(config: Config, fresh: bool) -> Result<HarvestReport> {
    let checkpoint_path = PathBuf::from(&config.output.checkpoint_path);
    let csv_path = PathBuf::from(&config.output.csv_path);
    let params_hash = compute_params_hash(&config.search);

    let resume = if fresh {
        clear_checkpoint(&checkpoint_path);
        backup_existing(&csv_path)?;
        None
    } else {
        match load_checkpoint(&checkpoint_path) {
            Some(checkpoint) if checkpoint.matches_params(&params_hash) => {
                tracing::info!(
                    "Resuming from checkpoint: offset {}, {} pages, {} records so far",
                    checkpoint.next_offset,
                    checkpoint.pages_scraped,
                    checkpoint.records_scraped
                );
                Some(checkpoint)
            }
            Some(checkpoint) => {
                tracing::warn!(
                    "Checkpoint at {} was written for different search parameters ({}); \
                     starting from scratch",
                    checkpoint_path.display(),
                    checkpoint.search_params
                );
                None
            }
            None => None,
        }
    };

    let mut sink = CsvSink::open(&csv_path, config.output.flush_every)?;
    let mut runner = HarvestRunner::new(config, resume.as_ref())?;

    // Stop cleanly at the next page boundary on Ctrl-C
    let shutdown = runner.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; stopping after the current page...");
            shutdown.store(true, Ordering::SeqCst);
        }
    });

    let report = runner.run(&mut sink).await?;
    sink.flush()?;

    Ok(report)
}
