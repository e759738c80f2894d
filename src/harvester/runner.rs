//! The harvest loop
//!
//! This module drives the page harvester across increasing offsets until
//! one of the terminal conditions is reached. Two variants share the same
//! merge logic: the sequential loop processes one offset at a time, the
//! concurrent loop fans a batch of offsets out to a worker pool and merges
//! the results back in offset order under a single iteration barrier.
//!
//! Terminal conditions, in evaluation order per page:
//! 1. Fetch failed after all retries
//! 2. Page held no records (organic end of catalog)
//! 3. Accumulated records reached the source-reported grand total
//! 4. Page cap reached
//!
//! Every termination, whatever the cause, writes a progress checkpoint so
//! the next run can resume.

use crate::config::{compute_params_hash, Config};
use crate::harvester::client::build_http_client;
use crate::harvester::extract::AuctionRecord;
use crate::harvester::limiter::RateLimiter;
use crate::harvester::page::{harvest_page, PageResult};
use crate::output::CsvSink;
use crate::state::{save_checkpoint, Checkpoint, HarvestCounters, SharedCounters};
use crate::Result;
use reqwest::Client;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Why the harvest loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The source returned a page with no records
    NoMoreData,

    /// A page fetch failed after exhausting all retries
    Failure,

    /// Accumulated records reached the source-reported grand total
    Complete,

    /// The configured page cap was reached
    PageLimit,

    /// The user requested a stop
    Interrupted,
}

impl StopReason {
    /// Human-readable description for logs and the final report
    pub fn describe(&self) -> &'static str {
        match self {
            StopReason::NoMoreData => "no more data returned by the source",
            StopReason::Failure => "a page fetch failed after all retries",
            StopReason::Complete => "all reported records harvested",
            StopReason::PageLimit => "page cap reached",
            StopReason::Interrupted => "interrupted by user",
        }
    }
}

/// Final result of a harvest run
#[derive(Debug)]
pub struct HarvestReport {
    /// Why the loop stopped
    pub stop_reason: StopReason,

    /// Cumulative counters, including any resumed totals
    pub counters: HarvestCounters,

    /// Grand total adopted from the first page, if one was reported
    pub grand_total: Option<u64>,

    /// All records accumulated by this run, in offset order
    pub records: Vec<AuctionRecord>,
}

/// Drives the fetch→extract→accumulate cycle across offsets
pub struct HarvestRunner {
    config: Config,
    client: Client,
    base: Url,
    limiter: Arc<RateLimiter>,
    counters: SharedCounters,
    params_hash: String,
    checkpoint_path: PathBuf,
    shutdown: Arc<AtomicBool>,
    started: Instant,

    /// Next offset to fetch
    next_offset: u64,

    /// Pages accepted by this run (drives the page cap)
    pages_this_run: u32,

    /// Pages accepted as of the last checkpoint write
    pages_at_checkpoint: u32,

    /// First-seen grand total from the source
    grand_total: Option<u64>,

    /// Records carried over from a resumed checkpoint
    resumed_records: u64,

    /// Records accumulated by this run
    records: Vec<AuctionRecord>,
}

impl HarvestRunner {
    /// Creates a runner, optionally resuming from a checkpoint
    ///
    /// A resumed runner starts at the checkpoint's next offset with its
    /// counters pre-loaded, so progress reporting and the grand-total
    /// comparison continue from where the previous run stopped.
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `resume` - Checkpoint to resume from, or None for a fresh start
    pub fn new(config: Config, resume: Option<&Checkpoint>) -> Result<Self> {
        let client = build_http_client(&config.request)?;
        let base = Url::parse(&config.request.base_url)?;
        let limiter = Arc::new(RateLimiter::new(
            config.harvester.delay_min_secs,
            config.harvester.delay_max_secs,
        ));
        let params_hash = compute_params_hash(&config.search);
        let checkpoint_path = PathBuf::from(&config.output.checkpoint_path);

        let (counters, next_offset, resumed_records) = match resume {
            Some(checkpoint) => (
                SharedCounters::from_counters(checkpoint.counters()),
                checkpoint.next_offset,
                checkpoint.records_scraped,
            ),
            None => (SharedCounters::new(), 0, 0),
        };

        Ok(Self {
            config,
            client,
            base,
            limiter,
            counters,
            params_hash,
            checkpoint_path,
            shutdown: Arc::new(AtomicBool::new(false)),
            started: Instant::now(),
            next_offset,
            pages_this_run: 0,
            pages_at_checkpoint: 0,
            grand_total: None,
            resumed_records,
            records: Vec::new(),
        })
    }

    /// Returns the flag a signal handler sets to request a clean stop
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Returns a snapshot of the cumulative counters
    pub fn counters(&self) -> HarvestCounters {
        self.counters.snapshot()
    }

    /// Runs the harvest to completion and returns the final report
    ///
    /// The final checkpoint is written unconditionally, whatever the stop
    /// reason, so every termination is resumable.
    pub async fn run(&mut self, sink: &mut CsvSink) -> Result<HarvestReport> {
        let workers = self.config.harvester.workers;
        tracing::info!(
            "Starting harvest at offset {} ({} worker{})",
            self.next_offset,
            workers,
            if workers == 1 { "" } else { "s" }
        );

        let stop_reason = if workers > 1 {
            self.run_concurrent(sink).await?
        } else {
            self.run_sequential(sink).await?
        };

        self.write_checkpoint();

        let counters = self.counters.snapshot();
        tracing::info!(
            "Harvest stopped: {} ({} pages, {} records, {} errors)",
            stop_reason.describe(),
            counters.pages_scraped,
            counters.records_scraped,
            counters.errors
        );

        Ok(HarvestReport {
            stop_reason,
            counters,
            grand_total: self.grand_total,
            records: std::mem::take(&mut self.records),
        })
    }

    /// Single execution path: fetch, merge, delay, repeat
    async fn run_sequential(&mut self, sink: &mut CsvSink) -> Result<StopReason> {
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                return Ok(StopReason::Interrupted);
            }

            self.limiter.acquire().await;

            let result = harvest_page(
                &self.client,
                &self.config.request,
                &self.base,
                &self.config.search,
                self.next_offset,
                &self.counters,
            )
            .await;

            if let Some(stop) = self.merge_page(self.next_offset, result, sink)? {
                return Ok(stop);
            }

            self.maybe_checkpoint();
        }
    }

    /// Worker-pool path: dispatch a batch of offsets, gather, merge in order
    ///
    /// The batch is bounded by both the worker count and the remaining
    /// page budget, so the page cap stays a hard bound on total fetches.
    /// Transition rules are evaluated once per synchronized batch, never
    /// per individual completion.
    async fn run_concurrent(&mut self, sink: &mut CsvSink) -> Result<StopReason> {
        let workers = self.config.harvester.workers;
        let page_size = self.config.harvester.page_size as u64;

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                return Ok(StopReason::Interrupted);
            }

            let remaining = self
                .config
                .harvester
                .max_pages
                .saturating_sub(self.pages_this_run);
            if remaining == 0 {
                return Ok(StopReason::PageLimit);
            }

            let batch_len = remaining.min(workers) as u64;
            let offsets: Vec<u64> = (0..batch_len)
                .map(|i| self.next_offset + i * page_size)
                .collect();

            let mut handles = Vec::with_capacity(offsets.len());
            for offset in offsets {
                let client = self.client.clone();
                let request = self.config.request.clone();
                let base = self.base.clone();
                let search = self.config.search.clone();
                let counters = self.counters.clone();
                let limiter = Arc::clone(&self.limiter);

                handles.push(tokio::spawn(async move {
                    limiter.acquire().await;
                    let result =
                        harvest_page(&client, &request, &base, &search, offset, &counters).await;
                    (offset, result)
                }));
            }

            let mut results = Vec::with_capacity(handles.len());
            for handle in handles {
                results.push(handle.await?);
            }
            results.sort_by_key(|(offset, _)| *offset);

            // Iteration barrier: merge in ascending offset order; results
            // past a terminal condition are discarded so the output never
            // contains a gap, and their counter contribution is unwound.
            let mut stop = None;
            let mut discarded = 0u64;
            for (offset, result) in results {
                if stop.is_some() {
                    if let PageResult::Fetched { records, .. } = result {
                        self.counters.forget_page(records.len() as u64);
                        discarded += records.len() as u64;
                    }
                    continue;
                }
                stop = self.merge_page(offset, result, sink)?;
            }

            if discarded > 0 {
                tracing::debug!("Discarded {} records fetched past the stop point", discarded);
            }

            if let Some(stop) = stop {
                return Ok(stop);
            }

            self.maybe_checkpoint();
        }
    }

    /// Applies the transition rules to one page's result
    ///
    /// Returns the terminal state if one was reached, None to continue.
    /// Evaluation order: fetch failure, empty page, accumulate and adopt
    /// the grand total, completion check, page cap.
    fn merge_page(
        &mut self,
        offset: u64,
        result: PageResult,
        sink: &mut CsvSink,
    ) -> Result<Option<StopReason>> {
        let (records, total_count) = match result {
            PageResult::FetchFailed => {
                tracing::error!("Fetch failed at offset {}; stopping", offset);
                return Ok(Some(StopReason::Failure));
            }
            PageResult::Fetched {
                records,
                total_count,
            } => (records, total_count),
        };

        if records.is_empty() {
            tracing::info!("No records at offset {}; end of catalog", offset);
            return Ok(Some(StopReason::NoMoreData));
        }

        sink.append_records(&records)?;
        let page_records = records.len();
        self.records.extend(records);
        self.pages_this_run += 1;
        self.next_offset = offset + self.config.harvester.page_size as u64;

        if let Some(total) = total_count {
            self.adopt_grand_total(total);
        }

        let snapshot = self.counters.snapshot();
        tracing::info!(
            "Page {} done: {} records ({} total so far)",
            self.pages_this_run,
            page_records,
            snapshot.records_scraped
        );

        if self.pages_this_run % 10 == 0 {
            self.log_progress(&snapshot);
        }

        // Compare against what the loop has actually merged, not the raw
        // shared counter: in concurrent mode workers may have counted
        // pages whose results are still waiting behind the barrier.
        let accumulated = self.resumed_records + self.records.len() as u64;
        if let Some(total) = self.grand_total {
            if accumulated >= total {
                tracing::info!("All {} reported records harvested", total);
                return Ok(Some(StopReason::Complete));
            }
        }

        if self.pages_this_run >= self.config.harvester.max_pages {
            tracing::info!(
                "Page cap of {} reached",
                self.config.harvester.max_pages
            );
            return Ok(Some(StopReason::PageLimit));
        }

        Ok(None)
    }

    /// Adopts the source-reported grand total, first-seen wins
    ///
    /// A later report that disagrees by more than one page is surfaced as
    /// a warning; the first-seen value is kept either way.
    fn adopt_grand_total(&mut self, total: u64) {
        let page_size = self.config.harvester.page_size as u64;
        match self.grand_total {
            None => {
                let estimated_pages = (total + page_size - 1) / page_size;
                tracing::info!(
                    "Source reports {} total records (~{} pages)",
                    total,
                    estimated_pages
                );
                self.grand_total = Some(total);
            }
            Some(existing) if existing != total => {
                if existing.abs_diff(total) > page_size {
                    tracing::warn!(
                        "Source-reported total changed from {} to {}; keeping first-seen value",
                        existing,
                        total
                    );
                }
            }
            Some(_) => {}
        }
    }

    /// Logs a progress line with throughput and, when known, completion
    fn log_progress(&self, snapshot: &HarvestCounters) {
        let elapsed = self.started.elapsed();
        let rate = if elapsed.as_secs_f64() > 0.0 {
            self.pages_this_run as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        match self.grand_total {
            Some(total) if total > 0 => {
                let percent = (snapshot.records_scraped as f64 / total as f64) * 100.0;
                tracing::info!(
                    "Progress: {} pages, {} / {} records ({:.1}%), {:.2} pages/sec",
                    snapshot.pages_scraped,
                    snapshot.records_scraped,
                    total,
                    percent,
                    rate
                );
            }
            _ => {
                tracing::info!(
                    "Progress: {} pages, {} records, {:.2} pages/sec",
                    snapshot.pages_scraped,
                    snapshot.records_scraped,
                    rate
                );
            }
        }
    }

    /// Writes a checkpoint if enough pages have passed since the last one
    fn maybe_checkpoint(&mut self) {
        let due = self.pages_this_run - self.pages_at_checkpoint
            >= self.config.harvester.checkpoint_every;
        if due {
            self.write_checkpoint();
            self.pages_at_checkpoint = self.pages_this_run;
        }
    }

    /// Writes a checkpoint; IO problems degrade to a warning
    fn write_checkpoint(&self) {
        let checkpoint = Checkpoint::new(
            self.next_offset,
            self.counters.snapshot(),
            self.config.search.signature(),
            self.params_hash.clone(),
        );
        if let Err(e) = save_checkpoint(&self.checkpoint_path, &checkpoint) {
            tracing::warn!(
                "Could not save checkpoint to {}: {}. Continuing without resumption guarantees.",
                self.checkpoint_path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.output.csv_path = dir
            .path()
            .join("out.csv")
            .to_string_lossy()
            .into_owned();
        config.output.checkpoint_path = dir
            .path()
            .join("state.toml")
            .to_string_lossy()
            .into_owned();
        config
    }

    fn make_records(count: usize) -> Vec<AuctionRecord> {
        (0..count)
            .map(|i| AuctionRecord {
                domain: format!("site{}.com", i),
                tld: "com".to_string(),
                time_left: "1d".to_string(),
                starting_price: "$5".to_string(),
                current_bid: "$10".to_string(),
                bids_count: "2".to_string(),
                domain_age: "3 years".to_string(),
                revenue: "$0".to_string(),
                visitors: "7".to_string(),
            })
            .collect()
    }

    fn fetched(count: usize, total: Option<u64>) -> PageResult {
        PageResult::Fetched {
            records: make_records(count),
            total_count: total,
        }
    }

    #[test]
    fn test_merge_page_failure_is_terminal() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let mut sink = CsvSink::open(std::path::Path::new(&config.output.csv_path), 100).unwrap();
        let mut runner = HarvestRunner::new(config, None).unwrap();

        let stop = runner
            .merge_page(0, PageResult::FetchFailed, &mut sink)
            .unwrap();
        assert_eq!(stop, Some(StopReason::Failure));
    }

    #[test]
    fn test_merge_page_empty_is_no_more_data() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let mut sink = CsvSink::open(std::path::Path::new(&config.output.csv_path), 100).unwrap();
        let mut runner = HarvestRunner::new(config, None).unwrap();

        let stop = runner.merge_page(0, fetched(0, None), &mut sink).unwrap();
        assert_eq!(stop, Some(StopReason::NoMoreData));
        assert!(runner.records.is_empty());
    }

    #[test]
    fn test_merge_page_accumulates_and_advances() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let mut sink = CsvSink::open(std::path::Path::new(&config.output.csv_path), 100).unwrap();
        let mut runner = HarvestRunner::new(config, None).unwrap();

        // Counters are normally updated by harvest_page; simulate that here
        runner.counters.record_page(100);
        let stop = runner
            .merge_page(0, fetched(100, Some(250)), &mut sink)
            .unwrap();
        assert_eq!(stop, None);
        assert_eq!(runner.next_offset, 100);
        assert_eq!(runner.records.len(), 100);
        assert_eq!(runner.grand_total, Some(250));
    }

    #[test]
    fn test_complete_when_total_reached() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let mut sink = CsvSink::open(std::path::Path::new(&config.output.csv_path), 100).unwrap();
        let mut runner = HarvestRunner::new(config, None).unwrap();

        runner.counters.record_page(100);
        assert_eq!(
            runner
                .merge_page(0, fetched(100, Some(250)), &mut sink)
                .unwrap(),
            None
        );
        runner.counters.record_page(100);
        assert_eq!(
            runner.merge_page(100, fetched(100, None), &mut sink).unwrap(),
            None
        );
        runner.counters.record_page(50);
        assert_eq!(
            runner.merge_page(200, fetched(50, None), &mut sink).unwrap(),
            Some(StopReason::Complete)
        );
        assert_eq!(runner.records.len(), 250);
    }

    #[test]
    fn test_page_cap_is_terminal() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.harvester.max_pages = 2;
        let mut sink = CsvSink::open(std::path::Path::new(&config.output.csv_path), 100).unwrap();
        let mut runner = HarvestRunner::new(config, None).unwrap();

        runner.counters.record_page(100);
        assert_eq!(
            runner.merge_page(0, fetched(100, None), &mut sink).unwrap(),
            None
        );
        runner.counters.record_page(100);
        assert_eq!(
            runner.merge_page(100, fetched(100, None), &mut sink).unwrap(),
            Some(StopReason::PageLimit)
        );
    }

    #[test]
    fn test_grand_total_first_seen_wins() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let mut runner = HarvestRunner::new(config, None).unwrap();

        runner.adopt_grand_total(250);
        assert_eq!(runner.grand_total, Some(250));

        // A wildly different later value is ignored, with a warning
        runner.adopt_grand_total(9000);
        assert_eq!(runner.grand_total, Some(250));

        // Small jitter is ignored silently
        runner.adopt_grand_total(260);
        assert_eq!(runner.grand_total, Some(250));
    }

    #[test]
    fn test_resume_starts_at_checkpoint_offset() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);

        let checkpoint = Checkpoint::new(
            300,
            HarvestCounters {
                pages_scraped: 3,
                records_scraped: 300,
                errors: 0,
            },
            "(none)".to_string(),
            compute_params_hash(&config.search),
        );

        let runner = HarvestRunner::new(config, Some(&checkpoint)).unwrap();
        assert_eq!(runner.next_offset, 300);
        assert_eq!(runner.counters().records_scraped, 300);
    }
}
