//! End-of-run reporting
//!
//! This module prints the final harvest statistics and re-opens the
//! output file to sanity-check what actually landed on disk.

use crate::harvester::{AuctionRecord, HarvestReport};
use crate::output::SinkError;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Summary of the output file's on-disk contents
#[derive(Debug, Clone)]
pub struct OutputSummary {
    /// File size in bytes
    pub file_size: u64,

    /// Total line count, header included
    pub total_lines: usize,

    /// Data rows (lines minus the header)
    pub data_rows: usize,

    /// Whether the first line is the expected header row
    pub header_ok: bool,
}

/// Reads back the output file and summarizes it
///
/// # Arguments
///
/// * `path` - The CSV output file path
///
/// # Returns
///
/// * `Ok(OutputSummary)` - File exists and was read
/// * `Err(SinkError)` - File missing or unreadable
pub fn summarize_output(path: &Path) -> Result<OutputSummary, SinkError> {
    let file_size = std::fs::metadata(path)?.len();

    let reader = BufReader::new(std::fs::File::open(path)?);
    let mut total_lines = 0usize;
    let mut header_ok = false;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if index == 0 {
            header_ok = line == AuctionRecord::FIELD_NAMES.join(",");
        }
        total_lines += 1;
    }

    Ok(OutputSummary {
        file_size,
        total_lines,
        data_rows: total_lines.saturating_sub(1),
        header_ok,
    })
}

/// Prints the final statistics for a completed run
///
/// # Arguments
///
/// * `report` - The harvest loop's final report
/// * `csv_path` - The output file, re-read for the on-disk summary
pub fn print_final_report(report: &HarvestReport, csv_path: &Path) {
    println!("\n=== Harvest Statistics ===\n");
    println!("Stop reason:     {}", report.stop_reason.describe());
    println!("Pages scraped:   {}", report.counters.pages_scraped);
    println!("Records scraped: {}", report.counters.records_scraped);
    println!("Fetch errors:    {}", report.counters.errors);

    if let Some(total) = report.grand_total {
        println!("Reported total:  {}", total);
        if total > 0 {
            let rate = (report.counters.records_scraped as f64 / total as f64) * 100.0;
            println!("Completion rate: {:.2}%", rate);
        }
    }

    match summarize_output(csv_path) {
        Ok(summary) => {
            println!("\nOutput file: {}", csv_path.display());
            println!("  File size:  {} bytes", summary.file_size);
            println!("  Total lines: {}", summary.total_lines);
            println!("  Data rows:   {}", summary.data_rows);
            if !summary.header_ok {
                println!("  WARNING: header row is missing or unexpected");
            }
        }
        Err(e) => {
            println!("\nCould not validate output file {}: {}", csv_path.display(), e);
        }
    }
}
