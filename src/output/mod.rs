//! Output module for harvested records
//!
//! This module handles:
//! - The append-only CSV sink the harvest loop streams records into
//! - The end-of-run statistics report and output file validation

mod csv_sink;
mod report;

pub use csv_sink::{backup_existing, CsvSink, SinkError};
pub use report::{print_final_report, summarize_output, OutputSummary};
