//! Append-only CSV sink
//!
//! Records are appended to the output file as they are harvested, in the
//! fixed column order of `AuctionRecord::FIELD_NAMES`. The header row is
//! written only when the file is new or empty, so successive runs against
//! the same file keep appending data rows. The writer flushes to disk
//! every `flush_every` records, so a crash loses at most that many rows.

use crate::harvester::AuctionRecord;
use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during sink operations
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Append-only CSV writer with header-on-create semantics
pub struct CsvSink {
    path: PathBuf,
    writer: csv::Writer<File>,
    flush_every: u32,
    since_flush: u32,
    records_written: u64,
}

impl CsvSink {
    /// Opens the sink at `path`, creating the file if needed
    ///
    /// If the file is new or empty, the header row is written first.
    /// An existing non-empty file is appended to as-is; the header is
    /// assumed to already be present.
    ///
    /// # Arguments
    ///
    /// * `path` - Output file path
    /// * `flush_every` - Flush to disk after this many records
    pub fn open(path: &Path, flush_every: u32) -> Result<Self, SinkError> {
        let is_new = match std::fs::metadata(path) {
            Ok(metadata) => metadata.len() == 0,
            Err(_) => true,
        };

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if is_new {
            writer.write_record(AuctionRecord::FIELD_NAMES)?;
            writer.flush()?;
        }

        tracing::info!("CSV output file opened: {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            flush_every: flush_every.max(1),
            since_flush: 0,
            records_written: 0,
        })
    }

    /// Appends one page's records to the file
    ///
    /// Values are written exactly as extracted; no coercion happens here.
    ///
    /// # Arguments
    ///
    /// * `records` - The records to append, in order
    ///
    /// # Returns
    ///
    /// The number of records written
    pub fn append_records(&mut self, records: &[AuctionRecord]) -> Result<usize, SinkError> {
        for record in records {
            self.writer.write_record(record.as_row())?;
            self.since_flush += 1;
            self.records_written += 1;

            if self.since_flush >= self.flush_every {
                self.writer.flush()?;
                self.since_flush = 0;
                tracing::debug!(
                    "Auto-flushed after {} records written to {}",
                    self.records_written,
                    self.path.display()
                );
            }
        }
        Ok(records.len())
    }

    /// Flushes any buffered rows to disk
    pub fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        self.since_flush = 0;
        Ok(())
    }

    /// Total records written through this sink instance
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// The output file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Moves an existing non-empty output file out of the way
///
/// Fresh runs call this so they start with a clean file instead of
/// appending to old data. The backup name carries a timestamp:
/// `<name>.backup-YYYYmmdd-HHMMSS`.
///
/// # Arguments
///
/// * `path` - The output file path
///
/// # Returns
///
/// The backup path if a backup was made, None if there was nothing to back up
pub fn backup_existing(path: &Path) -> Result<Option<PathBuf>, SinkError> {
    match std::fs::metadata(path) {
        Ok(metadata) if metadata.len() > 0 => {}
        _ => return Ok(None),
    }

    let timestamp = Utc::now().format("%Y%m%d-%H%M%S");
    let backup = PathBuf::from(format!("{}.backup-{}", path.display(), timestamp));
    std::fs::rename(path, &backup)?;
    tracing::info!("Existing output backed up to {}", backup.display());
    Ok(Some(backup))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_record(domain: &str) -> AuctionRecord {
        AuctionRecord {
            domain: domain.to_string(),
            tld: "com".to_string(),
            time_left: "1d".to_string(),
            starting_price: "$5".to_string(),
            current_bid: "$10".to_string(),
            bids_count: "2".to_string(),
            domain_age: "3 years".to_string(),
            revenue: "$0".to_string(),
            visitors: "7".to_string(),
        }
    }

    #[test]
    fn test_header_written_once_for_new_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut sink = CsvSink::open(&path, 100).unwrap();
        sink.append_records(&[sample_record("a.com")]).unwrap();
        sink.flush().unwrap();
        drop(sink);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "domain,tld,time_left,starting_price,current_bid,bids_count,domain_age,revenue,visitors"
        );
        assert!(lines[1].starts_with("a.com,com,"));
    }

    #[test]
    fn test_reopen_appends_without_second_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");

        {
            let mut sink = CsvSink::open(&path, 100).unwrap();
            sink.append_records(&[sample_record("a.com")]).unwrap();
            sink.flush().unwrap();
        }
        {
            let mut sink = CsvSink::open(&path, 100).unwrap();
            sink.append_records(&[sample_record("b.net")]).unwrap();
            sink.flush().unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines.iter().filter(|l| l.starts_with("domain,")).count(), 1);
    }

    #[test]
    fn test_values_written_verbatim() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut record = sample_record("comma.com");
        record.revenue = "$1,200".to_string();

        let mut sink = CsvSink::open(&path, 100).unwrap();
        sink.append_records(&[record]).unwrap();
        sink.flush().unwrap();
        drop(sink);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[7], "$1,200");
    }

    #[test]
    fn test_records_written_counter() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut sink = CsvSink::open(&path, 2).unwrap();
        sink.append_records(&[
            sample_record("a.com"),
            sample_record("b.com"),
            sample_record("c.com"),
        ])
        .unwrap();
        assert_eq!(sink.records_written(), 3);
    }

    #[test]
    fn test_backup_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");

        // Nothing to back up yet
        assert!(backup_existing(&path).unwrap().is_none());

        std::fs::write(&path, "domain\nold.com\n").unwrap();
        let backup = backup_existing(&path).unwrap().expect("backup expected");
        assert!(!path.exists());
        assert!(backup.exists());
        assert!(backup
            .file_name()
            .unwrap()
            .to_string_lossy()
            .contains("backup-"));
    }
}
