use crate::state::counters::HarvestCounters;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while writing checkpoint state
///
/// Load-side problems are deliberately not errors: a missing or corrupt
/// checkpoint downgrades to "no prior state" with a warning.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to write checkpoint: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize checkpoint: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Durable snapshot of harvest progress
///
/// Written whenever the harvest loop wants a resumption point: every
/// `checkpoint-every` pages and unconditionally on termination, whatever
/// the cause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// The next offset a resumed run should fetch
    #[serde(rename = "next-offset")]
    pub next_offset: u64,

    /// Pages fetched so far
    #[serde(rename = "pages-scraped")]
    pub pages_scraped: u64,

    /// Records accumulated so far
    #[serde(rename = "records-scraped")]
    pub records_scraped: u64,

    /// Exhausted-retry fetch failures so far
    #[serde(default)]
    pub errors: u64,

    /// Human-readable rendering of the active search parameters
    #[serde(rename = "search-params")]
    pub search_params: String,

    /// SHA-256 hash of the search parameters the run was started with
    #[serde(rename = "params-hash")]
    pub params_hash: String,

    /// When this snapshot was written
    #[serde(rename = "saved-at")]
    pub saved_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Builds a checkpoint from the loop's current position and counters
    pub fn new(
        next_offset: u64,
        counters: HarvestCounters,
        search_params: String,
        params_hash: String,
    ) -> Self {
        Self {
            next_offset,
            pages_scraped: counters.pages_scraped,
            records_scraped: counters.records_scraped,
            errors: counters.errors,
            search_params,
            params_hash,
            saved_at: Utc::now(),
        }
    }

    /// Returns the counter values stored in this checkpoint
    pub fn counters(&self) -> HarvestCounters {
        HarvestCounters {
            pages_scraped: self.pages_scraped,
            records_scraped: self.records_scraped,
            errors: self.errors,
        }
    }

    /// Checks whether this checkpoint was written for the given parameters
    pub fn matches_params(&self, params_hash: &str) -> bool {
        self.params_hash == params_hash
    }
}

/// Writes a checkpoint to the given path
///
/// # Arguments
///
/// * `path` - Destination file path
/// * `checkpoint` - The snapshot to persist
///
/// # Returns
///
/// * `Ok(())` - Checkpoint written
/// * `Err(StateError)` - Serialization or IO failure
pub fn save_checkpoint(path: &Path, checkpoint: &Checkpoint) -> Result<(), StateError> {
    let content = toml::to_string_pretty(checkpoint)?;
    std::fs::write(path, content)?;
    tracing::debug!(
        "Checkpoint saved: offset {}, {} pages, {} records",
        checkpoint.next_offset,
        checkpoint.pages_scraped,
        checkpoint.records_scraped
    );
    Ok(())
}

/// Loads a checkpoint from the given path, if one exists
///
/// A missing file is normal (first run) and returns None quietly. An
/// unreadable or unparseable file also returns None, with a warning: the
/// harvest proceeds from scratch rather than aborting.
///
/// # Arguments
///
/// * `path` - Checkpoint file path
pub fn load_checkpoint(path: &Path) -> Option<Checkpoint> {
    if !path.exists() {
        tracing::debug!("No checkpoint file at {}", path.display());
        return None;
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(
                "Could not read checkpoint file {}: {}. Starting from scratch.",
                path.display(),
                e
            );
            return None;
        }
    };

    match toml::from_str(&content) {
        Ok(checkpoint) => Some(checkpoint),
        Err(e) => {
            tracing::warn!(
                "Checkpoint file {} is malformed: {}. Starting from scratch.",
                path.display(),
                e
            );
            None
        }
    }
}

/// Removes the checkpoint file, if present
///
/// Used by fresh runs. Failure to remove is downgraded to a warning;
/// the stale file will simply be overwritten by the next save.
pub fn clear_checkpoint(path: &Path) {
    if !path.exists() {
        return;
    }
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!("Could not remove checkpoint file {}: {}", path.display(), e);
    }
}
