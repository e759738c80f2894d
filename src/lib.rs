//! Auction-Harvest: a resumable auction-listing harvester
//!
//! This crate implements a paginated scraper for domain-auction listings.
//! It walks the listing pages offset by offset, extracts one record per
//! table row, appends them to a CSV file, and checkpoints its progress so
//! an interrupted run can resume where it left off.

pub mod config;
pub mod harvester;
pub mod output;
pub mod state;

use thiserror::Error;

/// Main error type for harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Output sink error: {0}")]
    Sink(#[from] output::SinkError),

    #[error("Checkpoint error: {0}")]
    State(#[from] state::StateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),
}

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use harvester::{harvest, AuctionRecord, HarvestReport, StopReason};
pub use state::Checkpoint;
