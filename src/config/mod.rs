//! Configuration module for Auction-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. Every field carries a built-in default, so running without a
//! config file is valid. Precedence is: explicit CLI flag > config file >
//! built-in default (the CLI overrides are applied in `main`).
//!
//! # Example
//!
//! ```no_run
//! use auction_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Harvest will fetch pages of {}", config.harvester.page_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, HarvesterConfig, OutputConfig, RequestConfig, SearchConfig, SortDirection, SortField,
};

// Re-export parser functions
pub use parser::{compute_params_hash, load_config, load_config_or_default};

// Re-export validation entry point
pub use validation::validate;
