use crate::config::types::{Config, SearchConfig};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use auction_harvest::config::load_config;
///
/// let config = load_config(Path::new("config.toml")).unwrap();
/// println!("Page cap: {}", config.harvester.max_pages);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    // Read the configuration file
    let content = std::fs::read_to_string(path)?;

    // Parse TOML
    let config: Config = toml::from_str(&content)?;

    // Validate the configuration
    validate(&config)?;

    Ok(config)
}

/// Loads the configuration from `path` if given, otherwise uses defaults
///
/// The built-in defaults are themselves validated, so a default-constructed
/// run goes through the same checks as a file-based one.
///
/// # Arguments
///
/// * `path` - Optional path to a TOML configuration file
pub fn load_config_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(p) => load_config(p),
        None => {
            let config = Config::default();
            validate(&config)?;
            Ok(config)
        }
    }
}

/// Computes a SHA-256 hash of the active search parameters
///
/// The hash is stored in the progress checkpoint so a resumed run can
/// detect that it is being pointed at a different search than the one the
/// checkpoint was written for.
///
/// # Arguments
///
/// * `search` - The search parameters to hash
///
/// # Returns
///
/// Hex-encoded SHA-256 hash of the canonical parameter signature
pub fn compute_params_hash(search: &SearchConfig) -> String {
    let mut hasher = Sha256::new();
    hasher.update(search.signature().as_bytes());
    let result = hasher.finalize();
    hex::encode(result)
}
