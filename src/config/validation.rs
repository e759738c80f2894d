use crate::config::types::{Config, HarvesterConfig, OutputConfig, RequestConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_harvester_config(&config.harvester)?;
    validate_request_config(&config.request)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates harvest loop configuration
fn validate_harvester_config(config: &HarvesterConfig) -> Result<(), ConfigError> {
    if config.page_size < 1 || config.page_size > 1000 {
        return Err(ConfigError::Validation(format!(
            "page-size must be between 1 and 1000, got {}",
            config.page_size
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.workers < 1 || config.workers > 32 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 32, got {}",
            config.workers
        )));
    }

    if config.delay_min_secs < 0.0 {
        return Err(ConfigError::Validation(format!(
            "delay-min-secs must be >= 0, got {}",
            config.delay_min_secs
        )));
    }

    if config.delay_max_secs < config.delay_min_secs {
        return Err(ConfigError::Validation(format!(
            "delay-max-secs ({}) must be >= delay-min-secs ({})",
            config.delay_max_secs, config.delay_min_secs
        )));
    }

    if config.checkpoint_every < 1 {
        return Err(ConfigError::Validation(format!(
            "checkpoint-every must be >= 1, got {}",
            config.checkpoint_every
        )));
    }

    Ok(())
}

/// Validates HTTP request configuration
fn validate_request_config(config: &RequestConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must be http or https, got {}",
            url.scheme()
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.retry_delay_secs < 0.0 {
        return Err(ConfigError::Validation(format!(
            "retry-delay-secs must be >= 0, got {}",
            config.retry_delay_secs
        )));
    }

    if config.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.csv_path.is_empty() {
        return Err(ConfigError::Validation(
            "csv-path cannot be empty".to_string(),
        ));
    }

    if config.checkpoint_path.is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint-path cannot be empty".to_string(),
        ));
    }

    if config.flush_every < 1 {
        return Err(ConfigError::Validation(format!(
            "flush-every must be >= 1, got {}",
            config.flush_every
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let mut config = Config::default();
        config.harvester.page_size = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_max_pages_rejected() {
        let mut config = Config::default();
        config.harvester.max_pages = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_inverted_delay_bounds_rejected() {
        let mut config = Config::default();
        config.harvester.delay_min_secs = 3.0;
        config.harvester.delay_max_secs = 1.0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_bad_base_url_rejected() {
        let mut config = Config::default();
        config.request.base_url = "not a url".to_string();
        assert!(validate(&config).is_err());

        config.request.base_url = "ftp://example.com/auctions".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_excessive_workers_rejected() {
        let mut config = Config::default();
        config.harvester.workers = 100;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_csv_path_rejected() {
        let mut config = Config::default();
        config.output.csv_path = String::new();
        assert!(validate(&config).is_err());
    }
}
