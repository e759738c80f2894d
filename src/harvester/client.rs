//! HTTP client for listing page fetches
//!
//! This module handles all HTTP requests for the harvester, including:
//! - Building a client with browser-style headers and a cookie jar
//! - GET requests with a bounded retry loop for transient failures
//! - Error classification into a typed outcome

use crate::config::RequestConfig;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::time::Duration;

/// Result of a page fetch after all retries
#[derive(Debug)]
pub enum FetchOutcome {
    /// Successfully fetched the page body
    Success {
        /// The page markup
        body: String,
    },

    /// All attempts failed; the harvest loop treats this as terminal
    Failed {
        /// Description of the last error
        error: String,
        /// Number of attempts made
        attempts: u32,
    },
}

impl FetchOutcome {
    /// Returns true for the success variant
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }
}

/// Builds an HTTP client with browser-style configuration
///
/// The client keeps a cookie jar across requests so the listing site sees
/// one continuous session, and sends the header set a desktop browser
/// would. Compression negotiation is left to reqwest's gzip/brotli
/// support.
///
/// # Arguments
///
/// * `config` - The request configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &RequestConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(
        "Upgrade-Insecure-Requests",
        HeaderValue::from_static("1"),
    );

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .cookie_store(true)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL with a bounded retry loop
///
/// Transient failures (timeouts, connection errors, non-success status
/// codes) are retried up to `max_retries` times with a fixed delay between
/// attempts. The total attempt count is therefore `max_retries + 1`. No
/// network error escapes this function; exhaustion is reported as a
/// `Failed` outcome the loop can act on.
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The fully-formed page URL
/// * `config` - Retry count and delay configuration
///
/// # Returns
///
/// A FetchOutcome with either the page body or the last error
pub async fn fetch_with_retry(client: &Client, url: &str, config: &RequestConfig) -> FetchOutcome {
    let mut last_error = String::new();

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            tracing::warn!(
                "Request failed (attempt {}/{}): {}. Retrying in {}s...",
                attempt,
                config.max_retries,
                last_error,
                config.retry_delay_secs
            );
            tokio::time::sleep(Duration::from_secs_f64(config.retry_delay_secs)).await;
        }

        match attempt_fetch(client, url).await {
            Ok(body) => return FetchOutcome::Success { body },
            Err(error) => last_error = error,
        }
    }

    tracing::error!(
        "Request failed after {} attempts: {}",
        config.max_retries + 1,
        last_error
    );

    FetchOutcome::Failed {
        error: last_error,
        attempts: config.max_retries + 1,
    }
}

/// Performs a single GET attempt, classifying failures into a message
async fn attempt_fetch(client: &Client, url: &str) -> Result<String, String> {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            return Err(if e.is_timeout() {
                format!("request timeout for {}", url)
            } else if e.is_connect() {
                format!("connection error for {}", url)
            } else {
                e.to_string()
            });
        }
    };

    let status = response.status();
    if !status.is_success() {
        return Err(format!("HTTP {} for {}", status.as_u16(), url));
    }

    response.text().await.map_err(|e| e.to_string())
}
