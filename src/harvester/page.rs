//! Single-page harvesting
//!
//! This module composes the fetch client, record extractor, and
//! total-count reader for one logical page: build the page URL for an
//! offset, fetch it, extract whatever it holds, and update the shared
//! counters.

use crate::config::{RequestConfig, SearchConfig};
use crate::harvester::client::{fetch_with_retry, FetchOutcome};
use crate::harvester::extract::{extract_records, read_total_count, AuctionRecord};
use crate::state::SharedCounters;
use reqwest::Client;
use url::Url;

/// Outcome of harvesting one page
#[derive(Debug)]
pub enum PageResult {
    /// The page was fetched; `records` may legitimately be empty, which
    /// the loop treats as the end of the catalog
    Fetched {
        /// Records extracted from the page, in document order
        records: Vec<AuctionRecord>,
        /// Source-reported grand total, read on the first page only
        total_count: Option<u64>,
    },

    /// All fetch attempts failed; distinguishable from an empty page
    FetchFailed,
}

/// Builds the page URL for an offset
///
/// Appends the active search parameters (only non-empty ones) and the
/// pagination offset. The `from` parameter is omitted at offset zero, so
/// the first page URL matches what a browser would load.
///
/// # Arguments
///
/// * `base` - The listing base URL
/// * `search` - Active search and sort parameters
/// * `offset` - Zero-based item offset of the page window
pub fn build_page_url(base: &Url, search: &SearchConfig, offset: u64) -> Url {
    let mut url = base.clone();

    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in search.query_pairs() {
            pairs.append_pair(key, &value);
        }
        if offset > 0 {
            pairs.append_pair("from", &offset.to_string());
        }
    }

    // An all-default search at offset 0 should yield the bare base URL
    if url.query() == Some("") {
        url.set_query(None);
    }

    url
}

/// Harvests a single page at the given offset
///
/// On success, extracts all records, reads the grand total when this is
/// the first page, and updates the shared counters. On fetch failure the
/// error counter is incremented exactly once, regardless of how many
/// retries were consumed.
///
/// # Arguments
///
/// * `client` - The shared HTTP client
/// * `request` - Request configuration (retries, delays)
/// * `base` - The listing base URL
/// * `search` - Active search and sort parameters
/// * `offset` - Zero-based item offset to fetch
/// * `counters` - Shared cumulative counters
pub async fn harvest_page(
    client: &Client,
    request: &RequestConfig,
    base: &Url,
    search: &SearchConfig,
    offset: u64,
    counters: &SharedCounters,
) -> PageResult {
    let url = build_page_url(base, search, offset);
    tracing::debug!("Fetching page at offset {}: {}", offset, url);

    let body = match fetch_with_retry(client, url.as_str(), request).await {
        FetchOutcome::Success { body } => body,
        FetchOutcome::Failed { error, attempts } => {
            tracing::error!(
                "Giving up on offset {} after {} attempts: {}",
                offset,
                attempts,
                error
            );
            counters.record_error();
            return PageResult::FetchFailed;
        }
    };

    let records = extract_records(&body);
    let total_count = if offset == 0 {
        read_total_count(&body)
    } else {
        None
    };

    counters.record_page(records.len() as u64);

    PageResult::Fetched {
        records,
        total_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SortDirection, SortField};

    fn base() -> Url {
        Url::parse("https://example.com/auctions").unwrap()
    }

    #[test]
    fn test_offset_zero_omits_from_param() {
        let url = build_page_url(&base(), &SearchConfig::default(), 0);
        assert_eq!(url.as_str(), "https://example.com/auctions");
    }

    #[test]
    fn test_nonzero_offset_included() {
        let url = build_page_url(&base(), &SearchConfig::default(), 200);
        assert_eq!(url.as_str(), "https://example.com/auctions?from=200");
    }

    #[test]
    fn test_search_params_precede_offset() {
        let search = SearchConfig {
            query: "shop".to_string(),
            tld: "com".to_string(),
            sort_field: Some(SortField::Bids),
            sort_direction: Some(SortDirection::Descending),
            ..Default::default()
        };
        let url = build_page_url(&base(), &search, 100);
        assert_eq!(
            url.as_str(),
            "https://example.com/auctions?q=shop&tld=com&sortName=bids&sortDirection=descending&from=100"
        );
    }

    #[test]
    fn test_empty_params_are_omitted() {
        let search = SearchConfig {
            min_price: String::new(),
            max_price: "500".to_string(),
            ..Default::default()
        };
        let url = build_page_url(&base(), &search, 0);
        assert_eq!(url.as_str(), "https://example.com/auctions?max_price=500");
    }

    #[tokio::test]
    async fn test_harvest_page_counts_failure_once() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let request = RequestConfig {
            max_retries: 2,
            retry_delay_secs: 0.0,
            ..Default::default()
        };
        let client = crate::harvester::client::build_http_client(&request).unwrap();
        let base = Url::parse(&server.uri()).unwrap();
        let counters = SharedCounters::new();

        let result = harvest_page(
            &client,
            &request,
            &base,
            &SearchConfig::default(),
            0,
            &counters,
        )
        .await;

        assert!(matches!(result, PageResult::FetchFailed));
        // One error for the offset, not one per retry
        assert_eq!(counters.snapshot().errors, 1);
        assert_eq!(counters.snapshot().pages_scraped, 0);
    }

    #[tokio::test]
    async fn test_harvest_page_reads_total_on_first_page_only() {
        use wiremock::matchers::{method, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let page = "<html><body><p>Showing 1 - 1 out of 250 results</p>\
                    <table><tr>\
                    <td><a>one.com</a></td><td>com</td><td>1d</td><td>$5</td><td>$9</td>\
                    <td>2</td><td>3 years</td><td>$0</td><td>7</td>\
                    </tr></table></body></html>";

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page))
            .mount(&server)
            .await;

        let request = RequestConfig::default();
        let client = crate::harvester::client::build_http_client(&request).unwrap();
        let base = Url::parse(&server.uri()).unwrap();
        let counters = SharedCounters::new();
        let search = SearchConfig::default();

        let first = harvest_page(&client, &request, &base, &search, 0, &counters).await;
        match first {
            PageResult::Fetched {
                records,
                total_count,
            } => {
                assert_eq!(records.len(), 1);
                assert_eq!(total_count, Some(250));
            }
            PageResult::FetchFailed => panic!("expected fetch to succeed"),
        }

        // Same body, but at a non-zero offset the total is not consulted
        let server2 = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("from", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page))
            .mount(&server2)
            .await;
        let base2 = Url::parse(&server2.uri()).unwrap();

        let second = harvest_page(&client, &request, &base2, &search, 100, &counters).await;
        match second {
            PageResult::Fetched { total_count, .. } => assert_eq!(total_count, None),
            PageResult::FetchFailed => panic!("expected fetch to succeed"),
        }

        assert_eq!(counters.snapshot().pages_scraped, 2);
        assert_eq!(counters.snapshot().records_scraped, 2);
    }
}
