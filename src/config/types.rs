use serde::{Deserialize, Serialize};

/// Main configuration structure for Auction-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub harvester: HarvesterConfig,
    #[serde(default)]
    pub request: RequestConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Harvest loop behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarvesterConfig {
    /// Number of listings per page (the pagination step)
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,

    /// Safety ceiling on pages fetched per run
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Worker pool size; 1 runs the sequential loop
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// Lower bound of the random inter-request delay (seconds)
    #[serde(rename = "delay-min-secs", default = "default_delay_min")]
    pub delay_min_secs: f64,

    /// Upper bound of the random inter-request delay (seconds)
    #[serde(rename = "delay-max-secs", default = "default_delay_max")]
    pub delay_max_secs: f64,

    /// Write a progress checkpoint every N pages
    #[serde(rename = "checkpoint-every", default = "default_checkpoint_every")]
    pub checkpoint_every: u32,
}

/// HTTP request configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestConfig {
    /// Base URL of the auction listing
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout")]
    pub timeout_secs: u64,

    /// Retries per page before counting a fetch as failed
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed delay between retries (seconds)
    #[serde(rename = "retry-delay-secs", default = "default_retry_delay")]
    pub retry_delay_secs: f64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Search and sort parameters carried into the page URL
///
/// Empty string fields are omitted from the URL entirely. Sort options are
/// only sent when explicitly set.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    /// Domain name pattern to search for
    #[serde(default)]
    pub query: String,

    /// Restrict results to a single TLD (e.g. "com")
    #[serde(default)]
    pub tld: String,

    /// Minimum price filter, passed through verbatim
    #[serde(rename = "min-price", default)]
    pub min_price: String,

    /// Maximum price filter, passed through verbatim
    #[serde(rename = "max-price", default)]
    pub max_price: String,

    /// Minimum bid count filter, passed through verbatim
    #[serde(rename = "min-bids", default)]
    pub min_bids: String,

    /// Column to sort by
    #[serde(rename = "sort-field", default)]
    pub sort_field: Option<SortField>,

    /// Sort direction
    #[serde(rename = "sort-direction", default)]
    pub sort_direction: Option<SortDirection>,
}

/// Output file configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Path to the CSV output file
    #[serde(rename = "csv-path", default = "default_csv_path")]
    pub csv_path: String,

    /// Path to the progress checkpoint file
    #[serde(rename = "checkpoint-path", default = "default_checkpoint_path")]
    pub checkpoint_path: String,

    /// Flush the CSV writer to disk every N records
    #[serde(rename = "flush-every", default = "default_flush_every")]
    pub flush_every: u32,
}

/// Sortable listing columns, spelled the way the site expects them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum SortField {
    #[serde(rename = "domain")]
    Domain,
    #[serde(rename = "tldName")]
    TldName,
    #[serde(rename = "endTime")]
    EndTime,
    #[serde(rename = "startPrice")]
    StartPrice,
    #[serde(rename = "currentBid")]
    CurrentBid,
    #[serde(rename = "bids")]
    Bids,
    #[serde(rename = "domainAge")]
    DomainAge,
    #[serde(rename = "revenue")]
    Revenue,
    #[serde(rename = "visitors")]
    Visitors,
}

impl SortField {
    /// Returns the query-parameter value for this field
    pub fn as_param(&self) -> &'static str {
        match self {
            SortField::Domain => "domain",
            SortField::TldName => "tldName",
            SortField::EndTime => "endTime",
            SortField::StartPrice => "startPrice",
            SortField::CurrentBid => "currentBid",
            SortField::Bids => "bids",
            SortField::DomainAge => "domainAge",
            SortField::Revenue => "revenue",
            SortField::Visitors => "visitors",
        }
    }
}

/// Sort direction for the listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum SortDirection {
    #[serde(rename = "ascending")]
    Ascending,
    #[serde(rename = "descending")]
    Descending,
}

impl SortDirection {
    /// Returns the query-parameter value for this direction
    pub fn as_param(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ascending",
            SortDirection::Descending => "descending",
        }
    }
}

impl SearchConfig {
    /// Returns the query pairs to append to the page URL, in a fixed order.
    ///
    /// Only non-empty parameters are included; an all-default search
    /// produces an empty list and a bare listing URL.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if !self.query.is_empty() {
            pairs.push(("q", self.query.clone()));
        }
        if !self.tld.is_empty() {
            pairs.push(("tld", self.tld.clone()));
        }
        if !self.min_price.is_empty() {
            pairs.push(("min_price", self.min_price.clone()));
        }
        if !self.max_price.is_empty() {
            pairs.push(("max_price", self.max_price.clone()));
        }
        if !self.min_bids.is_empty() {
            pairs.push(("min_bids", self.min_bids.clone()));
        }
        if let Some(field) = self.sort_field {
            pairs.push(("sortName", field.as_param().to_string()));
        }
        if let Some(direction) = self.sort_direction {
            pairs.push(("sortDirection", direction.as_param().to_string()));
        }
        pairs
    }

    /// Canonical single-line rendering of the active parameters.
    ///
    /// Used both for display and as the input to the checkpoint hash, so
    /// two runs with the same parameters always produce the same string.
    pub fn signature(&self) -> String {
        let pairs = self.query_pairs();
        if pairs.is_empty() {
            return String::from("(none)");
        }
        pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            workers: default_workers(),
            delay_min_secs: default_delay_min(),
            delay_max_secs: default_delay_max(),
            checkpoint_every: default_checkpoint_every(),
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
            checkpoint_path: default_checkpoint_path(),
            flush_every: default_flush_every(),
        }
    }
}

fn default_page_size() -> u32 {
    100
}

fn default_max_pages() -> u32 {
    3000
}

fn default_workers() -> u32 {
    1
}

fn default_delay_min() -> f64 {
    1.0
}

fn default_delay_max() -> f64 {
    3.0
}

fn default_checkpoint_every() -> u32 {
    10
}

fn default_base_url() -> String {
    "https://porkbun.com/auctions".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> f64 {
    5.0
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
        .to_string()
}

fn default_csv_path() -> String {
    "auctions.csv".to_string()
}

fn default_checkpoint_path() -> String {
    "harvest-state.toml".to_string()
}

fn default_flush_every() -> u32 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.harvester.page_size, 100);
        assert_eq!(config.harvester.max_pages, 3000);
        assert_eq!(config.harvester.workers, 1);
        assert_eq!(config.request.max_retries, 3);
        assert_eq!(config.output.csv_path, "auctions.csv");
    }

    #[test]
    fn test_empty_search_has_no_pairs() {
        let search = SearchConfig::default();
        assert!(search.query_pairs().is_empty());
        assert_eq!(search.signature(), "(none)");
    }

    #[test]
    fn test_search_pairs_skip_empty_fields() {
        let search = SearchConfig {
            query: "shop".to_string(),
            tld: String::new(),
            min_bids: "5".to_string(),
            sort_field: Some(SortField::CurrentBid),
            sort_direction: Some(SortDirection::Descending),
            ..Default::default()
        };
        let pairs = search.query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("q", "shop".to_string()),
                ("min_bids", "5".to_string()),
                ("sortName", "currentBid".to_string()),
                ("sortDirection", "descending".to_string()),
            ]
        );
        assert_eq!(
            search.signature(),
            "q=shop&min_bids=5&sortName=currentBid&sortDirection=descending"
        );
    }

    #[test]
    fn test_sort_field_wire_names() {
        assert_eq!(SortField::TldName.as_param(), "tldName");
        assert_eq!(SortField::DomainAge.as_param(), "domainAge");
        assert_eq!(SortDirection::Ascending.as_param(), "ascending");
    }
}
