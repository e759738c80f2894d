//! Record extraction from listing pages
//!
//! This module turns one page of rendered listing HTML into structured
//! auction records. Extraction is deliberately forgiving: a page with no
//! table yields an empty vector, a malformed row is skipped, and the
//! total-count reader returns None rather than failing.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Minimum number of `<td>` cells a row needs to be treated as data
const MIN_ROW_CELLS: usize = 9;

/// One auction listing, all fields as raw trimmed text
///
/// Numeric-looking fields (prices, counts) are intentionally kept as
/// strings; downstream consumers handle the parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionRecord {
    pub domain: String,
    pub tld: String,
    pub time_left: String,
    pub starting_price: String,
    pub current_bid: String,
    pub bids_count: String,
    pub domain_age: String,
    pub revenue: String,
    pub visitors: String,
}

impl AuctionRecord {
    /// CSV column names, in the fixed output order
    pub const FIELD_NAMES: [&'static str; 9] = [
        "domain",
        "tld",
        "time_left",
        "starting_price",
        "current_bid",
        "bids_count",
        "domain_age",
        "revenue",
        "visitors",
    ];

    /// Returns the field values in the same fixed order as `FIELD_NAMES`
    pub fn as_row(&self) -> [&str; 9] {
        [
            &self.domain,
            &self.tld,
            &self.time_left,
            &self.starting_price,
            &self.current_bid,
            &self.bids_count,
            &self.domain_age,
            &self.revenue,
            &self.visitors,
        ]
    }
}

/// Extracts all auction records from one page of listing HTML
///
/// Locates the first `<table>` on the page and walks its rows. Header rows
/// (any row containing a `<th>`) and rows with fewer than 9 cells are
/// skipped silently. A page without a table yields an empty vector, which
/// the harvest loop treats as the organic end-of-catalog signal.
///
/// # Arguments
///
/// * `html` - The raw page markup
///
/// # Returns
///
/// All records found on the page, in document order
pub fn extract_records(html: &str) -> Vec<AuctionRecord> {
    let document = Html::parse_document(html);
    let mut records = Vec::new();

    let (Ok(table_selector), Ok(row_selector), Ok(header_selector), Ok(cell_selector)) = (
        Selector::parse("table"),
        Selector::parse("tr"),
        Selector::parse("th"),
        Selector::parse("td"),
    ) else {
        return records;
    };

    let Some(table) = document.select(&table_selector).next() else {
        tracing::debug!("No table found on page");
        return records;
    };

    for row in table.select(&row_selector) {
        // Skip the header row
        if row.select(&header_selector).next().is_some() {
            continue;
        }

        let cells: Vec<ElementRef> = row.select(&cell_selector).collect();
        if cells.len() < MIN_ROW_CELLS {
            continue;
        }

        records.push(extract_record_from_cells(&cells));
    }

    records
}

/// Builds a record from one row's cells
///
/// The domain name lives inside a link in the first cell; if the link is
/// missing the cell's own text is used instead.
fn extract_record_from_cells(cells: &[ElementRef]) -> AuctionRecord {
    let domain = match Selector::parse("a") {
        Ok(link_selector) => match cells[0].select(&link_selector).next() {
            Some(link) => cell_text(&link),
            None => cell_text(&cells[0]),
        },
        Err(_) => cell_text(&cells[0]),
    };

    AuctionRecord {
        domain,
        tld: cell_text(&cells[1]),
        time_left: cell_text(&cells[2]),
        starting_price: cell_text(&cells[3]),
        current_bid: cell_text(&cells[4]),
        bids_count: cell_text(&cells[5]),
        domain_age: cell_text(&cells[6]),
        revenue: cell_text(&cells[7]),
        visitors: cell_text(&cells[8]),
    }
}

/// Collects and trims the text content of an element
fn cell_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Reads the source-reported grand total from a listing page
///
/// Scans the page text for the summary phrase
/// `Showing X - Y out of TOTAL results` and returns TOTAL. Only the first
/// page reliably carries this phrase; any page without it yields None.
///
/// # Arguments
///
/// * `html` - The raw page markup
///
/// # Returns
///
/// The grand total across all pages, or None if the phrase is absent or
/// unparseable
pub fn read_total_count(html: &str) -> Option<u64> {
    let pattern = Regex::new(r"Showing.*out of\s+(\d+)\s+results").ok()?;

    let document = Html::parse_document(html);
    for text in document.root_element().text() {
        if let Some(captures) = pattern.captures(text) {
            if let Ok(total) = captures[1].parse::<u64>() {
                return Some(total);
            }
        }
    }

    None
}
