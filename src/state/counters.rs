use std::sync::{Arc, Mutex};

/// Cumulative harvest counters
///
/// A plain value snapshot; the live, shared version is `SharedCounters`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestCounters {
    /// Pages fetched and parsed successfully
    pub pages_scraped: u64,

    /// Records accumulated across all pages
    pub records_scraped: u64,

    /// Fetches that failed after exhausting all retries
    pub errors: u64,
}

/// Thread-safe counter cell shared between the harvest loop and its workers
///
/// All mutation happens under one mutex with narrow critical sections; the
/// lock is never held across a fetch or any other await point.
#[derive(Debug, Clone, Default)]
pub struct SharedCounters {
    inner: Arc<Mutex<HarvestCounters>>,
}

impl SharedCounters {
    /// Creates a zeroed counter cell
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a counter cell pre-loaded from a resumed checkpoint
    pub fn from_counters(counters: HarvestCounters) -> Self {
        Self {
            inner: Arc::new(Mutex::new(counters)),
        }
    }

    /// Records one successfully harvested page and its record count
    pub fn record_page(&self, records: u64) {
        let mut counters = self.inner.lock().unwrap();
        counters.pages_scraped += 1;
        counters.records_scraped += records;
    }

    /// Records one exhausted-retry fetch failure
    pub fn record_error(&self) {
        self.inner.lock().unwrap().errors += 1;
    }

    /// Reverses one `record_page` call
    ///
    /// The concurrent merge discards fetched pages that land past a
    /// terminal condition within their batch; their counter contribution
    /// is unwound so the checkpoint matches what was actually kept.
    pub fn forget_page(&self, records: u64) {
        let mut counters = self.inner.lock().unwrap();
        counters.pages_scraped = counters.pages_scraped.saturating_sub(1);
        counters.records_scraped = counters.records_scraped.saturating_sub(records);
    }

    /// Returns a copy of the current counter values
    pub fn snapshot(&self) -> HarvestCounters {
        *self.inner.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_page_accumulates() {
        let counters = SharedCounters::new();
        counters.record_page(100);
        counters.record_page(50);

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.pages_scraped, 2);
        assert_eq!(snapshot.records_scraped, 150);
        assert_eq!(snapshot.errors, 0);
    }

    #[test]
    fn test_record_error() {
        let counters = SharedCounters::new();
        counters.record_error();
        assert_eq!(counters.snapshot().errors, 1);
    }

    #[test]
    fn test_from_counters_resumes_totals() {
        let counters = SharedCounters::from_counters(HarvestCounters {
            pages_scraped: 5,
            records_scraped: 500,
            errors: 1,
        });
        counters.record_page(100);

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.pages_scraped, 6);
        assert_eq!(snapshot.records_scraped, 600);
        assert_eq!(snapshot.errors, 1);
    }

    #[test]
    fn test_forget_page_unwinds_record() {
        let counters = SharedCounters::new();
        counters.record_page(100);
        counters.record_page(40);
        counters.forget_page(40);

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.pages_scraped, 1);
        assert_eq!(snapshot.records_scraped, 100);
    }

    #[test]
    fn test_clones_share_state() {
        let counters = SharedCounters::new();
        let clone = counters.clone();
        clone.record_page(10);
        assert_eq!(counters.snapshot().records_scraped, 10);
    }
}
