use crate::state::StopReason;
use chrono::{DateTime, Utc};

/// Per-call pagination state for one crawl
///
/// A cursor lives only as long as a single `crawl_new_tags` call. It starts
/// on page 1 and only ever moves forward. `proceed` is cleared only by
/// [`CrawlCursor::finish`], which also records why.
#[derive(Debug, Clone)]
pub struct CrawlCursor {
    /// Site identifier (hostname, optionally with a port)
    pub site: String,

    /// Tags created before this instant end the crawl
    pub from_date: DateTime<Utc>,

    /// Current listing page, 1-based
    pub page: u32,

    proceed: bool,
    stop: Option<StopReason>,
}

impl CrawlCursor {
    /// Creates a cursor positioned on the first listing page
    pub fn new(site: impl Into<String>, from_date: DateTime<Utc>) -> Self {
        Self {
            site: site.into(),
            from_date,
            page: 1,
            proceed: true,
            stop: None,
        }
    }

    /// Whether another page should be fetched
    pub fn proceed(&self) -> bool {
        self.proceed
    }

    /// Moves to the next page
    pub fn advance(&mut self) {
        self.page += 1;
    }

    /// Stops pagination; no further pages will be fetched
    ///
    /// The first reason recorded wins.
    pub fn finish(&mut self, reason: StopReason) {
        self.proceed = false;
        self.stop.get_or_insert(reason);
    }

    /// Why pagination stopped, once it has
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop
    }

    /// Returns true if `stamp` falls before the cutoff
    pub fn is_past_cutoff(&self, stamp: DateTime<Utc>) -> bool {
        stamp < self.from_date
    }
}
