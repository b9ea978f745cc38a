//! Crawler module for newest-tag discovery
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching of listing pages
//! - Parsing tag cells and their creation times
//! - Pagination against a cutoff and merging into the tag cache

mod coordinator;
mod fetcher;
mod parser;
mod timestamp;

pub use coordinator::{CrawlReport, TagCrawler};
pub use fetcher::{build_http_client, FetchResult, PageFetcher};
pub use parser::{ParsedPage, TagParser};
pub use timestamp::parse_created;

use crate::config::WatchEntry;
use crate::{ConfigError, TagWatchError};
use chrono::{DateTime, Utc};

/// Runs one crawl for a configured watch entry
///
/// The cutoff is the entry's watch window counted back from now.
///
/// # Arguments
///
/// * `crawler` - The crawler to run
/// * `entry` - The site and window to crawl
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl finished (possibly early, see `stop`)
/// * `Err(TagWatchError)` - The window is out of range, or the listing
///   layout is no longer recognised
pub async fn crawl_watch(
    crawler: &TagCrawler,
    entry: &WatchEntry,
) -> Result<CrawlReport, TagWatchError> {
    let from_date = window_start(entry, Utc::now())?;
    crawler.crawl_new_tags(&entry.site, from_date).await
}

/// Start of an entry's watch window, counted back from `now`
pub fn window_start(entry: &WatchEntry, now: DateTime<Utc>) -> Result<DateTime<Utc>, ConfigError> {
    now.checked_sub_signed(entry.window()).ok_or_else(|| {
        ConfigError::Validation(format!(
            "Watch window of {} hours for '{}' reaches past the earliest representable time",
            entry.hours, entry.site
        ))
    })
}
