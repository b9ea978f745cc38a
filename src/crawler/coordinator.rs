//! Crawl coordinator - pagination and cache merge
//!
//! This module drives one crawl of a site's newest-tags listing:
//! - Fetching pages in order, starting at page 1
//! - Parsing each page and merging its tags into the site cache
//! - Waiting the polite delay between pages
//! - Deciding when to stop (cutoff, empty page, failure, cancellation)

use crate::cache::{CacheStore, SiteCache};
use crate::config::{validate_site, Config};
use crate::crawler::fetcher::{FetchResult, PageFetcher};
use crate::crawler::parser::TagParser;
use crate::state::{CrawlCursor, StopReason};
use crate::{ParseError, TagWatchError};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Outcome of one crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// The site that was crawled
    pub site: String,

    /// The cutoff the crawl ran against
    pub from_date: DateTime<Utc>,

    /// Snapshot of the site's cache after the crawl
    pub tags: SiteCache,

    /// Number of listing pages that returned a body
    pub pages_fetched: u32,

    /// Names added to the cache by this crawl
    pub new_tags: usize,

    /// Why pagination stopped
    pub stop: StopReason,
}

/// Crawler for newest-tags listings
///
/// Holds the fetcher, the cache store it merges into, and the polite delay
/// between pages. Cloning the store before handing it over lets the caller
/// read snapshots while the crawler owns its own handle.
pub struct TagCrawler {
    fetcher: PageFetcher,
    store: CacheStore,
    page_delay: Duration,
    cancel: CancellationToken,
}

impl TagCrawler {
    /// Creates a new crawler
    pub fn new(fetcher: PageFetcher, store: CacheStore, page_delay: Duration) -> Self {
        Self {
            fetcher,
            store,
            page_delay,
            cancel: CancellationToken::new(),
        }
    }

    /// Creates a crawler from configuration
    ///
    /// # Returns
    ///
    /// * `Ok(TagCrawler)` - Ready to crawl
    /// * `Err(TagWatchError)` - The HTTP client could not be built
    pub fn from_config(config: &Config, store: CacheStore) -> Result<Self, TagWatchError> {
        let fetcher = PageFetcher::from_config(&config.user_agent, &config.crawler)?;
        Ok(Self::new(fetcher, store, config.crawler.page_delay()))
    }

    /// Uses `token` to abort crawls; checked before every fetch and delay
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The store this crawler merges into
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Crawls a site's newest tags back to `from_date`
    ///
    /// Pages are walked newest first. Each page's tags are merged into the
    /// site's cache before the next page is requested, so whatever was merged
    /// survives an early stop. The site's cache stays locked for the whole
    /// crawl; a second crawl of the same site waits for this one.
    ///
    /// # Arguments
    ///
    /// * `site` - Site hostname, optionally with a port
    /// * `from_date` - Tags created before this instant end the crawl
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The crawl ended normally or degraded (fetch
    ///   failure, missing container, cancellation); see `stop`
    /// * `Err(TagWatchError::Parse(ParseError::MalformedCell))` - The listing
    ///   layout changed. Pages merged before the bad one remain in the store.
    /// * `Err(TagWatchError::Config)` - `site` is not a valid hostname
    pub async fn crawl_new_tags(
        &self,
        site: &str,
        from_date: DateTime<Utc>,
    ) -> Result<CrawlReport, TagWatchError> {
        validate_site(site)?;

        let mut cache = self.store.lock_site(site).await;
        let mut cursor = CrawlCursor::new(site, from_date);
        let mut pages_fetched = 0;
        let mut new_tags = 0;
        let mut previous_oldest: Option<DateTime<Utc>> = None;

        tracing::info!("Crawling new tags on {} since {}", site, from_date);

        while cursor.proceed() {
            if self.cancel.is_cancelled() {
                cursor.finish(StopReason::Cancelled);
                continue;
            }

            let body = match self.fetcher.fetch(&cursor.site, cursor.page).await {
                FetchResult::Success { body, .. } => body,
                FetchResult::Empty { url } => {
                    tracing::info!("Listing page {} is empty: {}", cursor.page, url);
                    cursor.finish(StopReason::EmptyPage);
                    continue;
                }
                FetchResult::Failed(e) => {
                    tracing::warn!("Stopping crawl of {}: {}", cursor.site, e);
                    cursor.finish(StopReason::FetchFailed);
                    continue;
                }
            };
            pages_fetched += 1;

            let page = match TagParser::new(Utc::now()).parse(&body, &cursor) {
                Ok(page) => page,
                Err(ParseError::MissingContainer) => {
                    tracing::warn!(
                        "Page {} of {} has no tag listing; treating as end of results",
                        cursor.page,
                        cursor.site
                    );
                    cursor.finish(StopReason::MissingContainer);
                    continue;
                }
                Err(e) => {
                    tracing::error!("Aborting crawl of {}: {}", cursor.site, e);
                    return Err(e.into());
                }
            };

            if page.tags.is_empty() && page.more_may_exist {
                tracing::info!("No tags on page {} of {}", cursor.page, cursor.site);
                cursor.finish(StopReason::EmptyPage);
                continue;
            }

            if let (Some(oldest), Some(newest)) = (previous_oldest, page.newest_stamp()) {
                if newest > oldest {
                    tracing::warn!(
                        "Page {} of {} starts with a tag newer than the end of the previous page",
                        cursor.page,
                        cursor.site
                    );
                }
            }
            previous_oldest = page.oldest_stamp().or(previous_oldest);

            let more_may_exist = page.more_may_exist;
            let found = page.tags.len();
            let added = cache.merge(page.tags);
            new_tags += added;

            tracing::debug!(
                "Page {} of {}: {} tags ({} new)",
                cursor.page,
                cursor.site,
                found,
                added
            );

            if !more_may_exist {
                cursor.finish(StopReason::CutoffReached);
                continue;
            }

            tracing::debug!("Next tag page for {}: {}", cursor.site, cursor.page + 1);
            let cancelled = tokio::select! {
                _ = self.cancel.cancelled() => true,
                _ = tokio::time::sleep(self.page_delay) => false,
            };
            if cancelled {
                cursor.finish(StopReason::Cancelled);
                continue;
            }

            cursor.advance();
        }

        // The loop only exits through `finish`, which records a reason
        let stop = cursor.stop_reason().unwrap_or(StopReason::Cancelled);

        tracing::info!(
            "Crawl of {} finished ({}): {} pages, {} new tags, {} cached",
            site,
            stop,
            pages_fetched,
            new_tags,
            cache.len()
        );

        Ok(CrawlReport {
            site: site.to_string(),
            from_date,
            tags: (*cache).clone(),
            pages_fetched,
            new_tags,
            stop,
        })
    }
}
