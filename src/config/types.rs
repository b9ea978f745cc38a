use serde::Deserialize;
use std::time::Duration;

/// Longest accepted watch window: ten years
pub const MAX_WATCH_HOURS: u32 = 24 * 365 * 10;

/// Main configuration structure for Tagwatch
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub watch: Vec<WatchEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Polite delay between successive listing pages (milliseconds)
    #[serde(rename = "page-delay-ms", default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Whole-request timeout for a single listing page (seconds)
    #[serde(
        rename = "request-timeout-secs",
        default = "default_request_timeout_secs"
    )]
    pub request_timeout_secs: u64,
}

impl CrawlerConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            page_delay_ms: default_page_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_page_delay_ms() -> u64 {
    2000
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// A site whose newest tags are watched
#[derive(Debug, Clone, Deserialize)]
pub struct WatchEntry {
    /// Site hostname (e.g., "stackoverflow.com")
    pub site: String,

    /// Watch window in hours (1 to `MAX_WATCH_HOURS`); tags older than this
    /// are not collected
    #[serde(default = "default_watch_hours")]
    pub hours: u32,
}

impl WatchEntry {
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.hours))
    }
}

fn default_watch_hours() -> u32 {
    1
}
