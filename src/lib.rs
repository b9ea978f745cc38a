//! Tagwatch: newest-tag discovery for Stack Exchange style sites
//!
//! This crate walks a site's `/tags?tab=new` listing page by page, turns each
//! tag cell into a [`TagRecord`], stops once the listing crosses a time
//! boundary, and keeps what it found in a per-site [`CacheStore`] that lives
//! as long as the process holds it.

pub mod cache;
pub mod config;
pub mod crawler;
pub mod state;

use thiserror::Error;

/// Main error type for Tagwatch operations
#[derive(Debug, Error)]
pub enum TagWatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid site: {0}")]
    InvalidSite(String),
}

/// Errors raised while fetching a listing page
///
/// These never abort a crawl; the coordinator logs them and stops paginating.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("transport failure for {url}: {reason}")]
    Transport { url: String, reason: String },
}

/// Errors raised while reading a listing page's markup
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The `#tags-browser` container is absent; treated as end of results
    #[error("tag listing container not found")]
    MissingContainer,

    /// A tag cell lost its name block; the page layout has changed
    #[error("malformed tag cell {index} on page {page}: {reason}")]
    MalformedCell {
        page: u32,
        index: usize,
        reason: String,
    },
}

/// Result type alias for Tagwatch operations
pub type Result<T> = std::result::Result<T, TagWatchError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for page parsing
pub type ParseResult<T> = std::result::Result<T, ParseError>;

// Re-export commonly used types
pub use cache::{CacheStore, SiteCache, TagRecord};
pub use config::Config;
pub use crawler::{CrawlReport, TagCrawler};
pub use state::{CrawlCursor, StopReason};
