//! HTTP fetcher implementation
//!
//! This module handles the listing requests for the crawler:
//! - Building the HTTP client with the configured user agent and timeouts
//! - Building `/tags?tab=new&page=N` URLs for a site
//! - One GET per page, classified as success, empty, or transport failure
//!
//! There is no retry here. A failed page ends the crawl; retrying is up to
//! whoever schedules crawls.

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::FetchError;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// The listing page was fetched
    Success {
        /// The URL that was requested
        url: String,
        /// Page body content
        body: String,
    },

    /// The server answered 200 with a blank body
    Empty {
        /// The URL that was requested
        url: String,
    },

    /// Status or transport failure
    Failed(FetchError),
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `crawler` - Timeouts for listing requests
///
/// # Example
///
/// ```no_run
/// use tagwatch::config::{CrawlerConfig, UserAgentConfig};
/// use tagwatch::crawler::build_http_client;
///
/// let user_agent = UserAgentConfig {
///     crawler_name: "TagWatch".to_string(),
///     crawler_version: "0.1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&user_agent, &CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    crawler: &CrawlerConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(crawler.request_timeout())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches newest-tags listing pages for any site
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    scheme: &'static str,
}

impl PageFetcher {
    /// Creates a fetcher that requests listings over HTTPS
    pub fn new(client: Client) -> Self {
        Self {
            client,
            scheme: "https",
        }
    }

    /// Builds a fetcher from configuration
    pub fn from_config(
        user_agent: &UserAgentConfig,
        crawler: &CrawlerConfig,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(user_agent, crawler)?))
    }

    /// Requests listings over plain HTTP (local servers only)
    pub fn insecure(mut self) -> Self {
        self.scheme = "http";
        self
    }

    /// Builds the listing URL for a page: `{scheme}://{site}/tags?tab=new&page={page}`
    pub fn listing_url(&self, site: &str, page: u32) -> Result<Url, url::ParseError> {
        let base = format!("{}://{}/tags", self.scheme, site);
        let page = page.to_string();
        Url::parse_with_params(&base, [("tab", "new"), ("page", page.as_str())])
    }

    /// Fetches one listing page
    ///
    /// Never fails outright: every problem is reported as
    /// [`FetchResult::Failed`] so the caller can stop paginating and keep what
    /// it already has.
    pub async fn fetch(&self, site: &str, page: u32) -> FetchResult {
        let url = match self.listing_url(site, page) {
            Ok(url) => url,
            Err(e) => {
                return FetchResult::Failed(FetchError::Transport {
                    url: format!("{}://{}/tags", self.scheme, site),
                    reason: format!("invalid listing URL: {}", e),
                })
            }
        };

        tracing::debug!("Fetching listing page: {}", url);

        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => return FetchResult::Failed(classify_error(url.as_str(), &e)),
        };

        let status = response.status();
        if status != StatusCode::OK {
            return FetchResult::Failed(FetchError::Transport {
                url: url.to_string(),
                reason: format!("HTTP {}", status.as_u16()),
            });
        }

        match response.text().await {
            Ok(body) if body.trim().is_empty() => FetchResult::Empty {
                url: url.to_string(),
            },
            Ok(body) => FetchResult::Success {
                url: url.to_string(),
                body,
            },
            Err(e) => FetchResult::Failed(classify_error(url.as_str(), &e)),
        }
    }
}

/// Maps a reqwest error to a transport failure with a readable reason
fn classify_error(url: &str, error: &reqwest::Error) -> FetchError {
    let reason = if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        "Connection refused".to_string()
    } else {
        error.to_string()
    };

    FetchError::Transport {
        url: url.to_string(),
        reason,
    }
}
