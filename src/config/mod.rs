//! Configuration module for Tagwatch
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use tagwatch::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("tagwatch.toml")).unwrap();
//! println!("Polite delay between pages: {}ms", config.crawler.page_delay_ms);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, UserAgentConfig, WatchEntry, MAX_WATCH_HOURS};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

pub(crate) use validation::validate_site;
