//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlCursor`: Per-call pagination state (site, cutoff, current page)
//! - `StopReason`: Why a crawl stopped paginating

mod cursor;
mod stop_reason;

// Re-export main types
pub use cursor::CrawlCursor;
pub use stop_reason::StopReason;
