//! Tag cache module
//!
//! This module holds the in-memory results of crawls:
//! - `TagRecord`: one discovered tag
//! - `SiteCache`: all tags for one site, keyed by name
//! - `CacheStore`: the owned, shareable collection of site caches

mod record;
mod site_cache;
mod store;

pub use record::TagRecord;
pub use site_cache::SiteCache;
pub use store::CacheStore;
