//! Process-lifetime store of per-site tag caches
//!
//! The store hands out one lock per site. A crawl holds its site's lock for
//! its whole run, so two crawls of the same site never interleave their
//! merges, while crawls of different sites proceed independently.

use crate::cache::SiteCache;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Shared handle to every site's tag cache
///
/// Cloning the store is cheap and yields a handle to the same caches.
#[derive(Debug, Clone, Default)]
pub struct CacheStore {
    sites: Arc<Mutex<HashMap<String, Arc<AsyncMutex<SiteCache>>>>>,
}

impl CacheStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cache slot for a site, creating it on first use
    fn slot(&self, site: &str) -> Arc<AsyncMutex<SiteCache>> {
        let mut sites = self
            .sites
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        sites
            .entry(site.to_string())
            .or_insert_with(|| {
                tracing::debug!("Creating tag cache for site: {}", site);
                Arc::new(AsyncMutex::new(SiteCache::new()))
            })
            .clone()
    }

    /// Locks a site's cache for exclusive use
    ///
    /// Waits until any other holder of the same site has released it.
    pub async fn lock_site(&self, site: &str) -> OwnedMutexGuard<SiteCache> {
        self.slot(site).lock_owned().await
    }

    /// Returns a copy of a site's cache
    ///
    /// An unknown site yields an empty cache. If a crawl of the site is in
    /// flight, this waits for it to finish.
    pub async fn snapshot(&self, site: &str) -> SiteCache {
        self.slot(site).lock().await.clone()
    }

    /// Returns the identifiers of every site with a cache, sorted
    pub fn sites(&self) -> Vec<String> {
        let sites = self
            .sites
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut names: Vec<String> = sites.keys().cloned().collect();
        names.sort();
        names
    }
}
