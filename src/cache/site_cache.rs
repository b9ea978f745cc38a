//! Per-site tag cache
//!
//! A `SiteCache` maps tag names to the latest record seen for them. Entries
//! are only ever inserted or overwritten; nothing is evicted.

use crate::cache::TagRecord;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// All tags discovered so far on one site, keyed by tag name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteCache {
    tags: HashMap<String, TagRecord>,
}

impl SiteCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges records into the cache, keyed by name
    ///
    /// A record replaces any existing entry with the same name, so merging
    /// the same page twice leaves the cache exactly as merging it once.
    ///
    /// # Returns
    ///
    /// The number of names that were not present before the merge
    pub fn merge<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = TagRecord>,
    {
        let mut added = 0;
        for record in records {
            if self.tags.insert(record.name.clone(), record).is_none() {
                added += 1;
            }
        }
        added
    }

    /// Looks up a tag by name
    pub fn get(&self, name: &str) -> Option<&TagRecord> {
        self.tags.get(name)
    }

    /// Number of cached tags
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns true if no tags have been cached
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Returns the cached tag names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tags.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns records created at or after `from`, newest first
    ///
    /// Ties are broken by name so the order is stable.
    pub fn created_since(&self, from: DateTime<Utc>) -> Vec<&TagRecord> {
        let mut recent: Vec<&TagRecord> = self
            .tags
            .values()
            .filter(|record| record.created_since(from))
            .collect();

        recent.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        recent
    }
}
