use chrono::{DateTime, Utc};
use url::Url;

/// One tag discovered on a site's newest-tags listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    /// Display name, unique within a site
    pub name: String,

    /// Tag excerpt; empty when the cell has no description block
    pub description: String,

    /// Link to the tag's page as it appears in the markup (usually relative)
    pub link: String,

    /// Number of posts using the tag; 0 when the cell has no metadata block
    pub post_count: u64,

    /// Creation time in UTC; `None` when the cell carried no readable metadata
    pub created_at: Option<DateTime<Utc>>,
}

impl TagRecord {
    /// Creates a record with only a name and link
    pub fn new(name: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            link: link.into(),
            post_count: 0,
            created_at: None,
        }
    }

    /// Returns true if the tag is known to have been created at or after `from`
    ///
    /// Undated records are never considered recent.
    pub fn created_since(&self, from: DateTime<Utc>) -> bool {
        self.created_at.is_some_and(|stamp| stamp >= from)
    }

    /// Resolves the tag's link against the site it was found on
    ///
    /// Absolute links are returned unchanged.
    pub fn url(&self, site: &str) -> Option<Url> {
        let base = Url::parse(&format!("https://{}/", site)).ok()?;
        base.join(&self.link).ok()
    }
}
