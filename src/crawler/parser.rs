//! Tag listing parser
//!
//! This module turns one page of the newest-tags listing into tag records.
//! The listing is a `#tags-browser` container holding `.js-tag-cell` cells,
//! newest first. Each cell is a stack of `div` blocks:
//!
//! ```text
//! cell
//! ├── name block         (.post-tag link with the tag name)
//! ├── description block  (only when the tag has an excerpt)
//! └── metadata block
//!     ├── post count     ("42 questions")
//!     └── creation time  ("created 2 hours ago")
//! ```
//!
//! Nothing in the markup says whether the description block is there, so the
//! shape is read off the number of blocks.

use crate::cache::TagRecord;
use crate::crawler::timestamp::parse_created;
use crate::state::CrawlCursor;
use crate::{ParseError, ParseResult};
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};

/// Tag records extracted from one listing page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// Records in document order, newest first
    pub tags: Vec<TagRecord>,

    /// False once a tag older than the cutoff was seen on this page
    pub more_may_exist: bool,

    /// Dated cells that were newer than the dated cell before them
    pub out_of_order: usize,
}

impl ParsedPage {
    /// Creation time of the first dated record on the page
    pub fn newest_stamp(&self) -> Option<DateTime<Utc>> {
        self.tags.iter().find_map(|tag| tag.created_at)
    }

    /// Creation time of the last dated record on the page
    pub fn oldest_stamp(&self) -> Option<DateTime<Utc>> {
        self.tags.iter().rev().find_map(|tag| tag.created_at)
    }
}

/// The block layout of a single tag cell
#[derive(Debug, Clone, Copy)]
enum CellShape<'a> {
    /// name, description, metadata
    WithDescription {
        name: ElementRef<'a>,
        description: ElementRef<'a>,
        meta: ElementRef<'a>,
    },

    /// name, metadata (tag has no excerpt)
    Bare {
        name: ElementRef<'a>,
        meta: ElementRef<'a>,
    },

    /// name only; the tag carries no post count or creation time
    NameOnly { name: ElementRef<'a> },
}

impl<'a> CellShape<'a> {
    /// Picks the shape from the cell's immediate `div` children
    ///
    /// Extra blocks beyond three are ignored; the last block is taken as the
    /// metadata block.
    fn detect(cell: ElementRef<'a>) -> Option<Self> {
        let blocks = child_divs(cell);

        match blocks.as_slice() {
            [] => None,
            [name] => Some(Self::NameOnly { name: *name }),
            [name, meta] => Some(Self::Bare {
                name: *name,
                meta: *meta,
            }),
            [name, description, .., meta] => Some(Self::WithDescription {
                name: *name,
                description: *description,
                meta: *meta,
            }),
        }
    }

    fn name(&self) -> ElementRef<'a> {
        match *self {
            Self::WithDescription { name, .. } | Self::Bare { name, .. } | Self::NameOnly { name } => {
                name
            }
        }
    }
}

/// Post count and creation time read from a metadata block
#[derive(Debug, Default)]
struct Metadata {
    post_count: u64,
    created_at: Option<DateTime<Utc>>,
}

/// Parser for newest-tags listing pages
///
/// Relative creation times ("2 hours ago") are resolved against the `now`
/// the parser was built with.
pub struct TagParser {
    now: DateTime<Utc>,
    container: Selector,
    cell: Selector,
    tag_link: Selector,
    titled: Selector,
}

impl TagParser {
    /// Creates a parser resolving relative times against `now`
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            container: Selector::parse("#tags-browser").expect("Hardcoded selector shouldn't fail."),
            cell: Selector::parse(".js-tag-cell").expect("Hardcoded selector shouldn't fail."),
            tag_link: Selector::parse(".post-tag").expect("Hardcoded selector shouldn't fail."),
            titled: Selector::parse("[title]").expect("Hardcoded selector shouldn't fail."),
        }
    }

    /// Parses the listing page the cursor is on
    ///
    /// Cells are read in document order. The first cell created before the
    /// cursor's cutoff ends the page: it is dropped, the cells before it are returned,
    /// and `more_may_exist` is false. Undated cells never end the page.
    ///
    /// # Returns
    ///
    /// * `Ok(ParsedPage)` - Records found on the page
    /// * `Err(ParseError::MissingContainer)` - No `#tags-browser` on the page
    /// * `Err(ParseError::MalformedCell)` - A cell has no usable name block
    pub fn parse(&self, html: &str, cursor: &CrawlCursor) -> ParseResult<ParsedPage> {
        let document = Html::parse_document(html);

        let root = document
            .select(&self.container)
            .next()
            .ok_or(ParseError::MissingContainer)?;

        let mut page = ParsedPage {
            more_may_exist: true,
            ..ParsedPage::default()
        };
        let mut previous: Option<DateTime<Utc>> = None;

        for (index, cell) in root.select(&self.cell).enumerate() {
            let shape = CellShape::detect(cell)
                .ok_or_else(|| malformed(cursor, index, "cell has no blocks"))?;

            let record = self.read_cell(cursor, index, shape)?;

            if let Some(stamp) = record.created_at {
                if cursor.is_past_cutoff(stamp) {
                    tracing::debug!(
                        "Page {}: tag '{}' created {} is older than cutoff {}",
                        cursor.page,
                        record.name,
                        stamp,
                        cursor.from_date
                    );
                    page.more_may_exist = false;
                    break;
                }

                if previous.is_some_and(|prev| stamp > prev) {
                    tracing::warn!(
                        "Page {}: tag '{}' is newer than the tag listed before it",
                        cursor.page,
                        record.name
                    );
                    page.out_of_order += 1;
                }
                previous = Some(stamp);
            }

            page.tags.push(record);
        }

        Ok(page)
    }

    /// Builds a record from a cell of known shape
    fn read_cell(
        &self,
        cursor: &CrawlCursor,
        index: usize,
        shape: CellShape<'_>,
    ) -> ParseResult<TagRecord> {
        let link = shape
            .name()
            .select(&self.tag_link)
            .next()
            .ok_or_else(|| malformed(cursor, index, "name block has no tag link"))?;

        let name = text_of(link);
        if name.is_empty() {
            return Err(malformed(cursor, index, "tag link has no text"));
        }

        let mut record = TagRecord::new(name, link.value().attr("href").unwrap_or_default());

        let meta = match shape {
            CellShape::WithDescription {
                description, meta, ..
            } => {
                record.description = description.text().collect::<String>().trim().to_string();
                Some(meta)
            }
            CellShape::Bare { meta, .. } => Some(meta),
            CellShape::NameOnly { .. } => None,
        };

        if let Some(meta) = meta {
            let metadata = self.read_metadata(meta);
            if metadata.created_at.is_none() {
                tracing::warn!(
                    "Page {}: could not read creation time for tag '{}'",
                    cursor.page,
                    record.name
                );
            }
            record.post_count = metadata.post_count;
            record.created_at = metadata.created_at;
        }

        Ok(record)
    }

    /// Reads the post count and creation time blocks
    fn read_metadata(&self, meta: ElementRef<'_>) -> Metadata {
        let blocks = child_divs(meta);

        Metadata {
            post_count: blocks
                .first()
                .map(|block| leading_count(&text_of(*block)))
                .unwrap_or(0),
            created_at: blocks.get(1).and_then(|block| self.read_created(*block)),
        }
    }

    /// Reads a creation time, preferring an absolute stamp in a `title`
    fn read_created(&self, block: ElementRef<'_>) -> Option<DateTime<Utc>> {
        let from_title = std::iter::once(block)
            .chain(block.select(&self.titled))
            .filter_map(|element| element.value().attr("title"))
            .find_map(|title| parse_created(title, self.now));

        from_title.or_else(|| parse_created(&text_of(block), self.now))
    }
}

fn malformed(cursor: &CrawlCursor, index: usize, reason: &str) -> ParseError {
    ParseError::MalformedCell {
        page: cursor.page,
        index,
        reason: reason.to_string(),
    }
}

/// Immediate `div` children of an element, in document order
fn child_divs(element: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "div")
        .collect()
}

/// Text content with surrounding whitespace trimmed and inner runs collapsed
fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses the leading digits of a count such as "42 questions"
///
/// Anything after the first non-digit is discarded; no digits yields 0.
fn leading_count(text: &str) -> u64 {
    let digits: String = text
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();

    digits.parse().unwrap_or(0)
}
