//! Flat outline (table of contents) representation.

use serde::Serialize;

use crate::error::{Error, Result};

/// A single bookmark: `(level, title, page)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineEntry {
    /// Nesting level (1 = top level)
    pub level: u32,
    /// Bookmark title
    pub title: String,
    /// Target page number (1-indexed)
    pub page_number: u32,
}

impl OutlineEntry {
    /// Create a new entry.
    pub fn new(level: u32, title: impl Into<String>, page_number: u32) -> Self {
        Self {
            level,
            title: title.into(),
            page_number,
        }
    }
}

/// Ordered list of outline entries in page-then-line order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Outline {
    entries: Vec<OutlineEntry>,
}

impl Outline {
    /// Create a new empty outline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(&mut self, entry: OutlineEntry) {
        self.entries.push(entry);
    }

    /// Entries in order.
    pub fn entries(&self) -> &[OutlineEntry] {
        &self.entries
    }

    /// Iterate over entries.
    pub fn iter(&self) -> std::slice::Iter<'_, OutlineEntry> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the outline is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deepest level used.
    pub fn max_depth(&self) -> u32 {
        self.entries.iter().map(|e| e.level).max().unwrap_or(0)
    }

    /// Rows in the `[level, title, page]` shape many PDF tools use.
    pub fn to_toc(&self) -> Vec<(u32, String, u32)> {
        self.entries
            .iter()
            .map(|e| (e.level, e.title.clone(), e.page_number))
            .collect()
    }

    /// Check the nesting constraint of the PDF outline tree.
    ///
    /// The first entry must be level 1 and each entry may be at most one level
    /// deeper than the entry before it. Levels may drop by any amount.
    pub fn validate(&self) -> Result<()> {
        let mut prev_level = 0u32;
        for (i, entry) in self.entries.iter().enumerate() {
            let max_allowed = prev_level + 1;
            if entry.level == 0 || entry.level > max_allowed {
                return Err(Error::HierarchyLevel {
                    row: i + 1,
                    level: entry.level,
                    title: entry.title.clone(),
                    max_allowed,
                });
            }
            prev_level = entry.level;
        }
        Ok(())
    }
}

impl From<Vec<OutlineEntry>> for Outline {
    fn from(entries: Vec<OutlineEntry>) -> Self {
        Self { entries }
    }
}

impl<'a> IntoIterator for &'a Outline {
    type Item = &'a OutlineEntry;
    type IntoIter = std::slice::Iter<'a, OutlineEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
