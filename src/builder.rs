//! Outline builder: walks every page, classifies lines, assigns the outline.

use crate::error::{Error, Result};
use crate::model::{BlockGeometry, LineRecord, Outline, OutlineEntry};
use crate::parser::{BuildOptions, ErrorMode, LayoutProvider};
use crate::rules::{classify, RuleConfig};

/// Progress observer, called with the fraction of pages processed.
pub type ProgressCallback<'a> = Box<dyn FnMut(f32) + 'a>;

/// Result of a successful build.
#[derive(Debug, Clone)]
pub struct BookmarkResult {
    /// Serialized document carrying the new outline
    pub data: Vec<u8>,
    /// The outline that was written
    pub outline: Outline,
}

impl BookmarkResult {
    /// Number of bookmarks written.
    pub fn entry_count(&self) -> usize {
        self.outline.len()
    }
}

/// Builds an outline from a rule configuration.
///
/// ```no_run
/// use bookmarker::{LopdfProvider, OutlineBuilder, RuleConfig};
///
/// # fn main() -> bookmarker::Result<()> {
/// let config = RuleConfig::from_json_file("rules.json")?;
/// let mut provider = LopdfProvider::load_file("book.pdf")?;
/// let result = OutlineBuilder::new(&config)
///     .on_progress(|p| println!("{:.0}%", p * 100.0))
///     .build(&mut provider)?;
/// std::fs::write("book_bookmarked.pdf", &result.data)?;
/// # Ok(())
/// # }
/// ```
pub struct OutlineBuilder<'a> {
    config: &'a RuleConfig,
    options: BuildOptions,
    progress: Option<ProgressCallback<'a>>,
}

impl<'a> OutlineBuilder<'a> {
    /// Create a builder with default options and no progress observer.
    pub fn new(config: &'a RuleConfig) -> Self {
        Self {
            config,
            options: BuildOptions::default(),
            progress: None,
        }
    }

    /// Set build options.
    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Report progress after each page.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: FnMut(f32) + 'a,
    {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Options in effect.
    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Classify every line of the document without touching it.
    ///
    /// Fails with [`Error::EmptyResult`] when nothing matched. The returned
    /// outline is in reading order but its nesting is not checked.
    pub fn scan<P: LayoutProvider + ?Sized>(&mut self, provider: &P) -> Result<Outline> {
        let total = provider.page_count();
        let mut outline = Outline::new();
        log::debug!(
            "Scanning {} pages with {} active levels",
            total,
            self.config.active_level_count()
        );

        for page_index in 0..total {
            let blocks = match provider.get_lines(page_index) {
                Ok(blocks) => blocks,
                Err(e) if self.options.error_mode == ErrorMode::Lenient => {
                    log::warn!("Failed to read page {}: {}", page_index + 1, e);
                    Vec::new()
                }
                Err(e) => return Err(e),
            };

            for record in page_lines(blocks, page_index) {
                if let Some(hit) = classify(&record, self.config) {
                    log::debug!(
                        "Page {}: level {} \"{}\"",
                        page_index + 1,
                        hit.level,
                        hit.title
                    );
                    outline.push(OutlineEntry::new(
                        hit.level,
                        hit.title,
                        page_index as u32 + 1,
                    ));
                }
            }

            if let Some(progress) = self.progress.as_mut() {
                progress((page_index + 1) as f32 / total as f32);
            }
        }

        if outline.is_empty() {
            return Err(Error::EmptyResult);
        }

        log::info!(
            "Found {} headings across {} pages (max depth {})",
            outline.len(),
            total,
            outline.max_depth()
        );
        Ok(outline)
    }

    /// Scan, check nesting, and hand the outline to the provider.
    ///
    /// Nothing is written unless the whole outline is valid. The provider
    /// saves with the compression setting from [`BuildOptions`].
    pub fn build<P: LayoutProvider + ?Sized>(&mut self, provider: &mut P) -> Result<BookmarkResult> {
        let outline = self.scan(provider)?;
        outline.validate()?;
        provider.set_compression(self.options.compress);
        let data = provider.assign_outline(&outline)?;
        Ok(BookmarkResult { data, outline })
    }
}

/// Flatten a page's blocks into line records in reading order.
///
/// Blocks are ordered by their top edge, then lines within each block by
/// their own top edge. Ties keep the provider's order. Blank lines are dropped.
pub fn page_lines(mut blocks: Vec<BlockGeometry>, page_index: usize) -> Vec<LineRecord> {
    blocks.sort_by(|a, b| a.top().total_cmp(&b.top()));

    let mut records = Vec::new();
    for mut block in blocks {
        block.lines.sort_by(|a, b| a.y0.total_cmp(&b.y0));
        records.extend(
            block
                .lines
                .iter()
                .filter_map(|line| LineRecord::from_geometry(line, page_index)),
        );
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LineGeometry, SpanGeometry};

    fn line(text: &str, y0: f32) -> LineGeometry {
        LineGeometry::new(vec![SpanGeometry::new(text, "Helvetica", 12.0)], 72.0, y0)
    }

    #[test]
    fn test_page_lines_sorts_blocks_and_lines() {
        let blocks = vec![
            BlockGeometry::new(vec![line("C", 300.0), line("B", 200.0)]),
            BlockGeometry::new(vec![line("A", 100.0)]),
        ];
        let texts: Vec<String> = page_lines(blocks, 0).into_iter().map(|r| r.text).collect();
        assert_eq!(texts, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_page_lines_keeps_order_on_ties() {
        let blocks = vec![BlockGeometry::new(vec![line("first", 50.0), line("second", 50.0)])];
        let texts: Vec<String> = page_lines(blocks, 0).into_iter().map(|r| r.text).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn test_page_lines_skips_blank_lines() {
        let blocks = vec![BlockGeometry::new(vec![line("   ", 10.0), line("Title", 20.0)])];
        let records = page_lines(blocks, 4);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].page_index, 4);
    }

    #[test]
    fn test_result_entry_count() {
        let result = BookmarkResult {
            data: Vec::new(),
            outline: Outline::from(vec![OutlineEntry::new(1, "One", 1)]),
        };
        assert_eq!(result.entry_count(), 1);
    }
}
