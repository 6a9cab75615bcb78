//! # bookmarker
//!
//! Rule-based PDF bookmark generation.
//!
//! Every text line of a document is classified against a set of heading
//! rules (regex prefix, font name, font size, bold flag, indent), filtered by
//! a global exclusion rule, and the matches become the document outline.
//!
//! ## Quick Start
//!
//! ```no_run
//! use bookmarker::{bookmark_file, RuleConfig};
//!
//! fn main() -> bookmarker::Result<()> {
//!     let config = RuleConfig::from_json_file("rules.json")?;
//!     let result = bookmark_file("thesis.pdf", &config)?;
//!     std::fs::write("thesis_bookmarked.pdf", &result.data)?;
//!     println!("{} bookmarks", result.entry_count());
//!     Ok(())
//! }
//! ```
//!
//! ## Rule configuration
//!
//! ```json
//! {
//!   "exclusion": { "max_line_length": 40, "exclude_chars": ["。", "，"] },
//!   "level1": { "regex": "第[一二三四五六七八九十]+章", "font_size": 15, "is_bold": true },
//!   "level2": { "regex": "\\d+\\.\\d+", "font_size": [13.5, 14.5] }
//! }
//! ```

pub mod builder;
pub mod detect;
pub mod error;
pub mod model;
pub mod parser;
pub mod rules;

// Re-export commonly used types
pub use builder::{page_lines, BookmarkResult, OutlineBuilder, ProgressCallback};
pub use detect::{detect_pdf_version, is_pdf_bytes};
pub use error::{Error, ErrorKind, Result};
pub use model::{BlockGeometry, LineGeometry, LineRecord, Outline, OutlineEntry, SpanGeometry};
pub use parser::{BuildOptions, ErrorMode, LayoutProvider, LopdfProvider, PageBox};
pub use rules::{
    classify, Classification, ExclusionRule, FontSizeConstraint, IndentRange, LevelRule,
    RuleConfig,
};

use std::path::Path;

/// Add bookmarks to an in-memory PDF.
///
/// # Example
///
/// ```no_run
/// use bookmarker::{bookmark_bytes, RuleConfig};
///
/// let config = RuleConfig::from_json_file("rules.json").unwrap();
/// let data = std::fs::read("book.pdf").unwrap();
/// let result = bookmark_bytes(&data, &config).unwrap();
/// std::fs::write("book_bookmarked.pdf", result.data).unwrap();
/// ```
pub fn bookmark_bytes(data: &[u8], config: &RuleConfig) -> Result<BookmarkResult> {
    let mut provider = LopdfProvider::load_bytes(data)?;
    OutlineBuilder::new(config).build(&mut provider)
}

/// Add bookmarks to a PDF file. The file itself is not modified.
pub fn bookmark_file<P: AsRef<Path>>(path: P, config: &RuleConfig) -> Result<BookmarkResult> {
    let data = std::fs::read(path)?;
    bookmark_bytes(&data, config)
}

/// Classify a PDF without writing anything.
///
/// The returned outline may still violate nesting; call
/// [`Outline::validate`] to check it.
pub fn scan_bytes(data: &[u8], config: &RuleConfig) -> Result<Outline> {
    let provider = LopdfProvider::load_bytes(data)?;
    OutlineBuilder::new(config).scan(&provider)
}

/// Every non-blank line of a PDF in reading order, for tuning rules.
pub fn extract_lines(data: &[u8]) -> Result<Vec<LineRecord>> {
    let provider = LopdfProvider::load_bytes(data)?;
    let mut records = Vec::new();
    for page_index in 0..provider.page_count() {
        records.extend(page_lines(provider.get_lines(page_index)?, page_index));
    }
    Ok(records)
}

/// Fluent entry point.
///
/// # Example
///
/// ```no_run
/// use bookmarker::{Bookmarker, RuleConfig};
///
/// let data = std::fs::read("book.pdf")?;
/// let result = Bookmarker::new()
///     .with_config(RuleConfig::from_json_file("rules.json")?)
///     .lenient()
///     .on_progress(|p| eprintln!("{:.0}%", p * 100.0))
///     .run(&data)?;
/// # Ok::<(), bookmarker::Error>(())
/// ```
pub struct Bookmarker<'a> {
    config: RuleConfig,
    options: BuildOptions,
    progress: Option<ProgressCallback<'a>>,
}

impl<'a> Bookmarker<'a> {
    /// Create a new builder with an empty rule set.
    pub fn new() -> Self {
        Self {
            config: RuleConfig::default(),
            options: BuildOptions::default(),
            progress: None,
        }
    }

    /// Set the rule configuration.
    pub fn with_config(mut self, config: RuleConfig) -> Self {
        self.config = config;
        self
    }

    /// Treat unreadable pages as empty instead of failing.
    pub fn lenient(mut self) -> Self {
        self.options = self.options.lenient();
        self
    }

    /// Save without compressing streams.
    pub fn without_compression(mut self) -> Self {
        self.options = self.options.with_compression(false);
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

    /// Rule configuration in effect.
    pub fn config(&self) -> &RuleConfig {
        &self.config
    }

    /// Bookmark an in-memory PDF.
    pub fn run(self, data: &[u8]) -> Result<BookmarkResult> {
        let mut provider = LopdfProvider::load_bytes(data)?;
        let mut builder = OutlineBuilder::new(&self.config).with_options(self.options);
        if let Some(progress) = self.progress {
            builder = builder.on_progress(progress);
        }
        builder.build(&mut provider)
    }

    /// Classify an in-memory PDF without writing.
    pub fn scan(self, data: &[u8]) -> Result<Outline> {
        let provider = LopdfProvider::load_bytes(data)?;
        let mut builder = OutlineBuilder::new(&self.config).with_options(self.options);
        if let Some(progress) = self.progress {
            builder = builder.on_progress(progress);
        }
        builder.scan(&provider)
    }
}

impl Default for Bookmarker<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bookmarker_builder() {
        let config = RuleConfig::new()
            .with_level(1, LevelRule::new().with_bold(true))
            .unwrap();
        let bookmarker = Bookmarker::new()
            .with_config(config)
            .lenient()
            .without_compression();
        assert_eq!(bookmarker.options.error_mode, ErrorMode::Lenient);
        assert!(!bookmarker.options.compress);
        assert_eq!(bookmarker.config().active_level_count(), 1);
    }

    #[test]
    fn test_bookmark_bytes_rejects_non_pdf() {
        let err = bookmark_bytes(b"not a pdf", &RuleConfig::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DocumentOpen);
    }

    #[test]
    fn test_extract_lines_rejects_non_pdf() {
        assert!(matches!(
            extract_lines(b""),
            Err(Error::DocumentOpen(_))
        ));
    }
}
