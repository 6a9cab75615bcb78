//! Error types for bookmarker library.

use std::io;
use thiserror::Error;

/// Result type alias for bookmarker operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while building or writing an outline.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The source bytes could not be opened as a PDF document.
    #[error("Cannot open or parse PDF document: {0}")]
    DocumentOpen(String),

    /// The scan finished but no rule matched any line.
    #[error("Scan finished, but no line matched any of the configured rules")]
    EmptyResult,

    /// The outline breaks the nesting constraint of the PDF outline tree.
    #[error(
        "Bad hierarchy level in row {row}: level {level} for \"{title}\" (at most {max_allowed} allowed here)"
    )]
    HierarchyLevel {
        /// 1-based position of the offending entry
        row: usize,
        /// Level of the offending entry
        level: u32,
        /// Title of the offending entry
        title: String,
        /// Highest level that would have been accepted at this row
        max_allowed: u32,
    },

    /// The rule configuration is malformed.
    #[error("Invalid rule configuration: {0}")]
    InvalidConfig(String),

    /// Error extracting text content from a page.
    #[error("Text extraction error: {0}")]
    TextExtract(String),

    /// Error assigning the outline or serializing the document.
    #[error("PDF write error: {0}")]
    PdfWrite(String),

    /// Page index is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(usize, usize),
}

/// Coarse classification of [`Error`] for hosts that render remediation guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The document could not be opened.
    DocumentOpen,
    /// No line matched the rules.
    EmptyResult,
    /// The produced outline skips a level.
    HierarchyLevel,
    /// The configuration was rejected.
    Config,
    /// Text extraction or serialization failed.
    Processing,
    /// File system failure.
    Io,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) => ErrorKind::Io,
            Error::DocumentOpen(_) => ErrorKind::DocumentOpen,
            Error::EmptyResult => ErrorKind::EmptyResult,
            Error::HierarchyLevel { .. } => ErrorKind::HierarchyLevel,
            Error::InvalidConfig(_) => ErrorKind::Config,
            Error::TextExtract(_) | Error::PdfWrite(_) | Error::PageOutOfRange(..) => {
                ErrorKind::Processing
            }
        }
    }

    /// Remediation guidance for the user, when there is any.
    pub fn hint(&self) -> Option<&'static str> {
        match self.kind() {
            ErrorKind::DocumentOpen => {
                Some("Make sure the file is a valid, unencrypted PDF document.")
            }
            ErrorKind::EmptyResult => Some(
                "Loosen the level rules (regex, font size, bold, indent) or widen the exclusion band, \
                 then run `lines` to inspect the actual line attributes.",
            ),
            ErrorKind::HierarchyLevel => Some(
                "The first bookmark must be level 1 and levels may only deepen one step at a time. \
                 Check that the level-1 rule matches the first heading of the document.",
            ),
            ErrorKind::Config => Some("Fix the rule configuration file and try again."),
            ErrorKind::Processing | ErrorKind::Io => None,
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            _ => Error::DocumentOpen(err.to_string()),
        }
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::InvalidConfig(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidConfig(err.to_string())
    }
}
