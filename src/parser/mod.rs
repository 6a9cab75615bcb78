//! PDF access: layout extraction and outline writing.

mod backend;
mod layout;
mod options;
mod writer;

pub use backend::{LayoutProvider, LopdfProvider, PageBox};
pub use layout::{LayoutAnalyzer, TextLine, TextSpan};
pub use options::{BuildOptions, ErrorMode};
pub use writer::{save_document, write_outline};
