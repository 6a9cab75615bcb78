//! Build options.

/// Options for building an outline.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Error handling mode for per-page text extraction
    pub error_mode: ErrorMode,

    /// Whether to compress streams when saving
    pub compress: bool,
}

impl BuildOptions {
    /// Create new build options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable lenient mode (treat unreadable pages as empty).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Enable or disable stream compression on save.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Strict,
            compress: true,
        }
    }
}

/// Error handling mode during page scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail on the first unreadable page
    #[default]
    Strict,
    /// Log unreadable pages and continue
    Lenient,
}
