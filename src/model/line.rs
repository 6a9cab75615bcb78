//! Per-line layout facts.

use serde::Serialize;

/// One run of text sharing a font, as reported by a layout provider.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanGeometry {
    /// Text of the run, including any leading separator space
    pub text: String,
    /// Base font name (e.g., "SimHei-Bold")
    pub font_name: String,
    /// Effective font size in points
    pub font_size: f32,
}

impl SpanGeometry {
    /// Create a new span.
    pub fn new(text: impl Into<String>, font_name: impl Into<String>, font_size: f32) -> Self {
        Self {
            text: text.into(),
            font_name: font_name.into(),
            font_size,
        }
    }
}

/// A visual line: spans in left-to-right order plus the line's bounding box origin.
#[derive(Debug, Clone, PartialEq)]
pub struct LineGeometry {
    /// Spans on this line
    pub spans: Vec<SpanGeometry>,
    /// Left edge in page space
    pub x0: f32,
    /// Top edge in page space (grows downward)
    pub y0: f32,
}

impl LineGeometry {
    /// Create a new line.
    pub fn new(spans: Vec<SpanGeometry>, x0: f32, y0: f32) -> Self {
        Self { spans, x0, y0 }
    }
}

/// A group of lines. Providers may return blocks and their lines in any order.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockGeometry {
    /// Lines in this block
    pub lines: Vec<LineGeometry>,
}

impl BlockGeometry {
    /// Create a new block.
    pub fn new(lines: Vec<LineGeometry>) -> Self {
        Self { lines }
    }

    /// Top edge of the block: the smallest `y0` among its lines.
    pub fn top(&self) -> f32 {
        self.lines
            .iter()
            .map(|l| l.y0)
            .fold(f32::INFINITY, f32::min)
    }
}

/// The facts the rule engine classifies: one reading-order line of a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineRecord {
    /// Trimmed text of the whole line
    pub text: String,
    /// Font of the first span
    pub font_name: String,
    /// Font size of the first span, rounded to 2 decimals
    pub font_size: f32,
    /// Whether the font name contains "bold" (case-insensitive)
    pub is_bold: bool,
    /// Left edge
    pub x0: f32,
    /// Top edge
    pub y0: f32,
    /// Zero-based page number
    pub page_index: usize,
}

impl LineRecord {
    /// Build a record from raw line geometry.
    ///
    /// Returns `None` when the line has no spans or its text is blank.
    pub fn from_geometry(line: &LineGeometry, page_index: usize) -> Option<Self> {
        let first = line.spans.first()?;
        let joined: String = line.spans.iter().map(|s| s.text.as_str()).collect();
        let text = joined.trim();
        if text.is_empty() {
            return None;
        }

        Some(Self {
            text: text.to_string(),
            font_name: first.font_name.clone(),
            font_size: round_size(first.font_size),
            is_bold: is_bold_font(&first.font_name),
            x0: line.x0,
            y0: line.y0,
            page_index,
        })
    }
}

/// Round a font size to 2 decimal digits.
pub fn round_size(size: f32) -> f32 {
    (size * 100.0).round() / 100.0
}

/// Bold detection by font name.
pub fn is_bold_font(font_name: &str) -> bool {
    font_name.to_lowercase().contains("bold")
}
