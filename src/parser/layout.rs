//! Layout analysis for PDF pages.
//!
//! This module turns a page's content stream into text spans with position and
//! font information, groups spans into lines by baseline and lines into blocks
//! by spacing, and reports the result as [`BlockGeometry`] in top-down page space.

use std::collections::{BTreeMap, HashMap};

use lopdf::{Document as LopdfDocument, Object, ObjectId};

use crate::error::{Error, Result};
use crate::model::{BlockGeometry, LineGeometry, SpanGeometry};

use super::backend::PageBox;

/// A text span with position and style information (PDF user space, y up).
#[derive(Debug, Clone)]
pub struct TextSpan {
    /// The text content
    pub text: String,
    /// X position (left edge)
    pub x: f32,
    /// Y position (baseline)
    pub y: f32,
    /// Estimated width of the text
    pub width: f32,
    /// Font size in points
    pub font_size: f32,
    /// Font name (e.g., "Helvetica-Bold")
    pub font_name: String,
}

impl TextSpan {
    /// Create a new text span. Width is estimated from the glyph count.
    pub fn new(text: String, x: f32, y: f32, font_size: f32, font_name: String) -> Self {
        let width = text
            .chars()
            .map(|c| {
                if is_spaceless_script_char(c) {
                    font_size
                } else {
                    font_size * 0.5
                }
            })
            .sum();

        Self {
            text,
            x,
            y,
            width,
            font_size,
            font_name,
        }
    }

    /// Get the top Y coordinate (approximate, based on font size).
    pub fn top(&self) -> f32 {
        self.y + self.font_size * 0.8 // Approximate ascender
    }
}

/// A text line composed of multiple spans on the same baseline.
#[derive(Debug, Clone)]
pub struct TextLine {
    /// The spans in this line, sorted by X position
    pub spans: Vec<TextSpan>,
    /// Y position (baseline)
    pub y: f32,
    /// Leftmost X position
    pub x: f32,
    /// Dominant font size in this line
    pub font_size: f32,
}

impl TextLine {
    /// Create a new text line from spans.
    pub fn from_spans(mut spans: Vec<TextSpan>) -> Self {
        if spans.is_empty() {
            return Self {
                spans: vec![],
                y: 0.0,
                x: 0.0,
                font_size: 0.0,
            };
        }

        // Sort spans by X position
        spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

        // Calculate dominant font size (weighted by text length)
        let total_chars: usize = spans.iter().map(|s| s.text.len()).sum();
        let weighted_size: f32 = spans
            .iter()
            .map(|s| s.font_size * s.text.len() as f32)
            .sum();
        let font_size = if total_chars > 0 {
            weighted_size / total_chars as f32
        } else {
            spans[0].font_size
        };

        let y = spans[0].y;
        let x = spans[0].x;

        Self {
            spans,
            y,
            x,
            font_size,
        }
    }

    /// Highest point of the line.
    pub fn top(&self) -> f32 {
        self.spans
            .iter()
            .map(TextSpan::top)
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Span texts, with a separating space prefixed where the gap calls for one.
    ///
    /// For CJK characters, no space is inserted between adjacent spans.
    pub fn span_texts(&self) -> Vec<String> {
        let mut result = Vec::with_capacity(self.spans.len());

        for (i, span) in self.spans.iter().enumerate() {
            if i == 0 {
                result.push(span.text.clone());
                continue;
            }

            let prev_span = &self.spans[i - 1];
            let gap = span.x - (prev_span.x + prev_span.width);

            let char_count = span.text.chars().count();
            let avg_char_width = if char_count > 0 && span.width > 0.0 {
                span.width / char_count as f32
            } else {
                span.font_size * 0.5
            };

            // Gap threshold: more than 20% of average char width
            let should_insert_space = if gap > avg_char_width * 0.2 {
                let prev_is_cjk = prev_span
                    .text
                    .chars()
                    .last()
                    .map(is_spaceless_script_char)
                    .unwrap_or(false);
                let curr_is_cjk = span
                    .text
                    .chars()
                    .next()
                    .map(is_spaceless_script_char)
                    .unwrap_or(false);
                !(prev_is_cjk && curr_is_cjk)
            } else {
                false
            };

            let prev_ends_with_space =
                prev_span.text.ends_with(' ') || prev_span.text.ends_with('\u{00A0}');
            let curr_starts_with_space =
                span.text.starts_with(' ') || span.text.starts_with('\u{00A0}');

            if should_insert_space && !prev_ends_with_space && !curr_starts_with_space {
                result.push(format!(" {}", span.text));
            } else {
                result.push(span.text.clone());
            }
        }

        result
    }

    /// Combined text of all spans.
    pub fn text(&self) -> String {
        self.span_texts().concat()
    }
}

/// Layout analyzer for extracting line geometry from PDF pages.
pub struct LayoutAnalyzer<'a> {
    doc: &'a LopdfDocument,
}

impl<'a> LayoutAnalyzer<'a> {
    /// Create a new layout analyzer.
    pub fn new(doc: &'a LopdfDocument) -> Self {
        Self { doc }
    }

    /// Extract blocks of lines from a page, in top-down page space.
    pub fn page_blocks(&self, page_id: ObjectId, page_box: PageBox) -> Result<Vec<BlockGeometry>> {
        let spans = self.extract_page_spans(page_id)?;
        let lines = group_spans_into_lines(spans);
        let blocks = group_lines_into_blocks(lines);

        Ok(blocks
            .into_iter()
            .map(|block| {
                BlockGeometry::new(
                    block
                        .into_iter()
                        .map(|line| to_line_geometry(&line, page_box))
                        .collect(),
                )
            })
            .collect())
    }

    /// Extract text spans from a page with position and font information.
    /// Uses lopdf's font encoding support for proper text decoding.
    pub fn extract_page_spans(&self, page_id: ObjectId) -> Result<Vec<TextSpan>> {
        let lopdf_fonts = self
            .doc
            .get_page_fonts(page_id)
            .map_err(|e| Error::TextExtract(e.to_string()))?;

        let mut fonts = HashMap::new();
        for (name, font) in &lopdf_fonts {
            let base_font = font
                .get(b"BaseFont")
                .ok()
                .and_then(|o| o.as_name().ok())
                .map(|n| String::from_utf8_lossy(n).to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            fonts.insert(name.clone(), base_font);
        }

        match self.get_page_content(page_id)? {
            Some(content) => self.parse_content_stream(&content, &fonts, &lopdf_fonts),
            None => Ok(Vec::new()),
        }
    }

    /// Get the decompressed page content stream; `None` for pages without content.
    fn get_page_content(&self, page_id: ObjectId) -> Result<Option<Vec<u8>>> {
        let page_dict = self
            .doc
            .get_dictionary(page_id)
            .map_err(|e| Error::TextExtract(e.to_string()))?;

        let contents = match page_dict.get(b"Contents") {
            Ok(c) => c,
            Err(_) => return Ok(None),
        };

        match contents {
            Object::Reference(r) => {
                if let Ok(Object::Stream(s)) = self.doc.get_object(*r) {
                    return s
                        .decompressed_content()
                        .or_else(|_| Ok(s.content.clone()))
                        .map(Some);
                }
                Err(Error::TextExtract("Invalid content stream".to_string()))
            }
            Object::Array(arr) => {
                let mut content = Vec::new();
                for obj in arr {
                    if let Object::Reference(r) = obj {
                        if let Ok(Object::Stream(s)) = self.doc.get_object(*r) {
                            let data = s
                                .decompressed_content()
                                .unwrap_or_else(|_| s.content.clone());
                            content.extend_from_slice(&data);
                            content.push(b' ');
                        }
                    }
                }
                Ok(Some(content))
            }
            _ => Err(Error::TextExtract("Invalid content stream".to_string())),
        }
    }

    /// Walk the content stream operators and collect positioned text spans.
    fn parse_content_stream(
        &self,
        content: &[u8],
        fonts: &HashMap<Vec<u8>, String>,
        lopdf_fonts: &BTreeMap<Vec<u8>, &lopdf::Dictionary>,
    ) -> Result<Vec<TextSpan>> {
        let content = lopdf::content::Content::decode(content)
            .map_err(|e| Error::TextExtract(e.to_string()))?;

        let mut spans = Vec::new();
        let mut current_font = String::new();
        let mut current_font_name: Vec<u8> = Vec::new();
        let mut current_font_size: f32 = 12.0;
        let mut text_matrix = TextMatrix::default();
        let mut ctm = Matrix::IDENTITY;
        let mut ctm_stack: Vec<Matrix> = Vec::new();
        let mut in_text_block = false;

        for op in content.operations {
            match op.operator.as_str() {
                "q" => ctm_stack.push(ctm),
                "Q" => {
                    if let Some(saved) = ctm_stack.pop() {
                        ctm = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = matrix_operands(&op.operands) {
                        ctm = m.multiply(&ctm);
                    }
                }
                "BT" => {
                    in_text_block = true;
                    text_matrix.reset();
                }
                "ET" => {
                    in_text_block = false;
                }
                "Tf" => {
                    if op.operands.len() >= 2 {
                        if let Object::Name(font_name) = &op.operands[0] {
                            current_font_name = font_name.clone();
                            current_font = fonts.get(font_name.as_slice()).cloned().unwrap_or_else(
                                || String::from_utf8_lossy(font_name.as_slice()).to_string(),
                            );
                        }
                        current_font_size = get_number(&op.operands[1]).unwrap_or(12.0);
                    }
                }
                "TL" => {
                    if let Some(leading) = op.operands.first().and_then(get_number) {
                        text_matrix.leading = leading;
                    }
                }
                "Td" | "TD" => {
                    if op.operands.len() >= 2 {
                        let tx = get_number(&op.operands[0]).unwrap_or(0.0);
                        let ty = get_number(&op.operands[1]).unwrap_or(0.0);
                        if op.operator == "TD" {
                            text_matrix.leading = -ty;
                        }
                        text_matrix.translate(tx, ty);
                    }
                }
                "Tm" => {
                    if let Some(m) = matrix_operands(&op.operands) {
                        text_matrix.set(m);
                    }
                }
                "T*" => {
                    text_matrix.next_line();
                }
                "Tj" | "TJ" | "'" | "\"" => {
                    if op.operator == "'" || op.operator == "\"" {
                        text_matrix.next_line();
                    }
                    if !in_text_block {
                        continue;
                    }

                    let encoding = lopdf_fonts
                        .get(&current_font_name)
                        .and_then(|f| f.get_font_encoding(self.doc).ok());
                    let decode = |bytes: &[u8]| match &encoding {
                        Some(enc) => LopdfDocument::decode_text(enc, bytes)
                            .unwrap_or_else(|_| decode_text_simple(bytes)),
                        None => decode_text_simple(bytes),
                    };

                    let text = match op.operator.as_str() {
                        "TJ" => match op.operands.first() {
                            Some(Object::Array(arr)) => decode_tj_array(arr, &decode),
                            _ => String::new(),
                        },
                        "\"" => match op.operands.get(2) {
                            Some(Object::String(bytes, _)) => decode(bytes),
                            _ => String::new(),
                        },
                        _ => match op.operands.first() {
                            Some(Object::String(bytes, _)) => decode(bytes),
                            _ => String::new(),
                        },
                    };

                    if !text.trim().is_empty() {
                        // Glyph origin in user space: text matrix, then CTM
                        let placement = text_matrix.matrix.multiply(&ctm);
                        let (x, y) = (placement.e, placement.f);
                        let effective_size = current_font_size * placement.vertical_scale();
                        spans.push(TextSpan::new(
                            text,
                            x,
                            y,
                            effective_size,
                            current_font.clone(),
                        ));
                    }
                }
                _ => {}
            }
        }

        Ok(spans)
    }
}

/// Decode a TJ array: strings are concatenated, large negative adjustments become spaces.
///
/// Numbers are kerning adjustments in 1/1000 text space units; values beyond
/// -200 usually mark a word break.
fn decode_tj_array<F: Fn(&[u8]) -> String>(arr: &[Object], decode: F) -> String {
    let space_threshold = 200.0;
    let mut combined = String::new();

    for item in arr {
        let adjustment = match item {
            Object::String(bytes, _) => {
                combined.push_str(&decode(bytes));
                continue;
            }
            Object::Integer(n) => -(*n as f32),
            Object::Real(n) => -*n,
            _ => continue,
        };

        if adjustment > space_threshold
            && !combined.is_empty()
            && !combined.ends_with(' ')
            && !combined.ends_with('\u{00A0}')
        {
            if let Some(c) = combined.chars().last() {
                if !is_spaceless_script_char(c) {
                    combined.push(' ');
                }
            }
        }
    }

    combined
}

/// Group spans into lines by baseline, top to bottom.
///
/// Multi-column pages are not split into columns: spans sharing a baseline
/// across columns end up on the same line.
fn group_spans_into_lines(mut spans: Vec<TextSpan>) -> Vec<TextLine> {
    if spans.is_empty() {
        return vec![];
    }

    // Sort spans by Y (descending, since PDF Y is bottom-up) then X
    spans.sort_by(|a, b| {
        let y_cmp = b.y.partial_cmp(&a.y).unwrap_or(std::cmp::Ordering::Equal);
        if y_cmp == std::cmp::Ordering::Equal {
            a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal)
        } else {
            y_cmp
        }
    });

    let mut lines: Vec<TextLine> = Vec::new();
    let mut current_line_spans: Vec<TextSpan> = Vec::new();
    let mut current_y: Option<f32> = None;

    for span in spans {
        let y_tolerance = span.font_size * 0.3; // Allow 30% of font size variance

        match current_y {
            Some(y) if (span.y - y).abs() <= y_tolerance => {
                current_line_spans.push(span);
            }
            _ => {
                if !current_line_spans.is_empty() {
                    lines.push(TextLine::from_spans(std::mem::take(
                        &mut current_line_spans,
                    )));
                }
                current_y = Some(span.y);
                current_line_spans.push(span);
            }
        }
    }

    if !current_line_spans.is_empty() {
        lines.push(TextLine::from_spans(current_line_spans));
    }

    lines
}

/// Group consecutive lines into blocks (paragraphs) based on spacing.
fn group_lines_into_blocks(lines: Vec<TextLine>) -> Vec<Vec<TextLine>> {
    let avg_spacing = calculate_avg_line_spacing(&lines);
    let mut blocks: Vec<Vec<TextLine>> = Vec::new();
    let mut current: Vec<TextLine> = Vec::new();

    for line in lines {
        if let Some(prev) = current.last() {
            if should_break_block(prev, &line, avg_spacing) {
                blocks.push(std::mem::take(&mut current));
            }
        }
        current.push(line);
    }

    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

/// Calculate average line spacing.
fn calculate_avg_line_spacing(lines: &[TextLine]) -> f32 {
    if lines.len() < 2 {
        return 12.0; // Default
    }

    let spacings: Vec<f32> = lines
        .windows(2)
        .map(|w| (w[0].y - w[1].y).abs())
        .filter(|s| *s > 0.1) // Filter out very small spacings
        .collect();

    if spacings.is_empty() {
        return 12.0;
    }

    spacings.iter().sum::<f32>() / spacings.len() as f32
}

/// Determine if a new block should start.
fn should_break_block(prev_line: &TextLine, curr_line: &TextLine, avg_spacing: f32) -> bool {
    // Large spacing indicates new paragraph
    let spacing = (prev_line.y - curr_line.y).abs();
    if spacing > avg_spacing * 1.5 {
        return true;
    }

    // Significant font size change
    if (prev_line.font_size - curr_line.font_size).abs() > 1.0 {
        return true;
    }

    // Significant left margin change (indentation)
    (prev_line.x - curr_line.x).abs() > 20.0
}

/// Convert a line from PDF user space to top-down page space.
fn to_line_geometry(line: &TextLine, page_box: PageBox) -> LineGeometry {
    let spans = line
        .spans
        .iter()
        .zip(line.span_texts())
        .map(|(span, text)| SpanGeometry::new(text, span.font_name.clone(), span.font_size))
        .collect();

    LineGeometry::new(
        spans,
        line.x - page_box.left,
        page_box.top - line.top(),
    )
}

/// Affine transform `[a b c d e f]`, applied to row vectors as in PDF.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32, // X translation
    f: f32, // Y translation
}

impl Matrix {
    const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    /// `self × other`: apply `self` first, then `other`.
    fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Length of the transformed unit y vector.
    fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

/// Read the six operands of `cm` or `Tm`.
fn matrix_operands(operands: &[Object]) -> Option<Matrix> {
    if operands.len() < 6 {
        return None;
    }
    let mut v = [0.0f32; 6];
    for (slot, obj) in v.iter_mut().zip(operands) {
        *slot = get_number(obj)?;
    }
    Some(Matrix {
        a: v[0],
        b: v[1],
        c: v[2],
        d: v[3],
        e: v[4],
        f: v[5],
    })
}

/// Text matrix for tracking position in content stream.
#[derive(Debug, Clone)]
struct TextMatrix {
    matrix: Matrix,
    /// Text leading set by TL / TD
    leading: f32,
}

impl Default for TextMatrix {
    fn default() -> Self {
        Self {
            matrix: Matrix::IDENTITY,
            leading: 12.0,
        }
    }
}

impl TextMatrix {
    /// Reset the matrix at BT. Leading is graphics state and survives.
    fn reset(&mut self) {
        self.matrix = Matrix::IDENTITY;
    }

    fn set(&mut self, matrix: Matrix) {
        self.matrix = matrix;
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        let m = &mut self.matrix;
        m.e += tx * m.a + ty * m.c;
        m.f += tx * m.b + ty * m.d;
    }

    fn next_line(&mut self) {
        self.translate(0.0, -self.leading);
    }
}

/// Helper to extract number from PDF object.
fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Check if character is from a script that doesn't use word spaces.
/// Chinese and Japanese don't use spaces between words, but Korean does.
fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs (Chinese characters, used in Chinese/Japanese)
    (0x4E00..=0x9FFF).contains(&code)
    // CJK Unified Ideographs Extension A
    || (0x3400..=0x4DBF).contains(&code)
    // CJK Unified Ideographs Extension B-F
    || (0x20000..=0x2EBEF).contains(&code)
    // Hiragana and Katakana (Japanese)
    || (0x3040..=0x30FF).contains(&code)
    // CJK Symbols and Punctuation
    || (0x3000..=0x303F).contains(&code)
    // Fullwidth forms (，：（） etc.)
    || (0xFF00..=0xFFEF).contains(&code)
}

/// Simple text decoding fallback when no encoding is available.
fn decode_text_simple(bytes: &[u8]) -> String {
    // Try UTF-16BE first (BOM marker)
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    // Try UTF-8
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Fallback: Latin-1
    bytes.iter().map(|&b| b as char).collect()
}
