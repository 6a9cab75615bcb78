//! Layout provider abstraction layer.
//!
//! Provides a trait-based interface to the PDF library, isolating the concrete
//! implementation (lopdf) from the outline builder. Tests and alternative
//! backends implement [`LayoutProvider`] directly.

use std::path::Path;

use lopdf::{Document as LopdfDocument, Object, ObjectId};

use crate::detect::detect_pdf_version;
use crate::error::{Error, Result};
use crate::model::{BlockGeometry, Outline};

use super::layout::LayoutAnalyzer;
use super::writer::{save_document, write_outline};

/// Abstract interface to a document's text layout and outline.
pub trait LayoutProvider {
    /// Number of pages.
    fn page_count(&self) -> usize;

    /// Blocks of lines on a zero-based page, in no particular order.
    fn get_lines(&self, page_index: usize) -> Result<Vec<BlockGeometry>>;

    /// Replace the document outline and serialize the document.
    ///
    /// Implementations must reject outlines that break the nesting constraint.
    fn assign_outline(&mut self, outline: &Outline) -> Result<Vec<u8>>;

    /// Whether [`assign_outline`](Self::assign_outline) compresses streams.
    /// Providers that do not serialize PDF streams can ignore this.
    fn set_compression(&mut self, _compress: bool) {}
}

/// Page rectangle in PDF user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl PageBox {
    /// US Letter, used when a page declares no MediaBox.
    pub const LETTER: PageBox = PageBox {
        left: 0.0,
        bottom: 0.0,
        right: 612.0,
        top: 792.0,
    };

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }
}

// ---------------------------------------------------------------------------
// LopdfProvider: concrete implementation backed by lopdf
// ---------------------------------------------------------------------------

/// Concrete [`LayoutProvider`] backed by `lopdf::Document`.
pub struct LopdfProvider {
    doc: LopdfDocument,
    page_ids: Vec<ObjectId>,
    compress: bool,
}

impl LopdfProvider {
    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let version = detect_pdf_version(data)?;
        let doc = LopdfDocument::load_mem(data).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::DocumentOpen("document is encrypted".to_string()),
            _ => Error::DocumentOpen(e.to_string()),
        })?;
        log::debug!("Loaded PDF {} with {} pages", version, doc.get_pages().len());
        Ok(Self::from_document(doc))
    }

    /// Load from a file path.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::load_bytes(&data)
    }

    /// Wrap an already parsed document.
    pub fn from_document(doc: LopdfDocument) -> Self {
        let page_ids = doc.get_pages().into_values().collect();
        Self {
            doc,
            page_ids,
            compress: true,
        }
    }

    /// Direct access to the underlying `lopdf::Document`.
    pub fn raw_doc(&self) -> &LopdfDocument {
        &self.doc
    }

    /// Get PDF version string.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    /// Object id of a zero-based page.
    fn page_id(&self, page_index: usize) -> Result<ObjectId> {
        self.page_ids
            .get(page_index)
            .copied()
            .ok_or(Error::PageOutOfRange(page_index, self.page_ids.len()))
    }

    /// Page rectangle, following MediaBox inheritance through the page tree.
    pub fn page_box(&self, page_index: usize) -> Result<PageBox> {
        let mut current = self.page_id(page_index)?;

        // Bounded walk in case of a cyclic /Parent chain
        for _ in 0..32 {
            let Ok(dict) = self.doc.get_dictionary(current) else {
                break;
            };
            if let Some(page_box) = dict
                .get(b"MediaBox")
                .ok()
                .and_then(|obj| self.resolve(obj).as_array().ok())
                .and_then(|arr| parse_box(arr))
            {
                return Ok(page_box);
            }
            match dict.get(b"Parent").and_then(Object::as_reference) {
                Ok(parent) => current = parent,
                Err(_) => break,
            }
        }

        Ok(PageBox::LETTER)
    }

    fn resolve<'a>(&'a self, obj: &'a Object) -> &'a Object {
        match obj {
            Object::Reference(id) => self.doc.get_object(*id).unwrap_or(obj),
            _ => obj,
        }
    }
}

impl LayoutProvider for LopdfProvider {
    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn get_lines(&self, page_index: usize) -> Result<Vec<BlockGeometry>> {
        let page_id = self.page_id(page_index)?;
        let page_box = self.page_box(page_index)?;
        LayoutAnalyzer::new(&self.doc).page_blocks(page_id, page_box)
    }

    fn assign_outline(&mut self, outline: &Outline) -> Result<Vec<u8>> {
        write_outline(&mut self.doc, &self.page_ids, outline)?;
        save_document(&mut self.doc, self.compress)
    }

    fn set_compression(&mut self, compress: bool) {
        self.compress = compress;
    }
}

/// Normalize a `[x1 y1 x2 y2]` rectangle.
fn parse_box(arr: &[Object]) -> Option<PageBox> {
    if arr.len() < 4 {
        return None;
    }
    let mut v = [0.0f32; 4];
    for (slot, obj) in v.iter_mut().zip(arr) {
        *slot = obj.as_float().ok()?;
    }
    Some(PageBox {
        left: v[0].min(v[2]),
        bottom: v[1].min(v[3]),
        right: v[0].max(v[2]),
        top: v[1].max(v[3]),
    })
}
