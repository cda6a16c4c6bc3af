//! Core trait definition for document backends.

use tablespan_core::{Point, Rect, Result};
use std::path::Path;

/// Style flag bit indicating italic text (PyMuPDF-compatible bit layout).
pub const FLAG_ITALIC: u32 = 1 << 0;

/// Style flag bit indicating bold text.
pub const FLAG_BOLD: u32 = 1 << 4;

/// One contiguous text run with uniform formatting.
///
/// Backends whose native style representation differs must translate into
/// the fixed `flags` bit layout ([`FLAG_BOLD`], [`FLAG_ITALIC`]) before
/// handing spans upward.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatSpan {
    pub text: String,
    /// Raw reported font name (subset prefixes stripped, otherwise
    /// unnormalized; normalization happens in the format resolver).
    pub font_name: String,
    pub font_size: f32,
    pub flags: u32,
    pub color: (u8, u8, u8),
    /// Approximate bounding rectangle in PDF user space.
    pub rect: Rect,
}

impl FormatSpan {
    #[must_use]
    pub const fn is_bold(&self) -> bool {
        self.flags & FLAG_BOLD != 0
    }

    #[must_use]
    pub const fn is_italic(&self) -> bool {
        self.flags & FLAG_ITALIC != 0
    }
}

/// Access to one document for the analysis and apply pipelines.
///
/// The read path (page text, search, format spans) feeds the detection
/// engine; the write path (redact, insert, save) is consumed by the apply
/// step. Implementations are not required to be thread-safe: a document
/// handle is driven by a single worker at a time.
pub trait DocumentBackend {
    /// Open-document handle. Dropping it releases the underlying resources,
    /// so every exit path of a pipeline run closes the document.
    type Document;

    /// Open a document for processing.
    ///
    /// # Errors
    ///
    /// [`TablespanError::DocumentUnreadable`](tablespan_core::TablespanError::DocumentUnreadable)
    /// when the file cannot be opened or decoded.
    fn open<P: AsRef<Path>>(&self, path: P) -> Result<Self::Document>;

    /// Number of pages in the document.
    fn page_count(&self, doc: &Self::Document) -> usize;

    /// Plain text of one page (0-based index), line breaks preserved.
    ///
    /// # Errors
    ///
    /// Backend-specific parse failures for this page. Callers in the
    /// analysis pipeline treat a failed page as empty, never as fatal.
    fn page_text(&self, doc: &Self::Document, page_index: usize) -> Result<String>;

    /// Locate a text needle on a page, case-insensitively. Returns the
    /// (approximate) rectangles of every hit; empty when not found.
    fn search_text(&self, doc: &Self::Document, page_index: usize, needle: &str) -> Vec<Rect>;

    /// All format spans of a page in reading order, optionally restricted to
    /// spans intersecting `clip`.
    fn format_spans(
        &self,
        doc: &Self::Document,
        page_index: usize,
        clip: Option<Rect>,
    ) -> Vec<FormatSpan>;

    /// Remove the visible content of a region (write path).
    ///
    /// # Errors
    ///
    /// Backend-specific failure updating the page content.
    fn redact_region(&self, doc: &mut Self::Document, page_index: usize, rect: Rect) -> Result<()>;

    /// Insert text at a baseline point with the given font (write path).
    ///
    /// # Errors
    ///
    /// [`TablespanError::InsertionFailed`](tablespan_core::TablespanError::InsertionFailed)
    /// when the requested font is unavailable or a glyph cannot be encoded.
    /// Callers retry once with the default descriptor.
    #[allow(clippy::too_many_arguments)]
    fn insert_text(
        &self,
        doc: &mut Self::Document,
        page_index: usize,
        at: Point,
        text: &str,
        font_name: &str,
        font_size: f32,
        color: (u8, u8, u8),
    ) -> Result<()>;

    /// Write the (possibly modified) document to `path`.
    ///
    /// # Errors
    ///
    /// I/O or encoding failures while saving.
    fn save(&self, doc: &mut Self::Document, path: &Path) -> Result<()>;
}
