//! Error types for table title analysis and modification.

use thiserror::Error;

/// Error types that can occur while analyzing or rewriting a document.
///
/// Fatal document-level conditions ([`TablespanError::DocumentUnreadable`])
/// abort the whole operation with no partial results. Per-occurrence
/// conditions ([`TablespanError::InsertionFailed`]) are handled by the apply
/// step, which retries with the default font and continues with the rest of
/// the batch.
#[derive(Error, Debug)]
pub enum TablespanError {
    /// The backend cannot open or decode the input document.
    #[error("document unreadable: {0}")]
    DocumentUnreadable(String),

    /// Inserting replacement text with the requested font failed.
    ///
    /// Raised by the write-path backend, e.g. for fonts outside the base-14
    /// set or glyphs the font cannot encode. Per-occurrence, never fatal to
    /// the batch.
    #[error("text insertion failed: {0}")]
    InsertionFailed(String),

    /// A pre-condition check on paths, sizes or page ranges failed.
    ///
    /// Raised before any backend I/O begins, never silently degraded.
    #[error("validation error: {0}")]
    Validation(String),

    /// Backend-specific parse condition on an already-open document.
    #[error("backend error: {0}")]
    Backend(String),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for [`Result<T, TablespanError>`].
pub type Result<T> = std::result::Result<T, TablespanError>;
