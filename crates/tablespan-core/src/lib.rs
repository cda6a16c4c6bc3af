//! # Tablespan Core - Shared data model
//!
//! Core types for detecting table titles that repeat across consecutive PDF
//! pages and planning their rewrite with a page-position suffix
//! (`"Tabla 1. Resultados (1/3)"`, `"(2/3)"`, `"(3/3)"`), following the
//! academic style-guide convention for multi-page tables.
//!
//! This crate holds the value types the pipeline exchanges
//! ([`TitleOccurrence`], [`FormatInfo`], [`Modification`],
//! [`AnalysisResult`]), the error taxonomy ([`TablespanError`]), geometry
//! primitives and pre-I/O input validation. The detection engine lives in
//! `tablespan-engine`; document access lives in `tablespan-backend`.

pub mod constants;
pub mod error;
pub mod geometry;
pub mod models;
pub mod validation;

pub use error::{Result, TablespanError};
pub use geometry::{Point, Rect};
pub use models::{
    AnalysisResult, FormatInfo, Modification, Separator, TitleKind, TitleOccurrence,
};
