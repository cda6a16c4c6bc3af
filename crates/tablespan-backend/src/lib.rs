//! # Tablespan Backend - Document access
//!
//! The [`DocumentBackend`] trait is the seam between the detection engine
//! and concrete PDF libraries: page text, text search, format spans on the
//! read side; redaction, text insertion and saving on the write side.
//!
//! [`LopdfBackend`] is the production implementation, built on
//! [lopdf](https://crates.io/crates/lopdf).

pub mod lopdf_backend;
pub mod traits;

pub use lopdf_backend::{LopdfBackend, LopdfDocument};
pub use traits::{DocumentBackend, FormatSpan, FLAG_BOLD, FLAG_ITALIC};
