//! # Tablespan Engine - Detection and rewrite pipeline
//!
//! Finds table titles (`"Cuadro 1. Resumen"`, `"Tabla 2. Resultados"`,
//! `"Table 3. Results"`) that repeat on strictly consecutive pages of a PDF
//! and rewrites each repetition with its position in the run, e.g.
//! `"Tabla 2. Resultados (1/3)"`.
//!
//! The pipeline has four stages, each usable on its own:
//!
//! 1. [`TitleExtractor`] detects titles in page text;
//! 2. [`group_runs`] partitions them into consecutive-page repetition runs;
//! 3. [`FormatResolver`] recovers the font each title is rendered with;
//! 4. [`ModificationPlanner`] emits a [`Modification`] decision per title,
//!    and [`PdfModifier`] applies the decisions to the document.
//!
//! [`TableTitleRule`] wires the stages together behind the [`Rule`] trait
//! over any [`DocumentBackend`](tablespan_backend::DocumentBackend).
//!
//! [`Modification`]: tablespan_core::Modification

pub mod extractor;
pub mod format;
pub mod grouper;
pub mod modifier;
pub mod planner;
pub mod progress;
pub mod rule;

pub use extractor::TitleExtractor;
pub use format::{check_uniformity, common_format, normalize_font_name, FormatResolver};
pub use grouper::{group_runs, RepetitionRun};
pub use modifier::{ApplyOutcome, PdfModifier};
pub use planner::{ModificationPlanner, PlannerConfig};
pub use progress::{NullProgress, ProgressSink};
pub use rule::{ApplyOptions, ApplySummary, Rule, TableTitleRule};
