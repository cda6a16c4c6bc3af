//! Progress reporting seam.
//!
//! The engine reports coarse phase transitions and optional percentages
//! through [`ProgressSink`]; the CLI plugs in an indicatif-backed sink,
//! library users default to [`NullProgress`].

/// Receives progress notifications from long-running pipeline phases.
pub trait ProgressSink {
    /// Called at phase boundaries and periodically within a phase.
    /// `percent` is `None` when the phase length is unknown.
    fn report(&self, phase: &str, percent: Option<u8>);
}

/// A sink that discards all progress events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _phase: &str, _percent: Option<u8>) {}
}
