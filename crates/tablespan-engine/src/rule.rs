//! The document rule surface: one named, self-describing unit of
//! analyze-then-apply behavior over a document path.

use crate::extractor::TitleExtractor;
use crate::modifier::{ApplyOutcome, PdfModifier};
use crate::planner::{ModificationPlanner, PlannerConfig};
use crate::progress::{NullProgress, ProgressSink};
use std::path::{Path, PathBuf};
use tablespan_backend::DocumentBackend;
use tablespan_core::{
    validation, AnalysisResult, FormatInfo, Modification, Result, TablespanError,
};

/// Options for the apply pass.
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Replace an existing output file instead of refusing.
    pub overwrite: bool,
    /// Replace every resolved format with this one.
    pub format_override: Option<FormatInfo>,
}

/// Result of one apply pass: the analysis it was based on, the page rewrite
/// counts, and where the document was written.
#[derive(Debug, Clone)]
pub struct ApplySummary {
    pub analysis: AnalysisResult,
    pub outcome: ApplyOutcome,
    pub output_path: PathBuf,
}

/// A named document-rewrite rule.
///
/// Object-safe so frontends can hold a `Box<dyn Rule>` per configured rule
/// without knowing the backend type.
pub trait Rule {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;

    /// Detect and plan without touching the document.
    ///
    /// # Errors
    ///
    /// Input validation and document open/read failures.
    fn analyze(&self, input: &Path) -> Result<AnalysisResult>;

    /// Analyze, rewrite and save to `output`.
    ///
    /// # Errors
    ///
    /// Input/output validation, document open/read failures, and fatal
    /// backend errors while rewriting or saving.
    fn apply(&self, input: &Path, output: &Path, options: &ApplyOptions) -> Result<ApplySummary>;

    /// Re-check a decision's invariants before handing it to an apply pass,
    /// e.g. when decisions come from an edited JSON analysis rather than
    /// straight from [`Rule::analyze`].
    ///
    /// # Errors
    ///
    /// [`TablespanError::Validation`] naming the violated invariant.
    fn validate(&self, modification: &Modification) -> Result<()> {
        if modification.page < 1 {
            return Err(TablespanError::Validation(
                "page number must be >= 1".to_string(),
            ));
        }
        if modification.original_title.trim().is_empty()
            || modification.modified_title.trim().is_empty()
        {
            return Err(TablespanError::Validation(
                "titles cannot be empty".to_string(),
            ));
        }
        if let Some(n) = modification.repetition_number {
            if n < 1 || n > modification.total_repetitions {
                return Err(TablespanError::Validation(format!(
                    "repetition number {n} outside 1..={}",
                    modification.total_repetitions
                )));
            }
        }
        Ok(())
    }
}

/// The repeated-table-title rule: titles repeating on strictly consecutive
/// pages are rewritten with a `(i/n)` position suffix.
pub struct TableTitleRule<B: DocumentBackend> {
    backend: B,
    config: PlannerConfig,
}

impl<B: DocumentBackend> TableTitleRule<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            config: PlannerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(backend: B, config: PlannerConfig) -> Self {
        Self { backend, config }
    }

    /// Like [`Rule::analyze`] with a progress sink.
    ///
    /// # Errors
    ///
    /// See [`Rule::analyze`].
    pub fn analyze_with_progress(
        &self,
        input: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<AnalysisResult> {
        let input = validation::validate_pdf_path(input)?;
        let doc = self.backend.open(&input)?;
        self.analyze_open(&doc, progress)
    }

    /// Like [`Rule::apply`] with a progress sink.
    ///
    /// # Errors
    ///
    /// See [`Rule::apply`].
    pub fn apply_with_progress(
        &self,
        input: &Path,
        output: &Path,
        options: &ApplyOptions,
        progress: &dyn ProgressSink,
    ) -> Result<ApplySummary> {
        let input = validation::validate_pdf_path(input)?;
        let output = validation::validate_output_path(output, options.overwrite)?;
        if let Some(format) = &options.format_override {
            validation::validate_font_size(format.font_size)?;
        }

        let mut doc = self.backend.open(&input)?;
        let analysis = self.analyze_open(&doc, progress)?;

        let modifier = PdfModifier::new(&self.backend);
        let outcome = modifier.apply(
            &mut doc,
            &analysis.modifications,
            options.format_override.as_ref(),
            progress,
        )?;

        progress.report("save", None);
        self.backend.save(&mut doc, &output)?;

        Ok(ApplySummary {
            analysis,
            outcome,
            output_path: output,
        })
    }

    fn analyze_open(
        &self,
        doc: &B::Document,
        progress: &dyn ProgressSink,
    ) -> Result<AnalysisResult> {
        let extractor = TitleExtractor::new();
        let titles = extractor.extract(&self.backend, doc, progress);
        log::info!("detected {} table titles", titles.len());

        progress.report("plan", None);
        let planner = ModificationPlanner::with_config(&self.backend, self.config.clone());
        planner.plan(doc, titles)
    }
}

impl<B: DocumentBackend> Rule for TableTitleRule<B> {
    fn name(&self) -> &'static str {
        "table-title-repetition"
    }

    fn description(&self) -> &'static str {
        "Rewrites table titles repeated on consecutive pages with a (i/n) position suffix"
    }

    fn analyze(&self, input: &Path) -> Result<AnalysisResult> {
        self.analyze_with_progress(input, &NullProgress)
    }

    fn apply(&self, input: &Path, output: &Path, options: &ApplyOptions) -> Result<ApplySummary> {
        self.apply_with_progress(input, output, options, &NullProgress)
    }
}
