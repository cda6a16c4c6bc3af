//! Planning of title rewrites from detected occurrences.

use crate::format::{check_uniformity, common_format, FormatResolver};
use crate::grouper::group_runs;
use tablespan_backend::DocumentBackend;
use tablespan_core::{AnalysisResult, FormatInfo, Modification, Result, TitleOccurrence};

/// Sampling bounds for format analysis.
///
/// The document-level statistics (uniformity verdict, most common format)
/// are computed from a bounded sample of occurrences rather than all of
/// them; every decision still carries its own resolved format.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Occurrences sampled when electing the most common format.
    pub common_format_sample: usize,
    /// Occurrences sampled for the uniformity check.
    pub uniformity_sample: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            common_format_sample: 10,
            uniformity_sample: 20,
        }
    }
}

/// Turns detected titles into one [`Modification`] decision per occurrence.
pub struct ModificationPlanner<'a, B: DocumentBackend> {
    backend: &'a B,
    config: PlannerConfig,
}

impl<'a, B: DocumentBackend> ModificationPlanner<'a, B> {
    #[must_use]
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            config: PlannerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(backend: &'a B, config: PlannerConfig) -> Self {
        Self { backend, config }
    }

    /// Plan the rewrite for every detected title.
    ///
    /// Titles in a repetition run of length `n > 1` get the suffix
    /// `" (i/n)"` appended to their canonical string, `i` being the 1-based
    /// position within the run. Singleton runs produce a no-op decision.
    ///
    /// # Errors
    ///
    /// Returns [`TablespanError::Validation`](tablespan_core::TablespanError::Validation)
    /// if a decision violates the model invariants; with titles produced by
    /// the extractor this does not happen.
    pub fn plan(&self, doc: &B::Document, titles: Vec<TitleOccurrence>) -> Result<AnalysisResult> {
        let resolver = FormatResolver::new(self.backend);
        let (format_uniform, format_info) = self.sample_formats(&resolver, doc, &titles);

        let runs = group_runs(&titles);
        let mut decisions: Vec<(usize, Modification)> = Vec::with_capacity(titles.len());

        for run in &runs {
            let total = run.len() as u32;
            for (position, &index) in run.indices.iter().enumerate() {
                let title = &titles[index];
                let decision = if run.is_repeated() {
                    let number = position as u32 + 1;
                    let modified = format!("{} ({number}/{total})", title.full_title);
                    let format = resolver.resolve(doc, title);
                    Modification::new(
                        title.page,
                        title.full_title.clone(),
                        modified,
                        Some(number),
                        total,
                        Some(format),
                    )?
                } else {
                    let format = resolver.resolve(doc, title);
                    Modification::new(
                        title.page,
                        title.full_title.clone(),
                        title.full_title.clone(),
                        None,
                        1,
                        Some(format),
                    )?
                };
                decisions.push((index, decision));
            }
        }

        decisions.sort_by_key(|(index, _)| *index);
        let modifications = decisions.into_iter().map(|(_, d)| d).collect();

        Ok(AnalysisResult {
            all_titles: titles,
            modifications,
            format_uniform,
            format_info,
        })
    }

    /// Resolve formats for a bounded sample of titles, answering the
    /// uniformity verdict and the most common format (ties broken by first
    /// appearance).
    fn sample_formats(
        &self,
        resolver: &FormatResolver<'a, B>,
        doc: &B::Document,
        titles: &[TitleOccurrence],
    ) -> (bool, Option<FormatInfo>) {
        if titles.is_empty() {
            return (true, None);
        }

        let sample_len = titles.len().min(self.config.uniformity_sample);
        let sampled: Vec<FormatInfo> = titles[..sample_len]
            .iter()
            .map(|t| resolver.resolve(doc, t))
            .collect();

        let uniform = check_uniformity(&sampled);
        let common_len = sampled.len().min(self.config.common_format_sample);
        let common = common_format(&sampled[..common_len]);

        (uniform, common)
    }
}
