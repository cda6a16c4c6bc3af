//! Table title detection on page text.

use crate::progress::ProgressSink;
use regex::Regex;
use tablespan_backend::DocumentBackend;
use tablespan_core::{Separator, TitleKind, TitleOccurrence};

/// Detects table titles (`"Cuadro 1. Resumen"`, `"Tabla 2 Datos"`,
/// `"Table 3. Results"`) in page text.
///
/// Matching is case-insensitive and line-oriented: a title never spans a
/// line break, and at most one title is taken per line. The separator that
/// actually appeared between the number and the description (period or
/// plain whitespace) is preserved so the canonical title string round-trips
/// against the page text.
pub struct TitleExtractor {
    pattern: Regex,
}

impl Default for TitleExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TitleExtractor {
    #[must_use]
    pub fn new() -> Self {
        // Group 3 captures the literal period separator when present;
        // otherwise the number and description are separated by whitespace.
        let pattern =
            Regex::new(r"(?i)\b(cuadro|tabla|table)[ \t]+([0-9]+)(?:(\.)[ \t]*|[ \t]+)(\S[^\r\n]*)")
                .expect("title pattern is a valid regex");
        Self { pattern }
    }

    /// Detect every title on one page of text. `page` is 1-based.
    #[must_use]
    pub fn extract_from_page(&self, text: &str, page: u32) -> Vec<TitleOccurrence> {
        let mut titles = Vec::new();
        let mut line_offset = 0;
        for line in text.split('\n') {
            if let Some(caps) = self.pattern.captures(line) {
                let kind = caps
                    .get(1)
                    .and_then(|m| TitleKind::parse(m.as_str()));
                let number = caps.get(2).map(|m| m.as_str());
                let separator = if caps.get(3).is_some() {
                    Separator::Period
                } else {
                    Separator::Space
                };
                let description = caps
                    .get(4)
                    .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
                    .unwrap_or_default();

                if let (Some(kind), Some(number)) = (kind, number) {
                    if !description.is_empty() {
                        let offset = line_offset
                            + caps.get(0).map_or(0, |m| m.start());
                        match TitleOccurrence::new(
                            page,
                            kind,
                            number,
                            description,
                            separator,
                            offset,
                        ) {
                            Ok(title) => titles.push(title),
                            Err(e) => log::debug!("skipping malformed title on page {page}: {e}"),
                        }
                    }
                }
            }
            line_offset += line.len() + 1;
        }
        titles
    }

    /// Detect titles on every page of an open document, ordered by page and
    /// in-page offset. A page whose text cannot be extracted is treated as
    /// empty, never as a fatal error.
    pub fn extract<B: DocumentBackend>(
        &self,
        backend: &B,
        doc: &B::Document,
        progress: &dyn ProgressSink,
    ) -> Vec<TitleOccurrence> {
        let page_count = backend.page_count(doc);
        let mut titles = Vec::new();
        for page_index in 0..page_count {
            let text = match backend.page_text(doc, page_index) {
                Ok(text) => text,
                Err(e) => {
                    log::warn!("failed to read text of page {}: {e}", page_index + 1);
                    String::new()
                }
            };
            titles.extend(self.extract_from_page(&text, page_index as u32 + 1));
            if page_count > 0 {
                let percent = ((page_index + 1) * 100 / page_count) as u8;
                progress.report("extract", Some(percent));
            }
        }
        titles
    }
}
