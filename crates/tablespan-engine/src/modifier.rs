//! Application of planned rewrites to an open document.

use crate::progress::ProgressSink;
use std::collections::HashMap;
use tablespan_backend::DocumentBackend;
use tablespan_core::{constants, FormatInfo, Modification, Point, Rect, Result};

/// Horizontal slack (points) when expanding a prefix hit to cover the
/// whole title line.
const PREFIX_EXPANSION_X: f32 = 300.0;

/// Counts from one apply pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplyOutcome {
    /// Titles rewritten on the page.
    pub modified: usize,
    /// Titles that could not be located or re-inserted.
    pub failed: usize,
}

/// Maps a resolved font family plus style to a base-14 PostScript name.
///
/// Arial is metrically equivalent to Helvetica and is substituted; families
/// with no base-14 counterpart (Calibri, Verdana, ...) answer `None` and the
/// caller falls back to the default font.
fn base14_for(family: &str, bold: bool, italic: bool) -> Option<&'static str> {
    let lower = family.to_ascii_lowercase();
    let table: &[(&str, [&'static str; 4])] = &[
        (
            "helvetica",
            [
                "Helvetica",
                "Helvetica-Bold",
                "Helvetica-Oblique",
                "Helvetica-BoldOblique",
            ],
        ),
        (
            "arial",
            [
                "Helvetica",
                "Helvetica-Bold",
                "Helvetica-Oblique",
                "Helvetica-BoldOblique",
            ],
        ),
        (
            "times",
            [
                "Times-Roman",
                "Times-Bold",
                "Times-Italic",
                "Times-BoldItalic",
            ],
        ),
        (
            "courier",
            [
                "Courier",
                "Courier-Bold",
                "Courier-Oblique",
                "Courier-BoldOblique",
            ],
        ),
    ];
    let variants = table
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, v)| v)?;
    Some(match (bold, italic) {
        (false, false) => variants[0],
        (true, false) => variants[1],
        (false, true) => variants[2],
        (true, true) => variants[3],
    })
}

/// Applies [`Modification`] decisions to a document: locate the title,
/// paint over it, re-insert the suffixed text in the resolved format.
pub struct PdfModifier<'a, B: DocumentBackend> {
    backend: &'a B,
}

impl<'a, B: DocumentBackend> PdfModifier<'a, B> {
    #[must_use]
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Apply every decision that needs a rewrite. A title that cannot be
    /// located or re-inserted is counted as failed and the pass continues;
    /// only backend-fatal errors abort.
    ///
    /// `override_format`, when given, replaces each decision's resolved
    /// format wholesale (the CLI exposes this for documents whose detected
    /// formats are off).
    ///
    /// # Errors
    ///
    /// Propagates redaction failures from the backend.
    pub fn apply(
        &self,
        doc: &mut B::Document,
        modifications: &[Modification],
        override_format: Option<&FormatInfo>,
        progress: &dyn ProgressSink,
    ) -> Result<ApplyOutcome> {
        let mut outcome = ApplyOutcome::default();
        let mut font_cache: HashMap<(String, bool, bool), Option<&'static str>> = HashMap::new();

        let pending: Vec<&Modification> = modifications
            .iter()
            .filter(|m| m.needs_modification())
            .collect();

        for (done, modification) in pending.iter().enumerate() {
            let page_index = modification.page.saturating_sub(1) as usize;

            let Some(rect) = self.locate_title(doc, page_index, &modification.original_title)
            else {
                log::warn!(
                    "could not locate {:?} on page {}, skipping",
                    modification.original_title,
                    modification.page
                );
                outcome.failed += 1;
                continue;
            };

            self.backend.redact_region(doc, page_index, rect)?;

            let format = override_format
                .or(modification.format_info.as_ref())
                .cloned()
                .unwrap_or_else(FormatInfo::default_format);
            let baseline = Point::new(rect.x0, rect.y0 + 0.25 * rect.height());

            let cache_key = (
                format.font_name.clone(),
                format.is_bold,
                format.is_italic,
            );
            let base_font = *font_cache
                .entry(cache_key)
                .or_insert_with(|| base14_for(&format.font_name, format.is_bold, format.is_italic));

            let inserted = match base_font {
                Some(font) => self
                    .backend
                    .insert_text(
                        doc,
                        page_index,
                        baseline,
                        &modification.modified_title,
                        font,
                        format.font_size,
                        format.color,
                    )
                    .map_err(|e| {
                        log::warn!(
                            "insertion with {font} failed on page {}: {e}",
                            modification.page
                        );
                        e
                    })
                    .is_ok(),
                None => {
                    log::debug!(
                        "no base-14 counterpart for {:?}, using default font",
                        format.font_name
                    );
                    false
                }
            };

            let inserted = inserted
                || self
                    .backend
                    .insert_text(
                        doc,
                        page_index,
                        baseline,
                        &modification.modified_title,
                        constants::DEFAULT_FONT_NAME,
                        format.font_size,
                        format.color,
                    )
                    .is_ok();

            if inserted {
                outcome.modified += 1;
            } else {
                log::error!(
                    "failed to re-insert {:?} on page {}",
                    modification.modified_title,
                    modification.page
                );
                outcome.failed += 1;
            }

            let percent = ((done + 1) * 100 / pending.len()) as u8;
            progress.report("apply", Some(percent));
        }

        Ok(outcome)
    }

    /// Find the rectangle covering a title on a page. Tries the exact
    /// string, separator variants, and finally the `"Kind N."` / `"Kind N"`
    /// head with the hit widened to cover the rest of the line.
    fn locate_title(
        &self,
        doc: &B::Document,
        page_index: usize,
        title: &str,
    ) -> Option<Rect> {
        let mut candidates: Vec<String> = vec![title.to_string()];
        let no_period = title.replacen(". ", " ", 1);
        if no_period != title {
            candidates.push(no_period);
        }
        if let Some(stripped) = title.strip_suffix('.') {
            candidates.push(stripped.to_string());
        }

        for needle in &candidates {
            if let Some(rect) = self.backend.search_text(doc, page_index, needle).first() {
                return Some(*rect);
            }
        }

        // Head fallback: search the kind word plus number alone, widen the
        // hit rightwards, then check the widened region really holds the
        // title text. Both separator forms are tried, so space-separated
        // titles reach this path too.
        let mut tokens = title.split_whitespace();
        let kind = tokens.next()?;
        let number = tokens.next()?.trim_end_matches('.');
        let mut heads = vec![format!("{kind} {number}.")];
        let bare = format!("{kind} {number}");
        if !heads.contains(&bare) {
            heads.push(bare);
        }

        let expected: String = normalize_for_match(title).chars().take(20).collect();
        for head in &heads {
            for hit in self.backend.search_text(doc, page_index, head) {
                let widened = Rect::new(hit.x0, hit.y0, hit.x1 + PREFIX_EXPANSION_X, hit.y1);
                let covered = self
                    .backend
                    .format_spans(doc, page_index, Some(widened))
                    .iter()
                    .map(|s| s.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                if normalize_for_match(&covered).contains(&expected) {
                    return Some(widened);
                }
            }
        }
        None
    }
}

/// Collapse whitespace runs and lowercase, so the detected title and the
/// page's span text compare on content alone.
fn normalize_for_match(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}
