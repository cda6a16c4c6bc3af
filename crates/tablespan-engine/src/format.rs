//! Format resolution for detected titles.
//!
//! Determines the font name, size, style and color a title is rendered
//! with, falling through a chain of increasingly lenient lookups before
//! giving up and answering the fixed default. The chain never fails: a
//! title always gets *some* descriptor.

use tablespan_backend::{DocumentBackend, FormatSpan};
use tablespan_core::{FormatInfo, TitleOccurrence};

/// Horizontal margin (points) added around a search hit before clipping
/// format spans, absorbing rectangle imprecision.
pub const SEARCH_MARGIN_X: f32 = 5.0;

/// Vertical margin (points) around a search hit.
pub const SEARCH_MARGIN_Y: f32 = 2.0;

/// Map a raw reported font name to a canonical family name.
///
/// PDF producers report many spellings for the same family (`ArialMT`,
/// `Arial-BoldMT`, `TimesNewRomanPSMT`, ...). Matching is by lowercase
/// substring; names outside the table pass through unchanged.
#[must_use]
pub fn normalize_font_name(raw: &str) -> String {
    let lower = raw.to_ascii_lowercase();
    if lower.contains("times") {
        "Times New Roman".to_string()
    } else if lower.contains("arial") {
        "Arial".to_string()
    } else if lower.contains("helv") {
        "Helvetica".to_string()
    } else if lower.contains("calibri") {
        "Calibri".to_string()
    } else if lower.contains("verdana") {
        "Verdana".to_string()
    } else if lower.contains("courier") {
        "Courier".to_string()
    } else {
        raw.to_string()
    }
}

/// Whether all formats agree under tolerant equality with the first.
/// An empty list counts as uniform.
#[must_use]
pub fn check_uniformity(formats: &[FormatInfo]) -> bool {
    match formats.split_first() {
        Some((first, rest)) => rest.iter().all(|f| f.matches(first)),
        None => true,
    }
}

/// The most frequent format under tolerant grouping, ties broken by first
/// appearance. `None` only for an empty list.
///
/// Grouping scans existing group representatives with [`FormatInfo::matches`]
/// (the size tolerance makes the relation non-transitive, so a hashed key
/// cannot express it; each format joins the first group whose representative
/// it matches).
#[must_use]
pub fn common_format(formats: &[FormatInfo]) -> Option<FormatInfo> {
    // (representative index, count)
    let mut groups: Vec<(usize, usize)> = Vec::new();
    for (i, format) in formats.iter().enumerate() {
        match groups
            .iter_mut()
            .find(|(rep, _)| formats[*rep].matches(format))
        {
            Some((_, count)) => *count += 1,
            None => groups.push((i, 1)),
        }
    }
    groups
        .iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(rep, _)| formats[*rep].clone())
}

fn span_format(span: &FormatSpan) -> Option<FormatInfo> {
    FormatInfo::new(
        normalize_font_name(&span.font_name),
        span.font_size,
        span.is_bold(),
        span.is_italic(),
        span.color,
    )
    .ok()
}

/// Resolves the rendering format of a title occurrence.
pub struct FormatResolver<'a, B: DocumentBackend> {
    backend: &'a B,
}

impl<'a, B: DocumentBackend> FormatResolver<'a, B> {
    #[must_use]
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Resolve the format for one title. Steps, in order:
    ///
    /// 1. search the full canonical title and read the spans under the hit;
    /// 2. retry with the period separator dropped (some producers render
    ///    `"Tabla 2 Resultados"` for a title detected with a period);
    /// 3. search only the `"Kind N"` prefix;
    /// 4. scan all spans of the page for one mentioning the kind word and
    ///    the number;
    /// 5. fall back to the default descriptor.
    #[must_use]
    pub fn resolve(&self, doc: &B::Document, title: &TitleOccurrence) -> FormatInfo {
        let page_index = title.page.saturating_sub(1) as usize;

        if let Some(format) = self.format_under_hit(doc, page_index, &title.full_title) {
            return format;
        }

        let no_period = title.full_title.replacen(". ", " ", 1);
        if no_period != title.full_title {
            if let Some(format) = self.format_under_hit(doc, page_index, &no_period) {
                return format;
            }
        }

        let prefix = format!("{} {}", title.kind, title.number);
        if let Some(format) = self.format_under_hit(doc, page_index, &prefix) {
            return format;
        }

        if let Some(format) = self.format_from_page_scan(doc, page_index, title) {
            return format;
        }

        log::debug!(
            "format for {:?} on page {} not found, using default",
            title.full_title,
            title.page
        );
        FormatInfo::default_format()
    }

    fn format_under_hit(
        &self,
        doc: &B::Document,
        page_index: usize,
        needle: &str,
    ) -> Option<FormatInfo> {
        for hit in self.backend.search_text(doc, page_index, needle) {
            let clip = hit.expand(SEARCH_MARGIN_X, SEARCH_MARGIN_Y);
            let spans = self.backend.format_spans(doc, page_index, Some(clip));
            if let Some(format) = spans
                .iter()
                .filter(|s| !s.text.trim().is_empty())
                .find_map(span_format)
            {
                return Some(format);
            }
        }
        None
    }

    fn format_from_page_scan(
        &self,
        doc: &B::Document,
        page_index: usize,
        title: &TitleOccurrence,
    ) -> Option<FormatInfo> {
        let kind_lower = title.kind.as_str().to_ascii_lowercase();
        let number = title.number.as_str();
        let spans = self.backend.format_spans(doc, page_index, None);

        // A single span carrying both the kind word and the number.
        if let Some(format) = spans
            .iter()
            .find(|s| {
                let lower = s.text.to_ascii_lowercase();
                lower.contains(&kind_lower) && lower.contains(number)
            })
            .and_then(span_format)
        {
            return Some(format);
        }

        // Titles split across spans ("Tabla" in one span, "2. ..." in the
        // next): join every span sharing the baseline band of a span that
        // mentions the kind word and test the assembled line text.
        for span in spans.iter().filter(|s| {
            s.text.to_ascii_lowercase().contains(&kind_lower)
        }) {
            let mid = (span.rect.y0 + span.rect.y1) / 2.0;
            let line_text = spans
                .iter()
                .filter(|s| {
                    let other_mid = (s.rect.y0 + s.rect.y1) / 2.0;
                    (other_mid - mid).abs() <= span.rect.height() / 2.0
                })
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            let lower = line_text.to_ascii_lowercase();
            if lower.contains(&kind_lower) && lower.contains(number) {
                return span_format(span);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_family_normalization() {
        assert_eq!(normalize_font_name("ArialMT"), "Arial");
        assert_eq!(normalize_font_name("Arial-BoldMT"), "Arial");
        assert_eq!(normalize_font_name("TimesNewRomanPSMT"), "Times New Roman");
        assert_eq!(normalize_font_name("Times-Bold"), "Times New Roman");
        assert_eq!(normalize_font_name("Helvetica-Oblique"), "Helvetica");
        assert_eq!(normalize_font_name("Calibri-Light"), "Calibri");
        assert_eq!(normalize_font_name("Verdana"), "Verdana");
        assert_eq!(normalize_font_name("CourierNewPSMT"), "Courier");
    }

    #[test]
    fn unknown_family_passes_through() {
        assert_eq!(normalize_font_name("Garamond-Premier"), "Garamond-Premier");
    }

    fn format(name: &str, size: f32) -> FormatInfo {
        FormatInfo::new(name, size, false, false, (0, 0, 0)).unwrap()
    }

    #[test]
    fn uniformity_tolerates_sub_tenth_size_noise() {
        let formats = vec![format("Arial", 12.0), format("Arial", 12.05)];
        assert!(check_uniformity(&formats));
        assert!(!check_uniformity(&[format("Arial", 12.0), format("Arial", 13.0)]));
    }

    #[test]
    fn uniformity_of_empty_list() {
        assert!(check_uniformity(&[]));
    }

    #[test]
    fn common_format_elects_the_majority() {
        let formats = vec![
            format("Arial", 12.0),
            format("Times New Roman", 10.0),
            format("Arial", 12.0),
        ];
        assert_eq!(common_format(&formats).unwrap().font_name, "Arial");
    }

    #[test]
    fn common_format_groups_across_size_noise() {
        // 12.0 and 12.05 satisfy tolerant equality and must count as one
        // group, outvoting the exact pair at 10.0.
        let formats = vec![
            format("Times New Roman", 10.0),
            format("Arial", 12.0),
            format("Times New Roman", 10.0),
            format("Arial", 12.05),
            format("Arial", 12.0),
        ];
        assert_eq!(common_format(&formats).unwrap().font_name, "Arial");
    }

    #[test]
    fn common_format_tie_goes_to_first_seen() {
        let formats = vec![format("Times New Roman", 10.0), format("Arial", 12.0)];
        assert_eq!(
            common_format(&formats).unwrap().font_name,
            "Times New Roman"
        );
        assert!(common_format(&[]).is_none());
    }

    use std::path::Path;
    use tablespan_backend::FLAG_BOLD;
    use tablespan_core::{Point, Rect, Result, Separator, TablespanError, TitleKind};

    struct SpanListDoc {
        spans: Vec<FormatSpan>,
    }

    /// Backend whose text search never hits, forcing resolution down to
    /// the whole-page span scan.
    struct SpanListBackend;

    impl DocumentBackend for SpanListBackend {
        type Document = SpanListDoc;

        fn open<P: AsRef<Path>>(&self, _path: P) -> Result<Self::Document> {
            Err(TablespanError::DocumentUnreadable("stub".to_string()))
        }

        fn page_count(&self, _doc: &Self::Document) -> usize {
            1
        }

        fn page_text(&self, _doc: &Self::Document, _page_index: usize) -> Result<String> {
            Ok(String::new())
        }

        fn search_text(
            &self,
            _doc: &Self::Document,
            _page_index: usize,
            _needle: &str,
        ) -> Vec<Rect> {
            Vec::new()
        }

        fn format_spans(
            &self,
            doc: &Self::Document,
            _page_index: usize,
            _clip: Option<Rect>,
        ) -> Vec<FormatSpan> {
            doc.spans.clone()
        }

        fn redact_region(
            &self,
            _doc: &mut Self::Document,
            _page_index: usize,
            _rect: Rect,
        ) -> Result<()> {
            Ok(())
        }

        #[allow(clippy::too_many_arguments)]
        fn insert_text(
            &self,
            _doc: &mut Self::Document,
            _page_index: usize,
            _at: Point,
            _text: &str,
            _font_name: &str,
            _font_size: f32,
            _color: (u8, u8, u8),
        ) -> Result<()> {
            Ok(())
        }

        fn save(&self, _doc: &mut Self::Document, _path: &Path) -> Result<()> {
            Ok(())
        }
    }

    fn span(text: &str, font_name: &str, flags: u32, rect: Rect) -> FormatSpan {
        FormatSpan {
            text: text.to_string(),
            font_name: font_name.to_string(),
            font_size: 12.0,
            flags,
            color: (0, 0, 0),
            rect,
        }
    }

    fn title(number: &str, description: &str) -> TitleOccurrence {
        TitleOccurrence::new(1, TitleKind::Tabla, number, description, Separator::Period, 0)
            .unwrap()
    }

    #[test]
    fn page_scan_joins_spans_sharing_a_baseline() {
        // The kind word and the number land in separate spans of the same
        // line; neither alone mentions both, the joined line does.
        let doc = SpanListDoc {
            spans: vec![
                span("encabezado", "ArialMT", 0, Rect::new(72.0, 750.0, 130.0, 762.0)),
                span(
                    "Tabla",
                    "Arial-BoldMT",
                    FLAG_BOLD,
                    Rect::new(72.0, 700.0, 102.0, 712.0),
                ),
                span("2. Resultados", "ArialMT", 0, Rect::new(106.0, 700.0, 185.0, 712.0)),
            ],
        };

        let format = FormatResolver::new(&SpanListBackend).resolve(&doc, &title("2", "Resultados"));
        assert_eq!(format.font_name, "Arial");
        assert!(format.is_bold);
    }

    #[test]
    fn page_scan_ignores_kind_word_on_a_numberless_line() {
        let doc = SpanListDoc {
            spans: vec![span(
                "Tabla de contenidos",
                "Arial-BoldMT",
                FLAG_BOLD,
                Rect::new(72.0, 700.0, 180.0, 712.0),
            )],
        };

        let format = FormatResolver::new(&SpanListBackend).resolve(&doc, &title("4", "Precios"));
        assert_eq!(format, FormatInfo::default_format());
    }
}
