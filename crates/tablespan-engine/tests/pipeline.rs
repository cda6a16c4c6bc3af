//! Pipeline tests over an in-memory backend.

use std::cell::RefCell;
use std::path::Path;
use tablespan_backend::{DocumentBackend, FormatSpan, FLAG_BOLD};
use tablespan_core::{FormatInfo, Modification, Point, Rect, Result, TablespanError};
use tablespan_engine::{
    FormatResolver, ModificationPlanner, NullProgress, PdfModifier, TitleExtractor,
};

const CHAR_WIDTH: f32 = 6.0;
const LINE_HEIGHT: f32 = 30.0;

#[derive(Clone)]
struct MockLine {
    text: String,
    font_name: String,
    font_size: f32,
    flags: u32,
}

struct MockPage {
    lines: Vec<MockLine>,
}

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Redact { page: usize },
    Insert { page: usize, text: String, font: String },
}

struct MockDocument {
    pages: Vec<MockPage>,
    events: RefCell<Vec<Event>>,
}

impl MockDocument {
    fn new(pages: Vec<Vec<MockLine>>) -> Self {
        Self {
            pages: pages.into_iter().map(|lines| MockPage { lines }).collect(),
            events: RefCell::new(Vec::new()),
        }
    }
}

fn line(text: &str, font_name: &str, font_size: f32, flags: u32) -> MockLine {
    MockLine {
        text: text.to_string(),
        font_name: font_name.to_string(),
        font_size,
        flags,
    }
}

fn line_rect(line_index: usize, char_start: usize, char_len: usize) -> Rect {
    let y = 700.0 - LINE_HEIGHT * line_index as f32;
    let x0 = 72.0 + CHAR_WIDTH * char_start as f32;
    Rect::new(x0, y - 5.0, x0 + CHAR_WIDTH * char_len as f32, y + 10.0)
}

struct MockBackend {
    insertable_fonts: Vec<&'static str>,
}

impl MockBackend {
    fn new() -> Self {
        Self {
            insertable_fonts: vec![
                "Helvetica",
                "Helvetica-Bold",
                "Helvetica-Oblique",
                "Helvetica-BoldOblique",
                "Times-Roman",
                "Times-Bold",
                "Times-Italic",
                "Times-BoldItalic",
                "Courier",
            ],
        }
    }

    fn with_insertable_fonts(fonts: Vec<&'static str>) -> Self {
        Self {
            insertable_fonts: fonts,
        }
    }
}

impl DocumentBackend for MockBackend {
    type Document = MockDocument;

    fn open<P: AsRef<Path>>(&self, _path: P) -> Result<Self::Document> {
        Err(TablespanError::DocumentUnreadable(
            "mock backend has no filesystem".to_string(),
        ))
    }

    fn page_count(&self, doc: &Self::Document) -> usize {
        doc.pages.len()
    }

    fn page_text(&self, doc: &Self::Document, page_index: usize) -> Result<String> {
        let page = &doc.pages[page_index];
        Ok(page
            .lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn search_text(&self, doc: &Self::Document, page_index: usize, needle: &str) -> Vec<Rect> {
        let needle = needle.to_lowercase();
        let mut hits = Vec::new();
        for (i, l) in doc.pages[page_index].lines.iter().enumerate() {
            if let Some(pos) = l.text.to_lowercase().find(&needle) {
                hits.push(line_rect(i, pos, needle.chars().count()));
            }
        }
        hits
    }

    fn format_spans(
        &self,
        doc: &Self::Document,
        page_index: usize,
        clip: Option<Rect>,
    ) -> Vec<FormatSpan> {
        doc.pages[page_index]
            .lines
            .iter()
            .enumerate()
            .map(|(i, l)| FormatSpan {
                text: l.text.clone(),
                font_name: l.font_name.clone(),
                font_size: l.font_size,
                flags: l.flags,
                color: (0, 0, 0),
                rect: line_rect(i, 0, l.text.chars().count()),
            })
            .filter(|s| clip.map_or(true, |c| s.rect.intersects(&c)))
            .collect()
    }

    fn redact_region(&self, doc: &mut Self::Document, page_index: usize, _rect: Rect) -> Result<()> {
        doc.events.borrow_mut().push(Event::Redact { page: page_index });
        Ok(())
    }

    fn insert_text(
        &self,
        doc: &mut Self::Document,
        page_index: usize,
        _at: Point,
        text: &str,
        font_name: &str,
        _font_size: f32,
        _color: (u8, u8, u8),
    ) -> Result<()> {
        if !self.insertable_fonts.contains(&font_name) {
            return Err(TablespanError::InsertionFailed(format!(
                "font {font_name:?} unavailable"
            )));
        }
        doc.events.borrow_mut().push(Event::Insert {
            page: page_index,
            text: text.to_string(),
            font: font_name.to_string(),
        });
        Ok(())
    }

    fn save(&self, _doc: &mut Self::Document, _path: &Path) -> Result<()> {
        Ok(())
    }
}

fn analyze(backend: &MockBackend, doc: &MockDocument) -> tablespan_core::AnalysisResult {
    let titles = TitleExtractor::new().extract(backend, doc, &NullProgress);
    ModificationPlanner::new(backend).plan(doc, titles).unwrap()
}

#[test]
fn consecutive_repetitions_get_position_suffixes() {
    let backend = MockBackend::new();
    let doc = MockDocument::new(vec![
        vec![
            line("Tabla 2. Resultados", "Arial-BoldMT", 12.0, FLAG_BOLD),
            line("fila de datos", "ArialMT", 10.0, 0),
        ],
        vec![line("Tabla 2. Resultados", "Arial-BoldMT", 12.0, FLAG_BOLD)],
        vec![line("texto sin titulos", "ArialMT", 10.0, 0)],
    ]);

    let result = analyze(&backend, &doc);
    assert_eq!(result.total_titles(), 2);
    assert_eq!(result.titles_to_modify(), 2);

    let rewritten: Vec<&str> = result
        .modifications
        .iter()
        .map(|m| m.modified_title.as_str())
        .collect();
    assert_eq!(
        rewritten,
        vec!["Tabla 2. Resultados (1/2)", "Tabla 2. Resultados (2/2)"]
    );

    let format = result.format_info.as_ref().unwrap();
    assert_eq!(format.font_name, "Arial");
    assert!(format.is_bold);
    assert!((format.font_size - 12.0).abs() < 0.01);
    assert!(result.format_uniform);
}

#[test]
fn three_page_run_counts_all_positions() {
    let title_line = vec![line("Cuadro 1. Poblacion por region", "ArialMT", 11.0, 0)];
    let doc = MockDocument::new(vec![title_line.clone(), title_line.clone(), title_line]);
    let backend = MockBackend::new();

    let result = analyze(&backend, &doc);
    let rewritten: Vec<&str> = result
        .modifications
        .iter()
        .map(|m| m.modified_title.as_str())
        .collect();
    assert_eq!(
        rewritten,
        vec![
            "Cuadro 1. Poblacion por region (1/3)",
            "Cuadro 1. Poblacion por region (2/3)",
            "Cuadro 1. Poblacion por region (3/3)",
        ]
    );
}

#[test]
fn format_resolution_falls_back_to_prefix_search() {
    // The page renders "Tabla 3.Resultados" without a space after the
    // period, so neither the canonical string nor its period-stripped
    // variant is found; the "Tabla 3" prefix still is.
    let backend = MockBackend::new();
    let doc = MockDocument::new(vec![vec![line(
        "Tabla 3.Resultados anuales",
        "Times-Bold",
        10.0,
        FLAG_BOLD,
    )]]);

    let titles = TitleExtractor::new().extract(&backend, &doc, &NullProgress);
    assert_eq!(titles[0].full_title, "Tabla 3. Resultados anuales");

    let format = FormatResolver::new(&backend).resolve(&doc, &titles[0]);
    assert_eq!(format.font_name, "Times New Roman");
    assert!((format.font_size - 10.0).abs() < 0.01);
    assert!(format.is_bold);
}

#[test]
fn format_resolution_falls_back_to_page_scan() {
    // Extra spacing defeats every search variant, including the prefix;
    // the whole-page span scan still identifies the title's span.
    let backend = MockBackend::new();
    let doc = MockDocument::new(vec![vec![
        line("encabezado", "ArialMT", 9.0, 0),
        line("Tabla   3.   Resultados", "Arial-BoldMT", 12.0, FLAG_BOLD),
    ]]);

    let title = tablespan_core::TitleOccurrence::new(
        1,
        tablespan_core::TitleKind::Tabla,
        "3",
        "Resultados",
        tablespan_core::Separator::Period,
        0,
    )
    .unwrap();

    let format = FormatResolver::new(&backend).resolve(&doc, &title);
    assert_eq!(format.font_name, "Arial");
    assert!(format.is_bold);
}

#[test]
fn page_gap_leaves_the_straggler_unmodified() {
    // "Cuadro 1" on pages 2, 3 and 5: the pair gets suffixes, page 5 does not.
    let empty = Vec::new();
    let title_line = vec![line("Cuadro 1. Gastos corrientes", "ArialMT", 11.0, 0)];
    let doc = MockDocument::new(vec![
        empty.clone(),
        title_line.clone(),
        title_line.clone(),
        empty,
        title_line,
    ]);
    let backend = MockBackend::new();

    let result = analyze(&backend, &doc);
    assert_eq!(result.total_titles(), 3);
    assert_eq!(result.titles_to_modify(), 2);

    let unmodified = &result.modifications[2];
    assert_eq!(unmodified.page, 5);
    assert!(!unmodified.needs_modification());
    assert_eq!(unmodified.modified_title, unmodified.original_title);
}

#[test]
fn singleton_titles_still_resolve_their_format() {
    let backend = MockBackend::new();
    let doc = MockDocument::new(vec![vec![line(
        "Tabla 7. Balance consolidado",
        "Times-Bold",
        10.0,
        FLAG_BOLD,
    )]]);

    let result = analyze(&backend, &doc);
    assert_eq!(result.titles_to_modify(), 0);

    let only = &result.modifications[0];
    assert!(!only.needs_modification());
    let format = only.format_info.as_ref().unwrap();
    assert_eq!(format.font_name, "Times New Roman");
    assert!(format.is_bold);
    assert!((format.font_size - 10.0).abs() < 0.01);
}

#[test]
fn uniformity_verdict_comes_from_a_bounded_sample() {
    // 1001 distinct singleton titles; only the last page deviates. The
    // document-level verdict is sampled from the leading occurrences, so
    // the outlier goes unseen there while its own decision still carries
    // the real format.
    let pages: Vec<Vec<MockLine>> = (1..=1001)
        .map(|i| {
            let font = if i == 1001 { "TimesNewRomanPSMT" } else { "ArialMT" };
            vec![line(&format!("Tabla {i}. Dato {i}"), font, 10.0, 0)]
        })
        .collect();
    let doc = MockDocument::new(pages);
    let backend = MockBackend::new();

    let result = analyze(&backend, &doc);
    assert_eq!(result.total_titles(), 1001);
    assert_eq!(result.titles_to_modify(), 0);
    assert!(result.format_uniform);
    assert_eq!(result.format_info.as_ref().unwrap().font_name, "Arial");

    let outlier = result.modifications.last().unwrap();
    assert_eq!(
        outlier.format_info.as_ref().unwrap().font_name,
        "Times New Roman"
    );
}

#[test]
fn mixed_formats_break_uniformity() {
    let doc = MockDocument::new(vec![
        vec![line("Tabla 1. Ingresos", "Arial-BoldMT", 12.0, FLAG_BOLD)],
        vec![],
        vec![line("Tabla 2. Egresos", "TimesNewRomanPSMT", 10.0, 0)],
    ]);
    let backend = MockBackend::new();

    let result = analyze(&backend, &doc);
    assert!(!result.format_uniform);
}

#[test]
fn modifier_redacts_and_reinserts_each_repetition() {
    let backend = MockBackend::new();
    let mut doc = MockDocument::new(vec![
        vec![line("Tabla 2. Resultados", "Arial-BoldMT", 12.0, FLAG_BOLD)],
        vec![line("Tabla 2. Resultados", "Arial-BoldMT", 12.0, FLAG_BOLD)],
    ]);

    let result = analyze(&backend, &doc);
    let outcome = PdfModifier::new(&backend)
        .apply(&mut doc, &result.modifications, None, &NullProgress)
        .unwrap();

    assert_eq!(outcome.modified, 2);
    assert_eq!(outcome.failed, 0);

    let events = doc.events.borrow();
    assert!(events.contains(&Event::Redact { page: 0 }));
    assert!(events.contains(&Event::Redact { page: 1 }));
    // Arial bold maps onto the metric-compatible base-14 Helvetica-Bold.
    assert!(events.contains(&Event::Insert {
        page: 0,
        text: "Tabla 2. Resultados (1/2)".to_string(),
        font: "Helvetica-Bold".to_string(),
    }));
    assert!(events.contains(&Event::Insert {
        page: 1,
        text: "Tabla 2. Resultados (2/2)".to_string(),
        font: "Helvetica-Bold".to_string(),
    }));
}

#[test]
fn family_without_base14_counterpart_falls_back_to_default() {
    let backend = MockBackend::new();
    let mut doc = MockDocument::new(vec![
        vec![line("Tabla 1. Consumo", "Calibri", 11.0, 0)],
        vec![line("Tabla 1. Consumo", "Calibri", 11.0, 0)],
    ]);

    let result = analyze(&backend, &doc);
    assert_eq!(result.format_info.as_ref().unwrap().font_name, "Calibri");

    let outcome = PdfModifier::new(&backend)
        .apply(&mut doc, &result.modifications, None, &NullProgress)
        .unwrap();
    assert_eq!(outcome.modified, 2);

    let events = doc.events.borrow();
    let fonts: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            Event::Insert { font, .. } => Some(font.as_str()),
            Event::Redact { .. } => None,
        })
        .collect();
    assert_eq!(fonts, vec!["Helvetica", "Helvetica"]);
}

#[test]
fn insertion_failure_retries_with_default_font() {
    // The styled variant is unavailable; the rewrite retries with the
    // default font instead of failing.
    let backend = MockBackend::with_insertable_fonts(vec!["Helvetica"]);
    let mut doc = MockDocument::new(vec![
        vec![line("Tabla 1. Consumo", "Arial-BoldMT", 11.0, FLAG_BOLD)],
        vec![line("Tabla 1. Consumo", "Arial-BoldMT", 11.0, FLAG_BOLD)],
    ]);

    let result = analyze(&backend, &doc);
    let outcome = PdfModifier::new(&backend)
        .apply(&mut doc, &result.modifications, None, &NullProgress)
        .unwrap();

    assert_eq!(outcome.modified, 2);
    assert_eq!(outcome.failed, 0);
    let events = doc.events.borrow();
    assert!(events.iter().all(|e| match e {
        Event::Insert { font, .. } => font == "Helvetica",
        Event::Redact { .. } => true,
    }));
}

#[test]
fn format_override_wins_over_resolved_formats() {
    let backend = MockBackend::new();
    let mut doc = MockDocument::new(vec![
        vec![line("Tabla 1. Consumo", "Arial-BoldMT", 11.0, FLAG_BOLD)],
        vec![line("Tabla 1. Consumo", "Arial-BoldMT", 11.0, FLAG_BOLD)],
    ]);

    let result = analyze(&backend, &doc);
    let override_format =
        FormatInfo::new("Times New Roman", 9.0, false, true, (0, 0, 0)).unwrap();
    PdfModifier::new(&backend)
        .apply(
            &mut doc,
            &result.modifications,
            Some(&override_format),
            &NullProgress,
        )
        .unwrap();

    let events = doc.events.borrow();
    assert!(events.iter().any(|e| matches!(
        e,
        Event::Insert { font, .. } if font == "Times-Italic"
    )));
}

#[test]
fn space_separated_title_is_located_via_its_head() {
    // The page renders extra spacing inside a period-less title, so the
    // exact string is never found; the "Tabla 2" head still is, and the
    // widened hit is verified against the line's collapsed text.
    let backend = MockBackend::new();
    let mut doc = MockDocument::new(vec![vec![line(
        "Tabla 2 Datos   mensuales",
        "ArialMT",
        11.0,
        0,
    )]]);

    let modification = Modification::new(
        1,
        "Tabla 2 Datos mensuales",
        "Tabla 2 Datos mensuales (1/2)",
        Some(1),
        2,
        None,
    )
    .unwrap();
    let outcome = PdfModifier::new(&backend)
        .apply(&mut doc, &[modification], None, &NullProgress)
        .unwrap();

    assert_eq!(outcome.modified, 1);
    assert_eq!(outcome.failed, 0);
    assert!(doc.events.borrow().iter().any(|e| matches!(
        e,
        Event::Insert { text, .. } if text == "Tabla 2 Datos mensuales (1/2)"
    )));
}

#[test]
fn unlocatable_title_counts_as_failed() {
    let backend = MockBackend::new();
    let mut doc = MockDocument::new(vec![vec![line("otra cosa", "ArialMT", 10.0, 0)]]);

    let phantom = Modification::new(
        1,
        "Tabla 9. Inexistente",
        "Tabla 9. Inexistente (1/2)",
        Some(1),
        2,
        None,
    )
    .unwrap();
    let outcome = PdfModifier::new(&backend)
        .apply(&mut doc, &[phantom], None, &NullProgress)
        .unwrap();

    assert_eq!(outcome.modified, 0);
    assert_eq!(outcome.failed, 1);
    assert!(doc.events.borrow().is_empty());
}
