//! lopdf-based document backend.
//!
//! Implements [`DocumentBackend`] on top of the [lopdf](https://crates.io/crates/lopdf)
//! crate. The read path interprets page content streams directly (text
//! showing operators, text positioning, fill color) to produce positioned
//! text runs; lines are reconstructed from run baselines. The resulting
//! rectangles are approximate — callers expand search hits by a margin
//! before clipping format spans, which absorbs the imprecision.
//!
//! The write path appends to the page content stream: redaction paints an
//! opaque white rectangle over the region, and insertion registers one of
//! the base-14 Type1 fonts on the page resources and emits a text block.
//! Fonts outside the base-14 set and glyphs outside the Latin-1 range fail
//! with `InsertionFailed`, which callers handle by retrying with the
//! default descriptor.

use crate::traits::{DocumentBackend, FormatSpan, FLAG_BOLD, FLAG_ITALIC};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Object, ObjectId, Stream};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use tablespan_core::{Point, Rect, Result, TablespanError};

/// Vertical tolerance (points) when clustering runs into lines.
const LINE_TOLERANCE: f32 = 2.0;

/// Fraction of the font size treated as a word gap when joining runs.
const WORD_GAP_FACTOR: f32 = 0.25;

/// Average glyph advance as a fraction of the font size. A crude stand-in
/// for real font metrics; good enough for search rectangles that get
/// expanded by a margin anyway.
const AVG_GLYPH_WIDTH: f32 = 0.5;

/// The PostScript names of the base-14 fonts the write path can use
/// without embedding.
const BASE14_FONTS: &[&str] = &[
    "Helvetica",
    "Helvetica-Bold",
    "Helvetica-Oblique",
    "Helvetica-BoldOblique",
    "Times-Roman",
    "Times-Bold",
    "Times-Italic",
    "Times-BoldItalic",
    "Courier",
    "Courier-Bold",
    "Courier-Oblique",
    "Courier-BoldOblique",
    "Symbol",
    "ZapfDingbats",
];

/// A parsed PDF document with cached page ids and lazily extracted text runs.
pub struct LopdfDocument {
    inner: lopdf::Document,
    page_ids: Vec<ObjectId>,
    run_cache: RefCell<HashMap<usize, Vec<TextRun>>>,
}

impl std::fmt::Debug for LopdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LopdfDocument")
            .field("page_count", &self.page_ids.len())
            .finish_non_exhaustive()
    }
}

/// One positioned text run from a content stream.
#[derive(Debug, Clone)]
struct TextRun {
    text: String,
    font_name: String,
    font_size: f32,
    color: (u8, u8, u8),
    /// Baseline start in user space.
    x: f32,
    y: f32,
    /// Estimated horizontal extent in user space.
    width: f32,
}

impl TextRun {
    fn rect(&self) -> Rect {
        Rect::new(
            self.x,
            self.y - 0.25 * self.font_size,
            self.x + self.width,
            self.y + 0.75 * self.font_size,
        )
    }
}

/// The lopdf-based backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfBackend;

impl LopdfBackend {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn runs_for_page(&self, doc: &LopdfDocument, page_index: usize) -> Vec<TextRun> {
        if let Some(runs) = doc.run_cache.borrow().get(&page_index) {
            return runs.clone();
        }
        let runs = match extract_runs(&doc.inner, doc.page_ids.get(page_index).copied()) {
            Ok(runs) => runs,
            Err(e) => {
                log::warn!("failed to interpret page {page_index}: {e}");
                Vec::new()
            }
        };
        doc.run_cache
            .borrow_mut()
            .insert(page_index, runs.clone());
        runs
    }
}

impl DocumentBackend for LopdfBackend {
    type Document = LopdfDocument;

    fn open<P: AsRef<Path>>(&self, path: P) -> Result<Self::Document> {
        let inner = lopdf::Document::load(path.as_ref())
            .map_err(|e| TablespanError::DocumentUnreadable(e.to_string()))?;
        let page_ids: Vec<ObjectId> = inner.get_pages().values().copied().collect();
        Ok(LopdfDocument {
            inner,
            page_ids,
            run_cache: RefCell::new(HashMap::new()),
        })
    }

    fn page_count(&self, doc: &Self::Document) -> usize {
        doc.page_ids.len()
    }

    fn page_text(&self, doc: &Self::Document, page_index: usize) -> Result<String> {
        if page_index >= doc.page_ids.len() {
            return Err(TablespanError::Backend(format!(
                "page index {page_index} out of range (0..{})",
                doc.page_ids.len()
            )));
        }
        let runs = self.runs_for_page(doc, page_index);
        let mut text = String::new();
        for line in assemble_lines(&runs) {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&line_string(&line));
        }
        Ok(text)
    }

    fn search_text(&self, doc: &Self::Document, page_index: usize, needle: &str) -> Vec<Rect> {
        if needle.is_empty() || page_index >= doc.page_ids.len() {
            return Vec::new();
        }
        let needle_chars: Vec<char> = needle.chars().map(|c| c.to_ascii_lowercase()).collect();
        let runs = self.runs_for_page(doc, page_index);
        let mut hits = Vec::new();
        for line in assemble_lines(&runs) {
            let cells = line_cells(&line);
            if cells.len() < needle_chars.len() {
                continue;
            }
            let lowered: Vec<char> = cells
                .iter()
                .map(|c| c.ch.to_ascii_lowercase())
                .collect();
            let mut start = 0;
            while start + needle_chars.len() <= lowered.len() {
                if lowered[start..start + needle_chars.len()] == needle_chars[..] {
                    let matched = &cells[start..start + needle_chars.len()];
                    let x0 = matched.first().map_or(0.0, |c| c.x0);
                    let x1 = matched.last().map_or(0.0, |c| c.x1);
                    let y0 = matched.iter().map(|c| c.y0).fold(f32::MAX, f32::min);
                    let y1 = matched.iter().map(|c| c.y1).fold(f32::MIN, f32::max);
                    hits.push(Rect::new(x0, y0, x1, y1));
                    start += needle_chars.len();
                } else {
                    start += 1;
                }
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
        if page_index >= doc.page_ids.len() {
            return Vec::new();
        }
        let runs = self.runs_for_page(doc, page_index);
        let mut spans = Vec::new();
        for line in assemble_lines(&runs) {
            for run in line {
                let rect = run.rect();
                if let Some(clip) = clip {
                    if !rect.intersects(&clip) {
                        continue;
                    }
                }
                spans.push(FormatSpan {
                    text: run.text.clone(),
                    font_name: run.font_name.clone(),
                    font_size: run.font_size,
                    flags: style_flags(&run.font_name),
                    color: run.color,
                    rect,
                });
            }
        }
        spans
    }

    fn redact_region(&self, doc: &mut Self::Document, page_index: usize, rect: Rect) -> Result<()> {
        let page_id = page_id_for(doc, page_index)?;
        let ops = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "rg",
                vec![Object::Real(1.0), Object::Real(1.0), Object::Real(1.0)],
            ),
            Operation::new(
                "re",
                vec![
                    Object::Real(rect.x0),
                    Object::Real(rect.y0),
                    Object::Real(rect.width()),
                    Object::Real(rect.height()),
                ],
            ),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ];
        append_content(&mut doc.inner, page_id, ops)?;
        doc.run_cache.borrow_mut().remove(&page_index);
        Ok(())
    }

    fn insert_text(
        &self,
        doc: &mut Self::Document,
        page_index: usize,
        at: Point,
        text: &str,
        font_name: &str,
        font_size: f32,
        color: (u8, u8, u8),
    ) -> Result<()> {
        let page_id = page_id_for(doc, page_index)?;
        let base_font = base14_name(font_name).ok_or_else(|| {
            TablespanError::InsertionFailed(format!("font {font_name:?} is not a base-14 font"))
        })?;
        let bytes = encode_latin1(text)?;
        let resource_key = ensure_font_resource(&mut doc.inner, page_id, base_font)?;

        let ops = vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(resource_key.into_bytes()),
                    Object::Real(font_size),
                ],
            ),
            Operation::new(
                "rg",
                vec![
                    Object::Real(f32::from(color.0) / 255.0),
                    Object::Real(f32::from(color.1) / 255.0),
                    Object::Real(f32::from(color.2) / 255.0),
                ],
            ),
            Operation::new("Td", vec![Object::Real(at.x), Object::Real(at.y)]),
            Operation::new(
                "Tj",
                vec![Object::String(bytes, lopdf::StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ];
        append_content(&mut doc.inner, page_id, ops)?;
        doc.run_cache.borrow_mut().remove(&page_index);
        Ok(())
    }

    fn save(&self, doc: &mut Self::Document, path: &Path) -> Result<()> {
        doc.inner
            .save(path)
            .map_err(|e| TablespanError::Backend(format!("failed to save document: {e}")))?;
        Ok(())
    }
}

fn page_id_for(doc: &LopdfDocument, page_index: usize) -> Result<ObjectId> {
    doc.page_ids.get(page_index).copied().ok_or_else(|| {
        TablespanError::Backend(format!(
            "page index {page_index} out of range (0..{})",
            doc.page_ids.len()
        ))
    })
}

// ---------------------------------------------------------------------------
// Content stream interpretation (read path)
// ---------------------------------------------------------------------------

/// Text + graphics state tracked while walking a content stream. Only the
/// parts that matter for positioned runs: the text/line matrices, current
/// font, leading and fill color.
struct InterpState {
    /// Text matrix [a b c d e f].
    tm: [f32; 6],
    /// Line matrix.
    lm: [f32; 6],
    font_name: String,
    font_size: f32,
    leading: f32,
    fill_color: (u8, u8, u8),
    color_stack: Vec<(u8, u8, u8)>,
}

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

impl InterpState {
    fn new() -> Self {
        Self {
            tm: IDENTITY,
            lm: IDENTITY,
            font_name: String::new(),
            font_size: 0.0,
            leading: 0.0,
            fill_color: (0, 0, 0),
            color_stack: Vec::new(),
        }
    }

    /// Prepend a translation to the line matrix and reset the text matrix
    /// (the `Td` operator).
    fn translate_line(&mut self, tx: f32, ty: f32) {
        self.lm[4] = tx * self.lm[0] + ty * self.lm[2] + self.lm[4];
        self.lm[5] = tx * self.lm[1] + ty * self.lm[3] + self.lm[5];
        self.tm = self.lm;
    }

    fn effective_font_size(&self) -> f32 {
        let scale = self.tm[3].abs();
        if scale > 0.0 {
            self.font_size * scale
        } else {
            self.font_size
        }
    }
}

fn operand_f32(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f),
        _ => None,
    }
}

/// Decode a PDF string object's bytes as text. UTF-16BE (BOM-prefixed)
/// strings are decoded as such; everything else is treated as Latin-1,
/// which covers the simple-font documents this tool targets.
fn decode_text_bytes(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks(2)
            .filter(|c| c.len() == 2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

/// Strip a subset prefix like `ABCDEF+` from a reported font name.
fn strip_subset_prefix(name: &str) -> &str {
    if name.len() > 7 && name.as_bytes()[6] == b'+' {
        let prefix = &name[..6];
        if prefix.bytes().all(|b| b.is_ascii_uppercase()) {
            return &name[7..];
        }
    }
    name
}

/// Derive style flag bits from font name tokens (PyMuPDF-compatible bits:
/// bold = bit 4, italic = bit 0).
fn style_flags(font_name: &str) -> u32 {
    let lower = font_name.to_ascii_lowercase();
    let mut flags = 0;
    if lower.contains("bold") || lower.contains("black") || lower.contains("heavy") {
        flags |= FLAG_BOLD;
    }
    if lower.contains("italic") || lower.contains("oblique") {
        flags |= FLAG_ITALIC;
    }
    flags
}

/// Map the page /Font resources to resource-key → base-font-name.
fn font_map(doc: &lopdf::Document, page_id: ObjectId) -> HashMap<Vec<u8>, String> {
    let mut map = HashMap::new();
    let Some(resources) = resolved_resources(doc, page_id) else {
        return map;
    };
    let fonts = match resources.get(b"Font") {
        Ok(Object::Dictionary(d)) => d.clone(),
        Ok(Object::Reference(id)) => match doc.get_object(*id).and_then(Object::as_dict) {
            Ok(d) => d.clone(),
            Err(_) => return map,
        },
        _ => return map,
    };
    for (key, value) in fonts.iter() {
        let font_dict = match value {
            Object::Dictionary(d) => d.clone(),
            Object::Reference(id) => match doc.get_object(*id).and_then(Object::as_dict) {
                Ok(d) => d.clone(),
                Err(_) => continue,
            },
            _ => continue,
        };
        if let Ok(Object::Name(base)) = font_dict.get(b"BaseFont") {
            let name = String::from_utf8_lossy(base).into_owned();
            map.insert(key.clone(), strip_subset_prefix(&name).to_string());
        }
    }
    map
}

/// Look up a key in the page dictionary, walking up the page tree via
/// /Parent if the key is not found on the page itself.
fn resolve_inherited<'a>(
    doc: &'a lopdf::Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current_id = page_id;
    for _ in 0..64 {
        let dict = doc.get_object(current_id).and_then(Object::as_dict).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        match dict.get(b"Parent") {
            Ok(parent) => current_id = parent.as_reference().ok()?,
            Err(_) => return None,
        }
    }
    None
}

fn resolved_resources(doc: &lopdf::Document, page_id: ObjectId) -> Option<Dictionary> {
    let obj = resolve_inherited(doc, page_id, b"Resources")?;
    match obj {
        Object::Reference(id) => doc
            .get_object(*id)
            .and_then(Object::as_dict)
            .ok()
            .cloned(),
        Object::Dictionary(d) => Some(d.clone()),
        _ => None,
    }
}

/// Collect the page's content stream bytes, handling both a single stream
/// and an array of streams, decompressing where needed.
fn content_bytes(doc: &lopdf::Document, page_id: ObjectId) -> Result<Vec<u8>> {
    let page_dict = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| TablespanError::Backend(format!("failed to get page dictionary: {e}")))?;

    let contents = match page_dict.get(b"Contents") {
        Ok(obj) => obj,
        Err(_) => return Ok(Vec::new()),
    };

    let stream_bytes = |id: ObjectId| -> Result<Vec<u8>> {
        let stream = doc
            .get_object(id)
            .and_then(Object::as_stream)
            .map_err(|e| TablespanError::Backend(format!("/Contents is not a stream: {e}")))?;
        decode_stream(stream)
    };

    match contents {
        Object::Reference(id) => stream_bytes(*id),
        Object::Array(items) => {
            let mut merged = Vec::new();
            for item in items {
                let id = item.as_reference().map_err(|e| {
                    TablespanError::Backend(format!("/Contents array item is not a reference: {e}"))
                })?;
                let bytes = stream_bytes(id)?;
                if !merged.is_empty() {
                    merged.push(b' ');
                }
                merged.extend_from_slice(&bytes);
            }
            Ok(merged)
        }
        Object::Stream(stream) => decode_stream(stream),
        _ => Err(TablespanError::Backend(
            "/Contents is not a reference, array or stream".to_string(),
        )),
    }
}

fn decode_stream(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.get(b"Filter").is_ok() {
        stream
            .decompressed_content()
            .map_err(|e| TablespanError::Backend(format!("failed to decompress stream: {e}")))
    } else {
        Ok(stream.content.clone())
    }
}

/// Interpret one page's content stream into positioned text runs.
fn extract_runs(doc: &lopdf::Document, page_id: Option<ObjectId>) -> Result<Vec<TextRun>> {
    let Some(page_id) = page_id else {
        return Ok(Vec::new());
    };
    let bytes = content_bytes(doc, page_id)?;
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    let content = Content::decode(&bytes)
        .map_err(|e| TablespanError::Backend(format!("failed to decode content stream: {e}")))?;
    let fonts = font_map(doc, page_id);

    let mut state = InterpState::new();
    let mut runs = Vec::new();

    for op in &content.operations {
        let operands = &op.operands;
        match op.operator.as_str() {
            "BT" => {
                state.tm = IDENTITY;
                state.lm = IDENTITY;
            }
            "ET" => {}
            "Tf" => {
                if let (Some(Object::Name(name)), Some(size)) =
                    (operands.first(), operands.get(1).and_then(operand_f32))
                {
                    state.font_name = fonts
                        .get(name.as_slice())
                        .cloned()
                        .unwrap_or_else(|| String::from_utf8_lossy(name).into_owned());
                    state.font_size = size;
                }
            }
            "TL" => {
                if let Some(l) = operands.first().and_then(operand_f32) {
                    state.leading = l;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (
                    operands.first().and_then(operand_f32),
                    operands.get(1).and_then(operand_f32),
                ) {
                    state.translate_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (
                    operands.first().and_then(operand_f32),
                    operands.get(1).and_then(operand_f32),
                ) {
                    state.leading = -ty;
                    state.translate_line(tx, ty);
                }
            }
            "Tm" => {
                let values: Vec<f32> = operands.iter().filter_map(operand_f32).collect();
                if values.len() == 6 {
                    state.tm = [values[0], values[1], values[2], values[3], values[4], values[5]];
                    state.lm = state.tm;
                }
            }
            "T*" => {
                let leading = state.leading;
                state.translate_line(0.0, -leading);
            }
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    show_text(&mut state, bytes, &mut runs);
                }
            }
            "'" => {
                let leading = state.leading;
                state.translate_line(0.0, -leading);
                if let Some(Object::String(bytes, _)) = operands.first() {
                    show_text(&mut state, bytes, &mut runs);
                }
            }
            "\"" => {
                let leading = state.leading;
                state.translate_line(0.0, -leading);
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    show_text(&mut state, bytes, &mut runs);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => show_text(&mut state, bytes, &mut runs),
                            Object::Integer(_) | Object::Real(_) => {
                                if let Some(adj) = operand_f32(item) {
                                    // Kerning adjustment, thousandths of text space.
                                    state.tm[4] -=
                                        adj / 1000.0 * state.font_size * state.tm[0];
                                }
                            }
                            _ => {}
                        }
                    }
                }
            }
            "rg" => {
                let values: Vec<f32> = operands.iter().filter_map(operand_f32).collect();
                if values.len() == 3 {
                    state.fill_color = (
                        (values[0].clamp(0.0, 1.0) * 255.0).round() as u8,
                        (values[1].clamp(0.0, 1.0) * 255.0).round() as u8,
                        (values[2].clamp(0.0, 1.0) * 255.0).round() as u8,
                    );
                }
            }
            "g" => {
                if let Some(gray) = operands.first().and_then(operand_f32) {
                    let v = (gray.clamp(0.0, 1.0) * 255.0).round() as u8;
                    state.fill_color = (v, v, v);
                }
            }
            "k" => {
                let values: Vec<f32> = operands.iter().filter_map(operand_f32).collect();
                if values.len() == 4 {
                    let to_channel =
                        |c: f32| ((1.0 - (c + values[3]).min(1.0)).clamp(0.0, 1.0) * 255.0) as u8;
                    state.fill_color =
                        (to_channel(values[0]), to_channel(values[1]), to_channel(values[2]));
                }
            }
            "q" => {
                let color = state.fill_color;
                state.color_stack.push(color);
            }
            "Q" => {
                if let Some(color) = state.color_stack.pop() {
                    state.fill_color = color;
                }
            }
            _ => {}
        }
    }

    Ok(runs)
}

fn show_text(state: &mut InterpState, bytes: &[u8], runs: &mut Vec<TextRun>) {
    let text = decode_text_bytes(bytes);
    if text.is_empty() {
        return;
    }
    if state.font_size <= 0.0 {
        log::debug!("text shown with no font set, skipping run");
        return;
    }
    let advance_text_space = AVG_GLYPH_WIDTH * state.font_size * text.chars().count() as f32;
    let width = advance_text_space * state.tm[0].abs().max(f32::MIN_POSITIVE);
    runs.push(TextRun {
        text,
        font_name: state.font_name.clone(),
        font_size: state.effective_font_size(),
        color: state.fill_color,
        x: state.tm[4],
        y: state.tm[5],
        width,
    });
    state.tm[4] += advance_text_space * state.tm[0];
}

// ---------------------------------------------------------------------------
// Line reconstruction
// ---------------------------------------------------------------------------

/// Cluster runs into lines by baseline proximity; top-to-bottom, and
/// left-to-right within a line.
fn assemble_lines(runs: &[TextRun]) -> Vec<Vec<&TextRun>> {
    let mut ordered: Vec<&TextRun> = runs.iter().collect();
    ordered.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut lines: Vec<Vec<&TextRun>> = Vec::new();
    for run in ordered {
        match lines.last_mut() {
            Some(line) if (line[0].y - run.y).abs() <= LINE_TOLERANCE => line.push(run),
            _ => lines.push(vec![run]),
        }
    }
    for line in &mut lines {
        line.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
    }
    lines
}

/// A single positioned character within a reconstructed line.
struct CharCell {
    ch: char,
    x0: f32,
    x1: f32,
    y0: f32,
    y1: f32,
}

/// Flatten a line into positioned characters, inserting a synthetic space
/// where the gap between adjacent runs looks like a word break.
fn line_cells(line: &[&TextRun]) -> Vec<CharCell> {
    let mut cells = Vec::new();
    let mut prev_end: Option<f32> = None;
    for run in line {
        let rect = run.rect();
        let count = run.text.chars().count().max(1);
        let char_width = run.width / count as f32;
        if let Some(end) = prev_end {
            let gap = run.x - end;
            if gap > WORD_GAP_FACTOR * run.font_size {
                cells.push(CharCell {
                    ch: ' ',
                    x0: end,
                    x1: run.x,
                    y0: rect.y0,
                    y1: rect.y1,
                });
            }
        }
        for (i, ch) in run.text.chars().enumerate() {
            let x0 = run.x + char_width * i as f32;
            cells.push(CharCell {
                ch,
                x0,
                x1: x0 + char_width,
                y0: rect.y0,
                y1: rect.y1,
            });
        }
        prev_end = Some(run.x + run.width);
    }
    cells
}

fn line_string(line: &[&TextRun]) -> String {
    line_cells(line).iter().map(|c| c.ch).collect()
}

// ---------------------------------------------------------------------------
// Write path
// ---------------------------------------------------------------------------

/// Resolve a requested font family (plus optional bold/italic already folded
/// into the name) to a base-14 PostScript name, or `None` when unsupported.
fn base14_name(font_name: &str) -> Option<&'static str> {
    BASE14_FONTS
        .iter()
        .find(|candidate| candidate.eq_ignore_ascii_case(font_name))
        .copied()
}

fn encode_latin1(text: &str) -> Result<Vec<u8>> {
    text.chars()
        .map(|c| {
            let code = c as u32;
            if code <= 0xFF {
                Ok(code as u8)
            } else {
                Err(TablespanError::InsertionFailed(format!(
                    "glyph {c:?} cannot be encoded in Latin-1"
                )))
            }
        })
        .collect()
}

/// Ensure the page resources carry a Type1 entry for `base_font`, returning
/// the resource key to reference from content. Idempotent: an existing
/// entry with a matching /BaseFont is reused.
fn ensure_font_resource(
    doc: &mut lopdf::Document,
    page_id: ObjectId,
    base_font: &str,
) -> Result<String> {
    let mut resources = resolved_resources(doc, page_id).unwrap_or_default();
    let mut fonts = match resources.get(b"Font") {
        Ok(Object::Dictionary(d)) => d.clone(),
        Ok(Object::Reference(id)) => doc
            .get_object(*id)
            .and_then(Object::as_dict)
            .map(Clone::clone)
            .unwrap_or_default(),
        _ => Dictionary::new(),
    };

    for (key, value) in fonts.iter() {
        let font_dict = match value {
            Object::Dictionary(d) => Some(d.clone()),
            Object::Reference(id) => doc
                .get_object(*id)
                .and_then(Object::as_dict)
                .ok()
                .cloned(),
            _ => None,
        };
        if let Some(dict) = font_dict {
            if let Ok(Object::Name(base)) = dict.get(b"BaseFont") {
                if base.as_slice() == base_font.as_bytes() {
                    return Ok(String::from_utf8_lossy(key).into_owned());
                }
            }
        }
    }

    let key = format!("TS{}", base_font.replace('-', ""));
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
    });
    fonts.set(key.as_bytes(), Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));

    // Write the updated resources onto the page itself. If they were
    // inherited, the page now shadows its ancestor with a full copy.
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| TablespanError::Backend(format!("failed to update page resources: {e}")))?
        .set("Resources", Object::Dictionary(resources));

    Ok(key)
}

/// Append operations to a page's content by replacing /Contents with a
/// single merged stream.
fn append_content(
    doc: &mut lopdf::Document,
    page_id: ObjectId,
    ops: Vec<Operation>,
) -> Result<()> {
    let mut merged = content_bytes(doc, page_id)?;
    let extra = Content { operations: ops }
        .encode()
        .map_err(|e| TablespanError::Backend(format!("failed to encode content: {e}")))?;
    if !merged.is_empty() {
        merged.push(b'\n');
    }
    merged.extend_from_slice(&extra);

    let stream_id = doc.add_object(Object::Stream(Stream::new(Dictionary::new(), merged)));
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| TablespanError::Backend(format!("failed to update page contents: {e}")))?
        .set("Contents", Object::Reference(stream_id));
    Ok(())
}
