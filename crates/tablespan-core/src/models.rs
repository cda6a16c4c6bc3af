//! Data model for table title analysis and modification.
//!
//! All types here are value-like: they are produced once by the analysis
//! pipeline and read-only afterwards. Invariants are enforced by fallible
//! constructors returning [`TablespanError::Validation`].

use crate::error::{Result, TablespanError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed vocabulary of title type-words.
///
/// Bilingual: Spanish `Cuadro`/`Tabla` plus English `Table`. Parsing is
/// case-insensitive; display is the canonical capitalized form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TitleKind {
    Cuadro,
    Tabla,
    Table,
}

impl TitleKind {
    /// Parse a type-word, case-insensitively. Returns `None` for words
    /// outside the vocabulary.
    #[must_use]
    pub fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "cuadro" => Some(Self::Cuadro),
            "tabla" => Some(Self::Tabla),
            "table" => Some(Self::Table),
            _ => None,
        }
    }

    /// Canonical capitalized form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cuadro => "Cuadro",
            Self::Tabla => "Tabla",
            Self::Table => "Table",
        }
    }
}

impl fmt::Display for TitleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Separator that appeared between the title number and the description in
/// the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Separator {
    /// `"Tabla 1. Resultados"`
    Period,
    /// `"Tabla 1 Resultados"`
    Space,
}

/// One detected instance of a table title on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleOccurrence {
    /// 1-based page number.
    pub page: u32,
    /// Type-word from the closed vocabulary.
    pub kind: TitleKind,
    /// Numeric identifier, kept as an opaque string so forms like leading
    /// zeros round-trip. Never parsed as an integer.
    pub number: String,
    /// Free-text description, whitespace-normalized.
    pub description: String,
    /// Canonical display string: kind + number + original separator +
    /// description.
    pub full_title: String,
    /// Character offset of the match within the page text. Used only for
    /// intra-page ordering, never compared across pages.
    pub offset: usize,
}

impl TitleOccurrence {
    /// Build an occurrence, reconstructing the canonical display string with
    /// the separator that was actually present in the source.
    ///
    /// # Errors
    ///
    /// Returns [`TablespanError::Validation`] if `page` is zero or `number`
    /// is empty or non-numeric.
    pub fn new(
        page: u32,
        kind: TitleKind,
        number: impl Into<String>,
        description: impl Into<String>,
        separator: Separator,
        offset: usize,
    ) -> Result<Self> {
        let number = number.into();
        let description = description.into();

        if page < 1 {
            return Err(TablespanError::Validation(
                "page number must be >= 1".to_string(),
            ));
        }
        if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TablespanError::Validation(format!(
                "title number must be numeric, got {number:?}"
            )));
        }

        let full_title = match separator {
            Separator::Period => format!("{kind} {number}. {description}"),
            Separator::Space => format!("{kind} {number} {description}"),
        };

        Ok(Self {
            page,
            kind,
            number,
            description,
            full_title,
            offset,
        })
    }
}

/// Font and formatting information for a title.
///
/// Note: the derived `PartialEq` is exact (including color). Uniformity and
/// grouping use the tolerant [`FormatInfo::matches`] instead, which ignores
/// color and absorbs sub-0.1 font size noise. The tolerance band makes the
/// relation non-transitive, so grouping scans representatives rather than
/// hashing a discrete key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatInfo {
    pub font_name: String,
    pub font_size: f32,
    pub is_bold: bool,
    pub is_italic: bool,
    pub color: (u8, u8, u8),
}

impl FormatInfo {
    /// Create a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`TablespanError::Validation`] if `font_size` is not positive.
    pub fn new(
        font_name: impl Into<String>,
        font_size: f32,
        is_bold: bool,
        is_italic: bool,
        color: (u8, u8, u8),
    ) -> Result<Self> {
        if font_size <= 0.0 {
            return Err(TablespanError::Validation(
                "font size must be positive".to_string(),
            ));
        }
        Ok(Self {
            font_name: font_name.into(),
            font_size,
            is_bold,
            is_italic,
            color,
        })
    }

    /// The fixed fallback descriptor: Helvetica 11, regular, black.
    #[must_use]
    pub fn default_format() -> Self {
        Self {
            font_name: crate::constants::DEFAULT_FONT_NAME.to_string(),
            font_size: crate::constants::DEFAULT_FONT_SIZE,
            is_bold: false,
            is_italic: false,
            color: crate::constants::DEFAULT_COLOR,
        }
    }

    /// Tolerant equality: font name exact, size within 0.1, bold/italic
    /// exact. Color is ignored.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.font_name == other.font_name
            && (self.font_size - other.font_size).abs() < 0.1
            && self.is_bold == other.is_bold
            && self.is_italic == other.is_italic
    }
}

/// A planned change to one title occurrence.
///
/// A decision with `repetition_number == None` means the run had length 1
/// and no rewrite is needed; `modified_title` then equals `original_title`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modification {
    /// 1-based page number.
    pub page: u32,
    pub original_title: String,
    pub modified_title: String,
    /// 1-based position within the repetition run, absent for length-1 runs.
    pub repetition_number: Option<u32>,
    /// Length of the repetition run this occurrence belongs to.
    pub total_repetitions: u32,
    /// Resolved (or user-overridden) format for the replacement text.
    pub format_info: Option<FormatInfo>,
}

impl Modification {
    /// Build a decision, validating its invariants.
    ///
    /// # Errors
    ///
    /// Returns [`TablespanError::Validation`] if `page` is zero,
    /// `total_repetitions` is zero, or `repetition_number` falls outside
    /// `[1, total_repetitions]`.
    pub fn new(
        page: u32,
        original_title: impl Into<String>,
        modified_title: impl Into<String>,
        repetition_number: Option<u32>,
        total_repetitions: u32,
        format_info: Option<FormatInfo>,
    ) -> Result<Self> {
        if page < 1 {
            return Err(TablespanError::Validation(
                "page number must be >= 1".to_string(),
            ));
        }
        if total_repetitions < 1 {
            return Err(TablespanError::Validation(
                "total repetitions must be >= 1".to_string(),
            ));
        }
        if let Some(n) = repetition_number {
            if n < 1 || n > total_repetitions {
                return Err(TablespanError::Validation(format!(
                    "repetition number {n} must be between 1 and {total_repetitions}"
                )));
            }
        }
        Ok(Self {
            page,
            original_title: original_title.into(),
            modified_title: modified_title.into(),
            repetition_number,
            total_repetitions,
            format_info,
        })
    }

    /// Whether this decision actually rewrites the page.
    #[must_use]
    pub const fn needs_modification(&self) -> bool {
        self.repetition_number.is_some()
    }
}

/// Complete result of analyzing one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Every detected occurrence, ordered by page then in-page offset.
    pub all_titles: Vec<TitleOccurrence>,
    /// One decision per occurrence, in the same order.
    pub modifications: Vec<Modification>,
    /// Whether the sampled title formats are uniform across the document.
    pub format_uniform: bool,
    /// Most common sampled format, if any titles were found.
    pub format_info: Option<FormatInfo>,
}

impl AnalysisResult {
    /// Total number of detected occurrences. Always recomputed from the
    /// list, never stored.
    #[must_use]
    pub fn total_titles(&self) -> usize {
        self.all_titles.len()
    }

    /// Number of decisions that actually rewrite the page.
    #[must_use]
    pub fn titles_to_modify(&self) -> usize {
        self.modifications
            .iter()
            .filter(|m| m.needs_modification())
            .count()
    }

    /// All occurrences carrying a specific title number.
    #[must_use]
    pub fn titles_by_number(&self, number: &str) -> Vec<&TitleOccurrence> {
        self.all_titles
            .iter()
            .filter(|t| t.number == number)
            .collect()
    }
}
