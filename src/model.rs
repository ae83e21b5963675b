//! Exam document data model
//!
//! The wire format mirrors the JSON the booklet editor produces: camelCase
//! field names, `tests` as the section list, question/answer correlation by
//! `questionNumber` (never by array position). All fields are optional on
//! the wire; missing values fall back to empty defaults so partially filled
//! documents still render.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Choice letters for answer-key slots. Indices 0-4 map to A-E.
pub const CHOICE_LETTERS: [char; 5] = ['A', 'B', 'C', 'D', 'E'];

/// Root input document: metadata plus the ordered section list.
///
/// Immutable once a render pass begins; edits produce a new document and a
/// full re-render.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ExamDocument {
    /// School name shown on the front cover and first-page subtitle
    pub school_name: Option<String>,
    /// Booklet title shown in continuation-page running headers
    #[serde(rename = "denemeName")]
    pub booklet_name: Option<String>,
    /// Booklet kind (e.g. "tyt", "ayt", "ydt"); selects cover artwork
    pub test_type: Option<String>,
    /// Booklet kinds this document may legally declare
    pub available_test_types: Vec<String>,
    /// QR payload shown on section first pages
    pub qr_code_url: Option<String>,
    /// Inner-cover attention notice
    pub attention: Option<String>,
    /// Front-cover candidate notice
    pub attention_candidate: Option<String>,
    /// Inner-cover booklet instructions
    #[serde(rename = "denemeInstructions")]
    pub booklet_instructions: Option<String>,
    /// Ordered test sections
    pub tests: Vec<Section>,
}

impl ExamDocument {
    /// Parse a document from its JSON wire form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Whether the declared booklet kind is one of the allowed kinds.
    ///
    /// Cover pages are only emitted for a valid kind.
    pub fn has_valid_test_type(&self) -> bool {
        match &self.test_type {
            Some(t) => self.available_test_types.iter().any(|a| a == t),
            None => false,
        }
    }

    /// Total question count across all sections.
    pub fn question_count(&self) -> usize {
        self.tests.iter().map(|t| t.questions.len()).sum()
    }
}

/// One subject test within the booklet.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Section {
    /// Display name (e.g. "Matematik")
    pub name: String,
    /// Lesson/category code; selects a color pair only
    pub lesson_code: Option<String>,
    /// Free-text instructions shown on the section's first page
    pub test_instructions: Option<String>,
    /// Ordered questions; display order is array order
    pub questions: Vec<Question>,
    /// Answer key entries, correlated by question number
    pub answers: Vec<AnswerEntry>,
    /// Declared maximum question count for answer-sheet sizing.
    /// May exceed the actual question count; sparse keys are valid.
    pub max_question: Option<u32>,
}

impl Section {
    /// Whether a question with this exact number exists in the section.
    pub fn has_question_number(&self, number: u32) -> bool {
        self.questions
            .iter()
            .any(|q| q.question_number == Some(number))
    }

    /// The answer entry for a question number, if any.
    pub fn answer_for(&self, number: u32) -> Option<&AnswerEntry> {
        self.answers
            .iter()
            .find(|a| a.question_number == Some(number))
    }
}

/// One question: an optional display number plus an image reference.
///
/// The number is used only for the label and answer-key correlation, never
/// for ordering. Gaps and duplicates are tolerated.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Question {
    pub question_number: Option<u32>,
    /// Image reference, resolved against the render's asset root
    pub image_url: Option<String>,
}

impl Question {
    /// Display label, e.g. `7.`, or empty when the question is unnumbered.
    pub fn label(&self) -> String {
        match self.question_number {
            Some(n) => format!("{}.", n),
            None => String::new(),
        }
    }
}

/// One answer-key entry.
///
/// An entry without a matching question still renders its letter; a
/// question without an entry renders a blank choice slot.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AnswerEntry {
    pub question_number: Option<u32>,
    /// 0-based choice index; 0-4 map to A-E, anything else renders blank
    pub correct_choice_index: Option<u32>,
}

impl AnswerEntry {
    /// The choice letter, or `None` for out-of-range or missing indices.
    pub fn choice_letter(&self) -> Option<char> {
        self.correct_choice_index
            .and_then(|i| CHOICE_LETTERS.get(i as usize).copied())
    }
}

/// Reference to a question image: a filesystem path or in-memory encoded
/// bytes (the output of whitespace cropping).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Path(PathBuf),
    Memory(Arc<Vec<u8>>),
}

impl ImageSource {
    /// Build a path source, resolving relative references against a root.
    pub fn resolve(url: &str, asset_root: &std::path::Path) -> Self {
        let path = PathBuf::from(url);
        if path.is_absolute() {
            ImageSource::Path(path)
        } else {
            ImageSource::Path(asset_root.join(path))
        }
    }

    /// Wrap encoded image bytes as an in-memory source.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        ImageSource::Memory(Arc::new(bytes))
    }

    /// Whether this source came out of the cropper rather than the input.
    pub fn is_cropped(&self) -> bool {
        matches!(self, ImageSource::Memory(_))
    }
}

/// Presentation color pair selected by a section's lesson code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColorPair {
    pub primary: &'static str,
    pub secondary: &'static str,
}

/// Fallback colors for unknown lesson codes.
pub const NEUTRAL_COLORS: ColorPair = ColorPair {
    primary: "#4a5568",
    secondary: "#a0aec0",
};

/// Look up the color pair for a lesson code.
pub fn lesson_colors(code: Option<&str>) -> ColorPair {
    match code {
        Some("tur") | Some("tde-sos") => ColorPair {
            primary: "#c37f67",
            secondary: "#f7a180",
        },
        Some("sos") | Some("sos2") => ColorPair {
            primary: "#72a15e",
            secondary: "#92cc77",
        },
        Some("mat") => ColorPair {
            primary: "#608ab1",
            secondary: "#79addd",
        },
        Some("fen") => ColorPair {
            primary: "#91719b",
            secondary: "#b78bbf",
        },
        Some("ydt") => ColorPair {
            primary: "#bd484a",
            secondary: "#f06061",
        },
        _ => NEUTRAL_COLORS,
    }
}
