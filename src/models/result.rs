//! Per-document extraction result and its supporting records.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::element::{BoundingBox, ExtractedElement};

/// How the document's text was recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingMethod {
    OcrOnly,
    TextOnly,
    Hybrid,
}

impl ProcessingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OcrOnly => "OCR_ONLY",
            Self::TextOnly => "TEXT_ONLY",
            Self::Hybrid => "HYBRID",
        }
    }
}

/// Classifier output for a whole document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    StructuralDrawings,
    ArchitecturalDrawings,
    Specifications,
    GeneralNotes,
    #[default]
    General,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StructuralDrawings => "STRUCTURAL_DRAWINGS",
            Self::ArchitecturalDrawings => "ARCHITECTURAL_DRAWINGS",
            Self::Specifications => "SPECIFICATIONS",
            Self::GeneralNotes => "GENERAL_NOTES",
            Self::General => "GENERAL",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single regex hit inside accumulated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternMatch {
    /// Full matched text.
    pub text: String,
    /// Capture groups in order; `None` for groups that did not participate.
    #[serde(default)]
    pub groups: Vec<Option<String>>,
    /// Byte offset of the match start.
    pub start: usize,
    /// Byte offset one past the match end.
    pub end: usize,
    /// Index of the pattern within its category.
    pub pattern_index: usize,
}

/// Category name to matches, produced by the pattern stage.
pub type StructuredData = BTreeMap<String, Vec<PatternMatch>>;

/// A table detected by layout analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialTable {
    pub page_number: u32,
    /// Cell text, row-major.
    pub rows: Vec<Vec<String>>,
    #[serde(default)]
    pub bbox: Option<BoundingBox>,
    pub confidence: f64,
}

impl SpatialTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// Outcome of one stage for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Completed,
    /// Input validation returned false.
    Skipped,
    /// Non-critical stage raised; treated as a no-op.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: String,
    pub seconds: f64,
    pub outcome: StageOutcome,
}

/// Timing and counters collected during one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingMetrics {
    /// Wall-clock seconds for the whole run.
    pub processing_time: f64,
    #[serde(default)]
    pub stage_timings: Vec<StageTiming>,
    #[serde(default)]
    pub pages_ocr_attempted: u32,
    #[serde(default)]
    pub pages_ocr_failed: u32,
    /// Engine name to number of pages it recognized.
    #[serde(default)]
    pub engines_used: BTreeMap<String, u32>,
}

impl ProcessingMetrics {
    pub fn outcome_of(&self, stage: &str) -> Option<StageOutcome> {
        self.stage_timings
            .iter()
            .find(|t| t.stage == stage)
            .map(|t| t.outcome)
    }
}

/// Everything extracted from one document in one run.
///
/// Owned by a single processing run and mutated only by its stages; once
/// the finalization stage seals it, it is returned to the caller unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub document_id: String,
    pub filename: String,
    pub total_pages: u32,
    pub processing_method: ProcessingMethod,
    #[serde(default)]
    pub elements: Vec<ExtractedElement>,
    #[serde(default)]
    pub tables: Vec<SpatialTable>,
    #[serde(default)]
    pub structured_data: StructuredData,
    #[serde(default)]
    pub extracted_text: String,
    pub confidence: f64,
    #[serde(default)]
    pub document_type: DocumentType,
    #[serde(default)]
    pub processing_metrics: ProcessingMetrics,
    pub processed_at: DateTime<Utc>,
    #[serde(skip)]
    page_count_recorded: bool,
    #[serde(skip)]
    sealed: bool,
}

impl ExtractionResult {
    pub fn new(document_id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            filename: filename.into(),
            total_pages: 0,
            processing_method: ProcessingMethod::Hybrid,
            elements: Vec::new(),
            tables: Vec::new(),
            structured_data: StructuredData::new(),
            extracted_text: String::new(),
            confidence: 0.0,
            document_type: DocumentType::General,
            processing_metrics: ProcessingMetrics::default(),
            processed_at: Utc::now(),
            page_count_recorded: false,
            sealed: false,
        }
    }

    /// Record the page count the first time it becomes known.
    ///
    /// Returns false (and leaves the count alone) once it has been set.
    pub fn record_page_count(&mut self, pages: u32) -> bool {
        if self.page_count_recorded {
            if pages != self.total_pages {
                warn!(
                    "Ignoring page count {} for {}: already set to {}",
                    pages, self.document_id, self.total_pages
                );
            }
            return false;
        }
        self.total_pages = pages;
        self.page_count_recorded = true;
        true
    }

    /// Append a block of text, separated from existing text by a blank line.
    pub fn append_text(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if !self.extracted_text.is_empty() {
            self.extracted_text.push_str("\n\n");
        }
        self.extracted_text.push_str(text);
    }

    /// Whether finalization has frozen this result.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub(crate) fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn elements_on_page(&self, page: u32) -> impl Iterator<Item = &ExtractedElement> {
        self.elements.iter().filter(move |e| e.page_number == page)
    }
}
