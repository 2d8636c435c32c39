//! Typed state threaded through the stages of one processing run.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::extract::PdfDocument;
use crate::models::ExtractionResult;

/// Per-call switches for `Processor::process`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOptions {
    pub use_ocr: bool,
    pub extract_tables: bool,
    pub extract_patterns: bool,
    pub enhance_images: bool,
    /// Force a specific engine instead of the best available one.
    pub ocr_engine: Option<String>,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            use_ocr: true,
            extract_tables: true,
            extract_patterns: true,
            enhance_images: true,
            ocr_engine: None,
        }
    }
}

impl ProcessOptions {
    /// OCR only: no tables, no patterns.
    pub fn ocr_only() -> Self {
        Self {
            extract_tables: false,
            extract_patterns: false,
            ..Self::default()
        }
    }

    /// OCR plus table detection.
    pub fn tables_only() -> Self {
        Self {
            extract_patterns: false,
            ..Self::default()
        }
    }

    /// Embedded text plus pattern extraction, no OCR.
    pub fn patterns_only() -> Self {
        Self {
            use_ocr: false,
            extract_tables: false,
            enhance_images: false,
            ..Self::default()
        }
    }
}

/// State shared by the stages of a single run.
///
/// Each field documents which stage writes it; stages only read fields
/// written by stages that run before them.
pub struct PipelineContext {
    // Input
    pub input_path: PathBuf,
    pub options: ProcessOptions,
    pub config: Arc<Config>,
    pub start_time: Instant,

    /// Accumulated result. Every stage may extend it until finalization seals it.
    pub result: ExtractionResult,

    /// Written by `pdf_text`: page texts and rendered images.
    pub document: Option<PdfDocument>,

    /// Pages whose embedded text layer was non-empty. Written by `pdf_text`.
    pub embedded_text_pages: u32,

    /// Pages recognized by an OCR engine. Written by `ocr`.
    pub ocr_pages: u32,

    /// Number of compiled pattern categories, for confidence scoring.
    pub known_pattern_categories: usize,
}

/// Copy of the stage-mutable parts of a context.
pub(crate) struct Checkpoint {
    result: ExtractionResult,
    embedded_text_pages: u32,
    ocr_pages: u32,
}

impl PipelineContext {
    pub fn new(
        input_path: PathBuf,
        options: ProcessOptions,
        config: Arc<Config>,
        result: ExtractionResult,
    ) -> Self {
        Self {
            input_path,
            options,
            config,
            start_time: Instant::now(),
            result,
            document: None,
            embedded_text_pages: 0,
            ocr_pages: 0,
            known_pattern_categories: 0,
        }
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            result: self.result.clone(),
            embedded_text_pages: self.embedded_text_pages,
            ocr_pages: self.ocr_pages,
        }
    }

    /// Roll back everything a failed stage changed in the result.
    pub(crate) fn restore(&mut self, checkpoint: Checkpoint) {
        self.result = checkpoint.result;
        self.embedded_text_pages = checkpoint.embedded_text_pages;
        self.ocr_pages = checkpoint.ocr_pages;
    }

    pub fn page_images_available(&self) -> bool {
        self.document
            .as_ref()
            .is_some_and(|d| !d.page_images.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractedElement;

    fn context() -> PipelineContext {
        PipelineContext::new(
            PathBuf::from("a.pdf"),
            ProcessOptions::default(),
            Arc::new(Config::default()),
            ExtractionResult::new("doc", "a.pdf"),
        )
    }

    #[test]
    fn test_restore_discards_partial_changes() {
        let mut ctx = context();
        ctx.result.append_text("kept");
        let checkpoint = ctx.checkpoint();

        ctx.result.elements.push(ExtractedElement::new("partial", 1, 0.5));
        ctx.result.append_text("partial");
        ctx.ocr_pages = 4;
        ctx.restore(checkpoint);

        assert!(ctx.result.elements.is_empty());
        assert_eq!(ctx.result.extracted_text, "kept");
        assert_eq!(ctx.ocr_pages, 0);
    }

    #[test]
    fn test_option_presets() {
        assert!(!ProcessOptions::patterns_only().use_ocr);
        assert!(ProcessOptions::patterns_only().extract_patterns);
        assert!(!ProcessOptions::ocr_only().extract_tables);
        assert!(ProcessOptions::tables_only().extract_tables);
        assert!(!ProcessOptions::tables_only().extract_patterns);
    }
}
