//! End-to-end pipeline tests with in-memory PDF and OCR collaborators.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cde_ocr::config::Config;
use cde_ocr::error::{ProcessorError, StageError};
use cde_ocr::extract::{PdfDocument, PdfError, PdfTextExtractor, RenderRequest};
use cde_ocr::models::{
    BoundingBox, ExtractedElement, ExtractionResult, ProcessingMethod, StageOutcome,
};
use cde_ocr::ocr::{Availability, EngineRegistry, OcrEngine, OcrError, OcrOptions, PageImage};
use cde_ocr::pipeline::{
    EnhancedProcessor, PipelineContext, PipelineStage, ProcessOptions, Processor,
};

/// Serves fixed page texts; files whose name contains "corrupt" fail.
struct FakePdf {
    pages: Vec<&'static str>,
}

impl PdfTextExtractor for FakePdf {
    fn name(&self) -> &str {
        "fake-pdf"
    }

    fn extract(&self, path: &Path, request: &RenderRequest) -> Result<PdfDocument, PdfError> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name.contains("corrupt") {
            return Err(PdfError::ExtractionFailed(format!(
                "Syntax Error: Couldn't find trailer dictionary in {}",
                name
            )));
        }
        let texts = self.pages.iter().map(|s| s.to_string()).collect();
        let document = PdfDocument::new(self.pages.len() as u32, texts);
        if !request.render_images {
            return Ok(document);
        }
        let images = (1..=self.pages.len() as u32)
            .map(|n| PageImage {
                page_number: n,
                path: PathBuf::from(format!("{}-{}.png", name, n)),
                width: 2550,
                height: 3300,
            })
            .collect();
        Ok(document.with_images(images, None))
    }
}

/// Returns a two-column schedule on every page.
struct GridEngine {
    name: &'static str,
    priority: i32,
    available: bool,
}

impl OcrEngine for GridEngine {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn check_availability(&self) -> Availability {
        if self.available {
            Availability::available("ready")
        } else {
            Availability::unavailable("offline")
        }
    }

    fn extract_text(
        &self,
        _image: &PageImage,
        page_number: u32,
        _options: &OcrOptions,
    ) -> Result<Vec<ExtractedElement>, OcrError> {
        let mut elements = Vec::new();
        for (row, y) in [100.0, 115.0, 130.0].iter().enumerate() {
            elements.push(
                ExtractedElement::new(format!("MARK-{}", row + 1), page_number, 0.9)
                    .with_bbox(BoundingBox::new(10.0, *y, 40.0, 10.0, 0.9)),
            );
            elements.push(
                ExtractedElement::new("W12X26", page_number, 0.7)
                    .with_bbox(BoundingBox::new(200.0, *y, 40.0, 10.0, 0.7)),
            );
        }
        Ok(elements)
    }
}

struct FailingStage;

impl PipelineStage for FailingStage {
    fn name(&self) -> &str {
        "drawing_index"
    }

    fn validate_input(&self, _ctx: &PipelineContext) -> bool {
        true
    }

    fn process(&self, ctx: &mut PipelineContext) -> Result<(), StageError> {
        ctx.result.tables.clear();
        ctx.result.append_text("half-written sheet index");
        Err(StageError::Failed("sheet index unreadable".to_string()))
    }
}

const DRAWING_PAGES: &[&str] = &[
    "GENERAL STRUCTURAL NOTES\nIBC 2018\nConcrete: 4000 PSI\nASTM A992",
    "FOUNDATION PLAN\n12'-6\" TYP.",
    "",
];

fn registry(engines: Vec<GridEngine>) -> Arc<EngineRegistry> {
    let registry = EngineRegistry::new();
    for engine in engines {
        registry.register(Arc::new(engine));
    }
    Arc::new(registry)
}

fn grid(name: &'static str, priority: i32, available: bool) -> GridEngine {
    GridEngine {
        name,
        priority,
        available,
    }
}

fn processor_with(pages: Vec<&'static str>, engines: Vec<GridEngine>) -> Processor {
    Processor::with_components(
        Config::default(),
        registry(engines),
        Arc::new(FakePdf { pages }),
    )
}

fn processor() -> Processor {
    processor_with(DRAWING_PAGES.to_vec(), vec![grid("grid", 5, true)])
}

fn options() -> ProcessOptions {
    ProcessOptions {
        enhance_images: false,
        ..ProcessOptions::default()
    }
}

fn write_pdf(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"%PDF-1.7\n%%EOF\n").unwrap();
    path
}

#[test]
fn test_full_pipeline_hybrid() {
    let dir = tempfile::tempdir().unwrap();
    let result = processor()
        .process(&write_pdf(dir.path(), "S-001.pdf"), &options())
        .unwrap();

    assert_eq!(result.filename, "S-001.pdf");
    assert_eq!(result.total_pages, 3);
    assert_eq!(result.processing_method, ProcessingMethod::Hybrid);
    // 2 embedded-text pages + 6 OCR cells on each of 3 pages
    assert_eq!(result.elements.len(), 20);
    assert_eq!(result.tables.len(), 3);
    assert!(result.structured_data.contains_key("building_codes"));
    assert!(result.confidence > 0.0 && result.confidence <= 1.0);
    assert_eq!(result.processing_metrics.engines_used["grid"], 3);
    assert!(result.is_sealed());
}

#[test]
fn test_failing_stage_does_not_stop_finalization() {
    let dir = tempfile::tempdir().unwrap();
    let mut processor = processor();
    processor.add_stage(Box::new(FailingStage), Some(4));

    let result = processor
        .process(&write_pdf(dir.path(), "S-001.pdf"), &options())
        .unwrap();

    let metrics = &result.processing_metrics;
    assert_eq!(metrics.outcome_of("drawing_index"), Some(StageOutcome::Failed));
    assert_eq!(metrics.outcome_of("finalization"), Some(StageOutcome::Completed));
    assert_eq!(result.tables.len(), 3);
    assert!(!result.extracted_text.contains("half-written"));
}

#[test]
fn test_pdf_failure_is_processing_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = processor()
        .process(&write_pdf(dir.path(), "corrupt.pdf"), &options())
        .unwrap_err();

    match &err {
        ProcessorError::Processing {
            stage, document_id, ..
        } => {
            assert_eq!(stage, "pdf_text");
            assert!(!document_id.is_empty());
        }
        other => panic!("expected processing error, got {other}"),
    }
    assert!(err.to_string().contains("pdf_text"));
}

#[test]
fn test_missing_ocr_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let processor = processor_with(DRAWING_PAGES.to_vec(), vec![]);
    let result = processor
        .process(&write_pdf(dir.path(), "S-001.pdf"), &options())
        .unwrap();

    assert_eq!(
        result.processing_metrics.outcome_of("ocr"),
        Some(StageOutcome::Failed)
    );
    assert_eq!(result.processing_method, ProcessingMethod::TextOnly);
    assert_eq!(result.elements.len(), 2);
    assert!(result.confidence > 0.0);
}

#[test]
fn test_idempotent_structured_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf(dir.path(), "S-001.pdf");
    let processor = processor();

    let first = processor.process(&path, &options()).unwrap();
    let second = processor.process(&path, &options()).unwrap();
    assert_eq!(first.structured_data, second.structured_data);
    assert_eq!(first.tables, second.tables);
    assert_eq!(first.confidence, second.confidence);
    assert_ne!(first.document_id, second.document_id);
}

#[test]
fn test_batch_isolates_poisoned_file() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    for name in ["S-001.pdf", "S-002.pdf", "corrupt.pdf", "notes.txt"] {
        write_pdf(input.path(), name);
    }

    let out_dir = output.path().join("results");
    let summary = processor()
        .process_batch(input.path(), &out_dir, "*.pdf", &options())
        .unwrap();

    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.successful, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.errors[0].file, "corrupt.pdf");
    assert!(summary.results.iter().all(|r| r.status == "success"));
    assert!(out_dir.join("S-001_result.json").is_file());
    assert!(out_dir.join("S-002_result.json").is_file());
    assert!(!out_dir.join("corrupt_result.json").exists());
}

#[test]
fn test_batch_missing_input_dir() {
    let dir = tempfile::tempdir().unwrap();
    let err = processor()
        .process_batch(&dir.path().join("nope"), dir.path(), "*.pdf", &options())
        .unwrap_err();
    assert!(matches!(err, ProcessorError::FileNotFound(_)));
}

#[test]
fn test_result_json_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let processor = processor();
    let result = processor
        .process(&write_pdf(dir.path(), "S-001.pdf"), &options())
        .unwrap();

    let path = dir.path().join("S-001_result.json");
    processor.save_result(&result, &path).unwrap();
    let reparsed: ExtractionResult =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

    assert_eq!(reparsed.document_id, result.document_id);
    assert_eq!(reparsed.filename, result.filename);
    assert_eq!(reparsed.total_pages, result.total_pages);
    assert_eq!(reparsed.extracted_text, result.extracted_text);
    assert_eq!(reparsed.confidence, result.confidence);
    assert_eq!(reparsed.processing_method, result.processing_method);
    assert_eq!(reparsed.document_type, result.document_type);
    assert_eq!(reparsed.elements.len(), result.elements.len());
    assert_eq!(reparsed.tables.len(), result.tables.len());
    assert_eq!(reparsed.structured_data, result.structured_data);
}

#[test]
fn test_engine_selection_by_priority_and_availability() {
    let registry = registry(vec![grid("a", 5, true), grid("b", 9, false)]);

    let selected = registry.select_engine(None).unwrap();
    assert_eq!(selected.name(), "a");

    match registry.select_engine(Some("b")) {
        Err(OcrError::EngineUnavailable { name, .. }) => assert_eq!(name, "b"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(engine) => panic!("selected unavailable engine {}", engine.name()),
    }
}

#[test]
fn test_requested_unavailable_engine_skips_ocr() {
    let dir = tempfile::tempdir().unwrap();
    let processor = processor_with(
        DRAWING_PAGES.to_vec(),
        vec![grid("a", 5, true), grid("b", 9, false)],
    );
    let options = ProcessOptions {
        ocr_engine: Some("b".to_string()),
        ..options()
    };
    let result = processor
        .process(&write_pdf(dir.path(), "S-001.pdf"), &options)
        .unwrap();
    assert_eq!(
        result.processing_metrics.outcome_of("ocr"),
        Some(StageOutcome::Failed)
    );
    assert!(result.tables.is_empty());
}

#[test]
fn test_keyword_pages_and_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf(dir.path(), "S-001.pdf");
    let no_ocr = ProcessOptions {
        use_ocr: false,
        ..options()
    };

    let enhanced = EnhancedProcessor::new(processor());
    let result = enhanced.process_with_page_results(&path, &no_ocr).unwrap();
    assert_eq!(result.page_level_results.len(), 3);
    let filtered = &result.filtered_pages;
    assert!(!filtered.fallback_used);
    assert_eq!(filtered.total_matching_pages, 1);
    assert_eq!(filtered.matching_pages[0].page.page_number, 1);
    assert_eq!(
        filtered.keywords_found,
        vec!["GENERAL STRUCTURAL NOTES".to_string()]
    );

    let fallback = EnhancedProcessor::with_keywords(processor(), vec!["ROOF FRAMING".into()]);
    let result = fallback.process_with_page_results(&path, &no_ocr).unwrap();
    assert!(result.filtered_pages.fallback_used);
    // page 3 has no text
    assert_eq!(result.filtered_pages.total_matching_pages, 2);
    let summary = fallback.get_page_summary(&result);
    assert_eq!(summary.extraction_method, "full_text_fallback");
    assert_eq!(summary.page_numbers_processed, vec![1, 2]);

    let export = result.minimal_export();
    assert!(export.filtered_pages_only.iter().all(|p| p.is_fallback));
    assert_eq!(export.document_info.document_id, result.full_document_results.document_id);
}

#[test]
fn test_input_validation() {
    let dir = tempfile::tempdir().unwrap();
    let processor = processor();

    let err = processor
        .process(&dir.path().join("missing.pdf"), &options())
        .unwrap_err();
    assert!(matches!(err, ProcessorError::FileNotFound(_)));
    assert!(err.is_input_error());

    let dwg = dir.path().join("S-001.dwg");
    std::fs::write(&dwg, b"AC1032").unwrap();
    let err = processor.process(&dwg, &options()).unwrap_err();
    assert!(matches!(err, ProcessorError::UnsupportedFileType { .. }));
}
