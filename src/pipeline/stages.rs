//! The six built-in pipeline stages.
//!
//! | stage            | reads                         | writes                                   |
//! |------------------|-------------------------------|------------------------------------------|
//! | `pdf_text`       | input path, options           | `document`, `total_pages`, text elements |
//! | `ocr`            | `document.page_images`        | OCR elements, `extracted_text`, metrics  |
//! | `pattern`        | `extracted_text`              | `structured_data`                        |
//! | `spatial`        | elements with bounding boxes  | `tables`                                 |
//! | `classification` | `extracted_text`, patterns    | `document_type`                          |
//! | `finalization`   | everything above              | method, confidence, seal                 |

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::confidence::calculate_confidence;
use super::context::PipelineContext;
use super::stage::PipelineStage;
use crate::error::StageError;
use crate::extract::text::filter_low_quality_elements;
use crate::extract::{
    DocumentClassifier, ImageEnhancer, PatternProcessor, PdfTextExtractor, RenderRequest,
    SpatialAnalyzer,
};
use crate::models::{ExtractedElement, ProcessingMethod};
use crate::ocr::{EngineRegistry, OcrEngine, OcrError, OcrOptions};

/// Confidence assigned to text taken from the PDF's own text layer.
const EMBEDDED_TEXT_CONFIDENCE: f64 = 1.0;

/// Reads the embedded text layer and renders page images.
pub struct PdfTextStage {
    extractor: Arc<dyn PdfTextExtractor>,
}

impl PdfTextStage {
    pub fn new(extractor: Arc<dyn PdfTextExtractor>) -> Self {
        Self { extractor }
    }
}

impl PipelineStage for PdfTextStage {
    fn name(&self) -> &str {
        "pdf_text"
    }

    fn validate_input(&self, ctx: &PipelineContext) -> bool {
        ctx.document.is_none()
    }

    fn process(&self, ctx: &mut PipelineContext) -> Result<(), StageError> {
        let request = RenderRequest {
            render_images: ctx.options.use_ocr,
            dpi: ctx.config.ocr.dpi,
        };
        let document = self.extractor.extract(&ctx.input_path, &request)?;
        ctx.result.record_page_count(document.page_count);

        for page_number in 1..=document.page_count {
            let text = document.page_text(page_number).unwrap_or_default().trim();
            if text.is_empty() {
                continue;
            }
            ctx.result.elements.push(
                ExtractedElement::new(text, page_number, EMBEDDED_TEXT_CONFIDENCE)
                    .with_metadata("source", "pdf_text"),
            );
            ctx.result.append_text(text);
            ctx.embedded_text_pages += 1;
        }
        debug!(
            "{}: {} pages, {} with embedded text, {} rendered",
            self.extractor.name(),
            document.page_count,
            ctx.embedded_text_pages,
            document.page_images.len()
        );
        ctx.document = Some(document);
        Ok(())
    }
}

/// Recognizes rendered pages with the registered engines.
pub struct OcrStage {
    registry: Arc<EngineRegistry>,
    enhancer: ImageEnhancer,
}

impl OcrStage {
    pub fn new(registry: Arc<EngineRegistry>) -> Self {
        Self {
            registry,
            enhancer: ImageEnhancer::new(),
        }
    }

    /// Engines to try for each page, in order.
    ///
    /// An explicitly requested engine is used alone. Otherwise every
    /// available engine is a candidate, best first, so a page that fails on
    /// one engine falls back to the next.
    fn candidates(&self, requested: Option<&str>) -> Result<Vec<Arc<dyn OcrEngine>>, StageError> {
        match requested {
            Some(name) => Ok(vec![self.registry.select_engine(Some(name))?]),
            None => {
                let engines = self.registry.get_available_engines();
                if engines.is_empty() {
                    return Err(OcrError::NoEngineAvailable.into());
                }
                Ok(engines)
            }
        }
    }
}

impl PipelineStage for OcrStage {
    fn name(&self) -> &str {
        "ocr"
    }

    fn validate_input(&self, ctx: &PipelineContext) -> bool {
        ctx.options.use_ocr && ctx.page_images_available()
    }

    fn process(&self, ctx: &mut PipelineContext) -> Result<(), StageError> {
        let engines = self.candidates(ctx.options.ocr_engine.as_deref())?;
        let options = OcrOptions {
            language: ctx.config.ocr.language.clone(),
            dpi: ctx.config.ocr.dpi,
        };
        let min_confidence = ctx.config.ocr.min_confidence;
        let min_length = ctx.config.ocr.min_text_length;

        let images = match ctx.document.as_ref() {
            Some(document) => document.page_images.clone(),
            None => return Ok(()),
        };

        // Engines that failed with a non-recoverable error sit out the rest
        // of the document.
        let mut disabled = vec![false; engines.len()];

        for page in &images {
            let image = if ctx.options.enhance_images {
                self.enhancer.enhance_or_original(page)
            } else {
                page.clone()
            };
            ctx.result.processing_metrics.pages_ocr_attempted += 1;

            let mut recognized = false;
            for (index, engine) in engines.iter().enumerate() {
                if disabled[index] {
                    continue;
                }
                match engine.extract_text(&image, page.page_number, &options) {
                    Ok(elements) => {
                        let elements = filter_low_quality_elements(elements, min_confidence, min_length);
                        debug!(
                            "Page {}: {} elements from {}",
                            page.page_number,
                            elements.len(),
                            engine.name()
                        );
                        let page_text = elements
                            .iter()
                            .map(|e| e.text.as_str())
                            .collect::<Vec<_>>()
                            .join("\n");
                        ctx.result.append_text(&page_text);
                        ctx.result.elements.extend(elements);
                        *ctx
                            .result
                            .processing_metrics
                            .engines_used
                            .entry(engine.name().to_string())
                            .or_insert(0) += 1;
                        ctx.ocr_pages += 1;
                        recognized = true;
                        break;
                    }
                    Err(e) if e.is_recoverable() => {
                        warn!(
                            "OCR engine {} failed on page {}: {}",
                            engine.name(),
                            page.page_number,
                            e
                        );
                    }
                    Err(e) => {
                        warn!(
                            "OCR engine {} disabled for {} after page {}: {}",
                            engine.name(),
                            ctx.result.document_id,
                            page.page_number,
                            e
                        );
                        disabled[index] = true;
                    }
                }
            }
            if !recognized {
                ctx.result.processing_metrics.pages_ocr_failed += 1;
            }
        }
        Ok(())
    }
}

/// Applies the pattern catalog to the accumulated text.
pub struct PatternStage {
    processor: Arc<PatternProcessor>,
}

impl PatternStage {
    pub fn new(processor: Arc<PatternProcessor>) -> Self {
        Self { processor }
    }
}

impl PipelineStage for PatternStage {
    fn name(&self) -> &str {
        "pattern"
    }

    fn validate_input(&self, ctx: &PipelineContext) -> bool {
        ctx.options.extract_patterns && !ctx.result.extracted_text.trim().is_empty()
    }

    fn process(&self, ctx: &mut PipelineContext) -> Result<(), StageError> {
        ctx.result.structured_data = self.processor.extract_all(&ctx.result.extracted_text);
        Ok(())
    }
}

/// Detects tables from element layout.
pub struct SpatialStage {
    analyzer: SpatialAnalyzer,
}

impl SpatialStage {
    pub fn new(analyzer: SpatialAnalyzer) -> Self {
        Self { analyzer }
    }
}

impl PipelineStage for SpatialStage {
    fn name(&self) -> &str {
        "spatial"
    }

    fn validate_input(&self, ctx: &PipelineContext) -> bool {
        ctx.options.extract_tables && ctx.result.elements.iter().any(|e| e.bbox.is_some())
    }

    fn process(&self, ctx: &mut PipelineContext) -> Result<(), StageError> {
        let tables = self.analyzer.detect_tables(&ctx.result.elements);
        debug!("Detected {} tables", tables.len());
        ctx.result.tables.extend(tables);
        Ok(())
    }
}

/// Assigns a document type.
pub struct ClassificationStage {
    classifier: DocumentClassifier,
}

impl ClassificationStage {
    pub fn new(classifier: DocumentClassifier) -> Self {
        Self { classifier }
    }
}

impl PipelineStage for ClassificationStage {
    fn name(&self) -> &str {
        "classification"
    }

    fn validate_input(&self, ctx: &PipelineContext) -> bool {
        !ctx.result.extracted_text.trim().is_empty()
    }

    fn process(&self, ctx: &mut PipelineContext) -> Result<(), StageError> {
        ctx.result.document_type = self
            .classifier
            .classify(&ctx.result.extracted_text, &ctx.result.structured_data);
        Ok(())
    }
}

/// Settles the processing method and confidence, then seals the result.
#[derive(Debug, Default)]
pub struct FinalizationStage;

impl FinalizationStage {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineStage for FinalizationStage {
    fn name(&self) -> &str {
        "finalization"
    }

    fn validate_input(&self, ctx: &PipelineContext) -> bool {
        !ctx.result.is_sealed()
    }

    fn process(&self, ctx: &mut PipelineContext) -> Result<(), StageError> {
        ctx.result.processing_method = match (ctx.embedded_text_pages > 0, ctx.ocr_pages > 0) {
            (true, true) => ProcessingMethod::Hybrid,
            (false, true) => ProcessingMethod::OcrOnly,
            _ => ProcessingMethod::TextOnly,
        };
        ctx.result.confidence = calculate_confidence(&ctx.result, ctx.known_pattern_categories);
        ctx.result.seal();
        info!(
            "Finalized {}: {} elements, {} tables, {} pattern categories",
            ctx.result.document_id,
            ctx.result.elements.len(),
            ctx.result.tables.len(),
            ctx.result.structured_data.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::extract::{PdfDocument, PdfError};
    use crate::models::ExtractionResult;
    use crate::ocr::{Availability, PageImage};
    use crate::pipeline::context::ProcessOptions;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TextOnlyPdf(Vec<&'static str>);

    impl PdfTextExtractor for TextOnlyPdf {
        fn name(&self) -> &str {
            "fake"
        }

        fn extract(&self, _path: &Path, request: &RenderRequest) -> Result<PdfDocument, PdfError> {
            let texts = self.0.iter().map(|s| s.to_string()).collect();
            let doc = PdfDocument::new(self.0.len() as u32, texts);
            if !request.render_images {
                return Ok(doc);
            }
            let images = (1..=self.0.len() as u32)
                .map(|n| PageImage {
                    page_number: n,
                    path: PathBuf::from(format!("page-{}.png", n)),
                    width: 100,
                    height: 100,
                })
                .collect();
            Ok(doc.with_images(images, None))
        }
    }

    struct Engine {
        name: &'static str,
        priority: i32,
        fail_pages: Vec<u32>,
    }

    impl OcrEngine for Engine {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn check_availability(&self) -> Availability {
            Availability::available("ok")
        }

        fn extract_text(
            &self,
            _image: &PageImage,
            page_number: u32,
            _options: &OcrOptions,
        ) -> Result<Vec<ExtractedElement>, OcrError> {
            if self.fail_pages.contains(&page_number) {
                return Err(OcrError::RateLimited {
                    engine: self.name.to_string(),
                    page: page_number,
                    retry_after_secs: None,
                });
            }
            Ok(vec![ExtractedElement::new(
                format!("{} page {}", self.name, page_number),
                page_number,
                0.9,
            )])
        }
    }

    fn context(options: ProcessOptions) -> PipelineContext {
        PipelineContext::new(
            PathBuf::from("a.pdf"),
            options,
            Arc::new(Config::default()),
            ExtractionResult::new("doc", "a.pdf"),
        )
    }

    #[test]
    fn test_pdf_text_stage_sets_pages_and_text() {
        let stage = PdfTextStage::new(Arc::new(TextOnlyPdf(vec!["GENERAL NOTES", "", "DESIGN CRITERIA"])));
        let mut ctx = context(ProcessOptions::patterns_only());
        stage.process(&mut ctx).unwrap();

        assert_eq!(ctx.result.total_pages, 3);
        assert_eq!(ctx.result.elements.len(), 2);
        assert_eq!(ctx.result.elements[1].page_number, 3);
        assert_eq!(ctx.result.extracted_text, "GENERAL NOTES\n\nDESIGN CRITERIA");
        assert!(!ctx.page_images_available());
        assert!(!stage.validate_input(&ctx));
    }

    struct ShortTextLayer;

    impl PdfTextExtractor for ShortTextLayer {
        fn name(&self) -> &str {
            "short"
        }

        fn extract(&self, _path: &Path, _request: &RenderRequest) -> Result<PdfDocument, PdfError> {
            Ok(PdfDocument::new(3, vec!["TITLE SHEET".to_string()]))
        }
    }

    #[test]
    fn test_pdf_text_stage_pages_beyond_text_layer() {
        let mut ctx = context(ProcessOptions::patterns_only());
        PdfTextStage::new(Arc::new(ShortTextLayer)).process(&mut ctx).unwrap();

        assert_eq!(ctx.result.total_pages, 3);
        assert_eq!(ctx.result.elements.len(), 1);
        assert_eq!(ctx.result.elements[0].page_number, 1);
        assert_eq!(ctx.embedded_text_pages, 1);
    }

    #[test]
    fn test_ocr_falls_back_to_next_engine() {
        let registry = Arc::new(EngineRegistry::new());
        registry.register(Arc::new(Engine { name: "best", priority: 9, fail_pages: vec![2] }));
        registry.register(Arc::new(Engine { name: "backup", priority: 1, fail_pages: vec![] }));

        let mut ctx = context(ProcessOptions { enhance_images: false, ..ProcessOptions::default() });
        PdfTextStage::new(Arc::new(TextOnlyPdf(vec!["", ""]))).process(&mut ctx).unwrap();
        let stage = OcrStage::new(registry);
        assert!(stage.validate_input(&ctx));
        stage.process(&mut ctx).unwrap();

        let texts: Vec<&str> = ctx.result.elements.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["best page 1", "backup page 2"]);
        assert_eq!(ctx.result.processing_metrics.engines_used["best"], 1);
        assert_eq!(ctx.result.processing_metrics.engines_used["backup"], 1);
        assert_eq!(ctx.ocr_pages, 2);
    }

    struct Unauthorized {
        calls: AtomicUsize,
    }

    impl OcrEngine for Unauthorized {
        fn name(&self) -> &str {
            "cloud"
        }

        fn priority(&self) -> i32 {
            10
        }

        fn check_availability(&self) -> Availability {
            Availability::available("key present")
        }

        fn extract_text(
            &self,
            _image: &PageImage,
            _page_number: u32,
            _options: &OcrOptions,
        ) -> Result<Vec<ExtractedElement>, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(OcrError::Credentials {
                engine: "cloud".to_string(),
                reason: "401 invalid x-api-key".to_string(),
            })
        }
    }

    #[test]
    fn test_engine_with_bad_credentials_is_dropped() {
        let cloud = Arc::new(Unauthorized { calls: AtomicUsize::new(0) });
        let registry = Arc::new(EngineRegistry::new());
        registry.register(cloud.clone());
        registry.register(Arc::new(Engine { name: "backup", priority: 1, fail_pages: vec![] }));

        let mut ctx = context(ProcessOptions { enhance_images: false, ..ProcessOptions::default() });
        PdfTextStage::new(Arc::new(TextOnlyPdf(vec!["", "", "", ""]))).process(&mut ctx).unwrap();
        OcrStage::new(registry).process(&mut ctx).unwrap();

        assert_eq!(cloud.calls.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.result.processing_metrics.engines_used["backup"], 4);
        assert!(!ctx.result.processing_metrics.engines_used.contains_key("cloud"));
        assert_eq!(ctx.result.processing_metrics.pages_ocr_failed, 0);
    }

    #[test]
    fn test_rate_limited_engine_is_retried_on_later_pages() {
        let registry = Arc::new(EngineRegistry::new());
        registry.register(Arc::new(Engine { name: "best", priority: 9, fail_pages: vec![1] }));
        registry.register(Arc::new(Engine { name: "backup", priority: 1, fail_pages: vec![] }));

        let mut ctx = context(ProcessOptions { enhance_images: false, ..ProcessOptions::default() });
        PdfTextStage::new(Arc::new(TextOnlyPdf(vec!["", "", ""]))).process(&mut ctx).unwrap();
        OcrStage::new(registry).process(&mut ctx).unwrap();

        assert_eq!(ctx.result.processing_metrics.engines_used["best"], 2);
        assert_eq!(ctx.result.processing_metrics.engines_used["backup"], 1);
    }

    #[test]
    fn test_requested_engine_has_no_fallback() {
        let registry = Arc::new(EngineRegistry::new());
        registry.register(Arc::new(Engine { name: "best", priority: 9, fail_pages: vec![] }));
        registry.register(Arc::new(Engine { name: "flaky", priority: 1, fail_pages: vec![1] }));

        let mut ctx = context(ProcessOptions {
            enhance_images: false,
            ocr_engine: Some("flaky".into()),
            ..ProcessOptions::default()
        });
        PdfTextStage::new(Arc::new(TextOnlyPdf(vec!["", ""]))).process(&mut ctx).unwrap();
        OcrStage::new(registry).process(&mut ctx).unwrap();

        assert_eq!(ctx.result.elements.len(), 1);
        assert_eq!(ctx.result.processing_metrics.pages_ocr_failed, 1);
        assert_eq!(ctx.result.processing_metrics.pages_ocr_attempted, 2);
    }

    #[test]
    fn test_ocr_without_engines_fails() {
        let mut ctx = context(ProcessOptions::default());
        PdfTextStage::new(Arc::new(TextOnlyPdf(vec!["x"]))).process(&mut ctx).unwrap();
        let err = OcrStage::new(Arc::new(EngineRegistry::new()))
            .process(&mut ctx)
            .unwrap_err();
        assert!(matches!(err, StageError::Ocr(OcrError::NoEngineAvailable)));
    }

    #[test]
    fn test_finalization_method_and_seal() {
        let mut ctx = context(ProcessOptions::patterns_only());
        PdfTextStage::new(Arc::new(TextOnlyPdf(vec!["text"]))).process(&mut ctx).unwrap();
        ctx.known_pattern_categories = 7;
        let stage = FinalizationStage::new();
        stage.process(&mut ctx).unwrap();

        assert_eq!(ctx.result.processing_method, ProcessingMethod::TextOnly);
        assert!(ctx.result.is_sealed());
        assert!(ctx.result.confidence > 0.0);
        assert!(!stage.validate_input(&ctx));
    }
}
