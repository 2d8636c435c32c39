//! Document processing pipeline.
//!
//! A `Processor` validates the input file, then runs an ordered list of
//! `PipelineStage`s over one `PipelineContext`. `pdf_text` and
//! `finalization` are critical; any other stage that fails is rolled back
//! and skipped for that run. `EnhancedProcessor` layers page-level results
//! and keyword filtering on top.

mod confidence;
mod context;
mod enhanced;
mod export;
mod processor;
mod stage;
mod stages;

pub use confidence::{calculate_confidence, ConfidenceBreakdown};
pub use context::{PipelineContext, ProcessOptions};
pub use enhanced::{
    split_text_by_pages, DocumentInfo, EnhancedProcessor, EnhancedResult, FilteredPages,
    MinimalExport, PageSummary,
};
pub use export::write_json;
pub use processor::{
    result_path, BatchError, BatchFileResult, BatchSummary, ConfigValidation, PipelineInfo,
    Processor, StageInfo, SystemInfo,
};
pub use stage::{is_critical, PipelineStage, CRITICAL_STAGES};
pub use stages::{
    ClassificationStage, FinalizationStage, OcrStage, PatternStage, PdfTextStage, SpatialStage,
};
