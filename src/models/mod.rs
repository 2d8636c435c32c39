//! Data model for extraction results.
//!
//! An `ExtractionResult` is built up by the pipeline stages for one
//! document. Page-level records are derived from it afterwards by the
//! enhanced processor.

mod element;
mod page;
mod result;

pub use element::{BoundingBox, ElementType, ExtractedElement};
pub use page::{FilteredPage, MinimalPage, PageElement, PageResult};
pub use result::{
    DocumentType, ExtractionResult, PatternMatch, ProcessingMethod, ProcessingMetrics,
    SpatialTable, StageOutcome, StageTiming, StructuredData,
};
