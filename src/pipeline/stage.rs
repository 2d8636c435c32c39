//! Pipeline stage abstraction.

use super::context::PipelineContext;
use crate::error::StageError;

/// Stages whose failure aborts the whole document.
pub const CRITICAL_STAGES: &[&str] = &["pdf_text", "finalization"];

pub fn is_critical(stage_name: &str) -> bool {
    CRITICAL_STAGES.contains(&stage_name)
}

/// One step of the extraction pipeline.
///
/// The processor runs stages in order over one `PipelineContext`. A stage
/// whose `validate_input` returns false is skipped. An error from a
/// non-critical stage rolls the context back to its state before the stage
/// ran; an error from a critical stage ends the run.
pub trait PipelineStage: Send + Sync {
    /// Unique name for logging and lookup.
    fn name(&self) -> &str;

    /// Whether the upstream fields this stage reads are present.
    fn validate_input(&self, ctx: &PipelineContext) -> bool;

    fn process(&self, ctx: &mut PipelineContext) -> Result<(), StageError>;
}
