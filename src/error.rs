//! Error types surfaced by the processor.

use std::path::PathBuf;

use thiserror::Error;

use crate::extract::PdfError;
use crate::ocr::OcrError;

/// Failure inside a single pipeline stage.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error("{0}")]
    Failed(String),
}

/// Errors returned by `Processor` and `EnhancedProcessor`.
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Unsupported file type '{extension}' for {path} (allowed: {allowed})")]
    UnsupportedFileType {
        path: PathBuf,
        extension: String,
        allowed: String,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Processing failed in stage '{stage}' for document {document_id}: {source}")]
    Processing {
        stage: String,
        document_id: String,
        #[source]
        source: StageError,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProcessorError {
    /// Whether the error was raised before any stage ran.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound(_) | Self::UnsupportedFileType { .. } | Self::Validation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_error_names_stage_and_document() {
        let err = ProcessorError::Processing {
            stage: "pdf_text".to_string(),
            document_id: "abc".to_string(),
            source: StageError::Failed("corrupt xref".to_string()),
        };
        let message = err.to_string();
        assert!(message.contains("pdf_text"));
        assert!(message.contains("abc"));
        assert!(message.contains("corrupt xref"));
        assert!(!err.is_input_error());
    }

    #[test]
    fn test_input_errors() {
        assert!(ProcessorError::FileNotFound(PathBuf::from("x.pdf")).is_input_error());
        assert!(ProcessorError::Validation("too large".into()).is_input_error());
    }
}
