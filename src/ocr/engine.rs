//! OCR engine abstraction.
//!
//! Every engine (local CLI, cloud vision API) implements `OcrEngine` and is
//! driven identically by the OCR stage through the `EngineRegistry`.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::ExtractedElement;

/// Errors from OCR engines and engine selection.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR engine '{name}' unavailable: {reason}")]
    EngineUnavailable { name: String, reason: String },

    #[error("No OCR engine available")]
    NoEngineAvailable,

    #[error("Credentials error for {engine}: {reason}")]
    Credentials { engine: String, reason: String },

    #[error("Configuration error for {engine}: {reason}")]
    Configuration { engine: String, reason: String },

    #[error("OCR extraction failed ({engine}, page {page}): {reason}")]
    Extraction {
        engine: String,
        page: u32,
        reason: String,
    },

    #[error("Rate limited by {engine} on page {page}, retry after {retry_after_secs:?}s")]
    RateLimited {
        engine: String,
        page: u32,
        retry_after_secs: Option<u64>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OcrError {
    /// Whether the failure only affects one page and a later page or another
    /// engine may still succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            OcrError::Extraction { .. } | OcrError::RateLimited { .. } | OcrError::Io(_)
        )
    }
}

/// Result of an availability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    pub available: bool,
    pub reason: String,
}

impl Availability {
    pub fn available(reason: impl Into<String>) -> Self {
        Self {
            available: true,
            reason: reason.into(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            reason: reason.into(),
        }
    }
}

/// A rendered page image handed to an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// 1-based page number.
    pub page_number: u32,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl PageImage {
    /// Describe an image on disk, reading its dimensions from the file header.
    pub fn from_file(page_number: u32, path: &Path) -> Result<Self, OcrError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| OcrError::Extraction {
            engine: "image".to_string(),
            page: page_number,
            reason: format!("Cannot read image {}: {}", path.display(), e),
        })?;
        Ok(Self {
            page_number,
            path: path.to_path_buf(),
            width,
            height,
        })
    }
}

/// Per-call settings passed to an engine.
#[derive(Debug, Clone)]
pub struct OcrOptions {
    /// Language for OCR (e.g., "eng").
    pub language: String,
    /// Resolution the page was rendered at.
    pub dpi: u32,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            dpi: 300,
        }
    }
}

/// Capability contract for OCR engines.
pub trait OcrEngine: Send + Sync {
    /// Unique registry key.
    fn name(&self) -> &str;

    /// Higher is preferred.
    fn priority(&self) -> i32;

    /// Check credentials, binaries or connectivity.
    ///
    /// Called on every registry query; engines cache internally if probing
    /// is expensive.
    fn check_availability(&self) -> Availability;

    /// Recognize the text on one page image.
    fn extract_text(
        &self,
        image: &PageImage,
        page_number: u32,
        options: &OcrOptions,
    ) -> Result<Vec<ExtractedElement>, OcrError>;

    fn supported_features(&self) -> Vec<String> {
        vec!["text_extraction".to_string()]
    }

    /// Human-readable configuration problems; empty when fully configured.
    fn validate_configuration(&self) -> Vec<String> {
        Vec::new()
    }
}
