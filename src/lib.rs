//! cde-ocr - metadata extraction for scanned engineering drawings.
//!
//! PDFs are read through poppler, scanned pages are recognized by one of
//! several OCR engines, and the recovered text is mined for building codes,
//! material specs, dimensions and tables. The result carries an overall
//! confidence score and can be narrowed to the pages that mention a set of
//! target keywords.

pub mod config;
pub mod error;
pub mod extract;
pub mod models;
pub mod ocr;
pub mod pipeline;
pub mod utils;

pub use config::Config;
pub use error::{ProcessorError, StageError};
pub use pipeline::{EnhancedProcessor, ProcessOptions, Processor};
