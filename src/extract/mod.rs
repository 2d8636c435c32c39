//! Stage collaborators: PDF access, image preprocessing, pattern matching,
//! layout analysis, classification and text cleanup.

mod classify;
mod enhance;
mod patterns;
mod pdf;
mod spatial;
pub mod text;

pub use classify::DocumentClassifier;
pub use enhance::ImageEnhancer;
pub use patterns::{PatternCatalog, PatternProcessor};
pub use pdf::{PdfDocument, PdfError, PdfTextExtractor, PopplerExtractor, RenderRequest};
pub use spatial::SpatialAnalyzer;
