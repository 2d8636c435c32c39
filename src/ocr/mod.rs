//! OCR engines and engine selection.
//!
//! Engines implement `OcrEngine` and are held by an `EngineRegistry`.
//! `build_default_engines` is the static registration list: each configured
//! engine is constructed independently and a construction failure only drops
//! that engine.

mod claude;
mod engine;
mod registry;
mod tesseract;

use std::sync::Arc;

use tracing::{debug, warn};

pub use claude::ClaudeEngine;
pub use engine::{Availability, OcrEngine, OcrError, OcrOptions, PageImage};
pub use registry::{EngineInfo, EngineRegistry};
pub use tesseract::TesseractEngine;

use crate::config::OcrSettings;

/// Names accepted in `ocr.engines`.
pub const KNOWN_ENGINES: &[&str] = &["claude", "tesseract"];

fn construct(name: &str, settings: &OcrSettings) -> Result<Arc<dyn OcrEngine>, OcrError> {
    match name {
        "claude" => {
            let engine = ClaudeEngine::new(settings.anthropic_api_key.clone(), &settings.claude_model)?;
            Ok(Arc::new(engine))
        }
        "tesseract" => Ok(Arc::new(TesseractEngine::new())),
        other => Err(OcrError::Configuration {
            engine: other.to_string(),
            reason: format!("unknown engine (known: {})", KNOWN_ENGINES.join(", ")),
        }),
    }
}

/// Construct every engine enabled in `settings`, skipping ones that fail.
pub fn build_default_engines(settings: &OcrSettings) -> Vec<Arc<dyn OcrEngine>> {
    settings
        .engines
        .iter()
        .filter_map(|name| match construct(name, settings) {
            Ok(engine) => {
                debug!("Constructed OCR engine {}", name);
                Some(engine)
            }
            Err(e) => {
                warn!("OCR engine {} not registered: {}", name, e);
                None
            }
        })
        .collect()
}

/// Registry populated from `build_default_engines`.
pub fn default_registry(settings: &OcrSettings) -> EngineRegistry {
    let registry = EngineRegistry::new();
    for engine in build_default_engines(settings) {
        registry.register(engine);
    }
    registry
}
