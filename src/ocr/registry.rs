//! Registry of OCR engines with availability- and priority-based selection.
//!
//! Availability is re-checked on every query rather than cached, so an
//! engine that was rate limited or offline can come back without being
//! re-registered.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::{debug, info};

use super::engine::{OcrEngine, OcrError};

/// Diagnostic snapshot of one registered engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineInfo {
    pub available: bool,
    pub priority: i32,
    pub reason: String,
    pub features: Vec<String>,
}

/// Holds the registered engines in registration order.
///
/// Registration state sits behind a lock so one registry can be shared by
/// processors on several threads.
#[derive(Default)]
pub struct EngineRegistry {
    engines: RwLock<Vec<Arc<dyn OcrEngine>>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an engine. A second registration under the same name
    /// replaces the first one in its original slot.
    pub fn register(&self, engine: Arc<dyn OcrEngine>) {
        let mut engines = self.engines.write().unwrap_or_else(|e| e.into_inner());
        if let Some(slot) = engines.iter_mut().find(|e| e.name() == engine.name()) {
            debug!("Replacing OCR engine registration: {}", engine.name());
            *slot = engine;
        } else {
            info!(
                "Registered OCR engine: {} (priority {})",
                engine.name(),
                engine.priority()
            );
            engines.push(engine);
        }
    }

    /// Remove an engine by name. Returns whether one was registered.
    pub fn unregister(&self, name: &str) -> bool {
        let mut engines = self.engines.write().unwrap_or_else(|e| e.into_inner());
        let before = engines.len();
        engines.retain(|e| e.name() != name);
        engines.len() != before
    }

    /// Names of all registered engines, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.snapshot().iter().map(|e| e.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All registered engines, available or not.
    pub fn all(&self) -> Vec<Arc<dyn OcrEngine>> {
        self.snapshot()
    }

    /// Engines whose availability check currently succeeds, highest priority first.
    /// Ties keep registration order.
    pub fn get_available_engines(&self) -> Vec<Arc<dyn OcrEngine>> {
        let mut available: Vec<Arc<dyn OcrEngine>> = self
            .snapshot()
            .into_iter()
            .filter(|engine| {
                let status = engine.check_availability();
                if !status.available {
                    debug!("OCR engine {} unavailable: {}", engine.name(), status.reason);
                }
                status.available
            })
            .collect();
        // sort_by is stable
        available.sort_by(|a, b| b.priority().cmp(&a.priority()));
        available
    }

    /// Pick an engine: the named one if requested, otherwise the best
    /// available one.
    pub fn select_engine(&self, requested: Option<&str>) -> Result<Arc<dyn OcrEngine>, OcrError> {
        match requested {
            Some(name) => {
                let engine = self
                    .snapshot()
                    .into_iter()
                    .find(|e| e.name() == name)
                    .ok_or_else(|| OcrError::EngineUnavailable {
                        name: name.to_string(),
                        reason: "not registered".to_string(),
                    })?;
                let status = engine.check_availability();
                if !status.available {
                    return Err(OcrError::EngineUnavailable {
                        name: name.to_string(),
                        reason: status.reason,
                    });
                }
                Ok(engine)
            }
            None => self
                .get_available_engines()
                .into_iter()
                .next()
                .ok_or(OcrError::NoEngineAvailable),
        }
    }

    /// Availability and priority of every registered engine, checked now.
    pub fn get_engine_info(&self) -> BTreeMap<String, EngineInfo> {
        self.snapshot()
            .iter()
            .map(|engine| {
                let status = engine.check_availability();
                (
                    engine.name().to_string(),
                    EngineInfo {
                        available: status.available,
                        priority: engine.priority(),
                        reason: status.reason,
                        features: engine.supported_features(),
                    },
                )
            })
            .collect()
    }

    /// Configuration issues per engine, omitting engines with none.
    pub fn validate_configuration(&self) -> BTreeMap<String, Vec<String>> {
        self.snapshot()
            .iter()
            .filter_map(|engine| {
                let issues = engine.validate_configuration();
                (!issues.is_empty()).then(|| (engine.name().to_string(), issues))
            })
            .collect()
    }

    fn snapshot(&self) -> Vec<Arc<dyn OcrEngine>> {
        self.engines
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
