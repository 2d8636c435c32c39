//! Overall document confidence.
//!
//! A fixed weighted blend of four signals: mean element confidence (0.4),
//! pattern-category coverage (0.3), table count (0.2) and text length (0.1).
//! The result is rounded to three decimals.

use serde::{Deserialize, Serialize};

use crate::models::ExtractionResult;

const ELEMENT_WEIGHT: f64 = 0.4;
const PATTERN_WEIGHT: f64 = 0.3;
const TABLE_WEIGHT: f64 = 0.2;
const COVERAGE_WEIGHT: f64 = 0.1;

/// Tables needed for a full table score.
const FULL_TABLE_COUNT: f64 = 5.0;
/// Characters needed for a full coverage score.
const FULL_COVERAGE_CHARS: f64 = 5000.0;

/// The four component scores, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    pub avg_element_confidence: f64,
    pub pattern_score: f64,
    pub table_score: f64,
    pub coverage_score: f64,
}

impl ConfidenceBreakdown {
    /// Component scores for `result`, given how many pattern categories exist.
    pub fn from_result(result: &ExtractionResult, total_known_categories: usize) -> Self {
        let positive: Vec<f64> = result
            .elements
            .iter()
            .map(|e| e.confidence)
            .filter(|c| *c > 0.0)
            .collect();
        let avg_element_confidence = if positive.is_empty() {
            0.0
        } else {
            positive.iter().sum::<f64>() / positive.len() as f64
        };

        let categories_found = result.structured_data.len() as f64;
        let pattern_score =
            (categories_found / (total_known_categories as f64 * 0.2).max(1.0)).min(1.0);
        let table_score = (result.tables.len() as f64 / FULL_TABLE_COUNT).min(1.0);
        let coverage_score =
            (result.extracted_text.chars().count() as f64 / FULL_COVERAGE_CHARS).min(1.0);

        Self {
            avg_element_confidence,
            pattern_score,
            table_score,
            coverage_score,
        }
    }

    /// Weighted blend, rounded to three decimals.
    pub fn combine(&self) -> f64 {
        let raw = ELEMENT_WEIGHT * self.avg_element_confidence
            + PATTERN_WEIGHT * self.pattern_score
            + TABLE_WEIGHT * self.table_score
            + COVERAGE_WEIGHT * self.coverage_score;
        round3(raw.clamp(0.0, 1.0))
    }
}

/// Overall confidence for a stage-final result. Zero when nothing was
/// recognized as an element.
pub fn calculate_confidence(result: &ExtractionResult, total_known_categories: usize) -> f64 {
    if result.elements.is_empty() {
        return 0.0;
    }
    ConfidenceBreakdown::from_result(result, total_known_categories).combine()
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
