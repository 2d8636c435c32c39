//! Recognized content units produced by the text and OCR stages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Kind of content an element carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Text,
    Table,
    Title,
    Figure,
}

impl ElementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Table => "table",
            Self::Title => "title",
            Self::Figure => "figure",
        }
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Axis-aligned rectangle in page-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Confidence of the box itself (0.0 - 1.0).
    pub confidence: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64, confidence: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    /// Smallest box containing both boxes. Confidence is the mean of the two.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        BoundingBox {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
            confidence: (self.confidence + other.confidence) / 2.0,
        }
    }
}

/// One recognized unit of text or table content.
///
/// Elements are created by the OCR stage and are not mutated after
/// acceptance; the text-cleaning filter normalizes `text` before that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedElement {
    pub text: String,
    pub element_type: ElementType,
    /// 1-based page number.
    pub page_number: u32,
    /// Recognition confidence (0.0 - 1.0).
    pub confidence: f64,
    #[serde(default)]
    pub bbox: Option<BoundingBox>,
    /// Engine-specific metadata (engine name, model, usage, ...).
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl ExtractedElement {
    pub fn new(text: impl Into<String>, page_number: u32, confidence: f64) -> Self {
        Self {
            text: text.into(),
            element_type: ElementType::Text,
            page_number,
            confidence: confidence.clamp(0.0, 1.0),
            bbox: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_type(mut self, element_type: ElementType) -> Self {
        self.element_type = element_type;
        self
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}
