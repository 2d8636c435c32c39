//! Page-level views over a finished extraction result.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::element::{BoundingBox, ExtractedElement};
use super::result::StructuredData;

/// Element as it appears inside a page result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageElement {
    pub text: String,
    pub confidence: f64,
    pub bbox: Option<BoundingBox>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl From<&ExtractedElement> for PageElement {
    fn from(element: &ExtractedElement) -> Self {
        Self {
            text: element.text.clone(),
            confidence: element.confidence,
            bbox: element.bbox,
            metadata: element.metadata.clone(),
        }
    }
}

/// Everything recovered for a single page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub page_number: u32,
    pub text_elements: Vec<PageElement>,
    pub table_elements: Vec<PageElement>,
    pub extracted_text: String,
    pub structured_data: StructuredData,
    pub element_count: usize,
    pub confidence_avg: f64,
}

impl PageResult {
    pub fn empty(page_number: u32) -> Self {
        Self {
            page_number,
            text_elements: Vec::new(),
            table_elements: Vec::new(),
            extracted_text: String::new(),
            structured_data: StructuredData::new(),
            element_count: 0,
            confidence_avg: 0.0,
        }
    }
}

/// A page selected by keyword filtering, or by the all-pages fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredPage {
    #[serde(flatten)]
    pub page: PageResult,
    pub matched_keywords: Vec<String>,
    pub keyword_count: usize,
    pub fallback_extraction: bool,
}

/// Trimmed page record written by the enhanced export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimalPage {
    pub page_number: u32,
    pub extracted_text: String,
    pub matched_keywords: Vec<String>,
    pub confidence_avg: f64,
    pub element_count: usize,
    pub is_fallback: bool,
}

impl From<&FilteredPage> for MinimalPage {
    fn from(filtered: &FilteredPage) -> Self {
        Self {
            page_number: filtered.page.page_number,
            extracted_text: filtered.page.extracted_text.clone(),
            matched_keywords: filtered.matched_keywords.clone(),
            confidence_avg: filtered.page.confidence_avg,
            element_count: filtered.page.element_count,
            is_fallback: filtered.fallback_extraction,
        }
    }
}
