//! Page-level results and keyword filtering on top of the base pipeline.
//!
//! A finished `ExtractionResult` is split back into pages, patterns are
//! re-run per page, and pages mentioning one of the target keywords are
//! selected. When no page matches, every page with text is returned instead
//! and flagged as a fallback so callers always get something to read.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::context::ProcessOptions;
use super::export::write_json;
use super::processor::Processor;
use crate::error::ProcessorError;
use crate::models::{
    DocumentType, ElementType, ExtractionResult, FilteredPage, MinimalPage, PageElement,
    PageResult, ProcessingMethod,
};

/// Confidence given to a page chunk cut from flat text.
const SPLIT_PAGE_CONFIDENCE: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub document_id: String,
    pub filename: String,
    pub total_pages: u32,
    pub processing_time: f64,
    pub confidence: f64,
    pub document_type: DocumentType,
    pub processing_method: ProcessingMethod,
    pub target_keywords: Vec<String>,
}

/// Pages selected by keyword, or every non-empty page on fallback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilteredPages {
    pub matching_pages: Vec<FilteredPage>,
    pub total_matching_pages: usize,
    /// Target keywords found anywhere, in target order.
    pub keywords_found: Vec<String>,
    pub fallback_used: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedResult {
    pub document_info: DocumentInfo,
    pub full_document_results: ExtractionResult,
    pub page_level_results: Vec<PageResult>,
    pub filtered_pages: FilteredPages,
}

/// The trimmed output file of the page flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimalExport {
    pub document_info: DocumentInfo,
    pub filtered_pages_only: Vec<MinimalPage>,
}

impl EnhancedResult {
    pub fn minimal_export(&self) -> MinimalExport {
        MinimalExport {
            document_info: self.document_info.clone(),
            filtered_pages_only: self
                .filtered_pages
                .matching_pages
                .iter()
                .map(MinimalPage::from)
                .collect(),
        }
    }

    pub fn save_minimal(&self, path: &Path) -> Result<(), ProcessorError> {
        write_json(&self.minimal_export(), path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSummary {
    pub total_pages: u32,
    pub pages_processed: usize,
    pub pages_with_keywords: usize,
    pub percentage_with_keywords: f64,
    /// `keyword_filter` or `full_text_fallback`.
    pub extraction_method: String,
    pub percentage_processed: f64,
    pub keywords_found: Vec<String>,
    pub page_numbers_processed: Vec<u32>,
    pub average_confidence: f64,
    pub total_elements: usize,
}

pub struct EnhancedProcessor {
    processor: Processor,
    target_keywords: Vec<String>,
}

impl EnhancedProcessor {
    /// Wrap `processor`, targeting the keywords from its configuration.
    pub fn new(processor: Processor) -> Self {
        let keywords = processor.config().keywords.targets.clone();
        Self::with_keywords(processor, keywords)
    }

    pub fn with_keywords(processor: Processor, keywords: Vec<String>) -> Self {
        let mut enhanced = Self {
            processor,
            target_keywords: Vec::new(),
        };
        enhanced.add_custom_keywords(&keywords);
        enhanced
    }

    pub fn processor(&self) -> &Processor {
        &self.processor
    }

    pub fn target_keywords(&self) -> &[String] {
        &self.target_keywords
    }

    /// Add keywords to the target set. Blank entries and case-insensitive
    /// duplicates are ignored. Returns how many were added.
    pub fn add_custom_keywords<S: AsRef<str>>(&mut self, keywords: &[S]) -> usize {
        let mut added = 0;
        for keyword in keywords {
            let keyword = keyword.as_ref().trim();
            if keyword.is_empty() {
                continue;
            }
            let upper = keyword.to_uppercase();
            if self.target_keywords.iter().any(|k| k.to_uppercase() == upper) {
                continue;
            }
            self.target_keywords.push(keyword.to_string());
            added += 1;
        }
        if added > 0 {
            debug!("Target keywords: {:?}", self.target_keywords);
        }
        added
    }

    /// Run the full pipeline, then derive and filter page results.
    pub fn process_with_page_results(
        &self,
        path: &Path,
        options: &ProcessOptions,
    ) -> Result<EnhancedResult, ProcessorError> {
        let result = self.processor.process(path, options)?;
        let page_level_results = self.generate_page_results(&result);
        let filtered_pages = self.filter_pages_by_keywords(&page_level_results);

        info!(
            "{}: {} of {} pages selected{}",
            result.filename,
            filtered_pages.total_matching_pages,
            result.total_pages,
            if filtered_pages.fallback_used {
                " (fallback)"
            } else {
                ""
            }
        );

        Ok(EnhancedResult {
            document_info: DocumentInfo {
                document_id: result.document_id.clone(),
                filename: result.filename.clone(),
                total_pages: result.total_pages,
                processing_time: result.processing_metrics.processing_time,
                confidence: result.confidence,
                document_type: result.document_type,
                processing_method: result.processing_method,
                target_keywords: self.target_keywords.clone(),
            },
            full_document_results: result,
            page_level_results,
            filtered_pages,
        })
    }

    /// One `PageResult` per page, from elements when there are any and from
    /// an even split of the flat text otherwise.
    pub fn generate_page_results(&self, result: &ExtractionResult) -> Vec<PageResult> {
        let mut pages: Vec<PageResult> = (1..=result.total_pages).map(PageResult::empty).collect();

        if result.elements.is_empty() {
            if !result.extracted_text.trim().is_empty() {
                warn!(
                    "{} has no elements; splitting text evenly across {} pages",
                    result.filename, result.total_pages
                );
                let chunks = split_text_by_pages(&result.extracted_text, result.total_pages);
                for (page, chunk) in pages.iter_mut().zip(chunks) {
                    page.extracted_text = chunk.trim().to_string();
                    page.element_count = 1;
                    page.confidence_avg = SPLIT_PAGE_CONFIDENCE;
                }
            }
        } else {
            let mut confidence_sums = vec![0.0; pages.len()];
            for element in &result.elements {
                let index = element.page_number as usize;
                let Some(page) = index.checked_sub(1).and_then(|i| pages.get_mut(i)) else {
                    debug!("Element on page {} outside document, skipped", element.page_number);
                    continue;
                };
                let page_element = PageElement::from(element);
                match element.element_type {
                    ElementType::Table => page.table_elements.push(page_element),
                    _ => page.text_elements.push(page_element),
                }
                page.extracted_text.push_str(&element.text);
                page.extracted_text.push(' ');
                page.element_count += 1;
                confidence_sums[index - 1] += element.confidence;
            }
            for (page, sum) in pages.iter_mut().zip(confidence_sums) {
                page.extracted_text = page.extracted_text.trim().to_string();
                if page.element_count > 0 {
                    page.confidence_avg = sum / page.element_count as f64;
                }
            }
        }

        let patterns = self.processor.pattern_processor();
        for page in pages.iter_mut().filter(|p| !p.extracted_text.is_empty()) {
            page.structured_data = patterns.extract_all(&page.extracted_text);
        }
        pages
    }

    /// Pages containing a target keyword, or every non-empty page when none do.
    pub fn filter_pages_by_keywords(&self, pages: &[PageResult]) -> FilteredPages {
        let targets: Vec<(String, &String)> = self
            .target_keywords
            .iter()
            .map(|k| (k.to_uppercase(), k))
            .collect();

        let matching_pages: Vec<FilteredPage> = pages
            .iter()
            .filter_map(|page| {
                let text = page.extracted_text.to_uppercase();
                let matched: Vec<String> = targets
                    .iter()
                    .filter(|(upper, _)| text.contains(upper.as_str()))
                    .map(|(_, keyword)| (*keyword).clone())
                    .collect();
                if matched.is_empty() {
                    return None;
                }
                Some(FilteredPage {
                    page: page.clone(),
                    keyword_count: matched.len(),
                    matched_keywords: matched,
                    fallback_extraction: false,
                })
            })
            .collect();

        if matching_pages.is_empty() {
            warn!("No pages matched target keywords; returning all pages with text");
            let fallback: Vec<FilteredPage> = pages
                .iter()
                .filter(|p| !p.extracted_text.trim().is_empty())
                .map(|page| FilteredPage {
                    page: page.clone(),
                    matched_keywords: Vec::new(),
                    keyword_count: 0,
                    fallback_extraction: true,
                })
                .collect();
            return FilteredPages {
                total_matching_pages: fallback.len(),
                matching_pages: fallback,
                keywords_found: Vec::new(),
                fallback_used: true,
            };
        }

        let keywords_found = self
            .target_keywords
            .iter()
            .filter(|k| {
                matching_pages
                    .iter()
                    .any(|p| p.matched_keywords.contains(k))
            })
            .cloned()
            .collect();

        FilteredPages {
            total_matching_pages: matching_pages.len(),
            matching_pages,
            keywords_found,
            fallback_used: false,
        }
    }

    pub fn get_page_summary(&self, result: &EnhancedResult) -> PageSummary {
        let filtered = &result.filtered_pages;
        let total_pages = result.document_info.total_pages;
        let pages = &filtered.matching_pages;

        let pages_processed = pages.len();
        // Fallback pages are reported as filtered pages too; the method field
        // tells the two apart.
        let pages_with_keywords = pages_processed;
        let percent_of_total = |n: usize| {
            if total_pages == 0 {
                0.0
            } else {
                n as f64 / total_pages as f64 * 100.0
            }
        };
        let average_confidence = if pages.is_empty() {
            0.0
        } else {
            pages.iter().map(|p| p.page.confidence_avg).sum::<f64>() / pages.len() as f64
        };

        PageSummary {
            total_pages,
            pages_processed,
            pages_with_keywords,
            percentage_with_keywords: percent_of_total(pages_with_keywords),
            extraction_method: if filtered.fallback_used {
                "full_text_fallback".to_string()
            } else {
                "keyword_filter".to_string()
            },
            percentage_processed: percent_of_total(pages_processed),
            keywords_found: filtered.keywords_found.clone(),
            page_numbers_processed: pages.iter().map(|p| p.page.page_number).collect(),
            average_confidence,
            total_elements: pages.iter().map(|p| p.page.element_count).sum(),
        }
    }
}

/// Cut `text` into `total_pages` chunks of equal character count, the last
/// chunk taking the remainder.
///
/// Page boundaries in the original document are not respected; this is only
/// used when a result carries flat text and no per-page elements.
pub fn split_text_by_pages(text: &str, total_pages: u32) -> Vec<String> {
    if total_pages == 0 {
        return Vec::new();
    }
    let chars: Vec<char> = text.chars().collect();
    let pages = total_pages as usize;
    let per_page = chars.len() / pages;

    (0..pages)
        .map(|i| {
            let start = i * per_page;
            let end = if i + 1 == pages { chars.len() } else { start + per_page };
            chars[start..end].iter().collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::extract::{PdfDocument, PdfError, PdfTextExtractor, RenderRequest};
    use crate::models::ExtractedElement;
    use crate::ocr::EngineRegistry;
    use std::sync::Arc;

    struct NoPdf;

    impl PdfTextExtractor for NoPdf {
        fn name(&self) -> &str {
            "none"
        }

        fn extract(&self, _path: &Path, _request: &RenderRequest) -> Result<PdfDocument, PdfError> {
            Ok(PdfDocument::new(0, Vec::new()))
        }
    }

    fn enhanced() -> EnhancedProcessor {
        let processor = Processor::with_components(
            Config::default(),
            Arc::new(EngineRegistry::new()),
            Arc::new(NoPdf),
        );
        EnhancedProcessor::new(processor)
    }

    fn page(number: u32, text: &str) -> PageResult {
        PageResult {
            extracted_text: text.to_string(),
            element_count: 1,
            confidence_avg: 0.9,
            ..PageResult::empty(number)
        }
    }

    #[test]
    fn test_filter_selects_matching_page() {
        let pages = vec![page(1, "sheet s-001 design criteria per ibc"), page(2, "no match here")];
        let filtered = enhanced().filter_pages_by_keywords(&pages);

        assert!(!filtered.fallback_used);
        assert_eq!(filtered.total_matching_pages, 1);
        let first = &filtered.matching_pages[0];
        assert_eq!(first.page.page_number, 1);
        assert_eq!(first.matched_keywords, vec!["DESIGN CRITERIA".to_string()]);
        assert_eq!(first.keyword_count, 1);
        assert!(!first.fallback_extraction);
        assert_eq!(filtered.keywords_found, vec!["DESIGN CRITERIA".to_string()]);
    }

    #[test]
    fn test_filter_falls_back_to_non_empty_pages() {
        let pages = vec![page(1, "plan view"), page(2, "   "), page(3, "elevations")];
        let filtered = enhanced().filter_pages_by_keywords(&pages);

        assert!(filtered.fallback_used);
        let numbers: Vec<u32> = filtered.matching_pages.iter().map(|p| p.page.page_number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert!(filtered.matching_pages.iter().all(|p| p.fallback_extraction));
        assert!(filtered.keywords_found.is_empty());
    }

    #[test]
    fn test_custom_keywords() {
        let mut processor = enhanced();
        let added = processor.add_custom_keywords(&["Foundation Notes", "design criteria", ""]);
        assert_eq!(added, 1);
        assert_eq!(processor.target_keywords().len(), 4);

        let filtered = processor.filter_pages_by_keywords(&[page(1, "FOUNDATION NOTES: 3000 PSI")]);
        assert_eq!(
            filtered.matching_pages[0].matched_keywords,
            vec!["Foundation Notes".to_string()]
        );
    }

    #[test]
    fn test_page_results_from_elements() {
        let mut result = ExtractionResult::new("doc", "a.pdf");
        result.record_page_count(3);
        result.elements.push(ExtractedElement::new("GENERAL NOTES", 1, 0.8));
        result.elements.push(ExtractedElement::new("ASTM A992", 1, 0.6));
        result
            .elements
            .push(ExtractedElement::new("W12x26 | 20'-0\"", 3, 0.5).with_type(ElementType::Table));

        let pages = enhanced().generate_page_results(&result);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].extracted_text, "GENERAL NOTES ASTM A992");
        assert_eq!(pages[0].element_count, 2);
        assert!((pages[0].confidence_avg - 0.7).abs() < 1e-9);
        assert!(pages[0].structured_data.contains_key("material_specs"));
        assert_eq!(pages[1].element_count, 0);
        assert_eq!(pages[1].confidence_avg, 0.0);
        assert_eq!(pages[2].table_elements.len(), 1);
        assert!(pages[2].text_elements.is_empty());
    }

    #[test]
    fn test_page_results_split_flat_text() {
        let mut result = ExtractionResult::new("doc", "a.pdf");
        result.record_page_count(2);
        result.append_text("abcdefg");

        let pages = enhanced().generate_page_results(&result);
        assert_eq!(pages[0].extracted_text, "abc");
        assert_eq!(pages[1].extracted_text, "defg");
        assert_eq!(pages[1].confidence_avg, SPLIT_PAGE_CONFIDENCE);
    }

    #[test]
    fn test_split_text_by_pages() {
        assert_eq!(split_text_by_pages("aabbccd", 3), vec!["aa", "bb", "ccd"]);
        assert_eq!(split_text_by_pages("é€ü", 2), vec!["é", "€ü"]);
        assert!(split_text_by_pages("text", 0).is_empty());
    }

    #[test]
    fn test_page_summary() {
        let processor = enhanced();
        let pages = vec![page(1, "GENERAL STRUCTURAL NOTES"), page(2, "details"), page(3, "")];
        let filtered = processor.filter_pages_by_keywords(&pages);
        let result = EnhancedResult {
            document_info: DocumentInfo {
                document_id: "doc".into(),
                filename: "a.pdf".into(),
                total_pages: 3,
                processing_time: 1.0,
                confidence: 0.5,
                document_type: DocumentType::GeneralNotes,
                processing_method: ProcessingMethod::TextOnly,
                target_keywords: processor.target_keywords().to_vec(),
            },
            full_document_results: ExtractionResult::new("doc", "a.pdf"),
            page_level_results: pages,
            filtered_pages: filtered,
        };

        let summary = processor.get_page_summary(&result);
        assert_eq!(summary.extraction_method, "keyword_filter");
        assert_eq!(summary.pages_with_keywords, 1);
        assert!((summary.percentage_with_keywords - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.page_numbers_processed, vec![1]);
        assert_eq!(summary.total_elements, 1);

        let export = result.minimal_export();
        assert_eq!(export.filtered_pages_only.len(), 1);
        assert!(!export.filtered_pages_only[0].is_fallback);
    }

    #[test]
    fn test_page_summary_on_fallback() {
        let processor = enhanced();
        let pages = vec![page(1, "plan view"), page(2, "elevations"), page(3, ""), page(4, "")];
        let filtered = processor.filter_pages_by_keywords(&pages);
        assert!(filtered.fallback_used);
        let result = EnhancedResult {
            document_info: DocumentInfo {
                document_id: "doc".into(),
                filename: "a.pdf".into(),
                total_pages: 4,
                processing_time: 1.0,
                confidence: 0.5,
                document_type: DocumentType::General,
                processing_method: ProcessingMethod::TextOnly,
                target_keywords: processor.target_keywords().to_vec(),
            },
            full_document_results: ExtractionResult::new("doc", "a.pdf"),
            page_level_results: pages,
            filtered_pages: filtered,
        };

        let summary = processor.get_page_summary(&result);
        assert_eq!(summary.extraction_method, "full_text_fallback");
        assert_eq!(summary.pages_processed, 2);
        assert_eq!(summary.pages_with_keywords, 2);
        assert_eq!(summary.percentage_with_keywords, 50.0);
        assert_eq!(summary.percentage_processed, 50.0);
        assert!(summary.keywords_found.is_empty());
    }
}
