//! Cleaning and quality filtering for recognized text.

use crate::models::ExtractedElement;

const PUNCTUATION_ONLY: &[&str] = &[".", ",", ";", ":", "!", "?", "-", "_", "|"];

fn is_dash(c: char) -> bool {
    matches!(c, '-' | '\u{2013}' | '\u{2014}') || c.is_whitespace()
}

/// Collapse whitespace, strip surrounding dashes and drop lone punctuation.
pub fn clean_text(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let cleaned = collapsed.trim_matches(is_dash);
    if PUNCTUATION_ONLY.contains(&cleaned) {
        return String::new();
    }
    cleaned.to_string()
}

/// Whether cleaned text is worth keeping.
///
/// Rejects short strings, control characters, rule lines made of `.-_|`
/// and anything less than 30% alphanumeric.
pub fn is_valid_text(text: &str, min_length: usize) -> bool {
    let trimmed = text.trim();
    if trimmed.chars().count() < min_length || trimmed.is_empty() {
        return false;
    }
    if text.chars().any(|c| c.is_control()) {
        return false;
    }
    if text.chars().all(|c| matches!(c, '.' | '-' | '_' | '|')) {
        return false;
    }
    let total = text.chars().count();
    let alnum = text.chars().filter(|c| c.is_alphanumeric()).count();
    alnum as f64 / total as f64 >= 0.3
}

/// Drop low-confidence or junk elements, normalizing the text of the rest.
pub fn filter_low_quality_elements(
    elements: Vec<ExtractedElement>,
    min_confidence: f64,
    min_text_length: usize,
) -> Vec<ExtractedElement> {
    elements
        .into_iter()
        .filter(|e| e.confidence >= min_confidence)
        .filter_map(|mut e| {
            let cleaned = clean_text(&e.text);
            if !is_valid_text(&cleaned, min_text_length) {
                return None;
            }
            e.text = cleaned;
            Some(e)
        })
        .collect()
}
