//! Domain regex catalog and the processor that applies it.
//!
//! The catalog maps a category name to an ordered list of pattern strings.
//! `PatternProcessor` compiles it once (case-insensitive) and reports every
//! hit with its position and capture groups.

use std::collections::{BTreeMap, HashSet};

use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use crate::models::{PatternMatch, StructuredData};

const BUILDING_CODES: &[&str] = &[
    r"(?:IBC|International Building Code)\s*(\d{4})",
    r"(?:OBC|Ohio Building Code)\s*(\d{4})",
    r"(?:CBC|California Building Code)\s*(\d{4})",
    r"(?:FBC|Florida Building Code)\s*(\d{4})",
    r"(?:BCNYS|Building Code of New York State)\s*(\d{4})",
    r"(?:NYCBC|New York City Building Code)\s*(\d{4})",
    r"(?:Chicago Building Code)\s*(\d{4})",
    r"(?:EBC|Epcot Building Code|RCID|Reedy Creek Improvement District)\s*(\d{4})",
    r"(?:MSBC|Massachusetts State Building Code)\s*(?:(\d+)(?:th|st|nd|rd)\s*edition)",
    r"(?:ASCE|American Society of Civil Engineers)\s*7[-\s]*(\d{2})",
    r"ASCE\s*7[-\s]*(?:05|10|16|22)",
    r"(?:AISI|American Iron)\s*(\d{4})",
    r"(?:ASTM|Association Society for Testing)\s*([A-Z]\s*\d+)",
    r"ASTM\s*(?:C754|C645|A1003)",
    r"(?:AWS|American Welding Society)\s*(D\d+\.\d+)",
    r"AWS\s*D1\.3",
    r"(?:UFC|Unified Facilities Criteria)\s*(4-010-0[12])",
    r"DoD\s*(?:Minimum\s*)?(?:Antiterrorism|Standards)",
];

const MATERIAL_SPECS: &[&str] = &[
    r"(\d+)\s*(?:ga|gauge|gage|mils)\b",
    r#"(\d+(?:\.\d+)?)\s*(?:inch|in\.?|")\s*thick"#,
    r"Thickness[:\s]*(\d+(?:\.\d+)?)\s*(?:inch|in\.?|mm)",
    r"(\d+)\s*mil(?:s)?\b",
    r"Grade\s*(\d+)",
    r"(?:A36|grade\s*36)\s*ksi",
    r"(?:A992|GR50|grade\s*50)",
    r"ASTM\s*([A-Z]\s*\d+(?:[/-][A-Z]?\d+)*)",
    r"Type\s*([A-Z]?\d+[A-Z]*)",
    r"Class\s*([A-Z0-9]+)",
    r"(?:Yield\s*Strength|Tensile\s*Strength)[:\s]*(\d+(?:\.\d+)?)\s*(?:ksi|MPa)",
    r"(\d+)\s*ksi\s*(?:yield|material)",
    r"(\d+)\s*psi\s*(?:concrete|compressive)",
    r"(?:Normal|Light)\s*weight\s*concrete",
    r#"(?:Roof|Floor)\s*deck[:\s]*(\d+(?:\.\d+)?)["\s]*x\s*(\d+)\s*ga"#,
    r#"(\d+-\d+/\d+)["\s]*x\s*(\d+)\s*ga"#,
    r"(?:Stud|Track|Joist|Rafter|Header|Sill|Jamb|Lintel)",
    r"(?:Galvanized|Hot-dip\s*galvanized)",
    r"Zinc\s*coating\s*(G\d+)",
];

const PROJECT_INFO: &[&str] = &[
    r"Project[:\s]+([^\n]+)",
    r"(?:Location|Address)[:\s]+([^\n]+)",
    r"Date[:\s]+([^\n]+)",
    r"(?:Architect\s*of\s*Record|Architect)[:\s]*([^\n]+)",
    r"(?:Structural\s*Engineer\s*of\s*Record|Structural\s*Engineer|Engineer)[:\s]*([^\n]+)",
    r"Owner[:\s]*([^\n]+)",
    r"(?:Drawing|Sheet)\s*(?:Number|No\.?)[:\s]*([^\n]+)",
    r"Sheet[:\s]*(\d+)\s*of\s*(\d+)",
    r"Scale[:\s]*([^\n]+)",
    r"(?:Project|Job)\s*Number[:\s]*([^\n]+)",
    r"Revision[:\s]*([^\n]+)",
];

const DIMENSIONS: &[&str] = &[
    r#"(\d+)'-(\d+(?:\.\d+)?)""#,
    r"(\d+(?:\.\d+)?)'\s*(?:x|\*|by)\s*(\d+(?:\.\d+)?)'",
    r"(\d+(?:\.\d+)?)\s*(?:SF|sq\.?\s*ft\.?)",
    r"(\d+\.\d+)'",
    r#"(\d+(?:\.\d+)?)["\s]*o\.?c\.?"#,
    r#"(\d+(?:\.\d+)?)\s*(?:inches?|in\.?|")\s*(?:on\s*center|o\.c\.)"#,
    r"Elevation[:\s]*(\d+(?:\.\d+)?)",
    r"(?:AFF|Above\s*finished\s*floor)[:\s]*(\d+(?:\.\d+)?)",
    r"(?:TOS|T/Steel|Top\s*of\s*steel)[:\s]*(\d+(?:\.\d+)?)",
    r"(?:BOS|Bottom\s*of\s*steel)[:\s]*(\d+(?:\.\d+)?)",
    r"(?:JBE|Joist\s*bearing\s*elevation)[:\s]*(\d+(?:\.\d+)?)",
    r"Building\s*(?:Height|Area)[:\s]*([^\n]+)",
    r#"(?:Height|Width|Length|Depth|Diameter|Radius)[:\s]*(\d+(?:\.\d+)?)\s*(?:ft|feet|'|in|")"#,
    r"(?:Clear\s*(?:Height|Span)|Span)[:\s]*(\d+(?:\.\d+)?)\s*(?:ft|feet|')",
    r#"(\d+(?:\.\d+)?)\s*(?:inches?|in\.?|")\s*O\.?C\.?"#,
];

const LOAD_REQUIREMENTS: &[&str] = &[
    r"PSF\s+POUNDS\s+PER\s+SQUARE\s+FOOT",
    r"PSI\s+POUNDS\s+PER\s+SQUARE\s+INCH",
    r"KSI\s+KIPS\s+PER\s+SQUARE\s+INCH",
    r"KLF\s+KIPS\s+PER\s+LINEAR\s+FOOT",
    r"KSF\s+KIPS\s+PER\s+SQUARE\s+FOOT",
    r"(\d+(?:\.\d+)?)\s*(?:psf|kPa|psi|ksi|MPa)",
    r"(\d+(?:\.\d+)?)\s*(?:lb|lbs|kN|plf|kN/m)",
    r"(?:Dead|Live|Wind|Snow|Seismic)\s*Load[:\s]*(\d+(?:\.\d+)?)\s*psf",
    r"Basic\s*Wind\s*Speed[:\s]*(\d+)\s*mph",
    r"L\s*/\s*(240|360|480|600|720)",
    r"(?:Wall|Roof|Floor)\s*deflection[:\s]*L\s*/\s*(\d+)",
];

const STRUCTURAL_STEEL: &[&str] = &[
    r"(?:CFMF|CFF|Cold-formed\s*(?:metal\s*)?framing)",
    r"STRUCTURAL\s*STEEL",
    r"STEEL\s*(?:DECKING|DECK|TRUSS)",
    r"COLD-FORMED\s*METAL\s*FRAMING",
    r"W\s*(\d+)\s*[xX]\s*(\d+)",
    r"L\s*(\d+(?:\.\d+)?)\s*[xX]\s*(\d+(?:\.\d+)?)\s*[xX]\s*(\d+/\d+)",
    r"C\s*(\d+)\s*[xX]\s*(\d+)",
    r"HSS\s*(\d+(?:\.\d+)?)\s*[xX]\s*(\d+(?:\.\d+)?)\s*[xX]\s*(\d+/\d+)",
    r"AWS\s+(D\d+\.\d+)",
    r"E\s*(\d+[xX]?)",
    r#"AISC["\s]*([^"\n]+)"#,
    r"ASTM\s*A(\d+)",
    r"(?:A36|A992|GR50|Grade\s*(?:36|50))",
    r"(?:Stud|Track|Joist|Rafter|Parapet|Partition)",
    r"(?:Purlin|Girt)",
    r"(?:Shear\s*Wall|shearwall|X-bracing)",
    r"(?:Header|Sill|Jamb|Lintel)",
    r"(?:LLV|Long\s*leg\s*vertical)",
    r"(?:LLH|Long\s*leg\s*horizontal)",
];

const ABBREVIATIONS: &[&str] = &[
    r"(?:TOS|T/Steel|Top\s*of\s*steel)",
    r"(?:BOS|Bottom\s*of\s*steel)",
    r"(?:JBE|Joist\s*bearing\s*elevation)",
    r"(?:AFF|Above\s*finished\s*floor)",
    r"(?:T/Parapet|T\.O\.\s*Parapet|Top\s*of\s*parapet)",
    r"(?:B/Deck|Bottom\s*of\s*deck)",
    r"(?:T/Joist|Top\s*of\s*joist)",
    r"(?:LLV|Long\s*leg\s*vertical)",
    r"(?:LLH|Long\s*leg\s*horizontal)",
    r"(?:HSS|Hollow\s*structural\s*section)",
    r"(?:CFMF|CFF|Cold-formed\s*(?:metal\s*)?framing)",
    r"(?:CMU|Concrete\s*masonry\s*unit)",
    r"(?:UNO|Unless\s*noted\s*otherwise)",
    r"(?:VIF|Verify\s*in\s*field)",
    r"(?:RTU|Roof\s*top\s*unit)",
    r"(?:Section|Elevation|Plan)\s*(?:\d+|[A-Z]+)",
    r"(?:Building|Wall|Roof|Floor)\s*(?:section|elevation|plan)",
];

/// Category name to ordered pattern strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternCatalog {
    categories: BTreeMap<String, Vec<String>>,
}

impl PatternCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in engineering-drawing catalog.
    pub fn engineering_defaults() -> Self {
        let mut catalog = Self::new();
        for (name, patterns) in [
            ("building_codes", BUILDING_CODES),
            ("material_specs", MATERIAL_SPECS),
            ("project_info", PROJECT_INFO),
            ("dimensions", DIMENSIONS),
            ("load_requirements", LOAD_REQUIREMENTS),
            ("structural_steel", STRUCTURAL_STEEL),
            ("abbreviations", ABBREVIATIONS),
        ] {
            for pattern in patterns {
                catalog.add_pattern(name, pattern);
            }
        }
        catalog
    }

    pub fn add_pattern(&mut self, category: &str, pattern: &str) {
        self.categories
            .entry(category.to_string())
            .or_default()
            .push(pattern.to_string());
    }

    pub fn remove_pattern(&mut self, category: &str, pattern: &str) -> bool {
        let Some(patterns) = self.categories.get_mut(category) else {
            return false;
        };
        match patterns.iter().position(|p| p == pattern) {
            Some(index) => {
                patterns.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn patterns(&self, category: &str) -> &[String] {
        self.categories
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn pattern_count(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }
}

struct CompiledPattern {
    index: usize,
    regex: Regex,
}

/// Applies a compiled catalog to text.
pub struct PatternProcessor {
    compiled: BTreeMap<String, Vec<CompiledPattern>>,
}

impl Default for PatternProcessor {
    fn default() -> Self {
        Self::new(&PatternCatalog::engineering_defaults())
    }
}

impl PatternProcessor {
    /// Compile every pattern in the catalog. Invalid patterns are skipped
    /// with a warning; the rest of their category still applies.
    pub fn new(catalog: &PatternCatalog) -> Self {
        let mut compiled = BTreeMap::new();
        for category in catalog.categories() {
            let patterns: Vec<CompiledPattern> = catalog
                .patterns(category)
                .iter()
                .enumerate()
                .filter_map(|(index, source)| {
                    match RegexBuilder::new(source).case_insensitive(true).build() {
                        Ok(regex) => Some(CompiledPattern { index, regex }),
                        Err(e) => {
                            warn!("Skipping invalid pattern in {}: {} ({})", category, source, e);
                            None
                        }
                    }
                })
                .collect();
            compiled.insert(category.to_string(), patterns);
        }
        Self { compiled }
    }

    /// Number of categories, including ones whose patterns all failed to compile.
    pub fn category_count(&self) -> usize {
        self.compiled.len()
    }

    pub fn categories(&self) -> Vec<String> {
        self.compiled.keys().cloned().collect()
    }

    /// All matches of one category's patterns, ordered by position.
    ///
    /// Overlapping hits from different patterns with the same span are
    /// reported once, under the first pattern that produced them.
    pub fn apply(&self, category: &str, text: &str) -> Vec<PatternMatch> {
        let Some(patterns) = self.compiled.get(category) else {
            return Vec::new();
        };
        let mut matches: Vec<PatternMatch> = Vec::new();
        let mut spans: HashSet<(usize, usize)> = HashSet::new();
        for pattern in patterns {
            for caps in pattern.regex.captures_iter(text) {
                let Some(whole) = caps.get(0) else { continue };
                if whole.as_str().trim().is_empty() {
                    continue;
                }
                if !spans.insert((whole.start(), whole.end())) {
                    continue;
                }
                matches.push(PatternMatch {
                    text: whole.as_str().trim().to_string(),
                    groups: caps
                        .iter()
                        .skip(1)
                        .map(|g| g.map(|g| g.as_str().trim().to_string()))
                        .collect(),
                    start: whole.start(),
                    end: whole.end(),
                    pattern_index: pattern.index,
                });
            }
        }
        matches.sort_by_key(|m| (m.start, m.end));
        matches
    }

    /// Apply every category, keeping only categories with at least one hit.
    pub fn extract_all(&self, text: &str) -> StructuredData {
        let data: StructuredData = self
            .compiled
            .keys()
            .filter_map(|category| {
                let matches = self.apply(category, text);
                (!matches.is_empty()).then(|| (category.clone(), matches))
            })
            .collect();
        debug!(
            "Pattern extraction found {} categories in {} chars",
            data.len(),
            text.len()
        );
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_has_seven_categories() {
        let catalog = PatternCatalog::engineering_defaults();
        let names: Vec<&str> = catalog.categories().collect();
        assert_eq!(names.len(), 7);
        assert!(names.contains(&"building_codes"));
        assert!(names.contains(&"abbreviations"));

        let processor = PatternProcessor::new(&catalog);
        assert_eq!(processor.category_count(), 7);
    }

    #[test]
    fn test_building_code_capture() {
        let processor = PatternProcessor::default();
        let hits = processor.apply("building_codes", "Designed per IBC 2018 and ASCE 7-16.");
        let ibc = hits.iter().find(|m| m.text == "IBC 2018").unwrap();
        assert_eq!(ibc.groups, vec![Some("2018".to_string())]);
        assert!(hits.iter().any(|m| m.text.starts_with("ASCE 7-16")));
    }

    #[test]
    fn test_case_insensitive_and_sorted() {
        let processor = PatternProcessor::default();
        let hits = processor.apply("load_requirements", "live load: 40 PSF, roof 20 psf");
        assert!(!hits.is_empty());
        assert!(hits.windows(2).all(|w| w[0].start <= w[1].start));
    }

    #[test]
    fn test_extract_all_omits_empty_categories() {
        let processor = PatternProcessor::default();
        let data = processor.extract_all("STRUCTURAL STEEL: W14x30 beams");
        assert!(data.contains_key("structural_steel"));
        assert!(!data.contains_key("building_codes"));
        assert!(data.values().all(|v| !v.is_empty()));
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let mut catalog = PatternCatalog::new();
        catalog.add_pattern("custom", "(unclosed");
        catalog.add_pattern("custom", r"SHEET\s+S-\d+");
        let processor = PatternProcessor::new(&catalog);
        let hits = processor.apply("custom", "see sheet S-201");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].pattern_index, 1);
    }

    #[test]
    fn test_duplicate_spans_reported_once() {
        let mut catalog = PatternCatalog::new();
        catalog.add_pattern("members", "Joist");
        catalog.add_pattern("members", "(?:Stud|Joist)");
        let processor = PatternProcessor::new(&catalog);
        let hits = processor.apply("members", "Joist");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].pattern_index, 0);

        catalog.add_pattern("members", r"Joist\s+\d+");
        let processor = PatternProcessor::new(&catalog);
        let hits = processor.apply("members", "Stud, Joist 12, Joist");
        let spans: Vec<(usize, usize, usize)> =
            hits.iter().map(|m| (m.start, m.end, m.pattern_index)).collect();
        assert_eq!(spans, vec![(0, 4, 1), (6, 11, 0), (6, 14, 2), (16, 21, 0)]);
    }

    #[test]
    fn test_remove_pattern() {
        let mut catalog = PatternCatalog::new();
        catalog.add_pattern("a", "x");
        assert!(catalog.remove_pattern("a", "x"));
        assert!(!catalog.remove_pattern("a", "x"));
        assert!(!catalog.remove_pattern("missing", "x"));
        assert_eq!(catalog.pattern_count(), 0);
    }
}
