//! Document-type classification from keywords and pattern evidence.

use crate::models::{DocumentType, StructuredData};

struct Profile {
    document_type: DocumentType,
    keywords: &'static [&'static str],
    /// Pattern categories that count as supporting evidence.
    categories: &'static [&'static str],
}

const PROFILES: &[Profile] = &[
    Profile {
        document_type: DocumentType::StructuralDrawings,
        keywords: &[
            "STRUCTURAL STEEL",
            "FRAMING PLAN",
            "FOUNDATION PLAN",
            "DESIGN CRITERIA",
            "STRUCTURAL NOTES",
            "COLD-FORMED",
            "BEAM",
            "COLUMN",
            "JOIST",
        ],
        categories: &["structural_steel", "load_requirements", "building_codes"],
    },
    Profile {
        document_type: DocumentType::ArchitecturalDrawings,
        keywords: &[
            "FLOOR PLAN",
            "REFLECTED CEILING",
            "DOOR SCHEDULE",
            "WINDOW SCHEDULE",
            "FINISH SCHEDULE",
            "ELEVATION",
            "PARTITION",
        ],
        categories: &["dimensions", "abbreviations"],
    },
    Profile {
        document_type: DocumentType::Specifications,
        keywords: &[
            "SPECIFICATION",
            "SECTION 05",
            "PART 1 - GENERAL",
            "PART 2 - PRODUCTS",
            "PART 3 - EXECUTION",
            "SUBMITTALS",
        ],
        categories: &["material_specs"],
    },
    Profile {
        document_type: DocumentType::GeneralNotes,
        keywords: &["GENERAL NOTES", "ABBREVIATIONS", "LEGEND", "SYMBOLS"],
        categories: &["project_info"],
    },
];

/// Scores each document type by keyword hits (2 points each) plus pattern
/// categories found (1 point each) and picks the best.
#[derive(Debug, Clone)]
pub struct DocumentClassifier {
    /// Minimum score for a specific type; below it the document is `General`.
    pub min_score: u32,
}

impl Default for DocumentClassifier {
    fn default() -> Self {
        Self { min_score: 3 }
    }
}

impl DocumentClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classify(&self, text: &str, structured_data: &StructuredData) -> DocumentType {
        let upper = text.to_uppercase();
        let mut best = (DocumentType::General, 0u32);
        for profile in PROFILES {
            let keyword_hits = profile
                .keywords
                .iter()
                .filter(|k| upper.contains(*k))
                .count() as u32;
            let category_hits = profile
                .categories
                .iter()
                .filter(|c| structured_data.get(**c).is_some_and(|m| !m.is_empty()))
                .count() as u32;
            let score = keyword_hits * 2 + category_hits;
            // ties keep the earlier profile
            if score > best.1 {
                best = (profile.document_type, score);
            }
        }
        if best.1 >= self.min_score {
            best.0
        } else {
            DocumentType::General
        }
    }
}
