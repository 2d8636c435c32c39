//! Tesseract OCR engine.
//!
//! Runs the `tesseract` CLI with TSV output and groups recognized words into
//! one element per text line, carrying the line's bounding box and mean
//! word confidence.

use std::collections::BTreeMap;
use std::process::Command;

use super::engine::{Availability, OcrEngine, OcrError, OcrOptions, PageImage};
use crate::models::{BoundingBox, ExtractedElement};
use crate::utils::check_binary;

const ENGINE_NAME: &str = "tesseract";

/// Tesseract OCR engine.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    binary: String,
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TesseractEngine {
    pub fn new() -> Self {
        Self {
            binary: "tesseract".to_string(),
        }
    }

    /// Use a specific tesseract binary instead of the one on PATH.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Run Tesseract on an image file, returning raw TSV.
    fn run_tesseract(&self, image: &PageImage, page: u32, language: &str) -> Result<String, OcrError> {
        let output = Command::new(&self.binary)
            .arg(&image.path)
            .arg("stdout")
            .args(["-l", language])
            .arg("tsv")
            .output();

        match output {
            Ok(output) => {
                if output.status.success() {
                    Ok(String::from_utf8_lossy(&output.stdout).to_string())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Err(OcrError::Extraction {
                        engine: ENGINE_NAME.to_string(),
                        page,
                        reason: format!("tesseract failed: {}", stderr.trim()),
                    })
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(OcrError::EngineUnavailable {
                name: ENGINE_NAME.to_string(),
                reason: "tesseract not found (install tesseract-ocr)".to_string(),
            }),
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn priority(&self) -> i32 {
        5
    }

    fn check_availability(&self) -> Availability {
        if check_binary(&self.binary) {
            Availability::available("Tesseract is available")
        } else {
            Availability::unavailable("Tesseract not installed. Install with: apt install tesseract-ocr")
        }
    }

    fn extract_text(
        &self,
        image: &PageImage,
        page_number: u32,
        options: &OcrOptions,
    ) -> Result<Vec<ExtractedElement>, OcrError> {
        let tsv = self.run_tesseract(image, page_number, &options.language)?;
        Ok(parse_tsv(&tsv, page_number))
    }

    fn supported_features(&self) -> Vec<String> {
        vec![
            "text_extraction".to_string(),
            "bounding_boxes".to_string(),
            "word_confidence".to_string(),
        ]
    }

    fn validate_configuration(&self) -> Vec<String> {
        if check_binary(&self.binary) {
            Vec::new()
        } else {
            vec![format!("{} binary not found in PATH", self.binary)]
        }
    }
}

#[derive(Default)]
struct LineAccumulator {
    words: Vec<String>,
    confidences: Vec<f64>,
    bbox: Option<BoundingBox>,
}

/// Group TSV word rows (level 5) into line elements, in reading order.
fn parse_tsv(tsv: &str, page_number: u32) -> Vec<ExtractedElement> {
    let mut lines: BTreeMap<(u32, u32, u32), LineAccumulator> = BTreeMap::new();

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.splitn(12, '\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let text = cols[11].trim();
        let conf: f64 = cols[10].parse().unwrap_or(-1.0);
        if text.is_empty() || conf < 0.0 {
            continue;
        }
        let key = match (cols[2].parse(), cols[3].parse(), cols[4].parse()) {
            (Ok(block), Ok(par), Ok(line)) => (block, par, line),
            _ => continue,
        };
        let nums: Vec<f64> = cols[6..10].iter().filter_map(|c| c.parse().ok()).collect();
        let word_box = (nums.len() == 4)
            .then(|| BoundingBox::new(nums[0], nums[1], nums[2], nums[3], conf / 100.0));

        let line = lines.entry(key).or_default();
        line.words.push(text.to_string());
        line.confidences.push(conf / 100.0);
        if let Some(word_box) = word_box {
            line.bbox = Some(match line.bbox {
                Some(existing) => existing.union(&word_box),
                None => word_box,
            });
        }
    }

    lines
        .into_values()
        .map(|line| {
            let confidence = line.confidences.iter().sum::<f64>() / line.confidences.len() as f64;
            let mut element = ExtractedElement::new(line.words.join(" "), page_number, confidence)
                .with_metadata("engine", ENGINE_NAME)
                .with_metadata("word_count", line.words.len());
            if let Some(bbox) = line.bbox {
                element = element.with_bbox(BoundingBox { confidence, ..bbox });
            }
            element
        })
        .collect()
}
