//! PDF page text and page image extraction.
//!
//! `PopplerExtractor` shells out to poppler-utils (`pdfinfo`, `pdftotext`,
//! `pdftoppm`). Rendered images live in a temporary directory owned by the
//! returned `PdfDocument` and are removed when it is dropped.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, warn};

use crate::ocr::PageImage;
use crate::utils::check_binary;

/// Errors from the PDF collaborator.
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("PDF extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Handle command output, extracting stdout on success or returning appropriate error.
fn handle_cmd_output(
    result: std::io::Result<std::process::Output>,
    tool_name: &str,
    error_prefix: &str,
) -> Result<String, PdfError> {
    match result {
        Ok(output) => {
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(PdfError::ExtractionFailed(format!(
                    "{}: {}",
                    error_prefix,
                    stderr.trim()
                )))
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(PdfError::ToolNotFound(tool_name.to_string()))
        }
        Err(e) => Err(PdfError::Io(e)),
    }
}

/// What the PDF stage needs from the extractor.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest {
    /// Render page images for OCR.
    pub render_images: bool,
    pub dpi: u32,
}

/// Pages recovered from one PDF.
#[derive(Debug, Default)]
pub struct PdfDocument {
    pub page_count: u32,
    /// Embedded text per page, index 0 is page 1. May be shorter than
    /// `page_count` when trailing pages carry no text layer.
    pub page_texts: Vec<String>,
    /// Rendered page images, in page order.
    pub page_images: Vec<PageImage>,
    /// Held so rendered images outlive the document.
    _workdir: Option<TempDir>,
}

impl PdfDocument {
    pub fn new(page_count: u32, page_texts: Vec<String>) -> Self {
        Self {
            page_count,
            page_texts,
            page_images: Vec::new(),
            _workdir: None,
        }
    }

    /// Attach rendered images, keeping `workdir` alive as long as the document.
    pub fn with_images(mut self, images: Vec<PageImage>, workdir: Option<TempDir>) -> Self {
        self.page_images = images;
        self._workdir = workdir;
        self
    }

    pub fn page_text(&self, page_number: u32) -> Option<&str> {
        let index = page_number.checked_sub(1)? as usize;
        self.page_texts.get(index).map(String::as_str)
    }
}

/// Source of page text and page images for a PDF file.
pub trait PdfTextExtractor: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the extractor's dependencies are present.
    fn is_available(&self) -> bool {
        true
    }

    /// Read the document. Failing to determine the page count is fatal;
    /// failing to render images is not.
    fn extract(&self, path: &Path, request: &RenderRequest) -> Result<PdfDocument, PdfError>;
}

/// poppler-utils backed extractor.
#[derive(Debug, Clone, Default)]
pub struct PopplerExtractor;

impl PopplerExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Get the page count of a PDF.
    pub fn page_count(&self, path: &Path) -> Result<u32, PdfError> {
        let output = Command::new("pdfinfo").arg(path).output();
        let stdout = handle_cmd_output(output, "pdfinfo (install poppler-utils)", "pdfinfo failed")?;
        parse_page_count(&stdout).ok_or_else(|| {
            PdfError::ExtractionFailed(format!("No page count reported for {}", path.display()))
        })
    }

    /// Embedded text for every page, split on form feeds.
    fn page_texts(&self, path: &Path, page_count: u32) -> Result<Vec<String>, PdfError> {
        let output = Command::new("pdftotext")
            .args(["-layout", "-enc", "UTF-8"])
            .arg(path)
            .arg("-") // Output to stdout
            .output();
        let text = handle_cmd_output(output, "pdftotext (install poppler-utils)", "pdftotext failed")?;
        Ok(split_pages(&text, page_count))
    }

    /// Render all pages to PNG in a fresh temporary directory.
    fn render_pages(&self, path: &Path, page_count: u32, dpi: u32) -> Result<(Vec<PageImage>, TempDir), PdfError> {
        let temp_dir = TempDir::new()?;
        let dpi = dpi.to_string();
        let output = Command::new("pdftoppm")
            .args(["-png", "-r", &dpi])
            .arg(path)
            .arg(temp_dir.path().join("page"))
            .output();
        handle_cmd_output(output, "pdftoppm (install poppler-utils)", "pdftoppm failed")?;

        let mut images = Vec::with_capacity(page_count as usize);
        for page in 1..=page_count {
            match find_page_image(temp_dir.path(), page) {
                Some(image_path) => match PageImage::from_file(page, &image_path) {
                    Ok(image) => images.push(image),
                    Err(e) => warn!("Skipping unreadable render of page {}: {}", page, e),
                },
                None => warn!("No image generated for page {}", page),
            }
        }
        Ok((images, temp_dir))
    }
}

impl PdfTextExtractor for PopplerExtractor {
    fn name(&self) -> &str {
        "poppler"
    }

    fn is_available(&self) -> bool {
        check_binary("pdfinfo") && check_binary("pdftotext")
    }

    fn extract(&self, path: &Path, request: &RenderRequest) -> Result<PdfDocument, PdfError> {
        let page_count = self.page_count(path)?;
        let page_texts = match self.page_texts(path, page_count) {
            Ok(texts) => texts,
            Err(e) => {
                warn!("No embedded text for {}: {}", path.display(), e);
                Vec::new()
            }
        };
        let document = PdfDocument::new(page_count, page_texts);
        if !request.render_images {
            return Ok(document);
        }

        match self.render_pages(path, page_count, request.dpi) {
            Ok((images, workdir)) => {
                debug!("Rendered {} of {} pages", images.len(), page_count);
                Ok(document.with_images(images, Some(workdir)))
            }
            Err(e) => {
                warn!("Page rendering failed for {}: {}", path.display(), e);
                Ok(document)
            }
        }
    }
}

fn parse_page_count(pdfinfo: &str) -> Option<u32> {
    pdfinfo
        .lines()
        .find(|line| line.starts_with("Pages:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse().ok())
}

/// Split `pdftotext` output into pages. Never returns more than `page_count`
/// entries.
fn split_pages(text: &str, page_count: u32) -> Vec<String> {
    text.split('\u{c}')
        .take(page_count as usize)
        .map(|page| page.trim().to_string())
        .collect()
}

/// Find the image file for a specific page number.
fn find_page_image(dir: &Path, page_num: u32) -> Option<PathBuf> {
    // pdftoppm pads page numbers to the width of the last page number
    for digits in [1, 2, 3, 4] {
        let path = dir.join(format!("page-{:0width$}.png", page_num, width = digits));
        if path.exists() {
            return Some(path);
        }
    }
    None
}
