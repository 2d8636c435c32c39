//! Page image preprocessing before OCR.

use std::path::PathBuf;

use image::GrayImage;
use tracing::{debug, warn};

use crate::ocr::PageImage;

/// Grayscale conversion plus a linear contrast stretch.
///
/// Faint scans and blueprint backgrounds recognize noticeably better after
/// the stretch. The enhanced copy is written next to the source image.
#[derive(Debug, Clone)]
pub struct ImageEnhancer {
    /// Fraction of darkest and lightest pixels clipped before stretching.
    clip_fraction: f64,
}

impl Default for ImageEnhancer {
    fn default() -> Self {
        Self { clip_fraction: 0.01 }
    }
}

impl ImageEnhancer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return an enhanced copy of `page`, or `page` itself if enhancement fails.
    pub fn enhance_or_original(&self, page: &PageImage) -> PageImage {
        match self.enhance(page) {
            Ok(enhanced) => enhanced,
            Err(e) => {
                warn!(
                    "Image enhancement failed for page {}: {}, using original",
                    page.page_number, e
                );
                page.clone()
            }
        }
    }

    pub fn enhance(&self, page: &PageImage) -> Result<PageImage, image::ImageError> {
        let gray = image::open(&page.path)?.to_luma8();
        let stretched = self.stretch_contrast(gray);

        let out_path = enhanced_path(page);
        stretched.save(&out_path)?;
        debug!("Enhanced page {} -> {}", page.page_number, out_path.display());

        Ok(PageImage {
            page_number: page.page_number,
            path: out_path,
            width: stretched.width(),
            height: stretched.height(),
        })
    }

    fn stretch_contrast(&self, mut gray: GrayImage) -> GrayImage {
        let mut histogram = [0u64; 256];
        for pixel in gray.pixels() {
            histogram[pixel.0[0] as usize] += 1;
        }
        let total: u64 = histogram.iter().sum();
        let clip = (total as f64 * self.clip_fraction) as u64;

        let low = percentile(&histogram, clip);
        let high = 255 - percentile_rev(&histogram, clip);
        if high <= low {
            return gray;
        }

        let range = (high - low) as f64;
        for pixel in gray.pixels_mut() {
            let v = pixel.0[0].clamp(low, high);
            pixel.0[0] = (((v - low) as f64 / range) * 255.0).round() as u8;
        }
        gray
    }
}

/// Lowest intensity after skipping `clip` pixels from the dark end.
fn percentile(histogram: &[u64; 256], clip: u64) -> u8 {
    let mut seen = 0;
    for (value, count) in histogram.iter().enumerate() {
        seen += count;
        if seen > clip {
            return value as u8;
        }
    }
    255
}

/// Distance from 255 after skipping `clip` pixels from the light end.
fn percentile_rev(histogram: &[u64; 256], clip: u64) -> u8 {
    let mut seen = 0;
    for (offset, count) in histogram.iter().rev().enumerate() {
        seen += count;
        if seen > clip {
            return offset as u8;
        }
    }
    255
}

fn enhanced_path(page: &PageImage) -> PathBuf {
    let stem = page
        .path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("page");
    page.path.with_file_name(format!("{}_enhanced.png", stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_enhance_stretches_contrast() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("page-1.png");
        let img = GrayImage::from_fn(20, 10, |x, _| Luma([if x < 10 { 100 } else { 150 }]));
        img.save(&src).unwrap();

        let page = PageImage::from_file(1, &src).unwrap();
        let enhanced = ImageEnhancer::new().enhance(&page).unwrap();
        assert_eq!(enhanced.path, dir.path().join("page-1_enhanced.png"));
        assert_eq!((enhanced.width, enhanced.height), (20, 10));

        let out = image::open(&enhanced.path).unwrap().to_luma8();
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(19, 0).0[0], 255);
    }

    #[test]
    fn test_enhance_failure_falls_back() {
        let page = PageImage {
            page_number: 2,
            path: PathBuf::from("/nonexistent/page-2.png"),
            width: 10,
            height: 10,
        };
        let result = ImageEnhancer::new().enhance_or_original(&page);
        assert_eq!(result, page);
    }
}
