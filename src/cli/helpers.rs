//! Shared helper functions for CLI commands.

use console::style;
use indicatif::ProgressStyle;

use cde_ocr::models::ExtractionResult;

/// Truncate a string for single-line display.
pub fn truncate(s: &str, max_chars: usize) -> String {
    let flat: String = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut)
}

pub fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░")
}

pub fn print_result_summary(result: &ExtractionResult) {
    println!("\n{}", style("Extraction Result").bold());
    println!("{}", "-".repeat(50));
    println!("{:<22} {}", "Document:", result.filename);
    println!("{:<22} {}", "Pages:", result.total_pages);
    println!("{:<22} {}", "Method:", result.processing_method.as_str());
    println!("{:<22} {}", "Document type:", result.document_type);
    println!("{:<22} {}", "Elements:", result.elements.len());
    println!("{:<22} {}", "Tables:", result.tables.len());
    println!(
        "{:<22} {:.2}s",
        "Processing time:", result.processing_metrics.processing_time
    );
    println!("{:<22} {}", "Confidence:", confidence_style(result.confidence));

    if !result.processing_metrics.engines_used.is_empty() {
        let engines: Vec<String> = result
            .processing_metrics
            .engines_used
            .iter()
            .map(|(name, pages)| format!("{} ({} pages)", name, pages))
            .collect();
        println!("{:<22} {}", "OCR engines:", engines.join(", "));
    }
    if result.processing_metrics.pages_ocr_failed > 0 {
        println!(
            "{:<22} {}",
            "OCR failures:",
            style(result.processing_metrics.pages_ocr_failed).yellow()
        );
    }

    if !result.structured_data.is_empty() {
        println!("\n{}", style("Patterns:").cyan());
        for (category, matches) in &result.structured_data {
            let sample: Vec<&str> = matches.iter().take(3).map(|m| m.text.as_str()).collect();
            println!(
                "  {:<20} {:>3}  {}",
                category,
                matches.len(),
                style(truncate(&sample.join(", "), 50)).dim()
            );
        }
    }
}

pub fn confidence_style(confidence: f64) -> console::StyledObject<String> {
    let text = format!("{:.3}", confidence);
    if confidence >= 0.7 {
        style(text).green()
    } else if confidence >= 0.4 {
        style(text).yellow()
    } else {
        style(text).red()
    }
}
