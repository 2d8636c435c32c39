//! Directory batch processing.

use std::path::Path;

use console::style;
use indicatif::ProgressBar;

use cde_ocr::config::Config;
use cde_ocr::pipeline::{write_json, ProcessOptions, Processor};
use cde_ocr::utils::FilePattern;

use crate::cli::helpers::{bar_style, confidence_style};

pub fn cmd_batch(
    config: Config,
    input_dir: &Path,
    output_dir: &Path,
    pattern: &str,
    options: &ProcessOptions,
) -> anyhow::Result<()> {
    let processor = Processor::new(config);

    // Count up front for the progress bar; an unreadable directory is
    // reported by process_batch.
    let total = FilePattern::new(pattern)
        .ok()
        .and_then(|p| p.list(input_dir).ok())
        .map(|files| files.len())
        .unwrap_or(0);

    let progress = ProgressBar::new(total as u64);
    progress.set_style(bar_style());
    progress.set_message("Processing...");

    let summary = processor.process_batch_with_progress(
        input_dir,
        output_dir,
        pattern,
        options,
        |file, ok| {
            if !ok {
                progress.println(format!("{} {}", style("✗").red(), file));
            }
            progress.set_message(file.to_string());
            progress.inc(1);
        },
    );
    progress.finish_and_clear();
    let summary = summary?;

    println!("\n{}", style("Batch Summary").bold());
    println!("{}", "-".repeat(50));
    println!("{:<15} {}", "Files:", summary.total_files);
    println!("{:<15} {}", "Successful:", style(summary.successful).green());
    println!("{:<15} {}", "Failed:", style(summary.failed).red());

    for entry in &summary.results {
        println!(
            "  {} {:<40} {}  {} pages",
            style("✓").green(),
            entry.file,
            confidence_style(entry.confidence),
            entry.pages
        );
    }
    for entry in &summary.errors {
        println!("  {} {:<40} {}", style("✗").red(), entry.file, entry.error);
    }

    let summary_path = output_dir.join("batch_summary.json");
    write_json(&summary, &summary_path)?;
    println!(
        "\n{} Summary saved to {}",
        style("✓").green(),
        summary_path.display()
    );
    Ok(())
}
