//! Single-document commands.

use std::path::{Path, PathBuf};

use console::style;
use indicatif::ProgressBar;

use cde_ocr::config::Config;
use cde_ocr::pipeline::{result_path, EnhancedProcessor, ProcessOptions, Processor};

use crate::cli::helpers::{confidence_style, print_result_summary, truncate};

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));
    spinner
}

/// `<stem>_result.json` next to the input.
fn default_output(file: &Path) -> PathBuf {
    result_path(file.parent().unwrap_or_else(|| Path::new(".")), file)
}

/// Run the pipeline on one file and save `<stem>_result.json`.
pub fn cmd_process(
    config: Config,
    file: &Path,
    options: &ProcessOptions,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let processor = Processor::new(config);

    let progress = spinner(&format!("Processing {}...", file.display()));
    let result = processor.process(file, options);
    progress.finish_and_clear();
    let result = result?;

    print_result_summary(&result);

    let output = output.unwrap_or_else(|| default_output(file));
    processor.save_result(&result, &output)?;
    println!(
        "\n{} Result saved to {}",
        style("✓").green(),
        output.display()
    );
    Ok(())
}

/// Page-level keyword filtering; saves the minimal page export.
pub fn cmd_pages(
    config: Config,
    file: &Path,
    keywords: &[String],
    options: &ProcessOptions,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut enhanced = EnhancedProcessor::new(Processor::new(config));
    enhanced.add_custom_keywords(keywords);

    let progress = spinner(&format!("Processing {}...", file.display()));
    let result = enhanced.process_with_page_results(file, options);
    progress.finish_and_clear();
    let result = result?;

    let info = &result.document_info;
    println!("\n{}", style("Page Results").bold());
    println!("{}", "-".repeat(50));
    println!("{:<22} {}", "Document:", info.filename);
    println!("{:<22} {}", "Total pages:", info.total_pages);
    println!("{:<22} {}", "Confidence:", confidence_style(info.confidence));
    println!("{:<22} {}", "Document type:", info.document_type);
    println!(
        "{:<22} {}",
        "Target keywords:",
        enhanced.target_keywords().join(", ")
    );

    let summary = enhanced.get_page_summary(&result);
    let filtered = &result.filtered_pages;
    if filtered.fallback_used {
        println!(
            "\n{} No page matched a target keyword; returning all {} pages with text",
            style("!").yellow(),
            summary.pages_processed
        );
    } else {
        println!(
            "\n{:<22} {} ({:.1}%)",
            "Pages with keywords:", summary.pages_with_keywords, summary.percentage_with_keywords
        );
        println!("{:<22} {}", "Keywords found:", summary.keywords_found.join(", "));
    }

    for page in &filtered.matching_pages {
        let keywords = if page.matched_keywords.is_empty() {
            String::new()
        } else {
            format!(" [{}]", page.matched_keywords.join(", "))
        };
        println!(
            "  {:>4}  {:.2}{}  {}",
            style(page.page.page_number).cyan(),
            page.page.confidence_avg,
            keywords,
            style(truncate(&page.page.extracted_text, 60)).dim()
        );
    }

    let output = output.unwrap_or_else(|| default_output(file));
    result.save_minimal(&output)?;
    println!(
        "\n{} Results saved to {}",
        style("✓").green(),
        output.display()
    );
    Ok(())
}
