//! System information and configuration checks.

use console::style;

use cde_ocr::config::Config;
use cde_ocr::pipeline::Processor;
use cde_ocr::utils::check_tools;

pub fn cmd_info(config: Config) -> anyhow::Result<()> {
    let source = config
        .source_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    let processor = Processor::new(config);
    let info = processor.get_system_info();

    println!(
        "\n{} {}",
        style("cde-ocr").bold(),
        style(&info.processor_version).dim()
    );
    println!("{}", "-".repeat(50));
    println!("{:<15} {}", "Config:", source);

    println!("\n{}", style("External Tools:").cyan());
    for (tool, available) in check_tools() {
        let status = if available {
            style("✓ found").green()
        } else {
            style("✗ not found").red()
        };
        println!("  {:<15} {}", tool, status);
    }

    println!("\n{}", style("OCR Engines:").cyan());
    if info.ocr_engines.is_empty() {
        println!("  {}", style("none registered").yellow());
    }
    for (name, engine) in &info.ocr_engines {
        let status = if engine.available {
            style("✓ available").green()
        } else {
            style("✗ unavailable").red()
        };
        println!("  {:<15} {}  priority {}", name, status, engine.priority);
        if !engine.available {
            println!("                  {}", style(&engine.reason).dim());
        }
    }

    println!("\n{}", style("Pipeline:").cyan());
    for stage in processor.get_pipeline_info().stages {
        let marker = if stage.critical { " (critical)" } else { "" };
        println!("  {}. {}{}", stage.position + 1, stage.name, marker);
    }

    println!("\n{}", style("Components:").cyan());
    for (component, ok) in &info.component_status {
        let status = if *ok {
            style("ok").green()
        } else {
            style("missing").red()
        };
        println!("  {:<20} {}", component, status);
    }
    Ok(())
}

pub fn cmd_validate(config: Config) -> anyhow::Result<()> {
    let processor = Processor::new(config);
    let validation = processor.validate_configuration();

    println!("\n{}", style("Configuration Check").bold());
    println!("{}", "-".repeat(50));
    if validation.config_valid {
        println!("{} Configuration is valid", style("✓").green());
    } else {
        for issue in &validation.config_issues {
            println!("{} {}", style("✗").red(), issue);
        }
    }

    for (engine, issues) in &validation.ocr_issues {
        for issue in issues {
            println!("{} {}: {}", style("!").yellow(), engine, issue);
        }
    }

    if !validation.recommendations.is_empty() {
        println!("\n{}", style("Recommendations:").cyan());
        for recommendation in &validation.recommendations {
            println!("  - {}", recommendation);
        }
    }

    if !validation.config_valid {
        anyhow::bail!("configuration has {} issue(s)", validation.config_issues.len());
    }
    Ok(())
}
