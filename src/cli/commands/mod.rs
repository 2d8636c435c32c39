//! CLI commands implementation.

mod batch;
mod process;
mod system;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use cde_ocr::config::Config;
use cde_ocr::pipeline::ProcessOptions;

#[derive(Parser)]
#[command(name = "cde-ocr")]
#[command(about = "Extract text, tables and metadata from engineering drawing PDFs")]
#[command(version)]
pub struct Cli {
    /// Configuration file (toml, yaml or json)
    #[arg(short, long, global = true, env = "CDE_OCR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Switches shared by the single-document commands.
#[derive(clap::Args, Debug, Clone)]
pub struct StageArgs {
    /// Skip OCR and use only the embedded text layer
    #[arg(long)]
    no_ocr: bool,
    /// Skip table detection
    #[arg(long)]
    no_tables: bool,
    /// Skip pattern extraction
    #[arg(long)]
    no_patterns: bool,
    /// Send page images to OCR without enhancement
    #[arg(long)]
    no_enhance: bool,
    /// OCR engine to use (default: best available, with fallback)
    #[arg(short, long)]
    engine: Option<String>,
}

impl StageArgs {
    fn options(&self) -> ProcessOptions {
        ProcessOptions {
            use_ocr: !self.no_ocr,
            extract_tables: !self.no_tables,
            extract_patterns: !self.no_patterns,
            enhance_images: !self.no_enhance,
            ocr_engine: self.engine.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline on one PDF
    Process {
        file: PathBuf,
        #[command(flatten)]
        stages: StageArgs,
        /// Result file (default: <stem>_result.json next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Page-level results filtered to pages mentioning target keywords
    Pages {
        file: PathBuf,
        /// Additional target keyword (repeatable)
        #[arg(short, long = "keyword")]
        keywords: Vec<String>,
        #[command(flatten)]
        stages: StageArgs,
        /// Result file (default: <stem>_result.json next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// OCR only: no tables, no patterns
    Ocr {
        file: PathBuf,
        /// OCR engine to use
        #[arg(short, long)]
        engine: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// OCR plus table detection
    Tables {
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Embedded text plus pattern extraction, no OCR
    Patterns {
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Process every matching PDF in a directory
    Batch {
        input_dir: PathBuf,
        output_dir: PathBuf,
        /// File name pattern
        #[arg(short, long, default_value = "*.pdf")]
        pattern: String,
        #[command(flatten)]
        stages: StageArgs,
    },

    /// Show engines, stages and external tool status
    Info,

    /// Validate configuration and engine setup
    Validate,
}

/// Load the config named on the command line, or discover one.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from_path(path)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("Loading {}", path.display())),
        None => Ok(Config::discover()),
    }
}

pub fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    match cli.command {
        Commands::Process {
            file,
            stages,
            output,
        } => process::cmd_process(config, &file, &stages.options(), output),
        Commands::Pages {
            file,
            keywords,
            stages,
            output,
        } => process::cmd_pages(config, &file, &keywords, &stages.options(), output),
        Commands::Ocr {
            file,
            engine,
            output,
        } => {
            let options = ProcessOptions {
                ocr_engine: engine,
                ..ProcessOptions::ocr_only()
            };
            process::cmd_process(config, &file, &options, output)
        }
        Commands::Tables { file, output } => {
            process::cmd_process(config, &file, &ProcessOptions::tables_only(), output)
        }
        Commands::Patterns { file, output } => {
            process::cmd_process(config, &file, &ProcessOptions::patterns_only(), output)
        }
        Commands::Batch {
            input_dir,
            output_dir,
            pattern,
            stages,
        } => batch::cmd_batch(config, &input_dir, &output_dir, &pattern, &stages.options()),
        Commands::Info => system::cmd_info(config),
        Commands::Validate => system::cmd_validate(config),
    }
}
