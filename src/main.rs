//! cde-ocr - engineering drawing OCR and metadata extraction.

use std::fs::OpenOptions;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cde_ocr::config::LoggingConfig;

mod cli;

fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    let args = cli::Cli::parse();
    let config = cli::load_config(args.config.as_deref())?;
    init_logging(args.verbose, &config.logging)?;

    cli::run(args, config)
}

fn init_logging(verbose: bool, logging: &LoggingConfig) -> anyhow::Result<()> {
    let default_filter = if verbose {
        "cde_ocr=info".to_string()
    } else {
        logging
            .level
            .clone()
            .unwrap_or_else(|| "cde_ocr=warn".to_string())
    };

    let file_layer = match &logging.file_path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}
