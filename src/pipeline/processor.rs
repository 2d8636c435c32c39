//! The processing pipeline: input validation, the stage loop, batch runs and
//! system introspection.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::confidence::calculate_confidence;
use super::context::{PipelineContext, ProcessOptions};
use super::export::write_json;
use super::stage::{is_critical, PipelineStage};
use super::stages::{
    ClassificationStage, FinalizationStage, OcrStage, PatternStage, PdfTextStage, SpatialStage,
};
use crate::config::Config;
use crate::error::ProcessorError;
use crate::extract::{
    DocumentClassifier, PatternProcessor, PdfTextExtractor, PopplerExtractor, SpatialAnalyzer,
};
use crate::models::{ExtractionResult, StageOutcome, StageTiming};
use crate::ocr::{default_registry, EngineInfo, EngineRegistry};
use crate::utils::FilePattern;

/// One successfully processed file in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFileResult {
    pub file: String,
    pub status: String,
    /// Name of the written result file.
    pub output: String,
    pub confidence: f64,
    pub pages: u32,
    pub elements: usize,
}

/// One failed file in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchError {
    pub file: String,
    pub error: String,
}

/// Aggregate outcome of `process_batch`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<BatchFileResult>,
    pub errors: Vec<BatchError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageInfo {
    pub name: String,
    pub critical: bool,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineInfo {
    pub total_stages: usize,
    pub stages: Vec<StageInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemInfo {
    pub processor_version: String,
    pub ocr_engines: BTreeMap<String, EngineInfo>,
    pub available_stages: Vec<String>,
    pub component_status: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigValidation {
    pub config_valid: bool,
    pub config_issues: Vec<String>,
    pub ocr_issues: BTreeMap<String, Vec<String>>,
    pub recommendations: Vec<String>,
}

/// Runs the stage pipeline over PDF documents.
pub struct Processor {
    config: Arc<Config>,
    registry: Arc<EngineRegistry>,
    extractor: Arc<dyn PdfTextExtractor>,
    patterns: Arc<PatternProcessor>,
    stages: Vec<Box<dyn PipelineStage>>,
}

impl Processor {
    /// Processor with poppler and the engines enabled in `config`.
    pub fn new(config: Config) -> Self {
        let registry = Arc::new(default_registry(&config.ocr));
        Self::with_components(config, registry, Arc::new(PopplerExtractor::new()))
    }

    /// Processor configured from a toml, yaml or json file.
    pub fn from_config_path(path: &Path) -> Result<Self, ProcessorError> {
        let config = Config::load_from_path(path).map_err(ProcessorError::Config)?;
        let issues = config.validate();
        if !issues.is_empty() {
            return Err(ProcessorError::Config(issues.join("; ")));
        }
        Ok(Self::new(config))
    }

    /// Processor with caller-supplied engines and PDF extractor.
    pub fn with_components(
        config: Config,
        registry: Arc<EngineRegistry>,
        extractor: Arc<dyn PdfTextExtractor>,
    ) -> Self {
        let patterns = Arc::new(PatternProcessor::default());
        let stages: Vec<Box<dyn PipelineStage>> = vec![
            Box::new(PdfTextStage::new(extractor.clone())),
            Box::new(OcrStage::new(registry.clone())),
            Box::new(PatternStage::new(patterns.clone())),
            Box::new(SpatialStage::new(SpatialAnalyzer::new())),
            Box::new(ClassificationStage::new(DocumentClassifier::new())),
            Box::new(FinalizationStage::new()),
        ];
        Self {
            config: Arc::new(config),
            registry,
            extractor,
            patterns,
            stages,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    pub fn pattern_processor(&self) -> &PatternProcessor {
        &self.patterns
    }

    /// Check that `path` is an existing regular file of an allowed type and size.
    pub fn validate_input(&self, path: &Path) -> Result<(), ProcessorError> {
        if !path.exists() {
            return Err(ProcessorError::FileNotFound(path.to_path_buf()));
        }
        if !path.is_file() {
            return Err(ProcessorError::Validation(format!(
                "Path is not a file: {}",
                path.display()
            )));
        }

        let security = &self.config.security;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default();
        if !security.allows_extension(&extension) {
            return Err(ProcessorError::UnsupportedFileType {
                path: path.to_path_buf(),
                extension,
                allowed: security.allowed_file_extensions.join(", "),
            });
        }

        let size = std::fs::metadata(path)?.len();
        if size > security.max_file_size_bytes() {
            return Err(ProcessorError::Validation(format!(
                "File too large: {:.1}MB (max: {}MB)",
                size as f64 / (1024.0 * 1024.0),
                security.max_file_size_mb
            )));
        }
        Ok(())
    }

    /// Run every stage over one document.
    pub fn process(
        &self,
        path: &Path,
        options: &ProcessOptions,
    ) -> Result<ExtractionResult, ProcessorError> {
        self.validate_input(path)?;

        let document_id = uuid::Uuid::new_v4().to_string();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        info!("Starting processing: {} (ID: {})", filename, document_id);

        let mut ctx = PipelineContext::new(
            path.to_path_buf(),
            options.clone(),
            self.config.clone(),
            ExtractionResult::new(&document_id, &filename),
        );
        ctx.known_pattern_categories = self.patterns.category_count();

        for stage in &self.stages {
            self.run_stage(stage.as_ref(), &mut ctx)?;
        }

        let mut result = ctx.result;
        if !result.is_sealed() {
            warn!("No finalization stage ran for {}", document_id);
            result.confidence = calculate_confidence(&result, ctx.known_pattern_categories);
        }
        result.processing_metrics.processing_time = ctx.start_time.elapsed().as_secs_f64();

        info!(
            "Processing completed: {} ({:.2}s, confidence: {:.2})",
            filename, result.processing_metrics.processing_time, result.confidence
        );
        Ok(result)
    }

    fn run_stage(
        &self,
        stage: &dyn PipelineStage,
        ctx: &mut PipelineContext,
    ) -> Result<(), ProcessorError> {
        let name = stage.name().to_string();
        let started = Instant::now();

        let outcome = if ctx.result.is_sealed() {
            warn!("Stage {} skipped: result already finalized", name);
            StageOutcome::Skipped
        } else if !stage.validate_input(ctx) {
            debug!("Stage {} skipped: input validation failed", name);
            StageOutcome::Skipped
        } else if is_critical(&name) {
            debug!("Executing stage: {}", name);
            stage.process(ctx).map_err(|source| {
                error!("Stage {} failed: {}", name, source);
                ProcessorError::Processing {
                    stage: name.clone(),
                    document_id: ctx.result.document_id.clone(),
                    source,
                }
            })?;
            StageOutcome::Completed
        } else {
            debug!("Executing stage: {}", name);
            let checkpoint = ctx.checkpoint();
            match stage.process(ctx) {
                Ok(()) => StageOutcome::Completed,
                Err(e) => {
                    warn!("Continuing processing despite {} failure: {}", name, e);
                    ctx.restore(checkpoint);
                    StageOutcome::Failed
                }
            }
        };

        let seconds = started.elapsed().as_secs_f64();
        debug!("Stage {} {:?} in {:.2}s", name, outcome, seconds);
        ctx.result.processing_metrics.stage_timings.push(StageTiming {
            stage: name,
            seconds,
            outcome,
        });
        Ok(())
    }

    /// Process every matching file in `input_dir`, writing one
    /// `<stem>_result.json` per success into `output_dir`.
    pub fn process_batch(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        file_pattern: &str,
        options: &ProcessOptions,
    ) -> Result<BatchSummary, ProcessorError> {
        self.process_batch_with_progress(input_dir, output_dir, file_pattern, options, |_, _| {})
    }

    /// Like `process_batch`, calling `on_file` after each file with its
    /// name and whether it succeeded.
    pub fn process_batch_with_progress<F>(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        file_pattern: &str,
        options: &ProcessOptions,
        mut on_file: F,
    ) -> Result<BatchSummary, ProcessorError>
    where
        F: FnMut(&str, bool),
    {
        if !input_dir.is_dir() {
            return Err(ProcessorError::FileNotFound(input_dir.to_path_buf()));
        }
        let pattern = FilePattern::new(file_pattern).map_err(|e| {
            ProcessorError::Validation(format!("Invalid file pattern '{}': {}", file_pattern, e))
        })?;
        std::fs::create_dir_all(output_dir)?;

        let files = pattern.list(input_dir)?;
        info!("Starting batch processing: {} files", files.len());

        let mut summary = BatchSummary {
            total_files: files.len(),
            ..BatchSummary::default()
        };
        for file in &files {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            info!("Processing batch file: {}", name);

            match self.process_and_save(file, output_dir, options) {
                Ok((result, output)) => {
                    summary.successful += 1;
                    summary.results.push(BatchFileResult {
                        file: name.clone(),
                        status: "success".to_string(),
                        output,
                        confidence: result.confidence,
                        pages: result.total_pages,
                        elements: result.elements.len(),
                    });
                    on_file(&name, true);
                }
                Err(e) => {
                    error!("Batch processing failed for {}: {}", name, e);
                    summary.failed += 1;
                    summary.errors.push(BatchError {
                        file: name.clone(),
                        error: e.to_string(),
                    });
                    on_file(&name, false);
                }
            }
        }

        info!(
            "Batch processing completed: {}/{} successful",
            summary.successful, summary.total_files
        );
        Ok(summary)
    }

    fn process_and_save(
        &self,
        file: &Path,
        output_dir: &Path,
        options: &ProcessOptions,
    ) -> Result<(ExtractionResult, String), ProcessorError> {
        let result = self.process(file, options)?;
        let output = result_path(output_dir, file);
        self.save_result(&result, &output)?;
        let output_name = output
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok((result, output_name))
    }

    /// Write `result` as pretty JSON.
    pub fn save_result(&self, result: &ExtractionResult, path: &Path) -> Result<(), ProcessorError> {
        write_json(result, path)?;
        debug!("Result saved to: {}", path.display());
        Ok(())
    }

    /// Insert a stage at `position`, or append it when `None` or past the end.
    pub fn add_stage(&mut self, stage: Box<dyn PipelineStage>, position: Option<usize>) {
        info!("Added stage: {}", stage.name());
        match position {
            Some(index) if index < self.stages.len() => self.stages.insert(index, stage),
            _ => self.stages.push(stage),
        }
    }

    /// Remove every stage named `name`. Returns whether any was removed.
    pub fn remove_stage(&mut self, name: &str) -> bool {
        let before = self.stages.len();
        self.stages.retain(|s| s.name() != name);
        let removed = self.stages.len() != before;
        if removed {
            info!("Removed stage: {}", name);
        }
        removed
    }

    pub fn stage_names(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn get_pipeline_info(&self) -> PipelineInfo {
        PipelineInfo {
            total_stages: self.stages.len(),
            stages: self
                .stages
                .iter()
                .enumerate()
                .map(|(position, s)| StageInfo {
                    name: s.name().to_string(),
                    critical: is_critical(s.name()),
                    position,
                })
                .collect(),
        }
    }

    pub fn get_system_info(&self) -> SystemInfo {
        let ocr_engines = self.registry.get_engine_info();
        let any_engine = ocr_engines.values().any(|e| e.available);
        let has_stage = |name: &str| self.stages.iter().any(|s| s.name() == name);

        let component_status = BTreeMap::from([
            ("pdf_extractor".to_string(), self.extractor.is_available()),
            ("ocr_engines".to_string(), any_engine),
            (
                "pattern_processor".to_string(),
                self.patterns.category_count() > 0,
            ),
            ("spatial_analyzer".to_string(), has_stage("spatial")),
            ("document_classifier".to_string(), has_stage("classification")),
        ]);

        SystemInfo {
            processor_version: env!("CARGO_PKG_VERSION").to_string(),
            ocr_engines,
            available_stages: self.stage_names(),
            component_status,
        }
    }

    pub fn validate_configuration(&self) -> ConfigValidation {
        let config_issues = self.config.validate();
        let ocr_issues = self.registry.validate_configuration();

        let mut recommendations = Vec::new();
        if self.registry.get_available_engines().is_empty() {
            recommendations.push(
                "No OCR engine is available: install tesseract-ocr or set ANTHROPIC_API_KEY"
                    .to_string(),
            );
        }
        let claude_enabled = self.config.ocr.engines.iter().any(|e| e == "claude");
        let claude_registered = self.registry.names().iter().any(|n| n == "claude");
        if claude_enabled && (!claude_registered || ocr_issues.contains_key("claude")) {
            recommendations
                .push("Set ANTHROPIC_API_KEY to enable Claude OCR for scanned drawings".to_string());
        }
        if !self.extractor.is_available() {
            recommendations.push(format!(
                "PDF extractor '{}' is unavailable: install poppler-utils",
                self.extractor.name()
            ));
        }

        ConfigValidation {
            config_valid: config_issues.is_empty(),
            config_issues,
            ocr_issues,
            recommendations,
        }
    }
}

/// `<output_dir>/<stem>_result.json`
pub fn result_path(output_dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    output_dir.join(format!("{}_result.json", stem))
}
