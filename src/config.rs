//! Configuration management.
//!
//! Settings are read from a `cde-ocr.{toml,yaml,yml,json}` file (current
//! directory first, then the user config directory) and overridden by a few
//! environment variables. Every section has defaults so an empty or missing
//! file is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Keywords the enhanced processor looks for when no override is configured.
pub const DEFAULT_TARGET_KEYWORDS: &[&str] = &[
    "STRUCTURAL STEEL NOTES",
    "DESIGN CRITERIA",
    "GENERAL STRUCTURAL NOTES",
];

const CONFIG_STEM: &str = "cde-ocr";
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Input validation limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Extensions accepted by `process`, with leading dot (e.g. ".pdf").
    pub allowed_file_extensions: Vec<String>,
    pub max_file_size_mb: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_file_extensions: vec![".pdf".to_string()],
            max_file_size_mb: 100,
        }
    }
}

impl SecurityConfig {
    /// Whether `extension` (with or without leading dot) is allowed.
    pub fn allows_extension(&self, extension: &str) -> bool {
        let wanted = extension.trim_start_matches('.').to_lowercase();
        self.allowed_file_extensions
            .iter()
            .any(|e| e.trim_start_matches('.').to_lowercase() == wanted)
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

/// OCR engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Tesseract language code.
    pub language: String,
    /// Page render resolution.
    pub dpi: u32,
    /// Engines to construct at startup, by name.
    pub engines: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anthropic_api_key: Option<String>,
    pub claude_model: String,
    /// Elements below this confidence are dropped before acceptance.
    pub min_confidence: f64,
    /// Elements with fewer cleaned characters are dropped.
    pub min_text_length: usize,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            dpi: 300,
            engines: vec!["claude".to_string(), "tesseract".to_string()],
            anthropic_api_key: None,
            claude_model: "claude-sonnet-4-20250514".to_string(),
            min_confidence: 0.3,
            min_text_length: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    pub targets: Vec<String>,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            targets: DEFAULT_TARGET_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when RUST_LOG is unset (e.g. "cde_ocr=debug").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Additional log file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub security: SecurityConfig,
    pub ocr: OcrSettings,
    pub keywords: KeywordConfig,
    pub logging: LoggingConfig,
    /// File this config was loaded from, if any.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Discover and load a config file, falling back to defaults.
    pub fn discover() -> Self {
        for path in Self::candidate_paths() {
            if !path.is_file() {
                continue;
            }
            match Self::load_from_path(&path) {
                Ok(config) => {
                    debug!("Loaded config from {}", path.display());
                    return config;
                }
                Err(e) => warn!("Ignoring config file {}: {}", path.display(), e),
            }
        }
        Self::default_with_env()
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = CONFIG_EXTENSIONS
            .iter()
            .map(|ext| PathBuf::from(format!("{}.{}", CONFIG_STEM, ext)))
            .collect();
        if let Some(dir) = dirs::config_dir() {
            paths.extend(
                CONFIG_EXTENSIONS
                    .iter()
                    .map(|ext| dir.join(CONFIG_STEM).join(format!("config.{}", ext))),
            );
        }
        paths
    }

    /// Create a default config with environment variable overrides applied.
    pub fn default_with_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config.with_env_overrides())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            if !key.trim().is_empty() {
                self.ocr.anthropic_api_key = Some(key);
            }
        }
        if let Ok(raw) = std::env::var("CDE_OCR_MAX_FILE_SIZE_MB") {
            match raw.trim().parse() {
                Ok(mb) => self.security.max_file_size_mb = mb,
                Err(_) => warn!("Invalid CDE_OCR_MAX_FILE_SIZE_MB: {}", raw),
            }
        }
        if let Ok(language) = std::env::var("CDE_OCR_LANGUAGE") {
            if !language.trim().is_empty() {
                self.ocr.language = language;
            }
        }
        self
    }

    /// Problems that make this configuration unusable or surprising.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.security.allowed_file_extensions.is_empty() {
            issues.push("security.allowed_file_extensions is empty; no file can be processed".to_string());
        }
        if self.security.max_file_size_mb == 0 {
            issues.push("security.max_file_size_mb must be greater than 0".to_string());
        }
        if !(72..=1200).contains(&self.ocr.dpi) {
            issues.push(format!("ocr.dpi {} outside supported range 72-1200", self.ocr.dpi));
        }
        if !(0.0..=1.0).contains(&self.ocr.min_confidence) {
            issues.push(format!(
                "ocr.min_confidence {} must be between 0 and 1",
                self.ocr.min_confidence
            ));
        }
        if self.ocr.engines.is_empty() {
            issues.push("ocr.engines is empty; OCR will be skipped".to_string());
        }
        if self.keywords.targets.iter().all(|k| k.trim().is_empty()) {
            issues.push("keywords.targets has no usable keywords".to_string());
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.security.allowed_file_extensions, vec![".pdf"]);
        assert_eq!(config.security.max_file_size_mb, 100);
        assert_eq!(config.ocr.language, "eng");
        assert_eq!(config.keywords.targets.len(), 3);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_allows_extension_normalizes() {
        let security = SecurityConfig::default();
        assert!(security.allows_extension("pdf"));
        assert!(security.allows_extension(".PDF"));
        assert!(!security.allows_extension("png"));
    }

    #[test]
    fn test_load_toml_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cde-ocr.toml");
        std::fs::write(
            &path,
            "[security]\nmax_file_size_mb = 5\n\n[keywords]\ntargets = [\"FOUNDATION NOTES\"]\n",
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.security.max_file_size_mb, 5);
        assert_eq!(config.security.allowed_file_extensions, vec![".pdf"]);
        assert_eq!(config.keywords.targets, vec!["FOUNDATION NOTES"]);
        assert_eq!(config.source_path.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_load_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("c.yaml");
        std::fs::write(&yaml, "ocr:\n  dpi: 200\n").unwrap();
        assert_eq!(Config::load_from_path(&yaml).unwrap().ocr.dpi, 200);

        let json = dir.path().join("c.json");
        std::fs::write(&json, r#"{"ocr": {"engines": ["tesseract"]}}"#).unwrap();
        assert_eq!(
            Config::load_from_path(&json).unwrap().ocr.engines,
            vec!["tesseract"]
        );
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "security = [").unwrap();
        let err = Config::load_from_path(&path).unwrap_err();
        assert!(err.contains("TOML"));
    }

    #[test]
    fn test_validate_reports_issues() {
        let mut config = Config::default();
        config.security.allowed_file_extensions.clear();
        config.ocr.min_confidence = 1.5;
        config.ocr.dpi = 10;
        let issues = config.validate();
        assert_eq!(issues.len(), 3);
    }
}
