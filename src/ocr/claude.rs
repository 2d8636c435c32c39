//! Claude vision OCR via the Anthropic Messages API.
//!
//! Each page image is sent as a base64 PNG with an extraction prompt tuned
//! for engineering drawings. The reply becomes a single full-page element.

use std::time::Duration;

use base64::Engine as _;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::engine::{Availability, OcrEngine, OcrError, OcrOptions, PageImage};
use crate::models::{BoundingBox, ExtractedElement};

const ENGINE_NAME: &str = "claude";
const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const FULL_PAGE_CONFIDENCE: f64 = 0.85;
const MAX_RATE_LIMIT_RETRIES: u32 = 2;

const EXTRACTION_PROMPT: &str = "Extract all visible text from this image. Focus on:
- All printed text including headers, labels, and captions
- Technical specifications and measurements
- Building codes and standards references
- Material specifications
Return the raw text only, maintaining original formatting where possible.";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock<'a> {
    Image { source: ImageSource<'a> },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    media_type: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
    #[serde(default)]
    usage: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Claude OCR engine.
pub struct ClaudeEngine {
    api_key: Option<String>,
    model: String,
    endpoint: String,
    client: Client,
}

impl ClaudeEngine {
    /// Build the engine. `api_key` falls back to `ANTHROPIC_API_KEY`.
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Result<Self, OcrError> {
        let api_key = api_key
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .filter(|k| !k.trim().is_empty());
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| OcrError::Configuration {
                engine: ENGINE_NAME.to_string(),
                reason: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self {
            api_key,
            model: model.into(),
            endpoint: API_URL.to_string(),
            client,
        })
    }

    /// Point the engine at a different Messages endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn api_key(&self) -> Result<&str, OcrError> {
        self.api_key.as_deref().ok_or_else(|| OcrError::Credentials {
            engine: ENGINE_NAME.to_string(),
            reason: "ANTHROPIC_API_KEY not configured".to_string(),
        })
    }

    fn call_api(&self, image_b64: String, page: u32) -> Result<MessagesResponse, OcrError> {
        let api_key = self.api_key()?;
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: 4000,
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentBlock::Image {
                        source: ImageSource {
                            kind: "base64",
                            media_type: "image/png",
                            data: image_b64,
                        },
                    },
                    ContentBlock::Text {
                        text: EXTRACTION_PROMPT,
                    },
                ],
            }],
        };

        let mut attempt = 0;
        loop {
            let response = self
                .client
                .post(&self.endpoint)
                .header("x-api-key", api_key)
                .header("anthropic-version", API_VERSION)
                .json(&request)
                .send()
                .map_err(|e| extraction_error(page, format!("Claude API request failed: {}", e)))?;

            let status = response.status();
            if status.is_success() {
                return response
                    .json()
                    .map_err(|e| extraction_error(page, format!("Invalid Claude response: {}", e)));
            }

            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body = response.text().unwrap_or_default();

            match status {
                StatusCode::TOO_MANY_REQUESTS if attempt < MAX_RATE_LIMIT_RETRIES => {
                    let wait = retry_after.unwrap_or(2u64.pow(attempt + 1));
                    warn!("Claude rate limited on page {}, retrying in {}s", page, wait);
                    std::thread::sleep(Duration::from_secs(wait));
                    attempt += 1;
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    return Err(OcrError::RateLimited {
                        engine: ENGINE_NAME.to_string(),
                        page,
                        retry_after_secs: retry_after,
                    });
                }
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    return Err(OcrError::Credentials {
                        engine: ENGINE_NAME.to_string(),
                        reason: format!("HTTP {}: {}", status, body.trim()),
                    });
                }
                _ => {
                    return Err(extraction_error(
                        page,
                        format!("Claude API error HTTP {}: {}", status, body.trim()),
                    ));
                }
            }
        }
    }
}

fn extraction_error(page: u32, reason: String) -> OcrError {
    OcrError::Extraction {
        engine: ENGINE_NAME.to_string(),
        page,
        reason,
    }
}

impl OcrEngine for ClaudeEngine {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn priority(&self) -> i32 {
        8
    }

    fn check_availability(&self) -> Availability {
        if self.api_key.is_some() {
            Availability::available(format!("Claude OCR available ({})", self.model))
        } else {
            Availability::unavailable("ANTHROPIC_API_KEY not configured")
        }
    }

    fn extract_text(
        &self,
        image: &PageImage,
        page_number: u32,
        _options: &OcrOptions,
    ) -> Result<Vec<ExtractedElement>, OcrError> {
        let bytes = std::fs::read(&image.path)?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        debug!("Sending page {} to Claude ({})", page_number, self.model);

        let response = self.call_api(encoded, page_number)?;
        let text = response
            .content
            .iter()
            .filter_map(|b| b.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n");
        if text.trim().is_empty() {
            warn!("No content in Claude response for page {}", page_number);
        }

        let element = ExtractedElement::new(text.trim(), page_number, FULL_PAGE_CONFIDENCE)
            .with_bbox(BoundingBox::new(
                0.0,
                0.0,
                image.width as f64,
                image.height as f64,
                FULL_PAGE_CONFIDENCE,
            ))
            .with_metadata("engine", ENGINE_NAME)
            .with_metadata("provider", "anthropic")
            .with_metadata("model", self.model.as_str())
            .with_metadata("usage", response.usage)
            .with_metadata("full_page_extraction", true);
        Ok(vec![element])
    }

    fn supported_features(&self) -> Vec<String> {
        vec![
            "text_extraction".to_string(),
            "full_page".to_string(),
            "handwriting".to_string(),
        ]
    }

    fn validate_configuration(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.api_key.is_none() {
            issues.push("ANTHROPIC_API_KEY is not set".to_string());
        }
        if self.model.trim().is_empty() {
            issues.push("ocr.claude_model is empty".to_string());
        }
        issues
    }
}
