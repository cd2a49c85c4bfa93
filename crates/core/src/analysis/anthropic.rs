//! Anthropic Messages API analyzer.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{
    analysis_prompt, parse_analysis, AnalysisConfig, AnalysisError, AnalysisOutcome,
    ChartAnalyzer,
};
use crate::capture::CaptureArtifact;
use crate::item::Item;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Sends chart images to a vision model and parses its verdict.
pub struct AnthropicAnalyzer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
    max_tokens: u32,
}

impl AnthropicAnalyzer {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            api_base: "https://api.anthropic.com".to_string(),
            max_tokens: 2000,
        }
    }

    /// Creates an analyzer from configuration. Fails without an API key.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        let api_key = config.require_api_key()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                AnalysisError::unavailable(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: config.model.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            max_tokens: config.max_tokens,
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, item: &Item, artifacts: &[CaptureArtifact]) -> MessagesRequest {
        let mut content = Vec::with_capacity(artifacts.len() * 2 + 1);
        for artifact in artifacts {
            content.push(ContentBlock::Text {
                text: format!("{} chart:", artifact.label.to_uppercase()),
            });
            content.push(ContentBlock::Image {
                source: ImageSource {
                    source_type: "base64",
                    media_type: artifact.media_type.clone(),
                    data: STANDARD.encode(&artifact.bytes),
                },
            });
        }
        let labels: Vec<&str> = artifacts.iter().map(|a| a.label.as_str()).collect();
        content.push(ContentBlock::Text {
            text: analysis_prompt(item, &labels),
        });

        MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content,
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Maps a non-200 API status onto an analysis error.
fn status_error(status: u16, message: String) -> AnalysisError {
    match status {
        429 => AnalysisError::rate_limited(message),
        401 | 403 => AnalysisError::unauthorized(message),
        // 529 is "overloaded"
        500..=599 => AnalysisError::unavailable(format!("HTTP {}: {}", status, message)),
        400..=499 => AnalysisError::invalid_input(format!("HTTP {}: {}", status, message)),
        _ => AnalysisError::unavailable(format!("unexpected HTTP {}: {}", status, message)),
    }
}

#[async_trait]
impl ChartAnalyzer for AnthropicAnalyzer {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn analyze(
        &self,
        item: &Item,
        artifacts: &[CaptureArtifact],
    ) -> Result<AnalysisOutcome, AnalysisError> {
        if artifacts.is_empty() {
            return Err(AnalysisError::invalid_input("no charts to analyze"));
        }

        let request = self.build_request(item, artifacts);
        debug!(
            "Requesting analysis of {} ({} charts) from {}",
            item.symbol,
            artifacts.len(),
            self.model
        );

        let response = self
            .client
            .post(format!("{}/v1/messages", self.api_base))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalysisError::unavailable(format!("request timed out: {}", e))
                } else {
                    AnalysisError::unavailable(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            return Err(status_error(status, message));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::unavailable(format!("malformed response: {}", e)))?;

        let text = body
            .content
            .into_iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(parse_analysis(&text, &item.symbol))
    }
}
