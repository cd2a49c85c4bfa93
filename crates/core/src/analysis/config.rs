//! Configuration for the analysis module.

use serde::{Deserialize, Serialize};

use super::AnalysisError;
use crate::retry::{self, RetryConfig};

/// Configuration for the analysis service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens in the reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// API key. Also read from `ANTHROPIC_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Retry configuration.
    #[serde(
        default = "RetryConfig::analysis_defaults",
        deserialize_with = "retry::analysis_retry"
    )]
    pub retry: RetryConfig,
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_api_base() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_timeout() -> u64 {
    120
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_key: None,
            api_base: default_api_base(),
            timeout_secs: default_timeout(),
            retry: RetryConfig::analysis_defaults(),
        }
    }
}

impl AnalysisConfig {
    /// Returns the API key, or an error if none is configured.
    pub fn require_api_key(&self) -> Result<&str, AnalysisError> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                AnalysisError::unauthorized("no API key configured (set ANTHROPIC_API_KEY)")
            })
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_api_key() {
        let mut config = AnalysisConfig::default();
        assert!(config.require_api_key().is_err());

        config.api_key = Some("   ".to_string());
        assert!(config.require_api_key().is_err());

        config.api_key = Some("sk-ant-test".to_string());
        assert_eq!(config.require_api_key().unwrap(), "sk-ant-test");
    }
}
