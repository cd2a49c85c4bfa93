use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisConfig;
use crate::capture::CaptureConfig;
use crate::item::Item;
use crate::orchestrator::RunConfig;
use crate::report::ReportConfig;
use crate::retry::RetryConfig;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub report: ReportConfig,
    /// Tickers processed by a run, in report order.
    #[serde(default)]
    pub tickers: Vec<Item>,
}

/// Sanitized config for logging and hashing (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub run: RunConfig,
    pub capture: CaptureConfig,
    pub analysis: SanitizedAnalysisConfig,
    pub report: ReportConfig,
    pub tickers: Vec<Item>,
}

/// Sanitized analysis config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAnalysisConfig {
    pub model: String,
    pub max_tokens: u32,
    pub api_key_configured: bool,
    pub api_base: String,
    pub timeout_secs: u64,
    pub retry: RetryConfig,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            run: config.run.clone(),
            capture: config.capture.clone(),
            analysis: SanitizedAnalysisConfig {
                model: config.analysis.model.clone(),
                max_tokens: config.analysis.max_tokens,
                api_key_configured: config.analysis.require_api_key().is_ok(),
                api_base: config.analysis.api_base.clone(),
                timeout_secs: config.analysis.timeout_secs,
                retry: config.analysis.retry.clone(),
            },
            report: config.report.clone(),
            tickers: config.tickers.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.run.max_concurrent_items, 3);
        assert_eq!(config.capture.variants.len(), 4);
        assert_eq!(config.analysis.retry.initial_delay_ms, 2_000);
        assert_eq!(config.capture.retry.initial_delay_ms, 1_000);
        assert!(config.tickers.is_empty());
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[run]
max_concurrent_items = 2
max_concurrent_analyses = 1
deadline_secs = 600

[capture]
timeout_secs = 15
screenshots_dir = "output/screenshots"

[[capture.variants]]
tag = "daily"
label = "Daily"
url_template = "https://charts.example.com/{symbol}?p=D"

[[capture.variants]]
tag = "intraday"
label = "Intraday"
url_template = "https://charts.example.com/{symbol}?p=I"
required = false

[capture.retry]
max_attempts = 2

[analysis]
model = "claude-test"
api_key = "sk-ant-secret"

[analysis.retry]
max_attempts = 4
retry_on = ["rate_limited", "service_unavailable"]

[report]
path = "out/run.json"

[[tickers]]
symbol = "AAPL"
name = "Apple Inc."

[[tickers]]
symbol = "SPY"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.run.max_concurrent_items, 2);
        assert_eq!(config.run.max_concurrent_captures, 2);
        assert_eq!(config.capture.variants.len(), 2);
        assert!(!config.capture.variants[1].required);
        assert_eq!(config.capture.retry.max_attempts, 2);
        assert_eq!(config.analysis.retry.max_attempts, 4);
        assert_eq!(config.analysis.retry.retry_on.len(), 2);
        assert_eq!(config.analysis.retry.initial_delay_ms, 2_000);
        assert_eq!(config.capture.retry.initial_delay_ms, 1_000);
        assert_eq!(config.report.path.to_str(), Some("out/run.json"));
        assert_eq!(config.tickers[0].display_name(), "Apple Inc.");
        assert_eq!(config.tickers[1].display_name(), "SPY");
    }

    #[test]
    fn test_sanitized_config_hides_api_key() {
        let mut config = Config::default();
        config.analysis.api_key = Some("sk-ant-secret".to_string());

        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.analysis.api_key_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("sk-ant-secret"));
    }
}
