use std::collections::HashSet;

use super::{types::Config, ConfigError};
use crate::item::{is_valid_symbol, Item};
use crate::retry::RetryConfig;

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

fn validate_retry(section: &str, retry: &RetryConfig) -> Result<(), ConfigError> {
    if retry.max_attempts == 0 {
        return Err(invalid(format!("{}.max_attempts must be at least 1", section)));
    }
    if !retry.backoff_multiplier.is_finite() || retry.backoff_multiplier < 1.0 {
        return Err(invalid(format!(
            "{}.backoff_multiplier must be at least 1.0",
            section
        )));
    }
    if retry.max_delay_ms < retry.initial_delay_ms {
        return Err(invalid(format!(
            "{}.max_delay_ms cannot be below initial_delay_ms",
            section
        )));
    }
    Ok(())
}

/// Validate configuration
///
/// Tickers are checked with [`validate_items`] so the CLI can validate an
/// override list the same way.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let run = &config.run;
    for (name, value) in [
        ("run.max_concurrent_items", run.max_concurrent_items),
        ("run.max_concurrent_captures", run.max_concurrent_captures),
        ("run.max_concurrent_analyses", run.max_concurrent_analyses),
    ] {
        if value == 0 {
            return Err(invalid(format!("{} must be at least 1", name)));
        }
    }

    if config.capture.timeout_secs == 0 {
        return Err(invalid("capture.timeout_secs cannot be 0"));
    }
    if config.capture.variants.is_empty() {
        return Err(invalid("capture.variants cannot be empty"));
    }
    if !config.capture.variants.iter().any(|v| v.required) {
        return Err(invalid("at least one capture variant must be required"));
    }
    let mut tags = HashSet::new();
    for variant in &config.capture.variants {
        if variant.tag.trim().is_empty() {
            return Err(invalid("capture variant tag cannot be empty"));
        }
        if !tags.insert(variant.tag.as_str()) {
            return Err(invalid(format!(
                "duplicate capture variant tag '{}'",
                variant.tag
            )));
        }
        if !variant.url_template.contains("{symbol}") {
            return Err(invalid(format!(
                "capture variant '{}' url_template has no {{symbol}} placeholder",
                variant.tag
            )));
        }
    }
    validate_retry("capture.retry", &config.capture.retry)?;

    if config.analysis.max_tokens == 0 {
        return Err(invalid("analysis.max_tokens cannot be 0"));
    }
    if config.analysis.timeout_secs == 0 {
        return Err(invalid("analysis.timeout_secs cannot be 0"));
    }
    validate_retry("analysis.retry", &config.analysis.retry)?;

    if !config.tickers.is_empty() {
        validate_items(&config.tickers)?;
    }

    Ok(())
}

/// Checks that a run's items are non-empty, well-formed and unique.
pub fn validate_items(items: &[Item]) -> Result<(), ConfigError> {
    if items.is_empty() {
        return Err(invalid("no tickers configured"));
    }
    let mut seen = HashSet::new();
    for item in items {
        if !is_valid_symbol(&item.symbol) {
            return Err(invalid(format!("invalid ticker symbol '{}'", item.symbol)));
        }
        if !seen.insert(item.symbol.as_str()) {
            return Err(invalid(format!("duplicate ticker symbol '{}'", item.symbol)));
        }
    }
    Ok(())
}
