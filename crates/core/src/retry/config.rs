//! Retry configuration.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::failure::ErrorKind;

/// How a stage retries failed collaborator calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay after the first failed attempt, in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Upper bound for any single delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Exponential backoff multiplier.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Error kinds worth another attempt. Defaults to every transient kind.
    #[serde(default = "default_retry_on")]
    pub retry_on: BTreeSet<ErrorKind>,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_retry_on() -> BTreeSet<ErrorKind> {
    ErrorKind::ALL
        .iter()
        .copied()
        .filter(|kind| kind.is_transient())
        .collect()
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            retry_on: default_retry_on(),
        }
    }
}

impl RetryConfig {
    /// Defaults for chart captures.
    pub fn capture_defaults() -> Self {
        Self::default()
    }

    /// Defaults for analysis requests, which back off harder.
    pub fn analysis_defaults() -> Self {
        Self {
            initial_delay_ms: 2_000,
            ..Self::default()
        }
    }

    /// Sets the total number of attempts.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Replaces the set of retryable kinds.
    pub fn with_retry_on(mut self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        self.retry_on = kinds.into_iter().collect();
        self
    }

    /// A config that never retries.
    pub fn no_retry() -> Self {
        Self::default().with_max_attempts(1)
    }
}

/// A retry table where every field may be left out.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RetryOverrides {
    max_attempts: Option<u32>,
    initial_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
    backoff_multiplier: Option<f64>,
    retry_on: Option<BTreeSet<ErrorKind>>,
}

impl RetryOverrides {
    fn over(self, base: RetryConfig) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts.unwrap_or(base.max_attempts),
            initial_delay_ms: self.initial_delay_ms.unwrap_or(base.initial_delay_ms),
            max_delay_ms: self.max_delay_ms.unwrap_or(base.max_delay_ms),
            backoff_multiplier: self.backoff_multiplier.unwrap_or(base.backoff_multiplier),
            retry_on: self.retry_on.unwrap_or(base.retry_on),
        }
    }
}

/// Reads a `[capture.retry]` table; missing fields keep the capture defaults.
pub(crate) fn capture_retry<'de, D>(deserializer: D) -> Result<RetryConfig, D::Error>
where
    D: Deserializer<'de>,
{
    RetryOverrides::deserialize(deserializer)
        .map(|overrides| overrides.over(RetryConfig::capture_defaults()))
}

/// Reads an `[analysis.retry]` table; missing fields keep the analysis
/// defaults.
pub(crate) fn analysis_retry<'de, D>(deserializer: D) -> Result<RetryConfig, D::Error>
where
    D: Deserializer<'de>,
{
    RetryOverrides::deserialize(deserializer)
        .map(|overrides| overrides.over(RetryConfig::analysis_defaults()))
}
