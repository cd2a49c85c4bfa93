//! Configuration for the capture module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{default_variants, ChartVariant};
use crate::retry::{self, RetryConfig};

/// Configuration for chart capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// User-Agent sent with chart requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Directory to keep captured images in. Images are only held in memory
    /// when unset.
    #[serde(default)]
    pub screenshots_dir: Option<PathBuf>,

    /// Charts captured for every ticker.
    #[serde(default = "default_variants")]
    pub variants: Vec<ChartVariant>,

    /// Retry configuration.
    #[serde(
        default = "RetryConfig::capture_defaults",
        deserialize_with = "retry::capture_retry"
    )]
    pub retry: RetryConfig,
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("chartwatch/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            screenshots_dir: None,
            variants: default_variants(),
            retry: RetryConfig::capture_defaults(),
        }
    }
}

impl CaptureConfig {
    /// Sets the chart variants.
    pub fn with_variants(mut self, variants: Vec<ChartVariant>) -> Self {
        self.variants = variants;
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Keeps captured images in `dir`.
    pub fn with_screenshots_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshots_dir = Some(dir.into());
        self
    }
}
