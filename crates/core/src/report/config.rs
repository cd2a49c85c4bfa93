//! Configuration for report delivery.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the results file goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_path")]
    pub path: PathBuf,
}

fn default_path() -> PathBuf {
    PathBuf::from("output/results.json")
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
        }
    }
}
