//! JSON results file sink.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{DeliveryError, ReportSink, RunReport};

/// Writes the report as pretty-printed JSON.
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn error(&self, reason: impl std::fmt::Display) -> DeliveryError {
        DeliveryError::new(self.name(), format!("{}: {}", self.path.display(), reason))
    }
}

#[async_trait]
impl ReportSink for JsonFileSink {
    fn name(&self) -> &str {
        "json_file"
    }

    async fn deliver(&self, report: &RunReport) -> Result<(), DeliveryError> {
        let json = serde_json::to_vec_pretty(report).map_err(|e| self.error(e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.error(e))?;
        }
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| self.error(e))?;

        info!(
            "Wrote {} result(s) to {}",
            report.results.len(),
            self.path.display()
        );
        Ok(())
    }
}
