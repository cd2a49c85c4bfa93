//! HTTP chart capturer.
//!
//! Downloads pre-rendered chart images straight from the chart provider.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use super::{CaptureArtifact, CaptureConfig, CaptureError, ChartCapturer, ChartVariant};
use crate::item::Item;

/// Captures charts by fetching their image URLs.
pub struct HttpChartCapturer {
    client: Client,
    timeout_secs: u64,
    screenshots_dir: Option<PathBuf>,
}

impl HttpChartCapturer {
    /// Creates a new capturer from configuration.
    pub fn new(config: &CaptureConfig) -> Result<Self, CaptureError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| CaptureError::transient(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout_secs: config.timeout_secs,
            screenshots_dir: config.screenshots_dir.clone(),
        })
    }

    fn map_request_error(&self, err: reqwest::Error) -> CaptureError {
        if err.is_timeout() {
            CaptureError::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            CaptureError::transient(err.to_string())
        }
    }

    async fn save(&self, item: &Item, artifact: &mut CaptureArtifact) -> Result<(), CaptureError> {
        let Some(dir) = &self.screenshots_dir else {
            return Ok(());
        };

        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!(
            "{}_{}.{}",
            item.symbol,
            artifact.variant,
            artifact.extension()
        ));
        tokio::fs::write(&path, &artifact.bytes).await?;
        debug!("Saved {} {} chart to {:?}", item.symbol, artifact.variant, path);
        artifact.saved_to = Some(path);
        Ok(())
    }
}

/// Maps a non-success HTTP status onto a capture error.
fn status_error(status: StatusCode, url: &str) -> CaptureError {
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            CaptureError::transient(format!("HTTP {} from {}", status, url))
        }
        s if s.is_server_error() => CaptureError::transient(format!("HTTP {} from {}", s, url)),
        s => CaptureError::not_found(format!("HTTP {} from {}", s, url)),
    }
}

#[async_trait]
impl ChartCapturer for HttpChartCapturer {
    fn name(&self) -> &str {
        "http"
    }

    async fn capture(
        &self,
        item: &Item,
        variant: &ChartVariant,
    ) -> Result<CaptureArtifact, CaptureError> {
        let url = variant.url_for(&item.symbol);
        debug!("Fetching {} {} chart from {}", item.symbol, variant.tag, url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, &url));
        }

        let media_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_lowercase())
            .unwrap_or_else(|| "image/png".to_string());
        if !media_type.starts_with("image/") {
            return Err(CaptureError::not_found(format!(
                "expected an image from {}, got {}",
                url, media_type
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.map_request_error(e))?;
        if bytes.is_empty() {
            return Err(CaptureError::transient(format!("empty body from {}", url)));
        }

        let mut artifact = CaptureArtifact::new(variant, media_type, bytes.to_vec());
        self.save(item, &mut artifact).await?;
        Ok(artifact)
    }
}
