//! Types for the capture module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One configured chart flavour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartVariant {
    /// Short identifier, e.g. "daily". Used in file names and reports.
    pub tag: String,
    /// Label shown to the analyzer next to the image.
    pub label: String,
    /// Chart URL with a `{symbol}` placeholder.
    pub url_template: String,
    /// Whether the item fails when this chart cannot be captured.
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl ChartVariant {
    pub fn new(
        tag: impl Into<String>,
        label: impl Into<String>,
        url_template: impl Into<String>,
    ) -> Self {
        Self {
            tag: tag.into(),
            label: label.into(),
            url_template: url_template.into(),
            required: true,
        }
    }

    /// Marks the variant as nice-to-have.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Renders the chart URL for `symbol`.
    pub fn url_for(&self, symbol: &str) -> String {
        self.url_template
            .replace("{symbol}", &urlencoding::encode(symbol))
    }
}

/// The four charts every ticker gets by default.
pub fn default_variants() -> Vec<ChartVariant> {
    vec![
        ChartVariant::new(
            "daily",
            "Daily",
            "https://stockcharts.com/c-sc/sc?s={symbol}&p=D&yr=0&mn=6&dy=0&i=t&r=1",
        ),
        ChartVariant::new(
            "weekly",
            "Weekly",
            "https://stockcharts.com/c-sc/sc?s={symbol}&p=W&yr=2&mn=0&dy=0&i=t&r=1",
        ),
        ChartVariant::new(
            "pnf_daily",
            "P&F Daily",
            "https://stockcharts.com/def/servlet/SC.pnf?c={symbol},P",
        ),
        ChartVariant::new(
            "pnf_weekly",
            "P&F Weekly",
            "https://stockcharts.com/def/servlet/SC.pnf?c={symbol},PWADANRNO",
        ),
    ]
}

/// A captured chart image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureArtifact {
    /// Tag of the variant this image belongs to.
    pub variant: String,
    pub label: String,
    /// MIME type, e.g. "image/png".
    pub media_type: String,
    /// Raw image bytes. Never written into reports.
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub size_bytes: usize,
    /// Where the image was written, if screenshots are kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<PathBuf>,
    pub captured_at: DateTime<Utc>,
}

impl CaptureArtifact {
    pub fn new(variant: &ChartVariant, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            variant: variant.tag.clone(),
            label: variant.label.clone(),
            media_type: media_type.into(),
            size_bytes: bytes.len(),
            bytes,
            saved_to: None,
            captured_at: Utc::now(),
        }
    }

    /// File extension matching the media type.
    pub fn extension(&self) -> &'static str {
        match self.media_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/gif" => "gif",
            "image/webp" => "webp",
            _ => "png",
        }
    }
}
