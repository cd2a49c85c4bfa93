//! Chart capture.
//!
//! A [`ChartCapturer`] turns one (item, chart variant) pair into an image
//! artifact. The pipeline fans out over every configured variant of an item
//! and needs all required ones before analysis can start.

mod config;
mod error;
mod http;
mod traits;
mod types;

pub use config::CaptureConfig;
pub use error::CaptureError;
pub use http::HttpChartCapturer;
pub use traits::ChartCapturer;
pub use types::{default_variants, CaptureArtifact, ChartVariant};
