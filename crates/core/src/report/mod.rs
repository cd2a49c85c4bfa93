//! Run reports and their delivery.

mod config;
mod json;
mod sink;
mod types;

pub use config::ReportConfig;
pub use json::JsonFileSink;
pub use sink::{DeliveryError, DeliveryStatus, ReportSink};
pub use types::{CaptureSummary, ItemResult, RunReport, RunSummary};
