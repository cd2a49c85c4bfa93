//! Report sink trait definition.

use async_trait::async_trait;
use thiserror::Error;

use super::RunReport;
use crate::failure::{Classified, ErrorKind};

/// Delivery of a report failed.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Report delivery via {sink} failed: {reason}")]
pub struct DeliveryError {
    pub sink: String,
    pub reason: String,
}

impl DeliveryError {
    pub fn new(sink: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            sink: sink.into(),
            reason: reason.into(),
        }
    }
}

impl Classified for DeliveryError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Delivery
    }
}

/// What happened to the report at the end of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryStatus {
    /// Handed to the named sink.
    Delivered { sink: String },
    /// No sink configured.
    Skipped,
    Failed(DeliveryError),
}

impl DeliveryStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Receives the consolidated report once per run.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Returns the name of this sink implementation.
    fn name(&self) -> &str;

    /// Delivers the report.
    async fn deliver(&self, report: &RunReport) -> Result<(), DeliveryError>;
}
