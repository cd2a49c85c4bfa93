//! Types for the report module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::{AnalysisOutcome, Signal};
use crate::capture::CaptureArtifact;
use crate::failure::{ErrorClass, FailureRecord, Stage};

/// Charts captured for an item in a capture-only run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureSummary {
    pub symbol: String,
    pub name: String,
    pub artifacts: Vec<CaptureArtifact>,
}

/// Final result for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemResult {
    Success(AnalysisOutcome),
    Captured(CaptureSummary),
    Failure(FailureRecord),
}

impl ItemResult {
    pub fn symbol(&self) -> &str {
        match self {
            Self::Success(outcome) => &outcome.symbol,
            Self::Captured(summary) => &summary.symbol,
            Self::Failure(record) => &record.symbol,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn outcome(&self) -> Option<&AnalysisOutcome> {
        match self {
            Self::Success(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureRecord> {
        match self {
            Self::Failure(record) => Some(record),
            _ => None,
        }
    }

    /// Label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Captured(_) => "captured",
            Self::Failure(record) if record.class() == ErrorClass::Timeout => "timeout",
            Self::Failure(record) => match record.stage {
                Stage::Capture => "capture_failed",
                Stage::Analysis => "analysis_failed",
            },
        }
    }
}

/// Everything a run produced, one result per input item in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    /// When the run started.
    pub run_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<ItemResult>,
}

/// Counts over a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub captured: usize,
    pub failed: usize,
    pub capture_failures: usize,
    pub analysis_failures: usize,
    pub buy: usize,
    pub sell: usize,
    pub hold: usize,
}

impl RunReport {
    pub fn successes(&self) -> impl Iterator<Item = &AnalysisOutcome> {
        self.results.iter().filter_map(ItemResult::outcome)
    }

    pub fn failures(&self) -> impl Iterator<Item = &FailureRecord> {
        self.results.iter().filter_map(ItemResult::failure)
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            total: self.results.len(),
            ..RunSummary::default()
        };
        for result in &self.results {
            match result {
                ItemResult::Success(outcome) => {
                    summary.succeeded += 1;
                    match outcome.signal() {
                        Signal::Buy => summary.buy += 1,
                        Signal::Sell => summary.sell += 1,
                        Signal::Hold => summary.hold += 1,
                    }
                }
                ItemResult::Captured(_) => summary.captured += 1,
                ItemResult::Failure(record) => {
                    summary.failed += 1;
                    match record.stage {
                        Stage::Capture => summary.capture_failures += 1,
                        Stage::Analysis => summary.analysis_failures += 1,
                    }
                }
            }
        }
        summary
    }
}
