//! Item state machine.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::failure::{ErrorKind, Stage};

/// Where an item is in its pipeline.
///
/// ```text
/// Pending -> Capturing -> Analyzing -> Completed
///                |            \-> AnalysisFailed
///                |-> CaptureFailed
///                \-> Captured      (capture-only runs)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ItemState {
    Pending,
    Capturing { variants: usize },
    Analyzing { artifacts: usize },
    Completed,
    Captured { artifacts: usize },
    CaptureFailed { kind: ErrorKind },
    AnalysisFailed { kind: ErrorKind },
}

/// An attempt to move an item backwards or skip a stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid item state transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: &'static str,
    pub to: &'static str,
}

impl ItemState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Capturing { .. } => "capturing",
            Self::Analyzing { .. } => "analyzing",
            Self::Completed => "completed",
            Self::Captured { .. } => "captured",
            Self::CaptureFailed { .. } => "capture_failed",
            Self::AnalysisFailed { .. } => "analysis_failed",
        }
    }

    /// Stage the item is in, or ended in.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Pending
            | Self::Capturing { .. }
            | Self::Captured { .. }
            | Self::CaptureFailed { .. } => Stage::Capture,
            Self::Analyzing { .. } | Self::Completed | Self::AnalysisFailed { .. } => {
                Stage::Analysis
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed
                | Self::Captured { .. }
                | Self::CaptureFailed { .. }
                | Self::AnalysisFailed { .. }
        )
    }

    /// Moves to `next`, rejecting transitions the pipeline never makes.
    pub fn advance(self, next: ItemState) -> Result<ItemState, TransitionError> {
        let allowed = matches!(
            (&self, &next),
            (Self::Pending, Self::Capturing { .. })
                | (
                    Self::Capturing { .. },
                    Self::Analyzing { .. } | Self::Captured { .. } | Self::CaptureFailed { .. }
                )
                | (
                    Self::Analyzing { .. },
                    Self::Completed | Self::AnalysisFailed { .. }
                )
        );

        if allowed {
            Ok(next)
        } else {
            Err(TransitionError {
                from: self.name(),
                to: next.name(),
            })
        }
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
