//! Types for the batch orchestrator.

use crate::executor::PoolStatus;
use crate::failure::ErrorKind;
use crate::report::{DeliveryStatus, RunReport};

/// Everything a run hands back to its caller.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub report: RunReport,
    pub delivery: DeliveryStatus,
    /// Item pool statistics at the end of the run.
    pub item_pool: PoolStatus,
    /// Why the run was halted, if it was.
    pub halted: Option<ErrorKind>,
}

impl RunOutput {
    /// True when the run was stopped by an interrupt rather than finishing
    /// or hitting its deadline.
    pub fn was_interrupted(&self) -> bool {
        self.halted == Some(ErrorKind::Interrupted)
    }
}
