//! Types for the executor module.

use serde::Serialize;

/// What became of one submitted task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome<T> {
    /// The task ran to completion.
    Completed(T),
    /// The task panicked. The panic did not affect its siblings.
    Panicked(String),
    /// The task was started but aborted after the grace period.
    Cancelled,
    /// The executor was cancelled before this task could be started.
    NotStarted,
}

impl<T> TaskOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            _ => None,
        }
    }
}

/// Status of a worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    /// Pool name.
    pub name: String,
    /// Tasks currently running.
    pub active_jobs: usize,
    /// Maximum concurrent tasks.
    pub max_concurrent: usize,
    /// Tasks waiting for a slot.
    pub queued_jobs: usize,
    /// Highest number of tasks ever running at once.
    pub peak_active_jobs: usize,
    /// Tasks that ran to completion (panics included).
    pub total_processed: u64,
    /// Tasks aborted or never started because of cancellation.
    pub total_cancelled: u64,
}
