//! Configuration for the orchestrator.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Concurrency bounds and time limits for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Items processed at once.
    #[serde(default = "default_max_items")]
    pub max_concurrent_items: usize,

    /// Chart captures in flight per item.
    #[serde(default = "default_max_captures")]
    pub max_concurrent_captures: usize,

    /// Analysis requests in flight across the whole run.
    #[serde(default = "default_max_analyses")]
    pub max_concurrent_analyses: usize,

    /// Run deadline in seconds. 0 disables it.
    #[serde(default = "default_deadline")]
    pub deadline_secs: u64,

    /// How long in-flight items may take to wind down once the run is
    /// halted, in seconds.
    #[serde(default = "default_grace_period")]
    pub grace_period_secs: u64,
}

fn default_max_items() -> usize {
    3
}

fn default_max_captures() -> usize {
    2
}

fn default_max_analyses() -> usize {
    5
}

fn default_deadline() -> u64 {
    1800 // 30 minutes
}

fn default_grace_period() -> u64 {
    10
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_concurrent_items: default_max_items(),
            max_concurrent_captures: default_max_captures(),
            max_concurrent_analyses: default_max_analyses(),
            deadline_secs: default_deadline(),
            grace_period_secs: default_grace_period(),
        }
    }
}

impl RunConfig {
    /// Run deadline, if any.
    pub fn deadline(&self) -> Option<Duration> {
        (self.deadline_secs > 0).then(|| Duration::from_secs(self.deadline_secs))
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    /// Sets the number of items processed at once.
    pub fn with_max_items(mut self, max: usize) -> Self {
        self.max_concurrent_items = max;
        self
    }

    /// Sets the number of captures in flight per item.
    pub fn with_max_captures(mut self, max: usize) -> Self {
        self.max_concurrent_captures = max;
        self
    }

    /// Sets the number of analysis requests in flight.
    pub fn with_max_analyses(mut self, max: usize) -> Self {
        self.max_concurrent_analyses = max;
        self
    }

    /// Sets the run deadline. `None` disables it.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline_secs = deadline.map(|d| d.as_secs().max(1)).unwrap_or(0);
        self
    }

    /// Sets the grace period.
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period_secs = grace.as_secs();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.max_concurrent_items, 3);
        assert_eq!(config.max_concurrent_analyses, 5);
        assert_eq!(config.deadline(), Some(Duration::from_secs(1800)));
    }

    #[test]
    fn test_zero_deadline_disables() {
        let config = RunConfig::default().with_deadline(None);
        assert_eq!(config.deadline_secs, 0);
        assert_eq!(config.deadline(), None);
    }
}
