//! Run-wide stop signal.

use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

use crate::failure::ErrorKind;

/// Cancellation token plus the reason the run was stopped.
///
/// Cloning yields a handle to the same signal. The first reason recorded
/// wins; later calls to [`RunHalt::halt`] only re-cancel.
#[derive(Debug, Clone, Default)]
pub struct RunHalt {
    token: CancellationToken,
    reason: Arc<OnceLock<ErrorKind>>,
}

impl RunHalt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops the run, recording why.
    pub fn halt(&self, reason: ErrorKind) {
        let _ = self.reason.set(reason);
        self.token.cancel();
    }

    pub fn is_halted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Why the run stopped. Defaults to [`ErrorKind::DeadlineExceeded`] when
    /// the token was cancelled without a recorded reason.
    pub fn reason(&self) -> ErrorKind {
        self.reason
            .get()
            .copied()
            .unwrap_or(ErrorKind::DeadlineExceeded)
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_reason_wins() {
        let halt = RunHalt::new();
        let handle = halt.clone();
        assert!(!halt.is_halted());

        handle.halt(ErrorKind::Interrupted);
        halt.halt(ErrorKind::DeadlineExceeded);

        assert!(halt.is_halted());
        assert_eq!(halt.reason(), ErrorKind::Interrupted);
    }

    #[test]
    fn test_default_reason() {
        let halt = RunHalt::new();
        halt.token().cancel();
        assert_eq!(halt.reason(), ErrorKind::DeadlineExceeded);
    }
}
