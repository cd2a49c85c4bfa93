//! Error types for the capture module.

use thiserror::Error;

use crate::failure::{Classified, ErrorKind};

/// Errors that can occur while capturing a chart.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaptureError {
    /// The chart did not arrive in time.
    #[error("Capture timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The chart does not exist or could not be rendered.
    #[error("Chart not found: {reason}")]
    NotFound { reason: String },

    /// Network or filesystem hiccup.
    #[error("Transient I/O error: {reason}")]
    TransientIo { reason: String },
}

impl CaptureError {
    /// Creates a new not found error.
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::NotFound {
            reason: reason.into(),
        }
    }

    /// Creates a new transient I/O error.
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::TransientIo {
            reason: reason.into(),
        }
    }

    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_transient()
    }
}

impl Classified for CaptureError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::TransientIo { .. } => ErrorKind::TransientIo,
        }
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        Self::transient(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(CaptureError::Timeout { timeout_secs: 30 }.is_retryable());
        assert!(CaptureError::transient("reset by peer").is_retryable());
        assert!(!CaptureError::not_found("no such symbol").is_retryable());
    }
}
