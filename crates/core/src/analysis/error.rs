//! Error types for the analysis module.

use thiserror::Error;

use crate::failure::{Classified, ErrorKind};

/// Errors that can occur while analyzing charts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// The service asked us to slow down.
    #[error("Rate limited: {message}")]
    RateLimited { message: String },

    /// The request was rejected as malformed.
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Credentials missing or rejected.
    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// The service is down, overloaded, or unreachable.
    #[error("Service unavailable: {reason}")]
    ServiceUnavailable { reason: String },
}

impl AnalysisError {
    /// Creates a new rate limited error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
        }
    }

    /// Creates a new invalid input error.
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Creates a new unauthorized error.
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }

    /// Creates a new service unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            reason: reason.into(),
        }
    }

    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_transient()
    }
}

impl Classified for AnalysisError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::ServiceUnavailable { .. } => ErrorKind::ServiceUnavailable,
        }
    }
}
