//! Failure taxonomy shared by every stage of a run.
//!
//! Collaborator errors are mapped onto a closed set of [`ErrorKind`]s. The
//! kind decides whether an error is retried (see [`crate::retry`]) and is
//! what ends up in the [`FailureRecord`] of an item that did not make it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::item::Item;

/// What went wrong, independent of which collaborator reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A collaborator call took too long.
    Timeout,
    /// The requested chart does not exist.
    NotFound,
    /// Connection or I/O hiccup.
    TransientIo,
    /// The analysis service is throttling us.
    RateLimited,
    /// The analysis service rejected the request.
    InvalidInput,
    /// Credentials were missing or rejected.
    Unauthorized,
    /// The analysis service is down or overloaded.
    ServiceUnavailable,
    /// The run deadline passed before the item finished.
    DeadlineExceeded,
    /// The run was interrupted before the item finished.
    Interrupted,
    /// The item's pipeline task panicked.
    Internal,
    /// The report sink could not deliver the report.
    Delivery,
}

/// Coarse classification of an [`ErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Worth retrying locally.
    Transient,
    /// Retrying cannot help.
    Permanent,
    /// The run stopped waiting for the item.
    Timeout,
    /// Run-level delivery failure.
    Delivery,
}

impl ErrorKind {
    /// Every kind, in declaration order.
    pub const ALL: [ErrorKind; 11] = [
        ErrorKind::Timeout,
        ErrorKind::NotFound,
        ErrorKind::TransientIo,
        ErrorKind::RateLimited,
        ErrorKind::InvalidInput,
        ErrorKind::Unauthorized,
        ErrorKind::ServiceUnavailable,
        ErrorKind::DeadlineExceeded,
        ErrorKind::Interrupted,
        ErrorKind::Internal,
        ErrorKind::Delivery,
    ];

    pub fn class(self) -> ErrorClass {
        match self {
            Self::Timeout | Self::TransientIo | Self::RateLimited | Self::ServiceUnavailable => {
                ErrorClass::Transient
            }
            Self::NotFound | Self::InvalidInput | Self::Unauthorized | Self::Internal => {
                ErrorClass::Permanent
            }
            Self::DeadlineExceeded | Self::Interrupted => ErrorClass::Timeout,
            Self::Delivery => ErrorClass::Delivery,
        }
    }

    pub fn is_transient(self) -> bool {
        self.class() == ErrorClass::Transient
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::NotFound => "not_found",
            Self::TransientIo => "transient_io",
            Self::RateLimited => "rate_limited",
            Self::InvalidInput => "invalid_input",
            Self::Unauthorized => "unauthorized",
            Self::ServiceUnavailable => "service_unavailable",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::Interrupted => "interrupted",
            Self::Internal => "internal",
            Self::Delivery => "delivery",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can be mapped onto an [`ErrorKind`].
pub trait Classified {
    fn kind(&self) -> ErrorKind;
}

/// Pipeline stage an item was in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Capture,
    Analysis,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Capture => "capture",
            Self::Analysis => "analysis",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an item did not produce an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub symbol: String,
    pub name: String,
    pub stage: Stage,
    pub kind: ErrorKind,
    /// Chart variant that failed, for capture failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    pub message: String,
    /// Attempts spent before giving up (0 if the stage never ran).
    pub attempts: u32,
}

impl FailureRecord {
    pub fn new(item: &Item, stage: Stage, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            symbol: item.symbol.clone(),
            name: item.display_name().to_string(),
            stage,
            kind,
            variant: None,
            message: message.into(),
            attempts: 0,
        }
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn class(&self) -> ErrorClass {
        self.kind.class()
    }
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed at {}", self.symbol, self.stage)?;
        if let Some(variant) = &self.variant {
            write!(f, " ({})", variant)?;
        }
        write!(
            f,
            ": {} after {} attempt(s): {}",
            self.kind, self.attempts, self.message
        )
    }
}
