//! Retry with exponential backoff.
//!
//! Stages never loop on their own: each collaborator call is handed to a
//! [`RetryPolicy`], which decides from the error's [`ErrorKind`] whether
//! another attempt is worthwhile and how long to wait before it.
//!
//! [`ErrorKind`]: crate::failure::ErrorKind

mod config;
mod policy;

pub(crate) use config::{analysis_retry, capture_retry};
pub use config::RetryConfig;
pub use policy::{with_retry, RetryFailure, RetryPolicy};
