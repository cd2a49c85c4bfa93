//! Backoff policy and the retry loop.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::RetryConfig;
use crate::failure::{Classified, ErrorKind, Stage};
use crate::metrics;

/// The last error seen once a retried operation gives up.
#[derive(Debug, Clone)]
pub struct RetryFailure<E> {
    pub error: E,
    /// Attempts made, including the one that produced `error`.
    pub attempts: u32,
}

impl<E: fmt::Display> fmt::Display for RetryFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (after {} attempt(s))", self.error, self.attempts)
    }
}

/// Retry policy for one stage.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    stage: Stage,
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    retry_on: BTreeSet<ErrorKind>,
}

impl RetryPolicy {
    pub fn new(stage: Stage, config: &RetryConfig) -> Self {
        Self {
            stage,
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms.max(config.initial_delay_ms)),
            multiplier: config.backoff_multiplier.max(1.0),
            retry_on: config.retry_on.clone(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let millis = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    pub fn is_retryable(&self, kind: ErrorKind) -> bool {
        self.retry_on.contains(&kind)
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable kind,
    /// or runs out of attempts.
    ///
    /// `subject` only labels log lines.
    pub async fn run<T, E, F, Fut>(&self, subject: &str, operation: F) -> Result<T, RetryFailure<E>>
    where
        E: Classified + fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        with_retry(self, subject, operation).await
    }
}

/// Wraps a re-invocable async operation in `policy`.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    subject: &str,
    mut operation: F,
) -> Result<T, RetryFailure<E>>
where
    E: Classified + fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        "{} {} succeeded on attempt {}/{}",
                        policy.stage, subject, attempt, policy.max_attempts
                    );
                }
                return Ok(value);
            }
            Err(error) => {
                let kind = error.kind();
                if !policy.is_retryable(kind) {
                    debug!(
                        "{} {} failed with non-retryable {}: {}",
                        policy.stage, subject, kind, error
                    );
                    return Err(RetryFailure {
                        error,
                        attempts: attempt,
                    });
                }
                if attempt >= policy.max_attempts {
                    warn!(
                        "{} {} giving up after {} attempt(s): {}",
                        policy.stage, subject, attempt, error
                    );
                    return Err(RetryFailure {
                        error,
                        attempts: attempt,
                    });
                }

                let delay = policy.delay_for(attempt);
                warn!(
                    "{} {} attempt {}/{} failed ({}), retrying in {:?}: {}",
                    policy.stage, subject, attempt, policy.max_attempts, kind, delay, error
                );
                metrics::RETRIES
                    .with_label_values(&[policy.stage.as_str(), kind.as_str()])
                    .inc();
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
