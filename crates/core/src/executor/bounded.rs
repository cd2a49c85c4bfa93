//! Sliding-window executor.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use prometheus::IntGauge;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{PoolStatus, TaskOutcome};
use crate::metrics;

/// Grace period given to running tasks after cancellation.
const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Statistics for the pool.
#[derive(Debug, Default)]
struct PoolStats {
    active: AtomicUsize,
    queued: AtomicUsize,
    peak: AtomicUsize,
    total_processed: AtomicU64,
    total_cancelled: AtomicU64,
}

impl PoolStats {
    fn to_status(&self, name: &str, max_concurrent: usize) -> PoolStatus {
        PoolStatus {
            name: name.to_string(),
            active_jobs: self.active.load(Ordering::Relaxed),
            max_concurrent,
            queued_jobs: self.queued.load(Ordering::Relaxed),
            peak_active_jobs: self.peak.load(Ordering::Relaxed),
            total_processed: self.total_processed.load(Ordering::Relaxed),
            total_cancelled: self.total_cancelled.load(Ordering::Relaxed),
        }
    }
}

/// Keeps the active count honest even when a task is aborted.
struct ActiveGuard {
    stats: Arc<PoolStats>,
    gauge: IntGauge,
}

impl ActiveGuard {
    fn enter(stats: &Arc<PoolStats>, gauge: IntGauge) -> Self {
        let now = stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        stats.peak.fetch_max(now, Ordering::SeqCst);
        gauge.inc();
        Self {
            stats: Arc::clone(stats),
            gauge,
        }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.stats.active.fetch_sub(1, Ordering::SeqCst);
        self.gauge.dec();
    }
}

/// Runs tasks with at most `limit` of them in flight.
///
/// A new task is admitted as soon as any running one finishes, so slow tasks
/// never hold back a whole batch. Outcomes come back in submission order.
///
/// When the executor's token is cancelled no further tasks are admitted,
/// every running task sees its own child token cancelled, and whatever is
/// still running after the grace period is aborted.
pub struct BoundedExecutor {
    name: String,
    limit: usize,
    grace_period: Duration,
    cancel: CancellationToken,
    stats: Arc<PoolStats>,
}

impl BoundedExecutor {
    /// Creates an executor. A `limit` of zero is treated as one.
    pub fn new(name: impl Into<String>, limit: usize) -> Self {
        Self {
            name: name.into(),
            limit: limit.max(1),
            grace_period: DEFAULT_GRACE_PERIOD,
            cancel: CancellationToken::new(),
            stats: Arc::new(PoolStats::default()),
        }
    }

    /// Ties the executor to an outer cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Sets how long running tasks may take to wind down after cancellation.
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn status(&self) -> PoolStatus {
        self.stats.to_status(&self.name, self.limit)
    }

    /// Runs every task and returns one outcome per task, in input order.
    ///
    /// Each task receives a child of the executor's cancellation token.
    pub async fn run<T, F, Fut>(&self, tasks: Vec<F>) -> Vec<TaskOutcome<T>>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let total = tasks.len();
        let mut outcomes: Vec<Option<TaskOutcome<T>>> =
            std::iter::repeat_with(|| None).take(total).collect();
        let mut started = vec![false; total];
        let mut pending = tasks.into_iter().enumerate();
        let mut in_flight: JoinSet<(usize, Result<T, String>)> = JoinSet::new();
        let mut grace_deadline: Option<Instant> = None;
        let gauge = metrics::POOL_ACTIVE.with_label_values(&[self.name.as_str()]);

        self.stats.queued.fetch_add(total, Ordering::Relaxed);
        debug!("{}: running {} task(s), limit {}", self.name, total, self.limit);

        loop {
            if grace_deadline.is_none() && !self.cancel.is_cancelled() {
                while in_flight.len() < self.limit {
                    let Some((index, task)) = pending.next() else {
                        break;
                    };
                    started[index] = true;
                    self.stats.queued.fetch_sub(1, Ordering::Relaxed);

                    let guard = ActiveGuard::enter(&self.stats, gauge.clone());
                    let future = task(self.cancel.child_token());
                    in_flight.spawn(async move {
                        let _guard = guard;
                        let result = AssertUnwindSafe(future)
                            .catch_unwind()
                            .await
                            .map_err(panic_message);
                        (index, result)
                    });
                }
            }

            if in_flight.is_empty() {
                break;
            }

            tokio::select! {
                biased;

                joined = in_flight.join_next() => {
                    if let Some(joined) = joined {
                        self.record(joined, &mut outcomes);
                    }
                }

                _ = self.cancel.cancelled(), if grace_deadline.is_none() => {
                    debug!(
                        "{}: cancelled with {} task(s) running, waiting up to {:?}",
                        self.name,
                        in_flight.len(),
                        self.grace_period
                    );
                    grace_deadline = Some(Instant::now() + self.grace_period);
                }

                _ = tokio::time::sleep_until(grace_deadline.unwrap_or_else(Instant::now)),
                    if grace_deadline.is_some() =>
                {
                    warn!(
                        "{}: aborting {} task(s) still running after {:?} grace period",
                        self.name,
                        in_flight.len(),
                        self.grace_period
                    );
                    in_flight.abort_all();
                    while let Some(joined) = in_flight.join_next().await {
                        self.record(joined, &mut outcomes);
                    }
                    break;
                }
            }
        }

        let mut not_started = 0;
        let mut cancelled = 0;
        let outcomes = outcomes
            .into_iter()
            .zip(started)
            .map(|(outcome, started)| match outcome {
                Some(outcome) => outcome,
                None if started => {
                    cancelled += 1;
                    TaskOutcome::Cancelled
                }
                None => {
                    not_started += 1;
                    TaskOutcome::NotStarted
                }
            })
            .collect();

        self.stats.queued.fetch_sub(not_started, Ordering::Relaxed);
        self.stats
            .total_cancelled
            .fetch_add((cancelled + not_started) as u64, Ordering::Relaxed);
        if cancelled + not_started > 0 {
            debug!(
                "{}: {} task(s) aborted, {} never started",
                self.name, cancelled, not_started
            );
        }

        outcomes
    }

    fn record<T>(
        &self,
        joined: Result<(usize, Result<T, String>), JoinError>,
        outcomes: &mut [Option<TaskOutcome<T>>],
    ) {
        match joined {
            Ok((index, Ok(value))) => {
                outcomes[index] = Some(TaskOutcome::Completed(value));
                self.stats.total_processed.fetch_add(1, Ordering::Relaxed);
            }
            Ok((index, Err(message))) => {
                warn!("{}: task {} panicked: {}", self.name, index, message);
                outcomes[index] = Some(TaskOutcome::Panicked(message));
                self.stats.total_processed.fetch_add(1, Ordering::Relaxed);
            }
            // Aborted tasks carry no index; their slots are filled in after the loop.
            Err(e) if e.is_cancelled() => {}
            Err(e) => {
                warn!("{}: task failed to join: {}", self.name, e);
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked".to_string()
    }
}
