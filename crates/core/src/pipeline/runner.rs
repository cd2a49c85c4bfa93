//! Runs one item through capture and analysis.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::ItemState;
use crate::analysis::{AnalysisError, AnalysisOutcome, ChartAnalyzer};
use crate::capture::{CaptureArtifact, ChartCapturer, ChartVariant};
use crate::config::Config;
use crate::executor::{BoundedExecutor, RunHalt, TaskOutcome};
use crate::failure::{Classified, ErrorKind, FailureRecord, Stage};
use crate::item::Item;
use crate::metrics;
use crate::report::{CaptureSummary, ItemResult};
use crate::retry::RetryPolicy;

/// Per-item handles the pipeline runs under.
pub struct ItemContext {
    /// Cancelled when the item has to stop.
    pub cancel: CancellationToken,
    /// Run-wide halt, consulted for the reason an item was stopped.
    pub halt: RunHalt,
    state: watch::Sender<ItemState>,
}

impl ItemContext {
    pub fn new(cancel: CancellationToken, halt: RunHalt, state: watch::Sender<ItemState>) -> Self {
        Self {
            cancel,
            halt,
            state,
        }
    }

    /// A context for running a single item outside an orchestrator.
    pub fn detached() -> (Self, watch::Receiver<ItemState>) {
        let halt = RunHalt::new();
        let (tx, rx) = watch::channel(ItemState::Pending);
        (Self::new(halt.token().child_token(), halt, tx), rx)
    }

    /// Publishes the next state, keeping the current one if the move is
    /// not a valid transition.
    fn publish(&self, next: ItemState) {
        self.state.send_modify(|state| match state.clone().advance(next) {
            Ok(advanced) => *state = advanced,
            Err(e) => error!("{}", e),
        });
    }

    fn interrupted(&self, item: &Item, stage: Stage) -> FailureRecord {
        let kind = self.halt.reason();
        FailureRecord::new(
            item,
            stage,
            kind,
            format!("run stopped ({}) during {}", kind, stage),
        )
    }
}

/// Capture-then-analyze pipeline shared by every item of a run.
///
/// Clones share the collaborators and the analysis permits, so the
/// analysis bound holds across all items run through clones of one
/// pipeline.
pub struct ItemPipeline<C, A> {
    capturer: Arc<C>,
    analyzer: Arc<A>,
    variants: Arc<[ChartVariant]>,
    capture_retry: RetryPolicy,
    analysis_retry: RetryPolicy,
    capture_concurrency: usize,
    analysis_permits: Arc<Semaphore>,
    grace_period: Duration,
    capture_only: bool,
}

impl<C, A> Clone for ItemPipeline<C, A> {
    fn clone(&self) -> Self {
        Self {
            capturer: Arc::clone(&self.capturer),
            analyzer: Arc::clone(&self.analyzer),
            variants: Arc::clone(&self.variants),
            capture_retry: self.capture_retry.clone(),
            analysis_retry: self.analysis_retry.clone(),
            capture_concurrency: self.capture_concurrency,
            analysis_permits: Arc::clone(&self.analysis_permits),
            grace_period: self.grace_period,
            capture_only: self.capture_only,
        }
    }
}

fn record_stage(stage: Stage, result: &str, started: Instant) {
    metrics::STAGE_DURATION
        .with_label_values(&[stage.as_str(), result])
        .observe(started.elapsed().as_secs_f64());
}

impl<C, A> ItemPipeline<C, A>
where
    C: ChartCapturer + 'static,
    A: ChartAnalyzer + 'static,
{
    pub fn new(config: &Config, capturer: Arc<C>, analyzer: Arc<A>) -> Self {
        Self {
            capturer,
            analyzer,
            variants: config.capture.variants.clone().into(),
            capture_retry: RetryPolicy::new(Stage::Capture, &config.capture.retry),
            analysis_retry: RetryPolicy::new(Stage::Analysis, &config.analysis.retry),
            capture_concurrency: config.run.max_concurrent_captures.max(1),
            analysis_permits: Arc::new(Semaphore::new(
                config.run.max_concurrent_analyses.max(1),
            )),
            grace_period: config.run.grace_period(),
            capture_only: false,
        }
    }

    /// Stops after capture; items end as [`ItemResult::Captured`].
    pub fn capture_only(mut self, capture_only: bool) -> Self {
        self.capture_only = capture_only;
        self
    }

    pub fn is_capture_only(&self) -> bool {
        self.capture_only
    }

    pub fn variants(&self) -> &[ChartVariant] {
        &self.variants
    }

    /// Runs `item` to a final result. Never fails: every error becomes an
    /// [`ItemResult::Failure`].
    pub async fn run(&self, item: &Item, ctx: &ItemContext) -> ItemResult {
        ctx.publish(ItemState::Capturing {
            variants: self.variants.len(),
        });
        debug!("{}: capturing {} chart(s)", item.symbol, self.variants.len());

        let started = Instant::now();
        let artifacts = match self.capture(item, ctx).await {
            Ok(artifacts) => {
                record_stage(Stage::Capture, "success", started);
                artifacts
            }
            Err(record) => {
                record_stage(Stage::Capture, "failure", started);
                ctx.publish(ItemState::CaptureFailed { kind: record.kind });
                return ItemResult::Failure(record);
            }
        };

        if self.capture_only {
            ctx.publish(ItemState::Captured {
                artifacts: artifacts.len(),
            });
            return ItemResult::Captured(CaptureSummary {
                symbol: item.symbol.clone(),
                name: item.display_name().to_string(),
                artifacts,
            });
        }

        ctx.publish(ItemState::Analyzing {
            artifacts: artifacts.len(),
        });
        debug!("{}: analyzing {} chart(s)", item.symbol, artifacts.len());

        let started = Instant::now();
        match self.analyze(item, artifacts, ctx).await {
            Ok(outcome) => {
                record_stage(Stage::Analysis, "success", started);
                ctx.publish(ItemState::Completed);
                ItemResult::Success(outcome)
            }
            Err(record) => {
                record_stage(Stage::Analysis, "failure", started);
                ctx.publish(ItemState::AnalysisFailed { kind: record.kind });
                ItemResult::Failure(record)
            }
        }
    }

    /// Captures every variant. A required variant that still fails after
    /// its retries cancels the captures still running for this item.
    async fn capture(
        &self,
        item: &Item,
        ctx: &ItemContext,
    ) -> Result<Vec<CaptureArtifact>, FailureRecord> {
        let abort = ctx.cancel.child_token();
        let executor = BoundedExecutor::new("capture", self.capture_concurrency)
            .with_cancellation(abort.clone())
            .with_grace_period(self.grace_period);

        let tasks: Vec<_> = self
            .variants
            .iter()
            .map(|variant| {
                let capturer = Arc::clone(&self.capturer);
                let policy = self.capture_retry.clone();
                let item = item.clone();
                let variant = variant.clone();
                let abort = abort.clone();
                move |token: CancellationToken| async move {
                    let subject = format!("{} {}", item.symbol, variant.tag);
                    let result = tokio::select! {
                        biased;
                        _ = token.cancelled() => None,
                        result = policy.run(&subject, || {
                            let call = capturer.capture(&item, &variant);
                            metrics::observe_call("capturer", call)
                        }) => Some(result),
                    };
                    if variant.required && matches!(result, Some(Err(_))) {
                        abort.cancel();
                    }
                    result
                }
            })
            .collect();

        let outcomes = executor.run(tasks).await;

        let mut artifacts = Vec::with_capacity(outcomes.len());
        let mut failure: Option<FailureRecord> = None;
        let mut interrupted = false;
        for (variant, outcome) in self.variants.iter().zip(outcomes) {
            match outcome {
                TaskOutcome::Completed(Some(Ok(artifact))) => artifacts.push(artifact),
                TaskOutcome::Completed(Some(Err(retry))) if variant.required => {
                    if failure.is_none() {
                        failure = Some(
                            FailureRecord::new(
                                item,
                                Stage::Capture,
                                retry.error.kind(),
                                retry.error.to_string(),
                            )
                            .with_variant(&variant.tag)
                            .with_attempts(retry.attempts),
                        );
                    }
                }
                TaskOutcome::Completed(Some(Err(retry))) => {
                    warn!(
                        "{}: dropping optional {} chart: {}",
                        item.symbol, variant.tag, retry
                    );
                }
                TaskOutcome::Panicked(message) if variant.required => {
                    if failure.is_none() {
                        failure = Some(
                            FailureRecord::new(item, Stage::Capture, ErrorKind::Internal, message)
                                .with_variant(&variant.tag),
                        );
                    }
                }
                TaskOutcome::Panicked(message) => {
                    warn!(
                        "{}: dropping optional {} chart after panic: {}",
                        item.symbol, variant.tag, message
                    );
                }
                TaskOutcome::Completed(None) | TaskOutcome::Cancelled | TaskOutcome::NotStarted => {
                    interrupted = true;
                }
            }
        }

        if let Some(record) = failure {
            return Err(record);
        }
        if interrupted {
            return Err(ctx.interrupted(item, Stage::Capture));
        }
        if artifacts.is_empty() {
            return Err(FailureRecord::new(
                item,
                Stage::Capture,
                ErrorKind::NotFound,
                "no chart could be captured",
            ));
        }
        Ok(artifacts)
    }

    /// Submits all artifacts as one unit. Each attempt holds one analysis
    /// permit; backoff sleeps do not.
    async fn analyze(
        &self,
        item: &Item,
        artifacts: Vec<CaptureArtifact>,
        ctx: &ItemContext,
    ) -> Result<AnalysisOutcome, FailureRecord> {
        let analyzer = &*self.analyzer;
        let permits = &*self.analysis_permits;
        let charts = artifacts.as_slice();

        // A verdict that is ready when the halt lands is kept.
        let result = tokio::select! {
            biased;
            result = self.analysis_retry.run(&item.symbol, move || async move {
                let _permit = permits
                    .acquire()
                    .await
                    .map_err(|_| AnalysisError::unavailable("analysis permits closed"))?;
                metrics::observe_call("analyzer", analyzer.analyze(item, charts)).await
            }) => Some(result),
            _ = ctx.cancel.cancelled() => None,
        };

        match result {
            None => Err(ctx.interrupted(item, Stage::Analysis)),
            Some(Ok(mut outcome)) => {
                outcome.symbol = item.symbol.clone();
                Ok(outcome.with_artifacts(artifacts))
            }
            Some(Err(retry)) => Err(FailureRecord::new(
                item,
                Stage::Analysis,
                retry.error.kind(),
                retry.error.to_string(),
            )
            .with_attempts(retry.attempts)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureError;
    use crate::testing::{fixtures, MockAnalyzer, MockCapturer};

    fn pipeline(
        capturer: &MockCapturer,
        analyzer: &MockAnalyzer,
    ) -> ItemPipeline<MockCapturer, MockAnalyzer> {
        ItemPipeline::new(
            &fixtures::config(),
            Arc::new(capturer.clone()),
            Arc::new(analyzer.clone()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_publishes_states() {
        let capturer = MockCapturer::new();
        let analyzer = MockAnalyzer::new();
        let pipeline = pipeline(&capturer, &analyzer);
        let item = fixtures::item("AAPL");
        let (ctx, rx) = ItemContext::detached();

        let result = pipeline.run(&item, &ctx).await;

        let outcome = result.outcome().unwrap();
        assert_eq!(outcome.symbol, "AAPL");
        assert_eq!(outcome.artifacts.len(), 4);
        assert_eq!(*rx.borrow(), ItemState::Completed);
        assert_eq!(analyzer.call_count("AAPL").await, 1);
        assert_eq!(analyzer.artifact_counts("AAPL").await, vec![4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_required_capture_failure_skips_analysis() {
        let capturer = MockCapturer::new();
        capturer
            .fail_always("MSFT", "weekly", CaptureError::not_found("no such symbol"))
            .await;
        let analyzer = MockAnalyzer::new();
        let pipeline = pipeline(&capturer, &analyzer);
        let (ctx, rx) = ItemContext::detached();

        let result = pipeline.run(&fixtures::item("MSFT"), &ctx).await;

        let record = result.failure().unwrap();
        assert_eq!(record.stage, Stage::Capture);
        assert_eq!(record.kind, ErrorKind::NotFound);
        assert_eq!(record.variant.as_deref(), Some("weekly"));
        assert_eq!(record.attempts, 1);
        assert_eq!(analyzer.call_count("MSFT").await, 0);
        assert_eq!(
            *rx.borrow(),
            ItemState::CaptureFailed {
                kind: ErrorKind::NotFound
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_capture_failure_retried() {
        let capturer = MockCapturer::new();
        capturer
            .fail_times("SPY", "daily", CaptureError::transient("reset"), 2)
            .await;
        let analyzer = MockAnalyzer::new();
        let pipeline = pipeline(&capturer, &analyzer);
        let (ctx, _rx) = ItemContext::detached();

        let result = pipeline.run(&fixtures::item("SPY"), &ctx).await;

        assert!(result.is_success());
        assert_eq!(capturer.call_count("SPY", "daily").await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_optional_variant_dropped() {
        let mut config = fixtures::config();
        config
            .capture
            .variants
            .push(ChartVariant::new("intraday", "Intraday", "https://x/{symbol}").optional());
        let capturer = MockCapturer::new();
        capturer
            .fail_always("QQQ", "intraday", CaptureError::not_found("gone"))
            .await;
        let analyzer = MockAnalyzer::new();
        let pipeline = ItemPipeline::new(
            &config,
            Arc::new(capturer.clone()),
            Arc::new(analyzer.clone()),
        );
        let (ctx, _rx) = ItemContext::detached();

        let result = pipeline.run(&fixtures::item("QQQ"), &ctx).await;

        assert_eq!(result.outcome().unwrap().artifacts.len(), 4);
        assert_eq!(analyzer.artifact_counts("QQQ").await, vec![4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_analysis_failure_after_retries() {
        let capturer = MockCapturer::new();
        let analyzer = MockAnalyzer::new();
        analyzer
            .fail_times("TSLA", AnalysisError::rate_limited("slow down"), 5)
            .await;
        let pipeline = pipeline(&capturer, &analyzer);
        let (ctx, rx) = ItemContext::detached();

        let result = pipeline.run(&fixtures::item("TSLA"), &ctx).await;

        let record = result.failure().unwrap();
        assert_eq!(record.stage, Stage::Analysis);
        assert_eq!(record.kind, ErrorKind::RateLimited);
        assert_eq!(record.attempts, 3);
        assert_eq!(analyzer.call_count("TSLA").await, 3);
        assert_eq!(rx.borrow().name(), "analysis_failed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_only_skips_analysis() {
        let capturer = MockCapturer::new();
        let analyzer = MockAnalyzer::new();
        let pipeline = pipeline(&capturer, &analyzer).capture_only(true);
        let (ctx, rx) = ItemContext::detached();

        let result = pipeline.run(&fixtures::item("NVDA"), &ctx).await;

        match result {
            ItemResult::Captured(summary) => assert_eq!(summary.artifacts.len(), 4),
            other => panic!("expected captured, got {:?}", other),
        }
        assert_eq!(*rx.borrow(), ItemState::Captured { artifacts: 4 });
        assert_eq!(analyzer.call_count("NVDA").await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_halt_during_analysis() {
        let capturer = MockCapturer::new();
        let analyzer = MockAnalyzer::new().with_delay(Duration::from_secs(60));
        let pipeline = pipeline(&capturer, &analyzer);
        let (ctx, rx) = ItemContext::detached();
        let halt = ctx.halt.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            halt.halt(ErrorKind::Interrupted);
        });
        let result = pipeline.run(&fixtures::item("AMD"), &ctx).await;

        let record = result.failure().unwrap();
        assert_eq!(record.stage, Stage::Analysis);
        assert_eq!(record.kind, ErrorKind::Interrupted);
        assert_eq!(
            *rx.borrow(),
            ItemState::AnalysisFailed {
                kind: ErrorKind::Interrupted
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_verdict_ready_at_halt_is_kept() {
        let capturer = MockCapturer::new();
        let analyzer = MockAnalyzer::new().with_delay(Duration::from_secs(10));
        let pipeline = pipeline(&capturer, &analyzer);
        let (ctx, rx) = ItemContext::detached();
        let halt = ctx.halt.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            halt.halt(ErrorKind::DeadlineExceeded);
        });
        let result = pipeline.run(&fixtures::item("AVGO"), &ctx).await;

        assert!(result.is_success());
        assert_eq!(*rx.borrow(), ItemState::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_bound_per_item() {
        let capturer = MockCapturer::new().with_delay(Duration::from_millis(200));
        let analyzer = MockAnalyzer::new();
        let pipeline = pipeline(&capturer, &analyzer);
        let (ctx, _rx) = ItemContext::detached();

        pipeline.run(&fixtures::item("META"), &ctx).await;

        assert_eq!(capturer.peak_concurrency(), 2);
    }
}
