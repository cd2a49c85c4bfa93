//! Item pipeline integration tests.
//!
//! These tests run single items through the pipeline with mock collaborators:
//! - State transitions published on the watch channel
//! - All-or-nothing capture and cancellation of sibling captures
//! - Retry backoff timing
//! - The shared analysis bound

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use chartwatch_core::{
    analysis::AnalysisError,
    capture::CaptureError,
    testing::{fixtures, MockAnalyzer, MockCapturer},
    Config, ErrorKind, ItemContext, ItemPipeline, ItemResult, ItemState, Stage,
};

/// Test helper holding a pipeline and handles to its mocks.
struct TestHarness {
    pipeline: ItemPipeline<MockCapturer, MockAnalyzer>,
    capturer: MockCapturer,
    analyzer: MockAnalyzer,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_config(fixtures::config(), MockCapturer::new(), MockAnalyzer::new())
    }

    fn with_config(config: Config, capturer: MockCapturer, analyzer: MockAnalyzer) -> Self {
        let pipeline = ItemPipeline::new(
            &config,
            Arc::new(capturer.clone()),
            Arc::new(analyzer.clone()),
        );
        Self {
            pipeline,
            capturer,
            analyzer,
        }
    }

    async fn run(&self, symbol: &str) -> ItemResult {
        let (ctx, _rx) = ItemContext::detached();
        self.pipeline.run(&fixtures::item(symbol), &ctx).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_states_published_in_order() {
    let harness = TestHarness::with_config(
        fixtures::config(),
        MockCapturer::new().with_delay(Duration::from_millis(100)),
        MockAnalyzer::new().with_delay(Duration::from_millis(100)),
    );
    let (ctx, mut rx) = ItemContext::detached();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let observer = {
        let seen = Arc::clone(&seen);
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let state = rx.borrow_and_update().clone();
                let terminal = state.is_terminal();
                seen.lock().await.push(state.name());
                if terminal {
                    break;
                }
            }
        })
    };

    let result = harness.pipeline.run(&fixtures::item("AAPL"), &ctx).await;
    observer.await.unwrap();

    assert!(result.is_success());
    assert_eq!(
        *seen.lock().await,
        vec!["capturing", "analyzing", "completed"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_required_failure_cancels_sibling_captures() {
    let capturer = MockCapturer::new();
    capturer
        .fail_always("MSFT", "daily", CaptureError::not_found("unknown symbol"))
        .await;
    capturer
        .set_variant_delay("MSFT", "daily", Duration::from_millis(10))
        .await;
    capturer
        .set_variant_delay("MSFT", "weekly", Duration::from_secs(60))
        .await;
    let harness = TestHarness::with_config(fixtures::config(), capturer, MockAnalyzer::new());
    let start = Instant::now();

    let result = harness.run("MSFT").await;

    let record = result.failure().unwrap();
    assert_eq!(record.stage, Stage::Capture);
    assert_eq!(record.kind, ErrorKind::NotFound);
    assert_eq!(record.variant.as_deref(), Some("daily"));
    // the slow weekly capture was cancelled, not waited for
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(harness.capturer.call_count("MSFT", "weekly").await, 1);
    assert_eq!(harness.capturer.call_count("MSFT", "pnf_daily").await, 0);
    assert_eq!(harness.capturer.call_count("MSFT", "pnf_weekly").await, 0);
    assert_eq!(harness.capturer.active(), 0);
    assert_eq!(harness.analyzer.total_calls().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_capture_backoff_sequence() {
    let harness = TestHarness::new();
    harness
        .capturer
        .fail_times("SPY", "pnf_weekly", CaptureError::transient("reset"), 2)
        .await;

    let result = harness.run("SPY").await;

    assert!(result.is_success());
    let starts: Vec<Instant> = harness
        .capturer
        .recorded_calls()
        .await
        .into_iter()
        .filter(|c| c.variant == "pnf_weekly")
        .map(|c| c.started_at)
        .collect();
    assert_eq!(starts.len(), 3);
    let first_gap = starts[1] - starts[0];
    let second_gap = starts[2] - starts[1];
    assert!(first_gap >= Duration::from_millis(100) && first_gap < Duration::from_millis(105));
    assert!(second_gap >= Duration::from_millis(200) && second_gap < Duration::from_millis(205));
}

#[tokio::test(start_paused = true)]
async fn test_capture_timeout_is_retried_then_reported() {
    let harness = TestHarness::new();
    harness
        .capturer
        .fail_always("QQQ", "weekly", CaptureError::Timeout { timeout_secs: 30 })
        .await;

    let result = harness.run("QQQ").await;

    let record = result.failure().unwrap();
    assert_eq!(record.kind, ErrorKind::Timeout);
    assert_eq!(record.attempts, 3);
    assert_eq!(harness.capturer.call_count("QQQ", "weekly").await, 3);
}

#[tokio::test(start_paused = true)]
async fn test_permanent_analysis_error_not_retried() {
    let harness = TestHarness::new();
    harness
        .analyzer
        .fail_times("IWM", AnalysisError::invalid_input("image too large"), 1)
        .await;

    let result = harness.run("IWM").await;

    let record = result.failure().unwrap();
    assert_eq!(record.stage, Stage::Analysis);
    assert_eq!(record.kind, ErrorKind::InvalidInput);
    assert_eq!(record.attempts, 1);
    assert_eq!(harness.analyzer.call_count("IWM").await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_analysis_bound_shared_by_clones() {
    let mut config = fixtures::config();
    config.run.max_concurrent_analyses = 2;
    let harness = TestHarness::with_config(
        config,
        MockCapturer::new(),
        MockAnalyzer::new().with_delay(Duration::from_millis(500)),
    );

    let runs: Vec<_> = ["A", "B", "C", "D", "E"]
        .into_iter()
        .map(|symbol| {
            let pipeline = harness.pipeline.clone();
            tokio::spawn(async move {
                let (ctx, _rx) = ItemContext::detached();
                pipeline.run(&fixtures::item(symbol), &ctx).await
            })
        })
        .collect();
    for run in runs {
        assert!(run.await.unwrap().is_success());
    }

    assert_eq!(harness.analyzer.peak_concurrency(), 2);
    assert_eq!(harness.analyzer.total_calls().await, 5);
}

#[tokio::test(start_paused = true)]
async fn test_halt_during_capture_reports_capture_stage() {
    let harness = TestHarness::with_config(
        fixtures::config(),
        MockCapturer::new().with_delay(Duration::from_secs(30)),
        MockAnalyzer::new(),
    );
    let (ctx, rx) = ItemContext::detached();
    let halt = ctx.halt.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        halt.halt(ErrorKind::DeadlineExceeded);
    });

    let result = harness.pipeline.run(&fixtures::item("DIA"), &ctx).await;

    let record = result.failure().unwrap();
    assert_eq!(record.stage, Stage::Capture);
    assert_eq!(record.kind, ErrorKind::DeadlineExceeded);
    assert_eq!(
        *rx.borrow(),
        ItemState::CaptureFailed {
            kind: ErrorKind::DeadlineExceeded
        }
    );
    assert_eq!(harness.analyzer.total_calls().await, 0);
}
