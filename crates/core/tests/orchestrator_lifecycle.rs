//! Batch orchestrator integration tests.
//!
//! These tests run whole batches with mock collaborators:
//! - One result per item, in input order
//! - Failure isolation between items
//! - Concurrency bounds at every level
//! - Run deadline, interruption and delivery failure

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use chartwatch_core::{
    analysis::{AnalysisError, Signal},
    capture::CaptureError,
    testing::{fixtures, MockAnalyzer, MockCapturer, MockReportSink},
    BatchOrchestrator, Config, DeliveryStatus, ErrorKind, ItemResult, JsonFileSink, RunHalt,
    Stage,
};

fn orchestrator(
    config: &Config,
    capturer: &MockCapturer,
    analyzer: &MockAnalyzer,
) -> BatchOrchestrator<MockCapturer, MockAnalyzer> {
    BatchOrchestrator::new(config, capturer.clone(), analyzer.clone())
}

fn symbols(results: &[ItemResult]) -> Vec<&str> {
    results.iter().map(ItemResult::symbol).collect()
}

#[tokio::test(start_paused = true)]
async fn test_results_in_input_order() {
    let capturer = MockCapturer::new();
    // earlier items finish last
    for (i, symbol) in ["AAPL", "MSFT", "GOOG", "AMZN", "NVDA"].iter().enumerate() {
        capturer
            .set_delay(symbol, Duration::from_millis(500 - i as u64 * 100))
            .await;
    }
    let analyzer = MockAnalyzer::new();
    let input = fixtures::items(&["AAPL", "MSFT", "GOOG", "AMZN", "NVDA"]);

    let output = orchestrator(&fixtures::config(), &capturer, &analyzer)
        .run(input)
        .await;

    assert_eq!(
        symbols(&output.report.results),
        vec!["AAPL", "MSFT", "GOOG", "AMZN", "NVDA"]
    );
    assert!(output.report.results.iter().all(ItemResult::is_success));
    assert!(output.halted.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_mixed_failures_are_isolated() {
    let capturer = MockCapturer::new();
    capturer
        .fail_always("AAA", "weekly", CaptureError::not_found("no chart"))
        .await;
    let analyzer = MockAnalyzer::new();
    analyzer
        .fail_times("CCC", AnalysisError::rate_limited("slow down"), 2)
        .await;
    analyzer.set_signal("BBB", Signal::Buy).await;
    let sink = MockReportSink::new();

    let output = orchestrator(&fixtures::config(), &capturer, &analyzer)
        .with_sink(Arc::new(sink.clone()))
        .run(fixtures::items(&["AAA", "BBB", "CCC"]))
        .await;

    let results = &output.report.results;
    assert_eq!(results.len(), 3);

    let a = results[0].failure().unwrap();
    assert_eq!(a.symbol, "AAA");
    assert_eq!(a.stage, Stage::Capture);
    assert_eq!(a.kind, ErrorKind::NotFound);

    assert_eq!(results[1].outcome().unwrap().signal(), Signal::Buy);
    assert_eq!(results[2].outcome().unwrap().symbol, "CCC");

    assert_eq!(analyzer.call_count("AAA").await, 0);
    assert_eq!(analyzer.call_count("BBB").await, 1);
    assert_eq!(analyzer.call_count("CCC").await, 3);

    let summary = output.report.summary();
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.capture_failures, 1);
    assert_eq!(summary.buy, 1);

    assert_eq!(
        output.delivery,
        DeliveryStatus::Delivered {
            sink: "mock".to_string()
        }
    );
    let delivered = sink.reports().await;
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0], output.report);
}

#[tokio::test(start_paused = true)]
async fn test_bounds_respected() {
    let mut config = fixtures::config();
    config.run.max_concurrent_items = 2;
    config.run.max_concurrent_captures = 3;
    config.run.max_concurrent_analyses = 1;
    let capturer = MockCapturer::new().with_delay(Duration::from_millis(200));
    let analyzer = MockAnalyzer::new().with_delay(Duration::from_millis(300));

    let output = orchestrator(&config, &capturer, &analyzer)
        .run(fixtures::items(&["A", "B", "C", "D", "E", "F"]))
        .await;

    assert_eq!(output.report.results.len(), 6);
    assert_eq!(output.item_pool.peak_active_jobs, 2);
    assert_eq!(output.item_pool.total_processed, 6);
    assert!(capturer.peak_concurrency() <= 6);
    assert_eq!(analyzer.peak_concurrency(), 1);
    assert_eq!(capturer.active(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_fails_unfinished_items() {
    let mut config = fixtures::config();
    config.run.max_concurrent_items = 1;
    config.run.deadline_secs = 10;
    let capturer = MockCapturer::new();
    capturer.set_delay("SLOW", Duration::from_secs(60)).await;
    let analyzer = MockAnalyzer::new();
    let sink = MockReportSink::new();

    let output = orchestrator(&config, &capturer, &analyzer)
        .with_sink(Arc::new(sink.clone()))
        .run(fixtures::items(&["FAST", "SLOW", "NEXT"]))
        .await;

    let results = &output.report.results;
    assert_eq!(symbols(results), vec!["FAST", "SLOW", "NEXT"]);
    assert!(results[0].is_success());

    let slow = results[1].failure().unwrap();
    assert_eq!(slow.kind, ErrorKind::DeadlineExceeded);
    assert_eq!(slow.stage, Stage::Capture);

    let next = results[2].failure().unwrap();
    assert_eq!(next.kind, ErrorKind::DeadlineExceeded);
    assert_eq!(next.attempts, 0);
    assert_eq!(capturer.symbol_call_count("NEXT").await, 0);

    assert_eq!(output.halted, Some(ErrorKind::DeadlineExceeded));
    assert_eq!(results[1].label(), "timeout");
    assert_eq!(sink.delivery_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_during_analysis() {
    let mut config = fixtures::config();
    config.run.deadline_secs = 5;
    let capturer = MockCapturer::new();
    let analyzer = MockAnalyzer::new().with_delay(Duration::from_secs(120));

    let output = orchestrator(&config, &capturer, &analyzer)
        .run(fixtures::items(&["TSLA"]))
        .await;

    let record = output.report.results[0].failure().unwrap();
    assert_eq!(record.stage, Stage::Analysis);
    assert_eq!(record.kind, ErrorKind::DeadlineExceeded);
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_halts_run() {
    let mut config = fixtures::config();
    config.run.max_concurrent_items = 1;
    let capturer = MockCapturer::new().with_delay(Duration::from_secs(5));
    let analyzer = MockAnalyzer::new();
    let halt = RunHalt::new();
    {
        let halt = halt.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            halt.halt(ErrorKind::Interrupted);
        });
    }

    let output = orchestrator(&config, &capturer, &analyzer)
        .run_until(fixtures::items(&["AAPL", "MSFT"]), halt)
        .await;

    assert!(output.was_interrupted());
    assert!(output
        .report
        .failures()
        .all(|f| f.kind == ErrorKind::Interrupted));
    assert_eq!(output.report.failures().count(), 2);
    assert_eq!(analyzer.total_calls().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_delivery_failure_keeps_results() {
    let capturer = MockCapturer::new();
    let analyzer = MockAnalyzer::new();
    let sink = MockReportSink::failing();

    let output = orchestrator(&fixtures::config(), &capturer, &analyzer)
        .with_sink(Arc::new(sink.clone()))
        .run(fixtures::items(&["AAPL", "MSFT"]))
        .await;

    assert!(output.delivery.is_failed());
    match &output.delivery {
        DeliveryStatus::Failed(e) => assert_eq!(e.sink, "mock"),
        other => panic!("expected failed delivery, got {:?}", other),
    }
    assert!(output.report.results.iter().all(ItemResult::is_success));
    assert_eq!(sink.delivery_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_capture_only_run() {
    let capturer = MockCapturer::new();
    let analyzer = MockAnalyzer::new();

    let output = orchestrator(&fixtures::config(), &capturer, &analyzer)
        .capture_only(true)
        .run(fixtures::items(&["AAPL", "MSFT"]))
        .await;

    assert!(output
        .report
        .results
        .iter()
        .all(|r| matches!(r, ItemResult::Captured(s) if s.artifacts.len() == 4)));
    assert_eq!(output.report.summary().captured, 2);
    assert_eq!(analyzer.total_calls().await, 0);
}

#[tokio::test]
async fn test_json_report_written() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reports").join("results.json");
    let capturer = MockCapturer::new();
    capturer
        .fail_always("BAD", "daily", CaptureError::not_found("no chart"))
        .await;
    let analyzer = MockAnalyzer::new();

    let output = orchestrator(&fixtures::config(), &capturer, &analyzer)
        .with_sink(Arc::new(JsonFileSink::new(&path)))
        .run(fixtures::items(&["GOOD", "BAD"]))
        .await;

    assert!(!output.delivery.is_failed());
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["run_id"], output.report.run_id.to_string());
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["status"], "success");
    assert_eq!(results[0]["symbol"], "GOOD");
    assert_eq!(results[1]["status"], "failure");
    assert_eq!(results[1]["stage"], "capture");
    assert_eq!(results[1]["variant"], "daily");
}
