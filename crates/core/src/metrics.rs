//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Runs and items (results, per-stage durations)
//! - Retries per stage and error kind
//! - Collaborator calls (capture, analysis, delivery)
//! - Worker pools (tasks in flight)

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::future::Future;
use tokio::time::Instant;

use crate::failure::Classified;

/// Registry holding every metric below.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for metric in all_metrics() {
        // Only fails on duplicate registration, which cannot happen here.
        let _ = registry.register(metric);
    }
    registry
});

// =============================================================================
// Runs and items
// =============================================================================

/// Items finished, by result.
pub static ITEMS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("chartwatch_items_total", "Total items processed"),
        &["result"], // "success", "captured", "capture_failed", "analysis_failed", "timeout"
    )
    .unwrap()
});

/// Stage duration in seconds.
pub static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "chartwatch_stage_duration_seconds",
            "Duration of a pipeline stage for one item",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        &["stage", "result"],
    )
    .unwrap()
});

/// Run duration in seconds.
pub static RUN_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("chartwatch_run_duration_seconds", "Duration of a whole run")
            .buckets(vec![10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1200.0, 1800.0]),
        &["halted"],
    )
    .unwrap()
});

// =============================================================================
// Retries
// =============================================================================

/// Retries scheduled, by stage and the error kind that triggered them.
pub static RETRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("chartwatch_retries_total", "Total retries scheduled"),
        &["stage", "kind"],
    )
    .unwrap()
});

// =============================================================================
// Collaborators
// =============================================================================

/// Collaborator calls, by collaborator and status.
pub static COLLABORATOR_CALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "chartwatch_collaborator_calls_total",
            "Total calls to capture, analysis and delivery collaborators",
        ),
        &["collaborator", "status"], // status: "ok" or an error kind
    )
    .unwrap()
});

/// Collaborator call latency in seconds.
pub static COLLABORATOR_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "chartwatch_collaborator_duration_seconds",
            "Latency of collaborator calls",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["collaborator"],
    )
    .unwrap()
});

// =============================================================================
// Pools
// =============================================================================

/// Tasks currently running, by pool.
pub static POOL_ACTIVE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("chartwatch_pool_active", "Tasks currently running in a pool"),
        &["pool"],
    )
    .unwrap()
});

/// Returns all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(ITEMS_TOTAL.clone()),
        Box::new(STAGE_DURATION.clone()),
        Box::new(RUN_DURATION.clone()),
        Box::new(RETRIES.clone()),
        Box::new(COLLABORATOR_CALLS.clone()),
        Box::new(COLLABORATOR_DURATION.clone()),
        Box::new(POOL_ACTIVE.clone()),
    ]
}

/// Times a collaborator call and counts it by status.
pub(crate) async fn observe_call<T, E, Fut>(collaborator: &str, call: Fut) -> Result<T, E>
where
    E: Classified,
    Fut: Future<Output = Result<T, E>>,
{
    let start = Instant::now();
    let result = call.await;
    let status = match &result {
        Ok(_) => "ok",
        Err(e) => e.kind().as_str(),
    };
    COLLABORATOR_CALLS
        .with_label_values(&[collaborator, status])
        .inc();
    COLLABORATOR_DURATION
        .with_label_values(&[collaborator])
        .observe(start.elapsed().as_secs_f64());
    result
}

/// Renders [`REGISTRY`] in the Prometheus text exposition format.
pub fn render_text() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
