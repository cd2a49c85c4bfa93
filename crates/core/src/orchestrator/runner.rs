//! Batch orchestrator implementation.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{RunConfig, RunOutput};
use crate::analysis::ChartAnalyzer;
use crate::capture::ChartCapturer;
use crate::config::Config;
use crate::executor::{BoundedExecutor, RunHalt, TaskOutcome};
use crate::failure::{ErrorKind, FailureRecord};
use crate::item::Item;
use crate::metrics;
use crate::pipeline::{ItemContext, ItemPipeline, ItemState};
use crate::report::{DeliveryStatus, ItemResult, ReportSink, RunReport};

/// Drives a batch of items through the pipeline and reports once.
pub struct BatchOrchestrator<C, A> {
    pipeline: ItemPipeline<C, A>,
    run: RunConfig,
    sink: Option<Arc<dyn ReportSink>>,
}

impl<C, A> BatchOrchestrator<C, A>
where
    C: ChartCapturer + 'static,
    A: ChartAnalyzer + 'static,
{
    /// Create a new orchestrator from a configuration snapshot.
    pub fn new(config: &Config, capturer: C, analyzer: A) -> Self {
        Self {
            pipeline: ItemPipeline::new(config, Arc::new(capturer), Arc::new(analyzer)),
            run: config.run.clone(),
            sink: None,
        }
    }

    /// Deliver the report to `sink` at the end of every run.
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Stop every item after capture.
    pub fn capture_only(mut self, capture_only: bool) -> Self {
        self.pipeline = self.pipeline.capture_only(capture_only);
        self
    }

    /// Override the number of items processed at once.
    pub fn with_item_concurrency(mut self, max: usize) -> Self {
        self.run.max_concurrent_items = max.max(1);
        self
    }

    pub fn run_config(&self) -> &RunConfig {
        &self.run
    }

    /// Runs `items` to completion or until the run deadline.
    pub async fn run(&self, items: Vec<Item>) -> RunOutput {
        self.run_until(items, RunHalt::new()).await
    }

    /// Runs `items` until they finish, the deadline passes or `halt` is
    /// triggered from outside.
    ///
    /// Always returns one result per item, in input order.
    pub async fn run_until(&self, items: Vec<Item>, halt: RunHalt) -> RunOutput {
        let run_id = Uuid::new_v4();
        let run_at = Utc::now();
        let started = Instant::now();
        info!(
            "Run {} starting: {} item(s), {} at a time{}",
            run_id,
            items.len(),
            self.run.max_concurrent_items,
            if self.pipeline.is_capture_only() {
                " (capture only)"
            } else {
                ""
            }
        );

        let deadline = self.run.deadline().map(|limit| {
            let halt = halt.clone();
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                if !halt.is_halted() {
                    warn!("Run deadline of {:?} reached, halting", limit);
                }
                halt.halt(ErrorKind::DeadlineExceeded);
            })
        });

        let executor = BoundedExecutor::new("items", self.run.max_concurrent_items)
            .with_cancellation(halt.token().clone())
            .with_grace_period(self.run.grace_period());

        let mut watchers = Vec::with_capacity(items.len());
        let tasks: Vec<_> = items
            .iter()
            .map(|item| {
                let (state_tx, state_rx) = watch::channel(ItemState::Pending);
                watchers.push(state_rx);
                let pipeline = self.pipeline.clone();
                let item = item.clone();
                let halt = halt.clone();
                move |token: CancellationToken| async move {
                    let ctx = ItemContext::new(token, halt, state_tx);
                    pipeline.run(&item, &ctx).await
                }
            })
            .collect();

        let outcomes = executor.run(tasks).await;
        if let Some(timer) = deadline {
            timer.abort();
        }

        let halted = halt.is_halted().then(|| halt.reason());
        let results: Vec<ItemResult> = items
            .iter()
            .zip(outcomes)
            .zip(&watchers)
            .map(|((item, outcome), state)| {
                let stage = state.borrow().stage();
                match outcome {
                    TaskOutcome::Completed(result) => result,
                    TaskOutcome::Panicked(message) => ItemResult::Failure(FailureRecord::new(
                        item,
                        stage,
                        ErrorKind::Internal,
                        format!("pipeline panicked: {}", message),
                    )),
                    TaskOutcome::Cancelled | TaskOutcome::NotStarted => {
                        let kind = halt.reason();
                        ItemResult::Failure(FailureRecord::new(
                            item,
                            stage,
                            kind,
                            format!("run stopped ({}) before the item finished", kind),
                        ))
                    }
                }
            })
            .collect();

        let report = RunReport {
            run_id,
            run_at,
            finished_at: Utc::now(),
            results,
        };

        for result in &report.results {
            metrics::ITEMS_TOTAL
                .with_label_values(&[result.label()])
                .inc();
        }
        metrics::RUN_DURATION
            .with_label_values(&[if halted.is_some() { "true" } else { "false" }])
            .observe(started.elapsed().as_secs_f64());
        log_summary(&report, started);

        let delivery = self.deliver(&report).await;

        RunOutput {
            report,
            delivery,
            item_pool: executor.status(),
            halted,
        }
    }

    async fn deliver(&self, report: &RunReport) -> DeliveryStatus {
        let Some(sink) = &self.sink else {
            return DeliveryStatus::Skipped;
        };

        match metrics::observe_call("sink", sink.deliver(report)).await {
            Ok(()) => {
                info!("Report {} delivered via {}", report.run_id, sink.name());
                DeliveryStatus::Delivered {
                    sink: sink.name().to_string(),
                }
            }
            Err(e) => {
                error!("{}", e);
                DeliveryStatus::Failed(e)
            }
        }
    }
}

fn log_summary(report: &RunReport, started: Instant) {
    let summary = report.summary();
    info!(
        "Run {} finished in {:.1}s: {} analyzed, {} captured, {} failed ({} BUY, {} SELL, {} HOLD)",
        report.run_id,
        started.elapsed().as_secs_f64(),
        summary.succeeded,
        summary.captured,
        summary.failed,
        summary.buy,
        summary.sell,
        summary.hold
    );
    for failure in report.failures() {
        warn!("  {}", failure);
    }
}
