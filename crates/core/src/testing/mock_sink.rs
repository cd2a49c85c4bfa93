//! Mock report sink for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::report::{DeliveryError, ReportSink, RunReport};

/// Mock implementation of the ReportSink trait.
///
/// Records every delivered report; can be switched to fail deliveries.
#[derive(Debug, Clone, Default)]
pub struct MockReportSink {
    reports: Arc<RwLock<Vec<RunReport>>>,
    fail: Arc<AtomicBool>,
}

impl MockReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose deliveries always fail.
    pub fn failing() -> Self {
        let sink = Self::new();
        sink.set_fail(true);
        sink
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Reports delivered so far, failed attempts included.
    pub async fn reports(&self) -> Vec<RunReport> {
        self.reports.read().await.clone()
    }

    pub async fn delivery_count(&self) -> usize {
        self.reports.read().await.len()
    }
}

#[async_trait]
impl ReportSink for MockReportSink {
    fn name(&self) -> &str {
        "mock"
    }

    async fn deliver(&self, report: &RunReport) -> Result<(), DeliveryError> {
        self.reports.write().await.push(report.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(DeliveryError::new("mock", "sink unavailable"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn empty_report() -> RunReport {
        RunReport {
            run_id: Uuid::new_v4(),
            run_at: Utc::now(),
            finished_at: Utc::now(),
            results: Vec::new(),
        }
    }

    #[test]
    fn test_records_and_fails_on_demand() {
        let sink = MockReportSink::new();
        tokio_test::assert_ok!(tokio_test::block_on(sink.deliver(&empty_report())));

        sink.set_fail(true);
        let err = tokio_test::assert_err!(tokio_test::block_on(sink.deliver(&empty_report())));
        assert_eq!(err.sink, "mock");

        assert_eq!(tokio_test::block_on(sink.delivery_count()), 2);
    }
}
