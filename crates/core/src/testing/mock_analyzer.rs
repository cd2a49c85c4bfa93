//! Mock chart analyzer for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::{fixtures, ConcurrencyGauge};
use crate::analysis::{AnalysisError, AnalysisOutcome, ChartAnalyzer, Signal};
use crate::capture::CaptureArtifact;
use crate::item::Item;

/// Mock implementation of the ChartAnalyzer trait.
///
/// Provides controllable behavior for testing:
/// - Fail a symbol a number of times before succeeding
/// - Choose the signal returned per symbol (HOLD otherwise)
/// - Delay analyses, or panic for a symbol
/// - Track calls, artifacts received and peak concurrency
#[derive(Debug, Clone, Default)]
pub struct MockAnalyzer {
    /// Artifact count of every call, by symbol.
    calls: Arc<RwLock<HashMap<String, Vec<usize>>>>,
    scripted: Arc<RwLock<HashMap<String, VecDeque<AnalysisError>>>>,
    signals: Arc<RwLock<HashMap<String, Signal>>>,
    panics: Arc<RwLock<HashSet<String>>>,
    delay: Duration,
    gauge: ConcurrencyGauge,
}

impl MockAnalyzer {
    /// Create a new mock analyzer. Every analysis succeeds immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every analysis by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail the next `times` analyses of `symbol` with `error`.
    pub async fn fail_times(&self, symbol: &str, error: AnalysisError, times: usize) {
        self.scripted
            .write()
            .await
            .entry(symbol.to_string())
            .or_default()
            .extend(std::iter::repeat(error).take(times));
    }

    /// Return `signal` for `symbol`.
    pub async fn set_signal(&self, symbol: &str, signal: Signal) {
        self.signals.write().await.insert(symbol.to_string(), signal);
    }

    /// Panic when asked to analyze `symbol`.
    pub async fn panic_on(&self, symbol: &str) {
        self.panics.write().await.insert(symbol.to_string());
    }

    /// Number of analyses attempted for `symbol`.
    pub async fn call_count(&self, symbol: &str) -> usize {
        self.calls
            .read()
            .await
            .get(symbol)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Number of artifacts received by each analysis of `symbol`.
    pub async fn artifact_counts(&self, symbol: &str) -> Vec<usize> {
        self.calls
            .read()
            .await
            .get(symbol)
            .cloned()
            .unwrap_or_default()
    }

    /// Total analyses attempted.
    pub async fn total_calls(&self) -> usize {
        self.calls.read().await.values().map(Vec::len).sum()
    }

    /// Highest number of analyses ever in flight at once.
    pub fn peak_concurrency(&self) -> usize {
        self.gauge.peak()
    }
}

#[async_trait]
impl ChartAnalyzer for MockAnalyzer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn analyze(
        &self,
        item: &Item,
        artifacts: &[CaptureArtifact],
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let _guard = self.gauge.enter();
        self.calls
            .write()
            .await
            .entry(item.symbol.clone())
            .or_default()
            .push(artifacts.len());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.panics.read().await.contains(&item.symbol) {
            panic!("mock analyzer panic for {}", item.symbol);
        }

        let scripted = self
            .scripted
            .write()
            .await
            .get_mut(&item.symbol)
            .and_then(VecDeque::pop_front);
        if let Some(error) = scripted {
            return Err(error);
        }

        let signal = self
            .signals
            .read()
            .await
            .get(&item.symbol)
            .copied()
            .unwrap_or(Signal::Hold);
        Ok(fixtures::outcome(&item.symbol, signal))
    }
}
