//! Mock chart capturer for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::ConcurrencyGauge;
use crate::capture::{CaptureArtifact, CaptureError, ChartCapturer, ChartVariant};
use crate::item::Item;

type Key = (String, String);

fn key(symbol: &str, variant: &str) -> Key {
    (symbol.to_string(), variant.to_string())
}

/// A recorded capture call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedCapture {
    pub symbol: String,
    pub variant: String,
    /// When the call started (tokio clock, so paused-time tests can use it).
    pub started_at: Instant,
}

/// Mock implementation of the ChartCapturer trait.
///
/// Provides controllable behavior for testing:
/// - Fail a (symbol, variant) pair a number of times, or always
/// - Delay captures globally or per symbol
/// - Track calls and peak concurrency
///
/// Clones share state, so a test can keep one handle while the pipeline owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct MockCapturer {
    calls: Arc<RwLock<Vec<RecordedCapture>>>,
    /// Errors returned, in order, before captures start succeeding.
    scripted: Arc<RwLock<HashMap<Key, VecDeque<CaptureError>>>>,
    always_fail: Arc<RwLock<HashMap<Key, CaptureError>>>,
    symbol_delays: Arc<RwLock<HashMap<String, Duration>>>,
    variant_delays: Arc<RwLock<HashMap<Key, Duration>>>,
    delay: Duration,
    gauge: ConcurrencyGauge,
}

impl MockCapturer {
    /// Create a new mock capturer. Every capture succeeds immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every capture by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Delay captures of `symbol`, overriding the global delay.
    pub async fn set_delay(&self, symbol: &str, delay: Duration) {
        self.symbol_delays
            .write()
            .await
            .insert(symbol.to_string(), delay);
    }

    /// Delay captures of one `symbol`/`variant` pair. Takes precedence over
    /// the symbol and global delays.
    pub async fn set_variant_delay(&self, symbol: &str, variant: &str, delay: Duration) {
        self.variant_delays
            .write()
            .await
            .insert(key(symbol, variant), delay);
    }

    /// Fail the next `times` captures of `symbol`/`variant` with `error`.
    pub async fn fail_times(&self, symbol: &str, variant: &str, error: CaptureError, times: usize) {
        self.scripted
            .write()
            .await
            .entry(key(symbol, variant))
            .or_default()
            .extend(std::iter::repeat(error).take(times));
    }

    /// Fail every capture of `symbol`/`variant` with `error`.
    pub async fn fail_always(&self, symbol: &str, variant: &str, error: CaptureError) {
        self.always_fail
            .write()
            .await
            .insert(key(symbol, variant), error);
    }

    /// Get all recorded calls.
    pub async fn recorded_calls(&self) -> Vec<RecordedCapture> {
        self.calls.read().await.clone()
    }

    /// Number of captures attempted for `symbol`/`variant`.
    pub async fn call_count(&self, symbol: &str, variant: &str) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.symbol == symbol && c.variant == variant)
            .count()
    }

    /// Number of captures attempted for `symbol`, all variants.
    pub async fn symbol_call_count(&self, symbol: &str) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.symbol == symbol)
            .count()
    }

    /// Captures currently in flight.
    pub fn active(&self) -> usize {
        self.gauge.active()
    }

    /// Highest number of captures ever in flight at once.
    pub fn peak_concurrency(&self) -> usize {
        self.gauge.peak()
    }

    async fn delay_for(&self, key: &Key) -> Duration {
        if let Some(delay) = self.variant_delays.read().await.get(key) {
            return *delay;
        }
        self.symbol_delays
            .read()
            .await
            .get(&key.0)
            .copied()
            .unwrap_or(self.delay)
    }

    async fn scripted_error(&self, key: &Key) -> Option<CaptureError> {
        if let Some(error) = self.always_fail.read().await.get(key) {
            return Some(error.clone());
        }
        self.scripted
            .write()
            .await
            .get_mut(key)
            .and_then(VecDeque::pop_front)
    }
}

#[async_trait]
impl ChartCapturer for MockCapturer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn capture(
        &self,
        item: &Item,
        variant: &ChartVariant,
    ) -> Result<CaptureArtifact, CaptureError> {
        let _guard = self.gauge.enter();
        self.calls.write().await.push(RecordedCapture {
            symbol: item.symbol.clone(),
            variant: variant.tag.clone(),
            started_at: Instant::now(),
        });

        let key = key(&item.symbol, &variant.tag);
        let delay = self.delay_for(&key).await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.scripted_error(&key).await {
            return Err(error);
        }

        let bytes = format!("{}:{}", item.symbol, variant.tag).into_bytes();
        Ok(CaptureArtifact::new(variant, "image/png", bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_scripted_failures_then_success() {
        let capturer = MockCapturer::new();
        let item = fixtures::item("AAPL");
        let variant = &fixtures::variants()[0];
        capturer
            .fail_times("AAPL", "daily", CaptureError::transient("reset"), 2)
            .await;

        assert!(capturer.capture(&item, variant).await.is_err());
        assert!(capturer.capture(&item, variant).await.is_err());
        let artifact = capturer.capture(&item, variant).await.unwrap();

        assert_eq!(artifact.variant, "daily");
        assert_eq!(capturer.call_count("AAPL", "daily").await, 3);
        assert_eq!(capturer.active(), 0);
    }

    #[tokio::test]
    async fn test_always_fail() {
        let capturer = MockCapturer::new();
        let item = fixtures::item("MSFT");
        let variant = &fixtures::variants()[1];
        capturer
            .fail_always("MSFT", "weekly", CaptureError::not_found("gone"))
            .await;

        for _ in 0..3 {
            assert!(capturer.capture(&item, variant).await.is_err());
        }
        assert_eq!(capturer.symbol_call_count("MSFT").await, 3);
    }
}
