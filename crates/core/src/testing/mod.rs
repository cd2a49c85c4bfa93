//! Testing utilities and mock implementations.
//!
//! The mocks implement the collaborator traits with scripted failures,
//! delays, call recording and live concurrency gauges, so runs can be
//! exercised end to end without a chart provider or a model API.
//!
//! # Example
//!
//! ```rust,ignore
//! use chartwatch_core::testing::{MockAnalyzer, MockCapturer};
//!
//! let capturer = MockCapturer::new();
//! capturer.fail_always("AAPL", "weekly", CaptureError::not_found("gone")).await;
//!
//! let analyzer = MockAnalyzer::new();
//! analyzer.fail_times("MSFT", AnalysisError::rate_limited("slow down"), 2).await;
//! ```

mod mock_analyzer;
mod mock_capturer;
mod mock_sink;

pub use mock_analyzer::MockAnalyzer;
pub use mock_capturer::{MockCapturer, RecordedCapture};
pub use mock_sink::MockReportSink;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts calls in flight and remembers the highest count seen.
#[derive(Debug, Clone, Default)]
struct ConcurrencyGauge {
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ConcurrencyGauge {
    fn enter(&self) -> GaugeGuard {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        GaugeGuard {
            active: Arc::clone(&self.active),
        }
    }

    fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Decrements on drop, so aborted calls are counted out too.
struct GaugeGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::analysis::{AnalysisOutcome, Confidence, Recommendation, Signal};
    use crate::capture::{CaptureArtifact, ChartVariant};
    use crate::config::Config;
    use crate::item::Item;

    /// An item whose name is derived from the symbol.
    pub fn item(symbol: &str) -> Item {
        Item::new(symbol, format!("{} Corp", symbol))
    }

    /// Items for each symbol, in order.
    pub fn items(symbols: &[&str]) -> Vec<Item> {
        symbols.iter().map(|s| item(s)).collect()
    }

    /// The four standard chart variants, pointed at a test host.
    pub fn variants() -> Vec<ChartVariant> {
        [
            ("daily", "Daily"),
            ("weekly", "Weekly"),
            ("pnf_daily", "P&F Daily"),
            ("pnf_weekly", "P&F Weekly"),
        ]
        .into_iter()
        .map(|(tag, label)| {
            ChartVariant::new(tag, label, format!("https://charts.test/{{symbol}}/{}", tag))
        })
        .collect()
    }

    /// A small PNG-typed artifact for `tag`.
    pub fn artifact(tag: &str) -> CaptureArtifact {
        let variant = ChartVariant::new(tag, tag, "https://charts.test/{symbol}");
        CaptureArtifact::new(&variant, "image/png", vec![0x89, b'P', b'N', b'G'])
    }

    /// An outcome with the given signal and medium confidence.
    pub fn outcome(symbol: &str, signal: Signal) -> AnalysisOutcome {
        let mut outcome = AnalysisOutcome::new(
            symbol,
            Recommendation {
                signal,
                confidence: Confidence::Medium,
                reasoning: format!("{} looks {}", symbol, signal),
            },
        );
        outcome.summary = format!("Mock analysis of {}", symbol);
        outcome
    }

    /// A configuration with test variants, short backoff and no deadline.
    pub fn config() -> Config {
        let mut config = Config::default();
        config.capture.variants = variants();
        config.capture.retry.initial_delay_ms = 100;
        config.analysis.retry.initial_delay_ms = 100;
        config.run.deadline_secs = 0;
        config.run.grace_period_secs = 1;
        config
    }
}
