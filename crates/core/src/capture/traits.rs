//! Capturer trait definition.

use async_trait::async_trait;

use super::{CaptureArtifact, CaptureError, ChartVariant};
use crate::item::Item;

/// Fetches or renders one chart image.
///
/// Implementations are shared by every item of a run and must not keep
/// per-item state.
#[async_trait]
pub trait ChartCapturer: Send + Sync {
    /// Returns the name of this capturer implementation.
    fn name(&self) -> &str;

    /// Captures `variant` of `item`'s chart.
    async fn capture(
        &self,
        item: &Item,
        variant: &ChartVariant,
    ) -> Result<CaptureArtifact, CaptureError>;
}
