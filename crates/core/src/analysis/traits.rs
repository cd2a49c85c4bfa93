//! Analyzer trait definition.

use async_trait::async_trait;

use super::{AnalysisError, AnalysisOutcome};
use crate::capture::CaptureArtifact;
use crate::item::Item;

/// Produces a verdict from a complete set of chart artifacts.
#[async_trait]
pub trait ChartAnalyzer: Send + Sync {
    /// Returns the name of this analyzer implementation.
    fn name(&self) -> &str;

    /// Analyzes all of `item`'s charts in one request.
    ///
    /// The returned outcome does not need to carry `artifacts`; the pipeline
    /// attaches them.
    async fn analyze(
        &self,
        item: &Item,
        artifacts: &[CaptureArtifact],
    ) -> Result<AnalysisOutcome, AnalysisError>;
}
