pub mod analysis;
pub mod capture;
pub mod config;
pub mod executor;
pub mod failure;
pub mod item;
pub mod metrics;
pub mod orchestrator;
pub mod pipeline;
pub mod report;
pub mod retry;
pub mod testing;

pub use analysis::{AnalysisError, AnalysisOutcome, AnthropicAnalyzer, ChartAnalyzer, Signal};
pub use capture::{CaptureArtifact, CaptureError, ChartCapturer, ChartVariant, HttpChartCapturer};
pub use config::{
    load_config, load_config_from_str, validate_config, validate_items, Config, ConfigError,
    SanitizedConfig,
};
pub use executor::{BoundedExecutor, PoolStatus, RunHalt, TaskOutcome};
pub use failure::{Classified, ErrorClass, ErrorKind, FailureRecord, Stage};
pub use item::Item;
pub use orchestrator::{BatchOrchestrator, RunConfig, RunOutput};
pub use pipeline::{ItemContext, ItemPipeline, ItemState};
pub use report::{
    DeliveryError, DeliveryStatus, ItemResult, JsonFileSink, ReportSink, RunReport, RunSummary,
};
pub use retry::{with_retry, RetryConfig, RetryPolicy};
