//! Chart analysis.
//!
//! A [`ChartAnalyzer`] receives every captured chart of one item as a single
//! unit and returns a technical-analysis verdict.

mod anthropic;
mod config;
mod error;
mod parse;
mod prompt;
mod traits;
mod types;

pub use anthropic::AnthropicAnalyzer;
pub use config::AnalysisConfig;
pub use error::AnalysisError;
pub use parse::{extract_json, parse_analysis};
pub use prompt::analysis_prompt;
pub use traits::ChartAnalyzer;
pub use types::{
    AnalysisOutcome, Confidence, PatternObservation, Recommendation, RsiReading, Signal,
};
