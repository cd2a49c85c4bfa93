//! Types for the analysis module.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::capture::CaptureArtifact;

/// Trading signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    /// Parses a signal leniently. Anything unrecognised is a hold.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "BUY" | "STRONG BUY" => Self::Buy,
            "SELL" | "STRONG SELL" => Self::Sell,
            _ => Self::Hold,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How sure the analyzer is about its signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Parses a confidence level leniently. Anything unrecognised is low.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "HIGH" => Self::High,
            "MEDIUM" | "MODERATE" => Self::Medium,
            _ => Self::Low,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub signal: Signal,
    pub confidence: Confidence,
    pub reasoning: String,
}

/// A chart pattern the analyzer spotted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternObservation {
    pub pattern: String,
    /// "reversal", "continuation", ...
    #[serde(rename = "type")]
    pub kind: String,
    pub implication: String,
    pub completion: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiReading {
    pub value: Option<f64>,
    pub zone: String,
    pub divergence: String,
}

/// Technical analysis of one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub symbol: String,
    pub analysis_date: String,
    pub primary_trend: String,
    pub secondary_trend: String,
    pub patterns: Vec<PatternObservation>,
    pub support_levels: Vec<f64>,
    pub resistance_levels: Vec<f64>,
    pub volume_assessment: String,
    pub rsi: RsiReading,
    pub recommendation: Recommendation,
    pub key_observations: Vec<String>,
    pub summary: String,
    /// Unparsed model output, kept for debugging.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw_response: String,
    /// True when the model output could not be parsed and the conservative
    /// default verdict was used instead.
    #[serde(default)]
    pub parse_fallback: bool,
    /// Charts the verdict was based on.
    #[serde(default)]
    pub artifacts: Vec<CaptureArtifact>,
}

impl AnalysisOutcome {
    /// An outcome with only a verdict filled in.
    pub fn new(symbol: impl Into<String>, recommendation: Recommendation) -> Self {
        Self {
            symbol: symbol.into(),
            analysis_date: chrono::Utc::now().date_naive().to_string(),
            primary_trend: "Unknown".to_string(),
            secondary_trend: "Unknown".to_string(),
            patterns: Vec::new(),
            support_levels: Vec::new(),
            resistance_levels: Vec::new(),
            volume_assessment: String::new(),
            rsi: RsiReading::default(),
            recommendation,
            key_observations: Vec::new(),
            summary: String::new(),
            raw_response: String::new(),
            parse_fallback: false,
            artifacts: Vec::new(),
        }
    }

    pub fn signal(&self) -> Signal {
        self.recommendation.signal
    }

    pub fn confidence(&self) -> Confidence {
        self.recommendation.confidence
    }

    /// Attaches the charts the verdict was based on.
    pub fn with_artifacts(mut self, artifacts: Vec<CaptureArtifact>) -> Self {
        self.artifacts = artifacts;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_parse() {
        assert_eq!(Signal::parse("buy"), Signal::Buy);
        assert_eq!(Signal::parse(" SELL "), Signal::Sell);
        assert_eq!(Signal::parse("accumulate"), Signal::Hold);
    }

    #[test]
    fn test_confidence_parse() {
        assert_eq!(Confidence::parse("High"), Confidence::High);
        assert_eq!(Confidence::parse("medium"), Confidence::Medium);
        assert_eq!(Confidence::parse("???"), Confidence::Low);
    }

    #[test]
    fn test_outcome_serializes_uppercase_signal() {
        let outcome = AnalysisOutcome::new(
            "AAPL",
            Recommendation {
                signal: Signal::Buy,
                confidence: Confidence::High,
                reasoning: "breakout".to_string(),
            },
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["recommendation"]["signal"], "BUY");
        assert_eq!(json["recommendation"]["confidence"], "HIGH");
        assert!(json.get("raw_response").is_none());
    }
}
