//! Lenient parsing of analyzer replies.

use serde_json::{Map, Value};
use tracing::warn;

use super::{
    AnalysisOutcome, Confidence, PatternObservation, Recommendation, RsiReading, Signal,
};

/// Longest summary kept when the reply could not be parsed.
const FALLBACK_SUMMARY_CHARS: usize = 500;

/// Pulls a JSON object out of model output.
///
/// Handles Markdown fences and, failing that, takes everything from the
/// first `{` to the last `}`.
pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let inner = rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest);
        let inner = match inner.rfind("```") {
            Some(end) => &inner[..end],
            None => inner,
        };
        return Some(inner.trim().to_string());
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

/// Reads a field as text. Numbers and booleans are rendered; anything else
/// counts as missing.
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn field(object: &Map<String, Value>, key: &str) -> Option<String> {
    text(object.get(key))
}

/// Reads a price level given either as a number or as text like "$150.25".
fn level_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            cleaned.parse().ok()
        }
        _ => None,
    }
}

/// A list of levels, or a single level given on its own.
fn levels(value: Option<&Value>) -> Vec<f64> {
    match value {
        Some(Value::Array(values)) => values.iter().filter_map(level_value).collect(),
        Some(other) => level_value(other).into_iter().collect(),
        None => Vec::new(),
    }
}

fn texts(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(values)) => values.iter().filter_map(|v| text(Some(v))).collect(),
        Some(other) => text(Some(other)).into_iter().collect(),
        None => Vec::new(),
    }
}

fn patterns(value: Option<&Value>) -> Vec<PatternObservation> {
    let Some(Value::Array(values)) = value else {
        return Vec::new();
    };
    values
        .iter()
        .filter_map(|entry| match entry {
            Value::Object(pattern) => Some(PatternObservation {
                pattern: field(pattern, "pattern").unwrap_or_default(),
                kind: field(pattern, "type").unwrap_or_default(),
                implication: field(pattern, "implication").unwrap_or_default(),
                completion: field(pattern, "completion").unwrap_or_default(),
            }),
            Value::String(name) => Some(PatternObservation {
                pattern: name.clone(),
                ..Default::default()
            }),
            _ => None,
        })
        .collect()
}

fn rsi(value: Option<&Value>) -> RsiReading {
    match value {
        Some(Value::Object(rsi)) => RsiReading {
            value: rsi.get("value").and_then(level_value),
            zone: field(rsi, "zone").unwrap_or_default(),
            divergence: field(rsi, "divergence").unwrap_or_default(),
        },
        Some(other) => RsiReading {
            value: level_value(other),
            ..Default::default()
        },
        None => RsiReading::default(),
    }
}

fn recommendation(value: Option<&Value>) -> Recommendation {
    let (signal, confidence, reasoning) = match value {
        Some(Value::Object(rec)) => (
            field(rec, "signal"),
            field(rec, "confidence"),
            field(rec, "reasoning"),
        ),
        Some(other) => (text(Some(other)), None, None),
        None => (None, None, None),
    };
    Recommendation {
        signal: signal.as_deref().map(Signal::parse).unwrap_or(Signal::Hold),
        confidence: confidence
            .as_deref()
            .map(Confidence::parse)
            .unwrap_or(Confidence::Low),
        reasoning: reasoning.unwrap_or_default(),
    }
}

/// Turns model output into an outcome for `symbol`.
///
/// Never fails. A field that is missing or has an unexpected shape takes its
/// default; output that is not a JSON object yields a HOLD/LOW verdict with
/// `parse_fallback` set and the start of the text as summary.
pub fn parse_analysis(text: &str, symbol: &str) -> AnalysisOutcome {
    let json = extract_json(text).unwrap_or_else(|| text.trim().to_string());
    match serde_json::from_str::<Value>(&json) {
        Ok(Value::Object(payload)) => from_payload(&payload, symbol, text),
        Ok(other) => {
            warn!(
                "Analysis for {} is not a JSON object (got {})",
                symbol,
                kind_of(&other)
            );
            fallback(text, symbol)
        }
        Err(e) => {
            warn!("Could not parse analysis for {}: {}", symbol, e);
            fallback(text, symbol)
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn from_payload(payload: &Map<String, Value>, symbol: &str, raw: &str) -> AnalysisOutcome {
    let symbol = field(payload, "symbol").unwrap_or_else(|| symbol.to_string());
    let mut outcome = AnalysisOutcome::new(symbol, recommendation(payload.get("recommendation")));
    if let Some(date) = field(payload, "analysis_date") {
        outcome.analysis_date = date;
    }
    if let Some(trend) = field(payload, "primary_trend") {
        outcome.primary_trend = trend;
    }
    if let Some(trend) = field(payload, "secondary_trend") {
        outcome.secondary_trend = trend;
    }
    outcome.patterns = patterns(payload.get("patterns_identified"));
    outcome.support_levels = levels(payload.get("support_levels"));
    outcome.resistance_levels = levels(payload.get("resistance_levels"));
    outcome.volume_assessment = field(payload, "volume_assessment").unwrap_or_default();
    outcome.rsi = rsi(payload.get("rsi"));
    outcome.key_observations = texts(payload.get("key_observations"));
    outcome.summary = field(payload, "summary").unwrap_or_default();
    outcome.raw_response = raw.to_string();
    outcome
}

fn fallback(text: &str, symbol: &str) -> AnalysisOutcome {
    let mut outcome = AnalysisOutcome::new(
        symbol,
        Recommendation {
            signal: Signal::Hold,
            confidence: Confidence::Low,
            reasoning: "Unable to parse analysis".to_string(),
        },
    );
    outcome.summary = text.chars().take(FALLBACK_SUMMARY_CHARS).collect();
    outcome.raw_response = text.to_string();
    outcome.parse_fallback = true;
    outcome
}
