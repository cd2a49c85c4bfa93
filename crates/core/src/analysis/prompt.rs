//! Analysis prompt.

use crate::item::Item;

const RESPONSE_SHAPE: &str = r#"{
  "symbol": "TICKER",
  "analysis_date": "YYYY-MM-DD",
  "primary_trend": "Bullish | Bearish | Neutral",
  "secondary_trend": "Bullish | Bearish | Neutral",
  "patterns_identified": [
    {"pattern": "name", "type": "reversal | continuation", "implication": "bullish | bearish", "completion": "percent or status"}
  ],
  "support_levels": [0.0],
  "resistance_levels": [0.0],
  "volume_assessment": "text",
  "rsi": {"value": 0.0, "zone": "overbought | oversold | neutral", "divergence": "bullish | bearish | none"},
  "recommendation": {"signal": "BUY | SELL | HOLD", "confidence": "HIGH | MEDIUM | LOW", "reasoning": "text"},
  "key_observations": ["text"],
  "summary": "two or three sentences"
}"#;

/// Builds the instruction sent after the chart images.
pub fn analysis_prompt(item: &Item, chart_labels: &[&str]) -> String {
    format!(
        "You are a technical analyst. The images above are the {charts} charts for {name} ({symbol}).\n\
         Read trend, chart patterns, support and resistance, volume and RSI across all of them, \
         then give one overall recommendation.\n\n\
         Reply with a single JSON object and nothing else, shaped like this:\n{shape}",
        charts = chart_labels.join(", "),
        name = item.display_name(),
        symbol = item.symbol,
        shape = RESPONSE_SHAPE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_mentions_item_and_charts() {
        let item = Item::new("NVDA", "NVIDIA");
        let prompt = analysis_prompt(&item, &["Daily", "Weekly"]);
        assert!(prompt.contains("NVIDIA (NVDA)"));
        assert!(prompt.contains("Daily, Weekly"));
        assert!(prompt.contains("\"recommendation\""));
    }
}
