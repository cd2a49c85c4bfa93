//! The unit of work: one ticker.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

static SYMBOL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z0-9$][A-Z0-9.\-^$:]*$").expect("symbol pattern is valid")
});

/// A ticker to process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    /// Ticker symbol, e.g. "AAPL".
    pub symbol: String,
    /// Display label. Falls back to the symbol when empty.
    #[serde(default)]
    pub name: String,
}

impl Item {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
        }
    }

    /// Builds an item from a bare symbol given on the command line.
    pub fn from_symbol(symbol: &str) -> Self {
        let symbol = symbol.trim().to_uppercase();
        Self {
            name: symbol.clone(),
            symbol,
        }
    }

    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.symbol
        } else {
            &self.name
        }
    }
}

/// Whether `symbol` looks like a ticker we can put in a chart URL.
pub fn is_valid_symbol(symbol: &str) -> bool {
    SYMBOL_RE.is_match(symbol)
}
