use std::io::IsTerminal;

use chartwatch_core::{ItemResult, RunReport, Signal};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn paint(text: &str, color: &str, enabled: bool) -> String {
    if enabled {
        format!("{}{}{}", color, text, RESET)
    } else {
        text.to_string()
    }
}

fn signal_color(signal: Signal) -> &'static str {
    match signal {
        Signal::Buy => GREEN,
        Signal::Sell => RED,
        Signal::Hold => YELLOW,
    }
}

/// One line per ticker.
pub fn result_line(result: &ItemResult, color: bool) -> String {
    match result {
        ItemResult::Success(outcome) => {
            let signal = outcome.signal();
            let mut line = format!(
                "{:<8} {} ({})",
                outcome.symbol,
                paint(signal.as_str(), signal_color(signal), color),
                outcome.confidence()
            );
            if outcome.parse_fallback {
                line.push_str(" [unparsed reply]");
            }
            if !outcome.primary_trend.is_empty() {
                line.push_str(&format!(" trend: {}", outcome.primary_trend));
            }
            line
        }
        ItemResult::Captured(summary) => {
            format!(
                "{:<8} {} {} chart(s)",
                summary.symbol,
                paint("CAPTURED", GREEN, color),
                summary.artifacts.len()
            )
        }
        ItemResult::Failure(record) => {
            let mut line = format!(
                "{:<8} {} at {}: {}",
                record.symbol,
                paint("FAILED", RED, color),
                record.stage,
                record.kind
            );
            if let Some(variant) = &record.variant {
                line.push_str(&format!(" ({})", variant));
            }
            line
        }
    }
}

/// Prints a per-ticker summary of the run to stdout.
pub fn print_summary(report: &RunReport) {
    let color = std::io::stdout().is_terminal();
    let summary = report.summary();

    println!();
    println!("{}", paint("Run summary", BOLD, color));
    for result in &report.results {
        println!("  {}", result_line(result, color));
    }
    println!(
        "{} ticker(s): {} analyzed, {} captured, {} failed",
        summary.total, summary.succeeded, summary.captured, summary.failed
    );
    if summary.succeeded > 0 {
        println!(
            "Signals: {} BUY, {} SELL, {} HOLD",
            summary.buy, summary.sell, summary.hold
        );
    }
}
