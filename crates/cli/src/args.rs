use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "chartwatch",
    version,
    about = "Capture stock charts and have a vision model analyze them"
)]
pub struct Args {
    /// Configuration file. Defaults to $CHARTWATCH_CONFIG, then config.toml.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only process these tickers instead of the configured list.
    #[arg(short = 't', long = "ticker", value_name = "SYMBOL", num_args = 1..)]
    pub tickers: Vec<String>,

    /// Do not write the JSON report.
    #[arg(long)]
    pub no_report: bool,

    /// Capture charts only. Skips analysis and the report.
    #[arg(long)]
    pub dry_run: bool,

    /// Number of tickers processed at once.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub max_concurrent: Option<u16>,

    /// Debug logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Write Prometheus metrics here when the run ends.
    #[arg(long, value_name = "PATH")]
    pub metrics_file: Option<PathBuf>,
}

impl Args {
    /// Config file to load.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(|| {
            std::env::var("CHARTWATCH_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("config.toml"))
        })
    }

    /// Whether the report sink should be skipped.
    pub fn skip_report(&self) -> bool {
        self.no_report || self.dry_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["chartwatch"]).unwrap();
        assert!(args.tickers.is_empty());
        assert!(!args.dry_run);
        assert!(!args.skip_report());
        assert!(args.max_concurrent.is_none());
    }

    #[test]
    fn test_multiple_tickers() {
        let args =
            Args::try_parse_from(["chartwatch", "-t", "aapl", "msft", "--ticker", "SPY"]).unwrap();
        assert_eq!(args.tickers, vec!["aapl", "msft", "SPY"]);
    }

    #[test]
    fn test_dry_run_skips_report() {
        let args = Args::try_parse_from(["chartwatch", "--dry-run", "-v"]).unwrap();
        assert!(args.dry_run);
        assert!(args.verbose);
        assert!(args.skip_report());
    }

    #[test]
    fn test_explicit_config_path() {
        let args = Args::try_parse_from(["chartwatch", "-c", "/etc/chartwatch.toml"]).unwrap();
        assert_eq!(args.config_path(), PathBuf::from("/etc/chartwatch.toml"));
    }

    #[test]
    fn test_max_concurrent_must_be_positive() {
        assert!(Args::try_parse_from(["chartwatch", "--max-concurrent", "0"]).is_err());
        let args = Args::try_parse_from(["chartwatch", "--max-concurrent", "4"]).unwrap();
        assert_eq!(args.max_concurrent, Some(4));
    }
}
