mod args;
mod exit_codes;
mod output;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chartwatch_core::{
    load_config, metrics, validate_config, validate_items, AnthropicAnalyzer, BatchOrchestrator,
    Config, ErrorKind, HttpChartCapturer, Item, JsonFileSink, RunHalt, RunOutput,
    SanitizedConfig,
};

use args::Args;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(args.verbose).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let code = match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("Fatal error: {:#}", e);
            exit_codes::FAILURE
        }
    };
    std::process::exit(code);
}

fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug,hyper=info,reqwest=info"
    } else {
        "info"
    }
}

/// Picks the items for this run. Overridden tickers are named after their
/// symbol.
fn select_items(configured: &[Item], overrides: &[String]) -> Vec<Item> {
    if overrides.is_empty() {
        return configured.to_vec();
    }
    overrides
        .iter()
        .map(|symbol| Item::from_symbol(symbol))
        .collect()
}

fn config_hash(config: &Config) -> String {
    let sanitized = SanitizedConfig::from(config);
    let config_json = serde_json::to_string(&sanitized).unwrap_or_default();
    let hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    hash[..16].to_string()
}

fn write_metrics(path: &Path) -> Result<()> {
    let text = metrics::render_text().context("Failed to render metrics")?;
    std::fs::write(path, text).with_context(|| format!("Failed to write metrics to {:?}", path))
}

fn exit_code(output: &RunOutput) -> i32 {
    if output.was_interrupted() {
        exit_codes::INTERRUPTED
    } else if output.delivery.is_failed() {
        exit_codes::FAILURE
    } else {
        exit_codes::SUCCESS
    }
}

async fn run(args: Args) -> Result<i32> {
    let config_path = args.config_path();
    info!("Loading configuration from {:?}", config_path);
    let mut config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    config.tickers = select_items(&config.tickers, &args.tickers);
    if let Some(max) = args.max_concurrent {
        config.run.max_concurrent_items = usize::from(max);
    }
    validate_config(&config).context("Configuration validation failed")?;
    validate_items(&config.tickers).context("Nothing to process")?;

    info!(
        "Configuration loaded (hash {}): {} ticker(s), {} chart variant(s), model {}",
        config_hash(&config),
        config.tickers.len(),
        config.capture.variants.len(),
        config.analysis.model
    );

    let capturer =
        HttpChartCapturer::new(&config.capture).context("Failed to create chart capturer")?;
    let analyzer = if args.dry_run {
        info!("Dry run: charts will be captured but not analyzed");
        AnthropicAnalyzer::new(
            config.analysis.api_key.clone().unwrap_or_default(),
            config.analysis.model.clone(),
        )
    } else {
        AnthropicAnalyzer::from_config(&config.analysis)
            .context("Failed to create analyzer (is ANTHROPIC_API_KEY set?)")?
    };

    let mut orchestrator =
        BatchOrchestrator::new(&config, capturer, analyzer).capture_only(args.dry_run);
    if !args.skip_report() {
        orchestrator =
            orchestrator.with_sink(Arc::new(JsonFileSink::new(config.report.path.clone())));
    }

    let halt = RunHalt::new();
    let interrupt = {
        let halt = halt.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping the run");
                halt.halt(ErrorKind::Interrupted);
            }
        })
    };

    let output = orchestrator.run_until(config.tickers.clone(), halt).await;
    interrupt.abort();

    output::print_summary(&output.report);

    if let Some(path) = &args.metrics_file {
        if let Err(e) = write_metrics(path) {
            warn!("{:#}", e);
        }
    }

    Ok(exit_code(&output))
}
