//! Batch orchestrator.
//!
//! Runs every item of a batch through the capture/analysis pipeline:
//! - **Items**: bounded concurrency, results kept in input order
//! - **Captures**: bounded per item
//! - **Analyses**: bounded across the whole run
//!
//! The run deadline (or an interrupt) halts the run; in-flight items get a
//! grace period, and items that never finish are reported as failures.

mod config;
mod runner;
mod types;

pub use config::RunConfig;
pub use runner::BatchOrchestrator;
pub use types::RunOutput;
