//! Per-item pipeline: capture every chart, then analyze them together.
//!
//! The pipeline moves each item through an explicit [`ItemState`] machine and
//! publishes every state on a watch channel, so whoever runs it can tell
//! where an item was when the run had to stop waiting for it.

mod runner;
mod state;

pub use runner::{ItemContext, ItemPipeline};
pub use state::{ItemState, TransitionError};
