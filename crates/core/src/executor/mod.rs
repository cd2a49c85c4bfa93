//! Bounded-concurrency task execution with cooperative cancellation.

mod bounded;
mod halt;
mod types;

pub use bounded::BoundedExecutor;
pub use halt::RunHalt;
pub use types::{PoolStatus, TaskOutcome};
