/// Exit codes for cron jobs and wrappers.
pub const SUCCESS: i32 = 0;
/// The run could not start, or its report could not be delivered.
pub const FAILURE: i32 = 1;
/// Stopped with Ctrl-C (128 + SIGINT).
pub const INTERRUPTED: i32 = 130;
