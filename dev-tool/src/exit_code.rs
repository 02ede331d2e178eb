/// The process exit code for a successful run.
pub const NO_ERROR: i32 = 0;

/// The process exit code for a failed run.
pub const FATAL_ERROR: i32 = 1;
