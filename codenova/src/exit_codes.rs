//! Stable exit codes for codenova CLI commands.

/// Command succeeded, or the program ran and exited cleanly.
pub const OK: i32 = 0;
/// Bad arguments, unknown file id, unreadable config or other local errors.
pub const INVALID: i32 = 1;
/// `codenova run`: the program failed or its language has no runner.
pub const PROGRAM_FAILED: i32 = 2;
/// `codenova run`: the execution service could not be reached or answered badly.
pub const UNAVAILABLE: i32 = 3;
