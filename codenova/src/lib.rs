//! Multi-file code editor core.
//!
//! A session of source files with debounced persistence, and an execution
//! dispatcher that runs JavaScript in a local sandboxed child process and
//! sends Python, Java, C++ and C to a remote execution service.
//!
//! - **[`core`]**: Pure, deterministic logic (session mutations, invariants,
//!   language tables, debounce, result normalization). No I/O.
//! - **[`io`]**: Side-effecting adapters (key-value storage, persistence,
//!   child processes, HTTP, configuration, disk import/export).
//!
//! [`store`] and [`dispatch`] combine the two; [`workbench`] is the command
//! surface the CLI drives.

pub mod core;
pub mod dispatch;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod workbench;
