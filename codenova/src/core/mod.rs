//! Deterministic, pure logic shared by the editor.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod debounce;
pub mod invariants;
pub mod language;
pub mod normalize;
pub mod session;
pub mod types;
