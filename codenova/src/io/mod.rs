//! Side-effecting adapters: storage, child processes, network, filesystem.

pub mod config;
pub mod disk;
pub mod kv;
pub mod persistence;
pub mod process;
pub mod remote;
pub mod sandbox;
