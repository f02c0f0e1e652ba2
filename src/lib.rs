//! Command-line client for the task-execution platform.
//!
//! The binary in `main.rs` only parses arguments and starts the runtime;
//! everything else lives here so tests can drive commands against a scripted
//! transport.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod logging;
pub mod output;
pub mod shell;
pub mod terminal;
