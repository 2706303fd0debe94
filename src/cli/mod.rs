//! Command-line interface for machinestate.
//!
//! # Architecture
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Collection, comparison and config modes

pub mod args;
pub mod commands;

pub use args::Cli;
pub use commands::{Command, CommandDispatcher, CommandResult};
