//! CLI command implementations.
//!
//! Each mode implements the [`Command`] trait, which provides a uniform
//! interface for executing it and reporting an exit code. The
//! [`CommandDispatcher`] picks the mode from the parsed flags.

pub mod collect;
pub mod compare;
pub mod config;
pub mod dispatcher;

pub use collect::{write_document, CollectCommand};
pub use compare::{report_comparison, CompareCommand, MATCH_MESSAGE};
pub use config::ConfigCommand;
pub use dispatcher::{Command, CommandDispatcher, CommandResult};
