//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing the parsed CLI to a mode

use std::io::Write;

use crate::cli::args::Cli;
use crate::config::MachineStateConfig;
use crate::error::Result;

use super::collect::CollectCommand;
use super::compare::CompareCommand;
use super::config::ConfigCommand;

/// Trait for command implementations.
pub trait Command {
    /// Execute the command, writing its report to `out`.
    fn execute(&self, out: &mut dyn Write) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Picks the mode from the parsed CLI and runs it.
pub struct CommandDispatcher {
    config: MachineStateConfig,
}

impl CommandDispatcher {
    /// Create a dispatcher for an effective configuration.
    pub fn new(config: MachineStateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MachineStateConfig {
        &self.config
    }

    /// `--config` wins over `--json`, which wins over plain collection.
    pub fn dispatch(&self, cli: &Cli, out: &mut dyn Write) -> Result<CommandResult> {
        if cli.config {
            return ConfigCommand::new(self.config.clone()).execute(out);
        }
        match &cli.json {
            Some(reference) => {
                CompareCommand::new(self.config.clone(), reference.clone()).execute(out)
            }
            None => CollectCommand::new(self.config.clone(), cli.output.clone()).execute(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_result_success() {
        let result = CommandResult::success();
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
    }

    #[test]
    fn command_result_failure() {
        let result = CommandResult::failure(1);
        assert!(!result.success);
        assert_eq!(result.exit_code, 1);
    }

    #[test]
    fn config_flag_prints_configuration() {
        let cli = Cli {
            config: true,
            json: Some("/nonexistent/reference.json".into()),
            ..Default::default()
        };
        let dispatcher = CommandDispatcher::new(MachineStateConfig::default());
        let mut out = Vec::new();
        let result = dispatcher.dispatch(&cli, &mut out).unwrap();
        assert!(result.success);
        assert!(String::from_utf8(out).unwrap().contains("likwid_enable"));
    }
}
