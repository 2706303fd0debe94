//! Config mode: `machinestate --config` shows the effective configuration.

use std::io::Write;

use crate::config::{ConfigPaths, MachineStateConfig};
use crate::error::{MachineStateError, Result};

use super::dispatcher::{Command, CommandResult};

/// The config command implementation.
pub struct ConfigCommand {
    config: MachineStateConfig,
}

impl ConfigCommand {
    pub fn new(config: MachineStateConfig) -> Self {
        Self { config }
    }
}

impl Command for ConfigCommand {
    fn execute(&self, out: &mut dyn Write) -> Result<CommandResult> {
        if let Some(path) = ConfigPaths::discover().user {
            writeln!(out, "# {}", path.display())?;
        }
        let yaml =
            serde_yaml::to_string(&self.config).map_err(|e| MachineStateError::Other(e.into()))?;
        write!(out, "{yaml}")?;
        Ok(CommandResult::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prints_yaml_that_parses_back() {
        let config = MachineStateConfig {
            extended: true,
            indent: 2,
            ..Default::default()
        };
        let mut out = Vec::new();
        ConfigCommand::new(config.clone()).execute(&mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let parsed: MachineStateConfig = serde_yaml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
