//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::config::{load_config, MachineStateConfig};
use crate::error::{MachineStateError, Result};
use crate::source::is_executable;

/// MachineState - Record the hardware and software state of a compute node.
#[derive(Debug, Default, Parser)]
#[command(name = "machinestate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Collect the extended field set
    #[arg(short, long)]
    pub extended: bool,

    /// Replace identifying values such as host names with a placeholder
    #[arg(short, long)]
    pub anonymous: bool,

    /// Sort keys in the output document
    #[arg(short, long)]
    pub sort: bool,

    /// Indentation of the output document (0 for compact)
    #[arg(short, long)]
    pub indent: Option<usize>,

    /// Write the document to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Compare the current state against a reference document
    #[arg(short, long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(short, long)]
    pub config: bool,

    /// Configuration file (defaults to ~/.config/machinestate/config.yml)
    #[arg(long, value_name = "FILE")]
    pub configfile: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Executable to describe alongside the machine state
    pub executable: Option<PathBuf>,
}

impl Cli {
    /// Reject paths that cannot be used before anything is collected.
    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.json {
            require_readable(path, "reference document")?;
        }
        if let Some(path) = &self.configfile {
            require_readable(path, "configuration file")?;
        }
        if let Some(path) = &self.executable {
            if !is_executable(path) {
                return Err(MachineStateError::InvalidArgument {
                    message: format!("'{}' is not an executable file", path.display()),
                });
            }
        }
        Ok(())
    }

    /// Load the configuration file and apply the command-line overrides.
    pub fn effective_config(&self) -> Result<MachineStateConfig> {
        let config = load_config(self.configfile.as_deref())?;
        Ok(self.apply(config))
    }

    /// Layer the flags given on the command line over `config`.
    ///
    /// Switches only ever turn options on; unset values keep the file's.
    pub fn apply(&self, mut config: MachineStateConfig) -> MachineStateConfig {
        config.extended |= self.extended;
        config.anonymous |= self.anonymous;
        config.sort |= self.sort;
        if let Some(indent) = self.indent {
            config.indent = indent;
        }
        if let Some(executable) = &self.executable {
            config.executable = Some(executable.clone());
        }
        config
    }
}

fn require_readable(path: &Path, what: &str) -> Result<()> {
    if !path.is_file() {
        return Err(MachineStateError::InvalidArgument {
            message: format!("{what} '{}' does not exist or is not a file", path.display()),
        });
    }
    std::fs::File::open(path).map_err(|e| MachineStateError::InvalidArgument {
        message: format!("{what} '{}' is not readable: {e}", path.display()),
    })?;
    Ok(())
}
