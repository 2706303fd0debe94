//! Collection mode: gather the machine state and emit the document.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::MachineStateConfig;
use crate::error::Result;
use crate::group::{InfoGroup, RenderOptions};
use crate::probes::collect;

use super::dispatcher::{Command, CommandResult};

/// The collect command implementation.
pub struct CollectCommand {
    config: MachineStateConfig,
    output: Option<PathBuf>,
}

impl CollectCommand {
    pub fn new(config: MachineStateConfig, output: Option<PathBuf>) -> Self {
        Self { config, output }
    }
}

impl Command for CollectCommand {
    fn execute(&self, out: &mut dyn Write) -> Result<CommandResult> {
        let tree = collect(&self.config)?;
        write_document(&tree, &self.config.render_options(), self.output.as_deref(), out)?;
        Ok(CommandResult::success())
    }
}

/// Render `tree` to `output`, or to `out` when no file is given.
pub fn write_document(
    tree: &InfoGroup,
    options: &RenderOptions,
    output: Option<&Path>,
    out: &mut dyn Write,
) -> Result<()> {
    let text = tree.to_json(options)?;
    match output {
        Some(path) => {
            std::fs::write(path, format!("{text}\n"))?;
            info!(path = %path.display(), "document written");
        }
        None => writeln!(out, "{text}")?,
    }
    Ok(())
}
