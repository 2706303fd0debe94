//! Compare mode: check the current state against a reference document.

use std::io::Write;
use std::path::{Path, PathBuf};

use console::Style;

use crate::config::MachineStateConfig;
use crate::error::Result;
use crate::group::{CompareOptions, Diff, InfoGroup, Side};
use crate::probes::collect;

use super::dispatcher::{Command, CommandResult};

/// Printed when nothing required differs.
pub const MATCH_MESSAGE: &str = "The current state matches the reference";

/// The compare command implementation.
pub struct CompareCommand {
    config: MachineStateConfig,
    reference: PathBuf,
}

impl CompareCommand {
    pub fn new(config: MachineStateConfig, reference: PathBuf) -> Self {
        Self { config, reference }
    }
}

impl Command for CompareCommand {
    fn execute(&self, out: &mut dyn Write) -> Result<CommandResult> {
        let tree = collect(&self.config)?;
        report_comparison(&tree, &self.reference, &self.config.compare_options(), out)
    }
}

/// Compare `tree` with the document in `reference` and print the outcome.
///
/// Exit code 1 signals a mismatch.
pub fn report_comparison(
    tree: &InfoGroup,
    reference: &Path,
    options: &CompareOptions,
    out: &mut dyn Write,
) -> Result<CommandResult> {
    let diff = tree.compare_with(reference, options)?;
    if diff.is_empty() {
        writeln!(out, "{}", Style::new().green().apply_to(MATCH_MESSAGE))?;
        if !diff.unmatched.is_empty() {
            write_unmatched(&diff, out)?;
        }
        return Ok(CommandResult::success());
    }
    write_diff(&diff, out)?;
    Ok(CommandResult::failure(1))
}

fn write_diff(diff: &Diff, out: &mut dyn Write) -> Result<()> {
    let key = Style::new().bold();
    let ours = Style::new().red();
    let theirs = Style::new().green();
    writeln!(out, "{} required value(s) differ:", diff.mismatches.len())?;
    for m in &diff.mismatches {
        writeln!(
            out,
            "  {}: {} (current) != {} (reference)",
            key.apply_to(&m.path),
            ours.apply_to(describe(&m.ours)),
            theirs.apply_to(describe(&m.theirs)),
        )?;
    }
    write_unmatched(diff, out)
}

fn write_unmatched(diff: &Diff, out: &mut dyn Write) -> Result<()> {
    let dim = Style::new().dim();
    for child in &diff.unmatched {
        let side = match child.side {
            Side::Ours => "current state",
            Side::Theirs => "reference",
        };
        writeln!(out, "  {}", dim.apply_to(format!("{} only in {side}", child.path)))?;
    }
    Ok(())
}

fn describe(value: &Option<serde_json::Value>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "<missing>".to_string(),
    }
}
