//! Access to the ambient system: files and commands.
//!
//! Groups never touch the filesystem or spawn processes directly; they go
//! through a [`SourceBackend`]. [`SystemBackend`] is the real implementation,
//! [`MockBackend`] serves canned data and counts invocations for tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use super::command::{execute_captured, CommandOptions};
use super::path::which;
use crate::error::{MachineStateError, Result};

/// Abstraction over file reads and command executions.
pub trait SourceBackend {
    /// Read a regular file and return its trimmed contents.
    fn read_file(&self, path: &Path) -> Result<String>;

    /// Run `executable` with whitespace-separated `args`, returning trimmed
    /// stdout.
    fn run_command(&self, executable: &str, args: &str) -> Result<String>;

    /// Paths matching a glob `pattern`, sorted.
    fn glob(&self, pattern: &str) -> Vec<PathBuf>;
}

/// Backend reading the real filesystem and running real processes.
#[derive(Debug, Clone)]
pub struct SystemBackend {
    options: CommandOptions,
}

impl SystemBackend {
    /// Create a backend with the default command timeout.
    pub fn new() -> Self {
        Self {
            options: CommandOptions::default(),
        }
    }

    /// Create a backend killing commands after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            options: CommandOptions {
                timeout,
                ..Default::default()
            },
        }
    }

    pub fn timeout(&self) -> Duration {
        self.options.timeout
    }
}

impl Default for SystemBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceBackend for SystemBackend {
    fn read_file(&self, path: &Path) -> Result<String> {
        let unavailable = |message: String| MachineStateError::SourceUnavailable {
            source_id: path.display().to_string(),
            message,
        };
        let metadata = fs::metadata(path).map_err(|e| unavailable(e.to_string()))?;
        if !metadata.is_file() {
            return Err(unavailable("not a regular file".to_string()));
        }
        let bytes = fs::read(path).map_err(|e| unavailable(e.to_string()))?;
        Ok(String::from_utf8_lossy(&bytes).trim().to_string())
    }

    fn run_command(&self, executable: &str, args: &str) -> Result<String> {
        let program = which(executable).ok_or_else(|| MachineStateError::SourceUnavailable {
            source_id: executable.to_string(),
            message: "not found on PATH".to_string(),
        })?;
        let args: Vec<&str> = args.split_whitespace().collect();
        execute_captured(&program, &args, &self.options)
    }

    fn glob(&self, pattern: &str) -> Vec<PathBuf> {
        let paths = match glob::glob(pattern) {
            Ok(paths) => paths,
            Err(e) => {
                debug!(pattern, error = %e, "bad glob pattern");
                return Vec::new();
            }
        };
        let mut matched: Vec<PathBuf> = paths.flatten().collect();
        matched.sort();
        matched
    }
}

/// In-memory backend for testing.
///
/// Files and command outputs are registered up front; every access is
/// counted so tests can assert how often a source was resolved.
#[derive(Debug, Default)]
pub struct MockBackend {
    files: HashMap<PathBuf, String>,
    commands: HashMap<(String, String), String>,
    file_reads: RefCell<HashMap<PathBuf, usize>>,
    command_runs: RefCell<HashMap<(String, String), usize>>,
}

impl MockBackend {
    /// Creates an empty backend where every source is unavailable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with the given content.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        self.files
            .insert(path.as_ref().to_path_buf(), content.into());
    }

    /// Adds a command with the given stdout.
    pub fn add_command(&mut self, executable: &str, args: &str, stdout: impl Into<String>) {
        self.commands
            .insert((executable.to_string(), args.to_string()), stdout.into());
    }

    /// How often `path` was read.
    pub fn file_reads(&self, path: impl AsRef<Path>) -> usize {
        self.file_reads
            .borrow()
            .get(path.as_ref())
            .copied()
            .unwrap_or(0)
    }

    /// How often `executable args` was run.
    pub fn command_runs(&self, executable: &str, args: &str) -> usize {
        self.command_runs
            .borrow()
            .get(&(executable.to_string(), args.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

impl SourceBackend for MockBackend {
    fn read_file(&self, path: &Path) -> Result<String> {
        *self
            .file_reads
            .borrow_mut()
            .entry(path.to_path_buf())
            .or_default() += 1;
        self.files
            .get(path)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| MachineStateError::SourceUnavailable {
                source_id: path.display().to_string(),
                message: "no such file".to_string(),
            })
    }

    fn run_command(&self, executable: &str, args: &str) -> Result<String> {
        let key = (executable.to_string(), args.to_string());
        *self.command_runs.borrow_mut().entry(key.clone()).or_default() += 1;
        self.commands
            .get(&key)
            .map(|stdout| stdout.trim().to_string())
            .ok_or_else(|| MachineStateError::SourceUnavailable {
                source_id: executable.to_string(),
                message: "not found on PATH".to_string(),
            })
    }

    fn glob(&self, pattern: &str) -> Vec<PathBuf> {
        let Ok(pattern) = glob::Pattern::new(pattern) else {
            return Vec::new();
        };
        let mut matched: Vec<PathBuf> = self
            .files
            .keys()
            .filter(|path| pattern.matches_path(path))
            .cloned()
            .collect();
        matched.sort();
        matched
    }
}
