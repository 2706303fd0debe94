//! External command execution with a bounded runtime.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{MachineStateError, Result};

/// Interval between exit checks while waiting for a child.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Result of executing a probe command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    /// Standard output, decoded lossily.
    pub stdout: String,

    /// Execution duration.
    pub duration: Duration,

    /// Whether command succeeded (exit code 0).
    pub success: bool,
}

/// Options for command execution.
#[derive(Debug, Clone)]
pub struct CommandOptions {
    /// Kill the child after this long.
    pub timeout: Duration,

    /// Environment variables set on top of the inherited environment.
    pub env: Vec<(String, String)>,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            env: vec![
                ("LC_ALL".to_string(), "C".to_string()),
                ("LANG".to_string(), "C".to_string()),
            ],
        }
    }
}

fn describe(program: &Path, args: &[&str]) -> String {
    let mut text = program.display().to_string();
    for arg in args {
        text.push(' ');
        text.push_str(arg);
    }
    text
}

/// Execute `program` with `args`, capturing stdout only.
///
/// Stdin and stderr are connected to the null device. The child is polled
/// until it exits or the timeout elapses, in which case it is killed and
/// [`MachineStateError::CommandTimedOut`] is returned. A non-zero exit is
/// reported through [`CommandResult::success`], not as an error.
pub fn execute(program: &Path, args: &[&str], options: &CommandOptions) -> Result<CommandResult> {
    let start = Instant::now();
    let command_line = describe(program, args);

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    for (key, value) in &options.env {
        cmd.env(key, value);
    }

    let mut child = cmd.spawn().map_err(|e| MachineStateError::SourceUnavailable {
        source_id: command_line.clone(),
        message: e.to_string(),
    })?;

    let stdout = child.stdout.take();
    let reader = thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = stdout {
            let _ = pipe.read_to_end(&mut buffer);
        }
        buffer
    });

    let deadline = start + options.timeout;
    let status = loop {
        match child.try_wait()? {
            Some(status) => break status,
            None if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                debug!(command = %command_line, "killed after timeout");
                return Err(MachineStateError::CommandTimedOut {
                    command: command_line,
                    seconds: options.timeout.as_secs(),
                });
            }
            None => thread::sleep(POLL_INTERVAL),
        }
    };

    let stdout = reader.join().unwrap_or_default();
    Ok(CommandResult {
        exit_code: status.code(),
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        duration: start.elapsed(),
        success: status.success(),
    })
}

/// Execute and return trimmed stdout, turning a non-zero exit into
/// [`MachineStateError::CommandFailed`].
pub fn execute_captured(program: &Path, args: &[&str], options: &CommandOptions) -> Result<String> {
    let result = execute(program, args, options)?;
    if !result.success {
        return Err(MachineStateError::CommandFailed {
            command: describe(program, args),
            code: result.exit_code,
        });
    }
    Ok(result.stdout.trim().to_string())
}
