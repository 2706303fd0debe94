//! MachineState CLI entry point.

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use machinestate::cli::{Cli, CommandDispatcher};
use machinestate::MachineStateError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is WARN
///
/// Logs go to stderr; stdout carries the document.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("machinestate=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("machinestate=warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn exit_code(error: &MachineStateError) -> u8 {
    match error {
        MachineStateError::InvalidArgument { .. }
        | MachineStateError::ConfigNotFound { .. }
        | MachineStateError::ConfigParseError { .. } => 2,
        _ => 1,
    }
}

fn run(cli: &Cli) -> machinestate::Result<i32> {
    cli.validate()?;
    let config = cli.effective_config()?;
    let dispatcher = CommandDispatcher::new(config);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = dispatcher.dispatch(cli, &mut out)?;
    out.flush()?;
    Ok(result.exit_code)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tracing::debug!("machinestate starting with args: {:?}", cli);

    match run(&cli) {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(exit_code(&e))
        }
    }
}
