//! The main library for the `failguard` application.
//!
//! `failguard` runs a command inside a guarded region. If the command fails, is
//! interrupted, or the tool itself breaks, exactly one diagnostic report is
//! written to stderr and appended to `failguard.log` in the tool's store, and
//! the process exits with status 1.
//!
//! The library is structured into several modules:
//! - `guard`: The guarded region; classifies whatever escapes it.
//! - `report`: Renders the diagnostic report, writes it, and exits.
//! - `console`: Encoding-tolerant console output.
//! - `store`: Resolves and creates the directory holding the log.
//! - `interrupt`: Ctrl-C handling.
//! - `logging`: `tracing` setup for the tool's own debug output.
//! - `cli`: Defines the command-line interface.
//! - `error`: The failure taxonomy and the crate's error types.

use std::process::{Child, Command, ExitStatus};
use std::thread;
use std::time::Duration;

pub mod cli;
pub mod console;
pub mod error;
pub mod guard;
pub mod interrupt;
pub mod logging;
pub mod report;
pub mod store;

pub use crate::error::{Class, FatalError, Failure, Interrupted, UnexpectedError};
pub use crate::guard::{intercept, ErrorHandler, Interception};
pub use crate::report::{Reporter, ToolInfo};

use crate::cli::Cli;
use crate::error::CommandError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// The work done inside the guarded region: run the requested command.
///
/// # Errors
///
/// - `FatalError` if the command exits unsuccessfully.
/// - `Interrupted` if Ctrl-C arrived before it started or while it runs, or it
///   dies of `SIGINT`.
/// - `CommandError` if it cannot be started or waited on.
pub fn run(cli: &Cli) -> Result<(), Failure> {
    let (program, args) = cli
        .command
        .split_first()
        .ok_or_else(|| FatalError::new("no command given"))?;
    interrupt::check()?;

    tracing::debug!(program = %program, ?args, "running command");
    let mut child = Command::new(program)
        .args(args)
        .spawn()
        .map_err(|source| CommandError::Spawn {
            program: program.clone(),
            source,
        })?;

    let status = wait_for(&mut child, program)?;
    tracing::debug!(program = %program, %status, "command finished");

    if status.success() {
        Ok(())
    } else if killed_by_interrupt(&status) {
        Err(Failure::from(Interrupted))
    } else {
        Err(Failure::from(FatalError::new(format!("`{program}` failed ({status})"))))
    }
}

/// Polls `child` so a Ctrl-C can be noticed while it runs.
fn wait_for(child: &mut Child, program: &str) -> Result<ExitStatus, Failure> {
    loop {
        if interrupt::requested() {
            tracing::debug!(program = %program, "interrupted, stopping command");
            if let Err(err) = child.kill() {
                tracing::debug!(program = %program, error = %err, "could not kill command");
            }
            if let Err(err) = child.wait() {
                tracing::debug!(program = %program, error = %err, "could not reap command");
            }
            return Err(Failure::from(Interrupted));
        }

        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(source) => {
                return Err(Failure::from(CommandError::Wait {
                    program: program.to_string(),
                    source,
                }))
            }
        }
    }
}

#[cfg(unix)]
fn killed_by_interrupt(status: &ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;

    const SIGINT: i32 = 2;
    status.signal() == Some(SIGINT)
}

#[cfg(not(unix))]
fn killed_by_interrupt(_status: &ExitStatus) -> bool {
    false
}
