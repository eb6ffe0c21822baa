//! Running external tools with a deadline.

use std::io::ErrorKind;
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Why an external tool did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolFailure {
    #[error("{program} not found")]
    NotFound { program: String },

    #[error("{program} could not be started: {message}")]
    Spawn { program: String, message: String },

    #[error("{program} exited with {status}")]
    Failed { program: String, status: String },

    #[error("{program} did not finish within {}s", timeout.as_secs())]
    TimedOut { program: String, timeout: Duration },
}

/// Run `command` to completion, killing it once `timeout` has elapsed.
///
/// Output is inherited from the current process.
pub fn run_with_deadline(command: &mut Command, timeout: Duration) -> Result<(), ToolFailure> {
    let program = command.get_program().to_string_lossy().into_owned();
    let mut child = command.spawn().map_err(|e| match e.kind() {
        ErrorKind::NotFound => ToolFailure::NotFound {
            program: program.clone(),
        },
        _ => ToolFailure::Spawn {
            program: program.clone(),
            message: e.to_string(),
        },
    })?;

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) if status.success() => return Ok(()),
            Ok(Some(status)) => {
                return Err(ToolFailure::Failed {
                    program,
                    status: status.to_string(),
                })
            }
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ToolFailure::TimedOut { program, timeout });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                let _ = child.kill();
                return Err(ToolFailure::Spawn {
                    program,
                    message: e.to_string(),
                });
            }
        }
    }
}
