//! Subprocess execution with captured output and a hard deadline.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// Captured output of a process that exited successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Error)]
pub enum ProcessError {
    /// The program could not be started at all.
    #[error("failed to spawn process: {0}")]
    Spawn(#[from] std::io::Error),

    /// The deadline elapsed; the child has been killed.
    #[error("process timed out after {after:?}")]
    TimedOut { after: Duration },

    /// The process ran to completion with a non-zero exit status.
    #[error("process exited with {status}")]
    Failed {
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },
}

impl ProcessError {
    /// Captured stderr, empty for spawn failures and timeouts.
    pub fn stderr(&self) -> &str {
        match self {
            ProcessError::Failed { stderr, .. } => stderr,
            _ => "",
        }
    }
}

/// Run `command` to completion, capturing stdout and stderr.
///
/// The child is configured with `kill_on_drop`, so hitting `timeout` drops
/// the pending future and terminates the process.
pub async fn run(mut command: Command, timeout: Duration) -> Result<ProcessOutput, ProcessError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(command = ?command.as_std(), timeout_secs = timeout.as_secs(), "spawning process");
    let child = command.spawn()?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result?,
        Err(_) => {
            warn!(timeout_secs = timeout.as_secs(), "process exceeded its deadline; killed");
            return Err(ProcessError::TimedOut { after: timeout });
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if output.status.success() {
        Ok(ProcessOutput { stdout, stderr })
    } else {
        Err(ProcessError::Failed {
            status: output.status,
            stdout,
            stderr,
        })
    }
}

/// Build a command that runs `line` through the platform shell.
pub fn shell(line: &str) -> Command {
    #[cfg(windows)]
    {
        let mut command = Command::new("cmd");
        command.args(["/C", line]);
        command
    }
    #[cfg(not(windows))]
    {
        let mut command = Command::new("sh");
        command.args(["-c", line]);
        command
    }
}
