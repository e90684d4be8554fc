use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};
use which::which;

/// Builds are expected to finish within two hours.
pub const DEFAULT_BUILD_TIMEOUT: Duration = Duration::from_secs(7200);

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A shell command line together with the environment and directory it runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    /// First word must name the tool; it is looked up on `PATH` before running.
    pub command: String,
    pub env: BTreeMap<String, String>,
    pub cwd: PathBuf,
    pub timeout: Duration,
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("'{0}' was not found on PATH")]
    ToolMissing(String),
    #[error("failed to start '{command}': {source}")]
    Spawn { command: String, source: io::Error },
    #[error("failed while waiting for '{command}': {source}")]
    Wait { command: String, source: io::Error },
    #[error("'{command}' exited with status {code:?}")]
    Failed { command: String, code: Option<i32> },
    #[error("'{command}' timed out after {}s", timeout.as_secs())]
    TimedOut { command: String, timeout: Duration },
}

pub trait BuildRunner {
    fn run(&self, command: &BuildCommand) -> Result<(), ExecutionError>;
}

/// Runs commands through the platform shell, streaming their output to ours.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl BuildRunner for ShellRunner {
    fn run(&self, command: &BuildCommand) -> Result<(), ExecutionError> {
        if let Some(tool) = command.command.split_whitespace().next() {
            which(tool).map_err(|_| ExecutionError::ToolMissing(tool.to_string()))?;
        }

        let (shell, flag) = if cfg!(windows) {
            ("cmd", "/C")
        } else {
            ("/bin/sh", "-c")
        };
        let line = format!("{} 2>&1", command.command);
        debug!(%line, cwd = %command.cwd.display(), "spawning build command");

        let mut cmd = Command::new(shell);
        cmd.arg(flag)
            .arg(&line)
            .envs(&command.env)
            .current_dir(&command.cwd);
        // Own process group, so a timeout can take down everything the shell started.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let child = cmd
            .spawn()
            .map_err(|source| ExecutionError::Spawn {
                command: command.command.clone(),
                source,
            })?;

        let status = wait_with_timeout(child, command.timeout).map_err(|source| {
            ExecutionError::Wait {
                command: command.command.clone(),
                source,
            }
        })?;

        match status {
            Some(status) if status.success() => Ok(()),
            Some(status) => Err(ExecutionError::Failed {
                command: command.command.clone(),
                code: status.code(),
            }),
            None => {
                warn!(command = %command.command, timeout = ?command.timeout, "build timed out");
                Err(ExecutionError::TimedOut {
                    command: command.command.clone(),
                    timeout: command.timeout,
                })
            }
        }
    }
}

/// Waits for `child`, killing it and its process group once `timeout` has
/// elapsed. Returns `None` when the child had to be killed.
fn wait_with_timeout(mut child: Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if started.elapsed() >= timeout {
            kill_process_group(&mut child)?;
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(unix)]
fn kill_process_group(child: &mut Child) -> io::Result<()> {
    let Ok(pgid) = libc::pid_t::try_from(child.id()) else {
        return child.kill();
    };
    // SAFETY: killpg only sends a signal; the group was created at spawn with
    // the child as its leader, and the child has not been reaped yet.
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } == 0 {
        return Ok(());
    }
    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        Ok(())
    } else {
        Err(err)
    }
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) -> io::Result<()> {
    child.kill()
}
