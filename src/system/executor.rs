// src/system/executor.rs

//! Running recipe commands through a shell.

use crate::{CancellationToken, constants::DEFAULT_SHELL};
use std::path::{Path, PathBuf};
use std::process::{Command as StdCommand, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Why a single command did not succeed.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The shell could not be started.
    #[error("Command '{command}' could not be executed: {source}")]
    Spawn {
        /// The command line that was being launched.
        command: String,
        /// The launch error.
        #[source]
        source: std::io::Error,
    },
    /// The command ran and exited unsuccessfully.
    #[error("Command '{command}' exited with {}.", describe_code(.code))]
    NonZeroExitStatus {
        /// The command line that failed.
        command: String,
        /// Exit status, `None` when killed by a signal.
        code: Option<i32>,
    },
    /// The cancellation token was set before or while the command ran.
    #[error("Operation was cancelled by the user.")]
    Cancelled,
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// The seam between the builder and process execution.
///
/// Implementations receive one fully expanded command line at a time and report whether
/// it succeeded.
pub trait CommandRunner {
    /// Runs one command line to completion.
    fn run(&mut self, command_line: &str) -> Result<(), ExecutionError>;
}

/// Runs each command through `<shell> -c <command>` inside the build directory.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
    cwd: PathBuf,
    cancellation_token: CancellationToken,
}

impl ShellRunner {
    /// A runner using the default shell, executing inside `cwd`.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            shell: DEFAULT_SHELL.to_string(),
            cwd: cwd.into(),
            cancellation_token: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Uses `shell` instead of the default.
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Shares `token` so another thread can stop running commands.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// The shell program commands are passed to.
    pub fn shell(&self) -> &str {
        &self.shell
    }
}

impl CommandRunner for ShellRunner {
    fn run(&mut self, command_line: &str) -> Result<(), ExecutionError> {
        execute_command(command_line, &self.shell, &self.cwd, &self.cancellation_token)
    }
}

fn is_cancelled(token: &CancellationToken) -> bool {
    token.load(Ordering::Relaxed)
}

/// `cmd` takes `/C`, everything else is treated as a POSIX shell taking `-c`.
fn shell_flag(shell: &str) -> &'static str {
    let program = Path::new(shell)
        .file_stem()
        .map(|s| s.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if program == "cmd" { "/C" } else { "-c" }
}

/// Executes a command line through `shell` and waits for it, with support for graceful
/// cancellation. Output is inherited from the current process.
pub fn execute_command(
    command_line: &str,
    shell: &str,
    cwd: &Path,
    cancellation_token: &CancellationToken,
) -> Result<(), ExecutionError> {
    let trimmed_command = command_line.trim();
    if trimmed_command.is_empty() {
        return Ok(()); // An empty command is a success, not an error.
    }

    if is_cancelled(cancellation_token) {
        return Err(ExecutionError::Cancelled);
    }

    let clean_cwd = dunce::simplified(cwd);
    let mut child = StdCommand::new(shell)
        .arg(shell_flag(shell))
        .arg(trimmed_command)
        .current_dir(clean_cwd)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| ExecutionError::Spawn {
            command: trimmed_command.to_string(),
            source: e,
        })?;

    // Non-blocking wait loop to allow for cancellation.
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                if !status.success() {
                    return Err(ExecutionError::NonZeroExitStatus {
                        command: trimmed_command.to_string(),
                        code: status.code(),
                    });
                }
                return Ok(());
            }
            Ok(None) => {
                if is_cancelled(cancellation_token) {
                    log::debug!(
                        "Cancellation requested, killing child process (PID: {})...",
                        child.id()
                    );
                    if let Err(e) = child.kill() {
                        log::warn!("Failed to kill child process {}: {}", child.id(), e);
                    }
                    child.wait().ok();
                    return Err(ExecutionError::Cancelled);
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                return Err(ExecutionError::Spawn {
                    command: trimmed_command.to_string(),
                    source: e,
                });
            }
        }
    }
}
