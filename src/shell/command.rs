//! Blocking shell command execution with wall-clock timeouts.
//!
//! Provisioning runs external commands (`gunzip`, `tar`, `make`, `mv`)
//! that must not hang a configure run forever: every execution carries
//! a bounded timeout and expiry kills the child process. The
//! [`CommandExecutor`] trait is the seam that lets tests substitute a
//! recording fake for the real shell.

use crate::error::{BlaslinkError, Result};
use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Result of executing a shell command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    /// Standard output.
    pub stdout: String,

    /// Standard error.
    pub stderr: String,

    /// Execution duration.
    pub duration: Duration,

    /// Whether command succeeded (exit code 0).
    pub success: bool,
}

impl CommandResult {
    /// Create a success result.
    pub fn success(stdout: String, stderr: String, duration: Duration) -> Self {
        Self {
            exit_code: Some(0),
            stdout,
            stderr,
            duration,
            success: true,
        }
    }

    /// Create a failure result.
    pub fn failure(
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        duration: Duration,
    ) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
            duration,
            success: false,
        }
    }
}

/// Options for command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Working directory.
    pub cwd: Option<PathBuf>,

    /// Environment variables (merged with system env).
    pub env: HashMap<String, String>,

    /// Wall-clock timeout. None = no timeout.
    pub timeout: Option<Duration>,
}

impl CommandOptions {
    /// Options with a working directory and timeout, the common shape
    /// for provisioning steps.
    pub fn in_dir(cwd: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            cwd: Some(cwd.into()),
            env: HashMap::new(),
            timeout: Some(timeout),
        }
    }
}

/// Seam for running external commands.
///
/// Production code uses [`ShellExecutor`]; tests substitute a fake that
/// records invocations instead of spawning processes.
pub trait CommandExecutor {
    /// Run a command to completion, honoring the options' timeout.
    fn execute(&self, command: &str, options: &CommandOptions) -> Result<CommandResult>;
}

/// Runs commands through the system shell.
#[derive(Debug, Default)]
pub struct ShellExecutor;

impl ShellExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for ShellExecutor {
    fn execute(&self, command: &str, options: &CommandOptions) -> Result<CommandResult> {
        execute(command, options)
    }
}

/// Execute a shell command, killing it when the timeout expires.
pub fn execute(command: &str, options: &CommandOptions) -> Result<CommandResult> {
    let start = Instant::now();

    let shell = detect_shell();

    let mut cmd = Command::new(&shell);
    cmd.arg(shell_flag());
    cmd.arg(command);

    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }

    for (key, value) in &options.env {
        cmd.env(key, value);
    }

    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|_| BlaslinkError::CommandFailed {
        command: command.to_string(),
        code: None,
    })?;

    // Drain the pipes on their own threads; a build writing more than
    // the pipe buffer would otherwise block while we poll for exit.
    let stdout_handle = child.stdout.take().map(|mut out| {
        std::thread::spawn(move || {
            let mut buf = String::new();
            let _ = out.read_to_string(&mut buf);
            buf
        })
    });
    let stderr_handle = child.stderr.take().map(|mut err| {
        std::thread::spawn(move || {
            let mut buf = String::new();
            let _ = err.read_to_string(&mut buf);
            buf
        })
    });

    // Poll for completion so a runaway build cannot wedge the run.
    let status = loop {
        match child.try_wait()? {
            Some(status) => break status,
            None => {
                if let Some(limit) = options.timeout {
                    if start.elapsed() >= limit {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(BlaslinkError::CommandTimedOut {
                            command: command.to_string(),
                            limit_secs: limit.as_secs(),
                        });
                    }
                }
                std::thread::sleep(Duration::from_millis(50));
            }
        }
    };

    let stdout = stdout_handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default();
    let stderr = stderr_handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default();

    let duration = start.elapsed();

    if status.success() {
        Ok(CommandResult::success(stdout, stderr, duration))
    } else {
        Ok(CommandResult::failure(
            status.code(),
            stdout,
            stderr,
            duration,
        ))
    }
}

/// Execute a command and return success/failure.
pub fn execute_check(command: &str) -> bool {
    execute(command, &CommandOptions::default())
        .map(|r| r.success)
        .unwrap_or(false)
}

/// Detect the current shell.
fn detect_shell() -> String {
    if cfg!(target_os = "windows") {
        std::env::var("COMSPEC").unwrap_or_else(|_| "cmd.exe".to_string())
    } else {
        "/bin/sh".to_string()
    }
}

/// Flag used to pass a command string to the shell.
fn shell_flag() -> &'static str {
    if cfg!(target_os = "windows") {
        "/C"
    } else {
        "-c"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_successful_command() {
        let result = execute("echo hello", &CommandOptions::default()).unwrap();

        assert!(result.success);
        assert_eq!(result.exit_code, Some(0));
        assert!(result.stdout.contains("hello"));
    }

    #[test]
    fn execute_failing_command() {
        let result = execute("exit 3", &CommandOptions::default()).unwrap();

        assert!(!result.success);
        assert_eq!(result.exit_code, Some(3));
    }

    #[test]
    fn execute_with_env() {
        let mut options = CommandOptions::default();
        options
            .env
            .insert("MY_VAR".to_string(), "my_value".to_string());

        let cmd = if cfg!(target_os = "windows") {
            "echo %MY_VAR%"
        } else {
            "echo $MY_VAR"
        };

        let result = execute(cmd, &options).unwrap();

        assert!(result.success);
        assert!(result.stdout.contains("my_value"));
    }

    #[test]
    fn execute_with_cwd() {
        let temp = tempfile::TempDir::new().unwrap();
        let options = CommandOptions {
            cwd: Some(temp.path().to_path_buf()),
            ..Default::default()
        };

        let cmd = if cfg!(target_os = "windows") {
            "cd"
        } else {
            "pwd"
        };

        let result = execute(cmd, &options).unwrap();
        assert!(result.success);
    }

    #[cfg(unix)]
    #[test]
    fn execute_kills_on_timeout() {
        let options = CommandOptions {
            timeout: Some(Duration::from_millis(200)),
            ..Default::default()
        };

        let err = execute("sleep 10", &options).unwrap_err();
        assert!(matches!(err, BlaslinkError::CommandTimedOut { .. }));
    }

    #[test]
    fn execute_within_timeout_succeeds() {
        let options = CommandOptions {
            timeout: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        let result = execute("echo quick", &options).unwrap();
        assert!(result.success);
    }

    #[test]
    fn execute_check_returns_bool() {
        assert!(execute_check("exit 0"));
        assert!(!execute_check("exit 1"));
    }

    #[test]
    fn in_dir_sets_cwd_and_timeout() {
        let opts = CommandOptions::in_dir("/tmp", Duration::from_secs(30));
        assert_eq!(opts.cwd, Some(PathBuf::from("/tmp")));
        assert_eq!(opts.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn shell_executor_implements_seam() {
        let executor = ShellExecutor::new();
        let result = executor
            .execute("echo seam", &CommandOptions::default())
            .unwrap();
        assert!(result.stdout.contains("seam"));
    }

    #[test]
    fn command_result_tracks_duration() {
        let result = execute("echo fast", &CommandOptions::default()).unwrap();
        assert!(result.duration.as_millis() < 5000);
    }
}
