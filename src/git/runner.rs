//! git::runner
//!
//! The narrow process capability the repository handle is built on:
//! `(program, args) -> (exit status, stdout, stderr)`.
//!
//! [`SystemRunner`] spawns real processes. Tests substitute
//! [`crate::git::mock::ScriptedRunner`].

use std::ffi::OsString;
use std::process::Command;

use tracing::debug;

/// Captured result of one external invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// A successful, empty result.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed result with the given exit code and stderr.
    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Stdout with trailing newlines chomped.
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim_end_matches(['\n', '\r'])
    }
}

/// Synchronous external-command capability.
///
/// Implementations block until the command exits. A spawn failure (e.g.
/// binary not found) is an `Err`; a non-zero exit is an `Ok` carrying the
/// status, so callers decide whether it is a failure.
pub trait CommandRunner: std::fmt::Debug + Send + Sync {
    fn run(&self, program: &str, args: &[String]) -> std::io::Result<CommandOutput>;
}

/// Runs commands as child processes.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    env: Vec<(OsString, OsString)>,
    removed: Vec<OsString>,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an environment variable to every spawned command.
    pub fn with_env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Remove an inherited environment variable from every spawned command.
    pub fn without_env(mut self, key: impl Into<OsString>) -> Self {
        let key = key.into();
        self.env.retain(|(k, _)| *k != key);
        self.removed.push(key);
        self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> std::io::Result<CommandOutput> {
        debug!(command = %format_command(program, args), "running");
        let mut command = Command::new(program);
        command.args(args);
        for key in &self.removed {
            command.env_remove(key);
        }
        let output = command
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .output()?;

        let result = CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if !result.success() {
            debug!(status = ?result.status, stderr = %result.stderr.trim(), "command failed");
        }
        Ok(result)
    }
}

/// Render a command line for logs and error messages.
///
/// Arguments containing whitespace or quotes are single-quoted.
pub fn format_command(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '\'' || c == '"') {
            line.push('\'');
            line.push_str(&arg.replace('\'', r"'\''"));
            line.push('\'');
        } else {
            line.push_str(arg);
        }
    }
    line
}
