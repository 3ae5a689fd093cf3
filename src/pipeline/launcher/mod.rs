//! Process launching capability.
//!
//! The pipeline never touches OS-specific process tricks directly; it asks a
//! [`ProcessLauncher`] to run, spawn, terminate or elevate commands. [`SystemLauncher`] is the
//! production implementation, tests substitute a recording fake.
//!
//! # Module Organization
//!
//! - `system` - `taskkill` / `schtasks` on Windows, `pkill` / direct spawn elsewhere
//! - `tool_detection` - cached lookups of the OS tools the system launcher relies on

mod system;
mod tool_detection;

pub use system::SystemLauncher;

use crate::pipeline::Result;
use std::{
    future::Future,
    path::{Path, PathBuf},
};

/// A command line to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to run
    pub program: PathBuf,
    /// Arguments, already split
    pub args: Vec<String>,
    /// Working directory, if different from the current one
    pub current_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Single-line rendering for logs and error messages.
    pub fn display(&self) -> String {
        let mut line = quote(&self.program.display().to_string());
        for arg in &self.args {
            line.push(' ');
            line.push_str(&quote(arg));
        }
        line
    }
}

fn quote(part: &str) -> String {
    if part.contains(char::is_whitespace) {
        format!("\"{}\"", part)
    } else {
        part.to_string()
    }
}

/// Captured result of a command that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, if the process exited normally
    pub code: Option<i32>,
    /// Whether the process reported success
    pub success: bool,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl CommandOutput {
    /// Exit status description for error messages.
    pub fn status_string(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {}", code),
            None => "no exit code (terminated by signal)".to_string(),
        }
    }
}

/// Starts and stops external processes on behalf of the pipeline.
pub trait ProcessLauncher: Send + Sync {
    /// Runs a command to completion, capturing its output.
    fn run(&self, spec: &CommandSpec) -> impl Future<Output = Result<CommandOutput>> + Send;

    /// Starts a command in the background without waiting for it.
    fn spawn(&self, spec: &CommandSpec) -> impl Future<Output = Result<()>> + Send;

    /// Force-terminates every process with the given image name.
    ///
    /// Succeeds when no such process is running.
    fn terminate(&self, image_name: &str) -> impl Future<Output = Result<()>> + Send;

    /// Starts a command with elevated privileges without an interactive prompt.
    fn run_privileged(&self, spec: &CommandSpec) -> impl Future<Output = Result<()>> + Send;
}
