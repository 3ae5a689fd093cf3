//! Production process launcher.

use super::{
    CommandOutput, CommandSpec, ProcessLauncher,
    tool_detection::{PKILL, SCHTASKS, TASKKILL},
};
use crate::pipeline::{Error, Result};
use std::{path::Path, process::Stdio, time::Duration};
use tokio::process::Command;

/// Upper bound for helper commands such as `taskkill` and `schtasks`.
const HELPER_TIMEOUT: Duration = Duration::from_secs(60);

/// Launches processes on the host OS.
///
/// - `terminate`: `taskkill /F /IM <image>` on Windows, `pkill -x <image>` elsewhere
/// - `run_privileged`: a transient scheduled task with highest run level (created, run once,
///   deleted) on Windows; a plain spawn elsewhere or when `schtasks` is unavailable
#[derive(Debug, Clone, Default)]
pub struct SystemLauncher;

impl SystemLauncher {
    pub fn new() -> Self {
        Self
    }

    fn command(spec: &CommandSpec) -> Command {
        let mut command = Command::new(&spec.program);
        command.args(&spec.args);
        if let Some(dir) = &spec.current_dir {
            command.current_dir(dir);
        }
        command
    }

    async fn helper(program: &Path, args: &[&str]) -> Result<CommandOutput> {
        let spec = CommandSpec::new(program).args(args.iter().copied());
        Self::run_bounded(&spec, HELPER_TIMEOUT).await
    }

    /// Runs `spec` to completion, killing it if it has not exited after `timeout`.
    async fn run_bounded(spec: &CommandSpec, timeout: Duration) -> Result<CommandOutput> {
        match tokio::time::timeout(timeout, Self.run(spec)).await {
            Ok(result) => result,
            Err(_elapsed) => {
                // Dropping the `run` future kills the child (`kill_on_drop`)
                log::warn!(
                    "{} did not exit within {}s; killed",
                    spec.display(),
                    timeout.as_secs()
                );
                Err(Error::Process {
                    command: spec.display(),
                    status: "timeout".to_string(),
                    stderr: format!("no exit after {}s", timeout.as_secs()),
                })
            }
        }
    }

    async fn schedule_once(schtasks: &Path, spec: &CommandSpec) -> Result<()> {
        let task_name = format!("nvda-portable-{}", uuid::Uuid::new_v4().simple());
        let action = spec.display();

        log::info!("Running elevated via scheduled task {}", task_name);
        log::debug!("Scheduled task action: {}", action);

        let created = Self::helper(
            schtasks,
            &[
                "/Create", "/TN", &task_name, "/TR", &action, "/SC", "ONCE", "/ST", "00:00",
                "/RL", "HIGHEST", "/F",
            ],
        )
        .await?;
        if !created.success {
            return Err(Error::Process {
                command: format!("schtasks /Create /TN {}", task_name),
                status: created.status_string(),
                stderr: created.stderr,
            });
        }

        let run = Self::helper(schtasks, &["/Run", "/TN", &task_name]).await;

        // The task has already been handed to the scheduler; deleting it does not stop it.
        match Self::helper(schtasks, &["/Delete", "/TN", &task_name, "/F"]).await {
            Ok(deleted) if !deleted.success => {
                log::warn!(
                    "Failed to delete scheduled task {}: {}",
                    task_name,
                    deleted.stderr.trim()
                );
            }
            Err(e) => log::warn!("Failed to delete scheduled task {}: {}", task_name, e),
            Ok(_) => {}
        }

        let run = run?;
        if !run.success {
            return Err(Error::Process {
                command: format!("schtasks /Run /TN {}", task_name),
                status: run.status_string(),
                stderr: run.stderr,
            });
        }
        Ok(())
    }
}

impl ProcessLauncher for SystemLauncher {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        log::debug!("Running: {}", spec.display());

        let output = Self::command(spec)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|error| Error::CommandFailed {
                command: spec.display(),
                error,
            })?;

        let result = CommandOutput {
            code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        log::debug!("{} finished with {}", spec.display(), result.status_string());
        if !result.stdout.trim().is_empty() {
            log::debug!("stdout:\n{}", result.stdout.trim_end());
        }
        if !result.stderr.trim().is_empty() {
            log::debug!("stderr:\n{}", result.stderr.trim_end());
        }

        Ok(result)
    }

    async fn spawn(&self, spec: &CommandSpec) -> Result<()> {
        log::debug!("Spawning: {}", spec.display());

        Self::command(spec)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|error| Error::CommandFailed {
                command: spec.display(),
                error,
            })?;

        Ok(())
    }

    async fn terminate(&self, image_name: &str) -> Result<()> {
        let (tool, args): (_, Vec<&str>) = if cfg!(windows) {
            (TASKKILL.as_deref(), vec!["/F", "/IM", image_name])
        } else {
            (PKILL.as_deref(), vec!["-x", image_name])
        };

        let Some(tool) = tool else {
            log::warn!("No process killer available; cannot terminate {}", image_name);
            return Ok(());
        };

        let output = Self::helper(tool, &args).await?;
        if output.success {
            log::info!("Terminated {}", image_name);
        } else {
            // taskkill exits 128 and pkill exits 1 when nothing matched
            log::debug!(
                "No running {} to terminate ({})",
                image_name,
                output.status_string()
            );
        }
        Ok(())
    }

    async fn run_privileged(&self, spec: &CommandSpec) -> Result<()> {
        match SCHTASKS.as_deref() {
            Some(schtasks) if cfg!(windows) => Self::schedule_once(schtasks, spec).await,
            _ => {
                if cfg!(windows) {
                    log::warn!("schtasks not available; starting {} directly", spec.display());
                }
                self.spawn(spec).await
            }
        }
    }
}
