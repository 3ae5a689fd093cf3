//! Command line interface for the portable NVDA pipeline.
//!
//! Parses arguments, sets up logging, builds [`Settings`] and runs one task. This is the only
//! place that turns a failed step result into a non-zero exit code.

mod args;
mod output;

pub use args::{Args, RuntimeConfig, TaskCommand};
pub use output::OutputManager;

use crate::{
    error::{CliError, PipelineError, Result},
    pipeline::{
        Pipeline, PipelineState, Settings, SettingsBuilder, SettingsFile, StepResult,
        SystemLauncher, Task, TokioClock,
    },
};
use clap::{Parser, error::ErrorKind};
use std::{ffi::OsString, path::PathBuf};

/// Config file picked up from the working directory when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "nvda-portable.toml";

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    run_from(std::env::args_os()).await
}

/// Runs the CLI with explicit arguments.
pub async fn run_from<I, T>(args: I) -> Result<i32>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = match Args::try_parse_from(args) {
        Ok(args) => args,
        Err(e) => return Ok(usage_error(e)),
    };

    init_logging(&args)?;
    let config = RuntimeConfig::from(&args);
    let task = Task::from(args.task.clone());

    let mut pipeline = match prepare(&args).await {
        Ok(pipeline) => pipeline,
        Err(e) => {
            log::error!("Cannot start {}: {}", task.name(), e);
            let result = StepResult::failed(e.to_string(), e.kind());
            report(&config, &task, &result)?;
            return Ok(1);
        }
    };

    config.output().section(task.name())?;
    let result = pipeline.execute(&task).await;
    report(&config, &task, &result)?;

    Ok(if result.success { 0 } else { 1 })
}

/// Prints a clap error; help and version exit 0, everything else is a usage error.
fn usage_error(error: clap::Error) -> i32 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = error.print();
            0
        }
        _ => {
            let _ = error.print();
            eprintln!("\nAvailable tasks: {}", Task::NAMES.join(", "));
            1
        }
    }
}

fn init_logging(args: &Args) -> Result<()> {
    let default_filter = if args.quiet { "warn" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));

    if let Some(path) = &args.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|error| CliError::LogFile {
                path: path.display().to_string(),
                error,
            })?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    } else {
        builder.target(env_logger::Target::Stderr);
    }

    // A logger installed earlier in the same process stays in place
    let _ = builder.try_init();
    Ok(())
}

/// Builds settings from the working directory, config file and flags.
pub fn build_settings(args: &Args) -> Result<Settings> {
    let work_dir = match &args.work_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };

    let config_path = match &args.config {
        Some(path) if !path.is_file() => {
            return Err(CliError::InvalidArguments {
                reason: format!("config file {} does not exist", path.display()),
            }
            .into());
        }
        Some(path) => Some(path.clone()),
        None => Some(work_dir.join(CONFIG_FILE_NAME)).filter(|path| path.is_file()),
    };

    let mut builder = SettingsBuilder::new().work_dir(&work_dir);
    if let Some(path) = config_path {
        builder = builder.apply_file(SettingsFile::load(&path)?);
    }
    if args.no_fallback {
        builder = builder.fallback_version(None);
    }
    Ok(builder.build()?)
}

async fn prepare(args: &Args) -> Result<Pipeline<SystemLauncher, TokioClock>> {
    let settings = build_settings(args)?;
    let state_path: PathBuf = args
        .state_file
        .clone()
        .unwrap_or_else(|| settings.default_state_path());
    log::debug!("Using state file {}", state_path.display());

    let state = PipelineState::load(state_path, args.github_env.clone()).await?;
    Pipeline::new(settings, SystemLauncher::new(), TokioClock::new(), state)
        .map_err(PipelineError::from)
}

fn report(config: &RuntimeConfig, task: &Task, result: &StepResult) -> Result<()> {
    let output = config.output();

    if result.get("fallback").and_then(|v| v.as_bool()) == Some(true) {
        let reason = result
            .get("fallback_reason")
            .and_then(|v| v.as_str())
            .unwrap_or("version discovery failed");
        let version = result.get("version").and_then(|v| v.as_str()).unwrap_or("?");
        output.annotation(
            "warning",
            "NVDA version fallback",
            &format!("Using last known good NVDA {}: {}", version, reason),
        )?;
        output.warn(&format!("Using fallback NVDA version {}", version))?;
    }

    if result.success {
        output.success(&format!("{} completed", task.name()))?;
        for (key, value) in &result.fields {
            let value = value
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string());
            output.indent(&format!("{}: {}", key, value))?;
        }
    } else {
        let message = result.error.as_deref().unwrap_or("unknown error");
        output.error(&format!("{} failed: {}", task.name(), message))?;
        if let Some(kind) = &result.error_kind {
            output.progress(&format!("error kind: {}", kind))?;
        }
    }

    if config.json() {
        output.line(&result.to_json_line())?;
    }
    Ok(())
}
