//! Command line argument parsing.
//!
//! One subcommand per pipeline task; global options select the working directory, config
//! file, state file and output mode.

use crate::pipeline::Task;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Portable NVDA build pipeline
#[derive(Parser, Debug)]
#[command(
    name = "nvda_portable",
    version,
    about = "Builds a portable NVDA bundled with the AT Automation add-on",
    long_about = "Builds a portable NVDA bundled with the AT Automation add-on.

Each task can run on its own (one CI step per task); tasks hand results to each other
through a state file and, on GitHub Actions, the GITHUB_ENV file.

Usage:
  nvda_portable get_nvda_info
  nvda_portable get_nvda_info 2024.4.2 --json
  nvda_portable --work-dir build all

Exit code 0 = the task succeeded and every artifact it promised exists."
)]
pub struct Args {
    #[command(subcommand)]
    pub task: TaskCommand,

    /// Directory all artifacts are written to (default: current directory)
    #[arg(long, global = true, env = "NVDA_PORTABLE_WORKDIR", value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// TOML configuration file (default: <work-dir>/nvda-portable.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Step state file (default: <work-dir>/.nvda-portable/state.json)
    #[arg(long, global = true, value_name = "FILE")]
    pub state_file: Option<PathBuf>,

    /// CI env file that produced values are appended to as KEY=VALUE
    #[arg(long, global = true, env = "GITHUB_ENV", value_name = "FILE")]
    pub github_env: Option<PathBuf>,

    /// Print the step result as a JSON object on the last line of stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Fail instead of using the last known good version when discovery fails
    #[arg(long, global = true)]
    pub no_fallback: bool,

    /// Only print errors and the result line
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Pipeline tasks.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
#[command(rename_all = "snake_case")]
pub enum TaskCommand {
    /// Resolve the NVDA version and installer URL
    GetNvdaInfo {
        /// Version to use instead of the latest stable release
        version: Option<String>,
    },
    /// Download the NVDA installer
    DownloadNvdaInstaller,
    /// Fetch the AT Automation add-on sources
    GetNvdaPlugin,
    /// Package the add-on sources as at-automation.nvda-addon
    CreatePluginAddon,
    /// Install NVDA silently and locate nvda.exe
    InstallNvda,
    /// Copy the add-on into the NVDA user add-ons directory
    InstallAddon,
    /// Write nvda.ini for unattended use
    WriteNvdaConfig,
    /// Export a portable copy of the installed NVDA
    CreatePortableCopy,
    /// install_nvda, install_addon, write_nvda_config and create_portable_copy
    ConfigureNvda,
    /// Start the portable copy and check the automation server port
    TestNvda,
    /// Zip the portable copy into <version>.zip
    PackageNvda,
    /// Run every task in order
    All {
        /// Version to use instead of the latest stable release
        version: Option<String>,
    },
}

impl From<TaskCommand> for Task {
    fn from(command: TaskCommand) -> Self {
        match command {
            TaskCommand::GetNvdaInfo { version } => Task::GetNvdaInfo { version },
            TaskCommand::DownloadNvdaInstaller => Task::DownloadNvdaInstaller,
            TaskCommand::GetNvdaPlugin => Task::GetNvdaPlugin,
            TaskCommand::CreatePluginAddon => Task::CreatePluginAddon,
            TaskCommand::InstallNvda => Task::InstallNvda,
            TaskCommand::InstallAddon => Task::InstallAddon,
            TaskCommand::WriteNvdaConfig => Task::WriteNvdaConfig,
            TaskCommand::CreatePortableCopy => Task::CreatePortableCopy,
            TaskCommand::ConfigureNvda => Task::ConfigureNvda,
            TaskCommand::TestNvda => Task::TestNvda,
            TaskCommand::PackageNvda => Task::PackageNvda,
            TaskCommand::All { version } => Task::All { version },
        }
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for colored terminal output
    output: super::OutputManager,
    json: bool,
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self {
            output: super::OutputManager::new(args.quiet),
            json: args.json,
        }
    }
}

impl RuntimeConfig {
    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Whether the result line is printed as JSON
    pub fn json(&self) -> bool {
        self.json
    }
}
