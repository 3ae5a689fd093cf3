//! Core Settings struct and implementations.

use crate::pipeline::clock::PollPolicy;
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// How the portable export is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Elevation {
    /// Spawn the application directly from the pipeline process
    Direct,
    /// Go through the privileged launcher (a transient scheduled task on Windows)
    #[default]
    ScheduledTask,
}

/// Retry behaviour for HTTP requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first
    pub attempts: u32,
    /// Delay after the first failed attempt
    pub initial_backoff: Duration,
    /// Upper bound for any single delay
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Main settings for pipeline runs.
///
/// Constructed via [`SettingsBuilder`](super::SettingsBuilder). Every artifact path the
/// pipeline promises is derived from here, so steps agree on locations without sharing
/// in-process state.
#[derive(Clone, Debug)]
pub struct Settings {
    pub(super) work_dir: PathBuf,
    pub(super) release_index_url: String,
    pub(super) download_url_template: String,
    pub(super) fallback_version: Option<String>,
    pub(super) plugin_archive_url: String,
    pub(super) plugin_subdir: String,
    pub(super) plugin_required_paths: Vec<String>,
    pub(super) plugin_dir_name: String,
    pub(super) installer_file_name: String,
    pub(super) addon_file_name: String,
    pub(super) executable_name: String,
    pub(super) install_candidates: Vec<PathBuf>,
    pub(super) user_config_dir: PathBuf,
    pub(super) automation_port: u16,
    pub(super) synthesizer: String,
    pub(super) install_settle: Duration,
    pub(super) terminate_settle: Duration,
    pub(super) verify_settle: Duration,
    pub(super) connect_timeout: Duration,
    pub(super) http_timeout: Duration,
    pub(super) portable_poll: PollPolicy,
    pub(super) retry: RetryPolicy,
    pub(super) elevation: Elevation,
}

impl Settings {
    /// Directory every artifact is written to.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn release_index_url(&self) -> &str {
        &self.release_index_url
    }

    /// Handlebars template with a `{{version}}` placeholder.
    pub fn download_url_template(&self) -> &str {
        &self.download_url_template
    }

    /// Last-known-good version, or `None` when resolution failures must be terminal.
    pub fn fallback_version(&self) -> Option<&str> {
        self.fallback_version.as_deref()
    }

    pub fn plugin_archive_url(&self) -> &str {
        &self.plugin_archive_url
    }

    /// Directory inside the fetched archive that holds the add-on.
    pub fn plugin_subdir(&self) -> &str {
        &self.plugin_subdir
    }

    /// Paths, relative to the add-on root, that must exist for the bundle to be usable.
    pub fn plugin_required_paths(&self) -> &[String] {
        &self.plugin_required_paths
    }

    /// Image name of the application, e.g. `nvda.exe`.
    pub fn executable_name(&self) -> &str {
        &self.executable_name
    }

    /// Ordered list of locations where the installed executable may live.
    pub fn install_candidates(&self) -> &[PathBuf] {
        &self.install_candidates
    }

    /// Per-user NVDA configuration directory (`%APPDATA%\nvda`).
    pub fn user_config_dir(&self) -> &Path {
        &self.user_config_dir
    }

    pub fn automation_port(&self) -> u16 {
        self.automation_port
    }

    /// Synthesizer written into `nvda.ini`.
    pub fn synthesizer(&self) -> &str {
        &self.synthesizer
    }

    pub fn install_settle(&self) -> Duration {
        self.install_settle
    }

    pub fn terminate_settle(&self) -> Duration {
        self.terminate_settle
    }

    pub fn verify_settle(&self) -> Duration {
        self.verify_settle
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn http_timeout(&self) -> Duration {
        self.http_timeout
    }

    pub fn portable_poll(&self) -> &PollPolicy {
        &self.portable_poll
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn elevation(&self) -> Elevation {
        self.elevation
    }

    /// `<work_dir>/nvda_installer.exe`
    pub fn installer_path(&self) -> PathBuf {
        self.work_dir.join(&self.installer_file_name)
    }

    /// `<work_dir>/NVDAPlugin`
    pub fn plugin_dir(&self) -> PathBuf {
        self.work_dir.join(&self.plugin_dir_name)
    }

    /// `<work_dir>/at-automation.nvda-addon`
    pub fn addon_path(&self) -> PathBuf {
        self.work_dir.join(&self.addon_file_name)
    }

    /// `<user_config_dir>/addons`
    pub fn addons_dir(&self) -> PathBuf {
        self.user_config_dir.join("addons")
    }

    /// `<user_config_dir>/nvda.ini`
    pub fn nvda_ini_path(&self) -> PathBuf {
        self.user_config_dir.join("nvda.ini")
    }

    /// `<work_dir>/nvda_<version>_portable`
    pub fn portable_dir(&self, version: &str) -> PathBuf {
        self.work_dir.join(format!("nvda_{}_portable", version))
    }

    /// `<work_dir>/<version>.zip`
    pub fn archive_path(&self, version: &str) -> PathBuf {
        self.work_dir.join(format!("{}.zip", version))
    }

    /// `<work_dir>/.nvda-portable/state.json`
    pub fn default_state_path(&self) -> PathBuf {
        self.work_dir.join(".nvda-portable").join("state.json")
    }
}

/// Builds the ordered install-location candidates from the environment.
///
/// 32-bit program files come first (NVDA installs there on 64-bit Windows), followed by the
/// native directory and the literal default spellings. Duplicates are dropped.
pub fn install_candidates_from<F>(lookup: F, executable_name: &str) -> Vec<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    let roots = [
        lookup("ProgramFiles(x86)"),
        lookup("ProgramFiles"),
        Some(r"C:\Program Files (x86)".to_string()),
        Some(r"C:\Program Files".to_string()),
    ];

    let mut candidates: Vec<PathBuf> = Vec::new();
    for root in roots.into_iter().flatten() {
        if root.trim().is_empty() {
            continue;
        }
        let candidate = PathBuf::from(root).join("NVDA").join(executable_name);
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates
}
