//! TOML configuration file (`nvda-portable.toml`).

use super::Elevation;
use crate::pipeline::{Result, error::ErrorExt};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// On-disk overrides for [`SettingsBuilder`](super::SettingsBuilder).
///
/// Every field is optional; absent fields keep the builder defaults.
///
/// ```toml
/// fallback_version = "2024.4.2"
/// automation_port = 8765
/// elevation = "scheduled-task"
///
/// [timing]
/// verify_settle_secs = 20
/// portable_timeout_secs = 240
///
/// [http]
/// attempts = 5
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsFile {
    pub release_index_url: Option<String>,
    pub download_url_template: Option<String>,
    pub fallback_version: Option<String>,
    /// `false` disables the last-known-good fallback entirely
    pub allow_fallback: Option<bool>,
    pub plugin_archive_url: Option<String>,
    pub plugin_subdir: Option<String>,
    pub plugin_required_paths: Option<Vec<String>>,
    pub install_candidates: Option<Vec<PathBuf>>,
    pub user_config_dir: Option<PathBuf>,
    pub automation_port: Option<u16>,
    pub synthesizer: Option<String>,
    pub elevation: Option<Elevation>,
    pub timing: TimingSection,
    pub http: HttpSection,
}

/// `[timing]` table.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingSection {
    pub install_settle_secs: Option<u64>,
    pub terminate_settle_secs: Option<u64>,
    pub verify_settle_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub poll_interval_secs: Option<u64>,
    pub portable_timeout_secs: Option<u64>,
    pub poll_backoff: Option<f64>,
    pub max_poll_interval_secs: Option<u64>,
}

/// `[http]` table.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpSection {
    pub attempts: Option<u32>,
    pub backoff_secs: Option<u64>,
    pub max_backoff_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
}

impl SettingsFile {
    /// Reads and parses a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).fs_context("reading config file", path)?;
        let file = toml::from_str(&content)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(file)
    }
}
