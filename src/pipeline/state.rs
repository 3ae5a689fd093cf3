//! Step state shared between separately invoked pipeline tasks.
//!
//! Each task records what it produced under a [`StateKey`] in a small JSON file and mirrors
//! it as `KEY=VALUE` into the CI env file (`GITHUB_ENV`) when one is configured. Lookups fall
//! back to the process environment, so a CI job can also pre-seed values.

use crate::pipeline::{
    Error, Result,
    error::ErrorExt,
    utils::fs::is_non_empty,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tokio::io::AsyncWriteExt;

/// Values produced by pipeline steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StateKey {
    NvdaVersion,
    NvdaDownloadUrl,
    VersionFallback,
    InstallerPath,
    PluginDir,
    AddonPath,
    NvdaExecutable,
    PortablePath,
    ZipPath,
}

impl StateKey {
    /// Environment variable name, also used as the key in the state file.
    pub fn env_name(self) -> &'static str {
        match self {
            StateKey::NvdaVersion => "NVDA_VERSION",
            StateKey::NvdaDownloadUrl => "NVDA_DOWNLOAD_URL",
            StateKey::VersionFallback => "NVDA_VERSION_FALLBACK",
            StateKey::InstallerPath => "INSTALLER_PATH",
            StateKey::PluginDir => "PLUGIN_DIR",
            StateKey::AddonPath => "ADDON_PATH",
            StateKey::NvdaExecutable => "NVDA_EXECUTABLE",
            StateKey::PortablePath => "PORTABLE_PATH",
            StateKey::ZipPath => "ZIP_PATH",
        }
    }

    /// Task that produces this key.
    pub fn producer(self) -> &'static str {
        match self {
            StateKey::NvdaVersion | StateKey::NvdaDownloadUrl | StateKey::VersionFallback => {
                "get_nvda_info"
            }
            StateKey::InstallerPath => "download_nvda_installer",
            StateKey::PluginDir => "get_nvda_plugin",
            StateKey::AddonPath => "create_plugin_addon",
            StateKey::NvdaExecutable => "install_nvda",
            StateKey::PortablePath => "create_portable_copy",
            StateKey::ZipPath => "package_nvda",
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    #[serde(default)]
    values: BTreeMap<String, String>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

/// Persisted key-value state with typed accessors.
#[derive(Debug)]
pub struct PipelineState {
    path: PathBuf,
    github_env: Option<PathBuf>,
    file: StateFile,
}

impl PipelineState {
    /// Loads the state file at `path`; a missing file yields empty state.
    pub async fn load(path: impl Into<PathBuf>, github_env: Option<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StateFile::default(),
            Err(error) => {
                return Err(Error::Fs {
                    context: "reading state file",
                    path,
                    error,
                });
            }
        };

        Ok(Self {
            path,
            github_env: github_env.filter(|p| !p.as_os_str().is_empty()),
            file,
        })
    }

    /// Value recorded for `key`, falling back to the environment variable of the same name.
    pub fn get(&self, key: StateKey) -> Option<String> {
        self.file
            .values
            .get(key.env_name())
            .cloned()
            .or_else(|| std::env::var(key.env_name()).ok())
            .filter(|value| !value.is_empty())
    }

    /// Like [`get`](Self::get) but fails with the task that should have produced the value.
    pub fn require(&self, key: StateKey) -> Result<String> {
        self.get(key).ok_or(Error::MissingInput {
            key: key.env_name(),
            producer: key.producer(),
        })
    }

    /// Path recorded for `key`, which must exist and be non-empty.
    pub fn require_path(&self, key: StateKey) -> Result<PathBuf> {
        let path = PathBuf::from(self.require(key)?);
        if !is_non_empty(&path) {
            return Err(Error::NotFound {
                what: format!("{} from `{}`", key.env_name(), key.producer()),
                checked: vec![path],
            });
        }
        Ok(path)
    }

    /// Records a value, persists the state file and appends it to the CI env file.
    pub async fn set(&mut self, key: StateKey, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        if value.contains('\n') {
            return Err(Error::GenericError(format!(
                "{} value must be a single line",
                key.env_name()
            )));
        }

        log::debug!("State {}={}", key.env_name(), value);
        self.file
            .values
            .insert(key.env_name().to_string(), value.clone());
        self.file.updated_at = Some(Utc::now());
        self.save().await?;

        if let Some(github_env) = &self.github_env {
            append_env_line(github_env, key.env_name(), &value).await?;
        }
        Ok(())
    }

    async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .fs_context("creating state directory", parent)?;
        }

        let content = serde_json::to_string_pretty(&self.file)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .fs_context("writing state file", &tmp)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .fs_context("replacing state file", &self.path)?;
        Ok(())
    }
}

async fn append_env_line(env_file: &Path, key: &str, value: &str) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(env_file)
        .await
        .fs_context("opening CI env file", env_file)?;
    file.write_all(format!("{}={}\n", key, value).as_bytes())
        .await
        .fs_context("appending to CI env file", env_file)?;
    file.flush()
        .await
        .fs_context("flushing CI env file", env_file)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_values_name_their_producer() {
        let dir = tempfile::tempdir().unwrap();
        let state = PipelineState::load(dir.path().join("state.json"), None)
            .await
            .unwrap();

        let err = state.require(StateKey::PortablePath).unwrap_err();
        assert_eq!(
            err.to_string(),
            "PORTABLE_PATH is not set; run `create_portable_copy` first"
        );
    }

    #[tokio::test]
    async fn values_survive_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut state = PipelineState::load(&path, None).await.unwrap();
        state.set(StateKey::ZipPath, "/work/2024.4.2.zip").await.unwrap();
        assert!(state.set(StateKey::ZipPath, "a\nb").await.is_err());

        let reloaded = PipelineState::load(&path, None).await.unwrap();
        assert_eq!(
            reloaded.get(StateKey::ZipPath).as_deref(),
            Some("/work/2024.4.2.zip")
        );
        assert!(!path.with_extension("json.tmp").exists());
    }
}
