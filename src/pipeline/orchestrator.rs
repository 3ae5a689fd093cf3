//! Task orchestration.
//!
//! [`Pipeline`] maps each CLI task onto its step, reads the inputs earlier tasks recorded in
//! [`PipelineState`] and records what the step produced.

use crate::pipeline::{
    Error, Result, StepResult,
    clock::Clock,
    error::Context,
    launcher::ProcessLauncher,
    settings::Settings,
    state::{PipelineState, StateKey},
    steps,
    utils::{fs::is_non_empty, http},
};
use std::path::PathBuf;

/// A pipeline task as invoked from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    GetNvdaInfo { version: Option<String> },
    DownloadNvdaInstaller,
    GetNvdaPlugin,
    CreatePluginAddon,
    InstallNvda,
    InstallAddon,
    WriteNvdaConfig,
    CreatePortableCopy,
    /// Install, add-on, configuration and portable copy in one go
    ConfigureNvda,
    TestNvda,
    PackageNvda,
    /// Every step in order
    All { version: Option<String> },
}

impl Task {
    /// Every task name, in pipeline order.
    pub const NAMES: &'static [&'static str] = &[
        "get_nvda_info",
        "download_nvda_installer",
        "get_nvda_plugin",
        "create_plugin_addon",
        "install_nvda",
        "install_addon",
        "write_nvda_config",
        "create_portable_copy",
        "configure_nvda",
        "test_nvda",
        "package_nvda",
        "all",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Task::GetNvdaInfo { .. } => "get_nvda_info",
            Task::DownloadNvdaInstaller => "download_nvda_installer",
            Task::GetNvdaPlugin => "get_nvda_plugin",
            Task::CreatePluginAddon => "create_plugin_addon",
            Task::InstallNvda => "install_nvda",
            Task::InstallAddon => "install_addon",
            Task::WriteNvdaConfig => "write_nvda_config",
            Task::CreatePortableCopy => "create_portable_copy",
            Task::ConfigureNvda => "configure_nvda",
            Task::TestNvda => "test_nvda",
            Task::PackageNvda => "package_nvda",
            Task::All { .. } => "all",
        }
    }
}

/// Runs pipeline tasks against one working directory.
///
/// Generic over the [`ProcessLauncher`] and [`Clock`] so that tests can substitute a
/// recording launcher and virtual time.
pub struct Pipeline<L, C> {
    settings: Settings,
    launcher: L,
    clock: C,
    client: reqwest::Client,
    state: PipelineState,
}

impl<L, C> std::fmt::Debug for Pipeline<L, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("settings", &self.settings)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

fn display(path: &std::path::Path) -> String {
    path.display().to_string()
}

impl<L: ProcessLauncher, C: Clock> Pipeline<L, C> {
    pub fn new(settings: Settings, launcher: L, clock: C, state: PipelineState) -> Result<Self> {
        let client = http::client(settings.http_timeout())?;
        Ok(Self {
            settings,
            launcher,
            clock,
            client,
            state,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Runs `task`, converting any failure into a failed [`StepResult`].
    pub async fn execute(&mut self, task: &Task) -> StepResult {
        log::info!("Running task {}", task.name());

        match self.run(task).await {
            Ok(result) => {
                log::info!("Task {} succeeded", task.name());
                result
            }
            Err(e) => {
                log::error!("Task {} failed: {}", task.name(), e);
                StepResult::failure(&e)
            }
        }
    }

    async fn run(&mut self, task: &Task) -> Result<StepResult> {
        match task {
            Task::GetNvdaInfo { version } => self.get_nvda_info(version.as_deref()).await,
            Task::DownloadNvdaInstaller => self.download_nvda_installer().await,
            Task::GetNvdaPlugin => self.get_nvda_plugin().await,
            Task::CreatePluginAddon => self.create_plugin_addon().await,
            Task::InstallNvda => self.install_nvda().await,
            Task::InstallAddon => self.install_addon().await,
            Task::WriteNvdaConfig => self.write_nvda_config().await,
            Task::CreatePortableCopy => self.create_portable_copy().await,
            Task::ConfigureNvda => self.configure_nvda().await,
            Task::TestNvda => self.test_nvda().await,
            Task::PackageNvda => self.package_nvda().await,
            Task::All { version } => self.all(version.as_deref()).await,
        }
    }

    /// Resolves the version and installer URL.
    pub async fn get_nvda_info(&mut self, version: Option<&str>) -> Result<StepResult> {
        let resolution =
            steps::resolve(&self.client, &self.clock, &self.settings, version).await?;
        let fallback = resolution.source.is_fallback();

        self.state
            .set(StateKey::NvdaVersion, resolution.version.as_str())
            .await?;
        self.state
            .set(StateKey::NvdaDownloadUrl, resolution.url.as_str())
            .await?;
        self.state
            .set(StateKey::VersionFallback, fallback.to_string())
            .await?;

        let mut result = StepResult::ok()
            .with("version", resolution.version.as_str())
            .with("url", resolution.url.as_str())
            .with("source", resolution.source.name())
            .with("fallback", fallback);
        if let steps::VersionSource::Fallback(reason) = resolution.source {
            result = result.with("fallback_reason", reason);
        }
        Ok(result)
    }

    pub async fn download_nvda_installer(&mut self) -> Result<StepResult> {
        let url = self.state.require(StateKey::NvdaDownloadUrl)?;
        let installer =
            steps::fetch_installer(&self.client, &self.clock, &self.settings, &url).await?;

        self.state
            .set(StateKey::InstallerPath, display(&installer.path))
            .await?;
        Ok(StepResult::ok()
            .with("installer_path", display(&installer.path))
            .with("size", installer.size))
    }

    pub async fn get_nvda_plugin(&mut self) -> Result<StepResult> {
        let plugin_dir = steps::fetch_plugin(&self.client, &self.clock, &self.settings).await?;

        self.state
            .set(StateKey::PluginDir, display(&plugin_dir))
            .await?;
        Ok(StepResult::ok().with("plugin_dir", display(&plugin_dir)))
    }

    pub async fn create_plugin_addon(&mut self) -> Result<StepResult> {
        let plugin_dir = self.input_path(StateKey::PluginDir, self.settings.plugin_dir())?;
        let package = steps::build_addon(&self.settings, &plugin_dir).await?;

        self.state
            .set(StateKey::AddonPath, display(&package.path))
            .await?;
        Ok(StepResult::ok()
            .with("addon_path", display(&package.path))
            .with("size", package.size))
    }

    pub async fn install_nvda(&mut self) -> Result<StepResult> {
        let installer = self.input_path(StateKey::InstallerPath, self.settings.installer_path())?;
        let executable =
            steps::install_nvda(&self.launcher, &self.clock, &self.settings, &installer).await?;

        self.state
            .set(StateKey::NvdaExecutable, display(&executable))
            .await?;
        Ok(StepResult::ok().with("nvda_executable", display(&executable)))
    }

    pub async fn install_addon(&mut self) -> Result<StepResult> {
        let addon = self.input_path(StateKey::AddonPath, self.settings.addon_path())?;
        let installed = steps::install_addon(&self.settings, &addon).await?;
        Ok(StepResult::ok().with("addon_installed", display(&installed)))
    }

    pub async fn write_nvda_config(&mut self) -> Result<StepResult> {
        let path = steps::write_nvda_config(&self.settings).await?;
        Ok(StepResult::ok().with("config_path", display(&path)))
    }

    pub async fn create_portable_copy(&mut self) -> Result<StepResult> {
        let version = self.state.require(StateKey::NvdaVersion)?;
        let executable = match self.state.get(StateKey::NvdaExecutable) {
            Some(_) => self.state.require_path(StateKey::NvdaExecutable)?,
            None => steps::resolve_executable(self.settings.install_candidates())?,
        };

        let copy = steps::create_portable_copy(
            &self.launcher,
            &self.clock,
            &self.settings,
            &executable,
            &version,
        )
        .await?;

        self.state
            .set(StateKey::PortablePath, display(&copy.dir))
            .await?;
        Ok(StepResult::ok()
            .with("portable_path", display(&copy.dir))
            .with("elapsed_secs", copy.elapsed.as_secs())
            .with("attempts", copy.attempts))
    }

    /// `install_nvda` → `install_addon` → `write_nvda_config` → `create_portable_copy`
    pub async fn configure_nvda(&mut self) -> Result<StepResult> {
        let mut result = StepResult::ok();
        result.merge(self.install_nvda().await.context("install_nvda")?);
        result.merge(self.install_addon().await.context("install_addon")?);
        result.merge(self.write_nvda_config().await.context("write_nvda_config")?);
        result.merge(
            self.create_portable_copy()
                .await
                .context("create_portable_copy")?,
        );
        Ok(result)
    }

    /// Fails with [`Error::Unreachable`] when the automation server does not answer.
    pub async fn test_nvda(&mut self) -> Result<StepResult> {
        let portable_dir = self.portable_dir()?;
        let verification =
            steps::verify_portable(&self.launcher, &self.clock, &self.settings, &portable_dir)
                .await?;

        if !verification.reachable {
            return Err(Error::Unreachable {
                address: verification.address.to_string(),
            });
        }
        Ok(StepResult::ok()
            .with("reachable", true)
            .with("address", verification.address.to_string()))
    }

    pub async fn package_nvda(&mut self) -> Result<StepResult> {
        let version = self.state.require(StateKey::NvdaVersion)?;
        let portable_dir = self.portable_dir()?;
        let archive = steps::package_portable(&self.settings, &portable_dir, &version).await?;

        self.state
            .set(StateKey::ZipPath, display(&archive.path))
            .await?;
        Ok(StepResult::ok()
            .with("zip_path", display(&archive.path))
            .with("size", archive.size)
            .with("sha256", archive.checksum)
            .with("files", archive.files))
    }

    /// Runs the whole pipeline, stopping at the first failing task.
    pub async fn all(&mut self, version: Option<&str>) -> Result<StepResult> {
        let mut result = StepResult::ok();
        result.merge(self.get_nvda_info(version).await.context("get_nvda_info")?);
        result.merge(
            self.download_nvda_installer()
                .await
                .context("download_nvda_installer")?,
        );
        result.merge(self.get_nvda_plugin().await.context("get_nvda_plugin")?);
        result.merge(
            self.create_plugin_addon()
                .await
                .context("create_plugin_addon")?,
        );
        result.merge(self.configure_nvda().await?);
        result.merge(self.test_nvda().await.context("test_nvda")?);
        result.merge(self.package_nvda().await.context("package_nvda")?);
        Ok(result)
    }

    /// Path recorded under `key`, or the conventional location when it already holds content.
    fn input_path(&self, key: StateKey, conventional: PathBuf) -> Result<PathBuf> {
        if self.state.get(key).is_some() {
            return self.state.require_path(key);
        }
        if is_non_empty(&conventional) {
            log::debug!(
                "{} not recorded; using {}",
                key.env_name(),
                conventional.display()
            );
            return Ok(conventional);
        }
        Err(Error::MissingInput {
            key: key.env_name(),
            producer: key.producer(),
        })
    }

    fn portable_dir(&self) -> Result<PathBuf> {
        if self.state.get(StateKey::PortablePath).is_some() {
            return self.state.require_path(StateKey::PortablePath);
        }
        let version = self.state.require(StateKey::NvdaVersion)?;
        self.input_path(
            StateKey::PortablePath,
            self.settings.portable_dir(&version),
        )
    }
}
