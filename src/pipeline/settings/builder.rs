//! Builder for constructing Settings.

use super::{
    AUTOMATION_PORT, DOWNLOAD_URL_TEMPLATE, Elevation, LAST_KNOWN_GOOD_VERSION,
    PLUGIN_ARCHIVE_URL, RELEASE_INDEX_URL, RetryPolicy, Settings, SettingsFile,
    core::install_candidates_from,
};
use crate::pipeline::{
    Error, Result,
    clock::PollPolicy,
    error::Context,
};
use path_absolutize::Absolutize;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Builder for constructing [`Settings`].
///
/// Every field has a production default; tests and config files override what they need.
///
/// # Examples
///
/// ```no_run
/// use nvda_portable_builder::pipeline::SettingsBuilder;
/// use std::time::Duration;
///
/// # fn example() -> nvda_portable_builder::pipeline::Result<()> {
/// let settings = SettingsBuilder::new()
///     .work_dir("build")
///     .automation_port(8765)
///     .verify_settle(Duration::from_secs(20))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SettingsBuilder {
    work_dir: Option<PathBuf>,
    release_index_url: String,
    download_url_template: String,
    fallback_version: Option<String>,
    plugin_archive_url: String,
    plugin_subdir: String,
    plugin_required_paths: Vec<String>,
    plugin_dir_name: String,
    installer_file_name: String,
    addon_file_name: String,
    executable_name: String,
    install_candidates: Option<Vec<PathBuf>>,
    user_config_dir: Option<PathBuf>,
    automation_port: u16,
    synthesizer: String,
    install_settle: Duration,
    terminate_settle: Duration,
    verify_settle: Duration,
    connect_timeout: Duration,
    http_timeout: Duration,
    portable_poll: PollPolicy,
    retry: RetryPolicy,
    elevation: Elevation,
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self {
            work_dir: None,
            release_index_url: RELEASE_INDEX_URL.to_string(),
            download_url_template: DOWNLOAD_URL_TEMPLATE.to_string(),
            fallback_version: Some(LAST_KNOWN_GOOD_VERSION.to_string()),
            plugin_archive_url: PLUGIN_ARCHIVE_URL.to_string(),
            plugin_subdir: "NVDAPlugin".to_string(),
            plugin_required_paths: vec![
                "manifest.ini".to_string(),
                "globalPlugins".to_string(),
                "synthDrivers".to_string(),
            ],
            plugin_dir_name: "NVDAPlugin".to_string(),
            installer_file_name: "nvda_installer.exe".to_string(),
            addon_file_name: "at-automation.nvda-addon".to_string(),
            executable_name: "nvda.exe".to_string(),
            install_candidates: None,
            user_config_dir: None,
            automation_port: AUTOMATION_PORT,
            synthesizer: "captureSpeech".to_string(),
            install_settle: Duration::from_secs(10),
            terminate_settle: Duration::from_secs(2),
            verify_settle: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(5),
            http_timeout: Duration::from_secs(300),
            portable_poll: PollPolicy::fixed(Duration::from_secs(2), Duration::from_secs(180)),
            retry: RetryPolicy::default(),
            elevation: Elevation::default(),
        }
    }
}

impl SettingsBuilder {
    /// Creates a new settings builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the working directory. Default: the current directory.
    pub fn work_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.work_dir = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn release_index_url(mut self, url: impl Into<String>) -> Self {
        self.release_index_url = url.into();
        self
    }

    /// Sets the installer URL template; it must contain `{{version}}`.
    pub fn download_url_template(mut self, template: impl Into<String>) -> Self {
        self.download_url_template = template.into();
        self
    }

    /// Sets the last-known-good version; `None` makes resolution failures terminal.
    pub fn fallback_version(mut self, version: Option<String>) -> Self {
        self.fallback_version = version;
        self
    }

    pub fn plugin_archive_url(mut self, url: impl Into<String>) -> Self {
        self.plugin_archive_url = url.into();
        self
    }

    pub fn plugin_subdir(mut self, subdir: impl Into<String>) -> Self {
        self.plugin_subdir = subdir.into();
        self
    }

    pub fn plugin_required_paths(mut self, paths: Vec<String>) -> Self {
        self.plugin_required_paths = paths;
        self
    }

    /// Overrides the install-location candidates. Default: derived from `ProgramFiles*`.
    pub fn install_candidates(mut self, candidates: Vec<PathBuf>) -> Self {
        self.install_candidates = Some(candidates);
        self
    }

    /// Overrides the NVDA user config directory. Default: `%APPDATA%\nvda`.
    pub fn user_config_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.user_config_dir = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn automation_port(mut self, port: u16) -> Self {
        self.automation_port = port;
        self
    }

    pub fn synthesizer(mut self, synth: impl Into<String>) -> Self {
        self.synthesizer = synth.into();
        self
    }

    pub fn install_settle(mut self, duration: Duration) -> Self {
        self.install_settle = duration;
        self
    }

    pub fn terminate_settle(mut self, duration: Duration) -> Self {
        self.terminate_settle = duration;
        self
    }

    pub fn verify_settle(mut self, duration: Duration) -> Self {
        self.verify_settle = duration;
        self
    }

    pub fn connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = duration;
        self
    }

    pub fn http_timeout(mut self, duration: Duration) -> Self {
        self.http_timeout = duration;
        self
    }

    pub fn portable_poll(mut self, policy: PollPolicy) -> Self {
        self.portable_poll = policy;
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn elevation(mut self, elevation: Elevation) -> Self {
        self.elevation = elevation;
        self
    }

    /// Applies every value present in a parsed config file.
    pub fn apply_file(mut self, file: SettingsFile) -> Self {
        if let Some(url) = file.release_index_url {
            self.release_index_url = url;
        }
        if let Some(template) = file.download_url_template {
            self.download_url_template = template;
        }
        if let Some(version) = file.fallback_version {
            self.fallback_version = Some(version);
        }
        if file.allow_fallback == Some(false) {
            self.fallback_version = None;
        }
        if let Some(url) = file.plugin_archive_url {
            self.plugin_archive_url = url;
        }
        if let Some(subdir) = file.plugin_subdir {
            self.plugin_subdir = subdir;
        }
        if let Some(paths) = file.plugin_required_paths {
            self.plugin_required_paths = paths;
        }
        if let Some(dirs) = file.install_candidates {
            self.install_candidates = Some(dirs);
        }
        if let Some(dir) = file.user_config_dir {
            self.user_config_dir = Some(dir);
        }
        if let Some(port) = file.automation_port {
            self.automation_port = port;
        }
        if let Some(synth) = file.synthesizer {
            self.synthesizer = synth;
        }
        if let Some(elevation) = file.elevation {
            self.elevation = elevation;
        }

        let timing = file.timing;
        let secs = Duration::from_secs;
        if let Some(s) = timing.install_settle_secs {
            self.install_settle = secs(s);
        }
        if let Some(s) = timing.terminate_settle_secs {
            self.terminate_settle = secs(s);
        }
        if let Some(s) = timing.verify_settle_secs {
            self.verify_settle = secs(s);
        }
        if let Some(s) = timing.connect_timeout_secs {
            self.connect_timeout = secs(s);
        }
        if let Some(s) = timing.poll_interval_secs {
            self.portable_poll.interval = secs(s);
            self.portable_poll.max_interval = self.portable_poll.max_interval.max(secs(s));
        }
        if let Some(s) = timing.portable_timeout_secs {
            self.portable_poll.timeout = secs(s);
        }
        if let Some(factor) = timing.poll_backoff {
            self.portable_poll.backoff = factor;
        }
        if let Some(s) = timing.max_poll_interval_secs {
            self.portable_poll.max_interval = secs(s);
        }

        let http = file.http;
        if let Some(attempts) = http.attempts {
            self.retry.attempts = attempts;
        }
        if let Some(s) = http.backoff_secs {
            self.retry.initial_backoff = secs(s);
        }
        if let Some(s) = http.max_backoff_secs {
            self.retry.max_backoff = secs(s);
        }
        if let Some(s) = http.timeout_secs {
            self.http_timeout = secs(s);
        }
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the working directory cannot be made absolute, the URL template
    /// lacks a `{{version}}` placeholder, or the retry / poll policies are unusable.
    pub fn build(self) -> Result<Settings> {
        let work_dir = match self.work_dir {
            Some(dir) => dir,
            None => std::env::current_dir().context("reading current directory")?,
        };
        let work_dir = work_dir
            .absolutize()
            .context("resolving working directory")?
            .into_owned();

        if !self.download_url_template.contains("{{version}}") {
            return Err(Error::Settings(format!(
                "download URL template has no {{{{version}}}} placeholder: {}",
                self.download_url_template
            )));
        }
        if self.retry.attempts == 0 {
            return Err(Error::Settings(
                "HTTP attempts must be at least 1".into(),
            ));
        }
        if self.portable_poll.interval.is_zero() {
            return Err(Error::Settings(
                "portable poll interval must be greater than zero".into(),
            ));
        }
        let backoff = self.portable_poll.backoff;
        if !backoff.is_finite() || backoff < 1.0 {
            return Err(Error::Settings(format!(
                "poll backoff must be a finite number of at least 1.0, got {}",
                backoff
            )));
        }

        let install_candidates = self.install_candidates.unwrap_or_else(|| {
            install_candidates_from(|key| std::env::var(key).ok(), &self.executable_name)
        });

        let user_config_dir = self
            .user_config_dir
            .or_else(|| std::env::var_os("APPDATA").map(|dir| PathBuf::from(dir).join("nvda")))
            .or_else(|| dirs::config_dir().map(|dir| dir.join("nvda")))
            .context("cannot determine the NVDA user config directory; set APPDATA")?;

        Ok(Settings {
            work_dir,
            release_index_url: self.release_index_url,
            download_url_template: self.download_url_template,
            fallback_version: self.fallback_version,
            plugin_archive_url: self.plugin_archive_url,
            plugin_subdir: self.plugin_subdir,
            plugin_required_paths: self.plugin_required_paths,
            plugin_dir_name: self.plugin_dir_name,
            installer_file_name: self.installer_file_name,
            addon_file_name: self.addon_file_name,
            executable_name: self.executable_name,
            install_candidates,
            user_config_dir,
            automation_port: self.automation_port,
            synthesizer: self.synthesizer,
            install_settle: self.install_settle,
            terminate_settle: self.terminate_settle,
            verify_settle: self.verify_settle,
            connect_timeout: self.connect_timeout,
            http_timeout: self.http_timeout,
            portable_poll: self.portable_poll,
            retry: self.retry,
            elevation: self.elevation,
        })
    }
}
