//! Configuration for pipeline runs.
//!
//! [`Settings`] is immutable and built through [`SettingsBuilder`], optionally seeded from a
//! TOML [`SettingsFile`].

mod builder;
mod core;
mod file;

pub use builder::SettingsBuilder;
pub use core::{Elevation, RetryPolicy, Settings};
pub use file::SettingsFile;

/// NVDA release directory listing.
pub const RELEASE_INDEX_URL: &str = "https://download.nvaccess.org/releases/";

/// Installer URL for a given `{{version}}`.
pub const DOWNLOAD_URL_TEMPLATE: &str =
    "https://download.nvaccess.org/releases/{{version}}/nvda_{{version}}.exe";

/// Version used when the release listing cannot be scraped.
pub const LAST_KNOWN_GOOD_VERSION: &str = "2024.4.2";

/// Branch archive of the AT Automation add-on sources.
pub const PLUGIN_ARCHIVE_URL: &str =
    "https://github.com/Prime-Access-Consulting/nvda-at-automation/archive/refs/heads/main.zip";

/// Port the AT Automation server listens on.
pub const AUTOMATION_PORT: u16 = 8765;
