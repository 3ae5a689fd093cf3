//! Individual pipeline steps.
//!
//! Each step is a free function over [`Settings`](crate::pipeline::Settings) plus whatever
//! capabilities it needs (HTTP client, [`Clock`](crate::pipeline::Clock),
//! [`ProcessLauncher`](crate::pipeline::ProcessLauncher)). Steps know nothing about persisted
//! state; the [`Pipeline`](crate::pipeline::Pipeline) wires their inputs and outputs.

pub mod addon;
pub mod addon_install;
pub mod config;
pub mod install;
pub mod installer;
pub mod package;
pub mod portable;
pub mod verify;
pub mod version;

pub use addon::{AddonPackage, build_addon, fetch_plugin, verify_plugin_structure};
pub use addon_install::install_addon;
pub use config::{render_nvda_ini, write_nvda_config};
pub use install::{install_nvda, resolve_executable};
pub use installer::{DownloadedInstaller, fetch_installer};
pub use package::{PackagedArchive, package_portable};
pub use portable::{PortableCopy, PortableState, create_portable_copy};
pub use verify::{Verification, probe_port, verify_portable};
pub use version::{NvdaVersion, Resolution, VersionSource, download_url, parse_latest_version, resolve};
