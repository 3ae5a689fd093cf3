//! Add-on installation into the per-user NVDA configuration.

use crate::pipeline::{
    Result,
    settings::Settings,
    utils::fs::{copy_file, ensure_non_empty},
};
use std::path::{Path, PathBuf};

/// Copies the add-on package into [`Settings::addons_dir`], creating it if needed.
pub async fn install_addon(settings: &Settings, addon: &Path) -> Result<PathBuf> {
    ensure_non_empty(addon, "add-on package")?;

    let file_name = addon.file_name().unwrap_or(addon.as_os_str());
    let dest = settings.addons_dir().join(file_name);
    copy_file(addon, &dest).await?;

    log::info!("Installed add-on to {}", dest.display());
    Ok(dest)
}
