//! Installer download.

use crate::pipeline::{Error, Result, clock::Clock, settings::Settings, utils::http};
use std::path::PathBuf;

/// A downloaded installer on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedInstaller {
    pub path: PathBuf,
    pub size: u64,
}

/// Downloads the installer from `url` to [`Settings::installer_path`].
///
/// Fails with [`Error::Download`] on a non-2xx status or an empty body; the installer path
/// is absent afterwards in that case.
pub async fn fetch_installer<C: Clock>(
    client: &reqwest::Client,
    clock: &C,
    settings: &Settings,
    url: &str,
) -> Result<DownloadedInstaller> {
    url::Url::parse(url).map_err(|e| Error::Download {
        url: url.to_string(),
        reason: format!("invalid URL: {}", e),
    })?;

    let path = settings.installer_path();
    let size = http::download_to_file(client, clock, settings.retry(), url, &path).await?;
    Ok(DownloadedInstaller { path, size })
}
