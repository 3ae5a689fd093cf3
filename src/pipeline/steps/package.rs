//! Portable copy packaging.

use crate::pipeline::{
    Result,
    error::ErrorExt,
    settings::Settings,
    utils::{archive::zip_directory, checksum::calculate_sha256, fs::ensure_non_empty},
};
use std::path::{Path, PathBuf};

/// The distributable archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedArchive {
    pub path: PathBuf,
    pub size: u64,
    /// Hex SHA-256 of the archive
    pub checksum: String,
    pub files: usize,
}

/// Zips `portable_dir` into [`Settings::archive_path`] for `version`.
pub async fn package_portable(
    settings: &Settings,
    portable_dir: &Path,
    version: &str,
) -> Result<PackagedArchive> {
    ensure_non_empty(portable_dir, "portable copy")?;

    let path = settings.archive_path(version);
    log::info!("Packaging {} into {}", portable_dir.display(), path.display());

    let files = zip_directory(portable_dir, &path).await?;
    let size = tokio::fs::metadata(&path)
        .await
        .fs_context("reading archive", &path)?
        .len();
    let checksum = calculate_sha256(&path).await?;

    log::info!("Created {} ({} bytes, sha256 {})", path.display(), size, checksum);
    Ok(PackagedArchive {
        path,
        size,
        checksum,
        files,
    })
}
