//! AT Automation add-on retrieval and packaging.
//!
//! The add-on sources are fetched as a branch archive rather than a clone. The `NVDAPlugin`
//! subtree is located inside it, checked against the structural contract and copied to the
//! working directory; [`build_addon`] then zips that tree into an `.nvda-addon` package.

use crate::pipeline::{
    Error, Result,
    clock::Clock,
    error::ErrorExt,
    settings::Settings,
    utils::{archive, fs, http},
};
use std::path::{Path, PathBuf};

/// A packaged add-on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonPackage {
    pub path: PathBuf,
    pub size: u64,
}

/// Checks that every path in `required` exists under `root`.
///
/// All missing entries are reported together in [`Error::Structure`].
pub fn verify_plugin_structure(root: &Path, required: &[String]) -> Result<()> {
    let missing: Vec<String> = required
        .iter()
        .filter(|rel| !root.join(rel.as_str()).exists())
        .cloned()
        .collect();

    if missing.is_empty() {
        log::debug!("Add-on structure verified at {}", root.display());
        Ok(())
    } else {
        Err(Error::Structure {
            root: root.to_path_buf(),
            missing,
        })
    }
}

/// Downloads the add-on archive and installs its plugin tree at [`Settings::plugin_dir`].
///
/// Any previous copy is replaced. The staging directory is removed on return.
pub async fn fetch_plugin<C: Clock>(
    client: &reqwest::Client,
    clock: &C,
    settings: &Settings,
) -> Result<PathBuf> {
    fs::create_dir_all(settings.work_dir()).await?;
    let staging = tempfile::Builder::new()
        .prefix(".nvda-plugin-")
        .tempdir_in(settings.work_dir())
        .fs_context("creating staging directory", settings.work_dir())?;

    let archive_path = staging.path().join("plugin.zip");
    http::download_to_file(
        client,
        clock,
        settings.retry(),
        settings.plugin_archive_url(),
        &archive_path,
    )
    .await?;

    let extracted = staging.path().join("src");
    archive::extract_zip(&archive_path, &extracted).await?;

    let source = locate_plugin_root(&extracted, settings.plugin_subdir())?;
    verify_plugin_structure(&source, settings.plugin_required_paths())?;

    let plugin_dir = settings.plugin_dir();
    fs::remove_dir_all(&plugin_dir).await?;
    fs::copy_dir(&source, &plugin_dir).await?;

    log::info!("Add-on sources ready at {}", plugin_dir.display());
    Ok(plugin_dir)
}

/// Finds `subdir` at the top of the extracted archive or under its single root folder.
fn locate_plugin_root(extracted: &Path, subdir: &str) -> Result<PathBuf> {
    let direct = extracted.join(subdir);
    if direct.is_dir() {
        return Ok(direct);
    }

    let roots: Vec<PathBuf> = std::fs::read_dir(extracted)
        .fs_context("reading extracted archive", extracted)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();

    if let [root] = roots.as_slice() {
        let nested = root.join(subdir);
        if nested.is_dir() {
            return Ok(nested);
        }
    }

    Err(Error::Structure {
        root: extracted.to_path_buf(),
        missing: vec![subdir.to_string()],
    })
}

/// Packages `plugin_dir` into [`Settings::addon_path`].
///
/// The structure is checked first, so an incomplete tree never yields a package.
pub async fn build_addon(settings: &Settings, plugin_dir: &Path) -> Result<AddonPackage> {
    verify_plugin_structure(plugin_dir, settings.plugin_required_paths())?;

    let path = settings.addon_path();
    let zip_path = path.with_extension("zip");
    fs::remove_file(&path).await?;

    let files = archive::zip_directory(plugin_dir, &zip_path).await?;
    tokio::fs::rename(&zip_path, &path)
        .await
        .fs_context("renaming add-on archive", &path)?;

    let size = tokio::fs::metadata(&path)
        .await
        .fs_context("reading add-on package", &path)?
        .len();
    log::info!(
        "Packaged {} files into {} ({} bytes)",
        files,
        path.display(),
        size
    );
    Ok(AddonPackage { path, size })
}
