//! Silent installation and executable discovery.

use crate::pipeline::{
    Error, Result,
    clock::Clock,
    launcher::{CommandSpec, ProcessLauncher},
    settings::Settings,
    utils::fs::{ensure_non_empty, is_non_empty},
};
use std::path::{Path, PathBuf};

/// Runs the installer silently and returns the installed executable.
///
/// NVDA starts itself after installing, so the running instance is terminated once the
/// install settle time has passed.
pub async fn install_nvda<L, C>(
    launcher: &L,
    clock: &C,
    settings: &Settings,
    installer: &Path,
) -> Result<PathBuf>
where
    L: ProcessLauncher,
    C: Clock,
{
    ensure_non_empty(installer, "NVDA installer")?;

    let spec = CommandSpec::new(installer).args(["--install", "--silent"]);
    log::info!("Installing NVDA: {}", spec.display());

    let output = launcher.run(&spec).await?;
    if !output.success {
        return Err(Error::Process {
            command: spec.display(),
            status: output.status_string(),
            stderr: output.stderr.trim().to_string(),
        });
    }

    clock.sleep(settings.install_settle()).await;
    launcher.terminate(settings.executable_name()).await?;
    clock.sleep(settings.terminate_settle()).await;

    resolve_executable(settings.install_candidates())
}

/// Returns the first candidate that exists as a non-empty file.
///
/// Fails with [`Error::NotFound`] listing every candidate in order.
pub fn resolve_executable(candidates: &[PathBuf]) -> Result<PathBuf> {
    for candidate in candidates {
        log::debug!("Checking for NVDA at {}", candidate.display());
        if candidate.is_file() && is_non_empty(candidate) {
            log::info!("Found NVDA at {}", candidate.display());
            return Ok(candidate.clone());
        }
    }

    Err(Error::NotFound {
        what: "NVDA executable".to_string(),
        checked: candidates.to_vec(),
    })
}
