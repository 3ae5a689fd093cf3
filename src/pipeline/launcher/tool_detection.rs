//! External tool detection and availability checking.
//!
//! Cached lookups for the OS utilities [`SystemLauncher`](super::SystemLauncher) shells out to.

use std::{path::PathBuf, sync::LazyLock};

/// Task Scheduler CLI used to start elevated processes without a UAC prompt.
pub static SCHTASKS: LazyLock<Option<PathBuf>> = LazyLock::new(|| locate("schtasks"));

/// Process killer on Windows.
pub static TASKKILL: LazyLock<Option<PathBuf>> = LazyLock::new(|| locate("taskkill"));

/// Process killer on Unix-like hosts.
pub static PKILL: LazyLock<Option<PathBuf>> = LazyLock::new(|| locate("pkill"));

fn locate(tool: &str) -> Option<PathBuf> {
    match which::which(tool) {
        Ok(path) => {
            log::debug!("Found {} at: {}", tool, path.display());
            Some(path)
        }
        Err(e) => {
            log::debug!("{} not found in PATH: {}", tool, e);
            None
        }
    }
}
