//! Portable copy verification.
//!
//! Starts the portable copy in minimal mode and checks that the AT Automation server accepts
//! a TCP connection on the loopback interface.

use crate::pipeline::{
    Result,
    clock::Clock,
    launcher::{CommandSpec, ProcessLauncher},
    settings::Settings,
    utils::fs::ensure_non_empty,
};
use std::{
    net::{Ipv4Addr, SocketAddr},
    path::Path,
    time::Duration,
};
use tokio::net::TcpStream;

/// Outcome of a verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verification {
    pub reachable: bool,
    pub address: SocketAddr,
}

/// Attempts a single TCP connection to `address` within `timeout`.
pub async fn probe_port(address: SocketAddr, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect(address)).await {
        Ok(Ok(_stream)) => {
            log::debug!("Connected to {}", address);
            true
        }
        Ok(Err(e)) => {
            log::debug!("Connection to {} failed: {}", address, e);
            false
        }
        Err(_elapsed) => {
            log::debug!("Connection to {} timed out after {:?}", address, timeout);
            false
        }
    }
}

/// Launches `<portable_dir>/nvda.exe -m`, waits for it to settle and probes the automation port.
///
/// NVDA is terminated afterwards in every case, including when launching fails.
pub async fn verify_portable<L, C>(
    launcher: &L,
    clock: &C,
    settings: &Settings,
    portable_dir: &Path,
) -> Result<Verification>
where
    L: ProcessLauncher,
    C: Clock,
{
    let executable = portable_dir.join(settings.executable_name());
    ensure_non_empty(&executable, "portable NVDA executable")?;

    let address = SocketAddr::from((Ipv4Addr::LOCALHOST, settings.automation_port()));
    let spec = CommandSpec::new(&executable)
        .arg("-m")
        .current_dir(portable_dir);

    log::info!("Starting portable NVDA: {}", spec.display());
    let probed = match launcher.spawn(&spec).await {
        Ok(()) => {
            clock.sleep(settings.verify_settle()).await;
            Ok(probe_port(address, settings.connect_timeout()).await)
        }
        Err(e) => Err(e),
    };

    if let Err(e) = launcher.terminate(settings.executable_name()).await {
        log::warn!("Failed to terminate {}: {}", settings.executable_name(), e);
    }
    clock.sleep(settings.terminate_settle()).await;

    let reachable = probed?;

    if reachable {
        log::info!("AT Automation server is listening on {}", address);
    } else {
        log::warn!("AT Automation server is not listening on {}", address);
    }
    Ok(Verification { reachable, address })
}
