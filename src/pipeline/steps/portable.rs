//! Portable copy creation.
//!
//! NVDA exports a portable copy of itself when started with `--create-portable-silent`. The
//! export runs asynchronously inside the application and offers no completion signal, so the
//! builder polls for the portable executable and stops NVDA once it appears or the poll
//! policy gives up.

use crate::pipeline::{
    Error, Result,
    clock::{Clock, PollOutcome, poll_until},
    launcher::{CommandSpec, ProcessLauncher},
    settings::{Elevation, Settings},
    utils::fs::{ensure_non_empty, is_non_empty, remove_dir_all},
};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Progress of a portable export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortableState {
    Idle,
    Launching,
    AwaitingArtifact { elapsed: Duration, timeout: Duration },
    Verified { elapsed: Duration },
    TimedOut { elapsed: Duration },
}

/// A completed portable copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortableCopy {
    /// Absolute portable directory
    pub dir: PathBuf,
    /// Time from launch until the marker appeared
    pub elapsed: Duration,
    /// Number of marker probes made
    pub attempts: u32,
}

fn transition(state: &mut PortableState, next: PortableState) {
    log::debug!("Portable copy: {:?} -> {:?}", state, next);
    *state = next;
}

/// Exports a portable copy of `executable` into [`Settings::portable_dir`].
///
/// A stale directory from a previous run is removed first. NVDA is terminated before the
/// export and again afterwards, whether or not the marker appeared.
pub async fn create_portable_copy<L, C>(
    launcher: &L,
    clock: &C,
    settings: &Settings,
    executable: &Path,
    version: &str,
) -> Result<PortableCopy>
where
    L: ProcessLauncher,
    C: Clock,
{
    ensure_non_empty(executable, "NVDA executable")?;

    let image = settings.executable_name();
    let dir = settings.portable_dir(version);
    let marker = dir.join(image);
    let policy = settings.portable_poll();
    let mut state = PortableState::Idle;

    launcher.terminate(image).await?;
    clock.sleep(settings.terminate_settle()).await;
    remove_dir_all(&dir).await?;

    let spec = CommandSpec::new(executable)
        .arg("--create-portable-silent")
        .arg(format!("--portable-path={}", dir.display()));

    transition(&mut state, PortableState::Launching);
    log::info!("Creating portable copy: {}", spec.display());
    let launched = match settings.elevation() {
        Elevation::Direct => launcher.spawn(&spec).await,
        Elevation::ScheduledTask => launcher.run_privileged(&spec).await,
    };
    if let Err(e) = launched {
        stop(launcher, clock, settings).await;
        return Err(e);
    }

    transition(
        &mut state,
        PortableState::AwaitingArtifact {
            elapsed: Duration::ZERO,
            timeout: policy.timeout,
        },
    );
    let start = clock.elapsed();
    let outcome = poll_until(clock, policy, || {
        let ready = is_non_empty(&marker);
        if !ready {
            log::debug!(
                "Portable copy: {:?}",
                PortableState::AwaitingArtifact {
                    elapsed: clock.elapsed().saturating_sub(start),
                    timeout: policy.timeout,
                }
            );
        }
        ready
    })
    .await;

    stop(launcher, clock, settings).await;

    match outcome {
        PollOutcome::Ready { elapsed, attempts } => {
            transition(&mut state, PortableState::Verified { elapsed });
            log::info!(
                "Portable copy ready at {} after {}s",
                dir.display(),
                elapsed.as_secs()
            );
            Ok(PortableCopy {
                dir,
                elapsed,
                attempts,
            })
        }
        PollOutcome::TimedOut { elapsed, .. } => {
            transition(&mut state, PortableState::TimedOut { elapsed });
            Err(Error::PortableCreation {
                marker,
                waited: elapsed,
            })
        }
    }
}

/// Terminates NVDA and waits for it to exit; failures are logged, not returned.
async fn stop<L: ProcessLauncher, C: Clock>(launcher: &L, clock: &C, settings: &Settings) {
    if let Err(e) = launcher.terminate(settings.executable_name()).await {
        log::warn!("Failed to terminate {}: {}", settings.executable_name(), e);
    }
    clock.sleep(settings.terminate_settle()).await;
}
