//! Portable NVDA build pipeline.
//!
//! The pipeline turns an NVDA installer and the AT Automation add-on into a verified,
//! zipped portable copy. It is split into independently invocable tasks:
//!
//! 1. resolve the NVDA version and installer URL
//! 2. download the installer
//! 3. fetch the add-on sources and package them as `.nvda-addon`
//! 4. install NVDA silently and locate the executable
//! 5. install the add-on and write `nvda.ini`
//! 6. export a portable copy and wait for it to appear
//! 7. start the portable copy and probe the automation port
//! 8. zip the portable copy
//!
//! Tasks hand results to each other through [`PipelineState`], so each can run in its own
//! process (one CI step per task) or back to back through [`Task::All`].
//!
//! # Module Organization
//!
//! - `clock` - injectable time source and bounded polling
//! - `launcher` - process launching capability and its system implementation
//! - `settings` - configuration, builder and TOML file
//! - `state` - persisted step state mirrored into the CI env file
//! - `steps` - the individual steps
//! - `orchestrator` - task dispatch and state wiring
//! - `utils` - file system, HTTP, archive and checksum helpers

pub mod clock;
pub mod error;
pub mod launcher;
pub mod orchestrator;
pub mod result;
pub mod settings;
pub mod state;
pub mod steps;
pub mod utils;

pub use clock::{Clock, ManualClock, PollOutcome, PollPolicy, TokioClock, poll_until};
pub use error::{Error, Result};
pub use launcher::{CommandOutput, CommandSpec, ProcessLauncher, SystemLauncher};
pub use orchestrator::{Pipeline, Task};
pub use result::StepResult;
pub use settings::{Elevation, RetryPolicy, Settings, SettingsBuilder, SettingsFile};
pub use state::{PipelineState, StateKey};
