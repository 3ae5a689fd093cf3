//! Portable NVDA builder
//!
//! Builds a redistributable portable copy of the NVDA screen reader bundled with the AT
//! Automation add-on, as a sequence of CI-friendly tasks:
//! - version resolution and installer download
//! - add-on retrieval and packaging
//! - silent install, add-on install and configuration
//! - portable export, verification and packaging
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod cli;
pub mod error;
pub mod pipeline;

// Re-export commonly used types
pub use error::{CliError, PipelineError, Result};
