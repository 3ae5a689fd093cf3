//! Error types at the command line boundary.
//!
//! Step failures are [`crate::pipeline::Error`]s and are reported as failed step results.
//! [`PipelineError`] covers everything that can go wrong before a task runs.

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Main error type for CLI startup
#[derive(Error, Debug)]
pub enum PipelineError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Pipeline errors raised while preparing a run
    #[error("{0}")]
    Pipeline(#[from] crate::pipeline::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Log file could not be opened
    #[error("Cannot open log file {path}: {error}")]
    LogFile {
        /// Requested log file
        path: String,
        /// Underlying error
        #[source]
        error: std::io::Error,
    },
}

impl PipelineError {
    /// Taxonomy name reported as `error_kind`.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Cli(_) => "ConfigError",
            PipelineError::Io(_) => "IoError",
            PipelineError::Pipeline(e) => e.kind(),
        }
    }
}
