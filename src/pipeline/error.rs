//! Error taxonomy for pipeline steps.
//!
//! Every step returns [`Result`]; the orchestrator turns an [`Error`] into a failed
//! [`StepResult`](crate::pipeline::StepResult) and [`Error::kind`] becomes its `error_kind`.

use std::{
    fmt::Display,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by pipeline steps.
#[derive(Error, Debug)]
pub enum Error {
    /// Version or download URL discovery failed
    #[error("failed to resolve NVDA version: {0}")]
    Resolution(String),

    /// HTTP fetch failed or returned an empty body
    #[error("download of {url} failed: {reason}")]
    Download {
        /// URL being fetched
        url: String,
        /// Why the download was rejected
        reason: String,
    },

    /// A fetched bundle lacks required entries
    #[error("{} is missing required entries: {}", .root.display(), .missing.join(", "))]
    Structure {
        /// Directory that was checked
        root: PathBuf,
        /// Relative paths that were expected but absent
        missing: Vec<String>,
    },

    /// A fetched archive is corrupt or holds unsafe entries
    #[error("archive {} is unusable: {reason}", .archive.display())]
    Archive {
        /// Archive being read
        archive: PathBuf,
        /// What is wrong with it
        reason: String,
    },

    /// An expected file or directory is absent
    #[error("{what} not found; checked: {}", display_paths(.checked))]
    NotFound {
        /// What was being looked for
        what: String,
        /// Every location that was checked, in order
        checked: Vec<PathBuf>,
    },

    /// The portable copy never appeared
    #[error(
        "portable copy marker {} did not appear within {}s",
        .marker.display(),
        .waited.as_secs()
    )]
    PortableCreation {
        /// File whose appearance signals completion
        marker: PathBuf,
        /// Time spent polling
        waited: Duration,
    },

    /// A spawned command exited unsuccessfully
    #[error("`{command}` exited with {status}: {stderr}")]
    Process {
        /// Command line that was run
        command: String,
        /// Exit status description
        status: String,
        /// Captured standard error
        stderr: String,
    },

    /// A command could not be started at all
    #[error("failed to run `{command}`: {error}")]
    CommandFailed {
        /// Command line that was attempted
        command: String,
        /// Underlying spawn error
        #[source]
        error: std::io::Error,
    },

    /// The automation server did not accept a connection
    #[error("AT Automation server is not reachable on {address}")]
    Unreachable {
        /// Probed socket address
        address: String,
    },

    /// A prerequisite value was never produced by an earlier step
    #[error("{key} is not set; run `{producer}` first")]
    MissingInput {
        /// State / environment key
        key: &'static str,
        /// Task that produces the key
        producer: &'static str,
    },

    /// Filesystem error with the path and operation that failed
    #[error("{context} {}: {error}", .path.display())]
    Fs {
        /// Operation being performed
        context: &'static str,
        /// Path involved
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        error: std::io::Error,
    },

    /// IO errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Archive errors
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Template rendering errors
    #[error("template error: {0}")]
    Template(#[from] handlebars::RenderError),

    /// Directory traversal errors
    #[error("directory walk error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// Path prefix errors
    #[error("path error: {0}")]
    StripPrefix(#[from] std::path::StripPrefixError),

    /// URL parsing errors
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration file errors
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// Settings rejected by the builder
    #[error("invalid settings: {0}")]
    Settings(String),

    /// Anything else
    #[error("{0}")]
    GenericError(String),

    /// An error annotated with what was being attempted
    #[error("{context}: {source}")]
    Context {
        /// Description of the failed operation
        context: String,
        /// Original error
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Taxonomy name reported to callers as `error_kind`.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Resolution(_) => "ResolutionError",
            Error::Download { .. } | Error::Http(_) => "DownloadError",
            Error::Structure { .. } | Error::Archive { .. } => "StructureError",
            Error::NotFound { .. } | Error::MissingInput { .. } => "NotFoundError",
            Error::PortableCreation { .. } => "PortableCreationError",
            Error::Process { .. } | Error::CommandFailed { .. } => "ProcessError",
            Error::Unreachable { .. } => "VerificationError",
            Error::Config(_) | Error::Settings(_) => "ConfigError",
            Error::Context { source, .. } => source.kind(),
            _ => "IoError",
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Attaches the failing operation and path to I/O errors.
pub trait ErrorExt<T> {
    /// Converts an I/O error into [`Error::Fs`].
    fn fs_context(self, context: &'static str, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &'static str, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.as_ref().to_path_buf(),
            error,
        })
    }
}

/// Adds a human-readable context message to errors and missing values.
pub trait Context<T> {
    /// Wraps the error (or `None`) with `context`.
    fn context<C: Display>(self, context: C) -> Result<T>;
}

impl<T, E: Into<Error>> Context<T> for std::result::Result<T, E> {
    fn context<C: Display>(self, context: C) -> Result<T> {
        self.map_err(|e| Error::Context {
            context: context.to_string(),
            source: Box::new(e.into()),
        })
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C: Display>(self, context: C) -> Result<T> {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }
}

/// Returns early with a [`Error::GenericError`] built from a format string.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::pipeline::Error::GenericError(format!($($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_keeps_the_underlying_kind() {
        let err: Result<()> = Err(Error::Unreachable {
            address: "127.0.0.1:8765".into(),
        });
        let err = err.context("test_nvda").unwrap_err();
        assert_eq!(err.kind(), "VerificationError");
        assert!(err.to_string().starts_with("test_nvda: "));
    }

    #[test]
    fn archive_kinds_separate_bad_input_from_write_failures() {
        let unusable = Error::Archive {
            archive: PathBuf::from("main.zip"),
            reason: "invalid Zip archive".into(),
        };
        assert_eq!(unusable.kind(), "StructureError");
        assert_eq!(Error::from(zip::result::ZipError::FileNotFound).kind(), "IoError");
    }
}
