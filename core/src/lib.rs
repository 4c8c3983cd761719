//! Core crate for the scriptkit workspace: the shared CLI script template,
//! the result reporter, configuration, the module registry and every
//! utility handler.

pub mod config;
pub mod http;
pub mod logging;
pub mod registry;
pub mod report;
pub mod runner;
pub mod scripts;
pub mod template;

pub use config::Config;
pub use registry::{Module, Registry};
pub use report::{Outcome, Reporter, Tag};
pub use runner::{CommandOutput, CommandRunner, ProcessRunner, RecordingRunner};
pub use template::{Context, Script};

use std::path::PathBuf;
use thiserror::Error;

/// The two ways a script invocation can fail.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input, reported before any external effect happens.
    Invocation,
    /// The single external effect of the script failed.
    Operation,
}

impl ErrorKind {
    /// Process exit code reported for this kind of failure.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Invocation => 2,
            ErrorKind::Operation => 1,
        }
    }
}

/// Common error type for every script in the toolbox.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Invocation(String),

    #[error("Invalid config file {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed input: {0}")]
    Malformed(String),

    #[error("`{0}` is not installed or not on PATH")]
    MissingTool(String),

    #[error("`{program}` failed: {message}")]
    Command { program: String, message: String },

    #[error("{0}")]
    Operation(String),
}

impl Error {
    /// Classify the error as an invocation or an operation failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Invocation(_) | Error::Config { .. } => ErrorKind::Invocation,
            _ => ErrorKind::Operation,
        }
    }

    pub fn invocation(message: impl Into<String>) -> Self {
        Error::Invocation(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Error::Malformed(message.into())
    }

    pub fn operation(message: impl Into<String>) -> Self {
        Error::Operation(message.into())
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Malformed(format!("invalid CSV: {err}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Malformed(format!("invalid JSON: {err}"))
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::Malformed(format!("invalid archive: {err}"))
    }
}

/// Convenient alias for results returned by the core crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_errors_exit_with_usage_code() {
        let err = Error::invocation("missing city");
        assert_eq!(err.kind(), ErrorKind::Invocation);
        assert_eq!(err.kind().exit_code(), 2);
    }

    #[test]
    fn operation_errors_exit_with_one() {
        let err = Error::NotFound(PathBuf::from("nope.csv"));
        assert_eq!(err.kind(), ErrorKind::Operation);
        assert_eq!(err.kind().exit_code(), 1);
        assert_eq!(err.to_string(), "File not found: nope.csv");
    }

    #[test]
    fn json_errors_are_malformed_input() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, Error::Malformed(_)));
    }
}
