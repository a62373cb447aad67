//! Error type shared by every stage.

use std::path::PathBuf;

/// Errors raised by the untangle kernel.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An input record could not be parsed. The run is aborted.
    #[error("malformed input at {path}:{line}: {reason}")]
    MalformedInput {
        /// File the record came from.
        path: PathBuf,
        /// 1-based line number, 0 when the problem is not tied to a line.
        line: usize,
        /// What was wrong.
        reason: String,
    },

    /// File access failed.
    #[error("I/O error: {source} ({path})")]
    Io {
        /// Underlying error.
        source: std::io::Error,
        /// File being accessed.
        path: PathBuf,
    },

    /// A parameter was rejected before any processing started.
    #[error("invalid parameter: {0}")]
    Parameter(String),

    /// The graph has no segments left, so no score can be computed.
    #[error("graph has no segments; score is undefined")]
    EmptyGraph,
}

impl Error {
    /// Wrap an `io::Error` with a path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: path.into(),
        }
    }

    /// Create a malformed-input error.
    pub fn malformed(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
