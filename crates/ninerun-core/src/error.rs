//! Error types for the ninerun-core library.
//!
//! This module provides error handling using the `thiserror` crate, with one
//! variant per failure class the launcher distinguishes. The variants map to
//! process exit codes through [`Error::exit_code`]; only the binary's entry
//! point actually terminates the process.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ninerun operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all launcher operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// No binary image path was supplied
    #[error("invalid arguments: a binary image path is required")]
    Usage,

    /// Failed to open the target image file
    #[error("failed to open image '{path}': {source}")]
    FileOpen {
        /// Path to the file that failed to open
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The byte stream could not be loaded as a binary image.
    ///
    /// This covers both a malformed image and a transport-decoding failure
    /// that surfaces while the engine's loader reads the stream.
    #[error("failed to load binary image: {details}")]
    Deserialize {
        /// Description of the load failure
        details: String,
    },

    /// The engine reported an execution failure
    #[error("{message}")]
    Execution {
        /// Status code reported by the engine alongside the failure
        status: i32,
        /// Failure message from the engine or guest program
        message: String,
    },
}

impl Error {
    /// Creates a new file open error
    pub fn file_open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileOpen {
            path: path.into(),
            source,
        }
    }

    /// Creates a new image load error
    pub fn deserialize(details: impl Into<String>) -> Self {
        Self::Deserialize {
            details: details.into(),
        }
    }

    /// Creates a new execution error carrying the engine's status code
    pub fn execution(status: i32, message: impl Into<String>) -> Self {
        Self::Execution {
            status,
            message: message.into(),
        }
    }

    /// Returns the process exit code this error maps to.
    ///
    /// Usage errors map to 2, open and load failures to 1. An execution
    /// failure keeps the engine's status code, except that a zero status is
    /// forced to 1 so a failure is never reported as success.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage => 2,
            Self::FileOpen { .. } | Self::Deserialize { .. } => 1,
            Self::Execution { status, .. } => {
                if *status == 0 {
                    1
                } else {
                    *status
                }
            }
        }
    }
}
