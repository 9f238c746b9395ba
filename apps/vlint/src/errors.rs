//! Error types for the vlint CLI.
//!
//! Commands return `anyhow::Result`; the variants here cover the cases where
//! `main` needs to tell errors apart, most importantly an analyzer exit code
//! that must become the process exit code.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the vlint command layer.
#[derive(Debug, Error)]
pub enum VlintError {
    /// An input file does not exist.
    #[error("file not found: {path}")]
    FileNotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// Invalid command line arguments.
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        /// Description of what was invalid.
        message: String,
    },

    /// The analyzer finished with a non-zero exit code.
    ///
    /// Carries the code so `main` can exit with it. No message is printed;
    /// the diagnostics have already been written.
    #[error("analyzer exited with code {code}")]
    ProcessExitCode {
        /// The analyzer's exit code.
        code: i32,
    },
}

impl VlintError {
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            message: message.into(),
        }
    }

    pub const fn process_exit_code(code: i32) -> Self {
        Self::ProcessExitCode { code }
    }
}
