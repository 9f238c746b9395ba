//! Error types for the lint adapter.
//!
//! `LintError` covers every way a lint request can fail before, during or
//! after the analyzer runs. Load failures (fetch, checksum, compile) are
//! grouped by [`LintError::is_load_failure`] because the worker reports them
//! differently from per-request failures.
//!
//! The analyzer's own termination through `proc_exit` is absent
//! from this enum: it is the normal exit path and is reported as an exit code
//! on the [`crate::LintReport`].

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Consolidated error type for lint adapter operations.
#[derive(Debug, Error)]
pub enum LintError {
    /// The analyzer binary could not be fetched.
    #[error("failed to fetch analyzer from {location}: {message}")]
    ArtifactFetch {
        /// Path or URL the artifact was fetched from.
        location: String,
        /// Description of the failure.
        message: String,
        /// The underlying error, when there is one.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The fetched analyzer binary does not match the pinned checksum.
    #[error("analyzer checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The configured SHA-256 digest.
        expected: String,
        /// The digest of the fetched bytes.
        actual: String,
    },

    /// The analyzer binary is not a valid WebAssembly module.
    #[error("failed to compile analyzer: {message}")]
    Compile {
        /// Compiler diagnostic from wasmtime.
        message: String,
    },

    /// The compiled module could not be linked or instantiated.
    #[error("failed to instantiate analyzer: {message}")]
    Instantiate {
        /// Linker or instantiation diagnostic from wasmtime.
        message: String,
    },

    /// A lint request carried no source buffers.
    #[error("lint request contains no source files")]
    EmptyRequest,

    /// A source buffer name cannot be used as a file name.
    #[error("invalid source name {name:?}: {reason}")]
    InvalidSourceName {
        /// The rejected name.
        name: String,
        /// Why the name was rejected.
        reason: &'static str,
    },

    /// Writing a source buffer into the staging directory failed.
    #[error("failed to stage {name}: {source}")]
    Stage {
        /// Name of the buffer being written.
        name: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The analyzer trapped for a reason other than its normal exit.
    #[error("analyzer crashed: {message}")]
    AnalyzerFault {
        /// Trap description from wasmtime.
        message: String,
    },

    /// The analyzer did not finish within the configured time limit.
    #[error("analyzer timed out after {}s", limit.as_secs())]
    Timeout {
        /// The configured limit.
        limit: Duration,
    },

    /// Configuration could not be read or is inconsistent.
    #[error("configuration error{}: {message}", location_suffix(.path.as_deref()))]
    Config {
        /// Description of the problem.
        message: String,
        /// File the configuration was read from, if any.
        path: Option<PathBuf>,
    },

    /// Generic I/O failure outside of staging.
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O operation that failed.
        message: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The worker thread is gone and can no longer accept requests.
    #[error("lint worker has shut down")]
    WorkerClosed,
}

impl LintError {
    /// Creates a new `ArtifactFetch` error.
    #[must_use]
    pub fn artifact_fetch(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ArtifactFetch {
            location: location.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new `ArtifactFetch` error with a source error.
    #[must_use]
    pub fn artifact_fetch_with_source(
        location: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ArtifactFetch {
            location: location.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a new `ChecksumMismatch` error.
    #[must_use]
    pub fn checksum_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::ChecksumMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a new `Compile` error.
    #[must_use]
    pub fn compile(message: impl Into<String>) -> Self {
        Self::Compile {
            message: message.into(),
        }
    }

    /// Creates a new `Instantiate` error.
    #[must_use]
    pub fn instantiate(message: impl Into<String>) -> Self {
        Self::Instantiate {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidSourceName` error.
    #[must_use]
    pub fn invalid_source_name(name: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidSourceName {
            name: name.into(),
            reason,
        }
    }

    /// Creates a new `Stage` error.
    #[must_use]
    pub fn stage(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::Stage {
            name: name.into(),
            source,
        }
    }

    /// Creates a new `AnalyzerFault` error.
    #[must_use]
    pub fn analyzer_fault(message: impl Into<String>) -> Self {
        Self::AnalyzerFault {
            message: message.into(),
        }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub const fn timeout(limit: Duration) -> Self {
        Self::Timeout { limit }
    }

    /// Creates a new `Config` error not tied to a file.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            path: None,
        }
    }

    /// Creates a new `Config` error for a specific configuration file.
    #[must_use]
    pub fn config_at(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    /// Creates a new `Io` error from an I/O error with context.
    #[must_use]
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Returns `true` for failures that leave the analyzer unloaded.
    #[must_use]
    pub const fn is_load_failure(&self) -> bool {
        matches!(
            self,
            Self::ArtifactFetch { .. } | Self::ChecksumMismatch { .. } | Self::Compile { .. }
        )
    }
}

fn location_suffix(path: Option<&Path>) -> String {
    path.map(|p| format!(" in {}", p.display())).unwrap_or_default()
}
