//! Per-invocation file namespace.
//!
//! Each lint call gets a fresh temporary directory that is preopened into the
//! analyzer as its working directory. Source buffers are written there under
//! their request names, and the directory is removed when the
//! [`StagedSources`] value is dropped.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tempfile::TempDir;

use crate::errors::LintError;

/// Longest accepted source name, in bytes.
pub const MAX_SOURCE_NAME_LEN: usize = 255;

/// Named source buffers for one lint call, in insertion order.
///
/// Inserting a name twice replaces the earlier content but keeps the earlier
/// position, so the last write wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LintRequest {
    sources: IndexMap<String, Vec<u8>>,
}

impl LintRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a source buffer.
    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.sources.insert(name.into(), content.into());
    }

    /// Builder-style [`LintRequest::insert`].
    #[must_use]
    pub fn with_source(mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(name, content);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Source names in request order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// `(name, content)` pairs in request order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.sources
            .iter()
            .map(|(name, content)| (name.as_str(), content.as_slice()))
    }

    /// Rejects empty requests and unusable names without touching the disk.
    ///
    /// # Errors
    ///
    /// Returns [`LintError::EmptyRequest`] or the first
    /// [`LintError::InvalidSourceName`].
    pub fn validate(&self) -> Result<(), LintError> {
        if self.is_empty() {
            return Err(LintError::EmptyRequest);
        }
        for name in self.names() {
            validate_source_name(name)?;
        }
        Ok(())
    }
}

impl<N, C> FromIterator<(N, C)> for LintRequest
where
    N: Into<String>,
    C: Into<Vec<u8>>,
{
    fn from_iter<I: IntoIterator<Item = (N, C)>>(iter: I) -> Self {
        let mut request = Self::new();
        for (name, content) in iter {
            request.insert(name, content);
        }
        request
    }
}

/// Checks that `name` is a single path segment the analyzer can open.
///
/// # Errors
///
/// Returns [`LintError::InvalidSourceName`] naming the violated rule.
pub fn validate_source_name(name: &str) -> Result<(), LintError> {
    let reason = if name.is_empty() {
        Some("name is empty")
    } else if name.starts_with('-') {
        Some("name starts with '-'")
    } else if name == "." || name == ".." {
        Some("name refers to a directory")
    } else if name.contains(['/', '\\']) {
        Some("contains a path separator")
    } else if name.contains('\0') {
        Some("contains a NUL byte")
    } else if name.len() > MAX_SOURCE_NAME_LEN {
        Some("name is longer than 255 bytes")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(LintError::invalid_source_name(name, reason)),
        None => Ok(()),
    }
}

/// Source buffers written to an invocation-scoped directory.
#[derive(Debug)]
pub struct StagedSources {
    root: TempDir,
    names: Vec<String>,
}

impl StagedSources {
    /// Writes every buffer of `request` into a fresh temporary directory.
    ///
    /// Staging stops at the first failure; the partially filled directory is
    /// removed before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`LintError::EmptyRequest`], [`LintError::InvalidSourceName`],
    /// [`LintError::Io`] if the directory cannot be created, or
    /// [`LintError::Stage`] if a write fails.
    pub fn stage(request: &LintRequest) -> Result<Self, LintError> {
        request.validate()?;

        let root = tempfile::Builder::new()
            .prefix("vlint-")
            .tempdir()
            .map_err(|e| LintError::io("failed to create staging directory", e))?;

        let mut names = Vec::with_capacity(request.len());
        for (name, content) in request.iter() {
            std::fs::write(root.path().join(name), content)
                .map_err(|e| LintError::stage(name, e))?;
            tracing::trace!(target: "vfs", file = name, bytes = content.len(), "staged source");
            names.push(name.to_string());
        }

        Ok(Self { root, names })
    }

    /// Host directory holding the staged files.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Staged names in request order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Reads a staged buffer back by name.
    ///
    /// # Errors
    ///
    /// Returns [`LintError::Io`] if the file is missing or unreadable.
    pub fn read(&self, name: &str) -> Result<Vec<u8>, LintError> {
        validate_source_name(name)?;
        std::fs::read(self.root.path().join(name))
            .map_err(|e| LintError::io(format!("failed to read staged file {name}"), e))
    }
}
