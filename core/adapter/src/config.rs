//! Adapter configuration.
//!
//! Configuration is read from a TOML file and then adjusted by environment
//! variables. Every section and field is optional; missing values fall back
//! to the defaults below.
//!
//! ```toml
//! [artifact]
//! location = "verilator_bin.wasm"   # filesystem path or http(s) URL
//! sha256 = "9f86d0..."              # optional pin
//! cache = true                      # keep downloaded binaries on disk
//! cache_dir = "/var/cache/vlint"    # defaults to the user cache directory
//!
//! [runtime]
//! initial_memory_pages = 1024       # 64 MiB
//! maximum_memory_pages = 16384      # 1 GiB
//! timeout_secs = 60                 # 0 disables the deadline
//! capture_limit = 16777216          # bytes per captured stream
//!
//! [lint]
//! trim = "keep-all"                 # or "drop-last"
//! ```
//!
//! ## Resolution Order
//!
//! 1. Explicit path passed to [`AdapterConfig::resolve`]
//! 2. `VLINT_CONFIG` environment variable
//! 3. `vlint.toml` in the current directory, when present
//! 4. Built-in defaults
//!
//! `VLINT_ARTIFACT` then overrides `artifact.location`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::diagnostics::TrimPolicy;
use crate::errors::LintError;

/// Environment variable naming the configuration file.
pub const VLINT_CONFIG_ENV: &str = "VLINT_CONFIG";

/// Environment variable overriding the analyzer location.
pub const VLINT_ARTIFACT_ENV: &str = "VLINT_ARTIFACT";

/// Configuration file looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "vlint.toml";

/// Analyzer binary location used when nothing else is configured.
pub const DEFAULT_ARTIFACT_LOCATION: &str = "verilator_bin.wasm";

/// Size of one WebAssembly page in bytes.
pub const WASM_PAGE_SIZE: u64 = 64 * 1024;

/// Top-level adapter configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdapterConfig {
    /// Where the analyzer binary comes from.
    pub artifact: ArtifactConfig,
    /// Resource limits applied to each invocation.
    pub runtime: RuntimeConfig,
    /// Output shaping.
    pub lint: LintConfig,
}

/// `[artifact]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifactConfig {
    /// Filesystem path or `http(s)://` URL of the analyzer binary.
    pub location: String,
    /// Expected SHA-256 digest of the binary as hex.
    pub sha256: Option<String>,
    /// Keep downloaded binaries on disk between runs.
    pub cache: bool,
    /// Directory for downloaded binaries.
    pub cache_dir: Option<PathBuf>,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            location: DEFAULT_ARTIFACT_LOCATION.to_string(),
            sha256: None,
            cache: true,
            cache_dir: None,
        }
    }
}

impl ArtifactConfig {
    /// Directory downloaded binaries are cached in, or `None` when caching is off.
    #[must_use]
    pub fn resolved_cache_dir(&self) -> Option<PathBuf> {
        if !self.cache {
            return None;
        }
        self.cache_dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|dir| dir.join("vlint").join("artifacts")))
    }
}

/// `[runtime]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Initial size of an imported linear memory, in 64 KiB pages.
    pub initial_memory_pages: u32,
    /// Hard ceiling for linear memory, in 64 KiB pages.
    pub maximum_memory_pages: u32,
    /// Wall-clock limit for one analyzer run; `0` disables it.
    pub timeout_secs: u64,
    /// Maximum bytes captured from each of stdout and stderr.
    pub capture_limit: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            initial_memory_pages: 1024,
            maximum_memory_pages: 16384,
            timeout_secs: 60,
            capture_limit: 16 * 1024 * 1024,
        }
    }
}

impl RuntimeConfig {
    /// The configured time limit, or `None` when disabled.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Memory ceiling in bytes.
    #[must_use]
    pub fn maximum_memory_bytes(&self) -> u64 {
        u64::from(self.maximum_memory_pages) * WASM_PAGE_SIZE
    }
}

/// `[lint]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LintConfig {
    /// What to do with the last captured diagnostic line.
    pub trim: TrimPolicy,
}

impl AdapterConfig {
    /// Parses configuration from TOML text and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`LintError::Config`] if the text is not valid TOML, contains
    /// unknown keys, or fails [`AdapterConfig::validate`].
    pub fn parse(content: &str) -> Result<Self, LintError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| LintError::config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`LintError::Config`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, LintError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LintError::config_at(path, format!("failed to read file: {e}"))
        })?;
        Self::parse(&content).map_err(|e| match e {
            LintError::Config { message, .. } => LintError::config_at(path, message),
            other => other,
        })
    }

    /// Finds and loads configuration following the documented resolution order,
    /// then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`LintError::Config`] if a selected file cannot be loaded.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, LintError> {
        let env_path = std::env::var_os(VLINT_CONFIG_ENV).map(PathBuf::from);
        let mut config = match explicit.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::load(&path)?,
            None => {
                let local = Path::new(DEFAULT_CONFIG_FILE);
                if local.is_file() {
                    Self::load(local)?
                } else {
                    Self::default()
                }
            }
        };

        if let Some(location) = std::env::var_os(VLINT_ARTIFACT_ENV) {
            config.artifact.location = location.to_string_lossy().into_owned();
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`LintError::Config`] describing the first violated constraint.
    pub fn validate(&self) -> Result<(), LintError> {
        if self.artifact.location.trim().is_empty() {
            return Err(LintError::config("artifact.location must not be empty"));
        }
        if let Some(digest) = &self.artifact.sha256
            && (digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()))
        {
            return Err(LintError::config(
                "artifact.sha256 must be 64 hexadecimal characters",
            ));
        }
        if self.runtime.initial_memory_pages == 0 {
            return Err(LintError::config(
                "runtime.initial_memory_pages must be greater than zero",
            ));
        }
        if self.runtime.maximum_memory_pages < self.runtime.initial_memory_pages {
            return Err(LintError::config(format!(
                "runtime.maximum_memory_pages ({}) is below runtime.initial_memory_pages ({})",
                self.runtime.maximum_memory_pages, self.runtime.initial_memory_pages
            )));
        }
        if self.runtime.maximum_memory_pages > 65536 {
            return Err(LintError::config(
                "runtime.maximum_memory_pages cannot exceed 65536 (4 GiB)",
            ));
        }
        if self.runtime.capture_limit == 0 {
            return Err(LintError::config(
                "runtime.capture_limit must be greater than zero",
            ));
        }
        Ok(())
    }
}
