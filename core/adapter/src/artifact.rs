//! Locating and fetching the analyzer binary.
//!
//! The binary may live on the local filesystem, behind an HTTP(S) URL, or be
//! handed over directly as bytes. Remote downloads are optionally cached on
//! disk so that later processes skip the network entirely.
//!
//! ## Failure Policy
//!
//! - A non-success HTTP status fails immediately; it is not retried.
//! - Connection and body-stream errors are retried with exponential backoff
//!   and jitter, up to [`MAX_RETRIES`] attempts.
//! - Nothing partial is ever cached: cache files are written to a `.tmp`
//!   sibling and renamed only after the checksum (if pinned) has matched.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::config::ArtifactConfig;
use crate::errors::LintError;

/// Maximum number of download attempts for transport failures.
pub const MAX_RETRIES: u32 = 3;

/// Base delay between retries in milliseconds.
const BASE_RETRY_DELAY_MS: u64 = 500;

/// Request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Upper bound on an analyzer binary, in bytes.
const MAX_ARTIFACT_BYTES: u64 = 512 * 1024 * 1024;

/// Where the analyzer binary comes from.
#[derive(Debug, Clone)]
pub enum ArtifactSource {
    /// A file on the local filesystem (`.wasm` or `.wat`).
    Path(PathBuf),
    /// An `http://` or `https://` URL.
    Url(String),
    /// Bytes already in memory.
    Bytes(Arc<[u8]>),
}

impl ArtifactSource {
    /// Interprets a configured location as a URL or a path.
    #[must_use]
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            Self::Url(location.to_string())
        } else {
            Self::Path(PathBuf::from(location))
        }
    }

    /// Human-readable location for logs and errors.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Url(url) => url.clone(),
            Self::Bytes(bytes) => format!("<{} in-memory bytes>", bytes.len()),
        }
    }
}

/// Fetches the analyzer binary according to [`ArtifactConfig`].
#[derive(Debug, Clone)]
pub struct ArtifactFetcher {
    source: ArtifactSource,
    sha256: Option<String>,
    cache_dir: Option<PathBuf>,
}

impl ArtifactFetcher {
    #[must_use]
    pub fn new(source: ArtifactSource) -> Self {
        Self {
            source,
            sha256: None,
            cache_dir: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &ArtifactConfig) -> Self {
        Self {
            source: ArtifactSource::parse(&config.location),
            sha256: config.sha256.as_ref().map(|s| s.to_ascii_lowercase()),
            cache_dir: config.resolved_cache_dir(),
        }
    }

    /// Pins the expected SHA-256 digest (hex).
    #[must_use]
    pub fn with_sha256(mut self, digest: impl Into<String>) -> Self {
        self.sha256 = Some(digest.into().to_ascii_lowercase());
        self
    }

    /// Enables the on-disk cache for URL sources.
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn source(&self) -> &ArtifactSource {
        &self.source
    }

    /// Fetches and verifies the analyzer binary.
    ///
    /// # Errors
    ///
    /// Returns [`LintError::ArtifactFetch`] if the binary cannot be read or
    /// downloaded, or [`LintError::ChecksumMismatch`] if it does not match
    /// the pinned digest.
    pub async fn fetch(&self) -> Result<Vec<u8>, LintError> {
        let bytes = match &self.source {
            ArtifactSource::Bytes(bytes) => bytes.to_vec(),
            ArtifactSource::Path(path) => read_local(path).await?,
            ArtifactSource::Url(url) => return self.fetch_remote(url).await,
        };
        self.verify(&bytes)?;
        Ok(bytes)
    }

    async fn fetch_remote(&self, url: &str) -> Result<Vec<u8>, LintError> {
        let cache_path = self
            .cache_dir
            .as_deref()
            .map(|dir| dir.join(cache_file_name(url)));

        if let Some(path) = &cache_path
            && let Some(bytes) = self.read_cached(path).await
        {
            tracing::debug!(target: "artifact", path = %path.display(), "using cached analyzer");
            return Ok(bytes);
        }

        let bytes = download_with_retries(url).await?;
        self.verify(&bytes)?;

        if let Some(path) = &cache_path
            && let Err(e) = write_cache(path, &bytes).await
        {
            tracing::warn!(target: "artifact", path = %path.display(), error = %e, "failed to cache analyzer");
        }
        Ok(bytes)
    }

    /// Returns cached bytes if present and matching the pinned digest.
    async fn read_cached(&self, path: &Path) -> Option<Vec<u8>> {
        let bytes = tokio::fs::read(path).await.ok()?;
        match self.verify(&bytes) {
            Ok(()) => Some(bytes),
            Err(e) => {
                tracing::warn!(target: "artifact", path = %path.display(), error = %e, "discarding stale cache entry");
                let _ = tokio::fs::remove_file(path).await;
                None
            }
        }
    }

    fn verify(&self, bytes: &[u8]) -> Result<(), LintError> {
        let Some(expected) = &self.sha256 else {
            return Ok(());
        };
        let actual = sha256_hex(bytes);
        if actual != *expected {
            return Err(LintError::checksum_mismatch(expected.clone(), actual));
        }
        Ok(())
    }
}

/// Computes the SHA-256 digest of `bytes` as lowercase hex.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

async fn read_local(path: &Path) -> Result<Vec<u8>, LintError> {
    tokio::fs::read(path).await.map_err(|e| {
        LintError::artifact_fetch_with_source(path.display().to_string(), "failed to read file", e)
    })
}

/// Cache file name derived from the last URL path segment.
fn cache_file_name(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let segment = without_query
        .rsplit('/')
        .find(|s| !s.is_empty() && !s.contains(':'))
        .unwrap_or("analyzer.wasm");
    let digest = sha256_hex(url.as_bytes());
    format!("{}-{segment}", &digest[..12])
}

async fn write_cache(path: &Path, bytes: &[u8]) -> Result<(), LintError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            LintError::io(format!("failed to create directory {}", parent.display()), e)
        })?;
    }
    let temp_path = path.with_extension("tmp");
    if let Err(e) = tokio::fs::write(&temp_path, bytes).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(LintError::io(
            format!("failed to write {}", temp_path.display()),
            e,
        ));
    }
    tokio::fs::rename(&temp_path, path).await.map_err(|e| {
        LintError::io(
            format!(
                "failed to rename {} to {}",
                temp_path.display(),
                path.display()
            ),
            e,
        )
    })
}

/// Outcome of a single download attempt.
enum Attempt {
    Retryable(LintError),
    Fatal(LintError),
}

async fn download_with_retries(url: &str) -> Result<Vec<u8>, LintError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| LintError::artifact_fetch_with_source(url, "failed to create HTTP client", e))?;

    let mut last_error = None;
    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            let delay = calculate_retry_delay(attempt);
            tracing::info!(
                target: "artifact",
                attempt = attempt + 1,
                max = MAX_RETRIES,
                delay_ms = delay,
                "retrying analyzer download"
            );
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        match download_once(&client, url).await {
            Ok(bytes) => return Ok(bytes),
            Err(Attempt::Fatal(e)) => return Err(e),
            Err(Attempt::Retryable(e)) => {
                tracing::warn!(target: "artifact", url, error = %e, "analyzer download failed");
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        LintError::artifact_fetch(url, format!("download failed after {MAX_RETRIES} attempts"))
    }))
}

async fn download_once(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, Attempt> {
    let response = client.get(url).send().await.map_err(|e| {
        Attempt::Retryable(LintError::artifact_fetch_with_source(
            url,
            "failed to connect",
            e,
        ))
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(Attempt::Fatal(LintError::artifact_fetch(
            url,
            format!("HTTP error {status}"),
        )));
    }

    if let Some(length) = response.content_length()
        && length > MAX_ARTIFACT_BYTES
    {
        return Err(Attempt::Fatal(LintError::artifact_fetch(
            url,
            format!("artifact is {length} bytes, limit is {MAX_ARTIFACT_BYTES}"),
        )));
    }

    let mut bytes = Vec::with_capacity(
        usize::try_from(response.content_length().unwrap_or(0)).unwrap_or_default(),
    );
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            Attempt::Retryable(LintError::artifact_fetch_with_source(
                url,
                "failed to read response body",
                e,
            ))
        })?;
        bytes.extend_from_slice(&chunk);
        if bytes.len() as u64 > MAX_ARTIFACT_BYTES {
            return Err(Attempt::Fatal(LintError::artifact_fetch(
                url,
                format!("artifact exceeds {MAX_ARTIFACT_BYTES} bytes"),
            )));
        }
    }

    tracing::info!(target: "artifact", url, bytes = bytes.len(), "downloaded analyzer");
    Ok(bytes)
}

/// Calculates the retry delay with exponential backoff and jitter.
///
/// The delay doubles with each attempt with +/- 25% jitter.
fn calculate_retry_delay(attempt: u32) -> u64 {
    let base_delay = BASE_RETRY_DELAY_MS * 2u64.pow(attempt);
    let jitter_range = base_delay / 4;
    let jitter = rand::rng().random_range(0..=jitter_range * 2);
    base_delay - jitter_range + jitter
}
