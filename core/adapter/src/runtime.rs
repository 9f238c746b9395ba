//! Process-wide analyzer runtime.
//!
//! [`AnalyzerRuntime`] owns everything that outlives a single lint call: the
//! wasmtime [`Engine`], the compiled analyzer [`Module`], the memory policy and
//! the epoch ticker that enforces timeouts. It is meant to be created once and
//! shared (typically behind an `Arc`).
//!
//! ## Load State
//!
//! ```text
//! Unloaded ──► Loading ──► Loaded
//!                 │  ▲
//!                 ▼  │
//!               Failed
//! ```
//!
//! `Loaded` is terminal. A failed load leaves nothing cached, and the next
//! caller of [`AnalyzerRuntime::module`] starts a fresh attempt. Loading is
//! single-flight: concurrent callers wait on the same async mutex, so only
//! one fetch and one compile ever run at a time.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError, mpsc};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use wasmtime::{Config, Engine, Module};

use crate::artifact::ArtifactFetcher;
use crate::config::{RuntimeConfig, WASM_PAGE_SIZE};
use crate::errors::LintError;

/// Interval between epoch increments when a timeout is configured.
pub const EPOCH_TICK: Duration = Duration::from_millis(100);

/// Load status of the analyzer module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LoadStatus::Unloaded => "unloaded",
            LoadStatus::Loading => "loading",
            LoadStatus::Loaded => "loaded",
            LoadStatus::Failed => "failed",
        };
        f.write_str(text)
    }
}

/// Bootstrap counters, mostly useful to confirm caching works.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Number of times the artifact was fetched.
    pub fetches: usize,
    /// Number of times a module was compiled.
    pub compiles: usize,
}

/// Linear memory bounds applied to every analyzer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryPolicy {
    pub initial_pages: u32,
    pub maximum_pages: u32,
}

impl MemoryPolicy {
    #[must_use]
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            initial_pages: config.initial_memory_pages,
            maximum_pages: config.maximum_memory_pages,
        }
    }

    #[must_use]
    pub fn maximum_bytes(&self) -> usize {
        usize::try_from(u64::from(self.maximum_pages) * WASM_PAGE_SIZE).unwrap_or(usize::MAX)
    }
}

impl Default for MemoryPolicy {
    fn default() -> Self {
        Self::from_config(&RuntimeConfig::default())
    }
}

/// Background thread that advances the engine epoch at a fixed rate.
///
/// Stops when dropped.
struct EpochTicker {
    stop: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl EpochTicker {
    fn start(engine: Engine) -> Result<Self, LintError> {
        let (stop, stopped) = mpsc::channel::<()>();
        let handle = std::thread::Builder::new()
            .name("vlint-epoch".to_string())
            .spawn(move || {
                while let Err(mpsc::RecvTimeoutError::Timeout) = stopped.recv_timeout(EPOCH_TICK) {
                    engine.increment_epoch();
                }
            })
            .map_err(|e| LintError::io("failed to spawn epoch ticker", e))?;
        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
        })
    }
}

impl Drop for EpochTicker {
    fn drop(&mut self) {
        drop(self.stop.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Owned, shareable analyzer bootstrap state.
pub struct AnalyzerRuntime {
    engine: Engine,
    fetcher: ArtifactFetcher,
    memory: MemoryPolicy,
    timeout: Option<Duration>,
    capture_limit: usize,
    module: tokio::sync::Mutex<Option<Module>>,
    status: Mutex<LoadStatus>,
    artifact_len: AtomicUsize,
    fetches: AtomicUsize,
    compiles: AtomicUsize,
    _ticker: Option<EpochTicker>,
}

impl fmt::Debug for AnalyzerRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerRuntime")
            .field("source", &self.fetcher.source().describe())
            .field("memory", &self.memory)
            .field("timeout", &self.timeout)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl AnalyzerRuntime {
    /// Creates a runtime; nothing is fetched until the first
    /// [`AnalyzerRuntime::module`] call.
    ///
    /// # Errors
    ///
    /// Returns [`LintError::Compile`] if the engine cannot be configured, or
    /// [`LintError::Io`] if the epoch ticker thread cannot be spawned.
    pub fn new(fetcher: ArtifactFetcher, config: &RuntimeConfig) -> Result<Self, LintError> {
        let timeout = config.timeout();

        let mut engine_config = Config::new();
        engine_config.epoch_interruption(timeout.is_some());
        let engine = Engine::new(&engine_config)
            .map_err(|e| LintError::compile(format!("failed to create engine: {e}")))?;

        let ticker = match timeout {
            Some(_) => Some(EpochTicker::start(engine.clone())?),
            None => None,
        };

        Ok(Self {
            engine,
            fetcher,
            memory: MemoryPolicy::from_config(config),
            timeout,
            capture_limit: config.capture_limit,
            module: tokio::sync::Mutex::new(None),
            status: Mutex::new(LoadStatus::Unloaded),
            artifact_len: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            compiles: AtomicUsize::new(0),
            _ticker: ticker,
        })
    }

    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    #[must_use]
    pub fn memory_policy(&self) -> MemoryPolicy {
        self.memory
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    #[must_use]
    pub fn capture_limit(&self) -> usize {
        self.capture_limit
    }

    /// Epoch ticks granted to one invocation, or `None` without a timeout.
    #[must_use]
    pub fn epoch_deadline_ticks(&self) -> Option<u64> {
        self.timeout.map(|limit| {
            let ticks = limit.as_millis().div_ceil(EPOCH_TICK.as_millis());
            u64::try_from(ticks).unwrap_or(u64::MAX).max(1)
        })
    }

    #[must_use]
    pub fn status(&self) -> LoadStatus {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn stats(&self) -> LoadStats {
        LoadStats {
            fetches: self.fetches.load(Ordering::Relaxed),
            compiles: self.compiles.load(Ordering::Relaxed),
        }
    }

    /// Size of the loaded artifact in bytes, or zero before the first load.
    #[must_use]
    pub fn artifact_len(&self) -> usize {
        self.artifact_len.load(Ordering::Relaxed)
    }

    fn set_status(&self, status: LoadStatus) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }

    /// Returns the compiled analyzer, fetching and compiling it on first use.
    ///
    /// # Errors
    ///
    /// Returns the load failure ([`LintError::ArtifactFetch`],
    /// [`LintError::ChecksumMismatch`] or [`LintError::Compile`]). Nothing is
    /// cached on failure.
    pub async fn module(&self) -> Result<Module, LintError> {
        let mut slot = self.module.lock().await;
        if let Some(module) = slot.as_ref() {
            return Ok(module.clone());
        }

        self.set_status(LoadStatus::Loading);
        match self.load().await {
            Ok(module) => {
                *slot = Some(module.clone());
                self.set_status(LoadStatus::Loaded);
                Ok(module)
            }
            Err(e) => {
                self.set_status(LoadStatus::Failed);
                tracing::error!(
                    target: "runtime",
                    source = %self.fetcher.source().describe(),
                    error = %e,
                    "analyzer load failed"
                );
                Err(e)
            }
        }
    }

    async fn load(&self) -> Result<Module, LintError> {
        let start = Instant::now();
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let bytes = self.fetcher.fetch().await?;
        self.artifact_len.store(bytes.len(), Ordering::Relaxed);
        tracing::info!(
            target: "runtime",
            source = %self.fetcher.source().describe(),
            bytes = bytes.len(),
            "fetched analyzer"
        );

        self.compiles.fetch_add(1, Ordering::Relaxed);
        let engine = self.engine.clone();
        let module = tokio::task::spawn_blocking(move || Module::new(&engine, &bytes))
            .await
            .map_err(|e| LintError::compile(format!("compile task failed: {e}")))?
            .map_err(|e| LintError::compile(format!("{e:#}")))?;

        tracing::info!(
            target: "runtime",
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "compiled analyzer"
        );
        Ok(module)
    }
}
