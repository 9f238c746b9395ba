//! A single synchronous analyzer run.
//!
//! The analyzer is a WASI preview-1 command. Each run gets a fresh [`Store`]
//! and instance built from the cached module, a WASI context whose working
//! directory is the staging directory, and [`CapturePipe`]s for stdout and
//! stderr bounded by the capture limit.
//!
//! ## Termination
//!
//! A WASI command normally ends by calling `proc_exit`, which the host
//! surfaces as an error carrying [`I32Exit`]. That is the analyzer's regular
//! exit path, so [`Termination::classify`] maps it to an exit code instead of
//! a failure. Only epoch interrupts (timeouts) and other traps are treated as
//! abnormal.

use std::time::{Duration, Instant};

use wasmtime::{
    Engine, ExternType, Linker, Memory, MemoryType, Module, Store, StoreLimits,
    StoreLimitsBuilder, Trap,
};
use wasmtime_wasi::p1::{self, WasiP1Ctx};
use wasmtime_wasi::{DirPerms, FilePerms, I32Exit, WasiCtxBuilder};

use crate::capture::CapturePipe;
use crate::errors::LintError;
use crate::runtime::{AnalyzerRuntime, MemoryPolicy};
use crate::vfs::StagedSources;

/// `argv[0]` passed to the analyzer.
pub const ANALYZER_PROGRAM: &str = "verilator";

/// Fixed lint-mode flags, placed before the source names.
pub const LINT_FLAGS: &[&str] = &[
    "--lint-only",
    "--Wall",
    "-Wno-DECLFILENAME",
    "-Wno-UNOPT",
    "-Wno-UNOPTFLAT",
];

/// Exported function invoked to run the analyzer.
pub const ENTRY_POINT: &str = "_start";

/// Guest path the staging directory is mounted at.
pub const GUEST_CWD: &str = ".";

/// Builds the full argument vector: program name, flags, then sources.
#[must_use]
pub fn analyzer_args(names: &[String]) -> Vec<String> {
    std::iter::once(ANALYZER_PROGRAM)
        .chain(LINT_FLAGS.iter().copied())
        .chain(names.iter().map(String::as_str))
        .map(str::to_owned)
        .collect()
}

/// How an analyzer run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The entry point returned or called `proc_exit` with this code.
    Exited(i32),
    /// The epoch deadline was reached.
    TimedOut,
    /// The analyzer trapped for any other reason.
    Faulted(String),
}

impl Termination {
    /// Classifies the result of calling the entry point.
    #[must_use]
    pub fn classify(result: wasmtime::Result<()>) -> Self {
        let Err(error) = result else {
            return Self::Exited(0);
        };
        if let Some(exit) = error.downcast_ref::<I32Exit>() {
            return Self::Exited(exit.0);
        }
        if matches!(error.downcast_ref::<Trap>(), Some(Trap::Interrupt)) {
            return Self::TimedOut;
        }
        Self::Faulted(format!("{error:#}"))
    }

    /// `true` when the analyzer ran to completion, whatever its exit code.
    #[must_use]
    pub const fn is_normal(&self) -> bool {
        matches!(self, Self::Exited(_))
    }
}

/// Everything a run needs from the runtime, detached so it can move onto a
/// blocking thread.
#[derive(Clone)]
pub struct InvocationSettings {
    pub engine: Engine,
    pub memory: MemoryPolicy,
    pub deadline_ticks: Option<u64>,
    pub timeout: Option<Duration>,
    pub capture_limit: usize,
}

impl InvocationSettings {
    #[must_use]
    pub fn from_runtime(runtime: &AnalyzerRuntime) -> Self {
        Self {
            engine: runtime.engine().clone(),
            memory: runtime.memory_policy(),
            deadline_ticks: runtime.epoch_deadline_ticks(),
            timeout: runtime.timeout(),
            capture_limit: runtime.capture_limit(),
        }
    }
}

/// Raw result of one run, before diagnostics are trimmed.
#[derive(Debug)]
pub struct InvocationOutput {
    pub args: Vec<String>,
    pub termination: Termination,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// At least one stream exceeded the capture limit and was cut.
    pub truncated: bool,
    pub elapsed: Duration,
}

struct HostState {
    wasi: WasiP1Ctx,
    limits: StoreLimits,
}

/// Instantiates `module` and runs its entry point over `staged`.
///
/// Blocks the calling thread until the analyzer finishes or its deadline
/// passes.
///
/// # Errors
///
/// Returns [`LintError::Instantiate`] if the store cannot be prepared or the
/// module cannot be linked. Analyzer exits, traps and timeouts are reported
/// through [`InvocationOutput::termination`], not as errors.
pub fn run(
    settings: &InvocationSettings,
    module: &Module,
    staged: &StagedSources,
) -> Result<InvocationOutput, LintError> {
    let args = analyzer_args(staged.names());
    let stdout = CapturePipe::new(settings.capture_limit);
    let stderr = CapturePipe::new(settings.capture_limit);

    let mut builder = WasiCtxBuilder::new();
    builder
        .args(&args)
        .stdout(stdout.clone())
        .stderr(stderr.clone());
    builder
        .preopened_dir(staged.root(), GUEST_CWD, DirPerms::all(), FilePerms::all())
        .map_err(|e| LintError::instantiate(format!("failed to preopen staging directory: {e}")))?;

    let state = HostState {
        wasi: builder.build_p1(),
        limits: StoreLimitsBuilder::new()
            .memory_size(settings.memory.maximum_bytes())
            .build(),
    };
    let mut store = Store::new(&settings.engine, state);
    store.limiter(|state| &mut state.limits);
    if let Some(ticks) = settings.deadline_ticks {
        store.set_epoch_deadline(ticks);
    }

    let mut linker: Linker<HostState> = Linker::new(&settings.engine);
    p1::add_to_linker_sync(&mut linker, |state: &mut HostState| &mut state.wasi)
        .map_err(|e| LintError::instantiate(format!("failed to link WASI: {e:#}")))?;
    define_imported_memory(&mut linker, &mut store, module, settings.memory)?;

    let instance = linker
        .instantiate(&mut store, module)
        .map_err(|e| LintError::instantiate(format!("{e:#}")))?;
    let entry = instance
        .get_typed_func::<(), ()>(&mut store, ENTRY_POINT)
        .map_err(|e| LintError::instantiate(format!("missing entry point {ENTRY_POINT}: {e:#}")))?;

    tracing::debug!(target: "invoke", args = ?args, "starting analyzer");
    let start = Instant::now();
    let termination = Termination::classify(entry.call(&mut store, ()));
    let elapsed = start.elapsed();
    drop(store);

    let truncated = stdout.is_truncated() || stderr.is_truncated();
    let (stdout, stderr) = (stdout.contents(), stderr.contents());
    if truncated {
        tracing::warn!(
            target: "invoke",
            limit = settings.capture_limit,
            "analyzer output exceeded the capture limit and was truncated"
        );
    }

    tracing::debug!(
        target: "invoke",
        termination = ?termination,
        elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        stderr_bytes = stderr.len(),
        "analyzer finished"
    );

    Ok(InvocationOutput {
        args,
        termination,
        stdout,
        stderr,
        truncated,
        elapsed,
    })
}

/// Satisfies memory imports with memories sized by `policy`.
fn define_imported_memory(
    linker: &mut Linker<HostState>,
    store: &mut Store<HostState>,
    module: &Module,
    policy: MemoryPolicy,
) -> Result<(), LintError> {
    for import in module.imports() {
        let ExternType::Memory(ty) = import.ty() else {
            continue;
        };
        let minimum = u32::try_from(ty.minimum())
            .unwrap_or(u32::MAX)
            .max(policy.initial_pages);
        let memory = Memory::new(
            &mut *store,
            MemoryType::new(minimum, Some(policy.maximum_pages)),
        )
        .map_err(|e| {
            LintError::instantiate(format!(
                "failed to allocate memory for {}::{}: {e:#}",
                import.module(),
                import.name()
            ))
        })?;
        linker
            .define(&mut *store, import.module(), import.name(), memory)
            .map_err(|e| LintError::instantiate(format!("{e:#}")))?;
    }
    Ok(())
}
