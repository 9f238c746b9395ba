//! The lint invocation adapter.
//!
//! [`LintAdapter::lint`] is the in-process API: it loads the analyzer on first
//! use, stages the request, runs the analyzer on a blocking thread and returns
//! a [`LintReport`]. [`LintAdapter::handle`] wraps it for message-driven hosts
//! and decides which outbound messages a request produces.

use std::sync::Arc;
use std::time::Duration;

use crate::artifact::ArtifactFetcher;
use crate::config::AdapterConfig;
use crate::diagnostics::{DiagnosticLine, TrimPolicy, collect_diagnostics, split_lines};
use crate::errors::LintError;
use crate::invoke::{self, InvocationSettings, Termination};
use crate::protocol::{InboundMessage, OutboundMessage, Relay};
use crate::runtime::AnalyzerRuntime;
use crate::vfs::{LintRequest, StagedSources};

/// Status line sent once the analyzer is ready for a request.
pub const STARTING_MESSAGE: &str = "Worker: Starting linting process...";

/// Result of one completed analyzer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintReport {
    /// Source names in the order they were passed to the analyzer.
    pub files: Vec<String>,
    /// The analyzer's exit code; non-zero usually means errors were found.
    pub exit_code: i32,
    /// Lines the analyzer printed to stdout.
    pub output: Vec<String>,
    /// Diagnostics in emission order, after the trim policy.
    pub diagnostics: Vec<DiagnosticLine>,
    /// Captured output was cut at the capture limit.
    pub truncated: bool,
    pub elapsed: Duration,
}

impl LintReport {
    /// Lines in relay order: stdout first, then diagnostics.
    pub fn relay_lines(&self) -> impl Iterator<Item = &str> {
        self.output
            .iter()
            .map(String::as_str)
            .chain(self.diagnostics.iter().map(DiagnosticLine::text))
    }
}

/// Stages sources, runs the analyzer and shapes its output.
#[derive(Debug, Clone)]
pub struct LintAdapter {
    runtime: Arc<AnalyzerRuntime>,
    trim: TrimPolicy,
}

impl LintAdapter {
    #[must_use]
    pub fn new(runtime: Arc<AnalyzerRuntime>, trim: TrimPolicy) -> Self {
        Self { runtime, trim }
    }

    /// Builds the runtime described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be created; the analyzer itself
    /// is not loaded yet.
    pub fn from_config(config: &AdapterConfig) -> Result<Self, LintError> {
        let fetcher = ArtifactFetcher::from_config(&config.artifact);
        let runtime = AnalyzerRuntime::new(fetcher, &config.runtime)?;
        Ok(Self::new(Arc::new(runtime), config.lint.trim))
    }

    #[must_use]
    pub fn runtime(&self) -> &Arc<AnalyzerRuntime> {
        &self.runtime
    }

    #[must_use]
    pub fn trim_policy(&self) -> TrimPolicy {
        self.trim
    }

    /// Lints `request` and returns the captured output.
    ///
    /// # Errors
    ///
    /// - load failures from [`AnalyzerRuntime::module`];
    /// - [`LintError::EmptyRequest`], [`LintError::InvalidSourceName`] or
    ///   [`LintError::Stage`] while staging;
    /// - [`LintError::Instantiate`] if the module cannot be instantiated;
    /// - [`LintError::Timeout`] or [`LintError::AnalyzerFault`] for abnormal
    ///   termination.
    ///
    /// A non-zero exit through `proc_exit` is not an error.
    pub async fn lint(&self, request: &LintRequest) -> Result<LintReport, LintError> {
        self.lint_with_partial(request).await.map_err(|(e, _)| e)
    }

    /// Like [`LintAdapter::lint`], but abnormal terminations also hand back
    /// whatever the analyzer printed before it stopped.
    async fn lint_with_partial(
        &self,
        request: &LintRequest,
    ) -> Result<LintReport, (LintError, Vec<String>)> {
        request.validate().map_err(|e| (e, Vec::new()))?;
        let module = self.runtime.module().await.map_err(|e| (e, Vec::new()))?;
        let staged = StagedSources::stage(request).map_err(|e| (e, Vec::new()))?;
        let settings = InvocationSettings::from_runtime(&self.runtime);

        tracing::info!(
            target: "adapter",
            files = staged.names().len(),
            names = %staged.names().join(", "),
            "linting"
        );

        let output = tokio::task::spawn_blocking(move || invoke::run(&settings, &module, &staged))
            .await
            .map_err(|e| {
                let fault = LintError::analyzer_fault(format!("invocation task failed: {e}"));
                (fault, Vec::new())
            })?
            .map_err(|e| (e, Vec::new()))?;

        let stdout = split_lines(&output.stdout);
        let code = match output.termination {
            Termination::Exited(code) => code,
            Termination::TimedOut => {
                let limit = self.runtime.timeout().unwrap_or_default();
                return Err((LintError::timeout(limit), partial(stdout, &output.stderr)));
            }
            Termination::Faulted(message) => {
                return Err((
                    LintError::analyzer_fault(message),
                    partial(stdout, &output.stderr),
                ));
            }
        };

        let diagnostics = collect_diagnostics(&output.stderr, self.trim);
        tracing::info!(
            target: "adapter",
            exit_code = code,
            diagnostics = diagnostics.len(),
            elapsed_ms = u64::try_from(output.elapsed.as_millis()).unwrap_or(u64::MAX),
            "lint finished"
        );

        let files = output.args[1 + invoke::LINT_FLAGS.len()..].to_vec();
        Ok(LintReport {
            files,
            exit_code: code,
            output: stdout,
            diagnostics,
            truncated: output.truncated,
            elapsed: output.elapsed,
        })
    }

    /// Processes one inbound message, posting its outbound messages to `relay`.
    ///
    /// `done` is posted only when the analyzer ran to completion. Every
    /// failure is reported as a `log` line instead, and the caller may send
    /// further requests afterwards.
    pub async fn handle(&self, message: InboundMessage, relay: &impl Relay) {
        let request = message.into_request();

        if let Err(e) = self.runtime.module().await {
            relay.log(format!("Worker: failed to load analyzer: {e}"));
            return;
        }
        relay.log(STARTING_MESSAGE);

        match self.lint_with_partial(&request).await {
            Ok(report) => {
                for line in report.relay_lines() {
                    relay.log(line);
                }
                relay.post(OutboundMessage::Done);
            }
            Err((e, captured)) => {
                for line in captured {
                    relay.log(line);
                }
                tracing::warn!(target: "adapter", error = %e, "lint request failed");
                relay.log(format!("Worker: {e}"));
            }
        }
    }
}

/// Everything captured before an abnormal stop, untrimmed.
fn partial(mut stdout: Vec<String>, stderr: &[u8]) -> Vec<String> {
    stdout.extend(split_lines(stderr));
    stdout
}
