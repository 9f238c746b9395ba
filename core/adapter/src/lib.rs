#![warn(clippy::pedantic)]
//! Lint Invocation Adapter for a WebAssembly build of Verilator
//!
//! This crate runs a precompiled WASI build of the Verilator linter over
//! caller-supplied source text and hands back the diagnostics it prints.
//! The linter itself is an opaque binary; this crate only moves bytes in and
//! lines out.
//!
//! ## Overview
//!
//! ```text
//! files ──► stage into temp dir ──► _start(verilator --lint-only ... files)
//!                                          │
//!                     stderr lines ◄───────┘ ──► trim ──► log messages + done
//! ```
//!
//! The analyzer binary is fetched and compiled once per [`AnalyzerRuntime`]
//! and re-instantiated for every request. Each request gets its own store,
//! its own staging directory and its own captured streams.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vlint_adapter::{AdapterConfig, LintAdapter, LintRequest};
//!
//! # async fn run() -> Result<(), vlint_adapter::LintError> {
//! let adapter = LintAdapter::from_config(&AdapterConfig::default())?;
//! let request = LintRequest::new().with_source("top.v", "module top; endmodule\n");
//! let report = adapter.lint(&request).await?;
//! for line in &report.diagnostics {
//!     println!("{line}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Message-Driven Hosts
//!
//! [`Worker`] runs an adapter on its own thread and speaks the
//! [`InboundMessage`] / [`OutboundMessage`] protocol over channels, which the
//! `vlint serve` command exposes as JSON lines on stdio.
//!
//! ## Modules
//!
//! - [`config`] - TOML configuration and environment overrides
//! - [`artifact`] - fetching, verifying and caching the analyzer binary
//! - [`runtime`] - engine, module cache and load status
//! - [`vfs`] - per-request staging directory
//! - [`invoke`] - one analyzer run and its termination
//! - [`capture`] - bounded stdout/stderr pipes
//! - [`diagnostics`] - line splitting and trim policy
//! - [`protocol`] - worker message types
//! - [`adapter`] - request handling
//! - [`worker`] - background worker thread

pub mod adapter;
pub mod artifact;
pub mod capture;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod invoke;
pub mod protocol;
pub mod runtime;
pub mod vfs;
pub mod worker;

pub use adapter::{LintAdapter, LintReport};
pub use artifact::{ArtifactFetcher, ArtifactSource};
pub use config::AdapterConfig;
pub use diagnostics::{DiagnosticLine, Severity, SeverityCounts, TrimPolicy};
pub use errors::LintError;
pub use invoke::{LINT_FLAGS, Termination};
pub use protocol::{InboundMessage, OutboundMessage, Relay};
pub use runtime::{AnalyzerRuntime, LoadStats, LoadStatus, MemoryPolicy};
pub use vfs::{LintRequest, StagedSources};
pub use worker::Worker;
