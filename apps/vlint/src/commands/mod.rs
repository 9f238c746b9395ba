//! Command modules for the vlint CLI.
//!
//! - [`lint`] - Lint local files and print the diagnostics
//! - [`serve`] - Run the lint worker over stdio (JSON lines)
//! - [`fetch`] - Fetch, verify and compile the analyzer ahead of time
//!
//! Every command starts from [`GlobalArgs::load_config`], which resolves the
//! configuration file and applies command-line overrides on top.

pub mod fetch;
pub mod lint;
pub mod serve;

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use vlint_adapter::{AdapterConfig, TrimPolicy};

use crate::logging::{LogFormat, LogLevel, parse_log_format, parse_log_level};

/// Options accepted by every subcommand.
#[derive(Args, Debug, Default, Clone)]
pub struct GlobalArgs {
    /// Configuration file (default: $VLINT_CONFIG, then ./vlint.toml).
    #[clap(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Analyzer binary: a filesystem path or http(s) URL.
    #[clap(long, global = true, value_name = "PATH|URL")]
    pub artifact: Option<String>,

    /// Per-run time limit in seconds; 0 disables it.
    #[clap(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Treatment of the last diagnostic line.
    #[clap(long, global = true, value_name = "keep-all|drop-last", value_parser = parse_trim)]
    pub trim: Option<TrimPolicy>,

    /// Log verbosity: error, warn, info, debug or trace.
    #[clap(long, global = true, value_name = "LEVEL", value_parser = parse_log_level)]
    pub log_level: Option<LogLevel>,

    /// Log output format: auto, text or json.
    #[clap(long, global = true, value_name = "FORMAT", value_parser = parse_log_format)]
    pub log_format: Option<LogFormat>,
}

impl GlobalArgs {
    /// Resolves the configuration and applies command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be loaded or the
    /// overridden configuration is invalid.
    pub fn load_config(&self) -> Result<AdapterConfig> {
        let mut config = AdapterConfig::resolve(self.config.as_deref())
            .context("Failed to load configuration")?;
        self.apply(&mut config);
        config
            .validate()
            .context("Invalid command-line override")?;
        tracing::debug!(target: "cli", config = ?config, "configuration resolved");
        Ok(config)
    }

    fn apply(&self, config: &mut AdapterConfig) {
        if let Some(artifact) = &self.artifact {
            config.artifact.location.clone_from(artifact);
        }
        if let Some(timeout) = self.timeout {
            config.runtime.timeout_secs = timeout;
        }
        if let Some(trim) = self.trim {
            config.lint.trim = trim;
        }
    }
}

fn parse_trim(value: &str) -> Result<TrimPolicy, String> {
    TrimPolicy::parse(value)
        .ok_or_else(|| format!("unknown trim policy '{value}' (expected keep-all or drop-last)"))
}
