//! Lint command for the vlint CLI.
//!
//! Reads one or more local source files, lints them together in a single
//! analyzer run and prints what the analyzer reported.
//!
//! ## Output
//!
//! Analyzer stdout lines are printed first, then the diagnostics, one per line,
//! on stdout. Unless `--quiet` is given, a one-line summary goes to stderr.
//!
//! ## Exit Codes
//!
//! The process exits with the analyzer's own exit code: `0` when the design is
//! clean, non-zero (Verilator uses `1`) when errors were reported. Failures to
//! load or run the analyzer exit with `1` and an error message.

use anyhow::{Context, Result};
use clap::Args;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use vlint_adapter::{LintAdapter, LintRequest, SeverityCounts};

use super::GlobalArgs;
use crate::errors::VlintError;

/// Arguments for the lint command.
#[derive(Args)]
pub struct LintArgs {
    /// Source files to lint. They are staged under their file names, so two
    /// inputs may not share a name.
    #[clap(required = true, value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// Do not print the summary line on stderr.
    #[clap(short, long, action = clap::ArgAction::SetTrue)]
    pub quiet: bool,
}

/// Executes the lint command.
///
/// # Errors
///
/// Returns an error if an input cannot be read, two inputs share a file name,
/// the analyzer cannot be loaded, or it faults or times out. A non-zero
/// analyzer exit is returned as [`VlintError::ProcessExitCode`].
pub async fn execute(args: &LintArgs, global: &GlobalArgs) -> Result<()> {
    let config = global.load_config()?;
    let request = read_sources(&args.files).await?;

    let adapter = LintAdapter::from_config(&config)?;
    let report = adapter.lint(&request).await.context("Lint failed")?;

    let mut stdout = std::io::stdout().lock();
    for line in report.relay_lines() {
        writeln!(stdout, "{line}")?;
    }
    stdout.flush()?;

    if !args.quiet {
        let counts = SeverityCounts::tally(&report.diagnostics);
        eprintln!(
            "{} file(s) linted: {} error(s), {} warning(s)",
            report.files.len(),
            counts.errors,
            counts.warnings
        );
        if report.truncated {
            eprintln!("warning: analyzer output was truncated at the capture limit");
        }
    }

    if report.exit_code != 0 {
        return Err(VlintError::process_exit_code(report.exit_code).into());
    }
    Ok(())
}

/// Reads every input into a request keyed by file name.
async fn read_sources(paths: &[PathBuf]) -> Result<LintRequest> {
    let mut request = LintRequest::new();
    let mut seen = HashSet::new();

    for path in paths {
        let name = staged_name(path)?;
        if !seen.insert(name.clone()) {
            return Err(VlintError::invalid_arguments(format!(
                "more than one input is named '{name}'"
            ))
            .into());
        }
        if !path.is_file() {
            return Err(VlintError::file_not_found(path).into());
        }
        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        request.insert(name, content);
    }
    Ok(request)
}

fn staged_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            VlintError::invalid_arguments(format!("{} has no file name", path.display())).into()
        })
}
