#![warn(clippy::pedantic)]

//! # vlint
//!
//! Command-line front end for the Verilator lint adapter. The analyzer is a
//! WebAssembly build of Verilator executed in-process through wasmtime, so no
//! native Verilator installation is needed.
//!
//! ## Subcommands
//!
//! - `lint` - Lint local source files and print the diagnostics
//! - `serve` - Run the lint worker over stdio using JSON lines
//! - `fetch` - Fetch, verify and compile the analyzer binary
//!
//! ## Examples
//!
//! Lint two files together:
//! ```bash
//! vlint lint rtl/top.v rtl/alu.v
//! ```
//!
//! Use a downloaded analyzer with a pinned checksum via `vlint.toml`:
//! ```bash
//! vlint fetch --artifact https://example.com/verilator_bin.wasm
//! ```
//!
//! Drive the worker from another process:
//! ```bash
//! echo '{"type":"lint","files":{"top.v":"module top; endmodule"}}' | vlint serve
//! ```

mod commands;
mod errors;
mod logging;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{GlobalArgs, fetch, lint, serve};
use errors::VlintError;

/// Verilator linting through WebAssembly.
#[derive(Parser)]
#[command(
    name = "vlint",
    author,
    version,
    about = "Lint Verilog with a WebAssembly build of Verilator",
    long_about = "vlint runs a WASI build of Verilator in lint-only mode over your source files \
    and reports its diagnostics. The analyzer binary is loaded once per process.",
    after_help = "\
ANALYZER RESOLUTION:
    The analyzer binary is located using the following priority order:
    1. --artifact command-line option
    2. VLINT_ARTIFACT environment variable
    3. [artifact] location in the configuration file
    4. ./verilator_bin.wasm

ENVIRONMENT VARIABLES:
    VLINT_CONFIG            Configuration file (default: ./vlint.toml)
    VLINT_ARTIFACT          Analyzer binary path or URL
    VLINT_LOG_LEVEL         Log verbosity (default: warn)
    VLINT_LOG_FORMAT        Log format: auto, text or json
    RUST_LOG                Full tracing filter, overrides the log level"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the vlint CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// Lint source files.
    ///
    /// All files are linted together in one analyzer run, so modules in one
    /// file can reference modules in another. Exits with the analyzer's exit
    /// code.
    Lint(lint::LintArgs),

    /// Run the lint worker over stdio.
    ///
    /// Reads one JSON request per stdin line and writes one JSON message per
    /// stdout line until stdin is closed.
    Serve,

    /// Fetch and verify the analyzer binary.
    ///
    /// Downloads (or reads) the configured binary, checks its digest, caches
    /// downloads and compiles it once.
    Fetch(fetch::FetchArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let exit_code = handle_error(&e);
        std::process::exit(exit_code);
    }
}

/// Handles an error and returns the appropriate exit code.
///
/// For `ProcessExitCode` errors, returns the embedded exit code without
/// printing an error message (the diagnostics were already printed).
/// For all other errors, prints the error and returns exit code 1.
fn handle_error(e: &anyhow::Error) -> i32 {
    if let Some(VlintError::ProcessExitCode { code }) = e.downcast_ref::<VlintError>() {
        return *code;
    }
    eprintln!("Error: {e:?}");
    1
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(logging::LogOptions::resolve(
        cli.global.log_format,
        cli.global.log_level,
    ));

    match cli.command {
        Commands::Lint(args) => lint::execute(&args, &cli.global).await,
        Commands::Serve => serve::execute(&cli.global),
        Commands::Fetch(args) => fetch::execute(&args, &cli.global).await,
    }
}
