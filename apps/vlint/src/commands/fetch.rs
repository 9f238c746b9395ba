//! Fetch command for the vlint CLI.
//!
//! Resolves the configured analyzer binary, verifies it against the pinned
//! digest, stores URL downloads in the cache and compiles the module once to
//! make sure it is usable. Handy for warming the cache before going offline.

use anyhow::{Context, Result};
use clap::Args;
use std::sync::Arc;
use vlint_adapter::artifact::sha256_hex;
use vlint_adapter::{AnalyzerRuntime, ArtifactFetcher, ArtifactSource};

use super::GlobalArgs;

/// Arguments for the fetch command.
#[derive(Args)]
pub struct FetchArgs {
    /// Only download and verify; skip compiling the module.
    #[clap(long, action = clap::ArgAction::SetTrue)]
    pub no_compile: bool,
}

/// Executes the fetch command.
///
/// # Errors
///
/// Returns an error if the binary cannot be fetched, fails verification, or
/// does not compile.
pub async fn execute(args: &FetchArgs, global: &GlobalArgs) -> Result<()> {
    let config = global.load_config()?;
    let fetcher = ArtifactFetcher::from_config(&config.artifact);
    let location = fetcher.source().describe();

    let bytes = fetcher
        .fetch()
        .await
        .with_context(|| format!("Failed to fetch analyzer from {location}"))?;
    let digest = sha256_hex(&bytes);
    let size = bytes.len();

    if !args.no_compile {
        let runtime = AnalyzerRuntime::new(
            ArtifactFetcher::new(ArtifactSource::Bytes(Arc::from(bytes))),
            &config.runtime,
        )?;
        runtime.module().await.context("Analyzer did not compile")?;
    }

    println!("{location}");
    println!("  size:   {size} bytes");
    println!("  sha256: {digest}");
    if let Some(dir) = config.artifact.resolved_cache_dir()
        && matches!(fetcher.source(), ArtifactSource::Url(_))
    {
        println!("  cache:  {}", dir.display());
    }
    if !args.no_compile {
        println!("  status: compiled");
    }
    Ok(())
}
