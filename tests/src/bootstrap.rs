//! One-time loading of the analyzer binary.

use std::sync::Arc;

use crate::utils::{adapter, analyzer_path};
use vlint_adapter::artifact::sha256_hex;
use vlint_adapter::config::RuntimeConfig;
use vlint_adapter::{
    AnalyzerRuntime, ArtifactFetcher, ArtifactSource, LintAdapter, LintError, LintRequest,
    LoadStats, LoadStatus, TrimPolicy,
};

fn request(name: &str) -> LintRequest {
    LintRequest::new().with_source(name, "module top; endmodule")
}

fn adapter_for(fetcher: ArtifactFetcher) -> LintAdapter {
    let runtime = AnalyzerRuntime::new(fetcher, &RuntimeConfig::default()).unwrap();
    LintAdapter::new(Arc::new(runtime), TrimPolicy::KeepAll)
}

#[tokio::test]
async fn concurrent_first_requests_load_once() {
    let adapter = adapter("echo_args", TrimPolicy::KeepAll);
    let first = request("a.v");
    let second = request("b.v");

    let (a, b) = tokio::join!(adapter.lint(&first), adapter.lint(&second));

    assert_eq!(a.unwrap().files, vec!["a.v"]);
    assert_eq!(b.unwrap().files, vec!["b.v"]);
    assert_eq!(
        adapter.runtime().stats(),
        LoadStats {
            fetches: 1,
            compiles: 1
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_loads_across_threads_load_once() {
    let adapter = adapter("silent", TrimPolicy::KeepAll);

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let adapter = adapter.clone();
            tokio::spawn(async move { adapter.lint(&request(&format!("m{i}.v"))).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(adapter.runtime().stats().compiles, 1);
    assert_eq!(adapter.runtime().stats().fetches, 1);
}

#[tokio::test]
async fn failed_load_is_retried_by_the_next_request() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("verilator_bin.wasm");
    let adapter = adapter_for(ArtifactFetcher::new(ArtifactSource::Path(path.clone())));

    let err = adapter.lint(&request("top.v")).await.unwrap_err();
    assert!(err.is_load_failure());
    assert_eq!(adapter.runtime().status(), LoadStatus::Failed);

    std::fs::copy(analyzer_path("silent"), &path).unwrap();
    adapter.lint(&request("top.v")).await.unwrap();

    assert_eq!(adapter.runtime().status(), LoadStatus::Loaded);
    assert_eq!(
        adapter.runtime().stats(),
        LoadStats {
            fetches: 2,
            compiles: 1
        }
    );
}

#[tokio::test]
async fn pinned_digest_must_match() {
    let path = analyzer_path("silent");
    let digest = sha256_hex(&std::fs::read(&path).unwrap());

    let pinned =
        adapter_for(ArtifactFetcher::new(ArtifactSource::Path(path.clone())).with_sha256(&digest));
    pinned.lint(&request("top.v")).await.unwrap();

    let wrong =
        adapter_for(ArtifactFetcher::new(ArtifactSource::Path(path)).with_sha256("0".repeat(64)));
    let err = wrong.lint(&request("top.v")).await.unwrap_err();
    assert!(matches!(err, LintError::ChecksumMismatch { .. }));
    assert_eq!(wrong.runtime().stats().compiles, 0);
}

#[tokio::test]
async fn invalid_binary_is_a_compile_error() {
    let adapter = adapter_for(ArtifactFetcher::new(ArtifactSource::Bytes(Arc::from(
        &b"\0asm\x01\0\0\0garbage"[..],
    ))));
    let err = adapter.lint(&request("top.v")).await.unwrap_err();
    assert!(matches!(err, LintError::Compile { .. }));
    assert_eq!(adapter.runtime().status(), LoadStatus::Failed);
}

#[tokio::test]
async fn artifact_size_is_recorded() {
    let path = analyzer_path("silent");
    let expected = std::fs::metadata(&path).unwrap().len();
    let adapter = adapter_for(ArtifactFetcher::new(ArtifactSource::Path(path)));

    adapter.runtime().module().await.unwrap();
    assert_eq!(adapter.runtime().artifact_len() as u64, expected);
}
