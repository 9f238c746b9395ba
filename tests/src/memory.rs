//! Linear memory sizing for analyzers that import their memory.

use std::sync::Arc;

use crate::utils::{adapter, adapter_with};
use vlint_adapter::config::RuntimeConfig;
use vlint_adapter::{
    AnalyzerRuntime, ArtifactFetcher, ArtifactSource, LintAdapter, LintError, LintRequest,
    TrimPolicy,
};

fn request() -> LintRequest {
    LintRequest::new().with_source("top.v", "module top; endmodule")
}

#[tokio::test]
async fn imported_memory_starts_at_the_configured_size() {
    let adapter = adapter("imported_memory", TrimPolicy::KeepAll);
    let report = adapter.lint(&request()).await.unwrap();
    assert_eq!(report.diagnostics[0].text(), "large");
}

#[tokio::test]
async fn smaller_initial_memory_is_honoured() {
    let config = RuntimeConfig {
        initial_memory_pages: 16,
        maximum_memory_pages: 64,
        ..RuntimeConfig::default()
    };
    let adapter = adapter_with("imported_memory", &config, TrimPolicy::KeepAll);
    let report = adapter.lint(&request()).await.unwrap();
    assert_eq!(report.diagnostics[0].text(), "small");
}

#[tokio::test]
async fn initial_size_may_equal_the_ceiling() {
    let config = RuntimeConfig {
        initial_memory_pages: 64,
        maximum_memory_pages: 64,
        ..RuntimeConfig::default()
    };
    let adapter = adapter_with("imported_memory", &config, TrimPolicy::KeepAll);
    let report = adapter.lint(&request()).await.unwrap();
    assert_eq!(report.diagnostics[0].text(), "small");
}

#[tokio::test]
async fn output_past_the_capture_limit_is_cut() {
    let config = RuntimeConfig {
        initial_memory_pages: 1,
        maximum_memory_pages: 1,
        capture_limit: 1,
        ..RuntimeConfig::default()
    };
    let adapter = adapter_with("imported_memory", &config, TrimPolicy::KeepAll);
    let report = adapter.lint(&request()).await.unwrap();
    assert!(report.truncated);
    assert_eq!(report.diagnostics[0].text(), "s");
}

#[tokio::test]
async fn runaway_output_is_held_to_the_capture_limit() {
    let config = RuntimeConfig {
        timeout_secs: 0,
        capture_limit: 10,
        ..RuntimeConfig::default()
    };
    let adapter = adapter_with("flood", &config, TrimPolicy::KeepAll);
    let report = adapter.lint(&request()).await.unwrap();

    assert_eq!(report.exit_code, 0);
    assert!(report.truncated);
    let texts: Vec<&str> = report.diagnostics.iter().map(|d| d.text()).collect();
    assert_eq!(texts, vec!["x".repeat(10)]);
}

#[tokio::test]
async fn missing_entry_point_is_an_instantiation_error() {
    let tmp = tempfile::Builder::new().suffix(".wat").tempfile().unwrap();
    std::fs::write(tmp.path(), "(module (memory (export \"memory\") 1))").unwrap();

    let fetcher = ArtifactFetcher::new(ArtifactSource::Path(tmp.path().to_path_buf()));
    let runtime = AnalyzerRuntime::new(fetcher, &RuntimeConfig::default()).unwrap();
    let adapter = LintAdapter::new(Arc::new(runtime), TrimPolicy::KeepAll);

    let err = adapter.lint(&request()).await.unwrap_err();
    assert!(matches!(err, LintError::Instantiate { .. }));
}
