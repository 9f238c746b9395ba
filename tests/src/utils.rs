use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use vlint_adapter::config::RuntimeConfig;
use vlint_adapter::{
    AnalyzerRuntime, ArtifactFetcher, ArtifactSource, InboundMessage, LintAdapter,
    OutboundMessage, TrimPolicy,
};

pub(crate) fn get_test_data_path() -> PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::current_dir().unwrap());
    manifest_dir.join("test_data")
}

/// Path of `test_data/analyzers/<name>.wat`.
pub(crate) fn analyzer_path(name: &str) -> PathBuf {
    get_test_data_path()
        .join("analyzers")
        .join(format!("{name}.wat"))
}

/// Adapter over a fixture analyzer with default runtime limits.
pub(crate) fn adapter(name: &str, trim: TrimPolicy) -> LintAdapter {
    adapter_with(name, &RuntimeConfig::default(), trim)
}

pub(crate) fn adapter_with(name: &str, config: &RuntimeConfig, trim: TrimPolicy) -> LintAdapter {
    let fetcher = ArtifactFetcher::new(ArtifactSource::Path(analyzer_path(name)));
    let runtime = AnalyzerRuntime::new(fetcher, config).expect("Should create runtime");
    LintAdapter::new(Arc::new(runtime), trim)
}

/// Runs one message through [`LintAdapter::handle`] and returns what it posted.
pub(crate) async fn handle(adapter: &LintAdapter, message: InboundMessage) -> Vec<OutboundMessage> {
    let relay = Mutex::new(Vec::new());
    adapter.handle(message, &relay).await;
    relay.into_inner().unwrap()
}

/// Texts of the `log` messages, in order.
pub(crate) fn log_texts(messages: &[OutboundMessage]) -> Vec<&str> {
    messages.iter().filter_map(OutboundMessage::text).collect()
}

pub(crate) fn done_count(messages: &[OutboundMessage]) -> usize {
    messages
        .iter()
        .filter(|m| matches!(m, OutboundMessage::Done))
        .count()
}
