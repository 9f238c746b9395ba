//! Relay order and trimming of captured lines.

use crate::utils::{adapter, handle, log_texts};
use vlint_adapter::adapter::STARTING_MESSAGE;
use vlint_adapter::{InboundMessage, OutboundMessage, Severity, SeverityCounts, TrimPolicy};

const WARNING: &str = "%Warning-UNUSEDSIGNAL: top.v:2:8: Signal is not used: 'unused'";
const ERROR: &str = "%Error: top.v:4:10: Can't find definition of variable: 'missing'";
const SUMMARY: &str = "%Error: Exiting due to 1 error(s)";

fn top() -> InboundMessage {
    InboundMessage::lint([("top.v", "module top; endmodule")])
}

#[tokio::test]
async fn lines_are_relayed_in_emission_order() {
    let adapter = adapter("diagnostics", TrimPolicy::KeepAll);
    let messages = handle(&adapter, top()).await;

    assert_eq!(
        messages,
        vec![
            OutboundMessage::log(STARTING_MESSAGE),
            OutboundMessage::log("Verilator lint fixture"),
            OutboundMessage::log(WARNING),
            OutboundMessage::log(ERROR),
            OutboundMessage::log(SUMMARY),
            OutboundMessage::Done,
        ]
    );
}

#[tokio::test]
async fn drop_last_removes_only_the_final_diagnostic() {
    let adapter = adapter("diagnostics", TrimPolicy::DropLast);
    let messages = handle(&adapter, top()).await;

    assert_eq!(
        log_texts(&messages),
        vec![STARTING_MESSAGE, "Verilator lint fixture", WARNING, ERROR]
    );
    assert_eq!(messages.last(), Some(&OutboundMessage::Done));
}

#[tokio::test]
async fn silent_analyzer_yields_only_done() {
    let adapter = adapter("silent", TrimPolicy::KeepAll);
    let messages = handle(&adapter, top()).await;

    assert_eq!(
        messages,
        vec![OutboundMessage::log(STARTING_MESSAGE), OutboundMessage::Done]
    );
}

#[tokio::test]
async fn single_line_is_dropped_entirely_by_drop_last() {
    let keep = adapter("imported_memory", TrimPolicy::KeepAll);
    let drop_last = adapter("imported_memory", TrimPolicy::DropLast);

    let kept = handle(&keep, top()).await;
    let dropped = handle(&drop_last, top()).await;

    assert_eq!(log_texts(&kept), vec![STARTING_MESSAGE, "large"]);
    assert_eq!(
        dropped,
        vec![OutboundMessage::log(STARTING_MESSAGE), OutboundMessage::Done]
    );
}

#[tokio::test]
async fn report_classifies_severities() {
    let adapter = adapter("diagnostics", TrimPolicy::KeepAll);
    let report = adapter.lint(&top().into_request()).await.unwrap();

    assert_eq!(report.output, vec!["Verilator lint fixture"]);
    assert_eq!(
        report.diagnostics[0].severity(),
        Some(Severity::Warning("UNUSEDSIGNAL".to_string()))
    );
    assert_eq!(report.diagnostics[1].severity(), Some(Severity::Error));
    assert!(report.diagnostics[1].mentions("missing"));
    assert_eq!(
        SeverityCounts::tally(&report.diagnostics),
        SeverityCounts {
            errors: 2,
            warnings: 1
        }
    );
    assert!(!report.truncated);
}
