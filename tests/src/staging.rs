//! Staging and argument construction.

use crate::utils::{adapter, handle, log_texts};
use vlint_adapter::adapter::STARTING_MESSAGE;
use vlint_adapter::{InboundMessage, LINT_FLAGS, LintError, LintRequest, TrimPolicy};

#[tokio::test]
async fn every_buffer_is_named_once_after_the_flags() {
    let adapter = adapter("echo_args", TrimPolicy::KeepAll);
    let request = LintRequest::new()
        .with_source("top.v", "module top; endmodule")
        .with_source("alu.v", "module alu; endmodule")
        .with_source("pkg.sv", "package pkg; endpackage");

    let report = adapter.lint(&request).await.unwrap();

    assert_eq!(report.exit_code, 0);
    assert_eq!(report.files, vec!["top.v", "alu.v", "pkg.sv"]);
    let args: Vec<&str> = report.diagnostics.iter().map(|d| d.text()).collect();
    let expected: Vec<&str> = LINT_FLAGS
        .iter()
        .copied()
        .chain(["top.v", "alu.v", "pkg.sv"])
        .collect();
    assert_eq!(args, expected);
}

#[tokio::test]
async fn analyzer_reads_staged_contents() {
    let adapter = adapter("cat_sources", TrimPolicy::KeepAll);
    let request = LintRequest::new()
        .with_source("top.v", "module top;\n  alu u_alu();\nendmodule")
        .with_source("alu.v", "module alu; endmodule");

    let report = adapter.lint(&request).await.unwrap();

    assert_eq!(report.exit_code, 0);
    let lines: Vec<&str> = report.diagnostics.iter().map(|d| d.text()).collect();
    assert_eq!(
        lines,
        vec!["module top;", "  alu u_alu();", "endmodule", "module alu; endmodule"]
    );
}

#[tokio::test]
async fn later_request_sees_its_own_contents() {
    let adapter = adapter("cat_sources", TrimPolicy::KeepAll);

    let first = LintRequest::new().with_source("top.v", "module first; endmodule");
    let second = LintRequest::new().with_source("top.v", "module second; endmodule");

    let report = adapter.lint(&first).await.unwrap();
    assert_eq!(report.diagnostics[0].text(), "module first; endmodule");
    let report = adapter.lint(&second).await.unwrap();
    assert_eq!(report.diagnostics[0].text(), "module second; endmodule");
}

#[tokio::test]
async fn empty_and_non_ascii_buffers_are_staged() {
    let adapter = adapter("cat_sources", TrimPolicy::KeepAll);
    let request = LintRequest::new()
        .with_source("empty.v", "")
        .with_source("notes.v", "// große Änderung\nmodule notes; endmodule");

    let report = adapter.lint(&request).await.unwrap();

    let lines: Vec<&str> = report.diagnostics.iter().map(|d| d.text()).collect();
    assert_eq!(
        lines,
        vec!["", "// große Änderung", "module notes; endmodule"]
    );
}

#[tokio::test]
async fn invalid_name_is_rejected_before_the_analyzer_runs() {
    let adapter = adapter("echo_args", TrimPolicy::KeepAll);
    let request = LintRequest::new()
        .with_source("top.v", "")
        .with_source("rtl/alu.v", "");

    let err = adapter.lint(&request).await.unwrap_err();
    assert!(matches!(err, LintError::InvalidSourceName { .. }));
    assert_eq!(adapter.runtime().stats().fetches, 0);
}

#[tokio::test]
async fn dash_prefixed_name_never_reaches_the_argument_list() {
    let adapter = adapter("echo_args", TrimPolicy::KeepAll);
    let request = LintRequest::new()
        .with_source("-Wno-fatal", "")
        .with_source("top.v", "");

    let err = adapter.lint(&request).await.unwrap_err();
    match err {
        LintError::InvalidSourceName { name, .. } => assert_eq!(name, "-Wno-fatal"),
        other => panic!("expected invalid source name, got {other:?}"),
    }
    assert_eq!(adapter.runtime().stats().fetches, 0);

    let messages = handle(&adapter, InboundMessage::lint([("-f", ""), ("top.v", "")])).await;
    let texts = log_texts(&messages);
    assert_eq!(texts.len(), 2);
    assert!(texts[1].starts_with("Worker: invalid source name \"-f\""));
}

#[tokio::test]
async fn empty_message_logs_an_error_without_done() {
    let adapter = adapter("echo_args", TrimPolicy::KeepAll);
    let messages = handle(&adapter, InboundMessage::lint(Vec::<(String, String)>::new())).await;

    assert_eq!(
        log_texts(&messages),
        vec![
            STARTING_MESSAGE,
            "Worker: lint request contains no source files"
        ]
    );
}
