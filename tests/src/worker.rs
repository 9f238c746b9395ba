//! The background worker and its message stream.

use std::time::Duration;

use crate::utils::{adapter, done_count, log_texts};
use vlint_adapter::adapter::STARTING_MESSAGE;
use vlint_adapter::worker::INITIALIZING_MESSAGE;
use vlint_adapter::{InboundMessage, LintError, OutboundMessage, TrimPolicy, Worker};

const WAIT: Duration = Duration::from_secs(30);

/// Collects messages up to and including the next `done`, or until `WAIT`
/// passes without one.
fn until_done(worker: &Worker) -> Vec<OutboundMessage> {
    let mut messages = Vec::new();
    while let Some(message) = worker.recv_timeout(WAIT) {
        let finished = message == OutboundMessage::Done;
        messages.push(message);
        if finished {
            break;
        }
    }
    messages
}

#[test]
fn worker_announces_itself_then_answers() {
    let worker = Worker::spawn(adapter("diagnostics", TrimPolicy::KeepAll)).unwrap();
    worker
        .post(InboundMessage::lint([("top.v", "module top; endmodule")]))
        .unwrap();

    let messages = until_done(&worker);
    let texts = log_texts(&messages);
    assert_eq!(texts[0], INITIALIZING_MESSAGE);
    assert_eq!(texts[1], STARTING_MESSAGE);
    assert_eq!(texts.last(), Some(&"%Error: Exiting due to 1 error(s)"));
    assert_eq!(messages.last(), Some(&OutboundMessage::Done));
}

#[test]
fn requests_are_answered_one_at_a_time_in_order() {
    let worker = Worker::spawn(adapter("echo_args", TrimPolicy::KeepAll)).unwrap();
    worker.post(InboundMessage::lint([("first.v", "")])).unwrap();
    worker.post(InboundMessage::lint([("second.v", "")])).unwrap();

    let first = until_done(&worker);
    let second = until_done(&worker);

    assert_eq!(log_texts(&first).last(), Some(&"first.v"));
    assert_eq!(log_texts(&second).last(), Some(&"second.v"));
    assert!(!log_texts(&first).contains(&"second.v"));
    assert_eq!(done_count(&second), 1);
}

#[test]
fn worker_keeps_serving_after_a_bad_request() {
    let worker = Worker::spawn(adapter("silent", TrimPolicy::KeepAll)).unwrap();
    worker.post(InboundMessage::lint([("../escape.v", "")])).unwrap();
    worker.post(InboundMessage::lint([("top.v", "")])).unwrap();

    let messages = until_done(&worker);
    let texts = log_texts(&messages);
    assert!(texts.iter().any(|t| t.starts_with("Worker: invalid source name")));
    assert_eq!(done_count(&messages), 1);
}

#[test]
fn shutdown_drains_queued_requests() {
    let worker = Worker::spawn(adapter("silent", TrimPolicy::KeepAll)).unwrap();
    worker.post(InboundMessage::lint([("a.v", "")])).unwrap();
    worker.post(InboundMessage::lint([("b.v", "")])).unwrap();

    let messages = worker.shutdown();
    assert_eq!(done_count(&messages), 2);
    assert_eq!(messages[0], OutboundMessage::log(INITIALIZING_MESSAGE));
}

#[test]
fn closed_worker_refuses_requests() {
    let mut worker = Worker::spawn(adapter("silent", TrimPolicy::KeepAll)).unwrap();
    worker.close();

    let err = worker
        .post(InboundMessage::lint([("top.v", "")]))
        .unwrap_err();
    assert!(matches!(err, LintError::WorkerClosed));
    assert!(worker.sender().is_err());
    assert_eq!(worker.events().count(), 1);
}

#[test]
fn sender_clones_post_from_other_threads() {
    let mut worker = Worker::spawn(adapter("silent", TrimPolicy::KeepAll)).unwrap();
    let sender = worker.sender().unwrap();
    worker.close();

    std::thread::spawn(move || {
        for name in ["a.v", "b.v", "c.v"] {
            sender.send(InboundMessage::lint([(name, "")])).unwrap();
        }
    })
    .join()
    .unwrap();

    let messages: Vec<_> = worker.events().collect();
    assert_eq!(done_count(&messages), 3);
}
