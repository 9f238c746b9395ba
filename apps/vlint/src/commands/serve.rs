//! Serve command for the vlint CLI.
//!
//! Runs the lint worker with stdio as its message channel, so an editor or
//! build tool can keep one analyzer loaded across many requests.
//!
//! ## Protocol
//!
//! Each stdin line is one inbound JSON message and each stdout line one
//! outbound JSON message:
//!
//! ```text
//! → {"type":"lint","files":{"top.v":"module top; endmodule\n"}}
//! ← {"type":"log","text":"Worker: Starting linting process..."}
//! ← {"type":"done"}
//! ```
//!
//! Blank lines are skipped. Lines that do not parse are logged and skipped;
//! they produce no outbound message. The command exits once stdin is closed
//! and every queued request has been answered.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::sync::mpsc::Sender;
use vlint_adapter::protocol::{decode_inbound, encode_outbound};
use vlint_adapter::{InboundMessage, LintAdapter, Worker};

use super::GlobalArgs;

/// Executes the serve command.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the worker cannot be
/// started, or stdout cannot be written.
pub fn execute(global: &GlobalArgs) -> Result<()> {
    let config = global.load_config()?;
    let adapter = LintAdapter::from_config(&config)?;
    let mut worker = Worker::spawn(adapter).context("Failed to start lint worker")?;

    // Only the stdin reader keeps the request queue open from here on.
    let requests = worker.sender()?;
    worker.close();

    std::thread::Builder::new()
        .name("vlint-stdin".to_string())
        .spawn(move || forward_requests(std::io::stdin().lock(), &requests))
        .context("Failed to spawn stdin reader")?;

    let mut stdout = std::io::stdout().lock();
    for message in worker.events() {
        let line = encode_outbound(&message)?;
        writeln!(stdout, "{line}").context("Failed to write to stdout")?;
        stdout.flush().context("Failed to write to stdout")?;
    }

    tracing::debug!(target: "serve", "worker finished, exiting");
    Ok(())
}

/// Decodes request lines from `input` until EOF or until the worker stops.
///
/// Returns the number of requests forwarded.
fn forward_requests(input: impl BufRead, requests: &Sender<InboundMessage>) -> usize {
    let mut forwarded = 0;
    for (index, line) in input.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(target: "serve", error = %e, "failed to read stdin");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match decode_inbound(&line) {
            Ok(message) => {
                if requests.send(message).is_err() {
                    break;
                }
                forwarded += 1;
            }
            Err(e) => {
                tracing::warn!(target: "serve", line = index + 1, error = %e, "ignoring malformed message");
            }
        }
    }
    forwarded
}
