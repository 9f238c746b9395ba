//! Message contract between the worker and its host.
//!
//! Messages are JSON objects discriminated by a `type` field:
//!
//! ```text
//! host → worker   { "type": "lint", "files": { "top.v": "module top; endmodule" } }
//! worker → host   { "type": "log", "text": "%Warning-..." }
//! worker → host   { "type": "done" }
//! ```
//!
//! Over a byte stream each message occupies exactly one line (JSON lines).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::sync::mpsc;

use crate::vfs::LintRequest;

/// Host → worker message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundMessage {
    /// Lint the given files together; keys are file names, values source text.
    Lint { files: IndexMap<String, String> },
}

impl InboundMessage {
    /// Builds a lint message from `(name, text)` pairs.
    pub fn lint<N, T>(files: impl IntoIterator<Item = (N, T)>) -> Self
    where
        N: Into<String>,
        T: Into<String>,
    {
        Self::Lint {
            files: files
                .into_iter()
                .map(|(name, text)| (name.into(), text.into()))
                .collect(),
        }
    }

    /// Converts the message payload into a [`LintRequest`].
    #[must_use]
    pub fn into_request(self) -> LintRequest {
        match self {
            Self::Lint { files } => files
                .into_iter()
                .map(|(name, text)| (name, text.into_bytes()))
                .collect(),
        }
    }
}

/// Worker → host message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    /// One line of output for the host to display.
    Log { text: String },
    /// The analyzer finished; no more lines follow for this request.
    Done,
}

impl OutboundMessage {
    #[must_use]
    pub fn log(text: impl Into<String>) -> Self {
        Self::Log { text: text.into() }
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Log { text } => Some(text),
            Self::Done => None,
        }
    }
}

/// Parses one JSON line into an inbound message.
///
/// # Errors
///
/// Returns the `serde_json` error for malformed JSON or unknown `type` values.
pub fn decode_inbound(line: &str) -> Result<InboundMessage, serde_json::Error> {
    serde_json::from_str(line.trim_end_matches(['\r', '\n']))
}

/// Serializes an outbound message as a single JSON line (without newline).
///
/// # Errors
///
/// Returns the `serde_json` error; this cannot happen for well-formed strings.
pub fn encode_outbound(message: &OutboundMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}

/// Destination for outbound messages.
pub trait Relay {
    fn post(&self, message: OutboundMessage);

    fn log(&self, text: impl Into<String>)
    where
        Self: Sized,
    {
        self.post(OutboundMessage::log(text));
    }
}

impl Relay for mpsc::Sender<OutboundMessage> {
    fn post(&self, message: OutboundMessage) {
        // A dropped receiver means the host went away; nothing left to tell.
        let _ = self.send(message);
    }
}

impl Relay for Mutex<Vec<OutboundMessage>> {
    fn post(&self, message: OutboundMessage) {
        self.lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(message);
    }
}
