//! Background lint worker.
//!
//! The worker owns a [`LintAdapter`] on a dedicated thread with its own
//! single-threaded Tokio runtime. Requests are processed strictly one at a
//! time in arrival order; while the analyzer runs, later requests wait in the
//! queue. Outbound messages are delivered on a channel the host drains.
//!
//! Once every request sender is gone (the [`Worker`] itself and any clones
//! from [`Worker::sender`]), the thread finishes the queued requests and
//! exits. [`Worker::shutdown`] waits for that to happen.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::runtime::Runtime;

use crate::adapter::LintAdapter;
use crate::errors::LintError;
use crate::protocol::{InboundMessage, OutboundMessage, Relay};

/// Status line posted when the worker thread starts.
pub const INITIALIZING_MESSAGE: &str = "Worker: Initializing...";

/// Host-side handle to a running worker.
pub struct Worker {
    requests: Option<Sender<InboundMessage>>,
    events: Receiver<OutboundMessage>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Starts the worker thread around `adapter`.
    ///
    /// # Errors
    ///
    /// Returns [`LintError::Io`] if the thread or its runtime cannot be
    /// created.
    pub fn spawn(adapter: LintAdapter) -> Result<Self, LintError> {
        let (request_tx, request_rx) = mpsc::channel::<InboundMessage>();
        let (event_tx, event_rx) = mpsc::channel::<OutboundMessage>();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| LintError::io("failed to create worker runtime", e))?;

        let handle = std::thread::Builder::new()
            .name("vlint-worker".to_string())
            .spawn(move || {
                event_tx.log(INITIALIZING_MESSAGE);
                serve(&runtime, &adapter, &request_rx, &event_tx);
            })
            .map_err(|e| LintError::io("failed to spawn worker thread", e))?;

        Ok(Self {
            requests: Some(request_tx),
            events: event_rx,
            handle: Some(handle),
        })
    }

    /// Queues a message for the worker.
    ///
    /// # Errors
    ///
    /// Returns [`LintError::WorkerClosed`] if the worker has stopped.
    pub fn post(&self, message: InboundMessage) -> Result<(), LintError> {
        self.requests
            .as_ref()
            .ok_or(LintError::WorkerClosed)?
            .send(message)
            .map_err(|_| LintError::WorkerClosed)
    }

    /// A cloneable sender for posting from other threads.
    ///
    /// # Errors
    ///
    /// Returns [`LintError::WorkerClosed`] after [`Worker::close`].
    pub fn sender(&self) -> Result<Sender<InboundMessage>, LintError> {
        self.requests.clone().ok_or(LintError::WorkerClosed)
    }

    /// Blocks until the next outbound message, or `None` once the worker has
    /// exited and every message was delivered.
    #[must_use]
    pub fn recv(&self) -> Option<OutboundMessage> {
        self.events.recv().ok()
    }

    /// Like [`Worker::recv`] but gives up after `timeout`.
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<OutboundMessage> {
        match self.events.recv_timeout(timeout) {
            Ok(message) => Some(message),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Iterates over outbound messages until the worker exits.
    pub fn events(&self) -> impl Iterator<Item = OutboundMessage> + '_ {
        self.events.iter()
    }

    /// Stops accepting requests; queued ones still run.
    pub fn close(&mut self) {
        self.requests = None;
    }

    /// Closes the queue, waits for the thread, and returns undelivered messages.
    #[must_use]
    pub fn shutdown(mut self) -> Vec<OutboundMessage> {
        self.close();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::error!(target: "worker", "worker thread panicked");
        }
        self.events.try_iter().collect()
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // Detached; clones from `sender()` may still feed the thread.
        self.requests = None;
    }
}

/// Worker loop: one request at a time until the request channel closes.
///
/// Waiting for the next request happens outside the runtime; each request is
/// driven to completion by its own `block_on`.
fn serve(
    runtime: &Runtime,
    adapter: &LintAdapter,
    requests: &Receiver<InboundMessage>,
    events: &Sender<OutboundMessage>,
) {
    for message in requests {
        tracing::debug!(target: "worker", "received request");
        runtime.block_on(adapter.handle(message, events));
    }
    tracing::debug!(target: "worker", "request channel closed, worker exiting");
}
