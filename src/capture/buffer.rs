//! Response buffer fed by the browser driver's event dispatch
//!
//! The driver owns a [`ResponseSink`] and pushes every network response it
//! observes; the step loop owns the matching [`ResponseBuffer`] and drains
//! it at its own suspension points. Arrival order is preserved. The step
//! loop is the single consumer, so no further synchronization is needed.

use super::types::{CapturedResponse, Preprocessor};
use tokio::sync::mpsc;
use tracing::debug;

/// Create a connected sink/buffer pair
pub fn response_channel() -> (ResponseSink, ResponseBuffer) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ResponseSink { tx }, ResponseBuffer {
        rx,
        responses: Vec::new(),
    })
}

/// Producer half handed to the browser driver
#[derive(Clone)]
pub struct ResponseSink {
    tx: mpsc::UnboundedSender<CapturedResponse>,
}

impl ResponseSink {
    /// Push one captured response. Silently drops when the analysis job
    /// has already finished and the buffer is gone.
    pub fn push(&self, response: CapturedResponse) {
        if self.tx.send(response).is_err() {
            debug!("response buffer closed, dropping captured response");
        }
    }
}

/// Consumer half owned by the step loop
pub struct ResponseBuffer {
    rx: mpsc::UnboundedReceiver<CapturedResponse>,
    responses: Vec<CapturedResponse>,
}

impl ResponseBuffer {
    /// Pull every response that arrived since the last drain. Returns the
    /// number of newly buffered responses.
    pub fn drain_new(&mut self) -> usize {
        let mut count = 0;
        while let Ok(response) = self.rx.try_recv() {
            self.responses.push(response);
            count += 1;
        }
        count
    }

    /// All responses captured so far, in arrival order
    pub fn responses(&self) -> &[CapturedResponse] {
        &self.responses
    }

    /// Number of buffered responses
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    /// True when nothing has been captured yet
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// Attach a preprocessor to a buffered response
    pub fn attach_preprocessor(&mut self, index: usize, preprocessor: Preprocessor) {
        if let Some(response) = self.responses.get_mut(index) {
            response.attach_preprocessor(preprocessor);
        }
    }

    /// Take ownership of a buffered response by index
    pub fn take(&mut self, index: usize) -> Option<CapturedResponse> {
        if index < self.responses.len() {
            Some(self.responses.remove(index))
        } else {
            None
        }
    }
}
