//! Mock transport for testing.
//!
//! Allows queueing responses and capturing sent requests for verification.
//! Responses can be held back to simulate a slow server.

use super::{Request, Transport, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

#[derive(Debug, Clone)]
enum MockResponse {
    Json(Value),
    Status(u16, String),
}

/// Mock transport for testing.
///
/// Allows queueing responses and capturing sent requests for verification.
#[derive(Debug)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
    gate: Arc<watch::Sender<bool>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    requests: Vec<Request>,
    responses: VecDeque<MockResponse>,
    fail_next: Option<String>,
}

impl MockTransport {
    /// Create a new mock transport with responses flowing freely.
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            inner: Arc::new(Mutex::new(MockTransportInner::default())),
            gate: Arc::new(gate),
        }
    }

    /// Queue a JSON body to be returned by the next `execute()` call.
    pub fn queue_json(&self, body: Value) {
        let mut inner = self.inner.lock().unwrap();
        inner.responses.push_back(MockResponse::Json(body));
    }

    /// Queue a non-success status for the next `execute()` call.
    pub fn queue_status(&self, status: u16, body: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .responses
            .push_back(MockResponse::Status(status, body.to_string()));
    }

    /// Cause the next `execute()` to fail with a connection error.
    pub fn fail_next(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next = Some(error.to_string());
    }

    /// Get all requests that were sent.
    pub fn requests(&self) -> Vec<Request> {
        let inner = self.inner.lock().unwrap();
        inner.requests.clone()
    }

    /// Get the last request that was sent.
    pub fn last_request(&self) -> Option<Request> {
        let inner = self.inner.lock().unwrap();
        inner.requests.last().cloned()
    }

    /// Number of requests sent so far.
    pub fn request_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.requests.len()
    }

    /// Park every `execute()` call after it is recorded until [`release`](Self::release).
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    /// Let parked and future `execute()` calls complete.
    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    /// Clear all state (requests, queue, failures) and release the gate.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockTransportInner::default();
        self.gate.send_replace(true);
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            gate: Arc::clone(&self.gate),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: Request) -> Result<Value, TransportError> {
        self.inner.lock().unwrap().requests.push(request);

        let mut gate = self.gate.subscribe();
        // The sender lives as long as self, so this cannot fail.
        let _ = gate.wait_for(|open| *open).await;

        let mut inner = self.inner.lock().unwrap();

        // Check for forced failure
        if let Some(error) = inner.fail_next.take() {
            return Err(TransportError::Connection(error));
        }

        match inner.responses.pop_front() {
            Some(MockResponse::Json(body)) => Ok(body),
            Some(MockResponse::Status(status, body)) => Err(TransportError::Status { status, body }),
            None => Err(TransportError::Connection("no response queued".into())),
        }
    }
}
