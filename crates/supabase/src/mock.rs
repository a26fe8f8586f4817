//! `MockTransport` — a test double for `HttpTransport`.
//!
//! Records every request it is handed and answers with a scripted response,
//! so operations can be exercised without a Supabase project.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::request::AssembledRequest;
use crate::response::RawResponse;
use crate::transport::HttpTransport;
use crate::TransportError;

/// What the mock does when `send` is called.
pub enum MockBehaviour {
    /// Answer with this response.
    Respond(RawResponse),
    /// Fail as if the network were down.
    Fail(TransportError),
}

/// A transport that records every call and returns a fixed outcome.
pub struct MockTransport {
    pub behaviour: MockBehaviour,
    /// All requests seen, in call order.
    pub calls: Arc<Mutex<Vec<AssembledRequest>>>,
}

impl MockTransport {
    /// Always answer with `response`.
    pub fn responding(response: RawResponse) -> Self {
        Self {
            behaviour: MockBehaviour::Respond(response),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always answer `status` with a JSON (or any text) body.
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self::responding(RawResponse::new(status, body))
    }

    /// Always fail with `error`.
    pub fn failing(error: TransportError) -> Self {
        Self {
            behaviour: MockBehaviour::Fail(error),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of requests sent through this transport.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<AssembledRequest> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: &AssembledRequest) -> Result<RawResponse, TransportError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        match &self.behaviour {
            MockBehaviour::Respond(response) => Ok(response.clone()),
            MockBehaviour::Fail(error) => Err(error.clone()),
        }
    }
}
