//! Error types for the supabase crate.

use thiserror::Error;

use crate::request::OperationKind;

/// Failures raised while issuing a request through an [`HttpTransport`].
///
/// [`HttpTransport`]: crate::transport::HttpTransport
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// DNS, TCP or TLS setup failed.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request did not complete in time.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The request could not be built (bad URI, bad header value).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Any other failure while sending or reading the response.
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_builder() {
            TransportError::InvalidRequest(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// Errors returned by the operation entry points.
///
/// A non-2xx status from PostgREST is *not* an error: it comes back as a
/// regular [`OperationResult`](crate::OperationResult) with the literal code.
#[derive(Debug, Error)]
pub enum SupabaseError {
    // ------ Configuration errors (raised before any request is sent) ------

    /// A field the operation cannot run without is missing or blank.
    #[error("{operation} requires a non-empty '{field}'")]
    MissingField {
        operation: OperationKind,
        field: &'static str,
    },

    /// The connection settings are unusable.
    #[error("invalid connection config: {0}")]
    InvalidConfig(String),

    /// The request body could not be serialised.
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    // ------ Runtime errors ------

    /// The transport failed; propagated as-is, never retried here.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl SupabaseError {
    /// `true` for errors raised before anything reached the network.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            SupabaseError::MissingField { .. }
                | SupabaseError::InvalidConfig(_)
                | SupabaseError::Encode(_)
        )
    }
}
