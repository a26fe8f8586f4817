//! Operation entry points.
//!
//! Each call:
//! 1. Assembles the request (configuration errors stop here, before any I/O).
//! 2. Sends exactly one request through the transport.
//! 3. Normalises the response into an [`OperationResult`].
//!
//! Nothing is retried or cached. A non-2xx status still produces a result;
//! the caller decides from `status` whether the operation succeeded.

use tracing::{info, instrument};

use crate::config::ConnectionConfig;
use crate::request::{
    assemble, DeleteRequest, Headers, InsertRequest, Operation, OperationKind, QueryRequest, Row,
    SelectRequest, UpdateRequest,
};
use crate::response::{normalize, ParsedBody};
use crate::transport::HttpTransport;
use crate::SupabaseError;

/// Everything one invocation produced.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResult {
    pub kind: OperationKind,
    pub request_uri: String,
    pub status: u16,
    pub headers: Headers,
    pub body: ParsedBody,
    /// Rows decoded, or the delete total reported by `Content-Range`.
    pub count: usize,
    pub raw_body: Option<String>,
}

impl OperationResult {
    /// Decoded rows; empty when the body was absent or unparseable.
    pub fn rows(&self) -> &[Row] {
        self.body.rows()
    }

    /// `true` for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Run any operation.
///
/// # Errors
/// Configuration errors (nothing is sent) and transport errors. Remote
/// errors and unparseable bodies are reported inside the result instead.
#[instrument(
    skip(transport, config, operation),
    fields(operation = %operation.kind(), target = %operation.target())
)]
pub async fn execute(
    transport: &dyn HttpTransport,
    config: &ConnectionConfig,
    operation: &Operation,
) -> Result<OperationResult, SupabaseError> {
    let request = assemble(config, operation)?;
    info!("dispatching {} {}", request.method, request.uri);

    let response = transport.send(&request).await?;
    let normalized = normalize(request.kind, operation.returns_rows(), &response);

    info!(
        status = response.status,
        count = normalized.count,
        "{} on '{}' completed",
        request.kind,
        operation.target()
    );

    Ok(OperationResult {
        kind: request.kind,
        request_uri: request.uri,
        status: response.status,
        headers: response.headers,
        body: normalized.body,
        count: normalized.count,
        raw_body: normalized.raw_body,
    })
}

pub async fn select(
    transport: &dyn HttpTransport,
    config: &ConnectionConfig,
    request: SelectRequest,
) -> Result<OperationResult, SupabaseError> {
    execute(transport, config, &Operation::Select(request)).await
}

pub async fn insert(
    transport: &dyn HttpTransport,
    config: &ConnectionConfig,
    request: InsertRequest,
) -> Result<OperationResult, SupabaseError> {
    execute(transport, config, &Operation::Insert(request)).await
}

pub async fn update(
    transport: &dyn HttpTransport,
    config: &ConnectionConfig,
    request: UpdateRequest,
) -> Result<OperationResult, SupabaseError> {
    execute(transport, config, &Operation::Update(request)).await
}

pub async fn delete(
    transport: &dyn HttpTransport,
    config: &ConnectionConfig,
    request: DeleteRequest,
) -> Result<OperationResult, SupabaseError> {
    execute(transport, config, &Operation::Delete(request)).await
}

/// Call a stored procedure.
pub async fn query(
    transport: &dyn HttpTransport,
    config: &ConnectionConfig,
    request: QueryRequest,
) -> Result<OperationResult, SupabaseError> {
    execute(transport, config, &Operation::Query(request)).await
}
