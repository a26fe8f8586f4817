//! Supabase task nodes.
//!
//! One node type per operation. A node is built from the step's JSON config,
//! which holds the connection keys (`url`, `apiKey`, `schema`) next to the
//! operation's own properties, and on `execute` issues exactly one request.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{info, instrument};

use supabase::{
    ConnectionConfig, DeleteRequest, HttpTransport, InsertRequest, Operation, OperationKind,
    OperationResult, QueryRequest, SelectRequest, UpdateRequest,
};

use crate::traits::ExecutionContext;
use crate::{ExecutableNode, NodeError};

/// A configured Supabase step, ready to run.
pub struct SupabaseNode {
    connection: ConnectionConfig,
    operation: Operation,
    transport: Arc<dyn HttpTransport>,
}

impl SupabaseNode {
    /// Parse `config` for an operation of `kind`; see [`parse_step`].
    pub fn from_config(
        kind: OperationKind,
        config: &Value,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, NodeError> {
        let (connection, operation) = parse_step(kind, config)?;
        Ok(Self { connection, operation, transport })
    }

    pub fn kind(&self) -> OperationKind {
        self.operation.kind()
    }
}

/// Split a step config into its connection settings and operation request.
///
/// # Errors
/// [`NodeError::Fatal`] if either part does not deserialise or the
/// connection keys are blank.
pub fn parse_step(kind: OperationKind, config: &Value) -> Result<(ConnectionConfig, Operation), NodeError> {
    let connection: ConnectionConfig = parse(kind, config)?;
    connection.validate()?;

    let operation = match kind {
        OperationKind::Select => Operation::Select(parse::<SelectRequest>(kind, config)?),
        OperationKind::Insert => Operation::Insert(parse::<InsertRequest>(kind, config)?),
        OperationKind::Update => Operation::Update(parse::<UpdateRequest>(kind, config)?),
        OperationKind::Delete => Operation::Delete(parse::<DeleteRequest>(kind, config)?),
        OperationKind::Query => Operation::Query(parse::<QueryRequest>(kind, config)?),
    };
    Ok((connection, operation))
}

fn parse<T: DeserializeOwned>(kind: OperationKind, config: &Value) -> Result<T, NodeError> {
    serde_json::from_value(config.clone())
        .map_err(|e| NodeError::Fatal(format!("invalid {kind} step config: {e}")))
}

#[async_trait]
impl ExecutableNode for SupabaseNode {
    #[instrument(skip_all, fields(execution_id = %ctx.execution_id, operation = %self.kind()))]
    async fn execute(&self, _input: Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let result =
            supabase::execute(self.transport.as_ref(), &self.connection, &self.operation).await?;

        info!(status = result.status, count = result.count, "supabase step finished");
        Ok(step_output(&result))
    }
}

/// Output document handed to the workflow engine.
///
/// Field names follow the operation: `rows`/`size` for select and query,
/// `insertedRows`/`insertedCount`, `updatedRows`/`updatedCount`,
/// `deletedRows`/`deletedCount`. A query whose body could not be decoded
/// reports `rows: null`.
pub fn step_output(result: &OperationResult) -> Value {
    let (rows_key, count_key) = match result.kind {
        OperationKind::Select | OperationKind::Query => ("rows", "size"),
        OperationKind::Insert => ("insertedRows", "insertedCount"),
        OperationKind::Update => ("updatedRows", "updatedCount"),
        OperationKind::Delete => ("deletedRows", "deletedCount"),
    };

    let rows = if result.kind == OperationKind::Query && result.body.is_unparsed() {
        Value::Null
    } else {
        Value::Array(result.rows().iter().cloned().map(Value::Object).collect())
    };

    let headers: Map<String, Value> = result
        .headers
        .iter()
        .map(|(name, values)| {
            let values = values.iter().cloned().map(Value::String).collect();
            (name.clone(), Value::Array(values))
        })
        .collect();

    let mut output = Map::new();
    output.insert("uri".into(), Value::String(result.request_uri.clone()));
    output.insert("code".into(), Value::from(result.status));
    output.insert("headers".into(), Value::Object(headers));
    output.insert(rows_key.into(), rows);
    output.insert(count_key.into(), Value::from(result.count));
    output.insert(
        "rawResponse".into(),
        result.raw_body.clone().map_or(Value::Null, Value::String),
    );
    Value::Object(output)
}
