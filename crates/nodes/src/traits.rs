//! The `ExecutableNode` trait — the contract every task node must fulfil.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::NodeError;

/// Identifiers of the run a node executes in; used to correlate logs.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionContext {
    /// ID of the parent workflow.
    pub workflow_id: Uuid,
    /// ID of the current execution run.
    pub execution_id: Uuid,
}

impl ExecutionContext {
    /// Context for a one-off run outside any stored workflow.
    pub fn standalone() -> Self {
        Self {
            workflow_id: Uuid::nil(),
            execution_id: Uuid::new_v4(),
        }
    }
}

/// The core node trait.
///
/// Nodes are built from their step config up front; `execute` only performs
/// the work and returns the step's JSON output.
#[async_trait]
pub trait ExecutableNode: Send + Sync {
    /// Execute the node. `input` is the previous step's output.
    async fn execute(
        &self,
        input: Value,
        ctx: &ExecutionContext,
    ) -> Result<Value, NodeError>;
}
