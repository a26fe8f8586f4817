//! Node-type lookup for step definitions.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use supabase::{HttpTransport, OperationKind};

use crate::tasks::SupabaseNode;
use crate::{ExecutableNode, NodeError};

pub const SELECT: &str = "supabase.select";
pub const INSERT: &str = "supabase.insert";
pub const UPDATE: &str = "supabase.update";
pub const DELETE: &str = "supabase.delete";
pub const QUERY: &str = "supabase.query";

/// A single step as it appears in a workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Unique identifier within the workflow.
    pub id: String,
    /// One of the `supabase.*` node types.
    pub node_type: String,
    /// Connection keys plus the operation's properties.
    pub config: Value,
}

/// Operation behind a `supabase.*` node type.
pub fn operation_kind(node_type: &str) -> Option<OperationKind> {
    match node_type {
        SELECT => Some(OperationKind::Select),
        INSERT => Some(OperationKind::Insert),
        UPDATE => Some(OperationKind::Update),
        DELETE => Some(OperationKind::Delete),
        QUERY => Some(OperationKind::Query),
        _ => None,
    }
}

/// Build the node for `step`, sending through `transport`.
///
/// # Errors
/// [`NodeError::Fatal`] for an unknown node type or an invalid config.
pub fn build_node(
    step: &StepDefinition,
    transport: Arc<dyn HttpTransport>,
) -> Result<Arc<dyn ExecutableNode>, NodeError> {
    let kind = operation_kind(&step.node_type).ok_or_else(|| {
        NodeError::Fatal(format!(
            "no implementation registered for node_type '{}' (step '{}')",
            step.node_type, step.id
        ))
    })?;

    let node = SupabaseNode::from_config(kind, &step.config, transport)?;
    Ok(Arc::new(node))
}
