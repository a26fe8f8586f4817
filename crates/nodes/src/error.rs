//! Node-level error type.

use supabase::{SupabaseError, TransportError};
use thiserror::Error;

/// Errors returned by a node's `execute` method.
///
/// The engine uses the variant to decide retry behaviour:
/// - `Retryable` — the step may be re-run later.
/// - `Fatal`     — re-running with the same config cannot succeed.
#[derive(Debug, Error, Clone)]
pub enum NodeError {
    /// Transient failure; the engine may re-try the step.
    #[error("retryable node error: {0}")]
    Retryable(String),

    /// Permanent failure; no retry should be attempted.
    #[error("fatal node error: {0}")]
    Fatal(String),
}

impl From<SupabaseError> for NodeError {
    fn from(err: SupabaseError) -> Self {
        match &err {
            SupabaseError::Transport(TransportError::InvalidRequest(_)) => NodeError::Fatal(err.to_string()),
            SupabaseError::Transport(_) => NodeError::Retryable(err.to_string()),
            _ => NodeError::Fatal(err.to_string()),
        }
    }
}
