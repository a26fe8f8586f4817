//! `nodes` crate — the `ExecutableNode` trait and the Supabase task nodes.
//!
//! Every step a workflow engine runs implements [`ExecutableNode`]; the
//! `supabase.*` node types are built from step definitions via
//! [`registry::build_node`].

pub mod error;
pub mod registry;
pub mod tasks;
pub mod traits;

pub use error::NodeError;
pub use registry::{build_node, StepDefinition};
pub use traits::{ExecutableNode, ExecutionContext};
