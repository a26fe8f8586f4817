//! `supabase` crate — PostgREST request building and response decoding.
//!
//! Turns a [`ConnectionConfig`] plus one [`Operation`] into a single HTTP
//! call and the reply into an [`OperationResult`]. The transport is a trait
//! so tests can swap in [`mock::MockTransport`].

pub mod config;
pub mod endpoint;
pub mod error;
pub mod mock;
pub mod operations;
pub mod request;
pub mod response;
pub mod transport;

pub use config::{ConnectionConfig, TransportOptions};
pub use error::{SupabaseError, TransportError};
pub use operations::{delete, execute, insert, query, select, update, OperationResult};
pub use request::{
    DeleteRequest, InsertPayload, InsertRequest, Operation, OperationKind, QueryRequest, Row,
    SelectRequest, UpdateRequest,
};
pub use response::{ParsedBody, RawResponse};
pub use transport::{HttpTransport, ReqwestTransport};
