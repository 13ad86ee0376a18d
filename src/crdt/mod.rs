//! The CRDT core: character identity, the per-document RGA sequence, and
//! the manager that mints ids and dispatches local/remote operations.

pub mod document;
pub mod id;
pub mod manager;
pub mod node;

pub use document::DocumentReplica;
pub use id::CharId;
pub use manager::{CrdtManager, DeleteOp, InsertOp};
pub use node::Node;
