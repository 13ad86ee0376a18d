//! # rga-filesync
//!
//! A file synchronization service with collaborative text editing, built on
//! an origin-anchored RGA (Replicated Growable Array) sequence CRDT.
//!
//! ## Layout
//!
//! - [`crdt`]: character identity, the document replica, and the manager
//!   that owns every replica plus the logical clock.
//! - [`protocol`]: wire message types for the edit and file-transfer
//!   WebSocket routes.
//! - [`catalog`]: the sqlite-backed metadata store of files and chunks.
//! - [`transfer`]: the server-side streaming upload/download engine with
//!   primary/backup replication.
//! - [`reconciler`]: the client-side directory scan and sync plan.
//! - [`config`]: `clap`-derived configuration for both binaries.
//! - [`server`]: the Axum application (HTTP routes + both WebSocket routes).
//! - [`client`]: HTTP and WebSocket helpers for the client binary.
//! - [`error`]: the shared error type.

pub mod catalog;
pub mod client;
pub mod config;
pub mod crdt;
pub mod error;
pub mod protocol;
pub mod reconciler;
pub mod server;
pub mod transfer;

pub use crdt::{CharId, CrdtManager, DeleteOp, DocumentReplica, InsertOp, Node};
pub use error::SyncError;
