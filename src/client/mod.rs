//! Client-side helpers for talking to the sync server: plain HTTP for
//! metadata queries, and WebSocket connections for live editing and file
//! transfer.

pub mod http;
pub mod ws_edit;
pub mod ws_transfer;

pub use http::HttpClient;
pub use ws_edit::EditSession;
pub use ws_transfer::TransferClient;
