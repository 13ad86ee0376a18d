//! Error kinds shared by the CRDT core, the catalog, and the file-transfer
//! and sync-reconciler layers.
//!
//! `UnknownOrigin` never reaches a caller outside `crdt::manager` — it is
//! handled internally via the deferred-op queue. Every other variant
//! surfaces to an RPC caller as a typed status; [`IntoResponse`] maps each
//! to the HTTP status the server returns.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("not found")]
    NotFound,

    #[error("visible index out of range")]
    IndexOutOfRange,

    #[error("stream broken: {0}")]
    StreamBroken(String),

    #[error("i/o failure: {0}")]
    IoFailure(#[from] std::io::Error),

    #[error("catalog failure: {0}")]
    CatalogFailure(String),

    #[error("malformed op: {0}")]
    MalformedOp(String),

    /// `apply_insert`'s `origin_left` is non-sentinel and not present
    /// locally. Handled internally by `CrdtManager`'s deferred-op queue;
    /// never returned from a public RPC.
    #[error("unknown origin")]
    UnknownOrigin,
}

impl From<rusqlite::Error> for SyncError {
    fn from(err: rusqlite::Error) -> Self {
        SyncError::CatalogFailure(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::MalformedOp(err.to_string())
    }
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        let status = match &self {
            SyncError::NotFound => StatusCode::NOT_FOUND,
            SyncError::IndexOutOfRange => StatusCode::BAD_REQUEST,
            SyncError::StreamBroken(_) => StatusCode::BAD_GATEWAY,
            SyncError::IoFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SyncError::CatalogFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SyncError::MalformedOp(_) => StatusCode::BAD_REQUEST,
            SyncError::UnknownOrigin => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let resp = SyncError::NotFound.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn malformed_op_maps_to_400() {
        let resp = SyncError::MalformedOp("bad".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
