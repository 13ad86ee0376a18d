//! HTTP and WebSocket route definitions for the sync server.

use axum::{
    Json, Router,
    extract::{Path, State, ws::WebSocketUpgrade},
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::catalog::FileMetadata;
use crate::error::SyncError;
use crate::protocol::transfer::{HeartbeatRequest, HeartbeatResponse};
use crate::server::edit_ws::handle_edit_session;
use crate::server::state::AppState;
use crate::server::transfer_ws::handle_transfer_session;

/// Liveness probe: spec §6's `HeartbeatRequest`/`HeartbeatResponse` pair,
/// carried as a typed JSON request/response instead of the source's
/// unary gRPC call.
pub async fn heartbeat(Json(_req): Json<HeartbeatRequest>) -> Json<HeartbeatResponse> {
    Json(HeartbeatResponse { alive: true })
}

pub async fn edit_ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let broadcasts = state.broadcasts.clone();
    ws.on_upgrade(move |socket| handle_edit_session(socket, state, broadcasts))
}

pub async fn transfer_ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_transfer_session(socket, state))
}

pub async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<FileMetadata>>, Response> {
    state
        .catalog
        .list_live_files()
        .map(Json)
        .map_err(IntoResponse::into_response)
}

pub async fn get_file_metadata(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<FileMetadata>, Response> {
    match state.catalog.get_file(&name) {
        Ok(Some(meta)) => Ok(Json(meta)),
        Ok(None) => Err(SyncError::NotFound.into_response()),
        Err(e) => Err(e.into_response()),
    }
}

/// Creates and configures the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", post(heartbeat))
        .route("/files", get(list_files))
        .route("/files/:name", get(get_file_metadata))
        .route("/ws/edit", get(edit_ws_handler))
        .route("/ws/transfer", get(transfer_ws_handler))
        .with_state(state)
}
