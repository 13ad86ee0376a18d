//! Axum web server: HTTP endpoints plus edit and file-transfer WebSocket
//! routes, all sharing one [`state::AppState`].

pub mod edit_ws;
pub mod routes;
pub mod state;
pub mod transfer_ws;

pub use routes::create_router;
pub use state::AppState;
