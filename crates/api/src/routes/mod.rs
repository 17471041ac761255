pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /health                  liveness probe (GET)
/// /rooms                   list live rooms (GET)
/// /room/{room_id}          room detail (GET)
/// /trtc/usersig            issue a TRTC user signature (POST)
/// /trtc/config             TRTC session for the frontend (POST)
/// /verify-admin            check the admin password (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .route("/rooms", get(handlers::rooms::list_rooms))
        .route("/room/{room_id}", get(handlers::rooms::get_room))
        .route("/trtc/usersig", post(handlers::trtc::generate_usersig))
        .route("/trtc/config", post(handlers::trtc::session_config))
        .route("/verify-admin", post(handlers::pairing::verify_admin))
}

/// The signaling WebSocket, mounted at `/ws`.
pub fn ws_routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws::ws_handler))
}
