use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use voicechat_core::types::Timestamp;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    pub timestamp: Timestamp,
    /// Number of live chat rooms.
    pub rooms_count: usize,
    /// Number of open WebSocket connections.
    pub connections: usize,
    /// Whether TRTC credentials are present.
    pub trtc_configured: bool,
}

/// GET /api/health -- liveness probe used by the container health check.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let rooms_count = state.rooms.lock().await.len();
    let connections = state.ws_manager.connection_count().await;

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now(),
        rooms_count,
        connections,
        trtc_configured: state.config.trtc.is_configured(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
