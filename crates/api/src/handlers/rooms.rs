//! Read-only views of the multi-room voice chat state.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use voicechat_core::rooms::{RoomDetail, RoomSummary};

use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RoomList {
    pub rooms: Vec<RoomSummary>,
    pub total: usize,
}

/// GET /api/rooms
pub async fn list_rooms(State(state): State<AppState>) -> Json<RoomList> {
    let rooms = state.rooms.lock().await.summaries();
    let total = rooms.len();
    Json(RoomList { rooms, total })
}

/// GET /api/room/{room_id}
pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> AppResult<Json<RoomDetail>> {
    let detail = state.rooms.lock().await.detail(&room_id)?;
    Ok(Json(detail))
}
