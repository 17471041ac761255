use std::sync::Arc;

use tokio::sync::Mutex;
use voicechat_core::pairing::PairRoom;
use voicechat_core::rooms::RoomRegistry;

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager.
    pub ws_manager: Arc<WsManager>,
    /// Multi-room voice chat state.
    pub rooms: Arc<Mutex<RoomRegistry>>,
    /// The fixed admin/guest room.
    pub pair: Arc<Mutex<PairRoom>>,
}

impl AppState {
    /// Build fresh, empty state from configuration.
    pub fn new(config: ServerConfig) -> Self {
        let rooms = RoomRegistry::new(config.room_history_limit);
        let pair = PairRoom::new(config.pair_room_id.clone());
        Self {
            config: Arc::new(config),
            ws_manager: Arc::new(WsManager::new()),
            rooms: Arc::new(Mutex::new(rooms)),
            pair: Arc::new(Mutex::new(pair)),
        }
    }
}
