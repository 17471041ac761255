//! WebSocket infrastructure for real-time signaling.
//!
//! Provides connection management, event dispatch, heartbeat, and the HTTP
//! upgrade handler used by Axum routes.

pub mod dispatch;
mod handler;
mod heartbeat;
pub mod manager;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
