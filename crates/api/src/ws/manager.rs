use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use tokio::sync::{mpsc, RwLock};
use voicechat_core::protocol::{Outbound, Recipients, ServerEvent};
use voicechat_core::types::{ConnId, Timestamp};

/// Outbound queue feeding one socket's sender task.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// A live signaling connection.
pub struct WsConnection {
    pub sender: WsSender,
    pub connected_at: Timestamp,
}

impl WsConnection {
    /// Queue a frame; `false` once the sender task has gone away.
    fn push(&self, message: Message) -> bool {
        self.sender.send(message).is_ok()
    }
}

/// Registry of open signaling sockets, keyed by connection id.
///
/// Domain operations never touch sockets directly: they hand their
/// [`Outbound`] lists to [`WsManager::deliver`], which resolves recipients
/// against this map. Unknown or already-closed recipients are skipped.
pub struct WsManager {
    connections: RwLock<HashMap<ConnId, WsConnection>>,
}

impl WsManager {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register `conn_id` and return the receiving end of its queue.
    ///
    /// Re-using an id replaces the earlier connection.
    pub async fn add(&self, conn_id: ConnId) -> mpsc::UnboundedReceiver<Message> {
        let (sender, rx) = mpsc::unbounded_channel();
        let conn = WsConnection {
            sender,
            connected_at: chrono::Utc::now(),
        };
        if self.connections.write().await.insert(conn_id.clone(), conn).is_some() {
            tracing::warn!(conn_id = %conn_id, "Connection id reused, replacing");
        }
        rx
    }

    pub async fn remove(&self, conn_id: &str) {
        let removed = self.connections.write().await.remove(conn_id);
        if let Some(conn) = removed {
            let secs = (chrono::Utc::now() - conn.connected_at).num_seconds();
            tracing::debug!(conn_id, secs, "Connection removed");
        }
    }

    /// Queue a frame for one connection.
    ///
    /// Returns `false` when the connection is unknown or its channel closed.
    pub async fn send_to(&self, conn_id: &str, message: Message) -> bool {
        self.connections
            .read()
            .await
            .get(conn_id)
            .is_some_and(|conn| conn.push(message))
    }

    /// Queue a frame for every open connection.
    pub async fn broadcast(&self, message: Message) {
        for conn in self.connections.read().await.values() {
            conn.push(message.clone());
        }
    }

    /// Encode `event` and queue it for one connection.
    pub async fn emit(&self, conn_id: &str, event: &ServerEvent) {
        if let Some(message) = encode(event) {
            self.send_to(conn_id, message).await;
        }
    }

    /// Carry out the deliveries of one domain operation, in order.
    pub async fn deliver(&self, outbound: Vec<Outbound>) {
        if outbound.is_empty() {
            return;
        }
        let conns = self.connections.read().await;
        for Outbound { to, event } in outbound {
            let Some(message) = encode(&event) else {
                continue;
            };
            match to {
                Recipients::Everyone => {
                    for conn in conns.values() {
                        conn.push(message.clone());
                    }
                }
                Recipients::Conn(conn_id) => {
                    if let Some(conn) = conns.get(&conn_id) {
                        conn.push(message);
                    }
                }
                Recipients::Conns(conn_ids) => {
                    for conn in conn_ids.iter().filter_map(|id| conns.get(id)) {
                        conn.push(message.clone());
                    }
                }
            }
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Tell every client the server is going away and forget them all.
    pub async fn shutdown_all(&self) {
        let drained: Vec<WsConnection> = self
            .connections
            .write()
            .await
            .drain()
            .map(|(_, conn)| conn)
            .collect();
        for conn in &drained {
            conn.push(Message::Close(None));
        }
        tracing::info!(count = drained.len(), "Closed all WebSocket connections");
    }

    /// Keep-alive ping for the heartbeat task.
    pub async fn ping_all(&self) {
        for conn in self.connections.read().await.values() {
            conn.push(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}

fn encode(event: &ServerEvent) -> Option<Message> {
    event
        .to_json()
        .map(|json| Message::Text(json.into()))
        .inspect_err(|e| tracing::error!(error = %e, "Failed to serialize server event"))
        .ok()
}
