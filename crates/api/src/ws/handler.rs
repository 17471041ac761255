use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use voicechat_core::protocol::{ClientEvent, Connected, Notice, ServerEvent};

use crate::state::AppState;
use crate::ws::dispatch;

/// HTTP handler that upgrades the connection to WebSocket.
///
/// After the upgrade the connection is registered with `WsManager` and
/// managed by two tasks (sender + receiver).
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with `WsManager` and greets it.
///   2. Spawns a sender task that forwards messages from the manager channel.
///   3. Decodes and dispatches inbound events on the current task.
///   4. Cleans up rooms and the pair room on disconnect.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    let mut rx = state.ws_manager.add(conn_id.clone()).await;

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    state
        .ws_manager
        .emit(
            &conn_id,
            &ServerEvent::Connected(Connected {
                sid: conn_id.clone(),
                status: "connected",
            }),
        )
        .await;

    // Receiver loop: decode and dispatch inbound events.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => match ClientEvent::parse(text.as_str()) {
                Ok(event) => dispatch::dispatch(&state, &conn_id, event).await,
                Err(e) => {
                    tracing::debug!(conn_id = %conn_id, error = %e, "Rejected client message");
                    state
                        .ws_manager
                        .emit(&conn_id, &ServerEvent::Error(Notice::new(e.to_string())))
                        .await;
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    // Clean up: unregister first so departure notices skip this connection.
    state.ws_manager.remove(&conn_id).await;
    dispatch::disconnect(&state, &conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}
