//! Routes decoded client events to the room registry and pair room, then
//! hands the resulting deliveries to the [`WsManager`](super::WsManager).
//!
//! Deliveries are queued while the state lock is still held, so every
//! client sees updates in the order they were applied.

use voicechat_core::pairing::PairRoom;
use voicechat_core::protocol::{ClientEvent, Notice, Outbound, Pong, Role, ServerEvent};
use voicechat_core::rooms::RoomRegistry;

use crate::state::AppState;

/// Apply one client event and deliver its consequences.
pub async fn dispatch(state: &AppState, conn_id: &str, event: ClientEvent) {
    tracing::debug!(conn_id, event = event.name(), "Client event");

    match event {
        ClientEvent::Ping => {
            let pong = ServerEvent::Pong(Pong {
                timestamp: chrono::Utc::now(),
            });
            state.ws_manager.emit(conn_id, &pong).await;
        }
        ClientEvent::JoinRoom(_)
        | ClientEvent::LeaveRoom(_)
        | ClientEvent::SendMessage(_)
        | ClientEvent::JoinMic(_)
        | ClientEvent::LeaveMic(_)
        | ClientEvent::GetUserSlot(_) => {
            let mut rooms = state.rooms.lock().await;
            let outbound = apply_room_event(&mut rooms, conn_id, event);
            state.ws_manager.deliver(outbound).await;
        }
        _ => {
            let mut pair = state.pair.lock().await;
            let outbound = apply_pair_event(&mut pair, conn_id, event);
            state.ws_manager.deliver(outbound).await;
        }
    }
}

fn apply_room_event(rooms: &mut RoomRegistry, conn_id: &str, event: ClientEvent) -> Vec<Outbound> {
    match event {
        ClientEvent::JoinRoom(req) => rooms.join(conn_id, req).unwrap_or_else(|e| {
            vec![Outbound::to_conn(
                conn_id,
                ServerEvent::Error(Notice::new(e.to_string())),
            )]
        }),
        ClientEvent::LeaveRoom(req) => rooms.leave(conn_id, req),
        ClientEvent::SendMessage(req) => rooms.send_message(conn_id, req),
        ClientEvent::JoinMic(req) => rooms.join_mic(conn_id, req),
        ClientEvent::LeaveMic(req) => rooms.leave_mic(conn_id, req),
        ClientEvent::GetUserSlot(req) => rooms.user_slot(conn_id, req),
        other => {
            tracing::warn!(conn_id, event = other.name(), "Not a room event");
            Vec::new()
        }
    }
}

fn apply_pair_event(pair: &mut PairRoom, conn_id: &str, event: ClientEvent) -> Vec<Outbound> {
    match event {
        ClientEvent::RegisterAdmin => pair.register(Role::Admin, conn_id),
        ClientEvent::RegisterGuest => pair.register(Role::Guest, conn_id),
        ClientEvent::GetUsers => pair.status(conn_id),
        ClientEvent::AdminOffer(req) => pair.relay_offer(conn_id, Role::Admin, req.offer),
        ClientEvent::GuestOffer(req) => pair.relay_offer(conn_id, Role::Guest, req.offer),
        ClientEvent::AdminAnswer(req) => pair.relay_answer(conn_id, Role::Admin, req.answer),
        ClientEvent::GuestAnswer(req) => pair.relay_answer(conn_id, Role::Guest, req.answer),
        ClientEvent::IceCandidate(req) => pair.relay_candidate(conn_id, req),
        other => {
            tracing::warn!(conn_id, event = other.name(), "Not a pair room event");
            Vec::new()
        }
    }
}

/// Remove a closed connection from every room and notify whoever remains.
pub async fn disconnect(state: &AppState, conn_id: &str) {
    {
        let mut rooms = state.rooms.lock().await;
        let outbound = rooms.disconnect(conn_id);
        state.ws_manager.deliver(outbound).await;
    }
    let mut pair = state.pair.lock().await;
    let outbound = pair.disconnect(conn_id);
    state.ws_manager.deliver(outbound).await;
}
