//! Multi-room voice chat state.
//!
//! A room is created by its first `join_room` and removed as soon as its last
//! member leaves or disconnects. Each room exposes [`MIC_SLOT_COUNT`]
//! numbered microphone slots; `mic_slots` and `user_slots` are kept as exact
//! inverses of each other.

use std::collections::{BTreeMap, HashMap, VecDeque};

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::CoreError;
use crate::protocol::{
    ChatMessage, GetUserSlot, JoinMic, JoinRoom, LeaveMic, LeaveRoom, MicHolder, MicJoined,
    Notice, Outbound, RoomData, SendMessage, ServerEvent, SlotInfo, UserView,
};
use crate::types::{ConnId, Timestamp};

/// Number of microphone slots per room (numbered from 1).
pub const MIC_SLOT_COUNT: u8 = 10;

/// Default number of chat messages retained per room.
pub const DEFAULT_HISTORY_LIMIT: usize = 200;

/// Length of the connection-id prefix used in generated user names.
const DEFAULT_NAME_PREFIX_LEN: usize = 6;

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RoomUser {
    pub name: String,
    pub joined_at: Timestamp,
    /// Name this member's mic slot is held under, which may differ from
    /// `name` when `join_mic` supplied one.
    pub mic_name: Option<String>,
}

#[derive(Debug)]
struct Room {
    users: IndexMap<ConnId, RoomUser>,
    history: VecDeque<ChatMessage>,
    message_count: usize,
    mic_slots: BTreeMap<u8, String>,
    user_slots: HashMap<String, u8>,
    user_ids: HashMap<String, String>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Room {
    fn new() -> Self {
        let now = chrono::Utc::now();
        Self {
            users: IndexMap::new(),
            history: VecDeque::new(),
            message_count: 0,
            mic_slots: BTreeMap::new(),
            user_slots: HashMap::new(),
            user_ids: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn members(&self) -> Vec<ConnId> {
        self.users.keys().cloned().collect()
    }

    fn user_views(&self) -> Vec<UserView> {
        self.users
            .values()
            .map(|u| UserView {
                name: u.name.clone(),
                joined_at: u.joined_at,
            })
            .collect()
    }

    fn touch(&mut self) {
        self.updated_at = chrono::Utc::now();
    }

    fn record(&mut self, message: ChatMessage, limit: usize) {
        self.message_count += 1;
        self.history.push_back(message);
        while self.history.len() > limit {
            self.history.pop_front();
        }
    }

    /// Release whatever slot `name` holds, returning it.
    fn release_slot_of(&mut self, name: &str) -> Option<u8> {
        let slot = self.user_slots.remove(name)?;
        if self.mic_slots.get(&slot).map(String::as_str) == Some(name) {
            self.mic_slots.remove(&slot);
        }
        Some(slot)
    }
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// One row of the room listing.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    pub id: String,
    pub user_count: usize,
    pub active_mics: usize,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Full public state of a single room.
#[derive(Debug, Clone, Serialize)]
pub struct RoomDetail {
    pub id: String,
    pub users: Vec<UserView>,
    pub mic_slots: BTreeMap<u8, String>,
    pub message_count: usize,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// All live rooms, keyed by room id in creation order.
#[derive(Debug)]
pub struct RoomRegistry {
    rooms: IndexMap<String, Room>,
    history_limit: usize,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl RoomRegistry {
    pub fn new(history_limit: usize) -> Self {
        Self {
            rooms: IndexMap::new(),
            history_limit,
        }
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn summaries(&self) -> Vec<RoomSummary> {
        self.rooms
            .iter()
            .map(|(id, room)| RoomSummary {
                id: id.clone(),
                user_count: room.users.len(),
                active_mics: room.mic_slots.len(),
                created_at: room.created_at,
                updated_at: room.updated_at,
            })
            .collect()
    }

    pub fn detail(&self, room_id: &str) -> Result<RoomDetail, CoreError> {
        let room = self.rooms.get(room_id).ok_or_else(|| CoreError::NotFound {
            entity: "Room",
            id: room_id.to_string(),
        })?;

        Ok(RoomDetail {
            id: room_id.to_string(),
            users: room.user_views(),
            mic_slots: room.mic_slots.clone(),
            message_count: room.message_count,
            created_at: room.created_at,
            updated_at: room.updated_at,
        })
    }

    /// Add `conn_id` to a room, creating the room when needed.
    ///
    /// The joiner receives the room state (without chat history); everyone
    /// else receives a system join message.
    pub fn join(&mut self, conn_id: &str, req: JoinRoom) -> Result<Vec<Outbound>, CoreError> {
        let room_id = req
            .room_id
            .ok_or_else(|| CoreError::Validation("roomId is required".into()))?;
        let name = req
            .user_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| default_user_name(conn_id));

        let limit = self.history_limit;
        let room = self.rooms.entry(room_id.clone()).or_insert_with(|| {
            tracing::info!(room_id = %room_id, "Room created");
            Room::new()
        });

        // Re-joining keeps any mic slot the connection already holds.
        let mic_name = room.users.get(conn_id).and_then(|u| u.mic_name.clone());
        room.users.insert(
            conn_id.to_string(),
            RoomUser {
                name: name.clone(),
                joined_at: chrono::Utc::now(),
                mic_name,
            },
        );
        room.touch();

        let room_data = ServerEvent::RoomData(RoomData {
            mic_slots: room.mic_slots.clone(),
            users: room.user_views(),
            room_id: room_id.clone(),
            your_name: name.clone(),
        });

        let msg = ChatMessage::system(format!("{name} has joined the room"));
        room.record(msg.clone(), limit);
        let others: Vec<ConnId> = room
            .users
            .keys()
            .filter(|c| c.as_str() != conn_id)
            .cloned()
            .collect();

        tracing::info!(conn_id, room_id = %room_id, user = %name, "User joined room");

        Ok(vec![
            Outbound::to_conn(conn_id, room_data),
            Outbound::to_conns(others, ServerEvent::NewMessage(msg)),
        ])
    }

    /// Remove `conn_id` from the named room. Notifications include the leaver.
    pub fn leave(&mut self, conn_id: &str, req: LeaveRoom) -> Vec<Outbound> {
        let Some(room_id) = req.room_id else {
            return Vec::new();
        };
        let Some(room) = self.rooms.get(&room_id) else {
            return Vec::new();
        };
        if !room.users.contains_key(conn_id) {
            return Vec::new();
        }

        let recipients = room.members();
        self.remove_member(&room_id, conn_id, recipients)
    }

    /// Remove `conn_id` from every room it belongs to. Notifications go to
    /// the remaining members only.
    pub fn disconnect(&mut self, conn_id: &str) -> Vec<Outbound> {
        let joined: Vec<String> = self
            .rooms
            .iter()
            .filter(|(_, room)| room.users.contains_key(conn_id))
            .map(|(id, _)| id.clone())
            .collect();

        let mut out = Vec::new();
        for room_id in joined {
            let recipients = self.rooms[&room_id]
                .users
                .keys()
                .filter(|c| c.as_str() != conn_id)
                .cloned()
                .collect();
            out.extend(self.remove_member(&room_id, conn_id, recipients));
        }
        out
    }

    fn remove_member(
        &mut self,
        room_id: &str,
        conn_id: &str,
        recipients: Vec<ConnId>,
    ) -> Vec<Outbound> {
        let limit = self.history_limit;
        let Some(room) = self.rooms.get_mut(room_id) else {
            return Vec::new();
        };
        let Some(user) = room.users.shift_remove(conn_id) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        let mic_name = user.mic_name.as_deref().unwrap_or(&user.name);
        if let Some(slot) = room.release_slot_of(mic_name) {
            room.user_ids.remove(mic_name);
            out.push(Outbound::to_conns(
                recipients.clone(),
                ServerEvent::UserLeftMic(MicHolder {
                    slot,
                    user_name: mic_name.to_string(),
                }),
            ));
        }

        let msg = ChatMessage::system(format!("{} has left the room", user.name));
        room.record(msg.clone(), limit);
        out.push(Outbound::to_conns(recipients, ServerEvent::NewMessage(msg)));
        room.touch();

        tracing::info!(conn_id, room_id, user = %user.name, "User left room");

        if room.users.is_empty() {
            self.rooms.shift_remove(room_id);
            tracing::info!(room_id, "Room deleted (empty)");
        }
        out
    }

    /// Post a chat message from a member to the whole room.
    pub fn send_message(&mut self, conn_id: &str, req: SendMessage) -> Vec<Outbound> {
        let text = req.text.trim();
        if text.is_empty() {
            return Vec::new();
        }
        let Some(room_id) = req.room_id else {
            return Vec::new();
        };
        let limit = self.history_limit;
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return Vec::new();
        };
        let Some(user) = room.users.get(conn_id) else {
            return Vec::new();
        };

        let msg = ChatMessage::from_user(user.name.clone(), text, conn_id);
        room.record(msg.clone(), limit);
        room.touch();

        tracing::debug!(conn_id, room_id = %room_id, "Chat message posted");
        vec![Outbound::to_conns(room.members(), ServerEvent::NewMessage(msg))]
    }

    /// Assign a mic slot to the caller's user, moving them off any other slot.
    pub fn join_mic(&mut self, conn_id: &str, req: JoinMic) -> Vec<Outbound> {
        let mic_error = |message: String| {
            vec![Outbound::to_conn(
                conn_id,
                ServerEvent::MicError(Notice::new(message)),
            )]
        };

        let limit = self.history_limit;
        let room_id = req.room_id.unwrap_or_default();
        let slot = match u8::try_from(req.slot) {
            Ok(s) if (1..=MIC_SLOT_COUNT).contains(&s) => s,
            _ => return mic_error("Invalid room or slot".into()),
        };
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return mic_error("Invalid room or slot".into());
        };
        let Some(member) = room.users.get(conn_id) else {
            return mic_error("You are not in this room".into());
        };

        let name = req
            .user_name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| member.name.clone());
        let held_as = member.mic_name.clone();

        if let Some(holder) = room.mic_slots.get(&slot) {
            if *holder != name && Some(holder) != held_as.as_ref() {
                return mic_error(format!("Slot {slot} is already taken by {holder}"));
            }
        }

        let recipients = room.members();
        let mut out = Vec::new();

        // Drop whatever this connection held before, under whichever name,
        // unless it is exactly this slot under this name.
        let mut stale: Vec<String> = held_as.into_iter().collect();
        if !stale.contains(&name) {
            stale.push(name.clone());
        }
        for old_name in stale {
            let Some(&old_slot) = room.user_slots.get(&old_name) else {
                continue;
            };
            if old_slot == slot && old_name == name {
                continue;
            }
            room.release_slot_of(&old_name);
            if old_name != name {
                room.user_ids.remove(&old_name);
            }
            out.push(Outbound::to_conns(
                recipients.clone(),
                ServerEvent::UserLeftMic(MicHolder {
                    slot: old_slot,
                    user_name: old_name,
                }),
            ));
        }

        if let Some(member) = room.users.get_mut(conn_id) {
            member.mic_name = Some(name.clone());
        }
        room.mic_slots.insert(slot, name.clone());
        room.user_slots.insert(name.clone(), slot);
        if let Some(user_id) = req.user_id.filter(|id| !id.is_empty()) {
            room.user_ids.insert(name.clone(), user_id);
        }
        let user_id = room.user_ids.get(&name).cloned().unwrap_or_default();

        out.push(Outbound::to_conns(
            recipients.clone(),
            ServerEvent::MicUpdate(room.mic_slots.clone()),
        ));
        out.push(Outbound::to_conns(
            recipients.clone(),
            ServerEvent::UserJoinedMic(MicJoined {
                slot,
                user_name: name.clone(),
                user_id,
            }),
        ));

        let msg = ChatMessage::system(format!("{name} joined mic slot {slot}"));
        room.record(msg.clone(), limit);
        out.push(Outbound::to_conns(recipients, ServerEvent::NewMessage(msg)));
        room.touch();

        tracing::info!(conn_id, room_id = %room_id, slot, user = %name, "User joined mic slot");
        out
    }

    /// Release a mic slot held by the caller's user.
    pub fn leave_mic(&mut self, conn_id: &str, req: LeaveMic) -> Vec<Outbound> {
        let Some(room_id) = req.room_id else {
            return Vec::new();
        };
        let limit = self.history_limit;
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return Vec::new();
        };
        let Some(member) = room.users.get_mut(conn_id) else {
            return Vec::new();
        };
        let name = member.mic_name.clone().unwrap_or_else(|| member.name.clone());
        let Ok(slot) = u8::try_from(req.slot) else {
            return Vec::new();
        };
        if room.mic_slots.get(&slot) != Some(&name) {
            return Vec::new();
        }

        member.mic_name = None;
        room.release_slot_of(&name);
        let recipients = room.members();
        let msg = ChatMessage::system(format!("{name} left mic slot {slot}"));
        room.record(msg.clone(), limit);
        room.touch();

        tracing::info!(conn_id, room_id = %room_id, slot, user = %name, "User left mic slot");
        vec![
            Outbound::to_conns(
                recipients.clone(),
                ServerEvent::UserLeftMic(MicHolder {
                    slot,
                    user_name: name,
                }),
            ),
            Outbound::to_conns(recipients, ServerEvent::NewMessage(msg)),
        ]
    }

    /// Look up which slot a user holds, by TRTC user id first and name second.
    pub fn user_slot(&self, conn_id: &str, req: GetUserSlot) -> Vec<Outbound> {
        let Some(room) = req.room_id.as_deref().and_then(|id| self.rooms.get(id)) else {
            return Vec::new();
        };

        let user_id = req.user_id.unwrap_or_default();
        let target = if !user_id.is_empty() {
            room.user_ids
                .iter()
                .find(|(_, uid)| **uid == user_id)
                .map(|(name, _)| name.clone())
        } else {
            req.user_name.filter(|n| !n.is_empty())
        };

        let Some(name) = target else {
            return Vec::new();
        };
        let Some(&slot) = room.user_slots.get(&name) else {
            return Vec::new();
        };

        vec![Outbound::to_conn(
            conn_id,
            ServerEvent::UserSlotInfo(SlotInfo {
                user_id,
                user_name: name,
                slot,
            }),
        )]
    }
}

fn default_user_name(conn_id: &str) -> String {
    let prefix: String = conn_id.chars().take(DEFAULT_NAME_PREFIX_LEN).collect();
    format!("User_{prefix}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::protocol::Recipients;

    fn join(reg: &mut RoomRegistry, conn: &str, room: &str, name: &str) -> Vec<Outbound> {
        reg.join(
            conn,
            JoinRoom {
                room_id: Some(room.into()),
                user_name: Some(name.into()),
            },
        )
        .unwrap()
    }

    fn join_mic(reg: &mut RoomRegistry, conn: &str, room: &str, slot: i64) -> Vec<Outbound> {
        reg.join_mic(
            conn,
            JoinMic {
                room_id: Some(room.into()),
                slot,
                ..Default::default()
            },
        )
    }

    fn recipients(out: &Outbound) -> Vec<&str> {
        match &out.to {
            Recipients::Conn(c) => vec![c.as_str()],
            Recipients::Conns(cs) => cs.iter().map(String::as_str).collect(),
            Recipients::Everyone => vec!["*"],
        }
    }

    #[test]
    fn join_creates_room_and_sends_state_to_joiner_only() {
        let mut reg = RoomRegistry::default();
        join(&mut reg, "c1", "r1", "ana");
        let out = join(&mut reg, "c2", "r1", "bo");

        assert_eq!(reg.len(), 1);
        assert_eq!(out.len(), 2);
        assert_eq!(recipients(&out[0]), vec!["c2"]);
        assert_matches!(&out[0].event, ServerEvent::RoomData(data) => {
            assert_eq!(data.your_name, "bo");
            assert_eq!(data.users.len(), 2);
            assert_eq!(data.room_id, "r1");
        });
        assert_eq!(recipients(&out[1]), vec!["c1"]);
        assert_matches!(&out[1].event, ServerEvent::NewMessage(m) if m.text == "bo has joined the room" && m.is_system);
    }

    #[test]
    fn join_without_room_id_is_rejected() {
        let mut reg = RoomRegistry::default();
        let err = reg.join("c1", JoinRoom::default()).unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
        assert!(reg.is_empty());
    }

    #[test]
    fn join_without_name_uses_connection_prefix() {
        let mut reg = RoomRegistry::default();
        let out = reg
            .join(
                "abcdef123456",
                JoinRoom {
                    room_id: Some("r".into()),
                    user_name: None,
                },
            )
            .unwrap();
        assert_matches!(&out[0].event, ServerEvent::RoomData(d) if d.your_name == "User_abcdef");
    }

    #[test]
    fn leaving_last_member_deletes_room() {
        let mut reg = RoomRegistry::default();
        join(&mut reg, "c1", "r1", "ana");

        let out = reg.leave(
            "c1",
            LeaveRoom {
                room_id: Some("r1".into()),
            },
        );

        assert!(reg.is_empty());
        assert_eq!(recipients(&out[0]), vec!["c1"]);
        assert_matches!(&out[0].event, ServerEvent::NewMessage(m) if m.text == "ana has left the room");
    }

    #[test]
    fn leave_by_non_member_is_ignored() {
        let mut reg = RoomRegistry::default();
        join(&mut reg, "c1", "r1", "ana");
        let out = reg.leave(
            "c2",
            LeaveRoom {
                room_id: Some("r1".into()),
            },
        );
        assert!(out.is_empty());
        assert_eq!(reg.detail("r1").unwrap().users.len(), 1);
    }

    #[test]
    fn disconnect_frees_slot_and_notifies_remaining_members() {
        let mut reg = RoomRegistry::default();
        join(&mut reg, "c1", "r1", "ana");
        join(&mut reg, "c2", "r1", "bo");
        join_mic(&mut reg, "c1", "r1", 4);

        let out = reg.disconnect("c1");

        assert_eq!(out.len(), 2);
        assert_matches!(&out[0].event, ServerEvent::UserLeftMic(h) if h.slot == 4 && h.user_name == "ana");
        assert_eq!(recipients(&out[0]), vec!["c2"]);
        let detail = reg.detail("r1").unwrap();
        assert!(detail.mic_slots.is_empty());
        assert_eq!(detail.users.len(), 1);
    }

    #[test]
    fn disconnect_cleans_every_joined_room() {
        let mut reg = RoomRegistry::default();
        join(&mut reg, "c1", "r1", "ana");
        join(&mut reg, "c1", "r2", "ana");
        join(&mut reg, "c2", "r2", "bo");

        reg.disconnect("c1");

        assert_eq!(reg.len(), 1);
        assert_eq!(reg.detail("r2").unwrap().users.len(), 1);
    }

    #[test]
    fn send_message_requires_membership_and_text() {
        let mut reg = RoomRegistry::default();
        join(&mut reg, "c1", "r1", "ana");

        let blank = reg.send_message(
            "c1",
            SendMessage {
                room_id: Some("r1".into()),
                text: "   ".into(),
            },
        );
        assert!(blank.is_empty());

        let stranger = reg.send_message(
            "c9",
            SendMessage {
                room_id: Some("r1".into()),
                text: "hi".into(),
            },
        );
        assert!(stranger.is_empty());

        let out = reg.send_message(
            "c1",
            SendMessage {
                room_id: Some("r1".into()),
                text: "  hello  ".into(),
            },
        );
        assert_matches!(&out[0].event, ServerEvent::NewMessage(m) => {
            assert_eq!(m.user, "ana");
            assert_eq!(m.text, "hello");
            assert_eq!(m.socket_id.as_deref(), Some("c1"));
        });
        assert_eq!(recipients(&out[0]), vec!["c1"]);
    }

    #[test]
    fn join_mic_rejects_out_of_range_slots() {
        let mut reg = RoomRegistry::default();
        join(&mut reg, "c1", "r1", "ana");

        for slot in [0, 11, -1, 300] {
            let out = join_mic(&mut reg, "c1", "r1", slot);
            assert_matches!(&out[0].event, ServerEvent::MicError(n) if n.message == "Invalid room or slot");
        }
        let out = join_mic(&mut reg, "c1", "nope", 1);
        assert_matches!(&out[0].event, ServerEvent::MicError(n) if n.message == "Invalid room or slot");
    }

    #[test]
    fn join_mic_requires_membership() {
        let mut reg = RoomRegistry::default();
        join(&mut reg, "c1", "r1", "ana");
        let out = join_mic(&mut reg, "c2", "r1", 1);
        assert_matches!(&out[0].event, ServerEvent::MicError(n) if n.message == "You are not in this room");
    }

    #[test]
    fn taken_slot_is_reported_and_holder_keeps_old_slot() {
        let mut reg = RoomRegistry::default();
        join(&mut reg, "c1", "r1", "ana");
        join(&mut reg, "c2", "r1", "bo");
        join_mic(&mut reg, "c1", "r1", 1);
        join_mic(&mut reg, "c2", "r1", 2);

        let out = join_mic(&mut reg, "c2", "r1", 1);

        assert_eq!(out.len(), 1);
        assert_matches!(&out[0].event, ServerEvent::MicError(n) if n.message == "Slot 1 is already taken by ana");
        let detail = reg.detail("r1").unwrap();
        assert_eq!(detail.mic_slots.get(&2).map(String::as_str), Some("bo"));
    }

    #[test]
    fn moving_slots_releases_previous_one() {
        let mut reg = RoomRegistry::default();
        join(&mut reg, "c1", "r1", "ana");
        join_mic(&mut reg, "c1", "r1", 1);

        let out = join_mic(&mut reg, "c1", "r1", 5);

        assert_matches!(&out[0].event, ServerEvent::UserLeftMic(h) if h.slot == 1);
        assert_matches!(&out[1].event, ServerEvent::MicUpdate(slots) => {
            assert_eq!(slots.len(), 1);
            assert_eq!(slots.get(&5).map(String::as_str), Some("ana"));
        });
        assert_matches!(&out[2].event, ServerEvent::UserJoinedMic(j) if j.slot == 5);
        assert_matches!(&out[3].event, ServerEvent::NewMessage(m) if m.text == "ana joined mic slot 5");
    }

    #[test]
    fn leave_mic_only_releases_own_slot() {
        let mut reg = RoomRegistry::default();
        join(&mut reg, "c1", "r1", "ana");
        join(&mut reg, "c2", "r1", "bo");
        join_mic(&mut reg, "c1", "r1", 3);

        let foreign = reg.leave_mic(
            "c2",
            LeaveMic {
                room_id: Some("r1".into()),
                slot: 3,
            },
        );
        assert!(foreign.is_empty());

        let out = reg.leave_mic(
            "c1",
            LeaveMic {
                room_id: Some("r1".into()),
                slot: 3,
            },
        );
        assert_eq!(out.len(), 2);
        assert_matches!(&out[1].event, ServerEvent::NewMessage(m) if m.text == "ana left mic slot 3");
        assert!(reg.detail("r1").unwrap().mic_slots.is_empty());
    }

    fn join_mic_as(reg: &mut RoomRegistry, conn: &str, room: &str, slot: i64, name: &str) -> Vec<Outbound> {
        reg.join_mic(
            conn,
            JoinMic {
                room_id: Some(room.into()),
                slot,
                user_name: Some(name.into()),
                ..Default::default()
            },
        )
    }

    #[test]
    fn slot_taken_under_display_name_is_released_by_leave_mic() {
        let mut reg = RoomRegistry::default();
        join(&mut reg, "c1", "r1", "ana");
        join_mic_as(&mut reg, "c1", "r1", 2, "Ana Display");

        let out = reg.leave_mic(
            "c1",
            LeaveMic {
                room_id: Some("r1".into()),
                slot: 2,
            },
        );

        assert_eq!(out.len(), 2);
        assert_matches!(&out[0].event, ServerEvent::UserLeftMic(h) if h.slot == 2 && h.user_name == "Ana Display");
        assert!(reg.detail("r1").unwrap().mic_slots.is_empty());
    }

    #[test]
    fn slot_taken_under_display_name_is_released_on_disconnect() {
        let mut reg = RoomRegistry::default();
        join(&mut reg, "c1", "r1", "ana");
        join(&mut reg, "c2", "r1", "bo");
        join_mic_as(&mut reg, "c1", "r1", 2, "Ana Display");

        let out = reg.disconnect("c1");

        assert_matches!(&out[0].event, ServerEvent::UserLeftMic(h) if h.user_name == "Ana Display");
        let detail = reg.detail("r1").unwrap();
        assert_eq!(detail.users.len(), 1);
        assert!(detail.mic_slots.is_empty());
    }

    #[test]
    fn changing_display_name_moves_the_slot_instead_of_leaking_it() {
        let mut reg = RoomRegistry::default();
        join(&mut reg, "c1", "r1", "ana");
        join_mic_as(&mut reg, "c1", "r1", 2, "Ana");

        let out = join_mic_as(&mut reg, "c1", "r1", 4, "Ana B");
        assert_matches!(&out[0].event, ServerEvent::UserLeftMic(h) if h.slot == 2 && h.user_name == "Ana");

        // Renaming in place on the same slot is allowed too.
        join_mic_as(&mut reg, "c1", "r1", 4, "Ana C");
        let slots = reg.detail("r1").unwrap().mic_slots;
        assert_eq!(slots.len(), 1);
        assert_eq!(slots.get(&4).map(String::as_str), Some("Ana C"));
    }

    #[test]
    fn rejoining_under_new_name_keeps_slot_releasable() {
        let mut reg = RoomRegistry::default();
        join(&mut reg, "c1", "r1", "ana");
        join(&mut reg, "c2", "r1", "bo");
        join_mic(&mut reg, "c1", "r1", 3);
        join(&mut reg, "c1", "r1", "anabel");

        let out = reg.leave_mic(
            "c1",
            LeaveMic {
                room_id: Some("r1".into()),
                slot: 3,
            },
        );
        assert_matches!(&out[0].event, ServerEvent::UserLeftMic(h) if h.user_name == "ana");

        join_mic(&mut reg, "c1", "r1", 5);
        reg.disconnect("c1");
        assert!(reg.detail("r1").unwrap().mic_slots.is_empty());
    }

    #[test]
    fn user_slot_lookup_by_trtc_id_and_name() {
        let mut reg = RoomRegistry::default();
        join(&mut reg, "c1", "r1", "ana");
        reg.join_mic(
            "c1",
            JoinMic {
                room_id: Some("r1".into()),
                slot: 7,
                user_id: Some("trtc-ana".into()),
                ..Default::default()
            },
        );

        let by_id = reg.user_slot(
            "c2",
            GetUserSlot {
                room_id: Some("r1".into()),
                user_id: Some("trtc-ana".into()),
                user_name: None,
            },
        );
        assert_eq!(recipients(&by_id[0]), vec!["c2"]);
        assert_matches!(&by_id[0].event, ServerEvent::UserSlotInfo(i) if i.slot == 7 && i.user_name == "ana");

        let by_name = reg.user_slot(
            "c2",
            GetUserSlot {
                room_id: Some("r1".into()),
                user_id: None,
                user_name: Some("ana".into()),
            },
        );
        assert_matches!(&by_name[0].event, ServerEvent::UserSlotInfo(i) if i.user_id.is_empty());

        let missing = reg.user_slot(
            "c2",
            GetUserSlot {
                room_id: Some("r1".into()),
                user_id: Some("someone-else".into()),
                user_name: None,
            },
        );
        assert!(missing.is_empty());
    }

    #[test]
    fn history_is_bounded_but_count_is_total() {
        let mut reg = RoomRegistry::new(2);
        join(&mut reg, "c1", "r1", "ana");
        for i in 0..5 {
            reg.send_message(
                "c1",
                SendMessage {
                    room_id: Some("r1".into()),
                    text: format!("m{i}"),
                },
            );
        }

        assert_eq!(reg.detail("r1").unwrap().message_count, 6);
        assert_eq!(reg.rooms["r1"].history.len(), 2);
    }

    #[test]
    fn summaries_report_counts() {
        let mut reg = RoomRegistry::default();
        join(&mut reg, "c1", "r1", "ana");
        join(&mut reg, "c2", "r1", "bo");
        join(&mut reg, "c3", "r2", "cy");
        join_mic(&mut reg, "c1", "r1", 1);

        let rows = reg.summaries();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "r1");
        assert_eq!(rows[0].user_count, 2);
        assert_eq!(rows[0].active_mics, 1);
        assert_eq!(rows[1].active_mics, 0);
    }

    #[test]
    fn detail_of_unknown_room_is_not_found() {
        let reg = RoomRegistry::default();
        assert_matches!(reg.detail("ghost"), Err(CoreError::NotFound { entity: "Room", .. }));
    }
}
