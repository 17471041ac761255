//! Signaling wire format.
//!
//! Every WebSocket text frame carries one JSON envelope:
//!
//! ```text
//! {"event": "join_room", "data": {"roomId": "42", "userName": "ana"}}
//! ```
//!
//! `data` may be omitted for events without a payload. Client payload fields
//! are camelCase and optional unless the event cannot be acted upon without
//! them (relayed SDP and ICE payloads).

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::types::{ConnId, Timestamp};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Invalid payload for '{event}': {source}")]
    InvalidPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// A participant slot in the admin/guest pair room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Guest,
}

impl Role {
    /// The opposite side of the pair.
    pub fn peer(self) -> Role {
        match self {
            Role::Admin => Role::Guest,
            Role::Guest => Role::Admin,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Guest => "guest",
        }
    }
}

// ---------------------------------------------------------------------------
// Client -> server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JoinRoom {
    #[serde(deserialize_with = "room_id")]
    pub room_id: Option<String>,
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LeaveRoom {
    #[serde(deserialize_with = "room_id")]
    pub room_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SendMessage {
    #[serde(deserialize_with = "room_id")]
    pub room_id: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JoinMic {
    #[serde(deserialize_with = "room_id")]
    pub room_id: Option<String>,
    #[serde(deserialize_with = "slot_number")]
    pub slot: i64,
    pub user_name: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LeaveMic {
    #[serde(deserialize_with = "room_id")]
    pub room_id: Option<String>,
    #[serde(deserialize_with = "slot_number")]
    pub slot: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GetUserSlot {
    #[serde(deserialize_with = "room_id")]
    pub room_id: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Offer {
    pub offer: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Answer {
    pub answer: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IceCandidate {
    pub target: Role,
    pub candidate: Value,
}

/// A decoded client event.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    JoinRoom(JoinRoom),
    LeaveRoom(LeaveRoom),
    SendMessage(SendMessage),
    JoinMic(JoinMic),
    LeaveMic(LeaveMic),
    GetUserSlot(GetUserSlot),
    Ping,
    RegisterAdmin,
    RegisterGuest,
    GetUsers,
    AdminOffer(Offer),
    AdminAnswer(Answer),
    GuestOffer(Offer),
    GuestAnswer(Answer),
    IceCandidate(IceCandidate),
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

impl ClientEvent {
    /// Decode a text frame into a client event.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let Envelope { event, data } = serde_json::from_str(text)?;
        let data = match data {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };

        let event = match event.as_str() {
            "join_room" => ClientEvent::JoinRoom(payload(&event, data)?),
            "leave_room" => ClientEvent::LeaveRoom(payload(&event, data)?),
            "send_message" => ClientEvent::SendMessage(payload(&event, data)?),
            "join_mic" => ClientEvent::JoinMic(payload(&event, data)?),
            "leave_mic" => ClientEvent::LeaveMic(payload(&event, data)?),
            "get_user_slot" => ClientEvent::GetUserSlot(payload(&event, data)?),
            "ping" => ClientEvent::Ping,
            "register-admin" => ClientEvent::RegisterAdmin,
            "register-guest" => ClientEvent::RegisterGuest,
            "get-users" => ClientEvent::GetUsers,
            "admin-offer" => ClientEvent::AdminOffer(payload(&event, data)?),
            "admin-answer" => ClientEvent::AdminAnswer(payload(&event, data)?),
            "guest-offer" => ClientEvent::GuestOffer(payload(&event, data)?),
            "guest-answer" => ClientEvent::GuestAnswer(payload(&event, data)?),
            "ice-candidate" => ClientEvent::IceCandidate(payload(&event, data)?),
            _ => return Err(ProtocolError::UnknownEvent(event)),
        };
        Ok(event)
    }

    /// Wire name of the event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::JoinRoom(_) => "join_room",
            ClientEvent::LeaveRoom(_) => "leave_room",
            ClientEvent::SendMessage(_) => "send_message",
            ClientEvent::JoinMic(_) => "join_mic",
            ClientEvent::LeaveMic(_) => "leave_mic",
            ClientEvent::GetUserSlot(_) => "get_user_slot",
            ClientEvent::Ping => "ping",
            ClientEvent::RegisterAdmin => "register-admin",
            ClientEvent::RegisterGuest => "register-guest",
            ClientEvent::GetUsers => "get-users",
            ClientEvent::AdminOffer(_) => "admin-offer",
            ClientEvent::AdminAnswer(_) => "admin-answer",
            ClientEvent::GuestOffer(_) => "guest-offer",
            ClientEvent::GuestAnswer(_) => "guest-answer",
            ClientEvent::IceCandidate(_) => "ice-candidate",
        }
    }
}

fn payload<T: for<'de> Deserialize<'de>>(event: &str, data: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(data).map_err(|source| ProtocolError::InvalidPayload {
        event: event.to_string(),
        source,
    })
}

/// Room ids arrive as strings or numbers; both normalize to a trimmed string.
fn room_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }))
}

/// Slots arrive as numbers or numeric strings; anything else becomes 0,
/// which is never a valid slot.
fn slot_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

// ---------------------------------------------------------------------------
// Server -> client
// ---------------------------------------------------------------------------

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Connected {
    pub sid: ConnId,
    pub status: &'static str,
}

/// Public view of a room member.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserView {
    pub name: String,
    pub joined_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomData {
    pub mic_slots: BTreeMap<u8, String>,
    pub users: Vec<UserView>,
    pub room_id: String,
    pub your_name: String,
}

/// One entry of a room's chat feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub user: String,
    pub text: String,
    pub timestamp: Timestamp,
    #[serde(rename = "isSystem", skip_serializing_if = "is_false")]
    pub is_system: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_id: Option<ConnId>,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            user: "System".to_string(),
            text: text.into(),
            timestamp: chrono::Utc::now(),
            is_system: true,
            socket_id: None,
        }
    }

    pub fn from_user(user: impl Into<String>, text: impl Into<String>, conn_id: &str) -> Self {
        Self {
            user: user.into(),
            text: text.into(),
            timestamp: chrono::Utc::now(),
            is_system: false,
            socket_id: Some(conn_id.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MicHolder {
    pub slot: u8,
    pub user_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MicJoined {
    pub slot: u8,
    pub user_name: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotInfo {
    pub user_id: String,
    pub user_name: String,
    pub slot: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub message: String,
}

impl Notice {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pong {
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Registration {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsersStatus {
    pub admin: bool,
    pub guest: bool,
    pub room_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayedOffer {
    pub offer: Value,
    pub from: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayedAnswer {
    pub answer: Value,
    pub from: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayedCandidate {
    pub candidate: Value,
    pub from: Role,
}

/// An event pushed to one or more clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "connected")]
    Connected(Connected),
    #[serde(rename = "room_data")]
    RoomData(RoomData),
    #[serde(rename = "new_message")]
    NewMessage(ChatMessage),
    #[serde(rename = "user_left_mic")]
    UserLeftMic(MicHolder),
    #[serde(rename = "user_joined_mic")]
    UserJoinedMic(MicJoined),
    #[serde(rename = "mic_update")]
    MicUpdate(BTreeMap<u8, String>),
    #[serde(rename = "mic_error")]
    MicError(Notice),
    #[serde(rename = "user_slot_info")]
    UserSlotInfo(SlotInfo),
    #[serde(rename = "pong")]
    Pong(Pong),
    #[serde(rename = "admin-registered")]
    AdminRegistered(Registration),
    #[serde(rename = "guest-registered")]
    GuestRegistered(Registration),
    #[serde(rename = "admin-joined")]
    AdminJoined,
    #[serde(rename = "guest-joined")]
    GuestJoined,
    #[serde(rename = "admin-disconnected")]
    AdminDisconnected,
    #[serde(rename = "guest-disconnected")]
    GuestDisconnected,
    #[serde(rename = "users-status")]
    UsersStatus(UsersStatus),
    #[serde(rename = "admin-offer")]
    AdminOffer(RelayedOffer),
    #[serde(rename = "admin-answer")]
    AdminAnswer(RelayedAnswer),
    #[serde(rename = "guest-offer")]
    GuestOffer(RelayedOffer),
    #[serde(rename = "guest-answer")]
    GuestAnswer(RelayedAnswer),
    #[serde(rename = "ice-candidate")]
    IceCandidate(RelayedCandidate),
    #[serde(rename = "error")]
    Error(Notice),
}

impl ServerEvent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

/// Who receives an outbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum Recipients {
    Conn(ConnId),
    Conns(Vec<ConnId>),
    Everyone,
}

/// A server event paired with its recipients.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub to: Recipients,
    pub event: ServerEvent,
}

impl Outbound {
    pub fn to_conn(conn_id: impl Into<ConnId>, event: ServerEvent) -> Self {
        Self {
            to: Recipients::Conn(conn_id.into()),
            event,
        }
    }

    pub fn to_conns(conn_ids: Vec<ConnId>, event: ServerEvent) -> Self {
        Self {
            to: Recipients::Conns(conn_ids),
            event,
        }
    }

    pub fn everyone(event: ServerEvent) -> Self {
        Self {
            to: Recipients::Everyone,
            event,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
