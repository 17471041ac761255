//! The fixed admin/guest room.
//!
//! Exactly one admin and one guest connection may be registered at a time.
//! The server only relays WebRTC offers, answers and ICE candidates between
//! them; media flows peer to peer.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::protocol::{
    IceCandidate, Outbound, Registration, RelayedAnswer, RelayedCandidate, RelayedOffer, Role,
    ServerEvent, UsersStatus,
};
use crate::types::ConnId;

/// Room id used when none is configured.
pub const DEFAULT_PAIR_ROOM_ID: &str = "ADMIN-VOICE-ROOM-2024";

#[derive(Debug)]
pub struct PairRoom {
    room_id: String,
    admin: Option<ConnId>,
    guest: Option<ConnId>,
}

impl Default for PairRoom {
    fn default() -> Self {
        Self::new(DEFAULT_PAIR_ROOM_ID)
    }
}

impl PairRoom {
    pub fn new(room_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            admin: None,
            guest: None,
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    fn slot(&self, role: Role) -> Option<&ConnId> {
        match role {
            Role::Admin => self.admin.as_ref(),
            Role::Guest => self.guest.as_ref(),
        }
    }

    fn slot_mut(&mut self, role: Role) -> &mut Option<ConnId> {
        match role {
            Role::Admin => &mut self.admin,
            Role::Guest => &mut self.guest,
        }
    }

    /// The role `conn_id` currently holds, if any.
    pub fn role_of(&self, conn_id: &str) -> Option<Role> {
        [Role::Admin, Role::Guest]
            .into_iter()
            .find(|&role| self.slot(role).map(String::as_str) == Some(conn_id))
    }

    /// Claim the admin or guest slot for `conn_id`.
    ///
    /// A connection holds at most one role at a time.
    pub fn register(&mut self, role: Role, conn_id: &str) -> Vec<Outbound> {
        let refusal = match (self.role_of(conn_id), role) {
            (Some(held), _) => Some(format!("Already registered as {}", held.as_str())),
            (None, Role::Admin) if self.admin.is_some() => Some("Admin already exists".into()),
            (None, Role::Guest) if self.guest.is_some() => Some("Guest slot is full".into()),
            (None, _) => None,
        };
        if let Some(error) = refusal {
            return vec![Outbound::to_conn(
                conn_id,
                registered(
                    role,
                    Registration {
                        success: false,
                        error: Some(error),
                    },
                ),
            )];
        }

        *self.slot_mut(role) = Some(conn_id.to_string());
        tracing::info!(conn_id, role = role.as_str(), "Pair room participant registered");

        let mut out = vec![Outbound::to_conn(
            conn_id,
            registered(
                role,
                Registration {
                    success: true,
                    error: None,
                },
            ),
        )];
        if let Some(peer) = self.slot(role.peer()) {
            let joined = match role {
                Role::Admin => ServerEvent::AdminJoined,
                Role::Guest => ServerEvent::GuestJoined,
            };
            out.push(Outbound::to_conn(peer.clone(), joined));
        }
        out
    }

    pub fn status(&self, conn_id: &str) -> Vec<Outbound> {
        vec![Outbound::to_conn(
            conn_id,
            ServerEvent::UsersStatus(UsersStatus {
                admin: self.admin.is_some(),
                guest: self.guest.is_some(),
                room_id: self.room_id.clone(),
            }),
        )]
    }

    /// Forward an offer from `from` to its peer.
    pub fn relay_offer(&self, conn_id: &str, from: Role, offer: Value) -> Vec<Outbound> {
        let event = RelayedOffer { offer, from };
        let event = match from {
            Role::Admin => ServerEvent::AdminOffer(event),
            Role::Guest => ServerEvent::GuestOffer(event),
        };
        self.relay(conn_id, from, event)
    }

    /// Forward an answer from `from` to its peer.
    pub fn relay_answer(&self, conn_id: &str, from: Role, answer: Value) -> Vec<Outbound> {
        let event = RelayedAnswer { answer, from };
        let event = match from {
            Role::Admin => ServerEvent::AdminAnswer(event),
            Role::Guest => ServerEvent::GuestAnswer(event),
        };
        self.relay(conn_id, from, event)
    }

    /// Forward an ICE candidate to the requested target.
    pub fn relay_candidate(&self, conn_id: &str, req: IceCandidate) -> Vec<Outbound> {
        let from = req.target.peer();
        self.relay(
            conn_id,
            from,
            ServerEvent::IceCandidate(RelayedCandidate {
                candidate: req.candidate,
                from,
            }),
        )
    }

    fn relay(&self, conn_id: &str, from: Role, event: ServerEvent) -> Vec<Outbound> {
        if self.role_of(conn_id) != Some(from) {
            tracing::debug!(conn_id, role = from.as_str(), "Dropping relay from unregistered sender");
            return Vec::new();
        }
        match self.slot(from.peer()) {
            Some(peer) => vec![Outbound::to_conn(peer.clone(), event)],
            None => Vec::new(),
        }
    }

    /// Free every slot `conn_id` held and tell everyone.
    pub fn disconnect(&mut self, conn_id: &str) -> Vec<Outbound> {
        let mut out = Vec::new();
        for role in [Role::Admin, Role::Guest] {
            let slot = self.slot_mut(role);
            if slot.as_deref() != Some(conn_id) {
                continue;
            }
            *slot = None;
            tracing::info!(conn_id, role = role.as_str(), "Pair room participant disconnected");

            out.push(Outbound::everyone(match role {
                Role::Admin => ServerEvent::AdminDisconnected,
                Role::Guest => ServerEvent::GuestDisconnected,
            }));
        }
        out
    }
}

fn registered(role: Role, registration: Registration) -> ServerEvent {
    match role {
        Role::Admin => ServerEvent::AdminRegistered(registration),
        Role::Guest => ServerEvent::GuestRegistered(registration),
    }
}

/// Compare a supplied admin password against the configured one.
///
/// Both sides are hashed first so the comparison time does not depend on
/// the length of the common prefix.
pub fn verify_password(expected: &str, given: &str) -> bool {
    Sha256::digest(expected.as_bytes()) == Sha256::digest(given.as_bytes())
}
