//! Domain logic for the voice chat signaling server.
//!
//! Everything in this crate is synchronous and transport-agnostic: the room
//! registry and pair room take a connection id plus a decoded client event
//! and return the [`protocol::Outbound`] deliveries the transport layer must
//! perform.

pub mod error;
pub mod pairing;
pub mod protocol;
pub mod rooms;
pub mod trtc;
pub mod types;
