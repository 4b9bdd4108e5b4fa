//! Mapbot Protocol - wire-format types for the map-events socket
//!
//! This crate contains every type exchanged over the persistent WebSocket
//! between the plugin and the map-events backend:
//! - Outbound frames (`ClientFrame` wrapping a `MapEvent`)
//! - Inbound messages (`ServerMessage`: acks and robot commands)
//! - Acknowledgment payloads and client-side request errors
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - only serde and serde_json
//! 2. **No business logic** - pure data types and serialization
//! 3. **Forward compatible** - unknown inbound message types deserialize to
//!    `ServerMessage::Unknown` instead of failing

pub mod messages;
pub mod responses;
pub mod types;

pub use messages::{ClientFrame, MapEvent, ServerMessage};
pub use responses::{AckPayload, AckStatus, RequestError};
pub use types::{
    ChatMessage, ChatRole, MoveCommand, MoveRequestData, PlayerEventData, PlayerSnapshot, Position,
};
