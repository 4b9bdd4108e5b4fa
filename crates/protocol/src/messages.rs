//! WebSocket message types for the map-events connection.
//!
//! Outbound traffic is a stream of [`ClientFrame`]s: a correlation id plus a
//! [`MapEvent`] discriminated by its `event` tag. Inbound traffic is a stream
//! of [`ServerMessage`]s: acknowledgments correlated back by `requestId`, and
//! unsolicited robot commands.
//!
//! ## Versioning Policy
//!
//! - New variants can be added at the end (forward compatible)
//! - Removing or renaming variants is a breaking change
//! - Unknown inbound message types deserialize to `ServerMessage::Unknown`

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::responses::AckPayload;
use crate::types::{ChatMessage, MoveCommand, MoveRequestData, PlayerEventData, PlayerSnapshot, Position};

// =============================================================================
// Outbound (Plugin → Backend)
// =============================================================================

/// One outbound frame: correlation id plus event payload.
///
/// The backend acknowledges every frame exactly once, echoing `requestId` on
/// the ack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientFrame {
    #[serde(rename = "requestId")]
    pub request_id: String,
    #[serde(flatten)]
    pub event: MapEvent,
}

/// Events emitted by the plugin, discriminated by the `event` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum MapEvent {
    /// Full snapshot of the room: who is present and what the map looks like.
    RoomState {
        players: Vec<PlayerSnapshot>,
        map: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        places: Option<Vec<String>>,
        #[serde(
            rename = "peopleByPlace",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        people_by_place: Option<BTreeMap<String, Vec<String>>>,
    },
    PlayerMove {
        data: PlayerEventData,
    },
    PlayerEnter {
        data: PlayerEventData,
    },
    PlayerLeave {
        data: PlayerEventData,
    },
    /// Ask the backend where the robot should walk.
    RobotMoveRequest {
        data: MoveRequestData,
    },
    /// Ask the backend for the robot's next chat reply.
    RobotChatRequest {
        messages: Vec<ChatMessage>,
    },
}

impl MapEvent {
    /// Create a `room-state` event without place information.
    pub fn room_state(players: Vec<PlayerSnapshot>, map: Value) -> Self {
        MapEvent::RoomState {
            players,
            map,
            places: None,
            people_by_place: None,
        }
    }

    /// Create a `room-state` event carrying place occupancy.
    pub fn room_state_with_places(
        players: Vec<PlayerSnapshot>,
        map: Value,
        places: Vec<String>,
        people_by_place: BTreeMap<String, Vec<String>>,
    ) -> Self {
        MapEvent::RoomState {
            players,
            map,
            places: Some(places),
            people_by_place: Some(people_by_place),
        }
    }

    pub fn player_move(player: PlayerSnapshot, old_position: Position, new_position: Position) -> Self {
        MapEvent::PlayerMove {
            data: PlayerEventData::Move {
                player,
                old_position,
                new_position,
            },
        }
    }

    pub fn player_enter(player: PlayerSnapshot) -> Self {
        MapEvent::PlayerEnter {
            data: PlayerEventData::Enter { player },
        }
    }

    pub fn player_leave(player: PlayerSnapshot) -> Self {
        MapEvent::PlayerLeave {
            data: PlayerEventData::Leave { player },
        }
    }

    pub fn robot_move_request(player: PlayerSnapshot, content: impl Into<String>) -> Self {
        MapEvent::RobotMoveRequest {
            data: MoveRequestData::new(player, content),
        }
    }

    pub fn robot_chat_request(messages: Vec<ChatMessage>) -> Self {
        MapEvent::RobotChatRequest { messages }
    }

    /// The wire name of this event, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            MapEvent::RoomState { .. } => "room-state",
            MapEvent::PlayerMove { .. } => "player-move",
            MapEvent::PlayerEnter { .. } => "player-enter",
            MapEvent::PlayerLeave { .. } => "player-leave",
            MapEvent::RobotMoveRequest { .. } => "robot-move-request",
            MapEvent::RobotChatRequest { .. } => "robot-chat-request",
        }
    }
}

// =============================================================================
// Inbound (Backend → Plugin)
// =============================================================================

/// Messages from the backend, discriminated by the `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Acknowledgment of one outbound frame.
    Ack {
        #[serde(rename = "requestId")]
        request_id: String,
        #[serde(flatten)]
        ack: AckPayload,
    },
    /// Unsolicited order to walk toward a player.
    RobotMoveCommand {
        #[serde(flatten)]
        command: MoveCommand,
    },
    /// Unknown message type, kept for forward compatibility.
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responses::AckStatus;
    use serde_json::json;

    #[test]
    fn empty_room_state_frame_wire_shape() {
        let frame = ClientFrame {
            request_id: "r1".to_string(),
            event: MapEvent::room_state(vec![], json!({})),
        };

        // places / peopleByPlace must be absent, not null
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({
                "requestId": "r1",
                "event": "room-state",
                "players": [],
                "map": {},
            })
        );
    }

    #[test]
    fn player_move_frame_wire_shape() {
        let frame = ClientFrame {
            request_id: "r2".to_string(),
            event: MapEvent::player_move(
                PlayerSnapshot::named("Alice"),
                Position::new(0, 0),
                Position::new(1, 1),
            ),
        };

        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({
                "requestId": "r2",
                "event": "player-move",
                "data": {
                    "type": "move",
                    "player": {"name": "Alice"},
                    "oldPosition": {"x": 0, "y": 0},
                    "newPosition": {"x": 1, "y": 1},
                },
            })
        );
    }

    #[test]
    fn chat_request_frame_wire_shape() {
        let frame = ClientFrame {
            request_id: "r3".to_string(),
            event: MapEvent::robot_chat_request(vec![ChatMessage::system("You are a bot.")]),
        };

        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({
                "requestId": "r3",
                "event": "robot-chat-request",
                "messages": [{"role": "system", "content": "You are a bot."}],
            })
        );
    }

    #[test]
    fn ack_parses_with_correlation_id() {
        let msg: ServerMessage = serde_json::from_value(json!({
            "type": "ack",
            "requestId": "r4",
            "status": "ok",
            "result": "Hello!",
        }))
        .unwrap();

        match msg {
            ServerMessage::Ack { request_id, ack } => {
                assert_eq!(request_id, "r4");
                assert_eq!(ack.status, Some(AckStatus::Ok));
                assert_eq!(ack.result.as_deref(), Some("Hello!"));
            }
            other => panic!("expected ack, got {:?}", other),
        }
    }

    #[test]
    fn move_command_parses() {
        let msg: ServerMessage = serde_json::from_value(json!({
            "type": "robot-move-command",
            "trigger": true,
            "destPlayerName": "Alice",
        }))
        .unwrap();

        match msg {
            ServerMessage::RobotMoveCommand { command } => {
                assert!(command.trigger);
                assert_eq!(command.dest_player_name, "Alice");
            }
            other => panic!("expected move command, got {:?}", other),
        }
    }

    #[test]
    fn unknown_message_type_does_not_fail() {
        let msg: ServerMessage =
            serde_json::from_value(json!({"type": "brand-new-thing", "x": 1})).unwrap();
        assert_eq!(msg, ServerMessage::Unknown);
    }

    #[test]
    fn event_kinds_match_wire_names() {
        assert_eq!(MapEvent::room_state(vec![], json!({})).kind(), "room-state");
        assert_eq!(
            MapEvent::player_enter(PlayerSnapshot::named("A")).kind(),
            "player-enter"
        );
        assert_eq!(MapEvent::robot_chat_request(vec![]).kind(), "robot-chat-request");
    }
}
