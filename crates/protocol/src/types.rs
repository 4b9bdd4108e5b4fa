//! Shared vocabulary types carried inside wire frames.
//!
//! Field names follow the backend's JSON conventions (camelCase keys,
//! lowercase `type` tags), so serde renames are applied where Rust naming
//! differs.

use serde::{Deserialize, Serialize};

/// A tile-space position on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// The backend's view of one player.
///
/// Only the fields the backend consumes are carried; the host-side player
/// object is reduced to this snapshot before crossing the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl PlayerSnapshot {
    /// A snapshot carrying only a name, for payloads where the backend needs
    /// no more than an identity.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            position: None,
            tags: Vec::new(),
        }
    }
}

/// Payload of the player lifecycle events (`player-move`, `player-enter`,
/// `player-leave`); the `type` tag discriminates on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PlayerEventData {
    Move {
        player: PlayerSnapshot,
        #[serde(rename = "oldPosition")]
        old_position: Position,
        #[serde(rename = "newPosition")]
        new_position: Position,
    },
    Enter {
        player: PlayerSnapshot,
    },
    Leave {
        player: PlayerSnapshot,
    },
}

/// Payload of `robot-move-request`: the robot's own snapshot plus the prompt
/// the backend should reason over. Always tagged `type: "move"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MoveRequestData {
    Move {
        player: PlayerSnapshot,
        content: String,
    },
}

impl MoveRequestData {
    pub fn new(player: PlayerSnapshot, content: impl Into<String>) -> Self {
        MoveRequestData::Move {
            player,
            content: content.into(),
        }
    }
}

/// Role of one turn in a robot chat conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One turn of a robot chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Payload of the unsolicited `robot-move-command` sent by the backend.
///
/// `trigger` gates execution; `dest_player_name` names the player the robot
/// should walk toward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCommand {
    pub trigger: bool,
    #[serde(rename = "destPlayerName")]
    pub dest_player_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn player_move_data_wire_shape() {
        let data = PlayerEventData::Move {
            player: PlayerSnapshot::named("Alice"),
            old_position: Position::new(1, 2),
            new_position: Position::new(3, 4),
        };

        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            json!({
                "type": "move",
                "player": {"name": "Alice"},
                "oldPosition": {"x": 1, "y": 2},
                "newPosition": {"x": 3, "y": 4},
            })
        );
    }

    #[test]
    fn chat_roles_are_lowercase() {
        let msg = ChatMessage::assistant("hi");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"role": "assistant", "content": "hi"})
        );
    }

    #[test]
    fn move_command_uses_camel_case_dest() {
        let cmd: MoveCommand =
            serde_json::from_value(json!({"trigger": true, "destPlayerName": "Alice"})).unwrap();
        assert!(cmd.trigger);
        assert_eq!(cmd.dest_player_name, "Alice");
    }

    #[test]
    fn snapshot_omits_empty_fields() {
        let snapshot = PlayerSnapshot::named("Bob");
        assert_eq!(
            serde_json::to_value(&snapshot).unwrap(),
            json!({"name": "Bob"})
        );
    }
}
