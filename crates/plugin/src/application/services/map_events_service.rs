//! The bridge between domain-shaped calls and the two calling conventions of
//! the dispatcher.
//!
//! Pure adaptation, no business logic: room snapshots and player lifecycle
//! events go out as fire-and-forget notifications (a dropped push never blocks
//! gameplay); robot decisions go out as requests whose answer or error reaches
//! the caller; inbound move orders are fanned out to the single registered
//! movement subscriber.

use std::collections::BTreeMap;

use serde_json::Value;

use mapbot_protocol::{ChatMessage, MapEvent, MoveCommand, PlayerSnapshot, Position};

use crate::application::error::ServiceError;
use crate::infrastructure::messaging::{
    CommandKind, CommandRegistry, EventDispatcher, InboundCommand,
};
use crate::infrastructure::websocket::{Connection, DEFAULT_REQUEST_TIMEOUT_MS};

/// Domain-facing API over the map-events connection.
#[derive(Clone)]
pub struct MapEventsService {
    dispatcher: EventDispatcher,
    commands: CommandRegistry,
    request_timeout_ms: u64,
}

impl MapEventsService {
    pub fn new(dispatcher: EventDispatcher, commands: CommandRegistry) -> Self {
        Self {
            dispatcher,
            commands,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }

    /// Build the service from a freshly created connection.
    pub fn from_connection(connection: &Connection) -> Self {
        Self::new(connection.dispatcher.clone(), connection.commands.clone())
    }

    pub fn with_request_timeout(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    /// Push a full room snapshot. Best-effort.
    pub async fn send_room_state(
        &self,
        players: Vec<PlayerSnapshot>,
        map: Value,
    ) -> Result<(), ServiceError> {
        self.dispatcher
            .notify(MapEvent::room_state(players, map))
            .await?;
        Ok(())
    }

    /// Push a room snapshot including place occupancy. Best-effort.
    pub async fn send_room_state_with_places(
        &self,
        players: Vec<PlayerSnapshot>,
        map: Value,
        places: Vec<String>,
        people_by_place: BTreeMap<String, Vec<String>>,
    ) -> Result<(), ServiceError> {
        self.dispatcher
            .notify(MapEvent::room_state_with_places(
                players,
                map,
                places,
                people_by_place,
            ))
            .await?;
        Ok(())
    }

    pub async fn send_player_move(
        &self,
        player: PlayerSnapshot,
        old_position: Position,
        new_position: Position,
    ) -> Result<(), ServiceError> {
        self.dispatcher
            .notify(MapEvent::player_move(player, old_position, new_position))
            .await?;
        Ok(())
    }

    pub async fn send_player_enter(&self, player: PlayerSnapshot) -> Result<(), ServiceError> {
        self.dispatcher
            .notify(MapEvent::player_enter(player))
            .await?;
        Ok(())
    }

    pub async fn send_player_leave(&self, player: PlayerSnapshot) -> Result<(), ServiceError> {
        self.dispatcher
            .notify(MapEvent::player_leave(player))
            .await?;
        Ok(())
    }

    /// Ask the backend where the robot should walk. The caller gets the
    /// destination decision string or a surfaced error.
    pub async fn send_robot_move_request(
        &self,
        player: PlayerSnapshot,
        content: impl Into<String>,
    ) -> Result<String, ServiceError> {
        let reply = self
            .dispatcher
            .request_with_timeout(
                MapEvent::robot_move_request(player, content),
                self.request_timeout_ms,
            )
            .await?;
        Ok(reply)
    }

    /// Ask the backend for the robot's next chat reply.
    pub async fn send_robot_chat_request(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<String, ServiceError> {
        let reply = self
            .dispatcher
            .request_with_timeout(
                MapEvent::robot_chat_request(messages),
                self.request_timeout_ms,
            )
            .await?;
        Ok(reply)
    }

    /// Register the single movement subscriber (last registration wins).
    ///
    /// A `robot-move-command` arriving before registration is logged and
    /// dropped by the registry, never buffered.
    pub async fn on_move_command(&self, callback: impl Fn(MoveCommand) + Send + 'static) {
        self.commands
            .register(CommandKind::RobotMove, move |command| {
                let InboundCommand::RobotMove(command) = command;
                callback(command);
            })
            .await;
    }
}
