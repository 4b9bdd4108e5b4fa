//! Inbound command registry.
//!
//! The backend can push unsolicited commands at the plugin. Each command kind
//! has at most one registered handler: registration overwrites (last
//! registration wins), and a command arriving with no handler is logged and
//! dropped - never queued, never retried.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use mapbot_protocol::MoveCommand;

/// Command kinds the backend may push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    RobotMove,
}

impl CommandKind {
    /// The wire name of this kind, for logging.
    pub fn name(self) -> &'static str {
        match self {
            CommandKind::RobotMove => "robot-move-command",
        }
    }
}

/// An unsolicited command received from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundCommand {
    RobotMove(MoveCommand),
}

impl InboundCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            InboundCommand::RobotMove(_) => CommandKind::RobotMove,
        }
    }
}

pub type CommandHandler = Box<dyn Fn(InboundCommand) + Send + 'static>;

/// Single-slot handler registry for inbound commands.
///
/// Holds a caller-supplied callback per kind for the lifetime of the
/// connection. Deliberately not a subscriber list: the consuming collaborator
/// owns its kind, and a later registration silently replaces the earlier one.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    slots: Arc<Mutex<HashMap<CommandKind, CommandHandler>>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the handler for one command kind.
    pub async fn register(
        &self,
        kind: CommandKind,
        handler: impl Fn(InboundCommand) + Send + 'static,
    ) {
        let mut slots = self.slots.lock().await;
        if slots.insert(kind, Box::new(handler)).is_some() {
            tracing::debug!(kind = kind.name(), "replacing inbound command handler");
        }
    }

    /// Deliver a command to its registered handler.
    ///
    /// Returns false (after a logged warning) when no handler is registered;
    /// the command is dropped.
    pub async fn dispatch(&self, command: InboundCommand) -> bool {
        let slots = self.slots.lock().await;
        match slots.get(&command.kind()) {
            Some(handler) => {
                handler(command);
                true
            }
            None => {
                tracing::warn!(
                    kind = command.kind().name(),
                    "dropping inbound command: no handler registered"
                );
                false
            }
        }
    }
}
