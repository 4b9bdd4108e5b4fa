//! Messaging layer: connection lifecycle, outbound dispatch, inbound commands.

mod commands;
mod connection;
mod dispatcher;

pub use commands::{CommandHandler, CommandKind, CommandRegistry, InboundCommand};
pub use connection::{
    set_connection_state, ConnectionHandle, ConnectionState, ConnectionStateObserver, ReadyGate,
};
pub use dispatcher::{AckCallback, EventDispatcher, PendingAcks};
