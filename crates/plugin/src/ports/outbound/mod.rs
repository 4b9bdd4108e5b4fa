//! Outbound ports: interfaces the application needs from the outside world.

mod host;

pub use host::{
    ChatCallback, ChatTurn, HostPlayer, HostPort, NotifyCallback, PlayerCallback,
    PlayerMovedCallback, PlayerMovedEvent, PlayersCallback, PopupHandle, Subscription,
};

#[cfg(any(test, feature = "testing"))]
pub use host::MockHostPort;
