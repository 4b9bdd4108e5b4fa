//! Host platform port.
//!
//! The plugin runs inside a host client that owns rendering, movement and the
//! chat UI. Everything the plugin needs from it goes through this trait, so
//! the whole plugin is testable against a mock host. Event subscriptions are
//! explicit registrations returning a [`Subscription`] disposer; dropping the
//! disposer detaches the callback.

use async_trait::async_trait;
use serde_json::Value;

use mapbot_protocol::{PlayerSnapshot, Position};

/// The host's view of one player (ourselves or a remote).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPlayer {
    pub id: Option<u32>,
    pub name: String,
    pub position: Option<Position>,
    pub tags: Vec<String>,
}

impl HostPlayer {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            position: None,
            tags: Vec::new(),
        }
    }

    /// Reduce to the wire-format snapshot sent to the backend.
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            name: self.name.clone(),
            position: self.position,
            tags: self.tags.clone(),
        }
    }
}

/// A remote player moved.
#[derive(Debug, Clone)]
pub struct PlayerMovedEvent {
    pub player: HostPlayer,
    pub old_position: Position,
    pub new_position: Position,
}

/// One received chat message. `author` is `None` for our own messages echoed
/// back by the host.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub author: Option<HostPlayer>,
    pub message: String,
}

pub type PlayerMovedCallback = Box<dyn Fn(PlayerMovedEvent) + Send + Sync>;
pub type PlayerCallback = Box<dyn Fn(HostPlayer) + Send + Sync>;
pub type PlayersCallback = Box<dyn Fn(Vec<HostPlayer>) + Send + Sync>;
pub type NotifyCallback = Box<dyn Fn() + Send + Sync>;
pub type ChatCallback = Box<dyn Fn(ChatTurn) + Send + Sync>;

/// Disposer for one event registration. Dropping it detaches the callback.
pub struct Subscription {
    on_dispose: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(on_dispose: impl FnOnce() + Send + 'static) -> Self {
        Self {
            on_dispose: Some(Box::new(on_dispose)),
        }
    }

    /// A subscription with nothing to tear down (tests, stub hosts).
    pub fn noop() -> Self {
        Self { on_dispose: None }
    }

    /// Detach explicitly; equivalent to dropping.
    pub fn dispose(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(dispose) = self.on_dispose.take() {
            dispose();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("live", &self.on_dispose.is_some())
            .finish()
    }
}

/// Handle to one open popup.
pub struct PopupHandle {
    on_close: Option<Box<dyn FnOnce() + Send>>,
}

impl PopupHandle {
    pub fn new(on_close: impl FnOnce() + Send + 'static) -> Self {
        Self {
            on_close: Some(Box::new(on_close)),
        }
    }

    /// A handle with nothing behind it (tests, stub hosts).
    pub fn noop() -> Self {
        Self { on_close: None }
    }

    pub fn close(mut self) {
        if let Some(close) = self.on_close.take() {
            close();
        }
    }
}

impl std::fmt::Debug for PopupHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PopupHandle")
            .field("open", &self.on_close.is_some())
            .finish()
    }
}

/// Port over the host platform's scripting API.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait HostPort: Send + Sync {
    /// Our own player.
    async fn me(&self) -> HostPlayer;

    /// The host's identifier for the current room.
    async fn room_id(&self) -> String;

    /// Every player currently tracked in the room.
    async fn players(&self) -> Vec<HostPlayer>;

    /// The raw tiled map the room renders.
    async fn tiled_map(&self) -> anyhow::Result<Value>;

    /// Walk our player toward a position.
    async fn move_to(&self, position: Position) -> anyhow::Result<()>;

    /// Send a chat message into the current bubble.
    async fn send_chat(&self, message: String) -> anyhow::Result<()>;

    async fn start_typing(&self);
    async fn stop_typing(&self);

    /// Publish a player-state variable visible to others.
    async fn save_variable(&self, name: String, value: Value) -> anyhow::Result<()>;

    /// Open a popup anchored to a named map object.
    async fn open_popup(&self, anchor: String, message: String) -> PopupHandle;

    fn on_player_moves(&self, callback: PlayerMovedCallback) -> Subscription;
    fn on_player_enters(&self, callback: PlayerCallback) -> Subscription;
    fn on_player_leaves(&self, callback: PlayerCallback) -> Subscription;
    fn on_area_enter(&self, area: &str, callback: NotifyCallback) -> Subscription;
    fn on_area_leave(&self, area: &str, callback: NotifyCallback) -> Subscription;
    fn on_proximity_join(&self, callback: PlayersCallback) -> Subscription;
    fn on_participant_join(&self, callback: PlayerCallback) -> Subscription;
    fn on_proximity_leave(&self, callback: NotifyCallback) -> Subscription;
    fn on_chat_message(&self, callback: ChatCallback) -> Subscription;
    /// A player's public state variable changed.
    fn on_player_variable_change(&self, variable: &str, callback: PlayerCallback) -> Subscription;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn dropping_a_subscription_detaches() {
        let detached = Arc::new(AtomicBool::new(false));
        let detached_clone = Arc::clone(&detached);

        let subscription = Subscription::new(move || {
            detached_clone.store(true, Ordering::SeqCst);
        });
        assert!(!detached.load(Ordering::SeqCst));

        drop(subscription);
        assert!(detached.load(Ordering::SeqCst));
    }

    #[test]
    fn snapshot_carries_identity_and_position() {
        let player = HostPlayer {
            id: Some(7),
            name: "Alice".to_string(),
            position: Some(Position::new(3, 4)),
            tags: vec!["member".to_string()],
        };

        let snapshot = player.snapshot();
        assert_eq!(snapshot.id, Some(7));
        assert_eq!(snapshot.name, "Alice");
        assert_eq!(snapshot.position, Some(Position::new(3, 4)));
        assert_eq!(snapshot.tags, vec!["member".to_string()]);
    }
}
