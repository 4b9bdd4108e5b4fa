//! Connection lifecycle management.
//!
//! This module provides the observable connection state plus the readiness
//! gate that outbound callers wait on. Both are owned by the WebSocket bridge;
//! everything else only reads them.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::{oneshot, watch};

use mapbot_protocol::RequestError;

/// Connection state for the map-events socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected and not trying (initial, or given up / closed)
    Disconnected,
    /// Attempting to establish (or re-establish) the connection
    Connecting,
    /// Successfully connected
    Connected,
}

impl ConnectionState {
    /// Convert to u8 for atomic storage.
    pub fn to_u8(self) -> u8 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
        }
    }

    /// Convert from u8 (atomic storage).
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        }
    }
}

/// Internal helper to update connection state (used by the bridge).
pub fn set_connection_state(state_ref: &AtomicU8, new_state: ConnectionState) {
    state_ref.store(new_state.to_u8(), Ordering::SeqCst);
}

// =============================================================================
// ReadyGate
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum GateState {
    /// No usable connection yet; waiters suspend.
    Waiting,
    /// Connected; waiters pass immediately.
    Open,
    /// The manager gave up (reconnect exhaustion or explicit close); waiters
    /// fail with the reason until a fresh cycle resets the gate.
    Failed(String),
}

/// Awaitable "became connected" signal.
///
/// One gate exists per connection. Every outage gets a fresh pending cycle:
/// `reset()` replaces the outstanding signal, so a caller that started
/// waiting before a drop keeps waiting for the *next* open rather than
/// observing a stale resolution. `fail()` settles the current cycle and every
/// later waiter with an error, until `reset()` starts a new cycle.
#[derive(Clone)]
pub struct ReadyGate {
    tx: Arc<watch::Sender<GateState>>,
}

impl ReadyGate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(GateState::Waiting);
        Self { tx: Arc::new(tx) }
    }

    /// The connection is up; release all waiters.
    pub fn open(&self) {
        self.tx.send_replace(GateState::Open);
    }

    /// The connection dropped; start a new pending cycle.
    pub fn reset(&self) {
        self.tx.send_replace(GateState::Waiting);
    }

    /// Give up; settle all current and future waiters with `reason`.
    pub fn fail(&self, reason: impl Into<String>) {
        self.tx.send_replace(GateState::Failed(reason.into()));
    }

    pub fn is_open(&self) -> bool {
        *self.tx.borrow() == GateState::Open
    }

    /// Wait until the connection is ready.
    ///
    /// Returns immediately when the gate is open, errs immediately when it has
    /// failed, and otherwise suspends until one of the two happens. Safe to
    /// call from any number of tasks; all waiters of one outage settle on the
    /// same transition.
    pub async fn ready(&self) -> Result<(), RequestError> {
        let mut rx = self.tx.subscribe();
        loop {
            let state = rx.borrow_and_update().clone();
            match state {
                GateState::Open => return Ok(()),
                GateState::Failed(reason) => return Err(RequestError::ConnectionFailed(reason)),
                GateState::Waiting => {}
            }
            if rx.changed().await.is_err() {
                return Err(RequestError::Cancelled);
            }
        }
    }
}

impl Default for ReadyGate {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Handle + observer
// =============================================================================

/// Handle to manage the connection lifecycle.
///
/// Dropping the handle does NOT disconnect; call `disconnect()` explicitly.
pub struct ConnectionHandle {
    state: Arc<AtomicU8>,
    disconnect_tx: Option<oneshot::Sender<()>>,
}

impl ConnectionHandle {
    pub fn new(state: Arc<AtomicU8>, disconnect_tx: oneshot::Sender<()>) -> Self {
        Self {
            state,
            disconnect_tx: Some(disconnect_tx),
        }
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Request disconnect.
    ///
    /// Consumes the handle: a closed connection is never reconnected; create a
    /// new connection instead. The close may not be instant - observe
    /// `state()` through an observer to verify.
    pub fn disconnect(mut self) {
        if let Some(tx) = self.disconnect_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Get a clone of the state Arc for sharing with observers.
    pub fn state_arc(&self) -> Arc<AtomicU8> {
        Arc::clone(&self.state)
    }
}

/// Observable connection state, shareable without owning the handle.
#[derive(Clone)]
pub struct ConnectionStateObserver {
    state: Arc<AtomicU8>,
}

impl ConnectionStateObserver {
    pub fn new(state: Arc<AtomicU8>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }
}
