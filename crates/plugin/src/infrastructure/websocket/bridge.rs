//! WebSocket bridge - wires the transport client to the dispatcher, the
//! readiness gate, and the inbound command registry.
//!
//! `create_connection` spawns two background tasks: the client's supervision
//! loop (connect / pump / retry) and the bridge loop that forwards outbound
//! frames and reacts to lifecycle events. Everything callers touch afterwards
//! is a cheap handle: `EventDispatcher`, `CommandRegistry`,
//! `ConnectionHandle`, `ConnectionStateObserver`.

use std::sync::atomic::AtomicU8;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};

use mapbot_protocol::{ClientFrame, ServerMessage};

use crate::infrastructure::messaging::{
    set_connection_state, CommandRegistry, ConnectionHandle, ConnectionState,
    ConnectionStateObserver, EventDispatcher, InboundCommand, PendingAcks, ReadyGate,
};

use super::client::{BackendClient, ConnectionEvent};
use super::shared::ConnectionConfig;

/// Result of creating a connection.
pub struct Connection {
    /// Send map events and requests to the backend.
    pub dispatcher: EventDispatcher,
    /// Register handlers for unsolicited backend commands.
    pub commands: CommandRegistry,
    /// Control the connection lifecycle.
    pub handle: ConnectionHandle,
    /// Observe connection state without owning the handle.
    pub state_observer: ConnectionStateObserver,
}

/// Open the map-events connection and return its handles.
pub fn create_connection(config: ConnectionConfig) -> Connection {
    let (cmd_tx, cmd_rx) = mpsc::channel::<ClientFrame>(32);
    let (disconnect_tx, disconnect_rx) = oneshot::channel::<()>();

    let pending = Arc::new(Mutex::new(PendingAcks::default()));
    let state = Arc::new(AtomicU8::new(ConnectionState::Disconnected.to_u8()));
    let gate = ReadyGate::new();
    let commands = CommandRegistry::new();

    let dispatcher = EventDispatcher::new(cmd_tx, Arc::clone(&pending), gate.clone());
    let state_observer = ConnectionStateObserver::new(Arc::clone(&state));

    let client = BackendClient::new(config);
    {
        let commands = commands.clone();
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            bridge_task(client, cmd_rx, disconnect_rx, state, gate, pending, commands).await;
        });
    }

    let handle = ConnectionHandle::new(state, disconnect_tx);

    Connection {
        dispatcher,
        commands,
        handle,
        state_observer,
    }
}

async fn bridge_task(
    client: BackendClient,
    mut cmd_rx: mpsc::Receiver<ClientFrame>,
    mut disconnect_rx: oneshot::Receiver<()>,
    state: Arc<AtomicU8>,
    gate: ReadyGate,
    pending: Arc<Mutex<PendingAcks>>,
    commands: CommandRegistry,
) {
    // Lifecycle events drive the state machine, the gate, and pending acks.
    {
        let state = Arc::clone(&state);
        let gate = gate.clone();
        let pending = Arc::clone(&pending);
        client
            .set_on_event(move |event| match event {
                ConnectionEvent::Connecting { .. } => {
                    set_connection_state(&state, ConnectionState::Connecting);
                }
                ConnectionEvent::Opened => {
                    set_connection_state(&state, ConnectionState::Connected);
                    gate.open();
                }
                ConnectionEvent::Dropped => {
                    // new pending cycle: queued callers wait for the next open
                    gate.reset();
                    set_connection_state(&state, ConnectionState::Disconnected);
                    clear_pending(&pending, "connection dropped");
                }
                ConnectionEvent::ConnectFailed { .. } => {}
                ConnectionEvent::Exhausted { reason } => {
                    gate.fail(reason);
                    set_connection_state(&state, ConnectionState::Disconnected);
                    clear_pending(&pending, "reconnect attempts exhausted");
                }
                ConnectionEvent::Closed => {
                    gate.fail("connection closed");
                    set_connection_state(&state, ConnectionState::Disconnected);
                    clear_pending(&pending, "connection closed");
                }
            })
            .await;
    }

    // Inbound messages: acks resolve pending entries, commands go to the
    // registry, unknown types are ignored.
    {
        let pending = Arc::clone(&pending);
        let commands = commands.clone();
        client
            .set_on_message(move |msg| match msg {
                ServerMessage::Ack { request_id, ack } => {
                    let pending = Arc::clone(&pending);
                    tokio::spawn(async move {
                        pending.lock().await.resolve(&request_id, ack);
                    });
                }
                ServerMessage::RobotMoveCommand { command } => {
                    let commands = commands.clone();
                    tokio::spawn(async move {
                        commands.dispatch(InboundCommand::RobotMove(command)).await;
                    });
                }
                ServerMessage::Unknown => {
                    tracing::debug!("ignoring unknown backend message");
                }
            })
            .await;
    }

    let supervisor = {
        let client = client.clone();
        tokio::spawn(async move {
            client.run().await;
        })
    };

    // Main loop: forward frames until an explicit disconnect.
    let mut handle_gone = false;
    loop {
        tokio::select! {
            res = &mut disconnect_rx, if !handle_gone => {
                match res {
                    Ok(()) => {
                        tracing::info!("disconnect requested");
                        client.disconnect().await;
                        break;
                    }
                    Err(_) => {
                        // handle dropped without an explicit disconnect; the
                        // connection stays up
                        handle_gone = true;
                    }
                }
            }
            maybe_frame = cmd_rx.recv() => match maybe_frame {
                Some(frame) => {
                    let request_id = frame.request_id.clone();
                    if let Err(e) = client.send(frame).await {
                        tracing::error!(error = %e, "failed to forward frame");
                        pending.lock().await.remove(&request_id);
                    }
                }
                None => {
                    // every dispatcher clone is gone
                    client.disconnect().await;
                    break;
                }
            }
        }
    }

    let _ = supervisor.await;
}

fn clear_pending(pending: &Arc<Mutex<PendingAcks>>, why: &'static str) {
    let pending = Arc::clone(pending);
    tokio::spawn(async move {
        let count = pending.lock().await.clear();
        if count > 0 {
            tracing::debug!(count, why, "cancelled pending acks");
        }
    });
}
