//! Outbound dispatch: two calling conventions over one connection.
//!
//! `notify` is fire-and-forget (an error ack is logged and swallowed);
//! `request` waits for exactly one acknowledgment and surfaces its outcome to
//! the caller. Both first await the readiness gate, so callers never race the
//! connection: during an outage they queue, and once the manager gives up they
//! all fail together instead of hanging.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};

use mapbot_protocol::{AckPayload, ClientFrame, MapEvent, RequestError};

use super::connection::ReadyGate;

/// Callback resolved with the acknowledgment of one outbound frame.
pub type AckCallback = Box<dyn FnOnce(AckPayload) + Send + 'static>;

/// Pending acknowledgment tracker, keyed by request id.
#[derive(Default)]
pub struct PendingAcks {
    inner: HashMap<String, AckCallback>,
}

impl PendingAcks {
    pub fn insert(&mut self, request_id: String, callback: AckCallback) {
        self.inner.insert(request_id, callback);
    }

    /// Resolve and remove a pending entry.
    ///
    /// Returns false when no entry exists for this id (already resolved, or
    /// cleared by a disconnect).
    pub fn resolve(&mut self, request_id: &str, ack: AckPayload) -> bool {
        if let Some(callback) = self.inner.remove(request_id) {
            callback(ack);
            true
        } else {
            tracing::debug!(
                request_id = %request_id,
                "ack received for unknown request id"
            );
            false
        }
    }

    pub fn remove(&mut self, request_id: &str) -> bool {
        self.inner.remove(request_id).is_some()
    }

    /// Drop every pending entry; waiting requests observe `Cancelled`.
    pub fn clear(&mut self) -> usize {
        let count = self.inner.len();
        self.inner.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Outbound dispatcher for the map-events connection.
///
/// A concrete struct (not a trait) that can be cloned and shared; services
/// depend on it directly. The bridge owns the receiving end of `tx` and
/// forwards frames to the transport.
#[derive(Clone)]
pub struct EventDispatcher {
    tx: mpsc::Sender<ClientFrame>,
    pending: Arc<Mutex<PendingAcks>>,
    gate: ReadyGate,
}

impl EventDispatcher {
    /// Create a new dispatcher.
    ///
    /// The pending tracker and gate are shared with the bridge, which resolves
    /// acks and drives the gate from transport events.
    pub fn new(
        tx: mpsc::Sender<ClientFrame>,
        pending: Arc<Mutex<PendingAcks>>,
        gate: ReadyGate,
    ) -> Self {
        Self { tx, pending, gate }
    }

    /// Emit a fire-and-forget event.
    ///
    /// Waits for the connection to be ready, then queues the frame. The
    /// eventual ack is inspected only to log an error status; ack content
    /// never fails this call. Errors are transport-level only: the gate gave
    /// up, or the frame could not be queued.
    pub async fn notify(&self, event: MapEvent) -> Result<(), RequestError> {
        self.gate.ready().await?;

        let request_id = uuid::Uuid::new_v4().to_string();
        let kind = event.kind();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(
                request_id.clone(),
                Box::new(move |ack| {
                    if let Some(message) = ack.error_message() {
                        tracing::warn!(event = kind, message, "backend rejected event");
                    }
                }),
            );
        }

        self.send_frame(request_id, event).await
    }

    /// Emit an event and wait for its single acknowledgment.
    ///
    /// Exactly one outcome per call: the ack's `result` on success, the ack's
    /// message on an error status, a generic error on a malformed ack, and
    /// `Cancelled` when the connection drops before the ack arrives. No
    /// per-request time bound; see [`EventDispatcher::request_with_timeout`].
    pub async fn request(&self, event: MapEvent) -> Result<String, RequestError> {
        let (_id, ack_rx) = self.request_internal(event).await?;
        let ack = ack_rx.await.map_err(|_| RequestError::Cancelled)?;
        ack.into_result()
    }

    /// Emit an event and wait for its acknowledgment, bounded by `timeout_ms`.
    ///
    /// On timeout the pending entry is removed so a late ack is dropped
    /// instead of leaking.
    pub async fn request_with_timeout(
        &self,
        event: MapEvent,
        timeout_ms: u64,
    ) -> Result<String, RequestError> {
        let (request_id, ack_rx) = self.request_internal(event).await?;

        match tokio::time::timeout(std::time::Duration::from_millis(timeout_ms), ack_rx).await {
            Ok(Ok(ack)) => ack.into_result(),
            Ok(Err(_)) => Err(RequestError::Cancelled),
            Err(_) => {
                self.pending.lock().await.remove(&request_id);
                tracing::debug!(request_id = %request_id, timeout_ms, "request timed out");
                Err(RequestError::Timeout)
            }
        }
    }

    async fn request_internal(
        &self,
        event: MapEvent,
    ) -> Result<(String, oneshot::Receiver<AckPayload>), RequestError> {
        self.gate.ready().await?;

        let request_id = uuid::Uuid::new_v4().to_string();
        let (ack_tx, ack_rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(
                request_id.clone(),
                Box::new(move |ack| {
                    let _ = ack_tx.send(ack);
                }),
            );
        }

        self.send_frame(request_id.clone(), event).await?;
        Ok((request_id, ack_rx))
    }

    async fn send_frame(&self, request_id: String, event: MapEvent) -> Result<(), RequestError> {
        let frame = ClientFrame {
            request_id: request_id.clone(),
            event,
        };
        if self.tx.send(frame).await.is_err() {
            // Bridge is gone; the pending entry will never resolve.
            self.pending.lock().await.remove(&request_id);
            return Err(RequestError::SendFailed("channel closed".into()));
        }
        Ok(())
    }

    /// Get access to pending acks (for bridge use).
    pub fn pending(&self) -> Arc<Mutex<PendingAcks>> {
        Arc::clone(&self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapbot_protocol::PlayerSnapshot;
    use serde_json::json;

    fn test_dispatcher() -> (
        EventDispatcher,
        mpsc::Receiver<ClientFrame>,
        Arc<Mutex<PendingAcks>>,
        ReadyGate,
    ) {
        let (tx, rx) = mpsc::channel(8);
        let pending = Arc::new(Mutex::new(PendingAcks::default()));
        let gate = ReadyGate::new();
        let dispatcher = EventDispatcher::new(tx, Arc::clone(&pending), gate.clone());
        (dispatcher, rx, pending, gate)
    }

    /// Drive one frame end to end: take it off the bus and resolve its ack.
    async fn ack_next(rx: &mut mpsc::Receiver<ClientFrame>, pending: &Mutex<PendingAcks>, ack: AckPayload) {
        let frame = rx.recv().await.expect("frame emitted");
        assert!(pending.lock().await.resolve(&frame.request_id, ack));
    }

    #[tokio::test]
    async fn notify_emits_frame_after_gate_opens() {
        let (dispatcher, mut rx, _pending, gate) = test_dispatcher();
        gate.open();

        dispatcher
            .notify(MapEvent::room_state(vec![], json!({})))
            .await
            .expect("notify succeeds");

        let frame = rx.recv().await.expect("frame emitted");
        assert_eq!(frame.event.kind(), "room-state");
    }

    #[tokio::test]
    async fn notify_swallows_error_acks() {
        let (dispatcher, mut rx, pending, gate) = test_dispatcher();
        gate.open();

        dispatcher
            .notify(MapEvent::player_enter(PlayerSnapshot::named("Alice")))
            .await
            .expect("ack content never fails a notify");

        ack_next(&mut rx, &pending, AckPayload::error("backend on fire")).await;
        assert!(pending.lock().await.is_empty());
    }

    #[tokio::test]
    async fn request_resolves_with_ack_result() {
        let (dispatcher, mut rx, pending, gate) = test_dispatcher();
        gate.open();

        let backend = tokio::spawn(async move {
            ack_next(&mut rx, &pending, AckPayload::ok("Hello!")).await;
        });

        let reply = dispatcher
            .request(MapEvent::robot_chat_request(vec![]))
            .await
            .expect("request resolves");
        assert_eq!(reply, "Hello!");
        backend.await.expect("join");
    }

    #[tokio::test]
    async fn request_rejects_with_remote_message() {
        let (dispatcher, mut rx, pending, gate) = test_dispatcher();
        gate.open();

        let backend = tokio::spawn(async move {
            ack_next(&mut rx, &pending, AckPayload::error("no such player")).await;
        });

        let err = dispatcher
            .request(MapEvent::robot_chat_request(vec![]))
            .await
            .expect_err("error ack rejects");
        assert_eq!(err, RequestError::Remote("no such player".to_string()));
        backend.await.expect("join");
    }

    #[tokio::test]
    async fn request_rejects_generically_on_malformed_ack() {
        let (dispatcher, mut rx, pending, gate) = test_dispatcher();
        gate.open();

        let backend = tokio::spawn(async move {
            ack_next(&mut rx, &pending, AckPayload::default()).await;
        });

        let err = dispatcher
            .request(MapEvent::robot_chat_request(vec![]))
            .await
            .expect_err("malformed ack rejects");
        assert_eq!(err, RequestError::NoResponse);
        backend.await.expect("join");
    }

    #[tokio::test]
    async fn request_cancelled_when_pending_cleared() {
        let (dispatcher, mut rx, pending, gate) = test_dispatcher();
        gate.open();

        let backend = tokio::spawn(async move {
            let _frame = rx.recv().await.expect("frame emitted");
            // connection drops before the ack arrives
            pending.lock().await.clear();
        });

        let err = dispatcher
            .request(MapEvent::robot_chat_request(vec![]))
            .await
            .expect_err("cleared pending cancels");
        assert_eq!(err, RequestError::Cancelled);
        backend.await.expect("join");
    }

    #[tokio::test]
    async fn queued_request_fails_when_gate_gives_up() {
        let (dispatcher, _rx, _pending, gate) = test_dispatcher();

        let call = tokio::spawn(async move {
            dispatcher.request(MapEvent::robot_chat_request(vec![])).await
        });

        gate.fail("websocket handshake refused");
        let err = call.await.expect("join").expect_err("gate gave up");
        assert_eq!(
            err,
            RequestError::ConnectionFailed("websocket handshake refused".to_string())
        );
    }

    #[tokio::test]
    async fn request_times_out_and_cleans_pending() {
        let (dispatcher, mut rx, pending, gate) = test_dispatcher();
        gate.open();

        let err = dispatcher
            .request_with_timeout(MapEvent::robot_chat_request(vec![]), 10)
            .await
            .expect_err("no ack arrives");
        assert_eq!(err, RequestError::Timeout);

        let frame = rx.recv().await.expect("frame was emitted");
        // the entry is gone, so a late ack is dropped
        assert!(!pending
            .lock()
            .await
            .resolve(&frame.request_id, AckPayload::ok("late")));
    }
}
