//! WebSocket client for the map-events backend, using tokio-tungstenite.
//!
//! `BackendClient::run` supervises the whole connection lifetime: connect,
//! pump messages until the session ends, then retry with a fixed delay up to
//! the configured attempt bound. Lifecycle transitions are reported through a
//! single event callback; the bridge owns what they mean (state, gate,
//! pending acks).

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Mutex, Notify, RwLock};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use mapbot_protocol::{ClientFrame, ServerMessage};

use super::core::RetryState;
use super::shared::ConnectionConfig;

/// Lifecycle transitions reported by the client.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// About to attempt a connection (initial or retry).
    Connecting { attempt: u32 },
    /// The socket is up.
    Opened,
    /// A live session ended without the caller asking; a retry follows.
    Dropped,
    /// One connection attempt failed; more may follow.
    ConnectFailed { attempt: u32, reason: String },
    /// The attempt bound was reached; no further retries.
    Exhausted { reason: String },
    /// Caller-initiated teardown completed.
    Closed,
}

type MessageCallback = Box<dyn Fn(ServerMessage) + Send + Sync>;
type EventCallback = Box<dyn Fn(ConnectionEvent) + Send + Sync>;

/// Transport client for the map-events connection.
pub struct BackendClient {
    config: ConnectionConfig,
    tx: Arc<Mutex<Option<mpsc::Sender<ClientFrame>>>>,
    on_message: Arc<Mutex<Option<MessageCallback>>>,
    on_event: Arc<Mutex<Option<EventCallback>>>,
    /// Distinguishes caller-initiated close from transport drops.
    intentional_disconnect: Arc<RwLock<bool>>,
    close_signal: Arc<Notify>,
}

impl BackendClient {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            tx: Arc::new(Mutex::new(None)),
            on_message: Arc::new(Mutex::new(None)),
            on_event: Arc::new(Mutex::new(None)),
            intentional_disconnect: Arc::new(RwLock::new(false)),
            close_signal: Arc::new(Notify::new()),
        }
    }

    pub async fn set_on_message<F>(&self, callback: F)
    where
        F: Fn(ServerMessage) + Send + Sync + 'static,
    {
        let mut on_message = self.on_message.lock().await;
        *on_message = Some(Box::new(callback));
    }

    pub async fn set_on_event<F>(&self, callback: F)
    where
        F: Fn(ConnectionEvent) + Send + Sync + 'static,
    {
        let mut on_event = self.on_event.lock().await;
        *on_event = Some(Box::new(callback));
    }

    async fn emit(&self, event: ConnectionEvent) {
        let callback = self.on_event.lock().await;
        if let Some(ref cb) = *callback {
            cb(event);
        }
    }

    /// Supervise the connection until an explicit close or retry exhaustion.
    pub async fn run(&self) {
        let mut retry = RetryState::new(self.config.max_reconnect_attempts);

        loop {
            if *self.intentional_disconnect.read().await {
                self.emit(ConnectionEvent::Closed).await;
                return;
            }

            self.emit(ConnectionEvent::Connecting {
                attempt: retry.attempts(),
            })
            .await;

            match self.connect_internal().await {
                Ok(unexpected_close) => {
                    // the session opened, so the failure history is wiped
                    retry.reset();
                    if !unexpected_close {
                        self.emit(ConnectionEvent::Closed).await;
                        return;
                    }
                    tracing::info!("connection dropped, reconnecting");
                    self.emit(ConnectionEvent::Dropped).await;
                }
                Err(e) => {
                    let attempt = retry.record_failure();
                    tracing::warn!(
                        attempt,
                        max = self.config.max_reconnect_attempts,
                        error = %e,
                        "connection attempt failed"
                    );
                    self.emit(ConnectionEvent::ConnectFailed {
                        attempt,
                        reason: e.to_string(),
                    })
                    .await;

                    if retry.is_exhausted() {
                        tracing::error!("max reconnection attempts reached, giving up");
                        self.emit(ConnectionEvent::Exhausted {
                            reason: e.to_string(),
                        })
                        .await;
                        return;
                    }
                }
            }

            tokio::time::sleep(Duration::from_millis(self.config.reconnect_delay_ms)).await;
        }
    }

    /// One session: connect, pump until the socket ends.
    ///
    /// Returns whether the session ended without the caller asking for it.
    async fn connect_internal(&self) -> Result<bool> {
        let mut request = self.config.url.as_str().into_client_request()?;
        if let Some(token) = &self.config.auth_token {
            let value: HeaderValue = format!("Bearer {token}").parse()?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (ws_stream, _) = connect_async(request).await?;
        let (mut write, mut read) = ws_stream.split();

        // The sender must be in place before Opened is observable, or a
        // caller released by the gate could race the setup and fail to send.
        let (tx, mut rx) = mpsc::channel::<ClientFrame>(32);
        {
            let mut tx_lock = self.tx.lock().await;
            *tx_lock = Some(tx);
        }

        tracing::info!(url = %self.config.url, "connected to map-events backend");
        self.emit(ConnectionEvent::Opened).await;

        let write_handle = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                let json = match serde_json::to_string(&frame) {
                    Ok(j) => j,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to serialize outbound frame");
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(json)).await {
                    tracing::error!(error = %e, "failed to send frame");
                    break;
                }
            }
        });

        loop {
            tokio::select! {
                _ = self.close_signal.notified() => {
                    tracing::info!("close requested, ending session");
                    break;
                }
                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => match serde_json::from_str::<ServerMessage>(&text) {
                        Ok(msg) => {
                            let callback = self.on_message.lock().await;
                            if let Some(ref cb) = *callback {
                                cb(msg);
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "failed to parse backend message");
                        }
                    },
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("backend closed connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "websocket error");
                        break;
                    }
                    None => {
                        tracing::info!("websocket stream ended");
                        break;
                    }
                },
            }
        }

        // Drop our sender so the write task drains and exits.
        {
            let mut tx_lock = self.tx.lock().await;
            *tx_lock = None;
        }
        let _ = write_handle.await;

        let intentional = *self.intentional_disconnect.read().await;
        Ok(!intentional)
    }

    /// Queue one frame for the current session.
    pub async fn send(&self, frame: ClientFrame) -> Result<()> {
        // Clone the sender to avoid holding the lock across await
        let tx = {
            let tx_lock = self.tx.lock().await;
            tx_lock.clone()
        };
        match tx {
            Some(tx) => {
                tx.send(frame).await?;
                Ok(())
            }
            None => Err(anyhow::anyhow!("not connected")),
        }
    }

    /// Caller-initiated teardown: no reconnection afterwards.
    pub async fn disconnect(&self) {
        {
            let mut flag = self.intentional_disconnect.write().await;
            *flag = true;
        }
        // notify_one stores a permit, so a session that has not reached its
        // select loop yet still observes the close
        self.close_signal.notify_one();
        {
            let mut tx_lock = self.tx.lock().await;
            *tx_lock = None;
        }
    }
}

impl Clone for BackendClient {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            tx: Arc::clone(&self.tx),
            on_message: Arc::clone(&self.on_message),
            on_event: Arc::clone(&self.on_event),
            intentional_disconnect: Arc::clone(&self.intentional_disconnect),
            close_signal: Arc::clone(&self.close_signal),
        }
    }
}
