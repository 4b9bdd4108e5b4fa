//! Shared defaults and configuration for the WebSocket transport.

use url::Url;

// Reconnection defaults (fixed delay, bounded attempts - no backoff, no
// fallback transport)
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 1_000;
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 120_000;

/// Transport-level configuration for one connection.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Backend endpoint, e.g. `ws://localhost:3000/map-events`.
    pub url: Url,
    /// Bearer token attached to the upgrade request, when present.
    pub auth_token: Option<String>,
    pub max_reconnect_attempts: u32,
    pub reconnect_delay_ms: u64,
}

impl ConnectionConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            auth_token: None,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
        }
    }
}
