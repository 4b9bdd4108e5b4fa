//! WebSocket transport: the backend client, its retry policy, and the bridge
//! that exposes it as dispatcher + registry handles.

mod bridge;
mod client;
mod core;
mod shared;

pub use bridge::{create_connection, Connection};
pub use client::{BackendClient, ConnectionEvent};
pub use core::RetryState;
pub use shared::{
    ConnectionConfig, DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_DELAY_MS,
    DEFAULT_REQUEST_TIMEOUT_MS,
};
