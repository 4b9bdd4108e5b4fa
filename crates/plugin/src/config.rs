//! Environment-driven configuration.
//!
//! Everything has a default so the plugin runs with no environment at all;
//! each knob can be overridden with a `MAPBOT_*` variable.

use std::str::FromStr;

use anyhow::Context;
use url::Url;

use crate::infrastructure::websocket::{
    ConnectionConfig, DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_DELAY_MS,
    DEFAULT_REQUEST_TIMEOUT_MS,
};

pub const DEFAULT_WS_URL: &str = "ws://localhost:3000/map-events";
pub const DEFAULT_CLOCK_AREA: &str = "clock";

/// Full plugin configuration.
#[derive(Debug, Clone)]
pub struct PluginConfig {
    /// Backend endpoint for the map-events socket.
    pub ws_url: Url,
    /// Bearer token for the upgrade request, when the backend requires one.
    pub auth_token: Option<String>,
    pub max_reconnect_attempts: u32,
    pub reconnect_delay_ms: u64,
    pub request_timeout_ms: u64,
    /// Whether the robot behavior attaches at startup.
    pub robot_enabled: bool,
    /// Map area that shows the clock popup.
    pub clock_area: String,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            ws_url: Url::parse(DEFAULT_WS_URL).expect("default url is valid"),
            auth_token: None,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            robot_enabled: false,
            clock_area: DEFAULT_CLOCK_AREA.to_string(),
        }
    }
}

impl PluginConfig {
    /// Read configuration from `MAPBOT_*` environment variables, falling back
    /// to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let ws_url = match std::env::var("MAPBOT_WS_URL") {
            Ok(raw) => Url::parse(&raw).with_context(|| format!("invalid MAPBOT_WS_URL: {raw}"))?,
            Err(_) => defaults.ws_url,
        };

        Ok(Self {
            ws_url,
            auth_token: std::env::var("MAPBOT_AUTH_TOKEN").ok().filter(|t| !t.is_empty()),
            max_reconnect_attempts: env_parse(
                "MAPBOT_MAX_RECONNECT_ATTEMPTS",
                defaults.max_reconnect_attempts,
            )?,
            reconnect_delay_ms: env_parse("MAPBOT_RECONNECT_DELAY_MS", defaults.reconnect_delay_ms)?,
            request_timeout_ms: env_parse("MAPBOT_REQUEST_TIMEOUT_MS", defaults.request_timeout_ms)?,
            robot_enabled: std::env::var("MAPBOT_ROBOT")
                .map(|v| flag_enabled(&v))
                .unwrap_or(defaults.robot_enabled),
            clock_area: std::env::var("MAPBOT_CLOCK_AREA").unwrap_or(defaults.clock_area),
        })
    }

    /// The transport-level slice of this configuration.
    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            url: self.ws_url.clone(),
            auth_token: self.auth_token.clone(),
            max_reconnect_attempts: self.max_reconnect_attempts,
            reconnect_delay_ms: self.reconnect_delay_ms,
        }
    }
}

fn env_parse<T: FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {name}: {raw}")),
        Err(_) => Ok(default),
    }
}

fn flag_enabled(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
