//! Mapbot connectivity smoke binary.
//!
//! Connects to the configured map-events backend, pushes one empty room-state
//! frame, then stays connected until ctrl-c. Useful for checking endpoint,
//! credentials and reconnect behavior without a host client.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mapbot_plugin::application::services::MapEventsService;
use mapbot_plugin::config::PluginConfig;
use mapbot_plugin::infrastructure::websocket::create_connection;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mapbot_plugin=debug,mapbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = PluginConfig::from_env()?;
    tracing::info!(url = %config.ws_url, "starting mapbot smoke check");

    let connection = create_connection(config.connection());
    let map_events = MapEventsService::from_connection(&connection)
        .with_request_timeout(config.request_timeout_ms);

    map_events
        .send_room_state(vec![], serde_json::json!({}))
        .await?;
    tracing::info!("room state sent; staying connected until ctrl-c");

    tokio::signal::ctrl_c().await?;
    connection.handle.disconnect();
    Ok(())
}
