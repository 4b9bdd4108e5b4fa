//! Composition root.
//!
//! `run` takes the injected dependencies (host port, connection, config),
//! wires every host event to the bridge, and returns a handle owning all the
//! registrations. There is no global state: everything lives in the returned
//! `PluginHandle` and dies with `shutdown()`.

use std::sync::Arc;

use crate::application::popup::PopupController;
use crate::application::room::RoomLocation;
use crate::application::services::{MapEventsService, Robot};
use crate::config::PluginConfig;
use crate::infrastructure::messaging::{ConnectionHandle, ConnectionStateObserver};
use crate::infrastructure::websocket::Connection;
use crate::ports::outbound::{HostPlayer, HostPort, Subscription};

/// Everything `run` needs, constructed once at startup by the embedder.
pub struct PluginDeps {
    pub host: Arc<dyn HostPort>,
    pub connection: Connection,
    pub config: PluginConfig,
}

/// Live plugin: owns every host registration and the connection.
pub struct PluginHandle {
    map_events: MapEventsService,
    robot: Option<Arc<Robot>>,
    subscriptions: Vec<Subscription>,
    popup: Arc<PopupController>,
    connection_handle: ConnectionHandle,
    state_observer: ConnectionStateObserver,
}

impl PluginHandle {
    pub fn map_events(&self) -> &MapEventsService {
        &self.map_events
    }

    pub fn connection_state(&self) -> &ConnectionStateObserver {
        &self.state_observer
    }

    /// Detach every registration and close the connection.
    pub fn shutdown(mut self) {
        tracing::info!("plugin shutting down");
        if let Some(robot) = self.robot.take() {
            robot.detach();
        }
        self.subscriptions.clear();
        self.popup.close();
        self.connection_handle.disconnect();
    }
}

/// Wire the plugin together and start relaying.
pub async fn run(deps: PluginDeps) -> anyhow::Result<PluginHandle> {
    let PluginDeps {
        host,
        connection,
        config,
    } = deps;

    let map_events = MapEventsService::from_connection(&connection)
        .with_request_timeout(config.request_timeout_ms);
    let popup = Arc::new(PopupController::new());
    let mut subscriptions = Vec::new();

    // Clock popup: show the time while standing in the clock area.
    {
        let anchor = format!("{}Popup", config.clock_area);
        let host_for_popup = Arc::clone(&host);
        let popup_for_open = Arc::clone(&popup);
        subscriptions.push(host.on_area_enter(
            &config.clock_area,
            Box::new(move || {
                let host = Arc::clone(&host_for_popup);
                let popup = Arc::clone(&popup_for_open);
                let anchor = anchor.clone();
                tokio::spawn(async move {
                    let time = chrono::Local::now().format("%H:%M");
                    let handle = host.open_popup(anchor, format!("It's {time}")).await;
                    popup.show(handle);
                });
            }),
        ));

        let popup_for_close = Arc::clone(&popup);
        subscriptions.push(host.on_area_leave(
            &config.clock_area,
            Box::new(move || {
                popup_for_close.close();
            }),
        ));
    }

    // Room identity, for the logs only.
    let room_id = host.room_id().await;
    match RoomLocation::parse(&room_id) {
        Some(location) => {
            tracing::info!(folder = %location.folder, office = %location.office, "room resolved");
        }
        None => tracing::warn!(room_id = %room_id, "unrecognized room id format"),
    }

    // Initial snapshot. A failed push degrades to a log line; the relays below
    // still run.
    let players: Vec<_> = host.players().await.iter().map(HostPlayer::snapshot).collect();
    match host.tiled_map().await {
        Ok(map) => {
            tracing::info!("sending initial room state");
            if let Err(e) = map_events.send_room_state(players, map).await {
                tracing::error!(error = %e, "failed to send initial room state");
            }
        }
        Err(e) => tracing::error!(error = %e, "failed to fetch tiled map"),
    }

    // Relay player lifecycle events.
    {
        let map_events_for_moves = map_events.clone();
        subscriptions.push(host.on_player_moves(Box::new(move |event| {
            let map_events = map_events_for_moves.clone();
            tokio::spawn(async move {
                tracing::debug!(player = %event.player.name, "relaying player move");
                if let Err(e) = map_events
                    .send_player_move(
                        event.player.snapshot(),
                        event.old_position,
                        event.new_position,
                    )
                    .await
                {
                    tracing::error!(player = %event.player.name, error = %e, "failed to relay move");
                }
            });
        })));

        let map_events_for_enters = map_events.clone();
        subscriptions.push(host.on_player_enters(Box::new(move |player| {
            let map_events = map_events_for_enters.clone();
            tokio::spawn(async move {
                tracing::debug!(player = %player.name, "relaying player enter");
                if let Err(e) = map_events.send_player_enter(player.snapshot()).await {
                    tracing::error!(player = %player.name, error = %e, "failed to relay enter");
                }
            });
        })));

        let map_events_for_leaves = map_events.clone();
        subscriptions.push(host.on_player_leaves(Box::new(move |player| {
            let map_events = map_events_for_leaves.clone();
            tokio::spawn(async move {
                tracing::debug!(player = %player.name, "relaying player leave");
                if let Err(e) = map_events.send_player_leave(player.snapshot()).await {
                    tracing::error!(player = %player.name, error = %e, "failed to relay leave");
                }
            });
        })));
    }

    // Expose our tags to other players.
    let me = host.me().await;
    if let Err(e) = host
        .save_variable("tags".to_string(), serde_json::json!(me.tags))
        .await
    {
        tracing::error!(error = %e, "failed to publish tags variable");
    }

    let robot = if config.robot_enabled {
        let robot = Robot::new(Arc::clone(&host), map_events.clone());
        robot.attach().await;
        Some(robot)
    } else {
        None
    };

    Ok(PluginHandle {
        map_events,
        robot,
        subscriptions,
        popup,
        connection_handle: connection.handle,
        state_observer: connection.state_observer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::websocket::{create_connection, ConnectionConfig};
    use crate::ports::outbound::{MockHostPort, PopupHandle};
    use mockall::predicate::eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;
    use url::Url;

    /// Connection whose attempts fail immediately; good enough for wiring
    /// tests that never need a live backend.
    fn dead_connection() -> Connection {
        create_connection(ConnectionConfig {
            url: Url::parse("ws://127.0.0.1:9").expect("valid url"),
            auth_token: None,
            max_reconnect_attempts: 1,
            reconnect_delay_ms: 1,
        })
    }

    fn counting_subscription(counter: &Arc<AtomicU32>) -> Subscription {
        let counter = Arc::clone(counter);
        Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn wired_host(disposed: &Arc<AtomicU32>) -> MockHostPort {
        let mut host = MockHostPort::new();

        for_each_registration(&mut host, disposed);

        host.expect_room_id()
            .returning(|| "proto~/acme/hq/office.tmj".to_string());
        host.expect_players().returning(Vec::new);
        host.expect_tiled_map().returning(|| Ok(json!({})));
        host.expect_me()
            .returning(|| HostPlayer::named("Robot"));
        host.expect_save_variable()
            .with(eq("tags".to_string()), mockall::predicate::always())
            .times(1)
            .returning(|_, _| Ok(()));

        host
    }

    fn for_each_registration(host: &mut MockHostPort, disposed: &Arc<AtomicU32>) {
        let d = Arc::clone(disposed);
        host.expect_on_area_enter()
            .times(1)
            .returning(move |_, _| counting_subscription(&d));
        let d = Arc::clone(disposed);
        host.expect_on_area_leave()
            .times(1)
            .returning(move |_, _| counting_subscription(&d));
        let d = Arc::clone(disposed);
        host.expect_on_player_moves()
            .times(1)
            .returning(move |_| counting_subscription(&d));
        let d = Arc::clone(disposed);
        host.expect_on_player_enters()
            .times(1)
            .returning(move |_| counting_subscription(&d));
        let d = Arc::clone(disposed);
        host.expect_on_player_leaves()
            .times(1)
            .returning(move |_| counting_subscription(&d));
    }

    #[tokio::test]
    async fn run_wires_the_host_and_shutdown_detaches() {
        let disposed = Arc::new(AtomicU32::new(0));
        let host = wired_host(&disposed);

        let handle = run(PluginDeps {
            host: Arc::new(host),
            connection: dead_connection(),
            config: PluginConfig::default(),
        })
        .await
        .expect("run");

        assert_eq!(disposed.load(Ordering::SeqCst), 0);
        handle.shutdown();
        assert_eq!(disposed.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn clock_area_shows_and_hides_the_time_popup() {
        let disposed = Arc::new(AtomicU32::new(0));
        let mut host = MockHostPort::new();

        // capture the area callbacks instead of counting them
        let enter_cb: Arc<std::sync::Mutex<Option<crate::ports::outbound::NotifyCallback>>> =
            Arc::new(std::sync::Mutex::new(None));
        let enter_cb_slot = Arc::clone(&enter_cb);
        host.expect_on_area_enter()
            .with(eq("clock"), mockall::predicate::always())
            .times(1)
            .returning(move |_, callback| {
                *enter_cb_slot.lock().expect("slot lock") = Some(callback);
                Subscription::noop()
            });
        let d = Arc::clone(&disposed);
        host.expect_on_area_leave()
            .times(1)
            .returning(move |_, _| counting_subscription(&d));
        let d = Arc::clone(&disposed);
        host.expect_on_player_moves()
            .times(1)
            .returning(move |_| counting_subscription(&d));
        let d = Arc::clone(&disposed);
        host.expect_on_player_enters()
            .times(1)
            .returning(move |_| counting_subscription(&d));
        let d = Arc::clone(&disposed);
        host.expect_on_player_leaves()
            .times(1)
            .returning(move |_| counting_subscription(&d));

        host.expect_room_id()
            .returning(|| "proto~/acme/hq/office.tmj".to_string());
        host.expect_players().returning(Vec::new);
        host.expect_tiled_map().returning(|| Ok(json!({})));
        host.expect_me().returning(|| HostPlayer::named("Robot"));
        host.expect_save_variable().returning(|_, _| Ok(()));

        let (popup_tx, mut popup_rx) = mpsc::channel(1);
        host.expect_open_popup()
            .times(1)
            .returning(move |anchor, message| {
                let _ = popup_tx.try_send((anchor, message));
                PopupHandle::noop()
            });

        let handle = run(PluginDeps {
            host: Arc::new(host),
            connection: dead_connection(),
            config: PluginConfig::default(),
        })
        .await
        .expect("run");

        // walking into the clock area opens the popup
        {
            let cb = enter_cb.lock().expect("slot lock");
            cb.as_ref().expect("enter callback captured")();
        }

        let (anchor, message) = timeout(Duration::from_secs(5), popup_rx.recv())
            .await
            .expect("no hang")
            .expect("popup opened");
        assert_eq!(anchor, "clockPopup");
        assert!(message.starts_with("It's "));

        handle.shutdown();
    }
}
