//! The robot: answers visitors in proximity chats and walks toward players on
//! backend orders.
//!
//! All behavior is reactive. Host events and backend commands arrive through
//! registered callbacks; each callback spawns onto the runtime and every
//! failure is caught here - a broken host call or backend request degrades the
//! robot (apology reply, skipped move) without crashing the plugin or
//! detaching a subscriber.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use mapbot_protocol::{ChatMessage, MoveCommand};

use crate::application::prompts;
use crate::application::services::MapEventsService;
use crate::ports::outbound::{ChatTurn, HostPlayer, HostPort, Subscription};

/// Reply used when the backend cannot produce one.
const FALLBACK_REPLY: &str = "Sorry, I'm having trouble responding right now.";

/// Minimum spacing between movement evaluations.
const MOVE_THROTTLE: Duration = Duration::from_secs(30);

/// Reply prefix that turns a move decision into an actual walk.
const MOVE_DECISION_PREFIX: &str = "Go to ";

/// The variable players publish when they settle at a place.
const PLACE_VARIABLE: &str = "currentPlace";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Waiting,
    Chatting,
}

struct RobotState {
    mode: Mode,
    history: Vec<ChatMessage>,
    last_move_evaluation: Option<Instant>,
}

/// Robot behavior, attached to host events and backend commands.
pub struct Robot {
    host: Arc<dyn HostPort>,
    bridge: MapEventsService,
    state: Mutex<RobotState>,
    subscriptions: std::sync::Mutex<Vec<Subscription>>,
}

impl Robot {
    pub fn new(host: Arc<dyn HostPort>, bridge: MapEventsService) -> Arc<Self> {
        Arc::new(Self {
            host,
            bridge,
            state: Mutex::new(RobotState {
                mode: Mode::Waiting,
                history: Vec::new(),
                last_move_evaluation: None,
            }),
            subscriptions: std::sync::Mutex::new(Vec::new()),
        })
    }

    /// Register every callback the robot reacts to.
    ///
    /// Must run before the backend's first `robot-move-command` can be
    /// meaningfully handled; commands arriving earlier are dropped by the
    /// registry with a warning.
    pub async fn attach(self: &Arc<Self>) {
        tracing::info!("robot starting");

        {
            let robot = Arc::clone(self);
            self.bridge
                .on_move_command(move |command| {
                    let robot = Arc::clone(&robot);
                    tokio::spawn(async move {
                        robot.handle_move_command(command).await;
                    });
                })
                .await;
        }

        let mut subscriptions = Vec::new();

        {
            let robot = Arc::clone(self);
            subscriptions.push(self.host.on_proximity_join(Box::new(move |users| {
                let robot = Arc::clone(&robot);
                tokio::spawn(async move {
                    robot.on_proximity_join(users).await;
                });
            })));
        }
        {
            let robot = Arc::clone(self);
            subscriptions.push(self.host.on_participant_join(Box::new(move |user| {
                let robot = Arc::clone(&robot);
                tokio::spawn(async move {
                    robot.on_participant_join(user).await;
                });
            })));
        }
        {
            let robot = Arc::clone(self);
            subscriptions.push(self.host.on_proximity_leave(Box::new(move || {
                let robot = Arc::clone(&robot);
                tokio::spawn(async move {
                    robot.on_proximity_leave().await;
                });
            })));
        }
        {
            let robot = Arc::clone(self);
            subscriptions.push(self.host.on_chat_message(Box::new(move |turn| {
                let robot = Arc::clone(&robot);
                tokio::spawn(async move {
                    robot.on_chat_message(turn).await;
                });
            })));
        }
        {
            let robot = Arc::clone(self);
            subscriptions.push(self.host.on_player_variable_change(
                PLACE_VARIABLE,
                Box::new(move |_player| {
                    let robot = Arc::clone(&robot);
                    tokio::spawn(async move {
                        robot.maybe_evaluate_move().await;
                    });
                }),
            ));
        }

        *self.subscriptions.lock().expect("subscription lock poisoned") = subscriptions;
    }

    /// Drop every host registration. The robot stops reacting immediately.
    pub fn detach(&self) {
        self.subscriptions
            .lock()
            .expect("subscription lock poisoned")
            .clear();
    }

    // =========================================================================
    // Movement
    // =========================================================================

    async fn handle_move_command(&self, command: MoveCommand) {
        if !command.trigger {
            tracing::debug!(dest = %command.dest_player_name, "move command without trigger");
            return;
        }
        if !self.throttle_allows().await {
            tracing::debug!(dest = %command.dest_player_name, "move command throttled");
            return;
        }
        tracing::info!(dest = %command.dest_player_name, "executing move command");
        self.walk_toward(&command.dest_player_name).await;
    }

    async fn walk_toward(&self, name: &str) {
        let players = self.host.players().await;
        for player in players {
            if player.name == name {
                let Some(position) = player.position else {
                    tracing::debug!(player = %name, "destination player has no position");
                    return;
                };
                if let Err(e) = self.host.move_to(position).await {
                    tracing::error!(player = %name, error = %e, "move failed");
                }
                return;
            }
        }
        tracing::debug!(player = %name, "destination player not in room");
    }

    /// Ask the backend whether the robot should relocate. Runs when the room
    /// layout changes while waiting; throttled.
    async fn maybe_evaluate_move(&self) {
        {
            let state = self.state.lock().await;
            if state.mode != Mode::Waiting {
                return;
            }
        }
        if !self.throttle_allows().await {
            return;
        }

        let me = self.host.me().await;
        let players = self.host.players().await;
        let content = prompts::move_prompt(&me, &players);

        match self.bridge.send_robot_move_request(me.snapshot(), content).await {
            Ok(decision) => match decision.strip_prefix(MOVE_DECISION_PREFIX) {
                Some(name) => self.walk_toward(name.trim()).await,
                None => tracing::debug!(%decision, "staying put"),
            },
            Err(e) => tracing::warn!(error = %e, "move evaluation failed"),
        }
    }

    async fn throttle_allows(&self) -> bool {
        let mut state = self.state.lock().await;
        match state.last_move_evaluation {
            Some(last) if last.elapsed() < MOVE_THROTTLE => false,
            _ => {
                state.last_move_evaluation = Some(Instant::now());
                true
            }
        }
    }

    // =========================================================================
    // Chat
    // =========================================================================

    async fn on_proximity_join(&self, users: Vec<HostPlayer>) {
        tracing::info!(count = users.len(), "proximity meeting joined");
        let open_conversation = {
            let mut state = self.state.lock().await;
            state.mode = Mode::Chatting;
            if state.history.is_empty() {
                state
                    .history
                    .push(ChatMessage::system(prompts::chat_prompt(&users)));
                true
            } else {
                false
            }
        };

        if open_conversation {
            let reply = self.trigger_agent().await;
            self.post_reply(reply).await;
        }
    }

    async fn on_participant_join(&self, user: HostPlayer) {
        let chatting = { self.state.lock().await.mode == Mode::Chatting };
        if !chatting {
            return;
        }

        {
            let mut state = self.state.lock().await;
            state
                .history
                .push(ChatMessage::system(prompts::user_joined_chat(&user)));
        }
        let reply = self.trigger_agent().await;
        self.post_reply(reply).await;
    }

    async fn on_proximity_leave(&self) {
        tracing::info!("proximity meeting left");
        self.state.lock().await.mode = Mode::Waiting;
    }

    async fn on_chat_message(&self, turn: ChatTurn) {
        {
            let state = self.state.lock().await;
            if state.mode != Mode::Chatting {
                tracing::warn!("chat message received while not chatting");
                return;
            }
        }

        // our own messages come back without an author
        let Some(author) = turn.author else {
            return;
        };

        {
            let mut state = self.state.lock().await;
            state
                .history
                .push(ChatMessage::user(format!("{}: {}", author.name, turn.message)));
        }

        let reply = self.trigger_agent().await;
        self.post_reply(reply).await;
    }

    /// Run one backend completion over the current history.
    ///
    /// Always produces something to say: on any failure the history is left
    /// untouched and the fixed apology is returned.
    async fn trigger_agent(&self) -> String {
        let messages = { self.state.lock().await.history.clone() };

        self.host.start_typing().await;
        let result = self.bridge.send_robot_chat_request(messages).await;
        self.host.stop_typing().await;

        match result {
            Ok(reply) => {
                self.state
                    .lock()
                    .await
                    .history
                    .push(ChatMessage::assistant(reply.clone()));
                reply
            }
            Err(e) => {
                tracing::error!(error = %e, "chat completion failed");
                FALLBACK_REPLY.to_string()
            }
        }
    }

    async fn post_reply(&self, reply: String) {
        if let Err(e) = self.host.send_chat(reply).await {
            tracing::error!(error = %e, "failed to post chat reply");
        }
    }

    #[cfg(test)]
    async fn set_chatting(&self) {
        self.state.lock().await.mode = Mode::Chatting;
    }
}
