//! Mapbot plugin.
//!
//! An in-game scripting plugin for a virtual-office platform: it relays
//! player and room events from the host client to the map-events backend over
//! a persistent WebSocket, and optionally drives a robot that chats with
//! visitors and walks toward requested coworkers.
//!
//! The embedder provides a [`ports::outbound::HostPort`] implementation and a
//! connection from [`infrastructure::websocket::create_connection`], then
//! hands both to [`runner::run`].

pub mod application;
pub mod config;
pub mod infrastructure;
pub mod ports;
pub mod runner;
