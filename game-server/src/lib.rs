//! The connection-and-broadcast backbone: data store, identity gate, game
//! and scenario services, connection registry, WebSocket admission/
//! dispatch/disconnect, broadcast transport, allowlist hook, and the REST
//! surface that fronts them.

pub mod allowlist;
pub mod config;
pub mod connections;
pub mod error;
pub mod game_service;
pub mod identity;
pub mod rest;
pub mod state;
pub mod store;
pub mod transport;
pub mod ws;
