//! Shared application state handed to every REST and WebSocket handler.

use std::sync::Arc;

use crate::config::Config;
use crate::connections::ConnectionRegistry;
use crate::game_service::scenario::ScenarioService;
use crate::game_service::GameService;
use crate::identity::SharedIdentityGate;
use crate::store::Store;
use crate::transport::local::LocalTransport;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub transport: Arc<LocalTransport>,
    pub identity: SharedIdentityGate,
    pub connections: ConnectionRegistry,
    pub games: GameService,
    pub scenarios: ScenarioService,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, transport: Arc<LocalTransport>, identity: SharedIdentityGate, config: Config) -> Self {
        let connections = ConnectionRegistry::new(store.clone(), config.connection_ttl_secs);
        let games = GameService::new(store.clone());
        let scenarios = ScenarioService::new(store.clone());
        AppState {
            store,
            transport,
            identity,
            connections,
            games,
            scenarios,
            config,
        }
    }
}

/// Current unix timestamp in seconds. The single place this core reads
/// the wall clock so tests can control `now` explicitly instead.
pub fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}
