use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use game_server::config::Config;
use game_server::identity::IdentityGate;
use game_server::rest;
use game_server::state::{now_unix, AppState};
use game_server::store::memory::MemoryStore;
use game_server::store::Store;
use game_server::transport::local::LocalTransport;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true),
        )
        .init();

    let config = Config::parse();

    let memory_store = Arc::new(MemoryStore::new());
    memory_store.spawn_ttl_sweep(Duration::from_secs(config.ttl_sweep_interval_secs), now_unix);
    let store: Arc<dyn Store> = memory_store;

    // The signing secret is a credential, not a behavioral config key, so
    // it's read directly from the environment rather than threaded
    // through `Config`'s derived CLI surface.
    let signing_secret = std::env::var("JWT_SIGNING_SECRET").unwrap_or_else(|_| {
        tracing::warn!("JWT_SIGNING_SECRET not set; using an insecure development default");
        "development-only-insecure-secret".to_string()
    });
    let identity = Arc::new(IdentityGate::new(&config, signing_secret.as_bytes()));

    let transport = Arc::new(LocalTransport::new());
    let port = config.port;
    let state = Arc::new(AppState::new(store, transport, identity, config));

    let app = rest::router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await.unwrap();
    tracing::info!(port, "game-server listening");
    axum::serve(listener, app).await.unwrap();
}
