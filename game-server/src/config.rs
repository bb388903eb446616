//! Start-up configuration. Every key is read once from the environment
//! (or an equivalent CLI flag), so the same binary runs against any
//! deployment by varying only these values.

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "game-server", about = "Turn-based multiplayer connection & broadcast backbone")]
pub struct Config {
    /// Table name for the games store (informational; the shipped store is
    /// in-memory, but the name is threaded through for parity with a real
    /// backing store and for log correlation).
    #[arg(long, env = "GAMES_TABLE_NAME", default_value = "games")]
    pub games_table_name: String,

    #[arg(long, env = "PLAYER_GAMES_TABLE_NAME", default_value = "player_games")]
    pub player_games_table_name: String,

    #[arg(long, env = "SCENARIOS_TABLE_NAME", default_value = "scenarios")]
    pub scenarios_table_name: String,

    #[arg(long, env = "CONNECTIONS_TABLE_NAME", default_value = "connections")]
    pub connections_table_name: String,

    /// The opaque endpoint used to post to a connection's transport. For
    /// the in-process `LocalTransport` this is unused at runtime but kept
    /// so deployment config stays uniform with a real management API.
    #[arg(long, env = "BROADCAST_ENDPOINT", default_value = "local")]
    pub broadcast_endpoint: String,

    #[arg(long, env = "USER_POOL_ID", default_value = "")]
    pub user_pool_id: String,

    #[arg(long, env = "USER_POOL_CLIENT_ID", default_value = "")]
    pub user_pool_client_id: String,

    /// Comma-separated email domain suffixes accepted by the allowlist hook.
    #[arg(long, env = "ALLOWED_DOMAINS", default_value = "")]
    pub allowed_domains: String,

    /// Comma-separated exact email addresses accepted by the allowlist hook.
    #[arg(long, env = "ALLOWED_EMAILS", default_value = "")]
    pub allowed_emails: String,

    /// Comma-separated allowed CORS origins for the frontend.
    #[arg(long, env = "FRONTEND_ORIGINS", default_value = "")]
    pub frontend_origins: String,

    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Allow WebSocket admission with a userId but no bearer token. A
    /// documented reduction in assurance; off by default.
    #[arg(long, env = "ALLOW_UNVERIFIED_CONNECT", default_value_t = false)]
    pub allow_unverified_connect: bool,

    /// Per-handler deadline, in seconds, for fan-out broadcasts.
    #[arg(long, env = "HANDLER_DEADLINE_SECS", default_value_t = 20)]
    pub handler_deadline_secs: u64,

    /// Connection TTL, in seconds, from registration.
    #[arg(long, env = "CONNECTION_TTL_SECS", default_value_t = 86_400)]
    pub connection_ttl_secs: i64,

    /// How often the background sweep checks for TTL-expired connections.
    #[arg(long, env = "TTL_SWEEP_INTERVAL_SECS", default_value_t = 300)]
    pub ttl_sweep_interval_secs: u64,
}

impl Config {
    pub fn allowed_domains(&self) -> Vec<String> {
        split_csv(&self.allowed_domains)
    }

    pub fn allowed_emails(&self) -> Vec<String> {
        split_csv(&self.allowed_emails)
    }

    pub fn frontend_origins(&self) -> Vec<String> {
        split_csv(&self.frontend_origins)
    }
}

#[cfg(test)]
impl Config {
    /// A `Config` with every field at its documented default, for tests
    /// that don't care about start-up configuration.
    pub fn test_default() -> Self {
        Config {
            games_table_name: "games".into(),
            player_games_table_name: "player_games".into(),
            scenarios_table_name: "scenarios".into(),
            connections_table_name: "connections".into(),
            broadcast_endpoint: "local".into(),
            user_pool_id: String::new(),
            user_pool_client_id: String::new(),
            allowed_domains: String::new(),
            allowed_emails: String::new(),
            frontend_origins: String::new(),
            port: 8080,
            allow_unverified_connect: false,
            handler_deadline_secs: 20,
            connection_ttl_secs: 86_400,
            ttl_sweep_interval_secs: 300,
        }
    }
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
