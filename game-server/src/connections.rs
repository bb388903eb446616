//! C4 — Connection Registry. A thin typed wrapper over the store scoped
//! to the Connection table, plus the presence computation shared by
//! admission (C5) and disconnect (C7).

use std::sync::Arc;

use protocol::{Connection, ConnectionState, Game, PlayerPresence};

use crate::error::AppError;
use crate::store::{IndexEntry, Page, PutCondition, Store, Table};

pub const BY_GAME_INDEX: &str = "by_game";

pub struct ConnectionRegistry {
    store: Arc<dyn Store>,
    ttl_secs: i64,
}

impl ConnectionRegistry {
    pub fn new(store: Arc<dyn Store>, ttl_secs: i64) -> Self {
        ConnectionRegistry { store, ttl_secs }
    }

    pub async fn register(
        &self,
        connection_id: &str,
        game_id: &str,
        user_id: &str,
        player_index: u8,
        now: i64,
    ) -> Result<Connection, AppError> {
        let connection = Connection {
            connection_id: connection_id.to_string(),
            game_id: game_id.to_string(),
            user_id: user_id.to_string(),
            player_index,
            connected_at: now,
            last_activity: now,
            ttl: now + self.ttl_secs,
        };

        let value = serde_json::to_value(&connection)?;
        self.store
            .put(
                Table::Connections,
                connection_id,
                value,
                vec![IndexEntry::new(BY_GAME_INDEX, game_id, now)],
                PutCondition::Always,
            )
            .await?;
        Ok(connection)
    }

    pub async fn touch(&self, connection_id: &str, now: i64) -> Result<(), AppError> {
        let Some(mut connection) = self.get(connection_id).await? else {
            return Err(AppError::NotFound);
        };
        connection.last_activity = now;
        let game_id = connection.game_id.clone();
        let connected_at = connection.connected_at;
        let value = serde_json::to_value(&connection)?;
        self.store
            .put(
                Table::Connections,
                connection_id,
                value,
                vec![IndexEntry::new(BY_GAME_INDEX, game_id, connected_at)],
                PutCondition::Always,
            )
            .await?;
        Ok(())
    }

    pub async fn forget(&self, connection_id: &str) -> Result<(), AppError> {
        self.store.delete(Table::Connections, connection_id).await?;
        Ok(())
    }

    pub async fn get(&self, connection_id: &str) -> Result<Option<Connection>, AppError> {
        match self.store.get(Table::Connections, connection_id).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// All connections currently indexed under a game. May omit a row
    /// written moments ago, or include one deleted moments ago — callers
    /// that need a consistent snapshot must compensate explicitly (see
    /// [`union_with_self`]).
    pub async fn list_by_game(&self, game_id: &str) -> Result<Vec<Connection>, AppError> {
        let mut items = Vec::new();
        let mut token = None;
        loop {
            let page = self
                .store
                .query(Table::Connections, BY_GAME_INDEX, game_id, Page { limit: 100, token })
                .await?;
            for value in page.items {
                items.push(serde_json::from_value::<Connection>(value)?);
            }
            token = page.next_token;
            if token.is_none() {
                break;
            }
        }
        Ok(items)
    }
}

/// The load-bearing compensation for secondary-index lag at connect time:
/// union the query result with the row the caller just wrote, deduplicated
/// by connectionId. Also used by disconnect to subtract the just-deleted
/// row even if it still appears in the query.
pub fn union_with_self(queried: Vec<Connection>, self_connection: Option<&Connection>) -> Vec<Connection> {
    let mut by_id: std::collections::HashMap<String, Connection> =
        queried.into_iter().map(|c| (c.connection_id.clone(), c)).collect();
    if let Some(c) = self_connection {
        by_id.insert(c.connection_id.clone(), c.clone());
    }
    by_id.into_values().collect()
}

pub fn subtract(queried: Vec<Connection>, excluded_connection_id: &str) -> Vec<Connection> {
    queried.into_iter().filter(|c| c.connection_id != excluded_connection_id).collect()
}

/// Per-player presence: at least one connection with that playerIndex.
pub fn compute_presence(game: &Game, connections: &[Connection]) -> ConnectionState {
    let player1_connected = connections.iter().any(|c| c.player_index == 1);
    let player2_connected = connections.iter().any(|c| c.player_index == 2);

    ConnectionState {
        player1: PlayerPresence {
            connected: player1_connected,
            user_id: game.player1.user_id.clone(),
            player_name: game.player1.display_name.clone(),
        },
        player2: game.player2.as_ref().map(|p2| PlayerPresence {
            connected: player2_connected,
            user_id: p2.user_id.clone(),
            player_name: p2.display_name.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use protocol::PlayerRef;

    fn sample_game() -> Game {
        Game::new_waiting(
            protocol::Scenario {
                scenario_id: "s1".into(),
                creator_id: "uA".into(),
                title: "t".into(),
                description: "d".into(),
                columns: 1,
                rows: 1,
                turn_count: 1,
                hexes: vec![],
                created_at: 0,
            },
            PlayerRef { display_name: "Alice".into(), user_id: "uA".into() },
            0,
            serde_json::json!({}),
        )
    }

    #[tokio::test]
    async fn register_then_list_by_game_finds_it() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let registry = ConnectionRegistry::new(store, 86_400);
        registry.register("c1", "g1", "uA", 1, 0).await.unwrap();
        let list = registry.list_by_game("g1").await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].connection_id, "c1");
    }

    #[tokio::test]
    async fn forget_removes_it_from_the_index() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let registry = ConnectionRegistry::new(store, 86_400);
        registry.register("c1", "g1", "uA", 1, 0).await.unwrap();
        registry.forget("c1").await.unwrap();
        assert!(registry.list_by_game("g1").await.unwrap().is_empty());
    }

    #[test]
    fn union_with_self_includes_just_written_row_even_if_query_missed_it() {
        let queried = vec![];
        let just_written = Connection {
            connection_id: "c1".into(),
            game_id: "g1".into(),
            user_id: "uA".into(),
            player_index: 1,
            connected_at: 0,
            last_activity: 0,
            ttl: 1000,
        };
        let union = union_with_self(queried, Some(&just_written));
        assert_eq!(union.len(), 1);
    }

    #[test]
    fn subtract_removes_just_deleted_row_even_if_still_in_query() {
        let c = Connection {
            connection_id: "c1".into(),
            game_id: "g1".into(),
            user_id: "uA".into(),
            player_index: 1,
            connected_at: 0,
            last_activity: 0,
            ttl: 1000,
        };
        let remaining = subtract(vec![c], "c1");
        assert!(remaining.is_empty());
    }

    #[test]
    fn compute_presence_reflects_connected_indices() {
        let game = sample_game();
        let connections = vec![Connection {
            connection_id: "c1".into(),
            game_id: game.game_id.clone(),
            user_id: "uA".into(),
            player_index: 1,
            connected_at: 0,
            last_activity: 0,
            ttl: 1000,
        }];
        let presence = compute_presence(&game, &connections);
        assert!(presence.player1.connected);
        assert!(presence.player2.is_none());
    }
}
