//! C3 — Game Service. CRUD for games with ownership enforcement and
//! paginated queries by player role. Scenario CRUD lives in the
//! [`scenario`] submodule, mirroring this one with an ownership check
//! on update/delete instead of create/join semantics.

pub mod scenario;

use std::sync::Arc;

use protocol::{clamp_limit, Game, GameStatus, GamesPage, PlayerGame, PlayerRef, PlayerRole, Scenario};
use serde_json::Value;

use crate::error::AppError;
use crate::store::{IndexEntry, Page, PutCondition, Store, Table};

/// PlayerGames index: partition = playerId, sort = the game's createdAt.
pub const PG_BY_PLAYER_INDEX: &str = "by_player";
/// PlayerGames index: partition = gameId, sort = playerIndex. Used only to
/// sweep a game's membership rows on delete.
pub const PG_BY_GAME_INDEX: &str = "by_game";
/// Games index: constant partition, sorted by `-createdAt` so the
/// `BTreeSet`'s ascending order yields newest-first.
pub const GAMES_ALL_INDEX: &str = "all_games";
const ALL_GAMES_PARTITION: &str = "ALL_GAMES";

pub struct GameService {
    store: Arc<dyn Store>,
}

impl GameService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        GameService { store }
    }

    pub async fn create_game(
        &self,
        user_id: &str,
        display_name: Option<String>,
        scenario_id: &str,
        now: i64,
    ) -> Result<Game, AppError> {
        let scenario_value = self
            .store
            .get(Table::Scenarios, scenario_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let scenario: Scenario = serde_json::from_value(scenario_value)?;

        let player1 = PlayerRef {
            display_name: display_name.unwrap_or_else(|| user_id.to_string()),
            user_id: user_id.to_string(),
        };
        let game = Game::new_waiting(scenario, player1, now, Value::Object(Default::default()));

        self.put_game(&game).await?;
        self.write_player_game(&game.game_id, user_id, 1, now).await?;
        Ok(game)
    }

    pub async fn join_game(&self, user_id: &str, game_id: &str, display_name: Option<String>, now: i64) -> Result<Game, AppError> {
        let existing_value = self.store.get(Table::Games, game_id).await?.ok_or(AppError::NotFound)?;
        let existing: Game = serde_json::from_value(existing_value.clone())?;

        if existing.player1_id == user_id {
            return Err(AppError::Conflict);
        }
        if existing.player2.is_some() {
            return Err(AppError::Conflict);
        }

        let mut updated = existing.clone();
        updated.status = GameStatus::Active;
        updated.player2 = Some(PlayerRef {
            display_name: display_name.unwrap_or_else(|| user_id.to_string()),
            user_id: user_id.to_string(),
        });
        updated.player2_id = Some(user_id.to_string());
        updated.updated_at = now;

        let updated_value = serde_json::to_value(&updated)?;
        self.store
            .put(
                Table::Games,
                game_id,
                updated_value,
                vec![IndexEntry::new(GAMES_ALL_INDEX, ALL_GAMES_PARTITION, -updated.created_at)],
                PutCondition::IfMatches(existing_value),
            )
            .await
            .map_err(|e| match e {
                crate::store::StoreError::ConditionFailed => AppError::Conflict,
                other => other.into(),
            })?;

        self.write_player_game(game_id, user_id, 2, now).await?;
        Ok(updated)
    }

    pub async fn get_game(&self, game_id: &str) -> Result<Game, AppError> {
        let value = self.store.get(Table::Games, game_id).await?.ok_or(AppError::NotFound)?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn delete_game(&self, user_id: &str, game_id: &str) -> Result<(), AppError> {
        let game = self.get_game(game_id).await?;
        if game.player1_id != user_id {
            return Err(AppError::Forbidden);
        }
        self.store.delete(Table::Games, game_id).await?;

        let mut token = None;
        loop {
            let page = self
                .store
                .query(Table::PlayerGames, PG_BY_GAME_INDEX, game_id, Page { limit: 100, token })
                .await?;
            for value in &page.items {
                let row: PlayerGame = serde_json::from_value(value.clone())?;
                let key = player_game_key(&row.player_id, &row.game_id);
                self.store.delete(Table::PlayerGames, &key).await?;
            }
            token = page.next_token;
            if token.is_none() {
                break;
            }
        }
        Ok(())
    }

    /// `player_id`, when present, restricts the listing to games that
    /// player participates in (filtered further by `role`) via the
    /// PlayerGames index. Otherwise every game is returned via the
    /// constant-partition index, newest first.
    pub async fn list_games(
        &self,
        player_id: Option<&str>,
        role: PlayerRole,
        limit: Option<u32>,
        token: Option<String>,
    ) -> Result<GamesPage, AppError> {
        let limit = clamp_limit(limit);

        let (games, next_token) = match player_id {
            Some(player_id) => {
                let page = self
                    .store
                    .query(Table::PlayerGames, PG_BY_PLAYER_INDEX, player_id, Page { limit, token })
                    .await?;
                let mut games = Vec::with_capacity(page.items.len());
                for value in page.items {
                    let row: PlayerGame = serde_json::from_value(value)?;
                    if !role_matches(role, row.player_index) {
                        continue;
                    }
                    if let Some(game_value) = self.store.get(Table::Games, &row.game_id).await? {
                        games.push(serde_json::from_value(game_value)?);
                    }
                }
                (games, page.next_token)
            }
            None => {
                let page = self
                    .store
                    .query(Table::Games, GAMES_ALL_INDEX, ALL_GAMES_PARTITION, Page { limit, token })
                    .await?;
                let games = page
                    .items
                    .into_iter()
                    .map(serde_json::from_value)
                    .collect::<Result<Vec<Game>, _>>()?;
                (games, page.next_token)
            }
        };

        Ok(GamesPage {
            count: games.len(),
            has_more: next_token.is_some(),
            next_token,
            games,
        })
    }

    /// Writes a client-supplied `gameState` blob back to the game unchanged
    /// — rule validation is out of scope for this core.
    pub async fn apply_state_update(&self, game_id: &str, new_state: Value, now: i64) -> Result<Game, AppError> {
        let mut game = self.get_game(game_id).await?;
        game.game_state = new_state;
        game.updated_at = now;
        let value = serde_json::to_value(&game)?;
        self.store
            .put(
                Table::Games,
                game_id,
                value,
                vec![IndexEntry::new(GAMES_ALL_INDEX, ALL_GAMES_PARTITION, -game.created_at)],
                PutCondition::Always,
            )
            .await?;
        Ok(game)
    }

    async fn put_game(&self, game: &Game) -> Result<(), AppError> {
        let value = serde_json::to_value(game)?;
        self.store
            .put(
                Table::Games,
                &game.game_id,
                value,
                vec![IndexEntry::new(GAMES_ALL_INDEX, ALL_GAMES_PARTITION, -game.created_at)],
                PutCondition::IfAbsent,
            )
            .await?;
        Ok(())
    }

    async fn write_player_game(&self, game_id: &str, player_id: &str, player_index: u8, now: i64) -> Result<(), AppError> {
        let row = PlayerGame {
            player_id: player_id.to_string(),
            game_id: game_id.to_string(),
            player_index,
        };
        let key = player_game_key(player_id, game_id);
        let value = serde_json::to_value(&row)?;
        self.store
            .put(
                Table::PlayerGames,
                &key,
                value,
                vec![
                    IndexEntry::new(PG_BY_PLAYER_INDEX, player_id, now),
                    IndexEntry::new(PG_BY_GAME_INDEX, game_id, player_index as i64),
                ],
                PutCondition::Always,
            )
            .await?;
        Ok(())
    }
}

fn role_matches(role: PlayerRole, player_index: u8) -> bool {
    match role {
        PlayerRole::Any => true,
        PlayerRole::Player1 => player_index == 1,
        PlayerRole::Player2 => player_index == 2,
    }
}

fn player_game_key(player_id: &str, game_id: &str) -> String {
    format!("{player_id}#{game_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    async fn seeded_service() -> (GameService, Arc<dyn Store>) {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let scenario = Scenario {
            scenario_id: "s1".into(),
            creator_id: "uA".into(),
            title: "Opening Gambit".into(),
            description: "d".into(),
            columns: 4,
            rows: 4,
            turn_count: 20,
            hexes: vec![],
            created_at: 0,
        };
        store
            .put(Table::Scenarios, "s1", serde_json::to_value(&scenario).unwrap(), vec![], PutCondition::Always)
            .await
            .unwrap();
        (GameService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn create_game_is_waiting_with_player1_set() {
        let (service, _store) = seeded_service().await;
        let game = service.create_game("uA", Some("Alice".into()), "s1", 100).await.unwrap();
        assert_eq!(game.status, GameStatus::Waiting);
        assert_eq!(game.player1_id, "uA");
        assert!(game.player2.is_none());
    }

    #[tokio::test]
    async fn create_game_fails_not_found_for_missing_scenario() {
        let (service, _store) = seeded_service().await;
        let err = service.create_game("uA", None, "missing", 100).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn join_game_activates_and_sets_player2() {
        let (service, _store) = seeded_service().await;
        let game = service.create_game("uA", None, "s1", 100).await.unwrap();
        let joined = service.join_game("uB", &game.game_id, Some("Bob".into()), 200).await.unwrap();
        assert_eq!(joined.status, GameStatus::Active);
        assert_eq!(joined.player2_id.as_deref(), Some("uB"));
    }

    #[tokio::test]
    async fn join_game_rejects_creator_and_second_joiner() {
        let (service, _store) = seeded_service().await;
        let game = service.create_game("uA", None, "s1", 100).await.unwrap();
        let self_join = service.join_game("uA", &game.game_id, None, 200).await.unwrap_err();
        assert!(matches!(self_join, AppError::Conflict));

        service.join_game("uB", &game.game_id, None, 200).await.unwrap();
        let second = service.join_game("uC", &game.game_id, None, 300).await.unwrap_err();
        assert!(matches!(second, AppError::Conflict));
    }

    #[tokio::test]
    async fn delete_game_requires_creator_and_sweeps_player_games() {
        let (service, _store) = seeded_service().await;
        let game = service.create_game("uA", None, "s1", 100).await.unwrap();
        service.join_game("uB", &game.game_id, None, 200).await.unwrap();

        let forbidden = service.delete_game("uB", &game.game_id).await.unwrap_err();
        assert!(matches!(forbidden, AppError::Forbidden));

        service.delete_game("uA", &game.game_id).await.unwrap();
        assert!(matches!(service.get_game(&game.game_id).await.unwrap_err(), AppError::NotFound));

        let page = service.list_games(Some("uA"), PlayerRole::Any, None, None).await.unwrap();
        assert!(page.games.is_empty());
    }

    #[tokio::test]
    async fn list_games_by_player_filters_by_role() {
        let (service, _store) = seeded_service().await;
        let game = service.create_game("uA", None, "s1", 100).await.unwrap();
        service.join_game("uB", &game.game_id, None, 200).await.unwrap();

        let as_player1 = service.list_games(Some("uA"), PlayerRole::Player1, None, None).await.unwrap();
        assert_eq!(as_player1.count, 1);

        let as_player2 = service.list_games(Some("uA"), PlayerRole::Player2, None, None).await.unwrap();
        assert_eq!(as_player2.count, 0);
    }

    #[tokio::test]
    async fn list_games_unfiltered_returns_newest_first() {
        let (service, _store) = seeded_service().await;
        let first = service.create_game("uA", None, "s1", 100).await.unwrap();
        let second = service.create_game("uA", None, "s1", 200).await.unwrap();

        let page = service.list_games(None, PlayerRole::Any, None, None).await.unwrap();
        assert_eq!(page.games[0].game_id, second.game_id);
        assert_eq!(page.games[1].game_id, first.game_id);
    }
}
