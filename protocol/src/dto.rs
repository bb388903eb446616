//! Resource DTOs for games, scenarios, player-game links, and connections.
//!
//! These mirror the entities in the data model: a [`Game`] is mutable
//! (status, player2, turn number, game state); a [`Scenario`] is
//! read-only after creation except through its owner; [`PlayerGame`] is
//! the per-player-index membership row; [`Connection`] is a live socket.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A player's identity as stored on a game: display name plus the
/// immutable identity-provider user id.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRef {
    pub display_name: String,
    pub user_id: String,
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Waiting,
    Active,
    Finished,
}

/// One hex on a scenario's board.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Hex {
    pub column: i32,
    pub row: i32,
    pub terrain: String,
}

/// The immutable board definition captured into a game at creation time.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub scenario_id: String,
    pub creator_id: String,
    pub title: String,
    pub description: String,
    pub columns: u32,
    pub rows: u32,
    pub turn_count: u32,
    pub hexes: Vec<Hex>,
    pub created_at: i64,
}

/// A match between two players.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub game_id: String,
    pub status: GameStatus,
    pub player1: PlayerRef,
    pub player2: Option<PlayerRef>,
    pub player1_id: String,
    pub player2_id: Option<String>,
    pub turn_number: u32,
    pub created_at: i64,
    pub updated_at: i64,
    pub scenario_snapshot: Scenario,
    pub game_state: serde_json::Value,
}

impl Game {
    pub fn new_waiting(
        scenario: Scenario,
        player1: PlayerRef,
        now: i64,
        initial_state: serde_json::Value,
    ) -> Self {
        let player1_id = player1.user_id.clone();
        Game {
            game_id: Uuid::new_v4().to_string(),
            status: GameStatus::Waiting,
            player1,
            player2: None,
            player1_id,
            player2_id: None,
            turn_number: 1,
            created_at: now,
            updated_at: now,
            scenario_snapshot: scenario,
            game_state: initial_state,
        }
    }

    /// The player index (1 or 2) the given user id holds in this game, if any.
    pub fn player_index_for(&self, user_id: &str) -> Option<u8> {
        if self.player1_id == user_id {
            Some(1)
        } else if self.player2_id.as_deref() == Some(user_id) {
            Some(2)
        } else {
            None
        }
    }

    /// A copy of the game with the immutable scenario snapshot (and its id)
    /// stripped, suitable for broadcasting as a `gameStateUpdate` payload.
    pub fn mutable_state_only(&self) -> serde_json::Value {
        self.game_state.clone()
    }
}

/// A (playerId, gameId, playerIndex) membership row.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerGame {
    pub player_id: String,
    pub game_id: String,
    pub player_index: u8,
}

/// A single live WebSocket.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub connection_id: String,
    pub game_id: String,
    pub user_id: String,
    pub player_index: u8,
    pub connected_at: i64,
    pub last_activity: i64,
    pub ttl: i64,
}

/// Which role(s) a `listGames` caller wants a playerId filtered to.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PlayerRole {
    #[default]
    Any,
    Player1,
    Player2,
}

impl std::str::FromStr for PlayerRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any" => Ok(PlayerRole::Any),
            "1" => Ok(PlayerRole::Player1),
            "2" => Ok(PlayerRole::Player2),
            other => Err(format!("invalid player role: {other}")),
        }
    }
}
