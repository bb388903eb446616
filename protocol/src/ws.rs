//! JSON frames exchanged over the WebSocket connection.
//!
//! Inbound frames are always dispatched by their `action` tag. The set of
//! known actions (`chat`, `moveUnit`, `selectUnit`, `endTurn`) gets
//! special payload shaping; anything else is treated as an opaque
//! state-changing action and forwarded verbatim alongside the broadcast.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const ACTION_CHAT: &str = "chat";

/// An inbound frame from a client. `extra` carries any fields beyond the
/// ones named here, so actions the server doesn't specifically recognize
/// still round-trip their payload to the broadcast.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundFrame {
    pub action: String,
    #[serde(default)]
    pub game_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InboundFrame {
    pub fn is_chat(&self) -> bool {
        self.action == ACTION_CHAT
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundFrame {
    #[serde(rename_all = "camelCase")]
    Chat {
        game_id: String,
        player: String,
        user_id: String,
        message: String,
        timestamp: i64,
    },
    #[serde(rename_all = "camelCase")]
    GameStateUpdate {
        game_id: String,
        action: String,
        game_state: Value,
        timestamp: i64,
    },
    #[serde(rename_all = "camelCase")]
    ConnectionStateUpdate {
        game_id: String,
        connections: ConnectionState,
        timestamp: i64,
    },
    #[serde(rename_all = "camelCase")]
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionState {
    pub player1: PlayerPresence,
    pub player2: Option<PlayerPresence>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPresence {
    pub connected: bool,
    pub user_id: String,
    pub player_name: String,
}
