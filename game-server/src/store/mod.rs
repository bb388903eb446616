//! A key-value store with ordered secondary indices: point get by primary
//! key, conditional put, delete, and query-by-secondary-index with opaque
//! pagination, in the shape of a DynamoDB-style contract.
//! [`memory::MemoryStore`] is the only implementation this core ships; the
//! trait is the seam where a durable backend would plug in without
//! touching any caller.

pub mod memory;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Table {
    Games,
    Scenarios,
    PlayerGames,
    Connections,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Games => "games",
            Table::Scenarios => "scenarios",
            Table::PlayerGames => "player_games",
            Table::Connections => "connections",
        }
    }
}

/// A row's membership in one named secondary index: which partition it
/// sorts under, and its sort key within that partition. Ties are broken
/// by the primary key so pagination is stable.
#[derive(Clone, Debug)]
pub struct IndexEntry {
    pub index: &'static str,
    pub partition: String,
    pub sort: i64,
}

impl IndexEntry {
    pub fn new(index: &'static str, partition: impl Into<String>, sort: i64) -> Self {
        IndexEntry {
            index,
            partition: partition.into(),
            sort,
        }
    }
}

#[derive(Clone, Debug)]
pub enum PutCondition {
    /// Overwrite unconditionally.
    Always,
    /// Only succeeds if no row currently exists for this key.
    IfAbsent,
    /// Only succeeds if the row currently stored equals `expected`. This is
    /// the atomic compare-and-swap `joinGame` relies on to resolve the
    /// "exactly one concurrent joiner wins" race: the caller reads the
    /// game, decides it's still joinable, then puts conditioned on the
    /// exact snapshot it read.
    IfMatches(Value),
}

#[derive(Clone, Debug, Default)]
pub struct Page {
    pub limit: u32,
    pub token: Option<String>,
}

#[derive(Clone, Debug)]
pub struct QueryPage {
    pub items: Vec<Value>,
    pub next_token: Option<String>,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("condition failed")]
    ConditionFailed,
    #[error("not found")]
    NotFound,
    #[error("invalid continuation token")]
    InvalidToken,
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Internal cursor encoded into continuation tokens.
#[derive(Serialize, Deserialize)]
struct Cursor {
    sort: i64,
    key: String,
}

fn encode_cursor(sort: i64, key: &str) -> String {
    let cursor = Cursor {
        sort,
        key: key.to_string(),
    };
    let json = serde_json::to_vec(&cursor).expect("cursor always serializes");
    base64::Engine::encode(&base64::engine::general_purpose::STANDARD, json)
}

fn decode_cursor(token: &str) -> Result<(i64, String), StoreError> {
    let bytes = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, token)
        .map_err(|_| StoreError::InvalidToken)?;
    let cursor: Cursor = serde_json::from_slice(&bytes).map_err(|_| StoreError::InvalidToken)?;
    Ok((cursor.sort, cursor.key))
}

#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, table: Table, key: &str) -> Result<Option<Value>, StoreError>;

    async fn put(
        &self,
        table: Table,
        key: &str,
        value: Value,
        indexes: Vec<IndexEntry>,
        condition: PutCondition,
    ) -> Result<(), StoreError>;

    async fn delete(&self, table: Table, key: &str) -> Result<(), StoreError>;

    async fn query(
        &self,
        table: Table,
        index: &'static str,
        partition: &str,
        page: Page,
    ) -> Result<QueryPage, StoreError>;
}
