//! In-process `Store` implementation. Backs each table with a
//! `DashMap` for the primary key plus one `DashMap`-of-`BTreeSet` per
//! declared secondary index, so `query` never needs to scan the whole
//! table. TTL eviction for the connections table runs on a background
//! interval — bounded lag, not relied on for correctness; the
//! dispatcher's explicit deletes on terminal send errors are the primary
//! reaping path.

use std::collections::BTreeSet;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, warn};

use super::{decode_cursor, encode_cursor, IndexEntry, Page, PutCondition, QueryPage, Store, StoreError, Table};

type SortKey = (i64, String);

#[derive(Default)]
struct TableData {
    rows: DashMap<String, Value>,
    /// index name -> partition value -> ordered (sort, primary key) set.
    indexes: DashMap<&'static str, DashMap<String, BTreeSet<SortKey>>>,
    /// primary key -> the index memberships currently recorded for it, so
    /// a later put/delete can clean up stale entries.
    memberships: DashMap<String, Vec<IndexEntry>>,
}

impl TableData {
    fn remove_memberships(&self, key: &str) {
        if let Some((_, old)) = self.memberships.remove(key) {
            for entry in old {
                if let Some(partitions) = self.indexes.get(entry.index) {
                    if let Some(mut set) = partitions.get_mut(&entry.partition) {
                        set.remove(&(entry.sort, key.to_string()));
                    }
                }
            }
        }
    }

    fn apply_memberships(&self, key: &str, indexes: Vec<IndexEntry>) {
        for entry in &indexes {
            let partitions = self.indexes.entry(entry.index).or_default();
            partitions
                .entry(entry.partition.clone())
                .or_default()
                .insert((entry.sort, key.to_string()));
        }
        self.memberships.insert(key.to_string(), indexes);
    }
}

pub struct MemoryStore {
    games: TableData,
    scenarios: TableData,
    player_games: TableData,
    connections: TableData,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            games: TableData::default(),
            scenarios: TableData::default(),
            player_games: TableData::default(),
            connections: TableData::default(),
        }
    }

    fn table(&self, table: Table) -> &TableData {
        match table {
            Table::Games => &self.games,
            Table::Scenarios => &self.scenarios,
            Table::PlayerGames => &self.player_games,
            Table::Connections => &self.connections,
        }
    }

    /// Spawns the TTL sweep for the connections table. `now` supplies the
    /// current unix-millis timestamp so tests can drive it deterministically
    /// if they hold their own clone of the store.
    pub fn spawn_ttl_sweep(self: &std::sync::Arc<Self>, interval: Duration, now: impl Fn() -> i64 + Send + Sync + 'static) {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                store.sweep_expired_connections(now());
            }
        });
    }

    fn sweep_expired_connections(&self, now: i64) {
        let expired: Vec<String> = self
            .connections
            .rows
            .iter()
            .filter_map(|entry| {
                let ttl = entry.value().get("ttl")?.as_i64()?;
                if ttl <= now {
                    Some(entry.key().clone())
                } else {
                    None
                }
            })
            .collect();
        for key in &expired {
            self.connections.rows.remove(key);
            self.connections.remove_memberships(key);
        }
        if !expired.is_empty() {
            debug!(count = expired.len(), "ttl sweep evicted expired connections");
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn get(&self, table: Table, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.table(table).rows.get(key).map(|v| v.clone()))
    }

    async fn put(
        &self,
        table: Table,
        key: &str,
        value: Value,
        indexes: Vec<IndexEntry>,
        condition: PutCondition,
    ) -> Result<(), StoreError> {
        let data = self.table(table);
        match condition {
            PutCondition::Always => {
                data.rows.insert(key.to_string(), value);
            }
            PutCondition::IfAbsent => {
                let mut inserted = false;
                data.rows.entry(key.to_string()).or_insert_with(|| {
                    inserted = true;
                    value
                });
                if !inserted {
                    return Err(StoreError::ConditionFailed);
                }
            }
            PutCondition::IfMatches(expected) => {
                use dashmap::mapref::entry::Entry;
                match data.rows.entry(key.to_string()) {
                    Entry::Occupied(mut occ) => {
                        if *occ.get() != expected {
                            return Err(StoreError::ConditionFailed);
                        }
                        occ.insert(value);
                    }
                    Entry::Vacant(_) => return Err(StoreError::ConditionFailed),
                }
            }
        }
        data.remove_memberships(key);
        data.apply_memberships(key, indexes);
        Ok(())
    }

    async fn delete(&self, table: Table, key: &str) -> Result<(), StoreError> {
        let data = self.table(table);
        data.rows.remove(key);
        data.remove_memberships(key);
        Ok(())
    }

    async fn query(
        &self,
        table: Table,
        index: &'static str,
        partition: &str,
        page: Page,
    ) -> Result<QueryPage, StoreError> {
        let data = self.table(table);
        let Some(partitions) = data.indexes.get(index) else {
            return Ok(QueryPage {
                items: vec![],
                next_token: None,
            });
        };
        let Some(set) = partitions.get(partition) else {
            return Ok(QueryPage {
                items: vec![],
                next_token: None,
            });
        };

        let after = match &page.token {
            Some(token) => Some(decode_cursor(token)?),
            None => None,
        };

        let limit = page.limit.max(1) as usize;
        let mut items = Vec::with_capacity(limit);
        let mut last_returned: Option<(i64, String)> = None;

        let mut iter = set
            .iter()
            .filter(|sk| match &after {
                Some(cursor) => **sk > *cursor,
                None => true,
            })
            .peekable();

        while items.len() < limit {
            let Some((sort, primary_key)) = iter.next() else {
                break;
            };
            match data.rows.get(primary_key) {
                Some(row) => {
                    items.push(row.clone());
                    last_returned = Some((*sort, primary_key.clone()));
                }
                None => {
                    // Tolerate an index entry whose row has since been
                    // deleted (eventual-consistency window); just skip it.
                    warn!(table = table.name(), key = %primary_key, "stale index entry for missing row");
                }
            }
        }

        // The cursor is the last row actually handed back, not the next
        // one in line, so the following page's `>` filter resumes right
        // after it instead of skipping it.
        let next_token = if iter.peek().is_some() {
            last_returned.map(|(sort, key)| encode_cursor(sort, &key))
        } else {
            None
        };

        Ok(QueryPage { items, next_token })
    }
}
