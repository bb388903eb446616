//! The opaque-continuation-token pagination envelope used by every
//! `list*` REST endpoint.

use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 100;
pub const MIN_LIMIT: u32 = 1;

/// Clamp a caller-supplied limit into `[MIN_LIMIT, MAX_LIMIT]`, defaulting
/// to `DEFAULT_LIMIT` when absent.
pub fn clamp_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(MIN_LIMIT, MAX_LIMIT)
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListGamesQuery {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub next_token: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamesPage {
    pub games: Vec<crate::dto::Game>,
    pub count: usize,
    pub has_more: bool,
    pub next_token: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenariosPage {
    pub scenarios: Vec<crate::dto::Scenario>,
    pub count: usize,
    pub has_more: bool,
    pub next_token: Option<String>,
}
