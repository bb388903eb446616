//! `/games` CRUD and listing endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use protocol::{Game, GamesPage, ListGamesQuery, PlayerRole};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::{now_unix, AppState};

use super::authenticate;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    player_name: Option<String>,
    scenario_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGameRequest {
    player_name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameResponse {
    game_id: String,
    game: Game,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResponse {
    game: Game,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGameResponse {
    game: Game,
    message: String,
}

pub async fn create_game(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateGameRequest>,
) -> Result<Json<CreateGameResponse>, AppError> {
    let identity = authenticate(&state, &headers).await?;
    let game = state
        .games
        .create_game(&identity.user_id, body.player_name, &body.scenario_id, now_unix())
        .await?;
    Ok(Json(CreateGameResponse {
        game_id: game.game_id.clone(),
        game,
    }))
}

pub async fn get_game(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(game_id): Path<String>,
) -> Result<Json<GameResponse>, AppError> {
    authenticate(&state, &headers).await?;
    let game = state.games.get_game(&game_id).await?;
    Ok(Json(GameResponse { game }))
}

pub async fn join_game(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(game_id): Path<String>,
    Json(body): Json<JoinGameRequest>,
) -> Result<Json<JoinGameResponse>, AppError> {
    let identity = authenticate(&state, &headers).await?;
    let game = state
        .games
        .join_game(&identity.user_id, &game_id, body.player_name, now_unix())
        .await?;
    Ok(Json(JoinGameResponse {
        game,
        message: "Game is now active!".to_string(),
    }))
}

pub async fn delete_game(State(state): State<Arc<AppState>>, headers: HeaderMap, Path(game_id): Path<String>) -> Result<(), AppError> {
    let identity = authenticate(&state, &headers).await?;
    state.games.delete_game(&identity.user_id, &game_id).await
}

pub async fn list_all(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListGamesQuery>,
) -> Result<Json<GamesPage>, AppError> {
    authenticate(&state, &headers).await?;
    let page = state.games.list_games(None, PlayerRole::Any, query.limit, query.next_token).await?;
    Ok(Json(page))
}

pub async fn list_my_any(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListGamesQuery>,
) -> Result<Json<GamesPage>, AppError> {
    list_by_role(state, headers, None, query, PlayerRole::Any).await
}

pub async fn list_my_player1(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListGamesQuery>,
) -> Result<Json<GamesPage>, AppError> {
    list_by_role(state, headers, None, query, PlayerRole::Player1).await
}

pub async fn list_my_player2(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListGamesQuery>,
) -> Result<Json<GamesPage>, AppError> {
    list_by_role(state, headers, None, query, PlayerRole::Player2).await
}

pub async fn list_by_player_any(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(player_id): Path<String>,
    Query(query): Query<ListGamesQuery>,
) -> Result<Json<GamesPage>, AppError> {
    list_by_role(state, headers, Some(player_id), query, PlayerRole::Any).await
}

pub async fn list_by_player1(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(player_id): Path<String>,
    Query(query): Query<ListGamesQuery>,
) -> Result<Json<GamesPage>, AppError> {
    list_by_role(state, headers, Some(player_id), query, PlayerRole::Player1).await
}

pub async fn list_by_player2(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(player_id): Path<String>,
    Query(query): Query<ListGamesQuery>,
) -> Result<Json<GamesPage>, AppError> {
    list_by_role(state, headers, Some(player_id), query, PlayerRole::Player2).await
}

async fn list_by_role(
    state: Arc<AppState>,
    headers: HeaderMap,
    explicit_player_id: Option<String>,
    query: ListGamesQuery,
    role: PlayerRole,
) -> Result<Json<GamesPage>, AppError> {
    let identity = authenticate(&state, &headers).await?;
    let player_id = explicit_player_id.unwrap_or(identity.user_id);
    let page = state.games.list_games(Some(&player_id), role, query.limit, query.next_token).await?;
    Ok(Json(page))
}
