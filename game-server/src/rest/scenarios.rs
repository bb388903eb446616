//! `/scenarios` CRUD.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use protocol::{Hex, ListGamesQuery, Scenario, ScenariosPage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::{now_unix, AppState};

use super::authenticate;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScenarioRequest {
    title: String,
    description: String,
    columns: u32,
    rows: u32,
    turn_count: u32,
    hexes: Vec<Hex>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScenarioRequest {
    title: String,
    description: String,
    columns: u32,
    rows: u32,
    turn_count: u32,
    hexes: Vec<Hex>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResponse {
    scenario: Scenario,
}

pub async fn create_scenario(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateScenarioRequest>,
) -> Result<Json<ScenarioResponse>, AppError> {
    let identity = authenticate(&state, &headers).await?;
    let scenario = Scenario {
        scenario_id: Uuid::new_v4().to_string(),
        creator_id: identity.user_id,
        title: body.title,
        description: body.description,
        columns: body.columns,
        rows: body.rows,
        turn_count: body.turn_count,
        hexes: body.hexes,
        created_at: now_unix(),
    };
    let scenario = state.scenarios.create_scenario(scenario).await?;
    Ok(Json(ScenarioResponse { scenario }))
}

pub async fn get_scenario(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(scenario_id): Path<String>,
) -> Result<Json<ScenarioResponse>, AppError> {
    authenticate(&state, &headers).await?;
    let scenario = state.scenarios.get_scenario(&scenario_id).await?;
    Ok(Json(ScenarioResponse { scenario }))
}

pub async fn update_scenario(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(scenario_id): Path<String>,
    Json(body): Json<UpdateScenarioRequest>,
) -> Result<Json<ScenarioResponse>, AppError> {
    let identity = authenticate(&state, &headers).await?;
    let draft = Scenario {
        scenario_id: scenario_id.clone(),
        creator_id: identity.user_id.clone(),
        title: body.title,
        description: body.description,
        columns: body.columns,
        rows: body.rows,
        turn_count: body.turn_count,
        hexes: body.hexes,
        created_at: 0,
    };
    let scenario = state.scenarios.update_scenario(&identity.user_id, &scenario_id, draft).await?;
    Ok(Json(ScenarioResponse { scenario }))
}

pub async fn delete_scenario(State(state): State<Arc<AppState>>, headers: HeaderMap, Path(scenario_id): Path<String>) -> Result<(), AppError> {
    let identity = authenticate(&state, &headers).await?;
    state.scenarios.delete_scenario(&identity.user_id, &scenario_id).await
}

pub async fn list_scenarios(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListGamesQuery>,
) -> Result<Json<ScenariosPage>, AppError> {
    authenticate(&state, &headers).await?;
    let page = state.scenarios.list_scenarios(query.limit, query.next_token).await?;
    Ok(Json(page))
}
