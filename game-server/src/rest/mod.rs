//! REST surface: game/scenario CRUD plus the liveness/docs endpoints.

pub mod games;
pub mod misc;
pub mod scenarios;

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::identity::Identity;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = build_cors(&state);

    Router::new()
        .route("/test", get(misc::test))
        .route("/games", post(games::create_game).get(games::list_all))
        .route("/games/my", get(games::list_my_any))
        .route("/games/my/player1", get(games::list_my_player1))
        .route("/games/my/player2", get(games::list_my_player2))
        .route("/games/players/{player_id}", get(games::list_by_player_any))
        .route("/games/player1/{player_id}", get(games::list_by_player1))
        .route("/games/player2/{player_id}", get(games::list_by_player2))
        .route("/games/{game_id}", get(games::get_game).delete(games::delete_game))
        .route("/games/{game_id}/join", post(games::join_game))
        .route(
            "/scenarios",
            post(scenarios::create_scenario).get(scenarios::list_scenarios),
        )
        .route(
            "/scenarios/{scenario_id}",
            get(scenarios::get_scenario).put(scenarios::update_scenario).delete(scenarios::delete_scenario),
        )
        .route("/ws", get(crate::ws::upgrade_handler))
        .nest_service("/docs", ServeDir::new("docs"))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn build_cors(state: &AppState) -> CorsLayer {
    let origins = state.config.frontend_origins();
    let layer = CorsLayer::new()
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any);
    if origins.is_empty() {
        layer.allow_origin(tower_http::cors::Any)
    } else {
        let parsed: Vec<_> = origins.into_iter().filter_map(|o| o.parse().ok()).collect();
        layer.allow_origin(AllowOrigin::list(parsed))
    }
}

/// Extracts and verifies the bearer token from the `Authorization` header.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Identity, AppError> {
    let header = headers.get(axum::http::header::AUTHORIZATION).ok_or(AppError::AuthMissing)?;
    let value = header.to_str().map_err(|_| AppError::AuthMissing)?;
    let token = value.strip_prefix("Bearer ").ok_or(AppError::AuthMissing)?;
    state.identity.verify(token).await
}
