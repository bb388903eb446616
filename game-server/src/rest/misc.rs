//! Liveness and identity echo.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

use super::authenticate;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResponse {
    user: crate::identity::Identity,
}

pub async fn test(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Json<TestResponse>, AppError> {
    let user = authenticate(&state, &headers).await?;
    Ok(Json(TestResponse { user }))
}
