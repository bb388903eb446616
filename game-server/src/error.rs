//! The error taxonomy, threaded through both the REST surface (as an
//! HTTP response) and the WebSocket surface (as an `{type:"error"}`
//! frame).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use protocol::OutboundFrame;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("missing bearer token")]
    AuthMissing,
    #[error("invalid bearer token: {0}")]
    AuthInvalid(String),
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("conflict")]
    Conflict,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("transient failure: {0}")]
    Transient(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::AuthMissing | AppError::AuthInvalid(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Conflict => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Transient(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// A stable machine-readable code, used on the WS `{type:"error"}` frame.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::AuthMissing => "auth_missing",
            AppError::AuthInvalid(_) => "auth_invalid",
            AppError::Forbidden => "forbidden",
            AppError::NotFound => "not_found",
            AppError::Conflict => "conflict",
            AppError::BadRequest(_) => "bad_request",
            AppError::Transient(_) => "transient",
        }
    }

    pub fn into_ws_frame(self) -> OutboundFrame {
        OutboundFrame::Error {
            message: self.to_string(),
            code: Some(self.code().to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, AppError::Transient(_)) {
            tracing::error!(error = %self, "transient failure surfaced to caller");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let status = self.status();
        let body = ErrorBody {
            error: self.to_string(),
            details: None,
        };
        (status, axum::Json(body)).into_response()
    }
}

impl From<crate::store::StoreError> for AppError {
    fn from(err: crate::store::StoreError) -> Self {
        match err {
            crate::store::StoreError::ConditionFailed => AppError::Conflict,
            crate::store::StoreError::NotFound => AppError::NotFound,
            crate::store::StoreError::InvalidToken => AppError::BadRequest("invalid nextToken".into()),
            crate::store::StoreError::Serde(e) => AppError::Transient(e.to_string()),
        }
    }
}
