use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::services::tmdb::TmdbError;

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed path or query parameter
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Upstream(#[from] TmdbError),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream(TmdbError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AppError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                ErrorResponse {
                    error: msg.clone(),
                    details: None,
                }
            }
            AppError::Upstream(e) => {
                tracing::error!("TMDB error: {}", e);
                let error = match e {
                    TmdbError::NotFound(_) => "Show not found",
                    _ => "Upstream metadata provider error",
                };
                ErrorResponse {
                    error: error.to_string(),
                    details: Some(e.to_string()),
                }
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
