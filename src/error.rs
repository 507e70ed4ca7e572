use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::services::recommendations::RecommendError;

/// Message returned to clients for storage failures
pub const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

/// Message returned to clients when a recommendation batch cannot be produced
pub const RECOMMENDATION_FAILED_MESSAGE: &str = "recommendation generation failed";

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown reference: {0}")]
    UnknownReference(String),

    #[error("Recommendation error: {0}")]
    Recommendation(RecommendError),
}

impl From<RecommendError> for AppError {
    fn from(err: RecommendError) -> Self {
        match err {
            RecommendError::UnknownUser(user_id) => {
                AppError::UnknownReference(format!("user {} does not exist", user_id))
            }
            other => AppError::Recommendation(other),
        }
    }
}

/// Message returned to clients whose request body could not be decoded
pub const MALFORMED_BODY_MESSAGE: &str = "request body is malformed or incomplete";

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Rejected request body");
        AppError::InvalidInput(MALFORMED_BODY_MESSAGE.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::InvalidInput(msg) | AppError::UnknownReference(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_ERROR_MESSAGE.to_string(),
            ),
            AppError::Recommendation(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                RECOMMENDATION_FAILED_MESSAGE.to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let body = Json(json!({
            "status": status.as_u16(),
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
