use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Payment not found: {0}")]
    NotFound(String),

    #[error("Invalid payment: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Bus error: {0}")]
    BusError(#[from] saga_common::BusError),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl IntoResponse for OrchestratorError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            OrchestratorError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),

            OrchestratorError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),

            OrchestratorError::DatabaseError(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database operation failed".to_string(),
                )
            }

            OrchestratorError::BusError(ref e) => {
                tracing::error!("Bus error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Event publishing failed".to_string(),
                )
            }

            OrchestratorError::Timeout(ref op) => {
                tracing::error!(operation = %op, "Operation timed out");
                (StatusCode::GATEWAY_TIMEOUT, "Operation timed out".to_string())
            }

            OrchestratorError::InternalError(ref e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
