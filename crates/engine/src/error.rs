//! Engine error type and its HTTP mapping

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use hybridrec_core::HybridRecError;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Movie {movie_id} is missing genre column '{column}'")]
    MissingGenreColumn { movie_id: i64, column: String },

    #[error("Feature dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid model configuration: {0}")]
    InvalidConfig(String),

    #[error("Model has already been trained")]
    ModelAlreadyTrained,

    #[error("Failed to solve normal equations: {0}")]
    Solver(String),

    #[error("Invalid feedback type: {0}")]
    InvalidFeedback(String),

    #[error("Invalid interaction type: {0}")]
    InvalidInteraction(String),

    #[error(transparent)]
    Validation(HybridRecError),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Recommendation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Store(err.to_string())
    }
}

impl From<HybridRecError> for EngineError {
    fn from(err: HybridRecError) -> Self {
        match err {
            HybridRecError::ValidationError { .. } => EngineError::Validation(err),
            HybridRecError::DatabaseError(e) => EngineError::Store(e.to_string()),
            HybridRecError::ConfigurationError { .. } => EngineError::InvalidConfig(err.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for EngineError {
    fn from(err: tokio::task::JoinError) -> Self {
        EngineError::Internal(format!("Recommendation task failed: {}", err))
    }
}

impl ResponseError for EngineError {
    fn status_code(&self) -> StatusCode {
        match self {
            EngineError::InvalidFeedback(_)
            | EngineError::InvalidInteraction(_)
            | EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            EngineError::InvalidFeedback(_) => "invalid_feedback",
            EngineError::InvalidInteraction(_) => "invalid_interaction",
            EngineError::Validation(_) => "validation_error",
            EngineError::Timeout(_) => "timeout",
            EngineError::Store(_) => "store_error",
            _ => "internal_error",
        };

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": error,
            "error_description": self.to_string()
        }))
    }
}
