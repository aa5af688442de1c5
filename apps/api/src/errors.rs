use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::GenerationError;
use crate::models::intake::IntakeError;
use crate::safety::triage::TriageMissing;
use crate::storage::StoreError;
use crate::submission_guard::GuardError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Safety mode is on and some triage questions are unanswered.
    #[error("Triage answers required: {}", .missing.join(", "))]
    TriageRequired {
        missing: Vec<&'static str>,
        auto_detected: bool,
    },

    #[error("A submission is already in flight for this session")]
    SubmissionInFlight,

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Submission guard error: {0}")]
    Guard(#[from] GuardError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<IntakeError> for AppError {
    fn from(e: IntakeError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<TriageMissing> for AppError {
    fn from(e: TriageMissing) -> Self {
        AppError::TriageRequired {
            missing: e.missing,
            auto_detected: e.auto_detected,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::TriageRequired { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "TRIAGE_REQUIRED",
                self.to_string(),
            ),
            AppError::SubmissionInFlight => (
                StatusCode::CONFLICT,
                "SUBMISSION_IN_FLIGHT",
                self.to_string(),
            ),
            AppError::Generation(e) => {
                tracing::error!("Generation error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "GENERATION_FAILED",
                    "Generation failed, please retry".to_string(),
                )
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Guard(e) => {
                tracing::error!("Submission guard error: {e}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "GUARD_UNAVAILABLE",
                    "Submission could not be admitted, please retry".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let AppError::TriageRequired {
            missing,
            auto_detected,
        } = &self
        {
            error["missing"] = json!(missing);
            error["auto_detected"] = json!(auto_detected);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
