use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::document::DocumentError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resume or job description absent/empty. Raised before any backend call.
    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The source document could not be decomposed into blocks.
    #[error("Document format error: {0}")]
    DocumentFormat(#[from] DocumentError),

    /// The evaluation response could not be parsed. Carries the raw backend text for diagnosis.
    #[error("Evaluation parse error: {reason}")]
    EvaluationParse { reason: String, raw_output: String },

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::MissingInput(msg) => (StatusCode::BAD_REQUEST, "MISSING_INPUT", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::DocumentFormat(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "DOCUMENT_FORMAT_ERROR",
                e.to_string(),
            ),
            AppError::EvaluationParse { reason, raw_output } => {
                tracing::error!("Evaluation parse error: {reason}");
                let body = Json(json!({
                    "error": {
                        "code": "EVALUATION_PARSE_ERROR",
                        "message": "Could not parse model JSON. Raw output attached.",
                        "raw_output": raw_output,
                    }
                }));
                return (StatusCode::BAD_GATEWAY, body).into_response();
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
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

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
