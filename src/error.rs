//! Error handling

use axum::{
    extract::rejection::JsonRejection,
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;
use validator::ValidationErrors;

use crate::model::ScoringError;

pub type AppResult<T> = Result<T, AppError>;

/// Detail returned when `/predict` is hit without loaded artifacts
pub const MODEL_NOT_LOADED: &str = "Model not loaded";

#[derive(Debug)]
pub enum AppError {
    // Request body did not match the schema
    ValidationError(String),

    // No artifacts in state
    ModelNotLoaded,

    // Anything raised while assembling, scaling or scoring
    InferenceError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::ModelNotLoaded | AppError::InferenceError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            AppError::ValidationError(msg) => msg.as_str(),
            AppError::ModelNotLoaded => MODEL_NOT_LOADED,
            AppError::InferenceError(msg) => msg.as_str(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.detail())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            AppError::ValidationError(msg) => {
                tracing::warn!("Rejected request: {}", msg);
            }
            AppError::ModelNotLoaded => {
                tracing::error!("Prediction requested but no model is loaded");
            }
            AppError::InferenceError(msg) => {
                tracing::error!("Inference error: {}", msg);
            }
        }

        let body = Json(json!({
            "detail": self.detail()
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("{} is invalid ({})", field, e.code),
                })
            })
            .collect();

        let detail = if messages.is_empty() {
            "Invalid request body".to_string()
        } else {
            messages.join("; ")
        };

        AppError::ValidationError(detail)
    }
}

impl From<ScoringError> for AppError {
    fn from(err: ScoringError) -> Self {
        AppError::InferenceError(err.to_string())
    }
}
