//! Root and health check handlers

use axum::Json;

use crate::models::{HealthResponse, MessageResponse};

pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Fraud Detection API Running Successfully",
    })
}

/// Liveness only; does not look at model state
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "API is healthy",
    })
}
