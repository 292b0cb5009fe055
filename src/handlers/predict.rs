//! Prediction handler

use axum::{extract::State, Json};

use crate::middleware::ValidatedJson;
use crate::model::pipeline;
use crate::models::{PredictionResponse, Transaction};
use crate::{AppError, AppResult, AppState};

/// Score one transaction
pub async fn predict(
    State(state): State<AppState>,
    ValidatedJson(tx): ValidatedJson<Transaction>,
) -> AppResult<Json<PredictionResponse>> {
    let artifacts = state.artifacts.clone().ok_or(AppError::ModelNotLoaded)?;

    // Model call is CPU-bound; keep it off the async workers
    let score = tokio::task::spawn_blocking(move || {
        pipeline::score(&artifacts, tx.time, &tx.v_features, tx.amount)
    })
    .await
    .map_err(|e| AppError::InferenceError(format!("Scoring task failed: {}", e)))??;

    Ok(Json(score.into()))
}
