use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use purchase::{PredictionResult, RawRow, Scalar};
use serde_json::{Map, Value};

use crate::app::AppState;
use crate::error::{AppError, AppResult};

/// Scores one JSON object of raw feature fields. Arrays and objects count as
/// absent values.
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> AppResult<Json<PredictionResult>> {
    let Json(fields) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let row: RawRow = fields.iter().map(|(name, value)| (name.clone(), Scalar::from(value))).collect();

    // the first request after a cold start trains the model
    let service = Arc::clone(&state.service);
    let result = tokio::task::spawn_blocking(move || service.predict(&row)).await??;
    Ok(Json(result))
}
