use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use purchase::FeatureImportance;

use crate::app::AppState;
use crate::error::AppResult;

pub async fn feature_importance(State(state): State<AppState>) -> AppResult<Json<Vec<FeatureImportance>>> {
    let service = Arc::clone(&state.service);
    let ranking = tokio::task::spawn_blocking(move || service.importance_ranking()).await??;
    Ok(Json(ranking))
}
