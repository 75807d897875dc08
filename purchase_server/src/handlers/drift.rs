use axum::extract::State;
use axum::Json;
use purchase::DriftStats;
use serde::Serialize;

use crate::app::AppState;

#[derive(Serialize)]
pub struct DriftResponse {
    #[serde(flatten)]
    stats: DriftStats,
    /// Run id of the bundle being served, if one is loaded.
    model_run_id: Option<String>,
}

pub async fn drift(State(state): State<AppState>) -> Json<DriftResponse> {
    Json(DriftResponse {
        stats: state.service.drift_stats(),
        model_run_id: state.service.current_bundle().map(|b| b.run_id().to_string()),
    })
}
