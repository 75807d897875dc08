//! Health check handler

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Liveness only. Does not load or train the model.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy", version: env!("CARGO_PKG_VERSION") })
}
