use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use purchase::PredictionService;
use tower_http::cors::{Any, CorsLayer};

use crate::handlers;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/api/predict", post(handlers::predict::predict))
        .route("/api/feature_importance", get(handlers::importance::feature_importance))
        .route("/api/data_summary", get(handlers::summary::data_summary))
        .route("/api/drift", get(handlers::drift::drift))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}
