// Presentation layer - HTTP API
pub mod app_state;
pub mod handlers;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    get_door, health_check, list_doors, refresh_door, reload_door, stream_events,
};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/doors", get(list_doors))
        .route("/doors/:id", get(get_door))
        .route("/doors/:id/refresh", post(refresh_door))
        .route("/doors/:id/reload", post(reload_door))
        .route("/events", get(stream_events))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
