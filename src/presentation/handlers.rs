// HTTP request handlers
use crate::application::door_monitor::{
    CycleOutcome, DoorMonitor, DoorStatus, SkipReason, EVENT_DOOR_STATUS_UPDATED,
};
use crate::infrastructure::config::load_service_config;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unknown door {0:?}")]
    UnknownDoor(String),

    #[error("door {door} could not be refreshed: {reason}")]
    Unavailable { door: String, reason: String },

    #[error("configuration rejected: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::UnknownDoor(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Config(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

fn find_monitor(state: &AppState, id: &str) -> Result<Arc<DoorMonitor>, ApiError> {
    state
        .monitors
        .get(id)
        .cloned()
        .ok_or_else(|| ApiError::UnknownDoor(id.to_string()))
}

fn ensure_updated(id: &str, outcome: CycleOutcome) -> Result<(), ApiError> {
    match outcome {
        CycleOutcome::Updated(_) => Ok(()),
        CycleOutcome::Skipped(reason) => {
            let reason = match reason {
                SkipReason::Busy => "update already in progress".to_string(),
                SkipReason::Unavailable(why) => format!("camera unavailable: {}", why),
                SkipReason::BadFrame(why) => format!("bad frame: {}", why),
                SkipReason::EmptySample => "no pixels along the configured line".to_string(),
            };
            Err(ApiError::Unavailable {
                door: id.to_string(),
                reason,
            })
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Status of every monitored door
pub async fn list_doors(State(state): State<Arc<AppState>>) -> Json<Vec<DoorStatus>> {
    let mut statuses = Vec::with_capacity(state.monitors.len());
    for monitor in state.monitors.values() {
        statuses.push(monitor.status().await);
    }
    Json(statuses)
}

pub async fn get_door(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<DoorStatus>, ApiError> {
    let monitor = find_monitor(&state, &id)?;
    Ok(Json(monitor.status().await))
}

/// Force an immediate update cycle
pub async fn refresh_door(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<DoorStatus>, ApiError> {
    let monitor = find_monitor(&state, &id)?;
    ensure_updated(&id, monitor.refresh(true).await)?;
    Ok(Json(monitor.status().await))
}

/// Re-read the config file and apply this door's section
pub async fn reload_door(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<DoorStatus>, ApiError> {
    let monitor = find_monitor(&state, &id)?;

    let path = state.config_path.clone();
    let config = tokio::task::spawn_blocking(move || load_service_config(&path))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Config(format!("{:#}", e)))?;
    let settings = config
        .door_settings(&id)
        .map_err(|e| ApiError::Config(e.to_string()))?
        .ok_or_else(|| ApiError::UnknownDoor(id.clone()))?;

    // Camera URLs are fixed at startup.
    if !state.cameras.contains(&settings.camera) {
        return Err(ApiError::Config(format!(
            "camera {:?} is not configured in the running service; restart to add it",
            settings.camera
        )));
    }

    tracing::info!("Reloading configuration for door {}", id);
    ensure_updated(&id, monitor.reconfigure(settings).await)?;
    Ok(Json(monitor.status().await))
}

/// Server-sent stream of door state changes
pub async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.events.subscribe();

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    match Event::default().event(EVENT_DOOR_STATUS_UPDATED).json_data(&event) {
                        Ok(sse) => yield Ok(sse),
                        Err(e) => tracing::error!("Failed to encode door event: {}", e),
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!("Event stream lagged, {} events dropped", missed);
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
