// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use anyhow::Context;
use std::collections::BTreeMap;
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::application::door_monitor::DoorMonitor;
use crate::infrastructure::config::{load_service_config, DEFAULT_CONFIG_PATH};
use crate::infrastructure::http_camera::HttpCameraSource;
use crate::infrastructure::json_state_store::JsonStateStore;
use crate::presentation::app_state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "door_status=debug,tower_http=info,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration; any invalid door rejects the whole file
    let config_path =
        std::env::var("DOOR_STATUS_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = load_service_config(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;
    let door_settings = config
        .monitor_settings()
        .context("Invalid door configuration")?;

    // Collaborators (infrastructure layer)
    let camera_urls = config.camera_urls();
    let cameras = camera_urls.keys().cloned().collect();
    let camera = Arc::new(HttpCameraSource::new(camera_urls));
    let store = Arc::new(JsonStateStore::new(config.server.state_dir.clone()));
    let (events, _) = broadcast::channel(64);
    tracing::info!("Persisting door state under {}", store.dir().display());

    // One monitor per door (application layer)
    let mut monitors = BTreeMap::new();
    for settings in door_settings {
        let door_id = settings.door_id.clone();
        let monitor = Arc::new(DoorMonitor::new(
            settings,
            camera.clone(),
            store.clone(),
            events.clone(),
        ));
        monitor.restore().await;
        monitors.insert(door_id, monitor);
    }
    tracing::info!("Monitoring {} door(s)", monitors.len());

    let tasks: Vec<_> = monitors
        .values()
        .map(|monitor| tokio::spawn(monitor.clone().run()))
        .collect();

    let state = Arc::new(AppState {
        monitors,
        events,
        cameras,
        config_path,
    });
    let router = presentation::router(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind))?;
    tracing::info!("Starting door-status service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    for task in tasks {
        task.abort();
    }
    tracing::info!("Shut down");

    Ok(())
}
