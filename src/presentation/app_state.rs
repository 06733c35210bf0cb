// Application state for HTTP handlers
use crate::application::door_monitor::{DoorEvent, DoorMonitor};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct AppState {
    pub monitors: BTreeMap<String, Arc<DoorMonitor>>,
    pub events: broadcast::Sender<DoorEvent>,
    /// Cameras the running camera source can reach
    pub cameras: BTreeSet<String>,
    /// Config file re-read by the reload endpoint
    pub config_path: String,
}
