// Door monitor service - Drives the engine for one camera line
use crate::application::camera_source::CameraSource;
use crate::application::state_store::StateStore;
use crate::domain::color_match::match_percent;
use crate::domain::door_state::{
    update, DoorState, EngineConfig, EngineState, NextAction, PercentHistory, Transition,
};
use crate::domain::geometry::{ColorRange, Point};
use crate::domain::line_sampler::sample;
use crate::infrastructure::frame::{prepare_frame, FrameOptions};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, MutexGuard, RwLock};

pub const EVENT_DOOR_STATUS_UPDATED: &str = "door_status_updated";

/// Validated configuration for one monitored door.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    pub door_id: String,
    pub camera: String,
    pub point_a: Point,
    pub point_b: Point,
    pub color_range: ColorRange,
    pub frame: FrameOptions,
    pub engine: EngineConfig,
    pub fetch_timeout: Duration,
    pub startup_delay: Duration,
}

/// Published whenever a door's label changes or a refresh was forced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoorEvent {
    pub door_id: String,
    pub camera: String,
    pub percent: f64,
    pub state: DoorState,
    pub next_action: NextAction,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Another cycle for this door is still in flight.
    Busy,
    Unavailable(String),
    BadFrame(String),
    EmptySample,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Skipped(SkipReason),
    Updated(Transition),
}

/// Serialisable view of a door for the API.
#[derive(Debug, Clone, Serialize)]
pub struct DoorStatus {
    pub door_id: String,
    pub camera: String,
    pub state: DoorState,
    pub next_action: NextAction,
    pub percent: Option<f64>,
    pub last_percent: Option<f64>,
    pub last_update: Option<DateTime<Utc>>,
    pub active_mode: bool,
    pub history_size: usize,
    pub available: bool,
    pub min_color: String,
    pub max_color: String,
    pub point_a: String,
    pub point_b: String,
    pub open_position: f64,
    pub closed_position: f64,
    pub transition_threshold: f64,
    pub state_timeout: u64,
}

struct MonitorState {
    engine: EngineState,
    available: bool,
}

pub struct DoorMonitor {
    settings: RwLock<Arc<MonitorSettings>>,
    /// Held for a whole update cycle; `state` is only locked around reads
    /// and the final write-back.
    cycle_lock: Mutex<()>,
    state: Mutex<MonitorState>,
    camera: Arc<dyn CameraSource>,
    store: Arc<dyn StateStore>,
    events: broadcast::Sender<DoorEvent>,
}

impl DoorMonitor {
    pub fn new(
        settings: MonitorSettings,
        camera: Arc<dyn CameraSource>,
        store: Arc<dyn StateStore>,
        events: broadcast::Sender<DoorEvent>,
    ) -> Self {
        let engine = EngineState::new(settings.engine.history_capacity);
        Self {
            settings: RwLock::new(Arc::new(settings)),
            cycle_lock: Mutex::new(()),
            state: Mutex::new(MonitorState {
                engine,
                available: false,
            }),
            camera,
            store,
            events,
        }
    }

    pub async fn settings(&self) -> Arc<MonitorSettings> {
        self.settings.read().await.clone()
    }

    /// Seed the engine from the persisted snapshot, if one exists.
    pub async fn restore(&self) {
        let settings = self.settings().await;
        match self.store.load(&settings.door_id).await {
            Ok(Some(snapshot)) => {
                let mut state = self.state.lock().await;
                state.engine = EngineState::restore(snapshot, settings.engine.history_capacity);
                state.available = true;
                tracing::info!(
                    "Restored door {} as {} ({:?}%)",
                    settings.door_id,
                    state.engine.door_state,
                    state.engine.current_percent
                );
            }
            Ok(None) => {
                tracing::debug!("No stored state for door {}", settings.door_id);
            }
            Err(e) => {
                tracing::warn!("Invalid stored state for door {}: {:#}", settings.door_id, e);
            }
        }
    }

    /// Run one update cycle, waiting for any cycle already in flight.
    pub async fn refresh(&self, force: bool) -> CycleOutcome {
        let gate = self.cycle_lock.lock().await;
        self.cycle(gate, force).await
    }

    /// Polling entry point: skips instead of queueing behind a running cycle.
    pub async fn tick(&self) -> CycleOutcome {
        match self.cycle_lock.try_lock() {
            Ok(gate) => self.cycle(gate, false).await,
            Err(_) => CycleOutcome::Skipped(SkipReason::Busy),
        }
    }

    /// Swap in new settings, forget the current classification and classify
    /// again from a fresh frame.
    pub async fn reconfigure(&self, settings: MonitorSettings) -> CycleOutcome {
        let gate = self.cycle_lock.lock().await;
        {
            let mut state = self.state.lock().await;
            state.engine.reset();
            if settings.engine.history_capacity != self.settings().await.engine.history_capacity {
                state.engine.history = PercentHistory::new(settings.engine.history_capacity);
            }
            *self.settings.write().await = Arc::new(settings);
        }
        self.cycle(gate, true).await
    }

    pub async fn poll_interval(&self) -> Duration {
        let active = self.state.lock().await.engine.active_mode;
        self.settings().await.engine.poll_interval(active)
    }

    pub async fn status(&self) -> DoorStatus {
        let settings = self.settings().await;
        let state = self.state.lock().await;
        let engine = &state.engine;

        DoorStatus {
            door_id: settings.door_id.clone(),
            camera: settings.camera.clone(),
            state: engine.door_state,
            next_action: engine.next_action,
            percent: engine.current_percent,
            last_percent: engine.last_percent,
            last_update: engine.state_stable_since,
            active_mode: engine.active_mode,
            history_size: engine.history.len(),
            available: state.available,
            min_color: settings.color_range.min.to_string(),
            max_color: settings.color_range.max.to_string(),
            point_a: settings.point_a.to_string(),
            point_b: settings.point_b.to_string(),
            open_position: settings.engine.open_position,
            closed_position: settings.engine.closed_position,
            transition_threshold: settings.engine.transition_threshold,
            state_timeout: settings.engine.state_timeout.as_secs(),
        }
    }

    /// Poll forever: one forced refresh after the startup delay, then ticks at
    /// the idle or active interval depending on the current mode.
    pub async fn run(self: Arc<Self>) {
        let settings = self.settings().await;
        tokio::time::sleep(settings.startup_delay).await;

        log_outcome(&settings.door_id, &self.refresh(true).await);

        loop {
            tokio::time::sleep(self.poll_interval().await).await;
            let outcome = self.tick().await;
            log_outcome(&self.settings().await.door_id, &outcome);
        }
    }

    async fn cycle(&self, _gate: MutexGuard<'_, ()>, force: bool) -> CycleOutcome {
        let settings = self.settings().await;

        let percent = match self.observe(&settings).await {
            Ok(percent) => percent,
            Err(reason) => {
                self.state.lock().await.available = false;
                return CycleOutcome::Skipped(reason);
            }
        };

        let transition = {
            let mut state = self.state.lock().await;
            let transition = update(&state.engine, percent, Utc::now(), &settings.engine, force);
            state.engine = transition.state.clone();
            state.available = true;
            transition
        };

        if transition.active_mode_changed {
            if transition.state.active_mode {
                tracing::debug!("Door {} switched to active mode at {:.1}%", settings.door_id, percent);
            } else {
                tracing::debug!("Door {} switched back to idle mode", settings.door_id);
            }
        }

        if transition.reclassified {
            tracing::debug!(
                "Door {} state {}: {:.1}%, door state: {}, next action: {}",
                settings.door_id,
                if force { "forced" } else { "changed" },
                percent,
                transition.state.door_state,
                transition.state.next_action
            );

            let snapshot = transition.state.snapshot();
            if let Err(e) = self.store.save(&settings.door_id, &snapshot).await {
                tracing::warn!("Failed to persist state for door {}: {:#}", settings.door_id, e);
            }
        } else {
            tracing::debug!(
                "Door {} state unchanged: {:.1}% (last: {:.1}%)",
                settings.door_id,
                percent,
                transition.state.last_percent.unwrap_or(percent)
            );
        }

        if force || transition.label_changed {
            let event = DoorEvent {
                door_id: settings.door_id.clone(),
                camera: settings.camera.clone(),
                percent,
                state: transition.state.door_state,
                next_action: transition.state.next_action,
                at: transition.state.state_stable_since.unwrap_or_else(Utc::now),
            };
            // No subscribers is fine.
            let _ = self.events.send(event);
        }

        CycleOutcome::Updated(transition)
    }

    /// Acquire a frame and reduce it to a match percentage.
    async fn observe(&self, settings: &MonitorSettings) -> Result<f64, SkipReason> {
        let fetch = self.camera.fetch_frame(&settings.camera);
        let frame = match tokio::time::timeout(settings.fetch_timeout, fetch).await {
            Ok(Ok(frame)) => frame,
            Ok(Err(e)) => {
                tracing::warn!("Camera {} is unavailable: {:#}", settings.camera, e);
                return Err(SkipReason::Unavailable(format!("{:#}", e)));
            }
            Err(_) => {
                tracing::warn!("Timeout getting image from camera {}", settings.camera);
                return Err(SkipReason::Unavailable("timed out".to_string()));
            }
        };

        let frame = prepare_frame(frame, &settings.frame).map_err(|e| {
            tracing::error!("Error preparing frame from camera {}: {}", settings.camera, e);
            SkipReason::BadFrame(e.to_string())
        })?;

        let samples = sample(&frame, settings.point_a, settings.point_b);
        if samples.is_empty() {
            tracing::warn!("No pixels found along the line for door {}", settings.door_id);
            return Err(SkipReason::EmptySample);
        }

        Ok(match_percent(&samples, &settings.color_range))
    }
}

fn log_outcome(door_id: &str, outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::Skipped(SkipReason::Busy) => {
            tracing::debug!("Door {} tick skipped: update already in flight", door_id);
        }
        CycleOutcome::Skipped(reason) => {
            tracing::debug!("Door {} cycle skipped: {:?}", door_id, reason);
        }
        CycleOutcome::Updated(transition) if transition.label_changed => {
            tracing::info!("Door {} is now {}", door_id, transition.state.door_state);
        }
        CycleOutcome::Updated(_) => {}
    }
}
