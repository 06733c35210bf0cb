// Door state engine - hysteresis, classification and polling cadence
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_ACTIVE_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_CHANGE_THRESHOLD: f64 = 10.0;
pub const DEFAULT_CLOSED_POSITION: f64 = 90.0;
pub const DEFAULT_OPEN_POSITION: f64 = 10.0;
pub const DEFAULT_TRANSITION_THRESHOLD: f64 = 5.0;
pub const DEFAULT_STATE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoorState {
    Open,
    Closed,
    Opening,
    Closing,
    PartiallyOpen,
    #[default]
    Unknown,
}

impl DoorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DoorState::Open => "open",
            DoorState::Closed => "closed",
            DoorState::Opening => "opening",
            DoorState::Closing => "closing",
            DoorState::PartiallyOpen => "partially_open",
            DoorState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DoorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action that would fully actuate the door from its inferred position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    Open,
    Close,
    #[default]
    Unknown,
}

impl NextAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            NextAction::Open => "open",
            NextAction::Close => "close",
            NextAction::Unknown => "unknown",
        }
    }
}

impl fmt::Display for NextAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds and cadence for one door. Validated by the caller; the engine
/// applies the comparisons literally whatever the values are.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub change_threshold: f64,
    pub transition_threshold: f64,
    pub open_position: f64,
    pub closed_position: f64,
    pub state_timeout: Duration,
    pub idle_interval: Duration,
    pub active_interval: Duration,
    pub history_capacity: usize,
}

impl EngineConfig {
    pub fn poll_interval(&self, active_mode: bool) -> Duration {
        if active_mode {
            self.active_interval
        } else {
            self.idle_interval
        }
    }

    fn midpoint(&self) -> f64 {
        (self.open_position + self.closed_position) / 2.0
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            change_threshold: DEFAULT_CHANGE_THRESHOLD,
            transition_threshold: DEFAULT_TRANSITION_THRESHOLD,
            open_position: DEFAULT_OPEN_POSITION,
            closed_position: DEFAULT_CLOSED_POSITION,
            state_timeout: DEFAULT_STATE_TIMEOUT,
            idle_interval: DEFAULT_IDLE_INTERVAL,
            active_interval: DEFAULT_ACTIVE_INTERVAL,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// Most recent match percentages, oldest evicted first. Diagnostics only.
#[derive(Debug, Clone, PartialEq)]
pub struct PercentHistory {
    values: VecDeque<f64>,
    capacity: usize,
}

impl PercentHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: f64) {
        self.values.push_back(value);
        while self.values.len() > self.capacity {
            self.values.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    pub door_state: DoorState,
    pub next_action: NextAction,
    pub current_percent: Option<f64>,
    pub last_percent: Option<f64>,
    pub state_stable_since: Option<DateTime<Utc>>,
    pub active_mode: bool,
    pub history: PercentHistory,
}

impl EngineState {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            door_state: DoorState::Unknown,
            next_action: NextAction::Unknown,
            current_percent: None,
            last_percent: None,
            state_stable_since: None,
            active_mode: false,
            history: PercentHistory::new(history_capacity),
        }
    }

    /// Rebuild a state from a persisted snapshot. Classification resumes from
    /// the stored label; no fresh first sample is required.
    pub fn restore(snapshot: EngineSnapshot, history_capacity: usize) -> Self {
        let mut history = PercentHistory::new(history_capacity);
        for value in snapshot.history {
            history.push(value);
        }

        Self {
            door_state: snapshot.door_state,
            next_action: snapshot.next_action,
            current_percent: snapshot.current_percent,
            last_percent: snapshot.last_percent,
            state_stable_since: snapshot.state_stable_since,
            active_mode: snapshot.active_mode,
            history,
        }
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            door_state: self.door_state,
            next_action: self.next_action,
            current_percent: self.current_percent,
            last_percent: self.last_percent,
            state_stable_since: self.state_stable_since,
            active_mode: self.active_mode,
            history: self.history.iter().collect(),
        }
    }

    /// Forget the classification and both percentages so the next update
    /// classifies from scratch. Used after a configuration change.
    pub fn reset(&mut self) {
        self.door_state = DoorState::Unknown;
        self.next_action = NextAction::Unknown;
        self.current_percent = None;
        self.last_percent = None;
    }
}

/// Persistable view of an [`EngineState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub door_state: DoorState,
    pub next_action: NextAction,
    pub current_percent: Option<f64>,
    pub last_percent: Option<f64>,
    pub state_stable_since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub active_mode: bool,
    #[serde(default)]
    pub history: Vec<f64>,
}

/// Result of feeding one percentage into the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: EngineState,
    /// Polling cadence must switch between idle and active.
    pub active_mode_changed: bool,
    /// The door label differs from the one before this update.
    pub label_changed: bool,
    /// Classification ran (and `state_stable_since` was refreshed).
    pub reclassified: bool,
}

/// Advance `state` by one observed percentage.
///
/// `force` re-runs classification regardless of thresholds and timeout.
pub fn update(
    state: &EngineState,
    new_percent: f64,
    now: DateTime<Utc>,
    config: &EngineConfig,
    force: bool,
) -> Transition {
    let mut next = state.clone();

    // Activity detection against the previous observation.
    let mut active_mode_changed = false;
    if let Some(previous) = state.current_percent {
        let delta = (new_percent - previous).abs();
        if delta >= config.change_threshold {
            if !next.active_mode {
                next.active_mode = true;
                active_mode_changed = true;
            }
        } else if next.active_mode {
            next.active_mode = false;
            active_mode_changed = true;
        }
    }

    next.last_percent = next.current_percent;
    next.current_percent = Some(new_percent);
    next.history.push(new_percent);

    let first_sample = state.state_stable_since.is_none() || state.door_state == DoorState::Unknown;
    let reclassify = force
        || first_sample
        || exceeds_transition(new_percent, next.last_percent, config)
        || timed_out(state.state_stable_since, now, config);

    let mut label_changed = false;
    if reclassify {
        let (door_state, next_action) = classify(new_percent, next.last_percent, config);
        label_changed = door_state != state.door_state;
        next.door_state = door_state;
        next.next_action = next_action;
        next.state_stable_since = Some(now);
    }

    Transition {
        state: next,
        active_mode_changed,
        label_changed,
        reclassified: reclassify,
    }
}

fn exceeds_transition(current: f64, last: Option<f64>, config: &EngineConfig) -> bool {
    last.is_some_and(|last| (current - last).abs() >= config.transition_threshold)
}

fn timed_out(since: Option<DateTime<Utc>>, now: DateTime<Utc>, config: &EngineConfig) -> bool {
    match since.map(|since| (now - since).to_std()) {
        Some(Ok(elapsed)) => elapsed > config.state_timeout,
        // Clock went backwards: nothing has elapsed yet.
        Some(Err(_)) => false,
        None => true,
    }
}

/// Map the current and previous percentages onto a door label and the action
/// that would complete it.
///
/// The partially-open next action is a midpoint heuristic with no memory of
/// the previous direction of travel.
pub fn classify(current: f64, last: Option<f64>, config: &EngineConfig) -> (DoorState, NextAction) {
    let change = last.map_or(0.0, |last| current - last);
    let moving = change.abs() >= config.change_threshold;
    let open_limit = config.open_position + config.transition_threshold;
    let closed_limit = config.closed_position - config.transition_threshold;

    if current <= open_limit {
        (DoorState::Open, NextAction::Close)
    } else if current >= closed_limit {
        (DoorState::Closed, NextAction::Open)
    } else if moving {
        if change > 0.0 {
            (DoorState::Closing, NextAction::Open)
        } else {
            (DoorState::Opening, NextAction::Close)
        }
    } else if current > open_limit {
        let action = if current > config.midpoint() {
            NextAction::Open
        } else {
            NextAction::Close
        };
        (DoorState::PartiallyOpen, action)
    } else {
        (DoorState::Unknown, NextAction::Unknown)
    }
}
