use crate::application::door_monitor::MonitorSettings;
use crate::domain::door_state::{
    EngineConfig, DEFAULT_ACTIVE_INTERVAL, DEFAULT_CHANGE_THRESHOLD, DEFAULT_CLOSED_POSITION,
    DEFAULT_HISTORY_CAPACITY, DEFAULT_IDLE_INTERVAL, DEFAULT_OPEN_POSITION,
    DEFAULT_STATE_TIMEOUT, DEFAULT_TRANSITION_THRESHOLD,
};
use crate::domain::error::InputError;
use crate::domain::geometry::{ColorRange, Point, Rgb};
use crate::infrastructure::frame::{CropBox, FrameOptions, Rotation};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/door_status";

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub cameras: Vec<CameraConfig>,
    #[serde(default)]
    pub doors: Vec<DoorConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: u64,
    #[serde(default = "default_startup_delay")]
    pub startup_delay: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            state_dir: default_state_dir(),
            fetch_timeout: default_fetch_timeout(),
            startup_delay: default_startup_delay(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    pub name: String,
    pub url: String,
}

/// One monitored door as written in the config file. Every field added after
/// the first config version carries a default so older files still load.
#[derive(Debug, Deserialize, Clone)]
pub struct DoorConfig {
    pub id: String,
    pub camera: String,
    #[serde(default = "default_point_a")]
    pub point_a: String,
    #[serde(default = "default_point_b")]
    pub point_b: String,
    #[serde(default = "default_min_color")]
    pub min_color: String,
    #[serde(default = "default_max_color")]
    pub max_color: String,
    #[serde(default = "default_idle_interval")]
    pub idle_interval: u64,
    #[serde(default = "default_active_interval")]
    pub active_interval: u64,
    #[serde(default = "default_change_threshold")]
    pub change_threshold: f64,
    #[serde(default = "default_closed_position")]
    pub closed_position: f64,
    #[serde(default = "default_open_position")]
    pub open_position: f64,
    #[serde(default = "default_transition_threshold")]
    pub transition_threshold: f64,
    #[serde(default = "default_state_timeout")]
    pub state_timeout: u64,
    #[serde(default)]
    pub crop: Option<String>,
    #[serde(default)]
    pub rotate_angle: i32,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("state")
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_startup_delay() -> u64 {
    5
}

fn default_point_a() -> String {
    "0,0".to_string()
}

fn default_point_b() -> String {
    "100,100".to_string()
}

fn default_min_color() -> String {
    Rgb::BLACK.to_string()
}

fn default_max_color() -> String {
    Rgb::WHITE.to_string()
}

fn default_idle_interval() -> u64 {
    DEFAULT_IDLE_INTERVAL.as_secs()
}

fn default_active_interval() -> u64 {
    DEFAULT_ACTIVE_INTERVAL.as_secs()
}

fn default_change_threshold() -> f64 {
    DEFAULT_CHANGE_THRESHOLD
}

fn default_closed_position() -> f64 {
    DEFAULT_CLOSED_POSITION
}

fn default_open_position() -> f64 {
    DEFAULT_OPEN_POSITION
}

fn default_transition_threshold() -> f64 {
    DEFAULT_TRANSITION_THRESHOLD
}

fn default_state_timeout() -> u64 {
    DEFAULT_STATE_TIMEOUT.as_secs()
}

/// Load the service config from `path` (extension optional), overlaid with
/// `DOOR_STATUS__SECTION__KEY` environment variables.
pub fn load_service_config(path: &str) -> anyhow::Result<ServiceConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(path))
        .add_source(config::Environment::with_prefix("DOOR_STATUS").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

impl ServiceConfig {
    /// Camera name to snapshot URL.
    pub fn camera_urls(&self) -> HashMap<String, String> {
        self.cameras
            .iter()
            .map(|c| (c.name.clone(), c.url.clone()))
            .collect()
    }

    /// Validate every door, rejecting the whole config on the first error.
    pub fn monitor_settings(&self) -> Result<Vec<MonitorSettings>, InputError> {
        let cameras: HashSet<&str> = self.cameras.iter().map(|c| c.name.as_str()).collect();
        let mut seen = HashSet::new();

        self.doors
            .iter()
            .map(|door| {
                if !seen.insert(door.id.as_str()) {
                    return Err(InputError::setting("id", format!("duplicate door id {:?}", door.id)));
                }
                if !cameras.contains(door.camera.as_str()) {
                    return Err(InputError::setting(
                        "camera",
                        format!("door {:?} references unknown camera {:?}", door.id, door.camera),
                    ));
                }
                door.to_settings(&self.server)
            })
            .collect()
    }

    pub fn door_settings(&self, door_id: &str) -> Result<Option<MonitorSettings>, InputError> {
        Ok(self
            .monitor_settings()?
            .into_iter()
            .find(|s| s.door_id == door_id))
    }
}

impl DoorConfig {
    pub fn to_settings(&self, server: &ServerSettings) -> Result<MonitorSettings, InputError> {
        if self.id.trim().is_empty() {
            return Err(InputError::setting("id", "must not be empty"));
        }
        if self.idle_interval == 0 {
            return Err(InputError::setting("idle_interval", "must be at least 1 second"));
        }
        if self.active_interval == 0 {
            return Err(InputError::setting("active_interval", "must be at least 1 second"));
        }
        for (field, value) in [
            ("change_threshold", self.change_threshold),
            ("transition_threshold", self.transition_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(InputError::setting(field, format!("{} is not a non-negative number", value)));
            }
        }
        for (field, value) in [
            ("open_position", self.open_position),
            ("closed_position", self.closed_position),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(InputError::setting(field, format!("{} is outside 0-100", value)));
            }
        }
        if self.open_position >= self.closed_position {
            return Err(InputError::setting(
                "open_position",
                format!(
                    "{} must be below closed_position {}",
                    self.open_position, self.closed_position
                ),
            ));
        }

        let crop = self
            .crop
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .map(str::parse::<CropBox>)
            .transpose()?;

        Ok(MonitorSettings {
            door_id: self.id.clone(),
            camera: self.camera.clone(),
            point_a: self.point_a.parse::<Point>()?,
            point_b: self.point_b.parse::<Point>()?,
            color_range: ColorRange::new(self.min_color.parse()?, self.max_color.parse()?),
            frame: FrameOptions {
                crop,
                rotation: Rotation::try_from(self.rotate_angle)?,
            },
            engine: EngineConfig {
                change_threshold: self.change_threshold,
                transition_threshold: self.transition_threshold,
                open_position: self.open_position,
                closed_position: self.closed_position,
                state_timeout: Duration::from_secs(self.state_timeout),
                idle_interval: Duration::from_secs(self.idle_interval),
                active_interval: Duration::from_secs(self.active_interval),
                history_capacity: DEFAULT_HISTORY_CAPACITY,
            },
            fetch_timeout: Duration::from_secs(server.fetch_timeout),
            startup_delay: Duration::from_secs(server.startup_delay),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> ServiceConfig {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    const FULL: &str = r#"
        [server]
        bind = "127.0.0.1:9000"
        state_dir = "/var/lib/door-status"

        [[cameras]]
        name = "driveway"
        url = "http://cam.local/snapshot.jpg"

        [[doors]]
        id = "garage"
        camera = "driveway"
        point_a = "10,200"
        point_b = "310,200"
        min_color = "180,180,180"
        max_color = "255,255,255"
        idle_interval = 30
        active_interval = 2
        change_threshold = 8
        closed_position = 85
        open_position = 12
        transition_threshold = 4
        state_timeout = 20
        crop = "0,100,640,400"
        rotate_angle = 180
    "#;

    #[test]
    fn test_full_door_config() {
        let config = parse(FULL);
        let settings = config.monitor_settings().unwrap();

        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(settings.len(), 1);

        let door = &settings[0];
        assert_eq!(door.point_a, Point::new(10, 200));
        assert_eq!(door.color_range.min, Rgb::new(180, 180, 180));
        assert_eq!(door.engine.idle_interval, Duration::from_secs(30));
        assert_eq!(door.engine.change_threshold, 8.0);
        assert_eq!(door.engine.state_timeout, Duration::from_secs(20));
        assert_eq!(door.frame.rotation, Rotation::Cw180);
        assert_eq!(
            door.frame.crop,
            Some(CropBox { left: 0, top: 100, right: 640, bottom: 400 })
        );
        assert_eq!(door.fetch_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_minimal_door_gets_defaults() {
        let config = parse(
            r#"
            [[cameras]]
            name = "porch"
            url = "http://porch/snap.jpg"

            [[doors]]
            id = "front"
            camera = "porch"
            "#,
        );
        let door = config.door_settings("front").unwrap().unwrap();

        assert_eq!(config.server.state_dir, PathBuf::from("state"));
        assert_eq!(door.point_a, Point::new(0, 0));
        assert_eq!(door.point_b, Point::new(100, 100));
        assert_eq!(door.color_range, ColorRange::default());
        assert_eq!(door.engine, EngineConfig::default());
        assert_eq!(door.frame, FrameOptions::default());
        assert_eq!(door.startup_delay, Duration::from_secs(5));
        assert!(config.door_settings("back").unwrap().is_none());
    }

    fn door() -> DoorConfig {
        let config = parse(FULL);
        config.doors[0].clone()
    }

    #[test]
    fn test_rejects_bad_strings() {
        let server = ServerSettings::default();

        let mut bad = door();
        bad.point_a = "10;200".to_string();
        assert!(matches!(bad.to_settings(&server), Err(InputError::InvalidCoordinates(_))));

        let mut bad = door();
        bad.max_color = "255,255".to_string();
        assert!(matches!(bad.to_settings(&server), Err(InputError::InvalidColor(_))));

        let mut bad = door();
        bad.crop = Some("0,0,0,0".to_string());
        assert!(matches!(bad.to_settings(&server), Err(InputError::InvalidCrop(_))));

        let mut bad = door();
        bad.rotate_angle = 30;
        assert_eq!(bad.to_settings(&server), Err(InputError::InvalidRotation(30)));
    }

    #[test]
    fn test_rejects_bad_numbers() {
        let server = ServerSettings::default();

        let mut bad = door();
        bad.active_interval = 0;
        assert!(matches!(
            bad.to_settings(&server),
            Err(InputError::InvalidSetting { field: "active_interval", .. })
        ));

        let mut bad = door();
        bad.open_position = 90.0;
        bad.closed_position = 10.0;
        assert!(matches!(
            bad.to_settings(&server),
            Err(InputError::InvalidSetting { field: "open_position", .. })
        ));

        let mut bad = door();
        bad.closed_position = 120.0;
        assert!(matches!(
            bad.to_settings(&server),
            Err(InputError::InvalidSetting { field: "closed_position", .. })
        ));

        let mut bad = door();
        bad.transition_threshold = -1.0;
        assert!(bad.to_settings(&server).is_err());
    }

    #[test]
    fn test_rejects_unknown_camera_and_duplicates() {
        let mut config = parse(FULL);
        config.doors.push(door());
        assert!(matches!(
            config.monitor_settings(),
            Err(InputError::InvalidSetting { field: "id", .. })
        ));

        let mut config = parse(FULL);
        config.doors[0].camera = "attic".to_string();
        assert!(matches!(
            config.monitor_settings(),
            Err(InputError::InvalidSetting { field: "camera", .. })
        ));
    }

    #[test]
    fn test_empty_crop_means_no_crop() {
        let mut cfg = door();
        cfg.crop = Some(String::new());

        let settings = cfg.to_settings(&ServerSettings::default()).unwrap();
        assert_eq!(settings.frame.crop, None);
    }
}
