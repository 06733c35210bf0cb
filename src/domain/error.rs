// Configuration input errors
use thiserror::Error;

/// Rejected configuration input. Raised while building a monitor, never by
/// the engine itself.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("invalid coordinates format: {0:?} (expected \"x,y\")")]
    InvalidCoordinates(String),

    #[error("invalid color format: {0:?} (expected \"R,G,B\" with channels 0-255)")]
    InvalidColor(String),

    #[error("invalid crop format: {0:?} (expected \"left,top,right,bottom\")")]
    InvalidCrop(String),

    #[error("unsupported rotation: {0} degrees (expected 0, 90, 180 or 270)")]
    InvalidRotation(i32),

    #[error("invalid setting {field}: {reason}")]
    InvalidSetting { field: &'static str, reason: String },
}

impl InputError {
    pub fn setting(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            field,
            reason: reason.into(),
        }
    }
}
