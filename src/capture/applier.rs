//! Applying camera settings.
//!
//! Each setting is a separate read-modify-write against the camera so the
//! firmware can validate and react to it before the next one is sent.

use super::session::CaptureSession;
use crate::camera::{CameraControl, ConfigError};
use std::fmt;

/// Drive mode setting name.
pub const DRIVE_MODE: &str = "drivemode";
/// Capture target setting name (internal RAM vs. memory card).
pub const CAPTURE_TARGET: &str = "capturetarget";
/// Image format setting name.
pub const IMAGE_FORMAT: &str = "imageformat";

/// A named camera setting and its target value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSetting {
    /// Camera configuration item, e.g. `drivemode`.
    pub name: String,
    /// Value to write.
    pub value: String,
}

impl ConfigSetting {
    /// Pairs a setting name with its desired value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for ConfigSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Sets `name` to `value` on the camera.
pub fn apply_setting<C: CameraControl + ?Sized>(
    session: &mut CaptureSession<'_, C>,
    name: &str,
    value: &str,
) -> Result<(), ConfigError> {
    let camera = session.camera();
    let mut widget = camera.get_config(name)?;
    let previous = widget.value().to_owned();
    widget.set_value(value)?;
    camera.set_config(&widget)?;

    tracing::debug!(setting = name, from = %previous, to = value, "camera setting applied");
    Ok(())
}

/// Applies `settings` in order, stopping at the first failure.
pub fn apply_settings<C: CameraControl + ?Sized>(
    session: &mut CaptureSession<'_, C>,
    settings: &[ConfigSetting],
) -> Result<(), ConfigError> {
    for setting in settings {
        apply_setting(session, &setting.name, &setting.value).inspect_err(|err| {
            tracing::warn!(%setting, error = %err, "camera rejected setting");
        })?;
    }
    tracing::info!(count = settings.len(), "camera configured");
    Ok(())
}
