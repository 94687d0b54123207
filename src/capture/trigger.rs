//! Two-phase shutter trigger.

use super::applier::apply_setting;
use super::session::CaptureSession;
use crate::camera::{CameraControl, ConfigError};
use serde::{Deserialize, Serialize};

/// Remote-release control and the values that arm and fire it.
///
/// The same control serves both phases; firing without arming first is
/// unreliable on most bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerSequence {
    /// Remote-release control name.
    pub control: String,
    /// Value that prepares the mirror and shutter.
    pub arm: String,
    /// Value that completes the exposure.
    pub release: String,
}

impl Default for TriggerSequence {
    fn default() -> Self {
        Self {
            control: "eosremoterelease".to_owned(),
            arm: "Immediate".to_owned(),
            release: "Release Full".to_owned(),
        }
    }
}

/// Arms the shutter, then releases it. Release is never attempted when
/// arming fails.
pub fn trigger<C: CameraControl + ?Sized>(
    session: &mut CaptureSession<'_, C>,
    sequence: &TriggerSequence,
) -> Result<(), ConfigError> {
    apply_setting(session, &sequence.control, &sequence.arm)?;
    apply_setting(session, &sequence.control, &sequence.release)?;
    tracing::info!(control = %sequence.control, "shutter released");
    Ok(())
}
