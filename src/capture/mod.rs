//! Capture sessions: configure, trigger, collect.
//!
//! Everything here runs on one thread, strictly in sequence. The only
//! suspension point is the bounded event wait inside [`collect`].

mod applier;
mod collector;
mod config;
mod error;
mod output;
mod session;
mod trigger;

pub use applier::{apply_setting, apply_settings, ConfigSetting, CAPTURE_TARGET, DRIVE_MODE, IMAGE_FORMAT};
pub use collector::{
    collect, Action, CaptureResult, CollectOptions, CollectorState, DoneReason, EventCollector,
    EVENT_TIMEOUT, EXPECTED_FILES,
};
pub use config::{
    Backend, CaptureProfile, DriverConfig, FileConfig, OutputConfig, SettingsError,
    MAX_EVENT_TIMEOUT_SECS,
};
pub use error::CaptureError;
pub use output::{local_name, CapturedFile, Destination, FileKind};
pub use session::{with_session, CaptureSession};
pub use trigger::{trigger, TriggerSequence};

use crate::camera::CameraControl;

/// Runs one exposure inside an open session.
///
/// Applies the profile's settings, fires the shutter, then collects the
/// delivered files into `destination`. A configuration or trigger failure
/// aborts before anything is collected.
pub fn capture_photo<C: CameraControl + ?Sized>(
    session: &mut CaptureSession<'_, C>,
    profile: &CaptureProfile,
    destination: &Destination,
    options: &CollectOptions,
) -> Result<CaptureResult, CaptureError> {
    apply_settings(session, &profile.settings())?;
    trigger(session, &profile.trigger)?;
    collect(session, destination, options)
}
