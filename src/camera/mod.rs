//! Camera driver seam.
//!
//! The physical camera and its event transport live outside this crate.
//! This module defines the interface the capture core drives, plus the
//! backends that implement it: a scripted in-process camera, and a
//! libgphoto2 backend behind the `gphoto` feature.

mod control;
#[cfg(feature = "gphoto")]
mod gphoto;
mod scripted;

pub use control::{
    CameraControl, CameraEvent, CameraFilePath, CancelToken, ConfigError, ConfigWidget,
    DeviceError, DriverOptions, ErrorSeverity,
};
#[cfg(feature = "gphoto")]
pub use gphoto::GphotoCamera;
pub use scripted::{ScriptedCamera, SIMULATED_FOLDER};
