//! Camera control abstraction.
//!
//! A trait-based seam over the camera driver, so the capture core can run
//! against real tethered hardware or the in-process scripted camera used
//! in tests and simulation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while opening or talking to the camera device.
#[derive(Debug, Clone, Error)]
pub enum DeviceError {
    /// No supported camera is connected.
    #[error("no camera detected")]
    NotFound,
    /// Another process (often a desktop auto-mounter) holds the USB interface.
    #[error("camera is claimed by another process: {0}")]
    Claimed(String),
    /// The driver found a camera but could not set it up.
    #[error("failed to initialize camera: {0}")]
    InitFailed(String),
    /// The connection failed mid-operation.
    #[error("camera transport error: {0}")]
    Transport(String),
    /// The camera was used before `open` or after `close`.
    #[error("camera is not open")]
    NotOpen,
}

/// Errors raised while reading or writing a camera configuration item.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// The camera has no configuration item of this name.
    #[error("unknown camera setting '{0}'")]
    UnknownSetting(String),
    /// The value is not among the choices the camera enumerates.
    #[error("'{value}' is not a legal value for '{setting}' (choices: {})", .choices.join(", "))]
    InvalidValue {
        /// Configuration item name.
        setting: String,
        /// Value that was refused.
        value: String,
        /// Values the camera accepts.
        choices: Vec<String>,
    },
    /// The item can be read but not written.
    #[error("camera setting '{0}' is read-only")]
    ReadOnly(String),
    /// The camera refused the write.
    #[error("camera rejected '{setting}': {reason}")]
    Rejected {
        /// Configuration item name.
        setting: String,
        /// Driver's explanation.
        reason: String,
    },
}

/// Location of a file on the camera's storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CameraFilePath {
    /// Folder on the camera, e.g. `/store_00020001/DCIM/100CANON`.
    pub folder: String,
    /// File name within the folder, e.g. `IMG_0001.JPG`.
    pub name: String,
}

impl CameraFilePath {
    /// Builds a path from a camera folder and file name.
    pub fn new(folder: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for CameraFilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.folder.trim_end_matches('/'), self.name)
    }
}

/// An event delivered by the camera transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraEvent {
    /// A new file is available on the camera.
    FileAdded(CameraFilePath),
    /// The camera finished the capture; no more files will follow.
    CaptureComplete,
    /// No activity within the wait window.
    Timeout,
    /// Any other firmware event (folder added, property changed, ...).
    Other(String),
}

/// A single camera-side configuration item.
///
/// Obtained with [`CameraControl::get_config`], modified locally with
/// [`ConfigWidget::set_value`], then written back with
/// [`CameraControl::set_config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWidget {
    name: String,
    value: String,
    choices: Vec<String>,
    read_only: bool,
}

impl ConfigWidget {
    /// A widget restricted to an enumerated set of choices.
    pub fn radio(name: impl Into<String>, value: impl Into<String>, choices: &[&str]) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            choices: choices.iter().map(|c| (*c).to_owned()).collect(),
            read_only: false,
        }
    }

    /// A free-form text widget.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            choices: Vec::new(),
            read_only: false,
        }
    }

    /// Marks the widget read-only.
    pub fn into_read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Configuration item name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value, including any local modification.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Legal values; empty for free-form widgets.
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    /// True if the camera refuses writes to this item.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Sets the value locally. The camera is not touched until the widget
    /// is written back.
    pub fn set_value(&mut self, value: &str) -> Result<(), ConfigError> {
        if self.read_only {
            return Err(ConfigError::ReadOnly(self.name.clone()));
        }
        if !self.choices.is_empty() && !self.choices.iter().any(|c| c == value) {
            return Err(ConfigError::InvalidValue {
                setting: self.name.clone(),
                value: value.to_owned(),
                choices: self.choices.clone(),
            });
        }
        self.value = value.to_owned();
        Ok(())
    }
}

/// How generic driver errors are handled.
///
/// Only errors the driver cannot attribute to the request itself are
/// affected: a write the camera refused without a reason
/// ([`ConfigError::Rejected`]) or a transport hiccup while waiting for an
/// event ([`DeviceError::Transport`]). Unknown settings, illegal values and
/// failed opens always fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Log generic driver errors as warnings and carry on as if the call
    /// succeeded. EOS bodies often report a generic error on
    /// `eosremoterelease` writes that did take effect.
    Warn,
    /// Log generic driver errors as errors and return them.
    #[default]
    Error,
}

impl ErrorSeverity {
    /// Logs a driver error at this severity.
    pub fn report(self, operation: &str, err: &dyn fmt::Display) {
        match self {
            Self::Warn => tracing::warn!(operation, error = %err, "camera driver error"),
            Self::Error => tracing::error!(operation, error = %err, "camera driver error"),
        }
    }

    /// Reports a generic driver error, then either swallows it (`Warn`) or
    /// hands it back (`Error`).
    pub fn tolerate<E: fmt::Display>(self, operation: &str, err: E) -> Result<(), E> {
        self.report(operation, &err);
        match self {
            Self::Warn => Ok(()),
            Self::Error => Err(err),
        }
    }
}

/// Options handed to a camera backend at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverOptions {
    /// Whether generic driver errors are suppressed or returned.
    #[serde(default)]
    pub error_severity: ErrorSeverity,
}

/// Shared cancellation flag.
///
/// Set from an interrupt handler; observed by the collector between
/// events and by backends that can abort a blocking wait.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True once `cancel` has been called and not reset.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clears a previous request.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Trait for camera backends.
///
/// An implementor is the connection handle itself: it is owned by exactly
/// one session at a time and never shared across threads.
pub trait CameraControl {
    /// Detects and initializes the camera.
    fn open(&mut self) -> Result<(), DeviceError>;

    /// Releases the camera. Closing an already-closed camera is a no-op.
    fn close(&mut self);

    /// Checks if the camera is currently open.
    fn is_open(&self) -> bool;

    /// Reads the current configuration item `name`.
    fn get_config(&mut self, name: &str) -> Result<ConfigWidget, ConfigError>;

    /// Writes a configuration item back to the camera.
    fn set_config(&mut self, widget: &ConfigWidget) -> Result<(), ConfigError>;

    /// Blocks for at most `timeout` waiting for the next event.
    fn wait_for_event(&mut self, timeout: Duration) -> Result<CameraEvent, DeviceError>;

    /// Downloads the content of a file from the camera.
    fn fetch_file(&mut self, path: &CameraFilePath) -> io::Result<Vec<u8>>;
}

impl<C: CameraControl + ?Sized> CameraControl for Box<C> {
    fn open(&mut self) -> Result<(), DeviceError> {
        (**self).open()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn get_config(&mut self, name: &str) -> Result<ConfigWidget, ConfigError> {
        (**self).get_config(name)
    }

    fn set_config(&mut self, widget: &ConfigWidget) -> Result<(), ConfigError> {
        (**self).set_config(widget)
    }

    fn wait_for_event(&mut self, timeout: Duration) -> Result<CameraEvent, DeviceError> {
        (**self).wait_for_event(timeout)
    }

    fn fetch_file(&mut self, path: &CameraFilePath) -> io::Result<Vec<u8>> {
        (**self).fetch_file(path)
    }
}
