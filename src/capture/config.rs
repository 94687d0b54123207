//! Capture configuration.
//!
//! The camera-side settings are applied in a fixed order (drive mode,
//! capture target, image format): later settings can depend on earlier
//! ones, and some firmwares refuse out-of-order combinations.

use super::applier::{ConfigSetting, CAPTURE_TARGET, DRIVE_MODE, IMAGE_FORMAT};
use super::collector::{CollectOptions, EVENT_TIMEOUT, EXPECTED_FILES};
use super::trigger::TriggerSequence;
use crate::camera::{DriverOptions, ErrorSeverity};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest accepted wait for a single camera event.
pub const MAX_EVENT_TIMEOUT_SECS: u64 = 3600;

/// Camera settings and collection bounds for one exposure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureProfile {
    /// Drive mode, e.g. `Single`.
    pub drive_mode: String,
    /// Where the body stores the exposure, e.g. `Internal RAM`.
    pub capture_target: String,
    /// Output format, e.g. `RAW + Large Fine JPEG`.
    pub image_format: String,
    /// Bound on each wait for a camera event, in seconds.
    pub event_timeout_secs: u64,
    /// Files to collect before stopping.
    pub expected_files: usize,
    /// Shutter trigger sequence.
    pub trigger: TriggerSequence,
}

impl Default for CaptureProfile {
    fn default() -> Self {
        Self {
            drive_mode: "Single".to_owned(),
            capture_target: "Internal RAM".to_owned(),
            image_format: "RAW + Large Fine JPEG".to_owned(),
            event_timeout_secs: EVENT_TIMEOUT.as_secs(),
            expected_files: EXPECTED_FILES,
            trigger: TriggerSequence::default(),
        }
    }
}

impl CaptureProfile {
    /// Settings in application order.
    pub fn settings(&self) -> [ConfigSetting; 3] {
        [
            ConfigSetting::new(DRIVE_MODE, &self.drive_mode),
            ConfigSetting::new(CAPTURE_TARGET, &self.capture_target),
            ConfigSetting::new(IMAGE_FORMAT, &self.image_format),
        ]
    }

    /// Bound on each wait, as a `Duration`.
    pub fn event_timeout(&self) -> Duration {
        Duration::from_secs(self.event_timeout_secs)
    }

    /// Collection options derived from this profile.
    pub fn collect_options(&self) -> CollectOptions {
        CollectOptions {
            event_timeout: self.event_timeout(),
            expected_files: self.expected_files,
            cancel: None,
        }
    }

    /// Validates the profile.
    pub fn validate(&self) -> Result<(), SettingsError> {
        for setting in self.settings() {
            if setting.value.trim().is_empty() {
                return Err(SettingsError::EmptyValue(setting.name));
            }
        }
        for (name, value) in [
            ("trigger.control", &self.trigger.control),
            ("trigger.arm", &self.trigger.arm),
            ("trigger.release", &self.trigger.release),
        ] {
            if value.trim().is_empty() {
                return Err(SettingsError::EmptyValue(name.to_owned()));
            }
        }
        if self.event_timeout_secs == 0 || self.event_timeout_secs > MAX_EVENT_TIMEOUT_SECS {
            return Err(SettingsError::InvalidTimeout);
        }
        if self.expected_files == 0 {
            return Err(SettingsError::InvalidExpectedFiles);
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    /// A setting or trigger value is blank.
    #[error("setting '{0}' must not be empty")]
    EmptyValue(String),
    /// The event timeout is zero or too long.
    #[error("event timeout must be between 1 and {MAX_EVENT_TIMEOUT_SECS} seconds")]
    InvalidTimeout,
    /// The expected file count is zero.
    #[error("expected file count must be at least one")]
    InvalidExpectedFiles,
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Which camera driver to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// In-process simulated camera.
    #[default]
    Simulated,
    /// libgphoto2 (requires the `gphoto` feature).
    Gphoto,
}

/// Driver configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Camera driver to use.
    pub backend: Backend,
    /// Whether generic driver errors are suppressed (`warn`) or returned.
    pub error_severity: ErrorSeverity,
}

impl DriverConfig {
    /// Options handed to the backend at construction.
    pub fn options(&self) -> DriverOptions {
        DriverOptions {
            error_severity: self.error_severity,
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory captured files are written to.
    pub directory: PathBuf,
    /// Ledger file name, relative to `directory`.
    pub ledger_file: PathBuf,
    /// Open JPEG outputs in a viewer after each capture.
    pub preview: bool,
    /// Viewer command; receives the file path as its only argument.
    pub preview_command: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            ledger_file: PathBuf::from("barcodes.txt"),
            preview: true,
            preview_command: default_viewer().to_owned(),
        }
    }
}

impl OutputConfig {
    /// Full path of the ledger file.
    pub fn ledger_path(&self) -> PathBuf {
        self.directory.join(&self.ledger_file)
    }
}

fn default_viewer() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    }
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Camera settings and collection bounds.
    #[serde(default)]
    pub capture: CaptureProfile,
    /// Where files, the ledger and previews go.
    #[serde(default)]
    pub output: OutputConfig,
    /// Backend selection and driver behaviour.
    #[serde(default)]
    pub driver: DriverConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SettingsError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| SettingsError::ParseError(e.to_string()))?;
        config.capture.validate()?;
        Ok(config)
    }
}
