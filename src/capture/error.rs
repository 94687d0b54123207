//! Capture session errors.

use crate::camera::{ConfigError, DeviceError};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that end a capture session.
///
/// None of these are retried; the caller decides whether to start a new
/// session.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The camera could not be opened or stopped responding.
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// A setting or the trigger could not be written.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A file announced by the camera could not be downloaded.
    #[error("failed to download {file} from the camera")]
    Fetch {
        /// Camera-side path of the file.
        file: String,
        /// Files already persisted in this session.
        written: Vec<String>,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A downloaded file could not be written.
    #[error("failed to write {}", .path.display())]
    Persist {
        /// Destination path that failed.
        path: PathBuf,
        /// Files already persisted in this session.
        written: Vec<String>,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Collection was cancelled before it finished.
    #[error("capture interrupted after {} file(s)", .written.len())]
    Interrupted {
        /// Files already persisted in this session.
        written: Vec<String>,
    },
}

impl CaptureError {
    /// Returns true if the camera could not be reached at all.
    pub fn is_device(&self) -> bool {
        matches!(self, Self::Device(_))
    }

    /// Files that were written to the destination before the failure.
    pub fn written(&self) -> &[String] {
        match self {
            Self::Fetch { written, .. }
            | Self::Persist { written, .. }
            | Self::Interrupted { written } => written,
            Self::Device(_) | Self::Config(_) => &[],
        }
    }
}
