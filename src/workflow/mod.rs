//! The interactive capture workflow around the core.
//!
//! Each iteration captures one exposure, renames its files with the
//! operator's prefix, opens JPEG previews, and records the prefix in the
//! ledger.

mod interrupt;
mod ledger;
mod naming;
mod preview;

pub use interrupt::{BusyGuard, Interrupt, SignalAction};
pub use ledger::Ledger;
pub use naming::{apply_prefix, Prefix};
pub use preview::PreviewOpener;

use crate::camera::{CameraControl, CancelToken};
use crate::capture::{
    capture_photo, with_session, CaptureError, CaptureProfile, CaptureResult, Destination,
    OutputConfig,
};
use crate::metrics::CaptureMetrics;
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from one workflow iteration.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The operator's prefix is empty or not a plain file-name part.
    #[error("invalid prefix {0:?}")]
    InvalidPrefix(String),

    /// The capture session failed.
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// A captured file could not be renamed.
    #[error("failed to rename {} to {}", .from.display(), .to.display())]
    Rename {
        /// Name as written by the capture.
        from: PathBuf,
        /// Prefixed name.
        to: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The ledger could not be read or written.
    #[error("failed to update ledger {}", .path.display())]
    Ledger {
        /// Ledger file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The output directory could not be created.
    #[error("failed to prepare output directory {}", .path.display())]
    Prepare {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl WorkflowError {
    /// True if the camera itself is unusable; the process should stop.
    pub fn is_device(&self) -> bool {
        matches!(self, Self::Capture(err) if err.is_device())
    }
}

/// Outcome of one iteration.
#[derive(Debug, Clone)]
pub struct IterationReport {
    /// Validated prefix.
    pub prefix: Prefix,
    /// What the camera delivered.
    pub capture: CaptureResult,
    /// Final paths of the captured files, after prefixing.
    pub renamed: Vec<PathBuf>,
    /// JPEG previews handed to the viewer.
    pub previews_opened: usize,
    /// False if the prefix was already in the ledger.
    pub new_prefix: bool,
}

/// Runs capture iterations against a camera.
pub struct Workflow {
    profile: CaptureProfile,
    destination: Destination,
    ledger: Ledger,
    preview: PreviewOpener,
    cancel: Option<CancelToken>,
    metrics: Option<CaptureMetrics>,
}

impl Workflow {
    /// Builds a workflow writing into `output`.
    pub fn new(profile: CaptureProfile, output: &OutputConfig) -> Self {
        let preview = if output.preview {
            PreviewOpener::new(&output.preview_command)
        } else {
            PreviewOpener::disabled()
        };
        Self {
            profile,
            destination: Destination::new(&output.directory),
            ledger: Ledger::new(output.ledger_path()),
            preview,
            cancel: None,
            metrics: None,
        }
    }

    /// Stops collection early once `token` is cancelled.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Records every session in `metrics`.
    pub fn with_metrics(mut self, metrics: CaptureMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Replaces the preview opener.
    pub fn with_preview(mut self, preview: PreviewOpener) -> Self {
        self.preview = preview;
        self
    }

    /// Metrics, if attached.
    pub fn metrics(&self) -> Option<&CaptureMetrics> {
        self.metrics.as_ref()
    }

    /// The prefix ledger.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Creates the output directory and ledger file if missing.
    pub fn prepare(&self) -> Result<(), WorkflowError> {
        let dir = self.destination.dir();
        fs::create_dir_all(dir).map_err(|source| WorkflowError::Prepare {
            path: dir.to_path_buf(),
            source,
        })?;
        self.ledger
            .ensure_exists()
            .map_err(|source| WorkflowError::Ledger {
                path: self.ledger.path().to_path_buf(),
                source,
            })
    }

    /// Captures one exposure and files it under `prefix`.
    ///
    /// The camera is opened and closed within this call, whatever the
    /// outcome.
    pub fn run_once<C: CameraControl + ?Sized>(
        &self,
        camera: &mut C,
        prefix: &str,
    ) -> Result<IterationReport, WorkflowError> {
        let prefix = Prefix::parse(prefix)?;

        let mut options = self.profile.collect_options();
        options.cancel = self.cancel.clone();

        let outcome = with_session(camera, |session| {
            capture_photo(session, &self.profile, &self.destination, &options)
        });
        if let Some(metrics) = &self.metrics {
            match &outcome {
                Ok(result) => metrics.record_result(result),
                Err(err) => metrics.record_failure(err),
            }
        }
        let capture = outcome?;

        let renamed = apply_prefix(&prefix, &capture.files)?;
        let previews_opened = renamed.iter().filter(|p| self.preview.open(p)).count();

        let new_prefix =
            self.ledger
                .record(prefix.as_str())
                .map_err(|source| WorkflowError::Ledger {
                    path: self.ledger.path().to_path_buf(),
                    source,
                })?;

        tracing::info!(
            %prefix,
            files = renamed.len(),
            new_prefix,
            "capture filed"
        );
        Ok(IterationReport {
            prefix,
            capture,
            renamed,
            previews_opened,
            new_prefix,
        })
    }
}
