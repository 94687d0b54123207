//! Metrics collection and registry.

use crate::capture::{CaptureError, CaptureResult, DoneReason};
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registration or encoding failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
    /// The metrics file could not be written.
    #[error("failed to write metrics to {}", .path.display())]
    Write {
        /// Target file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Prometheus metrics registry for capture sessions.
///
/// Clones share the same counters.
#[derive(Clone)]
pub struct CaptureMetrics {
    registry: Registry,

    sessions_total: IntCounter,
    sessions_failed_total: IntCounter,
    files_total: IntCounter,
    bytes_total: IntCounter,
    timeouts_total: IntCounter,
    last_session_files: IntGauge,
}

impl CaptureMetrics {
    /// Creates a new registry with all capture metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let sessions_total = IntCounter::new(
            "tether_capture_sessions_total",
            "Capture sessions attempted",
        )?;
        let sessions_failed_total = IntCounter::new(
            "tether_capture_sessions_failed_total",
            "Capture sessions that ended in an error",
        )?;
        let files_total = IntCounter::new(
            "tether_capture_files_total",
            "Files fetched from the camera and written",
        )?;
        let bytes_total = IntCounter::new(
            "tether_capture_bytes_total",
            "Bytes written for captured files",
        )?;
        let timeouts_total = IntCounter::new(
            "tether_capture_timeouts_total",
            "Collections that ended because the camera went quiet",
        )?;
        let last_session_files = IntGauge::new(
            "tether_capture_last_session_files",
            "Files collected by the most recent session",
        )?;

        registry.register(Box::new(sessions_total.clone()))?;
        registry.register(Box::new(sessions_failed_total.clone()))?;
        registry.register(Box::new(files_total.clone()))?;
        registry.register(Box::new(bytes_total.clone()))?;
        registry.register(Box::new(timeouts_total.clone()))?;
        registry.register(Box::new(last_session_files.clone()))?;

        Ok(Self {
            registry,
            sessions_total,
            sessions_failed_total,
            files_total,
            bytes_total,
            timeouts_total,
            last_session_files,
        })
    }

    /// Records a completed session.
    pub fn record_result(&self, result: &CaptureResult) {
        self.sessions_total.inc();
        self.files_total.inc_by(result.len() as u64);
        self.bytes_total.inc_by(result.total_bytes());
        if result.reason == DoneReason::Timeout {
            self.timeouts_total.inc();
        }
        self.last_session_files.set(result.len() as i64);
    }

    /// Records a failed session. Files written before the failure still count.
    pub fn record_failure(&self, err: &CaptureError) {
        self.sessions_total.inc();
        self.sessions_failed_total.inc();
        let written = err.written().len();
        self.files_total.inc_by(written as u64);
        self.last_session_files.set(written as i64);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Writes the text encoding to `path`, replacing any previous dump.
    pub fn write_to(&self, path: &Path) -> Result<(), MetricsError> {
        let text = self.encode()?;
        fs::write(path, text).map_err(|source| MetricsError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
