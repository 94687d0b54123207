//! Prometheus metrics for capture sessions.
//!
//! # Metrics Exposed
//!
//! - `tether_capture_sessions_total` - Capture sessions attempted
//! - `tether_capture_sessions_failed_total` - Sessions that ended in an error
//! - `tether_capture_files_total` - Files fetched and written
//! - `tether_capture_bytes_total` - Bytes written
//! - `tether_capture_timeouts_total` - Collections ended by a quiet camera
//! - `tether_capture_last_session_files` - Files from the most recent session
//!
//! The binary writes the text exposition to `--metrics-file` on exit.

mod collector;

pub use collector::{CaptureMetrics, MetricsError};
