//! Tethered Capture Library
//!
//! Coordinates a single photographic capture session on a tethered
//! camera: configures capture parameters, fires the shutter, and collects
//! the JPEG preview and RAW original the camera delivers asynchronously
//! over its event channel.
//!
//! # Architecture
//!
//! ```text
//! session open → configure → trigger (arm, release) → collect events → session close
//!                                                          ↓
//!                                          destination dir (+ ledger, previews)
//! ```
//!
//! - [`camera`]: the driver seam ([`CameraControl`]) and its backends
//! - [`capture`]: the session lifecycle, configuration applier, trigger,
//!   and the event-collecting state machine
//! - [`workflow`]: prefixing, previews, and the barcode ledger around each capture
//! - [`metrics`]: Prometheus counters for capture sessions
//!
//! # Design Principles
//!
//! - **Always release the camera**: sessions close on every exit path
//! - **Bounded waits**: every event wait has a timeout; collection never hangs
//! - **No silent loss**: a failed write is an error that names what was written
//! - **No automatic retry**: a failed session is reported, the caller decides
//!
//! # Example
//!
//! ```no_run
//! use tether_capture::{
//!     camera::{DriverOptions, ScriptedCamera},
//!     capture::{capture_photo, with_session, CaptureError, CaptureProfile, Destination},
//! };
//!
//! let mut camera = ScriptedCamera::simulated(DriverOptions::default());
//! let profile = CaptureProfile::default();
//! let destination = Destination::new("output");
//!
//! let result = with_session(&mut camera, |session| {
//!     capture_photo(session, &profile, &destination, &profile.collect_options())
//! })?;
//!
//! for name in result.names() {
//!     println!("captured {name}");
//! }
//! # Ok::<(), CaptureError>(())
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod camera;
pub mod capture;
pub mod metrics;
pub mod workflow;

// Re-export commonly used types at crate root
pub use camera::{CameraControl, CameraEvent, CancelToken, DriverOptions, ScriptedCamera};
pub use capture::{
    capture_photo, with_session, CaptureError, CaptureProfile, CaptureResult, CaptureSession,
    Destination, FileConfig,
};
pub use metrics::CaptureMetrics;
pub use workflow::{Interrupt, Workflow, WorkflowError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
