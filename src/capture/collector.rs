//! Event-driven file collection.
//!
//! After the shutter fires, the camera announces each output file with a
//! `FileAdded` event, in no particular order, and may signal completion or
//! go quiet at any point. [`EventCollector`] is the state machine that
//! decides what each event means; [`collect`] drives it against a live
//! session, downloading and persisting files as they are announced.
//!
//! ```text
//! WAITING --FileAdded--------------> WAITING  (fetch + persist; DONE at expected count)
//! WAITING --CaptureComplete-------> DONE
//! WAITING --Timeout---------------> DONE
//! WAITING --other-----------------> WAITING  (ignored)
//! ```

use super::error::CaptureError;
use super::output::{local_name, CapturedFile, Destination, FileKind};
use super::session::CaptureSession;
use crate::camera::{CameraControl, CameraEvent, CameraFilePath, CancelToken};
use chrono::{DateTime, Local};
use std::time::Duration;

/// Bound on each individual wait for a camera event.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Files expected per exposure: one JPEG and one RAW.
pub const EXPECTED_FILES: usize = 2;

/// Why collection stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneReason {
    /// The expected number of files arrived.
    ExpectedFiles,
    /// The camera reported the capture complete.
    CaptureComplete,
    /// No event arrived within the wait window.
    Timeout,
}

/// Collector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    /// Waiting for the camera.
    Waiting,
    /// Collection has ended.
    Done(DoneReason),
}

/// What the driver must do in response to an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Download the file and hand it back via [`EventCollector::record`].
    Fetch(CameraFilePath),
    /// Nothing to do; keep waiting.
    Ignore,
    /// Collection is over.
    Finish(DoneReason),
}

/// The capture-session state machine.
#[derive(Debug)]
pub struct EventCollector {
    state: CollectorState,
    expected_files: usize,
    files: Vec<CapturedFile>,
}

impl EventCollector {
    /// Creates a collector that stops after `expected_files` files.
    pub fn new(expected_files: usize) -> Self {
        Self {
            state: CollectorState::Waiting,
            expected_files: expected_files.max(1),
            files: Vec::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> CollectorState {
        self.state
    }

    /// True once no further events will be consumed.
    pub fn is_done(&self) -> bool {
        matches!(self.state, CollectorState::Done(_))
    }

    /// Feeds one event to the state machine.
    ///
    /// Once done, every further event is answered with `Finish`.
    pub fn advance(&mut self, event: &CameraEvent) -> Action {
        if let CollectorState::Done(reason) = self.state {
            return Action::Finish(reason);
        }

        match event {
            CameraEvent::FileAdded(path) => Action::Fetch(path.clone()),
            CameraEvent::CaptureComplete => self.finish(DoneReason::CaptureComplete),
            CameraEvent::Timeout => self.finish(DoneReason::Timeout),
            CameraEvent::Other(_) => Action::Ignore,
        }
    }

    /// Records a persisted file. Reaching the expected count ends collection.
    pub fn record(&mut self, file: CapturedFile) -> CollectorState {
        self.files.push(file);
        if self.files.len() >= self.expected_files {
            self.state = CollectorState::Done(DoneReason::ExpectedFiles);
        }
        self.state
    }

    /// Names of the files recorded so far.
    pub fn names(&self) -> Vec<String> {
        self.files.iter().map(|f| f.name.clone()).collect()
    }

    /// Files recorded so far, in delivery order.
    pub fn into_files(self) -> Vec<CapturedFile> {
        self.files
    }

    fn finish(&mut self, reason: DoneReason) -> Action {
        self.state = CollectorState::Done(reason);
        Action::Finish(reason)
    }
}

/// Tuning for a collection run.
#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Bound on each individual wait.
    pub event_timeout: Duration,
    /// Stop once this many files have been collected.
    pub expected_files: usize,
    /// Checked before every wait.
    pub cancel: Option<CancelToken>,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            event_timeout: EVENT_TIMEOUT,
            expected_files: EXPECTED_FILES,
            cancel: None,
        }
    }
}

impl CollectOptions {
    /// Stops collection once `token` is cancelled.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

/// Files produced by one capture session, in delivery order.
#[derive(Debug, Clone)]
pub struct CaptureResult {
    /// Persisted files, in delivery order.
    pub files: Vec<CapturedFile>,
    /// Why collection stopped.
    pub reason: DoneReason,
    /// When collection began.
    pub started_at: DateTime<Local>,
    /// When collection ended.
    pub finished_at: DateTime<Local>,
}

impl CaptureResult {
    /// Names of the persisted files.
    pub fn names(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.name.as_str()).collect()
    }

    /// Number of persisted files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True if the camera delivered nothing.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total bytes written.
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// True when exactly one JPEG and one RAW were collected.
    pub fn has_jpeg_raw_pair(&self) -> bool {
        let count = |kind: FileKind| self.files.iter().filter(|f| f.kind == kind).count();
        self.files.len() == 2 && count(FileKind::Jpeg) == 1 && count(FileKind::Raw) == 1
    }
}

/// Waits for the camera to deliver the exposure's files.
///
/// Each wait is bounded by `options.event_timeout`; the loop ends on
/// completion, timeout, or once `options.expected_files` files have been
/// persisted. A failed download or write aborts collection; the error
/// carries the names already written.
pub fn collect<C: CameraControl + ?Sized>(
    session: &mut CaptureSession<'_, C>,
    destination: &Destination,
    options: &CollectOptions,
) -> Result<CaptureResult, CaptureError> {
    let started_at = Local::now();
    let mut collector = EventCollector::new(options.expected_files);

    let reason = loop {
        if let CollectorState::Done(reason) = collector.state() {
            break reason;
        }
        if options.cancelled() {
            return Err(CaptureError::Interrupted {
                written: collector.names(),
            });
        }

        let event = session.camera().wait_for_event(options.event_timeout)?;
        match collector.advance(&event) {
            Action::Fetch(path) => {
                let data = session.camera().fetch_file(&path).map_err(|source| {
                    CaptureError::Fetch {
                        file: path.to_string(),
                        written: collector.names(),
                        source,
                    }
                })?;
                let name = local_name(&path.name, &collector.names());
                let file = destination.persist(&name, &data).map_err(|source| {
                    CaptureError::Persist {
                        path: destination.path_for(&name),
                        written: collector.names(),
                        source,
                    }
                })?;
                collector.record(file);
            }
            Action::Ignore => tracing::debug!(?event, "ignoring camera event"),
            Action::Finish(reason) => tracing::debug!(?reason, "camera signalled end of capture"),
        }
    };

    if reason == DoneReason::Timeout && options.cancelled() {
        return Err(CaptureError::Interrupted {
            written: collector.names(),
        });
    }

    let result = CaptureResult {
        files: collector.into_files(),
        reason,
        started_at,
        finished_at: Local::now(),
    };

    if result.len() < options.expected_files {
        tracing::warn!(
            collected = result.len(),
            expected = options.expected_files,
            ?reason,
            "partial delivery from camera"
        );
    } else if options.expected_files == EXPECTED_FILES && !result.has_jpeg_raw_pair() {
        tracing::warn!(files = ?result.names(), "expected one JPEG and one RAW");
    }
    tracing::info!(
        files = result.len(),
        ?reason,
        elapsed_ms = (result.finished_at - result.started_at).num_milliseconds(),
        "collection finished"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{DeviceError, ScriptedCamera};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn file(name: &str) -> CapturedFile {
        CapturedFile {
            name: name.to_owned(),
            path: PathBuf::from(name),
            size: 0,
            sha256: String::new(),
            kind: FileKind::from_name(name),
        }
    }

    fn added(name: &str) -> CameraEvent {
        CameraEvent::FileAdded(CameraFilePath::new("/dcim", name))
    }

    fn run(camera: &mut ScriptedCamera, dir: &TempDir) -> Result<CaptureResult, CaptureError> {
        let mut session = CaptureSession::open(camera)?;
        collect(&mut session, &Destination::new(dir.path()), &CollectOptions::default())
    }

    #[test]
    fn test_file_added_requests_fetch() {
        let mut collector = EventCollector::new(EXPECTED_FILES);
        assert_eq!(
            collector.advance(&added("a.jpg")),
            Action::Fetch(CameraFilePath::new("/dcim", "a.jpg"))
        );
        assert_eq!(collector.state(), CollectorState::Waiting);
    }

    #[test]
    fn test_done_at_expected_count() {
        let mut collector = EventCollector::new(EXPECTED_FILES);
        assert_eq!(collector.record(file("a.jpg")), CollectorState::Waiting);
        assert_eq!(
            collector.record(file("a.cr2")),
            CollectorState::Done(DoneReason::ExpectedFiles)
        );
        assert_eq!(
            collector.advance(&added("b.jpg")),
            Action::Finish(DoneReason::ExpectedFiles)
        );
    }

    #[test]
    fn test_completion_and_timeout_finish() {
        let mut collector = EventCollector::new(EXPECTED_FILES);
        assert_eq!(
            collector.advance(&CameraEvent::CaptureComplete),
            Action::Finish(DoneReason::CaptureComplete)
        );

        let mut collector = EventCollector::new(EXPECTED_FILES);
        assert_eq!(
            collector.advance(&CameraEvent::Timeout),
            Action::Finish(DoneReason::Timeout)
        );
        // Later events do not reopen a finished collector.
        assert_eq!(
            collector.advance(&CameraEvent::CaptureComplete),
            Action::Finish(DoneReason::Timeout)
        );
    }

    #[test]
    fn test_other_events_ignored() {
        let mut collector = EventCollector::new(EXPECTED_FILES);
        assert_eq!(
            collector.advance(&CameraEvent::Other("FolderAdded".into())),
            Action::Ignore
        );
        assert_eq!(collector.state(), CollectorState::Waiting);
    }

    #[test]
    fn test_collects_pair_in_any_order() {
        let dir = TempDir::new().unwrap();
        let mut camera = ScriptedCamera::new();
        camera.push_file("a.cr2", b"raw");
        camera.push_event(CameraEvent::Other("PropertyChanged".into()));
        camera.push_file("a.jpg", b"jpeg");
        camera.push_event(CameraEvent::CaptureComplete);

        let result = run(&mut camera, &dir).unwrap();

        assert_eq!(result.names(), ["a.cr2", "a.jpg"]);
        assert_eq!(result.reason, DoneReason::ExpectedFiles);
        assert!(result.has_jpeg_raw_pair());
        assert_eq!(result.total_bytes(), 7);
        // CaptureComplete was never consumed: collection ended at two files.
        assert_eq!(camera.wait_calls(), 3);
    }

    #[test]
    fn test_same_name_from_two_slots_kept_apart() {
        let dir = TempDir::new().unwrap();
        let mut camera = ScriptedCamera::new();
        camera.push_file_in("/store_00010001/DCIM/100CANON", "IMG_0001.JPG", b"slot1");
        camera.push_file_in("/store_00020001/DCIM/100CANON", "IMG_0001.JPG", b"slot2");

        let result = run(&mut camera, &dir).unwrap();

        assert_eq!(result.names(), ["IMG_0001.JPG", "IMG_0001_2.JPG"]);
        assert_eq!(std::fs::read(dir.path().join("IMG_0001.JPG")).unwrap(), b"slot1");
        assert_eq!(std::fs::read(dir.path().join("IMG_0001_2.JPG")).unwrap(), b"slot2");
    }

    #[test]
    fn test_single_file_then_complete() {
        let dir = TempDir::new().unwrap();
        let mut camera = ScriptedCamera::new();
        camera.push_file("a.jpg", b"jpeg");
        camera.push_event(CameraEvent::CaptureComplete);

        let result = run(&mut camera, &dir).unwrap();

        assert_eq!(result.names(), ["a.jpg"]);
        assert_eq!(result.reason, DoneReason::CaptureComplete);
        assert!(!result.has_jpeg_raw_pair());
    }

    #[test]
    fn test_timeout_with_nothing_delivered() {
        let dir = TempDir::new().unwrap();
        let mut camera = ScriptedCamera::new();
        camera.push_event(CameraEvent::Timeout);

        let result = run(&mut camera, &dir).unwrap();

        assert!(result.is_empty());
        assert_eq!(result.reason, DoneReason::Timeout);
        assert_eq!(camera.wait_calls(), 1);
    }

    #[test]
    fn test_fetch_failure_aborts_with_written_names() {
        let dir = TempDir::new().unwrap();
        let mut camera = ScriptedCamera::new();
        camera.push_file("a.jpg", b"jpeg");
        camera.push_unreadable_file("a.cr2");

        let err = run(&mut camera, &dir).unwrap_err();

        assert!(matches!(err, CaptureError::Fetch { .. }));
        assert_eq!(err.written(), ["a.jpg"]);
        assert!(dir.path().join("a.jpg").exists());
        assert!(!dir.path().join("a.cr2").exists());
    }

    #[test]
    fn test_write_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let mut camera = ScriptedCamera::new();
        camera.push_file("a.jpg", b"jpeg");

        let mut session = CaptureSession::open(&mut camera).unwrap();
        let err = collect(
            &mut session,
            &Destination::new(dir.path().join("gone")),
            &CollectOptions::default(),
        )
        .unwrap_err();

        assert!(matches!(err, CaptureError::Persist { .. }));
        assert!(err.written().is_empty());
    }

    #[test]
    fn test_cancel_before_wait() {
        let dir = TempDir::new().unwrap();
        let token = CancelToken::new();
        let mut camera = ScriptedCamera::new();
        camera.push_file("a.jpg", b"jpeg");
        token.cancel();

        let mut session = CaptureSession::open(&mut camera).unwrap();
        let err = collect(
            &mut session,
            &Destination::new(dir.path()),
            &CollectOptions::default().with_cancel(token),
        )
        .unwrap_err();
        drop(session);

        assert!(matches!(err, CaptureError::Interrupted { .. }));
        assert_eq!(camera.wait_calls(), 0);
        assert_eq!(camera.close_count(), 1);
    }

    #[test]
    fn test_wait_on_closed_camera_is_device_error() {
        let dir = TempDir::new().unwrap();
        let mut camera = ScriptedCamera::new();
        let mut session = CaptureSession::open(&mut camera).unwrap();
        session.camera().close();

        let err = collect(
            &mut session,
            &Destination::new(dir.path()),
            &CollectOptions::default(),
        )
        .unwrap_err();

        assert!(matches!(err, CaptureError::Device(DeviceError::NotOpen)));
        assert!(err.is_device());
    }
}
