//! In-process scripted camera.
//!
//! Behaves like a tethered Canon EOS body as far as the capture core can
//! observe: it exposes the usual configuration widgets, queues events, and
//! serves file payloads. Used by the test suite and by the binary's
//! `simulated` backend.

use super::control::{
    CameraControl, CameraEvent, CameraFilePath, CancelToken, ConfigError, ConfigWidget,
    DeviceError, DriverOptions,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io;
use std::time::Duration;

/// Folder the simulated body stores captures in.
pub const SIMULATED_FOLDER: &str = "/store_00020001/DCIM/100CANON";

/// Remote-release control name on EOS bodies.
const REMOTE_RELEASE: &str = "eosremoterelease";

/// Mock camera driven by a script of events.
#[derive(Debug)]
pub struct ScriptedCamera {
    options: DriverOptions,
    cancel: Option<CancelToken>,
    widgets: BTreeMap<String, ConfigWidget>,
    events: VecDeque<CameraEvent>,
    files: HashMap<CameraFilePath, Vec<u8>>,
    open: bool,
    open_error: Option<DeviceError>,
    rejected: HashMap<String, String>,
    failing_fetches: Vec<CameraFilePath>,
    failing_waits: usize,
    auto_capture: bool,
    armed: bool,
    shot_counter: u32,
    applied: Vec<(String, String)>,
    open_count: usize,
    close_count: usize,
    wait_calls: usize,
}

impl Default for ScriptedCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedCamera {
    /// Creates a camera with the standard EOS widget table and an empty
    /// event script.
    pub fn new() -> Self {
        Self::with_options(DriverOptions::default())
    }

    /// Like [`new`](Self::new), with explicit driver options.
    pub fn with_options(options: DriverOptions) -> Self {
        let widgets = [
            ConfigWidget::radio(
                "drivemode",
                "Continuous",
                &["Single", "Continuous", "Continuous high speed", "Timer 10 sec"],
            ),
            ConfigWidget::radio(
                "capturetarget",
                "Memory card",
                &["Internal RAM", "Memory card"],
            ),
            ConfigWidget::radio(
                "imageformat",
                "Large Fine JPEG",
                &[
                    "Large Fine JPEG",
                    "Large Normal JPEG",
                    "RAW",
                    "RAW + Large Fine JPEG",
                ],
            ),
            ConfigWidget::radio(
                REMOTE_RELEASE,
                "None",
                &[
                    "None",
                    "Press Half",
                    "Press Full",
                    "Release Half",
                    "Release Full",
                    "Immediate",
                ],
            ),
            ConfigWidget::text("serialnumber", "083021004712").into_read_only(),
        ]
        .into_iter()
        .map(|w| (w.name().to_owned(), w))
        .collect();

        Self {
            options,
            cancel: None,
            widgets,
            events: VecDeque::new(),
            files: HashMap::new(),
            open: false,
            open_error: None,
            rejected: HashMap::new(),
            failing_fetches: Vec::new(),
            failing_waits: 0,
            auto_capture: false,
            armed: false,
            shot_counter: 0,
            applied: Vec::new(),
            open_count: 0,
            close_count: 0,
            wait_calls: 0,
        }
    }

    /// Creates a camera that produces a JPEG + RAW pair every time the
    /// shutter is armed and released.
    pub fn simulated(options: DriverOptions) -> Self {
        Self {
            auto_capture: true,
            ..Self::with_options(options)
        }
    }

    /// Lets a pending wait return early once `token` is cancelled.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Makes every `open` fail with `err`.
    pub fn fail_open(mut self, err: DeviceError) -> Self {
        self.open_error = Some(err);
        self
    }

    /// Makes the camera reject writes to `setting`.
    pub fn reject_setting(mut self, setting: &str, reason: &str) -> Self {
        self.rejected.insert(setting.to_owned(), reason.to_owned());
        self
    }

    /// Makes the next `count` waits hit a transport error.
    pub fn fail_waits(mut self, count: usize) -> Self {
        self.failing_waits = count;
        self
    }

    /// Adds or replaces a configuration widget.
    pub fn with_widget(mut self, widget: ConfigWidget) -> Self {
        self.widgets.insert(widget.name().to_owned(), widget);
        self
    }

    /// Queues a raw event.
    pub fn push_event(&mut self, event: CameraEvent) {
        self.events.push_back(event);
    }

    /// Stores `data` on the camera and queues the matching `FileAdded`.
    pub fn push_file(&mut self, name: &str, data: &[u8]) {
        self.push_file_in(SIMULATED_FOLDER, name, data);
    }

    /// Like [`push_file`](Self::push_file), in a specific camera folder.
    pub fn push_file_in(&mut self, folder: &str, name: &str, data: &[u8]) {
        let path = CameraFilePath::new(folder, name);
        self.files.insert(path.clone(), data.to_vec());
        self.events.push_back(CameraEvent::FileAdded(path));
    }

    /// Queues a `FileAdded` whose download will fail.
    pub fn push_unreadable_file(&mut self, name: &str) {
        let path = CameraFilePath::new(SIMULATED_FOLDER, name);
        self.failing_fetches.push(path.clone());
        self.events.push_back(CameraEvent::FileAdded(path));
    }

    /// Number of events still queued.
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Current value of a setting, if it exists.
    pub fn setting(&self, name: &str) -> Option<&str> {
        self.widgets.get(name).map(ConfigWidget::value)
    }

    /// Every `(name, value)` written so far, in order.
    pub fn applied(&self) -> &[(String, String)] {
        &self.applied
    }

    /// Successful opens so far.
    pub fn open_count(&self) -> usize {
        self.open_count
    }

    /// Closes of an open camera so far.
    pub fn close_count(&self) -> usize {
        self.close_count
    }

    /// Calls to `wait_for_event` while open.
    pub fn wait_calls(&self) -> usize {
        self.wait_calls
    }

    fn on_remote_release(&mut self, value: &str) {
        match value {
            "Immediate" | "Press Full" => self.armed = true,
            "Release Full" if self.armed => {
                self.armed = false;
                if self.auto_capture {
                    self.shot_counter += 1;
                    let stem = format!("IMG_{:04}", self.shot_counter);
                    let jpeg = synthetic_payload(b"\xFF\xD8\xFF\xE0", self.shot_counter, 4096);
                    let raw = synthetic_payload(b"II*\x00", self.shot_counter, 16384);
                    self.push_file(&format!("{stem}.JPG"), &jpeg);
                    self.push_file(&format!("{stem}.CR2"), &raw);
                    self.events.push_back(CameraEvent::CaptureComplete);
                }
            }
            _ => {}
        }
    }
}

impl CameraControl for ScriptedCamera {
    fn open(&mut self) -> Result<(), DeviceError> {
        if let Some(err) = &self.open_error {
            self.options.error_severity.report("open", err);
            return Err(err.clone());
        }
        self.open = true;
        self.open_count += 1;
        tracing::info!(opens = self.open_count, "ScriptedCamera opened");
        Ok(())
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.close_count += 1;
            // Undelivered events belong to this connection; stored files stay on the card.
            let dropped = self.events.len();
            self.events.clear();
            self.armed = false;
            tracing::info!(dropped_events = dropped, "ScriptedCamera closed");
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn get_config(&mut self, name: &str) -> Result<ConfigWidget, ConfigError> {
        self.widgets
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownSetting(name.to_owned()))
    }

    fn set_config(&mut self, widget: &ConfigWidget) -> Result<(), ConfigError> {
        if let Some(reason) = self.rejected.get(widget.name()) {
            let err = ConfigError::Rejected {
                setting: widget.name().to_owned(),
                reason: reason.clone(),
            };
            // A suppressed rejection still leaves the camera unchanged.
            return self.options.error_severity.tolerate("set_config", err);
        }

        // Re-validate as firmware would; the caller may have built the widget itself.
        let current = self
            .widgets
            .get_mut(widget.name())
            .ok_or_else(|| ConfigError::UnknownSetting(widget.name().to_owned()))?;
        current.set_value(widget.value())?;

        self.applied
            .push((widget.name().to_owned(), widget.value().to_owned()));
        if widget.name() == REMOTE_RELEASE {
            let value = widget.value().to_owned();
            self.on_remote_release(&value);
        }
        Ok(())
    }

    fn wait_for_event(&mut self, _timeout: Duration) -> Result<CameraEvent, DeviceError> {
        if !self.open {
            return Err(DeviceError::NotOpen);
        }
        self.wait_calls += 1;
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Ok(CameraEvent::Timeout);
        }
        if self.failing_waits > 0 {
            self.failing_waits -= 1;
            let err = DeviceError::Transport("PTP I/O error".to_owned());
            // Suppressed: keep waiting within the same call.
            self.options.error_severity.tolerate("wait_for_event", err)?;
        }
        // An exhausted script looks like a quiet camera.
        Ok(self.events.pop_front().unwrap_or(CameraEvent::Timeout))
    }

    fn fetch_file(&mut self, path: &CameraFilePath) -> io::Result<Vec<u8>> {
        if self.failing_fetches.contains(path) {
            let err = io::Error::new(io::ErrorKind::Other, format!("transfer of {path} aborted"));
            self.options.error_severity.report("fetch_file", &err);
            return Err(err);
        }
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{path} not on camera"))
        })
    }
}

/// Deterministic file body with a recognizable magic prefix.
fn synthetic_payload(magic: &[u8], shot: u32, len: usize) -> Vec<u8> {
    let mut data = magic.to_vec();
    data.extend((0..len).map(|i| ((i as u32 ^ shot) % 251) as u8));
    data
}
