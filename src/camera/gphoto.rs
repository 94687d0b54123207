//! libgphoto2 backend for real tethered cameras.

use super::control::{
    CameraControl, CameraEvent, CameraFilePath, CancelToken, ConfigError, ConfigWidget,
    DeviceError, DriverOptions,
};
use gphoto2::widget::Widget;
use gphoto2::Context;
use std::io;
use std::time::{Duration, Instant};

/// Longest single blocking wait handed to libgphoto2 when a cancel token
/// is attached.
const WAIT_SLICE: Duration = Duration::from_millis(250);

/// Camera backed by the first device libgphoto2 autodetects.
pub struct GphotoCamera {
    options: DriverOptions,
    cancel: Option<CancelToken>,
    context: Option<Context>,
    camera: Option<gphoto2::Camera>,
}

impl GphotoCamera {
    /// Creates an unopened handle; the camera is detected on `open`.
    pub fn new(options: DriverOptions) -> Self {
        Self {
            options,
            cancel: None,
            context: None,
            camera: None,
        }
    }

    /// Splits long waits so that cancelling `token` ends them promptly.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn camera(&self) -> Result<&gphoto2::Camera, DeviceError> {
        self.camera.as_ref().ok_or(DeviceError::NotOpen)
    }

    fn widget(&self, name: &str) -> Result<Widget, ConfigError> {
        let camera = self
            .camera
            .as_ref()
            .ok_or_else(|| ConfigError::UnknownSetting(name.to_owned()))?;
        camera.config_key::<Widget>(name).wait().map_err(|err| {
            self.options.error_severity.report("get_config", &err);
            ConfigError::UnknownSetting(name.to_owned())
        })
    }

    /// Writes a modified widget; a generic failure here is subject to the
    /// configured severity.
    fn write_back(
        &self,
        setting: &str,
        result: Result<(), gphoto2::Error>,
    ) -> Result<(), ConfigError> {
        match result {
            Ok(()) => Ok(()),
            Err(err) => self.options.error_severity.tolerate(
                "set_config",
                ConfigError::Rejected {
                    setting: setting.to_owned(),
                    reason: err.to_string(),
                },
            ),
        }
    }

    fn wait_once(&self, timeout: Duration) -> Result<CameraEvent, DeviceError> {
        use gphoto2::camera::CameraEvent as GpEvent;

        let event = self
            .camera()?
            .wait_event(timeout)
            .wait()
            .map_err(|err| DeviceError::Transport(err.to_string()))?;

        Ok(match event {
            GpEvent::NewFile(path) => {
                CameraEvent::FileAdded(CameraFilePath::new(path.folder(), path.name()))
            }
            GpEvent::CaptureComplete => CameraEvent::CaptureComplete,
            GpEvent::Timeout => CameraEvent::Timeout,
            other => CameraEvent::Other(format!("{other:?}")),
        })
    }
}

impl CameraControl for GphotoCamera {
    fn open(&mut self) -> Result<(), DeviceError> {
        let context = Context::new().map_err(|err| DeviceError::InitFailed(err.to_string()))?;
        let camera = context.autodetect_camera().wait().map_err(|err| {
            self.options.error_severity.report("open", &err);
            let message = err.to_string();
            if message.to_lowercase().contains("claim") {
                DeviceError::Claimed(message)
            } else {
                DeviceError::InitFailed(message)
            }
        })?;

        tracing::info!("gphoto camera opened");
        self.camera = Some(camera);
        self.context = Some(context);
        Ok(())
    }

    fn close(&mut self) {
        // Dropping the handle exits the camera and releases the USB claim.
        if self.camera.take().is_some() {
            tracing::info!("gphoto camera closed");
        }
        self.context = None;
    }

    fn is_open(&self) -> bool {
        self.camera.is_some()
    }

    fn get_config(&mut self, name: &str) -> Result<ConfigWidget, ConfigError> {
        let widget = self.widget(name)?;
        Ok(match &widget {
            Widget::Radio(radio) => {
                let choices: Vec<String> = radio.choices_iter().collect();
                let choices: Vec<&str> = choices.iter().map(String::as_str).collect();
                ConfigWidget::radio(name, radio.choice(), &choices)
            }
            Widget::Text(text) => ConfigWidget::text(name, text.value()),
            other => ConfigWidget::text(name, format!("{other:?}")).into_read_only(),
        })
    }

    fn set_config(&mut self, widget: &ConfigWidget) -> Result<(), ConfigError> {
        let name = widget.name();
        let current = self.widget(name)?;
        let camera = self
            .camera
            .as_ref()
            .ok_or_else(|| ConfigError::UnknownSetting(name.to_owned()))?;

        let value = widget.value();
        match &current {
            Widget::Radio(radio) => {
                radio
                    .set_choice(value)
                    .map_err(|_| ConfigError::InvalidValue {
                        setting: name.to_owned(),
                        value: value.to_owned(),
                        choices: radio.choices_iter().collect(),
                    })?;
                self.write_back(name, camera.set_config(radio).wait())
            }
            Widget::Text(text) => {
                text.set_value(value)
                    .map_err(|err| ConfigError::Rejected {
                        setting: name.to_owned(),
                        reason: err.to_string(),
                    })?;
                self.write_back(name, camera.set_config(text).wait())
            }
            _ => Err(ConfigError::ReadOnly(name.to_owned())),
        }
    }

    fn wait_for_event(&mut self, timeout: Duration) -> Result<CameraEvent, DeviceError> {
        let cancel = self.cancel.clone();
        let start = Instant::now();
        loop {
            let remaining = timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() || cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                return Ok(CameraEvent::Timeout);
            }
            let slice = if cancel.is_some() {
                remaining.min(WAIT_SLICE)
            } else {
                remaining
            };
            match self.wait_once(slice) {
                Ok(CameraEvent::Timeout) => continue,
                Ok(event) => return Ok(event),
                // Suppressed errors keep waiting until the window closes.
                Err(err @ DeviceError::Transport(_)) => {
                    self.options.error_severity.tolerate("wait_for_event", err)?;
                    std::thread::sleep(remaining.min(WAIT_SLICE));
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn fetch_file(&mut self, path: &CameraFilePath) -> io::Result<Vec<u8>> {
        let (Some(camera), Some(context)) = (self.camera.as_ref(), self.context.as_ref()) else {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "camera is not open"));
        };

        let to_io = |err: gphoto2::Error| {
            self.options.error_severity.report("fetch_file", &err);
            io::Error::new(io::ErrorKind::Other, err.to_string())
        };
        let file = camera
            .fs()
            .download(&path.folder, &path.name)
            .wait()
            .map_err(to_io)?;
        let data = file.get_data(context).wait().map_err(to_io)?;
        Ok(data.into_vec())
    }
}
