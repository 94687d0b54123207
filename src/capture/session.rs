//! Scoped camera sessions.
//!
//! A [`CaptureSession`] owns the open camera connection for its lifetime.
//! The connection is closed exactly once: explicitly via
//! [`CaptureSession::close`], or on drop, which also covers early returns
//! and unwinding out of a panicking body.

use crate::camera::{CameraControl, DeviceError};

/// An open connection to the camera.
pub struct CaptureSession<'a, C: CameraControl + ?Sized> {
    camera: &'a mut C,
    open: bool,
}

impl<'a, C: CameraControl + ?Sized> CaptureSession<'a, C> {
    /// Opens the camera. Fails if it cannot be found or initialized.
    pub fn open(camera: &'a mut C) -> Result<Self, DeviceError> {
        camera.open()?;
        tracing::info!("capture session opened");
        Ok(Self { camera, open: true })
    }

    /// The underlying camera handle.
    pub fn camera(&mut self) -> &mut C {
        &mut *self.camera
    }

    /// True until the session is closed.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Closes the connection now.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.open {
            self.open = false;
            self.camera.close();
            tracing::info!("capture session closed");
        }
    }
}

impl<C: CameraControl + ?Sized> Drop for CaptureSession<'_, C> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::warn!("releasing camera while unwinding");
        }
        self.release();
    }
}

/// Runs `body` inside an open session.
///
/// `body` is never invoked when the camera fails to open. Its result, Ok
/// or Err, is returned unchanged after the camera has been closed.
pub fn with_session<C, R, E, F>(camera: &mut C, body: F) -> Result<R, E>
where
    C: CameraControl + ?Sized,
    E: From<DeviceError>,
    F: FnOnce(&mut CaptureSession<'_, C>) -> Result<R, E>,
{
    let mut session = CaptureSession::open(camera)?;
    let result = body(&mut session);
    session.close();
    result
}
