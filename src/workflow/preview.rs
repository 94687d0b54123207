//! Opening JPEG previews in an external viewer.

use crate::capture::FileKind;
use std::path::Path;
use std::process::Command;

/// Launches a viewer for JPEG outputs.
#[derive(Debug, Clone, Default)]
pub struct PreviewOpener {
    command: Option<String>,
}

impl PreviewOpener {
    /// Opens previews with `command <path>`.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: Some(command.into()),
        }
    }

    /// A preview opener that never launches anything.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// True if a viewer command is configured.
    pub fn is_enabled(&self) -> bool {
        self.command.is_some()
    }

    /// True if `path` names a JPEG.
    pub fn wants(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| FileKind::from_name(n) == FileKind::Jpeg)
    }

    /// Opens `path` if it is a JPEG. Viewer failures are logged, never
    /// returned. Returns true if a viewer was launched.
    pub fn open(&self, path: &Path) -> bool {
        let Some(command) = &self.command else {
            return false;
        };
        if !Self::wants(path) {
            return false;
        }

        match Command::new(command).arg(path).spawn() {
            Ok(_) => {
                tracing::debug!(viewer = %command, file = %path.display(), "preview opened");
                true
            }
            Err(err) => {
                tracing::warn!(viewer = %command, file = %path.display(), error = %err, "failed to open preview");
                false
            }
        }
    }
}
