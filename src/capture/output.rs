//! Captured files and where they are written.

use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Broad category of a captured file, from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// `.jpg` / `.jpeg`.
    Jpeg,
    /// A camera RAW format.
    Raw,
    /// Anything else (movies, sidecars, unknown).
    Other,
}

/// RAW extensions produced by common tethered bodies.
const RAW_EXTENSIONS: &[&str] = &[
    "cr2", "cr3", "crw", "nef", "nrw", "arw", "raf", "orf", "rw2", "pef", "dng",
];

impl FileKind {
    /// Classifies a file by its extension, ignoring case.
    pub fn from_name(name: &str) -> Self {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("jpg" | "jpeg") => Self::Jpeg,
            Some(e) if RAW_EXTENSIONS.contains(&e) => Self::Raw,
            _ => Self::Other,
        }
    }
}

/// A file fetched from the camera and written to the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFile {
    /// File name as written (the camera-side name).
    pub name: String,
    /// Full path on disk.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Hex-encoded SHA-256 of the content.
    pub sha256: String,
    /// Category derived from the name.
    pub kind: FileKind,
}

/// Local file name for a camera-side `name`: its final component, suffixed
/// `_2`, `_3`, ... if a file of this session already took that name.
///
/// Bodies with two card slots can report the same name from different
/// folders within one capture.
pub fn local_name(name: &str, taken: &[String]) -> String {
    let base = Path::new(name)
        .file_name()
        .map_or_else(|| "unnamed".to_owned(), |n| n.to_string_lossy().into_owned());
    if !taken.contains(&base) {
        return base;
    }

    let path = Path::new(&base);
    let stem = path
        .file_stem()
        .map_or_else(|| base.clone(), |s| s.to_string_lossy().into_owned());
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());
    let unique = (2u32..)
        .map(|n| match &ext {
            Some(ext) => format!("{stem}_{n}.{ext}"),
            None => format!("{stem}_{n}"),
        })
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.clone());
    tracing::warn!(camera_name = name, local_name = %unique, "duplicate file name in session");
    unique
}

/// Directory captured files are written into.
#[derive(Debug, Clone)]
pub struct Destination {
    dir: PathBuf,
}

impl Destination {
    /// Writes into `dir`, which must already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The destination directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a camera-side name would be written to.
    ///
    /// Only the final component of `name` is used, so a camera-supplied
    /// name cannot escape the directory.
    pub fn path_for(&self, name: &str) -> PathBuf {
        match Path::new(name).file_name() {
            Some(file_name) => self.dir.join(file_name),
            None => self.dir.join("unnamed"),
        }
    }

    /// Writes `data` as `name`, replacing any existing file.
    pub fn persist(&self, name: &str, data: &[u8]) -> io::Result<CapturedFile> {
        let path = self.path_for(name);
        fs::write(&path, data)?;

        let file = CapturedFile {
            name: path
                .file_name()
                .map_or_else(|| name.to_owned(), |n| n.to_string_lossy().into_owned()),
            sha256: hex::encode(Sha256::digest(data)),
            size: data.len() as u64,
            kind: FileKind::from_name(name),
            path,
        };
        tracing::info!(
            file = %file.name,
            bytes = file.size,
            sha256 = %file.sha256,
            "captured file written"
        );
        Ok(file)
    }
}
