//! Barcode ledger.
//!
//! A plain-text file holding one prefix per line. The contents behave as a
//! set: recording a prefix that is already present leaves the file's
//! entries unchanged.

use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Deduplicated list of prefixes used for captures.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    /// Ledger stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the ledger file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates an empty ledger file if none exists.
    pub fn ensure_exists(&self) -> io::Result<()> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map(drop)
    }

    /// Reads all entries. A missing file is an empty ledger.
    pub fn load(&self) -> io::Result<BTreeSet<String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(err) => return Err(err),
        };
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect())
    }

    /// Adds `prefix` and rewrites the file. Returns false if it was
    /// already recorded.
    pub fn record(&self, prefix: &str) -> io::Result<bool> {
        let mut entries = self.load()?;
        let inserted = entries.insert(prefix.trim().to_owned());

        let mut content = String::new();
        for entry in &entries {
            content.push_str(entry);
            content.push('\n');
        }
        fs::write(&self.path, content)?;

        tracing::debug!(prefix, inserted, entries = entries.len(), "ledger updated");
        Ok(inserted)
    }
}
