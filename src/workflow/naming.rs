//! Prefixing captured files.

use super::WorkflowError;
use crate::capture::CapturedFile;
use std::fmt;
use std::fs;
use std::path::PathBuf;

/// Operator-supplied prefix, usually a scanned barcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefix(String);

impl Prefix {
    /// Trims and validates `raw`. Path separators are rejected because
    /// the prefix becomes part of a file name.
    pub fn parse(raw: &str) -> Result<Self, WorkflowError> {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed.contains(['/', '\\'])
            || trimmed == "."
            || trimmed == ".."
        {
            return Err(WorkflowError::InvalidPrefix(raw.to_owned()));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// The trimmed prefix.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name for `name` carrying this prefix.
    pub fn apply_to(&self, name: &str) -> String {
        format!("{}_{}", self.0, name)
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Renames each captured file to `{prefix}_{name}` in place.
///
/// Returns the new paths in the same order as `files`.
pub fn apply_prefix(prefix: &Prefix, files: &[CapturedFile]) -> Result<Vec<PathBuf>, WorkflowError> {
    files
        .iter()
        .map(|file| {
            let to = file.path.with_file_name(prefix.apply_to(&file.name));
            fs::rename(&file.path, &to).map_err(|source| WorkflowError::Rename {
                from: file.path.clone(),
                to: to.clone(),
                source,
            })?;
            tracing::info!(from = %file.name, to = %to.display(), "renamed capture");
            Ok(to)
        })
        .collect()
}
