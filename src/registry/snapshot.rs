//! # Snapshot Module
//!
//! The on-disk form of a [`TemplateRegistry`](super::TemplateRegistry): a
//! versioned JSON document stored as a hidden file inside the template
//! directory.
//!
//! Template references are file names relative to the template directory, so a
//! snapshot stays valid when the directory is moved as a whole.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write as _};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::RegistryError;

/// Name of the hidden snapshot file inside the template directory.
pub const SNAPSHOT_FILE_NAME: &str = ".file_types.json";

/// Current snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Stored metadata for one template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRecord {
  /// File name relative to the template directory
  pub file: String,
  pub extensions: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub include_pattern: Option<String>,
  #[serde(default)]
  pub include_before_header: bool,
}

/// Serialized registry state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
  pub version: u32,
  /// Known templates ordered by file name
  pub templates: Vec<TemplateRecord>,
  /// Extension to template file name
  pub extensions: BTreeMap<String, String>,
}

impl Snapshot {
  /// Reads a snapshot from `path`.
  ///
  /// Returns `Ok(None)` when no snapshot exists. A snapshot that exists but
  /// cannot be decoded, has an unknown version, or references a template it
  /// does not list is an error.
  pub fn read(path: &Path) -> Result<Option<Self>, RegistryError> {
    let content = match fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
      Err(e) => {
        return Err(RegistryError::SnapshotRead {
          path: path.to_path_buf(),
          source: e,
        });
      }
    };

    let snapshot: Snapshot = serde_json::from_str(&content).map_err(|e| RegistryError::SnapshotCorrupt {
      path: path.to_path_buf(),
      source: e,
    })?;

    if snapshot.version != SNAPSHOT_VERSION {
      return Err(RegistryError::SnapshotVersion {
        path: path.to_path_buf(),
        found: snapshot.version,
        expected: SNAPSHOT_VERSION,
      });
    }

    for (extension, file) in &snapshot.extensions {
      if !snapshot.templates.iter().any(|record| &record.file == file) {
        return Err(RegistryError::SnapshotInconsistent {
          path: path.to_path_buf(),
          extension: extension.clone(),
          file: file.clone(),
        });
      }
    }

    Ok(Some(snapshot))
  }

  /// Writes the snapshot to `path`, replacing any previous snapshot
  /// atomically.
  pub fn write(&self, path: &Path) -> Result<(), RegistryError> {
    let write_error = |source: std::io::Error| RegistryError::SnapshotWrite {
      path: path.to_path_buf(),
      source,
    };

    let mut json = serde_json::to_string_pretty(self).map_err(|e| write_error(std::io::Error::other(e)))?;
    json.push('\n');

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::Builder::new()
      .prefix(".file_types")
      .suffix(".tmp")
      .tempfile_in(dir)
      .map_err(write_error)?;
    temp.write_all(json.as_bytes()).map_err(write_error)?;
    temp.persist(path).map_err(|e| write_error(e.error))?;

    Ok(())
  }
}
