//! # File Handle Module
//!
//! A [`FileHandle`] names one file on disk by its absolute path and exposes the
//! metadata the rest of the crate needs: the name split into stem and
//! extension, a best-effort creation timestamp and a restartable line
//! iterator.
//!
//! Two handles are equal when they point at the same absolute path, so handles
//! can be used as set members and map keys.

use std::fmt;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, warn};

/// Format used for the `<DATE>` placeholder, e.g. `Apr 06 2014`.
pub const DATE_FORMAT: &str = "%b %d %Y";

/// Error produced when a file name cannot be split into stem and extension.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FileNameError {
  /// The final path component has no `.` or ends with one.
  #[error("File '{path}' has no extension")]
  MissingExtension { path: PathBuf },
}

/// Identity and metadata for a file on disk.
#[derive(Debug, Clone)]
pub struct FileHandle {
  path: PathBuf,
  created_at: Option<DateTime<Local>>,
}

impl FileHandle {
  /// Creates a handle for `path`.
  ///
  /// Existing files are canonicalized. Paths that do not exist (yet, or any
  /// more) are made absolute against the current directory instead, so a
  /// handle can still describe a deleted template.
  pub fn new(path: impl AsRef<Path>) -> Self {
    let path = path.as_ref();
    let absolute = match std::fs::canonicalize(path) {
      Ok(canonical) => canonical,
      Err(_) => absolutize(path),
    };
    let created_at = read_created_at(&absolute);

    Self {
      path: absolute,
      created_at,
    }
  }

  /// The absolute path of the file.
  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Returns `true` if the file can currently be opened for reading.
  pub fn exists(&self) -> bool {
    File::open(&self.path).is_ok()
  }

  /// Iterates the file's lines without their line terminators.
  ///
  /// The file is re-opened on every call. When it cannot be opened the
  /// iterator yields a single empty string, so an unreadable file and a file
  /// holding one empty line look the same to callers that only read the
  /// items; [`Lines::failed`] tells them apart.
  pub fn lines(&self) -> Lines {
    match File::open(&self.path) {
      Ok(file) => Lines::new(
        Source::Open {
          path: self.path.clone(),
          reader: BufReader::new(file),
        },
        false,
      ),
      Err(e) => {
        debug!("Could not open file {}: {}", self.path.display(), e);
        Lines::new(Source::Unreadable { yielded: false }, true)
      }
    }
  }

  /// The final path component, e.g. `main.rs`.
  pub fn file_name(&self) -> &str {
    self.path.file_name().and_then(|name| name.to_str()).unwrap_or("")
  }

  /// The file name without its last extension, e.g. `main` for `main.rs`.
  pub fn name(&self) -> Result<&str, FileNameError> {
    self.split_name().map(|(stem, _)| stem)
  }

  /// The last extension without the dot, e.g. `rs` for `main.rs`.
  pub fn extension(&self) -> Result<&str, FileNameError> {
    self.split_name().map(|(_, extension)| extension)
  }

  /// The name and extension joined back together.
  pub fn full_name(&self) -> Result<String, FileNameError> {
    let (stem, extension) = self.split_name()?;
    Ok(format!("{}.{}", stem, extension))
  }

  /// Best-effort creation time captured when the handle was built.
  pub const fn created_at(&self) -> Option<DateTime<Local>> {
    self.created_at
  }

  /// The creation time formatted for headers, if known.
  pub fn formatted_date(&self) -> Option<String> {
    self.created_at.map(|time| time.format(DATE_FORMAT).to_string())
  }

  fn split_name(&self) -> Result<(&str, &str), FileNameError> {
    match self.file_name().rsplit_once('.') {
      Some((stem, extension)) if !extension.is_empty() => Ok((stem, extension)),
      _ => Err(FileNameError::MissingExtension {
        path: self.path.clone(),
      }),
    }
  }
}

impl PartialEq for FileHandle {
  fn eq(&self, other: &Self) -> bool {
    self.path == other.path
  }
}

impl Eq for FileHandle {}

impl Hash for FileHandle {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.path.hash(state);
  }
}

impl fmt::Display for FileHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.path.display())
  }
}

/// Line iterator returned by [`FileHandle::lines`].
///
/// Lines that are not valid UTF-8 are decoded lossily rather than dropped; their
/// numbers are kept in [`lossy_lines`](Self::lossy_lines). A read error ends the
/// iteration and is reported by [`failed`](Self::failed).
pub struct Lines {
  source: Source,
  line: usize,
  lossy: Vec<usize>,
  failed: bool,
}

enum Source {
  Open { path: PathBuf, reader: BufReader<File> },
  Unreadable { yielded: bool },
  Finished,
}

impl Lines {
  const fn new(source: Source, failed: bool) -> Self {
    Self {
      source,
      line: 0,
      lossy: Vec::new(),
      failed,
    }
  }

  /// 1-based numbers of the lines seen so far that were not valid UTF-8.
  pub fn lossy_lines(&self) -> &[usize] {
    &self.lossy
  }

  /// Whether the file could not be opened or a read error cut it short.
  pub const fn failed(&self) -> bool {
    self.failed
  }
}

impl Iterator for Lines {
  type Item = String;

  fn next(&mut self) -> Option<String> {
    match &mut self.source {
      Source::Open { path, reader } => {
        let mut buf = Vec::new();
        match reader.read_until(b'\n', &mut buf) {
          Ok(0) => {
            self.source = Source::Finished;
            None
          }
          Ok(_) => {
            self.line += 1;
            while matches!(buf.last(), Some(b'\n' | b'\r')) {
              buf.pop();
            }
            Some(match String::from_utf8(buf) {
              Ok(line) => line,
              Err(e) => {
                debug!("Line {} of {} is not valid UTF-8", self.line, path.display());
                self.lossy.push(self.line);
                String::from_utf8_lossy(e.as_bytes()).into_owned()
              }
            })
          }
          Err(e) => {
            warn!("Stopped reading {}: {}", path.display(), e);
            self.failed = true;
            self.source = Source::Finished;
            None
          }
        }
      }
      Source::Unreadable { yielded } => {
        if *yielded {
          None
        } else {
          *yielded = true;
          Some(String::new())
        }
      }
      Source::Finished => None,
    }
  }
}

/// Makes `path` absolute against the current directory without touching the
/// filesystem.
pub fn absolutize(path: &Path) -> PathBuf {
  if path.is_absolute() {
    return path.to_path_buf();
  }
  match std::env::current_dir() {
    Ok(current_dir) => current_dir.join(path),
    Err(_) => path.to_path_buf(),
  }
}

fn read_created_at(path: &Path) -> Option<DateTime<Local>> {
  let metadata = std::fs::metadata(path).ok()?;
  let time = metadata.created().or_else(|_| metadata.modified()).ok()?;
  Some(DateTime::<Local>::from(time))
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;
  use std::fs;

  use tempfile::tempdir;

  use super::*;

  #[test]
  fn test_name_and_extension() {
    let handle = FileHandle::new("/tmp/project/archive.tar.gz");

    assert_eq!(handle.name(), Ok("archive.tar"));
    assert_eq!(handle.extension(), Ok("gz"));
    assert_eq!(handle.full_name(), Ok("archive.tar.gz".to_string()));
    assert_eq!(handle.file_name(), "archive.tar.gz");
  }

  #[test]
  fn test_missing_extension_is_an_error() {
    let handle = FileHandle::new("/tmp/project/Makefile");
    assert!(matches!(handle.extension(), Err(FileNameError::MissingExtension { .. })));

    let trailing_dot = FileHandle::new("/tmp/project/notes.");
    assert!(trailing_dot.name().is_err());
  }

  #[test]
  fn test_equality_is_by_path() {
    let dir = tempdir().expect("create temp dir");
    let file = dir.path().join("a.py");
    fs::write(&file, "x = 1\n").expect("write file");

    let direct = FileHandle::new(&file);
    let dotted = FileHandle::new(dir.path().join(".").join("a.py"));
    assert_eq!(direct, dotted);

    let set: HashSet<FileHandle> = [direct, dotted].into_iter().collect();
    assert_eq!(set.len(), 1);
  }

  #[test]
  fn test_lines_restart_and_strip_terminators() {
    let dir = tempdir().expect("create temp dir");
    let file = dir.path().join("lines.txt");
    fs::write(&file, "one\r\ntwo\nthree").expect("write file");

    let handle = FileHandle::new(&file);
    let first: Vec<String> = handle.lines().collect();
    let second: Vec<String> = handle.lines().collect();

    assert_eq!(first, vec!["one", "two", "three"]);
    assert_eq!(first, second);
  }

  #[test]
  fn test_unreadable_file_yields_one_empty_line() {
    let handle = FileHandle::new("/definitely/not/here.txt");

    assert!(!handle.exists());
    let mut lines = handle.lines();
    assert_eq!(lines.by_ref().collect::<Vec<_>>(), vec![String::new()]);
    assert!(lines.failed());
  }

  #[test]
  fn test_invalid_utf8_lines_are_kept() {
    let dir = tempdir().expect("create temp dir");
    let file = dir.path().join("latin1.txt");
    fs::write(&file, b"caf\xe9\nTYPE:c\n").expect("write file");

    let handle = FileHandle::new(&file);
    let mut lines = handle.lines();
    let collected: Vec<String> = lines.by_ref().collect();

    assert_eq!(collected, vec!["caf\u{FFFD}".to_string(), "TYPE:c".to_string()]);
    assert_eq!(lines.lossy_lines(), [1]);
    assert!(!lines.failed());
  }

  #[test]
  fn test_created_at_for_existing_file() {
    let dir = tempdir().expect("create temp dir");
    let file = dir.path().join("dated.rs");
    fs::write(&file, "").expect("write file");

    let handle = FileHandle::new(&file);
    assert!(handle.exists());
    // Creation time is best-effort, but the modification time fallback is always present on
    // the filesystems used for tests.
    assert!(handle.formatted_date().is_some());
  }
}
