//! # Header Writer Module
//!
//! Inserts a rendered header into a target file.
//!
//! The new content is streamed into a hidden temporary file next to the target
//! and renamed over it only once everything has been written, so a failure at
//! any step leaves the original file exactly as it was.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::templates::{HeaderRequest, RenderError, Template};

/// Errors raised while rewriting a target file. The target is untouched in
/// every case.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
  #[error("Cannot stamp '{path}': {source}")]
  Render { path: PathBuf, source: RenderError },

  #[error("Failed to open '{path}': {source}")]
  OpenTarget { path: PathBuf, source: io::Error },

  #[error("Failed to create a temporary file in '{dir}': {source}")]
  TempFile { dir: PathBuf, source: io::Error },

  #[error("Failed to write new content for '{path}': {source}")]
  Write { path: PathBuf, source: io::Error },

  #[error("Failed to replace '{path}': {source}")]
  Persist { path: PathBuf, source: io::Error },
}

/// Content of a target before and after stamping, produced without touching
/// the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
  pub original: String,
  pub stamped: String,
}

/// Writes rendered headers into target files.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderWriter;

impl HeaderWriter {
  pub const fn new() -> Self {
    Self
  }

  /// Renders `template` for `request` and inserts it into the request's
  /// target file in place.
  ///
  /// # Errors
  ///
  /// Returns an error if the template cannot be rendered, the target cannot be
  /// read, or the replacement cannot be written or renamed into place. The target is left unmodified.
  pub fn apply(&self, template: &Template, request: &HeaderRequest) -> Result<(), WriteError> {
    let target = request.file().path();
    let header = template.render(request).map_err(|e| WriteError::Render {
      path: target.to_path_buf(),
      source: e,
    })?;

    replace_atomically(target, |source, sink| insert_header(template, &header, source, sink))?;

    debug!("Stamped {} with {}", target.display(), template);
    Ok(())
  }

  /// Computes what [`apply`](Self::apply) would write, without writing it.
  pub fn preview(&self, template: &Template, request: &HeaderRequest) -> Result<Preview, WriteError> {
    let target = request.file().path();
    let header = template.render(request).map_err(|e| WriteError::Render {
      path: target.to_path_buf(),
      source: e,
    })?;

    let mut original = Vec::new();
    File::open(target)
      .and_then(|mut file| file.read_to_end(&mut original))
      .map_err(|e| WriteError::OpenTarget {
        path: target.to_path_buf(),
        source: e,
      })?;

    let mut stamped = Vec::new();
    insert_header(template, &header, original.as_slice(), &mut stamped).map_err(|e| WriteError::Write {
      path: target.to_path_buf(),
      source: e,
    })?;

    Ok(Preview {
      original: String::from_utf8_lossy(&original).into_owned(),
      stamped: String::from_utf8_lossy(&stamped).into_owned(),
    })
  }
}

/// Streams `header` and the original content from `source` into `sink`.
///
/// Without include ordering the header goes first. Otherwise leading lines
/// that contain the include pattern or are blank are copied first and the
/// header goes in front of the first other line; a file made only of such
/// lines gets the header appended. Content is copied byte for byte.
pub fn insert_header<R: BufRead, W: Write>(
  template: &Template,
  header: &str,
  mut source: R,
  sink: &mut W,
) -> io::Result<()> {
  if !template.include_before_header() {
    sink.write_all(header.as_bytes())?;
    io::copy(&mut source, sink)?;
    return Ok(());
  }

  let pattern = template.include_pattern().filter(|pattern| !pattern.is_empty());
  let mut line = Vec::new();
  let mut ends_with_newline = true;

  loop {
    line.clear();
    if source.read_until(b'\n', &mut line)? == 0 {
      break;
    }
    ends_with_newline = line.ends_with(b"\n");

    let text = String::from_utf8_lossy(&line);
    let is_include = pattern.is_some_and(|pattern| text.contains(pattern));
    if !is_include && !text.trim().is_empty() {
      sink.write_all(header.as_bytes())?;
      sink.write_all(&line)?;
      io::copy(&mut source, sink)?;
      return Ok(());
    }

    trace!("Keeping line above header: {}", text.trim_end());
    sink.write_all(&line)?;
  }

  if !ends_with_newline {
    sink.write_all(b"\n")?;
  }
  sink.write_all(header.as_bytes())
}

/// Rewrites `target` through a temporary sibling file.
///
/// `fill` receives the original content and the temporary file. Both handles
/// are closed before the temporary file is renamed over `target`; on any
/// error the temporary file is deleted instead.
fn replace_atomically<F>(target: &Path, fill: F) -> Result<(), WriteError>
where
  F: FnOnce(&mut BufReader<File>, &mut BufWriter<&File>) -> io::Result<()>,
{
  let source = File::open(target).map_err(|e| WriteError::OpenTarget {
    path: target.to_path_buf(),
    source: e,
  })?;
  let permissions = source.metadata().ok().map(|metadata| metadata.permissions());

  let dir = target.parent().unwrap_or_else(|| Path::new("."));
  let temp = tempfile::Builder::new()
    .prefix(".")
    .suffix(".bak")
    .rand_bytes(6)
    .tempfile_in(dir)
    .map_err(|e| WriteError::TempFile {
      dir: dir.to_path_buf(),
      source: e,
    })?;

  let write_error = |source: io::Error| WriteError::Write {
    path: target.to_path_buf(),
    source,
  };

  {
    let mut reader = BufReader::new(source);
    let mut writer = BufWriter::new(temp.as_file());
    fill(&mut reader, &mut writer).map_err(write_error)?;
    writer.flush().map_err(write_error)?;
  }

  if let Some(permissions) = permissions {
    temp.as_file().set_permissions(permissions).map_err(write_error)?;
  }

  temp.persist(target).map_err(|e| WriteError::Persist {
    path: target.to_path_buf(),
    source: e.error,
  })?;

  Ok(())
}

#[cfg(test)]
mod tests {
  use std::fs;

  use tempfile::{TempDir, tempdir};

  use super::*;

  fn template_in(dir: &TempDir, content: &str) -> Template {
    let path = dir.path().join("header.tpl");
    fs::write(&path, content).expect("write template");
    Template::parse(path)
  }

  fn stamp(template: &Template, header: &str, original: &str) -> String {
    let mut out = Vec::new();
    insert_header(template, header, original.as_bytes(), &mut out).expect("insert header");
    String::from_utf8(out).expect("utf-8 output")
  }

  #[test]
  fn test_header_goes_first_without_include_ordering() {
    let dir = tempdir().expect("create temp dir");
    let template = template_in(&dir, "TYPE:py\n---START\n---END\n");

    assert_eq!(stamp(&template, "H\n", "a\nb"), "H\na\nb");
  }

  #[test]
  fn test_includes_and_blank_lines_stay_above_header() {
    let dir = tempdir().expect("create temp dir");
    let template = template_in(&dir, "TYPE:c\nINCTYPE:#include\n<INC>\n---START\n---END\n");

    let original = "#include <stdio.h>\n\n#include \"x.h\"\nint main() {}\n#include <late.h>\n";
    let expected = "#include <stdio.h>\n\n#include \"x.h\"\nH\nint main() {}\n#include <late.h>\n";
    assert_eq!(stamp(&template, "H\n", original), expected);
  }

  #[test]
  fn test_header_appended_when_only_includes() {
    let dir = tempdir().expect("create temp dir");
    let template = template_in(&dir, "TYPE:py\nINCTYPE:import\n<INC>\n---START\n---END\n");

    assert_eq!(stamp(&template, "H\n", "import os"), "import os\nH\n");
    assert_eq!(stamp(&template, "H\n", ""), "H\n");
  }

  #[test]
  fn test_missing_include_pattern_matches_nothing() {
    let dir = tempdir().expect("create temp dir");
    let template = template_in(&dir, "TYPE:py\n<INC>\n---START\n---END\n");

    assert_eq!(stamp(&template, "H\n", "\n  \nimport os\n"), "\n  \nH\nimport os\n");
  }

  #[test]
  fn test_failed_fill_leaves_target_untouched() {
    let dir = tempdir().expect("create temp dir");
    let target = dir.path().join("keep.py");
    fs::write(&target, "print(1)\n").expect("write target");

    let result = replace_atomically(&target, |_, sink| {
      sink.write_all(b"partial")?;
      Err(io::Error::other("simulated write failure"))
    });

    assert!(matches!(result, Err(WriteError::Write { .. })));
    assert_eq!(fs::read_to_string(&target).expect("read target"), "print(1)\n");
    let leftovers: Vec<_> = fs::read_dir(dir.path())
      .expect("list dir")
      .filter_map(Result::ok)
      .filter(|entry| entry.file_name().to_string_lossy().ends_with(".bak"))
      .collect();
    assert!(leftovers.is_empty());
  }

  #[test]
  fn test_unrenderable_template_leaves_target_untouched() {
    let dir = tempdir().expect("create temp dir");
    let path = dir.path().join("latin1.tpl");
    fs::write(&path, b"TYPE:py\n---START\n# (c) Jos\xe9\n# Author: <USERNAME>\n---END\n").expect("write template");
    let template = Template::parse(&path);
    let target = dir.path().join("a.py");
    fs::write(&target, "print(1)\n").expect("write target");

    let request = HeaderRequest::new("Ada", "ada@example.com", &target);
    let result = HeaderWriter::new().apply(&template, &request);

    assert!(matches!(
      result,
      Err(WriteError::Render {
        source: RenderError::InvalidEncoding { line: 3, .. },
        ..
      })
    ));
    assert_eq!(fs::read_to_string(&target).expect("read target"), "print(1)\n");
  }

  #[cfg(unix)]
  #[test]
  fn test_permissions_are_preserved() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().expect("create temp dir");
    let template = template_in(&dir, "TYPE:sh\n---START\n# header\n---END\n");
    let target = dir.path().join("run.sh");
    fs::write(&target, "echo hi\n").expect("write target");
    fs::set_permissions(&target, fs::Permissions::from_mode(0o755)).expect("chmod");

    let request = HeaderRequest::new("Ada", "ada@example.com", &target);
    HeaderWriter::new().apply(&template, &request).expect("apply");

    let mode = fs::metadata(&target).expect("metadata").permissions().mode();
    assert_eq!(mode & 0o777, 0o755);
    assert_eq!(fs::read_to_string(&target).expect("read"), "# header\necho hi\n");
  }
}
