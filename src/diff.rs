//! # Diff Module
//!
//! This module renders the difference between a file's current content and the
//! content it would have after stamping. It backs `--dry-run --show-diff` and
//! `--save-diff`.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};
use similar::{ChangeTag, TextDiff};

/// Number of unchanged lines shown around each change.
const CONTEXT_LINES: usize = 3;

/// Manages diff rendering for header changes.
///
/// Diffs can be printed to stderr with colorization, appended to a file, or
/// both. All diffs of one run go into the same file.
#[derive(Debug, Clone)]
pub struct DiffManager {
  /// Whether to print diffs to stderr
  pub show_diff: bool,

  /// File that collects the diffs of a run
  pub save_diff_path: Option<PathBuf>,
}

impl DiffManager {
  pub fn new(show_diff: bool, save_diff_path: Option<PathBuf>) -> Self {
    Self {
      show_diff,
      save_diff_path,
    }
  }

  /// Returns `true` if this manager would produce any output.
  pub const fn is_active(&self) -> bool {
    self.show_diff || self.save_diff_path.is_some()
  }

  /// Truncates the save file so a run does not append to the previous run's
  /// diffs.
  pub fn init(&self) -> Result<()> {
    if let Some(ref path) = self.save_diff_path {
      File::create(path).with_context(|| format!("Failed to create diff file {}", path.display()))?;
    }
    Ok(())
  }

  /// Displays and/or saves a unified diff between `original` and `new`.
  pub fn display_diff(&self, path: &Path, original: &str, new: &str) -> Result<()> {
    let diff = TextDiff::from_lines(original, new);
    let name = path.display().to_string();

    if self.show_diff {
      eprintln!("Diff for {}:", name);
      for hunk in diff.unified_diff().context_radius(CONTEXT_LINES).iter_hunks() {
        eprintln!("{}", hunk.header().if_supports_color(Stream::Stderr, |h| h.cyan()));
        for change in hunk.iter_changes() {
          let line = format!("{}{}", sign(change.tag()), change);
          let line = line.trim_end_matches('\n');
          match change.tag() {
            ChangeTag::Delete => eprintln!("{}", line.if_supports_color(Stream::Stderr, |l| l.red())),
            ChangeTag::Insert => eprintln!("{}", line.if_supports_color(Stream::Stderr, |l| l.green())),
            ChangeTag::Equal => eprintln!("{}", line),
          }
        }
      }
      eprintln!();
    }

    if let Some(ref diff_path) = self.save_diff_path {
      let content = diff
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .header(&name, &name)
        .to_string();

      let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(diff_path)
        .with_context(|| format!("Failed to open diff file {}", diff_path.display()))?;
      file
        .write_all(content.as_bytes())
        .with_context(|| format!("Failed to write diff file {}", diff_path.display()))?;
    }

    Ok(())
  }
}

const fn sign(tag: ChangeTag) -> &'static str {
  match tag {
    ChangeTag::Delete => "-",
    ChangeTag::Insert => "+",
    ChangeTag::Equal => " ",
  }
}
