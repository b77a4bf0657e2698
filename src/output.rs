//! # Output Module
//!
//! This module centralizes all user-facing output for headstamp.
//! It provides consistent formatting, colors, and symbols for terminal output.
//!
//! ## Design Goals
//!
//! - **Informative**: Show actionable information without requiring flags
//! - **Scannable**: Use formatting to make output easy to parse visually
//! - **Progressive**: More detail with `-v`, silence with `-q`
//! - **Scriptable**: Keep stdout predictable for piping/automation

use std::path::{Path, PathBuf};

use owo_colors::{OwoColorize, Stream};

use crate::logging::{is_quiet, is_verbose};
use crate::processor::{FileFailure, ProcessingSummary};
use crate::registry::TemplateRegistry;

/// Symbols used in output
pub mod symbols {
  /// Success
  pub const SUCCESS: &str = "\u{2713}"; // ✓
  /// Failure
  pub const FAILURE: &str = "\u{2717}"; // ✗
  /// Dry-run preview
  pub const PREVIEW: &str = "~";
}

/// Maximum number of files to show in the default output before truncating
const DEFAULT_FILE_LIST_LIMIT: usize = 20;

/// Print the initial "Stamping N files..." message.
pub fn print_start_message(file_count: usize, dry_run: bool) {
  if is_quiet() {
    return;
  }

  let verb = if dry_run { "Previewing" } else { "Stamping" };
  println!("{} {} {}...", verb, file_count, files_word(file_count));
}

/// Print the list of files that received a header (or would have, in a dry
/// run).
pub fn print_stamped_files(files: &[PathBuf], root: Option<&Path>, dry_run: bool) {
  if is_quiet() || files.is_empty() {
    return;
  }

  let count = files.len();
  let header = if dry_run {
    format!(
      "{} Would add header to {} {}:",
      symbols::PREVIEW.if_supports_color(Stream::Stdout, |s| s.cyan()),
      count,
      files_word(count)
    )
  } else {
    format!(
      "{} Added header to {} {}:",
      symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
      count,
      files_word(count)
    )
  };
  println!("{}", header);

  print_limited(files.iter().map(|path| make_relative_path(path, root)));
}

/// Print the files that could not be rewritten, with the reason.
///
/// In quiet mode only the paths are printed, one per line.
pub fn print_failed_files(failures: &[FileFailure], root: Option<&Path>) {
  if failures.is_empty() {
    return;
  }

  if is_quiet() {
    for failure in failures {
      println!("{}", make_relative_path(&failure.path, root));
    }
    return;
  }

  let count = failures.len();
  println!(
    "{} {} {} could not be stamped:",
    symbols::FAILURE.if_supports_color(Stream::Stdout, |s| s.red()),
    count,
    files_word(count)
  );
  for failure in failures {
    println!(
      "  {} ({})",
      make_relative_path(&failure.path, root),
      failure.error.if_supports_color(Stream::Stdout, |e| e.dimmed())
    );
  }
}

/// Print the processing summary.
///
/// Format: "Summary: X stamped, Y failed"
/// In verbose mode, also shows timing.
pub fn print_summary(summary: &ProcessingSummary, dry_run: bool) {
  if is_quiet() {
    return;
  }

  let done_count = if dry_run {
    summary.previewed.len()
  } else {
    summary.stamped.len()
  };
  let failed_count = summary.failed.len();

  let done_str = done_count.if_supports_color(Stream::Stdout, |s| s.cyan());
  let failed_str = if failed_count > 0 {
    failed_count.if_supports_color(Stream::Stdout, |s| s.red()).to_string()
  } else {
    failed_count.if_supports_color(Stream::Stdout, |s| s.cyan()).to_string()
  };
  let verb = if dry_run { "previewed" } else { "stamped" };

  let mut summary_line = format!("Summary: {} {}, {} failed", done_str, verb, failed_str);

  if is_verbose() {
    summary_line.push_str(&format!(" ({:.2}s)", summary.processing_time.as_secs_f64()));
  }

  println!("{}", summary_line);
}

/// Print a hint for the user about what to do next.
pub fn print_hint(message: &str) {
  if is_quiet() {
    return;
  }

  println!("{}", message.if_supports_color(Stream::Stdout, |s| s.yellow()));
}

/// Print the registered templates and the extensions each one serves.
///
/// This is the requested output of `--list-templates`, so it is printed even
/// in quiet mode.
pub fn print_registry(registry: &TemplateRegistry) {
  println!("Templates in {}:", registry.template_dir().display());

  if registry.is_empty() {
    println!("  (none)");
    return;
  }

  for (extension, template) in registry.extensions() {
    let label = format!(".{:<10}", extension);
    println!("  {} {}", label.if_supports_color(Stream::Stdout, |s| s.cyan()), template);
  }

  let unused: Vec<String> = registry
    .templates()
    .filter(|template| template.extensions().is_empty())
    .map(ToString::to_string)
    .collect();
  if !unused.is_empty() {
    println!(
      "  {} {}",
      "no TYPE directive:".if_supports_color(Stream::Stdout, |s| s.dimmed()),
      unused.join(", ")
    );
  }
}

fn print_limited(lines: impl ExactSizeIterator<Item = String>) {
  let count = lines.len();
  let show_all = is_verbose();
  let limit = if show_all { count } else { DEFAULT_FILE_LIST_LIMIT };

  for line in lines.take(limit) {
    println!("  {}", line);
  }

  if !show_all && count > limit {
    let remaining = count - limit;
    println!(
      "  {} ... and {} more (use -v to see all)",
      "".if_supports_color(Stream::Stdout, |s| s.dimmed()),
      remaining
    );
  }
}

const fn files_word(count: usize) -> &'static str {
  if count == 1 { "file" } else { "files" }
}

/// Make a path relative to `root` for display.
fn make_relative_path(path: &Path, root: Option<&Path>) -> String {
  if let Some(root) = root {
    path
      .strip_prefix(root)
      .map(|p| p.to_string_lossy().to_string())
      .unwrap_or_else(|_| path.to_string_lossy().to_string())
  } else {
    path.to_string_lossy().to_string()
  }
}
