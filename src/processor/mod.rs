//! # Processor Module
//!
//! This module drives a stamping session: it resolves every target file to a
//! template through the [`TemplateRegistry`] and writes (or previews) the
//! rendered header.
//!
//! The module is organized into:
//! - [`header_writer`] - Header insertion and the atomic file rewrite
//!
//! The [`Processor`] struct is the main entry point. It owns the registry for
//! the duration of a run so lookups can reconcile and persist it.

pub mod header_writer;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub use header_writer::{HeaderWriter, Preview, WriteError};
use tracing::{debug, warn};

use crate::config::Identity;
use crate::diff::DiffManager;
use crate::file_handle::{FileHandle, FileNameError};
use crate::registry::{RegistryError, TemplateRegistry};
use crate::templates::HeaderRequest;
use crate::verbose_log;

/// Errors that end a stamping run.
///
/// Failures to rewrite a single file are not in here: those are collected in
/// [`ProcessingSummary::failed`] and the run continues.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
  #[error("No template found for extension '.{extension}' (needed by {path})")]
  NoTemplate { extension: String, path: PathBuf },

  #[error(transparent)]
  FileName(#[from] FileNameError),

  #[error(transparent)]
  Registry(#[from] RegistryError),
}

/// Behavior flags for a [`Processor`].
#[derive(Debug, Clone, Default)]
pub struct ProcessorOptions {
  /// Compute headers without writing them
  pub dry_run: bool,

  /// Diff output for dry runs
  pub diff_manager: Option<DiffManager>,
}

/// What happened to a file that was handled successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
  Stamped,
  Previewed,
}

/// A file that could not be rewritten.
#[derive(Debug)]
pub struct FileFailure {
  pub path: PathBuf,
  pub error: WriteError,
}

/// Result of one [`Processor::process`] call.
#[derive(Debug, Default)]
pub struct ProcessingSummary {
  pub stamped: Vec<PathBuf>,
  pub previewed: Vec<PathBuf>,
  pub failed: Vec<FileFailure>,
  pub processing_time: Duration,
}

impl ProcessingSummary {
  /// Number of distinct files handled, including failures.
  pub fn total(&self) -> usize {
    self.stamped.len() + self.previewed.len() + self.failed.len()
  }

  pub fn has_failures(&self) -> bool {
    !self.failed.is_empty()
  }

  fn record(&mut self, path: PathBuf, outcome: FileOutcome) {
    match outcome {
      FileOutcome::Stamped => self.stamped.push(path),
      FileOutcome::Previewed => self.previewed.push(path),
    }
  }
}

/// A stamping session over one template registry.
pub struct Processor {
  registry: TemplateRegistry,
  identity: Identity,
  writer: HeaderWriter,
  dry_run: bool,
  diff_manager: Option<DiffManager>,
}

impl Processor {
  pub fn new(registry: TemplateRegistry, identity: Identity, options: ProcessorOptions) -> Self {
    Self {
      registry,
      identity,
      writer: HeaderWriter::new(),
      dry_run: options.dry_run,
      diff_manager: options.diff_manager,
    }
  }

  /// Stamps every file in `files`.
  ///
  /// Paths naming the same file are handled once, in order of first
  /// appearance.
  ///
  /// # Errors
  ///
  /// Returns an error, stopping the run, if:
  /// - A file name has no extension
  /// - No template serves a file's extension
  /// - The registry cannot be reconciled or persisted
  ///
  /// A file that cannot be rewritten is recorded as failed and does not stop
  /// the run.
  pub fn process(&mut self, files: &[PathBuf]) -> Result<ProcessingSummary, ProcessError> {
    let start = Instant::now();
    let mut summary = ProcessingSummary::default();

    for handle in unique_handles(files) {
      let path = handle.path().to_path_buf();
      match self.process_file(handle)? {
        Ok(outcome) => summary.record(path, outcome),
        Err(error) => {
          warn!("{}", error);
          summary.failed.push(FileFailure { path, error });
        }
      }
    }

    summary.processing_time = start.elapsed();
    debug!(
      "Processed {} files in {:.2}s",
      summary.total(),
      summary.processing_time.as_secs_f64()
    );
    Ok(summary)
  }

  /// The registry, including any reconciliation done during this session.
  pub const fn registry(&self) -> &TemplateRegistry {
    &self.registry
  }

  /// Handles a single file. The outer result is fatal for the run; the inner
  /// one only for this file.
  fn process_file(&mut self, handle: FileHandle) -> Result<Result<FileOutcome, WriteError>, ProcessError> {
    let extension = handle.extension()?.to_string();
    let template = self
      .registry
      .search(&extension)?
      .cloned()
      .ok_or_else(|| ProcessError::NoTemplate {
        extension: extension.clone(),
        path: handle.path().to_path_buf(),
      })?;

    debug!("Using template {} for {}", template, handle);
    let request = HeaderRequest::for_file(&self.identity.username, &self.identity.email, handle);

    if self.dry_run {
      let preview = match self.writer.preview(&template, &request) {
        Ok(preview) => preview,
        Err(e) => return Ok(Err(e)),
      };
      self.show_preview(request.file().path(), &preview);
      return Ok(Ok(FileOutcome::Previewed));
    }

    Ok(self.writer.apply(&template, &request).map(|()| {
      verbose_log!("Added header to: {}", request.file().path().display());
      FileOutcome::Stamped
    }))
  }

  fn show_preview(&self, path: &Path, preview: &Preview) {
    match self.diff_manager {
      Some(ref diff_manager) if diff_manager.is_active() => {
        if let Err(e) = diff_manager.display_diff(path, &preview.original, &preview.stamped) {
          warn!("Failed to render diff for {}: {:#}", path.display(), e);
        }
      }
      _ => verbose_log!("Would add header to: {}", path.display()),
    }
  }
}

/// The distinct files named by `files`, in order of first appearance, as
/// absolute paths.
pub fn unique_targets(files: &[PathBuf]) -> Vec<PathBuf> {
  unique_handles(files)
    .iter()
    .map(|handle| handle.path().to_path_buf())
    .collect()
}

/// Builds one handle per distinct file, keeping first-appearance order.
fn unique_handles(files: &[PathBuf]) -> Vec<FileHandle> {
  let mut seen = HashSet::new();
  files
    .iter()
    .map(FileHandle::new)
    .filter(|handle| seen.insert(handle.clone()))
    .collect()
}
