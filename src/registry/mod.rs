//! # Registry Module
//!
//! The template registry maps file extensions to the [`Template`] that stamps
//! them. It is built by scanning a template directory, cached in a hidden
//! snapshot file inside that directory, and reconciled against the directory
//! lazily: only when a lookup misses or hits a template whose file is gone.
//!
//! - [`TemplateRegistry`] owns the known templates and the extension index
//! - [`ReconcileReport`] describes what a reconciliation pass changed
//! - [`snapshot`] holds the persisted, versioned JSON form
//!
//! ## Example
//!
//! ```rust,no_run
//! use headstamp::registry::TemplateRegistry;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut registry = TemplateRegistry::load("templates")?;
//! if let Some(template) = registry.search("py")? {
//!   println!("python files use {}", template);
//! }
//! # Ok(())
//! # }
//! ```

pub mod snapshot;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

pub use self::snapshot::{SNAPSHOT_FILE_NAME, SNAPSHOT_VERSION, Snapshot, TemplateRecord};
use crate::templates::Template;

/// Errors raised while loading, reconciling or persisting the registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
  /// The template directory is missing or cannot be listed.
  #[error("Template directory '{path}' cannot be read: {source}")]
  DirectoryUnreadable { path: PathBuf, source: std::io::Error },

  /// The snapshot file exists but cannot be read.
  #[error("Failed to read template registry '{path}': {source}")]
  SnapshotRead { path: PathBuf, source: std::io::Error },

  /// The snapshot file is not a valid registry snapshot.
  #[error(
    "Template registry '{path}' is corrupt: {source}\n  → Fix: run again with --rebuild-registry, or delete the file"
  )]
  SnapshotCorrupt { path: PathBuf, source: serde_json::Error },

  /// The snapshot was written by an incompatible version.
  #[error(
    "Template registry '{path}' has version {found}, expected {expected}\n  → Fix: run again with --rebuild-registry"
  )]
  SnapshotVersion { path: PathBuf, found: u32, expected: u32 },

  /// The snapshot maps an extension to a template it does not list.
  #[error(
    "Template registry '{path}' maps '{extension}' to unknown template '{file}'\n  → Fix: run again with --rebuild-registry"
  )]
  SnapshotInconsistent {
    path: PathBuf,
    extension: String,
    file: String,
  },

  /// The snapshot could not be written.
  #[error("Failed to write template registry '{path}': {source}")]
  SnapshotWrite { path: PathBuf, source: std::io::Error },
}

/// Changes applied by one reconciliation pass, as template file names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
  pub added: Vec<String>,
  pub removed: Vec<String>,
  /// Always empty: templates are re-read whenever a registry is loaded, so
  /// content changes show up in the next session.
  pub modified: Vec<String>,
}

impl ReconcileReport {
  pub fn is_empty(&self) -> bool {
    self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
  }
}

/// Outcome of an index lookup before any reconciliation.
enum Lookup {
  Hit,
  Stale,
  Miss,
}

/// Durable extension → template index for one template directory.
///
/// Templates are keyed by file name. The extension index is always derived
/// from the known templates in file-name order, so when two templates claim
/// the same extension the lexicographically greatest file name wins.
#[derive(Debug)]
pub struct TemplateRegistry {
  template_dir: PathBuf,
  templates: BTreeMap<String, Template>,
  extensions: BTreeMap<String, String>,
  /// One-shot guard: a plain miss triggers at most one reconciliation
  reconciled_on_miss: bool,
  reconciliations: usize,
}

impl TemplateRegistry {
  /// Loads the registry for `dir`.
  ///
  /// Uses the snapshot when one exists. Otherwise every visible file in `dir`
  /// is parsed as a template and the resulting index is persisted.
  ///
  /// # Errors
  ///
  /// Returns an error if:
  /// - `dir` is not a readable directory
  /// - The snapshot exists but is unreadable, corrupt, or inconsistent
  /// - A fresh snapshot cannot be written
  pub fn load(dir: impl AsRef<Path>) -> Result<Self, RegistryError> {
    let dir = dir.as_ref();
    let template_dir = fs::canonicalize(dir).map_err(|e| RegistryError::DirectoryUnreadable {
      path: dir.to_path_buf(),
      source: e,
    })?;

    if !template_dir.is_dir() {
      return Err(RegistryError::DirectoryUnreadable {
        path: template_dir,
        source: std::io::Error::other("not a directory"),
      });
    }

    let mut registry = Self {
      template_dir,
      templates: BTreeMap::new(),
      extensions: BTreeMap::new(),
      reconciled_on_miss: false,
      reconciliations: 0,
    };

    match Snapshot::read(&registry.snapshot_path())? {
      Some(snapshot) => {
        debug!("Loaded template registry from {}", registry.snapshot_path().display());
        registry.restore(snapshot);
      }
      None => {
        debug!("No template registry in {}, scanning", registry.template_dir.display());
        for name in registry.list_visible()? {
          registry.register(&name);
        }
        registry.rebuild_index();
        registry.persist()?;
      }
    }

    Ok(registry)
  }

  /// Discards any snapshot in `dir` and builds the registry from a fresh scan.
  pub fn rebuild(dir: impl AsRef<Path>) -> Result<Self, RegistryError> {
    let snapshot_path = dir.as_ref().join(SNAPSHOT_FILE_NAME);
    match fs::remove_file(&snapshot_path) {
      Ok(()) => debug!("Removed template registry {}", snapshot_path.display()),
      Err(e) if e.kind() == ErrorKind::NotFound => {}
      Err(e) => {
        return Err(RegistryError::SnapshotWrite {
          path: snapshot_path,
          source: e,
        });
      }
    }
    Self::load(dir)
  }

  /// Finds the template for `extension` (a leading `.` is ignored).
  ///
  /// A hit whose template file has disappeared triggers a reconciliation and a
  /// second lookup. A plain miss triggers a reconciliation only the first time
  /// it happens on this registry; later misses return `None` straight away.
  pub fn search(&mut self, extension: &str) -> Result<Option<&Template>, RegistryError> {
    let extension = extension.trim_start_matches('.');

    let state = match self.lookup(extension) {
      Some(template) if template.file().exists() => Lookup::Hit,
      Some(_) => Lookup::Stale,
      None => Lookup::Miss,
    };

    match state {
      Lookup::Hit => {}
      Lookup::Stale => {
        debug!("Template for .{} is no longer readable, reconciling", extension);
        self.reconcile()?;
        self.reconciled_on_miss = true;
      }
      Lookup::Miss if !self.reconciled_on_miss => {
        debug!("No template for .{}, reconciling", extension);
        self.reconcile()?;
        self.reconciled_on_miss = true;
      }
      Lookup::Miss => {
        trace!("No template for .{} (registry already reconciled)", extension);
        return Ok(None);
      }
    }

    Ok(self.lookup(extension).filter(|template| template.file().exists()))
  }

  /// Brings the registry in line with the template directory and persists it.
  ///
  /// New visible files are parsed and indexed; templates whose files left the
  /// directory are dropped together with their extensions. Running it again
  /// without filesystem changes changes nothing.
  pub fn reconcile(&mut self) -> Result<ReconcileReport, RegistryError> {
    self.reconciliations += 1;
    let live = self.list_visible()?;

    let added: Vec<String> = live
      .iter()
      .filter(|name| !self.templates.contains_key(*name))
      .cloned()
      .collect();
    let removed: Vec<String> = self
      .templates
      .keys()
      .filter(|name| !live.contains(*name))
      .cloned()
      .collect();
    let modified = self.detect_modified(&live);

    let mut report = ReconcileReport::default();
    for name in added {
      if self.register(&name) {
        report.added.push(name);
      }
    }
    for name in removed {
      self.templates.remove(&name);
      report.removed.push(name);
    }
    report.modified = modified;

    self.rebuild_index();
    self.persist()?;

    if report.is_empty() {
      trace!("Template registry already up to date");
    } else {
      debug!(
        "Reconciled template registry: added {:?}, removed {:?}",
        report.added, report.removed
      );
    }

    Ok(report)
  }

  /// Writes the current state to the snapshot file.
  pub fn persist(&self) -> Result<(), RegistryError> {
    self.snapshot().write(&self.snapshot_path())
  }

  /// The registry state in its serialized form.
  pub fn snapshot(&self) -> Snapshot {
    let templates = self
      .templates
      .iter()
      .map(|(name, template)| TemplateRecord {
        file: name.clone(),
        extensions: template.extensions().to_vec(),
        include_pattern: template.include_pattern().map(str::to_string),
        include_before_header: template.include_before_header(),
      })
      .collect();

    Snapshot {
      version: SNAPSHOT_VERSION,
      templates,
      extensions: self.extensions.clone(),
    }
  }

  /// The canonical template directory.
  pub fn template_dir(&self) -> &Path {
    &self.template_dir
  }

  /// Location of the snapshot file.
  pub fn snapshot_path(&self) -> PathBuf {
    self.template_dir.join(SNAPSHOT_FILE_NAME)
  }

  /// Known templates in file-name order.
  pub fn templates(&self) -> impl Iterator<Item = &Template> {
    self.templates.values()
  }

  /// Indexed extensions with the template each resolves to, in extension
  /// order.
  pub fn extensions(&self) -> impl Iterator<Item = (&str, &Template)> {
    self
      .extensions
      .iter()
      .filter_map(|(extension, name)| self.templates.get(name).map(|template| (extension.as_str(), template)))
  }

  /// Number of reconciliation passes run by this registry instance.
  pub const fn reconciliations(&self) -> usize {
    self.reconciliations
  }

  pub fn len(&self) -> usize {
    self.templates.len()
  }

  pub fn is_empty(&self) -> bool {
    self.templates.is_empty()
  }

  fn lookup(&self, extension: &str) -> Option<&Template> {
    self
      .extensions
      .get(extension)
      .and_then(|name| self.templates.get(name))
  }

  fn restore(&mut self, snapshot: Snapshot) {
    for record in snapshot.templates {
      let template = Template::from_parts(
        self.template_dir.join(&record.file),
        record.extensions,
        record.include_pattern,
        record.include_before_header,
      );
      self.templates.insert(record.file, template);
    }
    self.extensions = snapshot.extensions;
  }

  /// Parses and stores the template `name`. Unreadable files are skipped.
  fn register(&mut self, name: &str) -> bool {
    let template = Template::parse(self.template_dir.join(name));
    if !template.file().exists() {
      warn!("Skipping unreadable template {}", template.file());
      return false;
    }
    trace!("Registered template {} for {:?}", name, template.extensions());
    self.templates.insert(name.to_string(), template);
    true
  }

  /// Hook for detecting edited templates. Bodies are read when the registry
  /// loads and metadata changes are not tracked, so nothing is ever reported.
  fn detect_modified(&self, _live: &BTreeSet<String>) -> Vec<String> {
    Vec::new()
  }

  fn rebuild_index(&mut self) {
    let mut index = BTreeMap::new();
    for (name, template) in &self.templates {
      for extension in template.extensions() {
        if let Some(previous) = index.insert(extension.clone(), name.clone()) {
          warn!(
            "Extension '{}' is claimed by both {} and {}; using {}",
            extension, previous, name, name
          );
        }
      }
    }
    self.extensions = index;
  }

  /// File names of the visible regular files in the template directory.
  fn list_visible(&self) -> Result<BTreeSet<String>, RegistryError> {
    let entries = fs::read_dir(&self.template_dir).map_err(|e| RegistryError::DirectoryUnreadable {
      path: self.template_dir.clone(),
      source: e,
    })?;

    let mut names = BTreeSet::new();
    for entry in entries {
      let entry = entry.map_err(|e| RegistryError::DirectoryUnreadable {
        path: self.template_dir.clone(),
        source: e,
      })?;

      let Some(name) = entry.file_name().to_str().map(str::to_string) else {
        debug!("Skipping non UTF-8 template name: {}", entry.path().display());
        continue;
      };
      if name.starts_with('.') || !entry.path().is_file() {
        continue;
      }
      names.insert(name);
    }

    Ok(names)
  }
}
