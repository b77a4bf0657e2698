#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use assert_cmd::prelude::*;

/// Python template that keeps imports above the header.
pub const PYTHON_TEMPLATE: &str = concat!(
  "TYPE:py\n",
  "INCTYPE:import\n",
  "<INC>\n",
  "---START\n",
  "# <FILENAME>\n",
  "# Author: <USERNAME> <<EMAIL>>\n",
  "---END\n",
);

/// Go template with the header always on top.
pub const GO_TEMPLATE: &str = concat!(
  "TYPE:go\n",
  "---START\n",
  "// <FILENAME> by <USERNAME>\n",
  "---END\n",
);

/// Writes `content` to `dir/name`, creating `dir` if needed.
pub fn write_file(dir: &Path, name: &str, content: &str) -> Result<PathBuf> {
  fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
  let path = dir.join(name);
  fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
  Ok(path)
}

/// Creates `root/templates` holding the given `(name, content)` templates.
pub fn template_dir(root: &Path, templates: &[(&str, &str)]) -> Result<PathBuf> {
  let dir = root.join("templates");
  fs::create_dir_all(&dir)?;
  for (name, content) in templates {
    write_file(&dir, name, content)?;
  }
  Ok(dir)
}

/// The headstamp binary run in `dir`, isolated from the caller's environment.
pub fn headstamp(dir: &Path) -> Result<Command> {
  let mut cmd = Command::cargo_bin("headstamp")?;
  cmd
    .current_dir(dir)
    .env_remove("HEADSTAMP_CONFIG")
    .env_remove("RUST_LOG");
  Ok(cmd)
}
