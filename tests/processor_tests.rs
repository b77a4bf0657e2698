mod common;

use std::fs;
use std::path::Path;

use anyhow::Result;
use headstamp::config::Identity;
use headstamp::diff::DiffManager;
use headstamp::processor::{ProcessError, Processor, ProcessorOptions, WriteError};
use headstamp::registry::TemplateRegistry;
use tempfile::tempdir;

use crate::common::{GO_TEMPLATE, PYTHON_TEMPLATE, template_dir, write_file};

fn ada() -> Identity {
  Identity {
    username: "Ada".to_string(),
    email: "ada@example.com".to_string(),
  }
}

fn processor_for(dir: &Path, options: ProcessorOptions) -> Result<Processor> {
  Ok(Processor::new(TemplateRegistry::load(dir)?, ada(), options))
}

#[test]
fn test_header_goes_on_top() -> Result<()> {
  let temp_dir = tempdir()?;
  let templates = template_dir(
    temp_dir.path(),
    &[("python.tpl", "TYPE:py\n---START\nAuthor: <USERNAME>\n---END\n")],
  )?;
  let target = write_file(&temp_dir.path().join("src"), "main.py", "print(1)\n")?;

  let mut processor = processor_for(&templates, ProcessorOptions::default())?;
  let summary = processor.process(std::slice::from_ref(&target))?;

  assert_eq!(fs::read_to_string(&target)?, "Author: Ada\nprint(1)\n");
  assert_eq!(summary.stamped.len(), 1);
  assert!(!summary.has_failures());

  Ok(())
}

#[test]
fn test_imports_stay_above_header() -> Result<()> {
  let temp_dir = tempdir()?;
  let templates = template_dir(temp_dir.path(), &[("python.tpl", PYTHON_TEMPLATE)])?;
  let target = write_file(temp_dir.path(), "tool.py", "import os\nimport sys\nx=1\n")?;

  let mut processor = processor_for(&templates, ProcessorOptions::default())?;
  processor.process(std::slice::from_ref(&target))?;

  assert_eq!(
    fs::read_to_string(&target)?,
    "import os\nimport sys\n# tool.py\n# Author: Ada <ada@example.com>\nx=1\n"
  );

  Ok(())
}

#[test]
fn test_duplicate_targets_are_stamped_once() -> Result<()> {
  let temp_dir = tempdir()?;
  let templates = template_dir(temp_dir.path(), &[("go.tpl", GO_TEMPLATE)])?;
  let target = write_file(temp_dir.path(), "main.go", "package main\n")?;
  let same = temp_dir.path().join(".").join("main.go");

  let mut processor = processor_for(&templates, ProcessorOptions::default())?;
  let summary = processor.process(&[target.clone(), same, target.clone()])?;

  assert_eq!(summary.stamped.len(), 1);
  assert_eq!(fs::read_to_string(&target)?, "// main.go by Ada\npackage main\n");

  Ok(())
}

#[test]
fn test_missing_template_stops_the_run() -> Result<()> {
  let temp_dir = tempdir()?;
  let templates = template_dir(temp_dir.path(), &[("go.tpl", GO_TEMPLATE)])?;
  let target = write_file(temp_dir.path(), "lib.rs", "fn main() {}\n")?;

  let mut processor = processor_for(&templates, ProcessorOptions::default())?;
  let err = processor
    .process(std::slice::from_ref(&target))
    .expect_err("no template for .rs");

  match err {
    ProcessError::NoTemplate { extension, .. } => assert_eq!(extension, "rs"),
    other => panic!("unexpected error: {other}"),
  }
  assert_eq!(fs::read_to_string(&target)?, "fn main() {}\n");
  assert_eq!(processor.registry().reconciliations(), 1);

  Ok(())
}

#[test]
fn test_file_without_extension_is_rejected() -> Result<()> {
  let temp_dir = tempdir()?;
  let templates = template_dir(temp_dir.path(), &[("go.tpl", GO_TEMPLATE)])?;
  let target = write_file(temp_dir.path(), "Makefile", "all:\n")?;

  let mut processor = processor_for(&templates, ProcessorOptions::default())?;
  let err = processor
    .process(&[target])
    .expect_err("no extension");

  assert!(matches!(err, ProcessError::FileName(_)));
  Ok(())
}

#[test]
fn test_unreadable_target_does_not_stop_others() -> Result<()> {
  let temp_dir = tempdir()?;
  let templates = template_dir(temp_dir.path(), &[("go.tpl", GO_TEMPLATE)])?;
  let missing = temp_dir.path().join("gone.go");
  let target = write_file(temp_dir.path(), "main.go", "package main\n")?;

  let mut processor = processor_for(&templates, ProcessorOptions::default())?;
  let summary = processor.process(&[missing.clone(), target.clone()])?;

  assert_eq!(summary.failed.len(), 1);
  assert!(matches!(summary.failed[0].error, WriteError::OpenTarget { .. }));
  assert!(summary.failed[0].path.ends_with("gone.go"));
  assert_eq!(summary.stamped.len(), 1);
  assert!(!missing.exists());
  assert!(fs::read_to_string(&target)?.starts_with("// main.go by Ada\n"));

  Ok(())
}

#[test]
fn test_latin1_template_is_a_file_failure() -> Result<()> {
  let temp_dir = tempdir()?;
  let templates = template_dir(temp_dir.path(), &[])?;
  fs::write(
    templates.join("python.tpl"),
    b"TYPE:py\n---START\n# (c) Jos\xe9\n# Author: <USERNAME>\n---END\n",
  )?;
  let target = write_file(temp_dir.path(), "a.py", "print(1)\n")?;

  let mut processor = processor_for(&templates, ProcessorOptions::default())?;
  let summary = processor.process(std::slice::from_ref(&target))?;

  assert!(summary.stamped.is_empty());
  assert_eq!(summary.failed.len(), 1);
  assert!(matches!(summary.failed[0].error, WriteError::Render { .. }));
  assert_eq!(fs::read_to_string(&target)?, "print(1)\n");

  Ok(())
}

#[test]
fn test_dry_run_leaves_files_untouched() -> Result<()> {
  let temp_dir = tempdir()?;
  let templates = template_dir(temp_dir.path(), &[("python.tpl", PYTHON_TEMPLATE)])?;
  let target = write_file(temp_dir.path(), "app.py", "x = 1\n")?;
  let diff_path = temp_dir.path().join("changes.diff");

  let diff_manager = DiffManager::new(false, Some(diff_path.clone()));
  diff_manager.init()?;
  let mut processor = processor_for(
    &templates,
    ProcessorOptions {
      dry_run: true,
      diff_manager: Some(diff_manager),
    },
  )?;
  let summary = processor.process(std::slice::from_ref(&target))?;

  assert_eq!(fs::read_to_string(&target)?, "x = 1\n");
  assert_eq!(summary.previewed.len(), 1);
  assert!(summary.stamped.is_empty());

  let diff = fs::read_to_string(&diff_path)?;
  assert!(diff.contains("+# app.py\n"));
  assert!(diff.contains("+# Author: Ada <ada@example.com>\n"));

  Ok(())
}

#[test]
fn test_template_added_during_session_is_used() -> Result<()> {
  let temp_dir = tempdir()?;
  let templates = template_dir(temp_dir.path(), &[("python.tpl", PYTHON_TEMPLATE)])?;
  let target = write_file(temp_dir.path(), "main.go", "package main\n")?;

  let mut processor = processor_for(&templates, ProcessorOptions::default())?;
  write_file(&templates, "go.tpl", GO_TEMPLATE)?;

  let summary = processor.process(std::slice::from_ref(&target))?;

  assert_eq!(summary.stamped.len(), 1);
  assert_eq!(processor.registry().reconciliations(), 1);
  Ok(())
}
