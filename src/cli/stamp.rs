//! # Stamp Command
//!
//! This module implements the only command: stamp headers onto the given
//! files, or list the template registry.

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Args;
use headstamp::config::{CliOverrides, load_config, resolve_settings, resolve_template_dir};
use headstamp::diff::DiffManager;
use headstamp::logging::{ColorMode, init_tracing, set_quiet, set_verbose};
use headstamp::output::{
  print_failed_files, print_hint, print_registry, print_start_message, print_stamped_files, print_summary,
};
use headstamp::processor::{ProcessError, Processor, ProcessorOptions, unique_targets};
use headstamp::registry::TemplateRegistry;
use tracing::debug;

/// Arguments for the stamp command
#[derive(Args, Debug, Default)]
pub struct StampArgs {
  /// Files to stamp with a header
  #[arg(required_unless_present = "list_templates")]
  pub files: Vec<PathBuf>,

  /// Name written for <USERNAME> (overrides the config file)
  #[arg(long, short = 'u')]
  pub username: Option<String>,

  /// Address written for <EMAIL> (overrides the config file)
  #[arg(long, short = 'e')]
  pub email: Option<String>,

  /// Directory holding the header templates (overrides the config file)
  #[arg(long, short = 't', value_name = "DIR")]
  pub templates: Option<PathBuf>,

  /// Path to config file (default: nearest .headstamp.toml)
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,

  /// Ignore config file even if present
  #[arg(long)]
  pub no_config: bool,

  /// Compute the headers without modifying any file
  #[arg(long)]
  pub dry_run: bool,

  /// Show diff of changes in dry run mode
  #[arg(long, requires = "dry_run")]
  pub show_diff: bool,

  /// Save diff of changes to a file in dry run mode
  #[arg(long, short = 'o', value_name = "FILE", requires = "dry_run")]
  pub save_diff: Option<PathBuf>,

  /// Discard the template registry and rebuild it from the template directory
  #[arg(long)]
  pub rebuild_registry: bool,

  /// Print which template serves which extension and exit
  #[arg(long)]
  pub list_templates: bool,

  /// Increase verbosity (-v info, -vv debug, -vvv trace)
  #[arg(short, long, action = clap::ArgAction::Count)]
  pub verbose: u8,

  /// Suppress all output except errors
  #[arg(short, long, conflicts_with = "verbose")]
  pub quiet: bool,

  /// Control when to use colored output (auto, never, always)
  #[arg(
    long,
    value_name = "WHEN",
    num_args = 0..=1,
    default_value_t = ColorMode::Auto,
    default_missing_value = "always",
    value_enum
  )]
  pub colors: ColorMode,
}

/// Run the stamp command with the given arguments
pub fn run_stamp(args: StampArgs) -> Result<()> {
  init_tracing(args.quiet, args.verbose);

  if args.verbose > 0 {
    set_verbose();
  } else if args.quiet {
    set_quiet();
  }
  args.colors.apply();

  let current_dir = std::env::current_dir().context("Failed to get current directory")?;
  let config = load_config(args.config.as_deref(), &current_dir, args.no_config)?;

  if args.list_templates {
    let template_dir = resolve_template_dir(config.and_then(|c| c.templates), args.templates)?;
    let registry = open_registry(template_dir, args.rebuild_registry)?;
    print_registry(&registry);
    return Ok(());
  }

  let settings = resolve_settings(
    config,
    CliOverrides {
      username: args.username,
      email: args.email,
      templates: args.templates,
    },
  )?;
  debug!(
    "Stamping as {} <{}> with templates from {}",
    settings.identity.username,
    settings.identity.email,
    settings.template_dir.display()
  );

  let registry = open_registry(settings.template_dir, args.rebuild_registry)?;
  let template_dir = registry.template_dir().to_path_buf();

  let diff_manager = DiffManager::new(args.show_diff, args.save_diff);
  diff_manager.init()?;

  let mut processor = Processor::new(
    registry,
    settings.identity,
    ProcessorOptions {
      dry_run: args.dry_run,
      diff_manager: Some(diff_manager),
    },
  );

  let targets = unique_targets(&args.files);
  print_start_message(targets.len(), args.dry_run);

  let summary = match processor.process(&targets) {
    Ok(summary) => summary,
    Err(e @ ProcessError::NoTemplate { .. }) => {
      print_hint(&format!(
        "Add a template with a TYPE directive for this extension to {}",
        template_dir.display()
      ));
      return Err(e.into());
    }
    Err(e) => return Err(e.into()),
  };

  let root = Some(current_dir.as_path());
  let done = if args.dry_run {
    &summary.previewed
  } else {
    &summary.stamped
  };
  print_stamped_files(done, root, args.dry_run);
  print_failed_files(&summary.failed, root);
  print_summary(&summary, args.dry_run);

  if summary.has_failures() {
    process::exit(1);
  }

  Ok(())
}

fn open_registry(template_dir: PathBuf, rebuild: bool) -> Result<TemplateRegistry> {
  let registry = if rebuild {
    debug!("Rebuilding template registry in {}", template_dir.display());
    TemplateRegistry::rebuild(&template_dir)?
  } else {
    TemplateRegistry::load(&template_dir)?
  };
  debug!(
    "Template registry has {} templates in {}",
    registry.len(),
    registry.template_dir().display()
  );
  Ok(registry)
}
