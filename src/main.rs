//! # headstamp
//!
//! Stamps author headers onto source files using per-extension templates.

mod cli;

use anyhow::Result;

use crate::cli::{Cli, run_stamp};

fn main() -> Result<()> {
  let cli = Cli::parse_args();
  run_stamp(cli.stamp_args)
}
