//! # headstamp
//!
//! A tool that stamps author and license header blocks onto source files.
//!
//! `headstamp` picks the header for each file by its extension from a
//! directory of plain-text templates. The extension index over that directory
//! is cached in a hidden snapshot file and kept up to date lazily: a lookup
//! that misses, or that finds a template whose file has been deleted,
//! reconciles the index with the directory before giving up.
//!
//! ## Features
//!
//! * Templates declare their extensions with `TYPE:` directives
//! * Placeholders for the file name, path, author, email and creation date
//! * Include statements (`import`, `#include`, ...) can be kept above the header
//! * Files are rewritten atomically; a failure leaves the original untouched
//! * Dry runs with a unified diff of the would-be changes
//!
//! ## Usage as a Library
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//!
//! use headstamp::config::Identity;
//! use headstamp::processor::{Processor, ProcessorOptions};
//! use headstamp::registry::TemplateRegistry;
//!
//! fn main() -> anyhow::Result<()> {
//!     let registry = TemplateRegistry::load("templates")?;
//!     let identity = Identity {
//!         username: "Ada Lovelace".to_string(),
//!         email: "ada@example.com".to_string(),
//!     };
//!
//!     let mut processor = Processor::new(registry, identity, ProcessorOptions::default());
//!     let summary = processor.process(&[PathBuf::from("src/main.py")])?;
//!
//!     println!("stamped {} files", summary.stamped.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! * [`registry`] - Extension to template index and its snapshot
//! * [`templates`] - Template parsing and rendering
//! * [`processor`] - Stamping sessions and the atomic header writer
//! * [`config`] - Config file and identity resolution
//! * [`logging`] - Logging utilities for verbose output

pub mod config;
pub mod diff;
pub mod file_handle;
pub mod logging;
pub mod output;
pub mod processor;
pub mod registry;
pub mod templates;
