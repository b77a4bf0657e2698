//! # Logging Module
//!
//! This module provides the logging utilities for headstamp:
//! - User-facing progress lines via [`info_log!`](crate::info_log) (stdout)
//!   and [`verbose_log!`](crate::verbose_log) (stderr, `-v` only)
//! - A global output mode switched by `-q` and `-v`
//! - [`init_tracing`] for the diagnostic `tracing` events emitted by the
//!   library (`RUST_LOG` overrides the level)
//!
//! ## Example
//!
//! ```rust
//! use headstamp::logging::{ColorMode, init_tracing, set_verbose};
//! use headstamp::{info_log, verbose_log};
//!
//! // Enable verbose logging
//! set_verbose();
//!
//! ColorMode::Auto.apply();
//! init_tracing(false, 1);
//!
//! verbose_log!("Using template: {}", "python.tpl");
//! info_log!("Added header to: {}", "example.py");
//! ```

mod modes;

pub use modes::{ColorMode, init_tracing, is_quiet, is_verbose, set_quiet, set_verbose};
use owo_colors::{OwoColorize, Stream};

/// Logs a message to stderr if verbose mode is enabled.
///
/// This macro is used for detailed logging that is only shown when verbose mode
/// is enabled via [`set_verbose`]. It uses the same format string syntax as
/// the standard [`eprintln!`] macro.
#[macro_export]
macro_rules! verbose_log {
    ($($arg:tt)*) => {
        if $crate::logging::is_verbose() {
            eprintln!($($arg)*);
        }
    };
}

/// Logs a message to stdout unless quiet mode is enabled.
#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {
        if !$crate::logging::is_quiet() {
            $crate::logging::print_info_log(&format!($($arg)*));
        }
    };
}

/// Prints an [`info_log!`] message, in yellow when stdout supports color.
pub fn print_info_log(message: &str) {
  println!("{}", message.if_supports_color(Stream::Stdout, |m| m.yellow()));
}
