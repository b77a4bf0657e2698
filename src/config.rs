//! # Configuration Module
//!
//! This module provides the settings layer for headstamp: who is stamping
//! (username and email) and where the header templates live.
//!
//! Values come from a `.headstamp.toml` file and from command-line flags, with
//! flags taking precedence:
//!
//! ```toml
//! username = "Ada Lovelace"
//! email = "ada@example.com"
//! templates = "templates"   # relative to this file's directory
//! ```
//!
//! The file is located via `--config`, the `HEADSTAMP_CONFIG` environment
//! variable, or by searching upwards from the current directory.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::file_handle::absolutize;
use crate::verbose_log;

/// The default config file name.
pub const DEFAULT_CONFIG_FILENAME: &str = ".headstamp.toml";

/// Environment variable for specifying config file path.
pub const CONFIG_ENV_VAR: &str = "HEADSTAMP_CONFIG";

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(
    r"(?i)^[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?$",
  )
  .expect("email regex must compile")
});

/// Contents of a `.headstamp.toml` file.
///
/// Every field is optional so a file can hold only the values that never
/// change, with the rest supplied on the command line.
#[derive(Debug, Default, Clone, Deserialize, PartialEq, Eq)]
pub struct Config {
  #[serde(default)]
  pub username: Option<String>,

  #[serde(default)]
  pub email: Option<String>,

  /// Template directory. Relative paths are resolved against the directory
  /// containing the config file when it is loaded.
  #[serde(default)]
  pub templates: Option<PathBuf>,
}

/// Error type for configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  /// The config file could not be read.
  #[error("Failed to read config file '{path}': {source}")]
  ReadError { path: PathBuf, source: std::io::Error },

  /// The config file contains invalid TOML.
  #[error("Failed to parse config file '{path}': {source}")]
  ParseError { path: PathBuf, source: toml::de::Error },

  /// The email address is not a plausible address.
  #[error("Invalid email address '{email}'")]
  InvalidEmail { email: String },

  /// A required value was given neither in the config file nor as a flag.
  #[error("No {field} configured\n  → Fix: pass --{field} or set `{field}` in .headstamp.toml")]
  Missing { field: &'static str },
}

impl Config {
  /// Load configuration from a file.
  ///
  /// A relative `templates` path is made absolute against the file's
  /// directory.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    verbose_log!("Loading config from: {}", path.display());

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
      path: path.to_path_buf(),
      source: e,
    })?;

    let mut config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
      path: path.to_path_buf(),
      source: e,
    })?;

    if let Some(templates) = config.templates.take() {
      let base = absolutize(path);
      let base_dir = base.parent().unwrap_or_else(|| Path::new("/"));
      config.templates = Some(base_dir.join(templates));
    }

    Ok(config)
  }
}

/// Discover the configuration file path.
///
/// The configuration file is discovered in the following order:
/// 1. Path specified via `--config` flag (passed as `explicit_path`), used as
///    is even if it does not exist
/// 2. Path specified via `HEADSTAMP_CONFIG` environment variable
/// 3. The first `.headstamp.toml` found in `start_dir` or any of its ancestors
pub fn discover_config_path(explicit_path: Option<&Path>, start_dir: &Path) -> Option<PathBuf> {
  if let Some(path) = explicit_path {
    verbose_log!("Using explicit config path: {}", path.display());
    return Some(path.to_path_buf());
  }

  if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
    let path = PathBuf::from(&env_path);
    if path.exists() {
      verbose_log!("Using config from {}: {}", CONFIG_ENV_VAR, path.display());
      return Some(path);
    }
    verbose_log!("{} path does not exist: {}", CONFIG_ENV_VAR, env_path);
  }

  let start_dir = absolutize(start_dir);
  for dir in start_dir.ancestors() {
    let candidate = dir.join(DEFAULT_CONFIG_FILENAME);
    if candidate.is_file() {
      verbose_log!("Using config: {}", candidate.display());
      return Some(candidate);
    }
  }

  verbose_log!("No config file found");
  None
}

/// Load configuration from the discovered path.
///
/// Returns `Ok(None)` when `no_config` is set or no file is found.
pub fn load_config(
  explicit_path: Option<&Path>,
  start_dir: &Path,
  no_config: bool,
) -> Result<Option<Config>, ConfigError> {
  if no_config {
    verbose_log!("Config file discovery disabled (--no-config)");
    return Ok(None);
  }

  discover_config_path(explicit_path, start_dir)
    .map(|path| Config::load(&path))
    .transpose()
}

/// Values given on the command line. They override the config file.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
  pub username: Option<String>,
  pub email: Option<String>,
  pub templates: Option<PathBuf>,
}

/// The person a header is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
  pub username: String,
  pub email: String,
}

/// Fully resolved settings for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
  pub identity: Identity,
  pub template_dir: PathBuf,
}

/// Merges the config file and the command-line overrides.
///
/// # Errors
///
/// Returns [`ConfigError::Missing`] if the username, email or template
/// directory is set nowhere, and [`ConfigError::InvalidEmail`] if the email
/// does not look like an address.
pub fn resolve_settings(config: Option<Config>, overrides: CliOverrides) -> Result<Settings, ConfigError> {
  let config = config.unwrap_or_default();

  let username = overrides
    .username
    .or(config.username)
    .map(|name| name.trim().to_string())
    .filter(|name| !name.is_empty())
    .ok_or(ConfigError::Missing { field: "username" })?;

  let email = overrides
    .email
    .or(config.email)
    .map(|email| email.trim().to_string())
    .ok_or(ConfigError::Missing { field: "email" })?;
  validate_email(&email)?;

  let template_dir = resolve_template_dir(config.templates, overrides.templates)?;

  Ok(Settings {
    identity: Identity { username, email },
    template_dir,
  })
}

/// Picks the template directory, preferring the command-line value.
///
/// Needs no identity, so it also serves `--list-templates`.
pub fn resolve_template_dir(from_config: Option<PathBuf>, from_cli: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
  from_cli
    .map(|dir| absolutize(&dir))
    .or(from_config)
    .ok_or(ConfigError::Missing { field: "templates" })
}

/// Checks that `email` looks like an email address.
pub fn validate_email(email: &str) -> Result<(), ConfigError> {
  if EMAIL_PATTERN.is_match(email) {
    Ok(())
  } else {
    Err(ConfigError::InvalidEmail {
      email: email.to_string(),
    })
  }
}

#[cfg(test)]
mod tests {
  use tempfile::TempDir;

  use super::*;

  #[test]
  fn test_parse_full_config() {
    let config: Config = toml::from_str(concat!(
      "username = \"Ada Lovelace\"\n",
      "email = \"ada@example.com\"\n",
      "templates = \"headers\"\n",
    ))
    .expect("valid config should parse");

    assert_eq!(config.username.as_deref(), Some("Ada Lovelace"));
    assert_eq!(config.email.as_deref(), Some("ada@example.com"));
    assert_eq!(config.templates, Some(PathBuf::from("headers")));
  }

  #[test]
  fn test_parse_empty_config() {
    let config: Config = toml::from_str("").expect("empty config should parse");
    assert_eq!(config, Config::default());
  }

  #[test]
  fn test_load_resolves_templates_against_config_dir() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let config_path = temp_dir.path().join(DEFAULT_CONFIG_FILENAME);
    std::fs::write(&config_path, "templates = \"headers\"\n").expect("write config");

    let config = Config::load(&config_path).expect("load should succeed");
    assert_eq!(config.templates, Some(temp_dir.path().join("headers")));
  }

  #[test]
  fn test_load_config_file_not_found() {
    let result = Config::load(Path::new("/nonexistent/path/.headstamp.toml"));
    assert!(matches!(
      result.expect_err("should fail"),
      ConfigError::ReadError { .. }
    ));
  }

  #[test]
  fn test_load_invalid_toml() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let config_path = temp_dir.path().join(DEFAULT_CONFIG_FILENAME);
    std::fs::write(&config_path, "username = \n").expect("write config");

    let err = Config::load(&config_path).expect_err("should fail");
    assert!(matches!(err, ConfigError::ParseError { .. }));
  }

  #[test]
  fn test_discover_config_explicit_path() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let config_path = temp_dir.path().join("custom-config.toml");

    let result = discover_config_path(Some(&config_path), temp_dir.path());
    assert_eq!(result, Some(config_path));
  }

  #[test]
  fn test_discover_config_in_ancestor() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let config_path = temp_dir.path().join(DEFAULT_CONFIG_FILENAME);
    std::fs::write(&config_path, "").expect("write config");
    let nested = temp_dir.path().join("a").join("b");
    std::fs::create_dir_all(&nested).expect("create nested dirs");

    let result = discover_config_path(None, &nested);
    assert_eq!(result, Some(config_path));
  }

  #[test]
  fn test_load_config_disabled() {
    let temp_dir = TempDir::new().expect("create temp dir");
    std::fs::write(temp_dir.path().join(DEFAULT_CONFIG_FILENAME), "username = \"x\"\n").expect("write config");

    let result = load_config(None, temp_dir.path(), true).expect("load should succeed");
    assert!(result.is_none());
  }

  #[test]
  fn test_overrides_win() {
    let config = Config {
      username: Some("File User".to_string()),
      email: Some("file@example.com".to_string()),
      templates: Some(PathBuf::from("/etc/headstamp")),
    };
    let overrides = CliOverrides {
      username: Some("Ada".to_string()),
      ..CliOverrides::default()
    };

    let settings = resolve_settings(Some(config), overrides).expect("resolve");

    assert_eq!(settings.identity.username, "Ada");
    assert_eq!(settings.identity.email, "file@example.com");
    assert_eq!(settings.template_dir, PathBuf::from("/etc/headstamp"));
  }

  #[test]
  fn test_missing_values_are_reported() {
    let overrides = CliOverrides {
      username: Some("Ada".to_string()),
      email: Some("ada@example.com".to_string()),
      templates: None,
    };

    let err = resolve_settings(None, overrides).expect_err("should fail");
    assert!(matches!(err, ConfigError::Missing { field: "templates" }));

    let err = resolve_settings(None, CliOverrides::default()).expect_err("should fail");
    assert!(matches!(err, ConfigError::Missing { field: "username" }));
  }

  #[test]
  fn test_email_validation() {
    assert!(validate_email("ada@example.com").is_ok());
    assert!(validate_email("Ada.Lovelace+notes@Mail.Example.org").is_ok());
    assert!(matches!(
      validate_email("not-an-email"),
      Err(ConfigError::InvalidEmail { .. })
    ));
    assert!(validate_email("ada@example.com trailing").is_err());
  }
}
