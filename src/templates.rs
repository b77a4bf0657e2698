//! # Templates Module
//!
//! This module parses header template files and renders them for a target
//! file.
//!
//! A template is a plain-text file. The lines between a start marker and an end
//! marker form the header body; directive lines anywhere in the file describe
//! which extensions the template serves and how includes are handled:
//!
//! ```text
//! TYPE:py
//! INCTYPE:import
//! <INC>
//! ---START
//! # <FILENAME>
//! # Written by <USERNAME> <<EMAIL>>
//! # <DATE>
//! ---END
//! ```
//!
//! The module includes:
//! - [`Template`] for parsing a template file and rendering it
//! - [`HeaderRequest`] for the data substituted into a template
//! - [`TemplateIssue`] for syntax problems found while parsing
//! - [`RenderError`] for templates that cannot produce a header
//!
//! ## Example
//!
//! ```rust,no_run
//! use headstamp::templates::{HeaderRequest, Template};
//!
//! let template = Template::parse("templates/python.tpl");
//! let request = HeaderRequest::new("Ada", "ada@example.com", "src/main.py");
//! let header = template.render(&request)?;
//! print!("{}", header);
//! # Ok::<(), headstamp::templates::RenderError>(())
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{trace, warn};

use crate::file_handle::FileHandle;

/// Substring that opens the header body (`---START` in templates).
pub const START_MARKER: &str = "--START";
/// Substring that closes the header body (`---END` in templates).
pub const END_MARKER: &str = "--END";
/// Marker requesting that include statements stay above the header.
pub const INCLUDE_POSITION_MARKER: &str = "<INC>";

static TYPE_DIRECTIVE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^TYPE:(.*)").expect("type directive regex must compile"));

static INCLUDE_DIRECTIVE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^INCTYPE:(.*)").expect("include directive regex must compile"));

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"<(FILEPATH|FILENAME|FILE|USERNAME|EMAIL|DATE)>").expect("placeholder regex must compile")
});

/// Kind of syntax problem found in a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
  /// An end marker appeared while no body was open.
  StrayEndMarker,
  /// A line mentioned `INCTYPE` without being a valid `INCTYPE:` directive.
  MalformedIncludeDirective,
  /// A line mentioned `TYPE` without being a valid `TYPE:` directive.
  MalformedTypeDirective,
  /// The line is not valid UTF-8.
  InvalidEncoding,
}

impl fmt::Display for IssueKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let text = match self {
      IssueKind::StrayEndMarker => "end marker outside of template body",
      IssueKind::MalformedIncludeDirective => "malformed include type",
      IssueKind::MalformedTypeDirective => "malformed type association",
      IssueKind::InvalidEncoding => "line is not valid UTF-8",
    };
    f.write_str(text)
  }
}

/// A syntax problem at a specific line of a template file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateIssue {
  /// 1-based line number
  pub line: usize,
  pub kind: IssueKind,
}

/// Error returned when a template cannot be rendered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
  /// The template file could not be read when it was parsed.
  #[error("Template '{path}' could not be read\n  → Fix: check the file, then run again with --rebuild-registry")]
  Unreadable { path: PathBuf },

  /// The template holds bytes that are not UTF-8.
  #[error("Template '{path}' is not valid UTF-8 (line {line})\n  → Fix: save the template as UTF-8")]
  InvalidEncoding { path: PathBuf, line: usize },
}

/// Body tracking state of the line scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyState {
  Outside,
  InsideBody,
  Done,
}

/// What a single template line means to the scanner.
#[derive(Debug, PartialEq, Eq)]
enum LineEvent<'a> {
  Start,
  End,
  StrayEnd,
  IncludePosition,
  IncludePattern(&'a str),
  Extension(&'a str),
  Malformed(IssueKind),
  Other,
}

/// Forward, line-at-a-time scanner shared by parsing and rendering.
struct Scanner {
  state: BodyState,
}

impl Scanner {
  const fn new() -> Self {
    Self {
      state: BodyState::Outside,
    }
  }

  const fn in_body(&self) -> bool {
    matches!(self.state, BodyState::InsideBody)
  }

  /// Classifies `line` and advances the body state.
  ///
  /// Checks run in a fixed order and the first match wins. A start marker
  /// after the body has closed reopens it.
  fn feed<'a>(&mut self, line: &'a str) -> LineEvent<'a> {
    if line.contains(START_MARKER) {
      self.state = BodyState::InsideBody;
      return LineEvent::Start;
    }

    if line.contains(END_MARKER) {
      if self.in_body() {
        self.state = BodyState::Done;
        return LineEvent::End;
      }
      return LineEvent::StrayEnd;
    }

    if line.contains(INCLUDE_POSITION_MARKER) && self.state == BodyState::Outside {
      return LineEvent::IncludePosition;
    }

    if line.contains("INCTYPE") {
      return match INCLUDE_DIRECTIVE.captures(line).and_then(|caps| caps.get(1)) {
        Some(pattern) => LineEvent::IncludePattern(pattern.as_str()),
        None => LineEvent::Malformed(IssueKind::MalformedIncludeDirective),
      };
    }

    if line.contains("TYPE") {
      return match TYPE_DIRECTIVE.captures(line).and_then(|caps| caps.get(1)) {
        Some(extension) => LineEvent::Extension(extension.as_str()),
        None => LineEvent::Malformed(IssueKind::MalformedTypeDirective),
      };
    }

    LineEvent::Other
  }
}

/// A parsed header template.
///
/// Everything, including the body, is read once when the template is parsed.
/// Later edits to the file need a new `Template`.
#[derive(Debug, Clone)]
pub struct Template {
  file: FileHandle,
  body: Vec<String>,
  extensions: Vec<String>,
  include_pattern: Option<String>,
  include_before_header: bool,
  issues: Vec<TemplateIssue>,
  readable: bool,
}

impl Template {
  /// Parses the template file at `path`.
  ///
  /// Syntax problems never abort parsing; each one is logged with the file and
  /// line number and kept in [`issues`](Self::issues). An unreadable file
  /// parses to a template with no extensions that refuses to render.
  pub fn parse(path: impl AsRef<Path>) -> Self {
    let mut template = Self::empty(FileHandle::new(path));

    let mut scanner = Scanner::new();
    let mut lines = template.file.lines();
    for (index, line) in lines.by_ref().enumerate() {
      let line_number = index + 1;
      let was_in_body = scanner.in_body();
      let event = scanner.feed(&line);
      match event {
        LineEvent::IncludePosition => template.include_before_header = true,
        LineEvent::IncludePattern(pattern) => template.include_pattern = Some(pattern.to_string()),
        LineEvent::Extension(raw) => template.add_extension(raw, line_number),
        LineEvent::StrayEnd => template.record_issue(line_number, IssueKind::StrayEndMarker),
        LineEvent::Malformed(kind) => template.record_issue(line_number, kind),
        LineEvent::Start | LineEvent::End | LineEvent::Other => {}
      }
      if was_in_body && !matches!(event, LineEvent::Start | LineEvent::End) {
        template.body.push(line);
      }
    }
    for &line_number in lines.lossy_lines() {
      template.record_issue(line_number, IssueKind::InvalidEncoding);
    }
    template.readable = !lines.failed();

    trace!(
      "Parsed template {} (extensions: {:?}, include: {:?})",
      template.file,
      template.extensions,
      template.include_pattern
    );

    template
  }

  /// Rebuilds a template from previously stored metadata.
  ///
  /// The stored extensions and include settings win over the file's current
  /// directives; only the body and its issues come from the file.
  pub(crate) fn from_parts(
    path: PathBuf,
    extensions: Vec<String>,
    include_pattern: Option<String>,
    include_before_header: bool,
  ) -> Self {
    let parsed = Self::parse(path);
    Self {
      extensions,
      include_pattern,
      include_before_header,
      ..parsed
    }
  }

  const fn empty(file: FileHandle) -> Self {
    Self {
      file,
      body: Vec::new(),
      extensions: Vec::new(),
      include_pattern: None,
      include_before_header: false,
      issues: Vec::new(),
      readable: true,
    }
  }

  fn add_extension(&mut self, raw: &str, line_number: usize) {
    let extension = raw.trim().trim_start_matches('.');
    if extension.is_empty() {
      self.record_issue(line_number, IssueKind::MalformedTypeDirective);
      return;
    }
    if !self.extensions.iter().any(|known| known == extension) {
      self.extensions.push(extension.to_string());
    }
  }

  fn record_issue(&mut self, line: usize, kind: IssueKind) {
    warn!("Syntax error: {}:{} -- {}", self.file, line, kind);
    self.issues.push(TemplateIssue { line, kind });
  }

  /// The template source file.
  pub const fn file(&self) -> &FileHandle {
    &self.file
  }

  /// Extensions this template is associated with, in declaration order.
  pub fn extensions(&self) -> &[String] {
    &self.extensions
  }

  /// The include statement marker, e.g. `import` or `#include`.
  pub fn include_pattern(&self) -> Option<&str> {
    self.include_pattern.as_deref()
  }

  /// Whether existing include statements must stay above the header.
  pub const fn include_before_header(&self) -> bool {
    self.include_before_header
  }

  /// Syntax problems found while parsing.
  pub fn issues(&self) -> &[TemplateIssue] {
    &self.issues
  }

  /// The header body lines read at parse time.
  pub fn body(&self) -> &[String] {
    &self.body
  }

  /// Renders the header for `request`.
  ///
  /// Placeholders are replaced in a single pass, so substituted values are
  /// never themselves expanded. Every body line is newline-terminated.
  ///
  /// Fails when the template file was unreadable or not UTF-8 at parse time,
  /// since the header would be empty or mangled.
  pub fn render(&self, request: &HeaderRequest) -> Result<String, RenderError> {
    if !self.readable {
      return Err(RenderError::Unreadable {
        path: self.file.path().to_path_buf(),
      });
    }
    if let Some(issue) = self.issues.iter().find(|issue| issue.kind == IssueKind::InvalidEncoding) {
      return Err(RenderError::InvalidEncoding {
        path: self.file.path().to_path_buf(),
        line: issue.line,
      });
    }

    let mut rendered = String::new();
    for line in &self.body {
      let substituted = PLACEHOLDER.replace_all(line, |caps: &Captures| request.value_for(&caps[1]));
      rendered.push_str(&substituted);
      rendered.push('\n');
    }
    Ok(rendered)
  }
}

impl PartialEq for Template {
  fn eq(&self, other: &Self) -> bool {
    self.file == other.file
  }
}

impl Eq for Template {}

impl fmt::Display for Template {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.file.file_name())
  }
}

/// The data a header is rendered with: who is stamping which file.
#[derive(Debug, Clone)]
pub struct HeaderRequest {
  username: String,
  email: String,
  file: FileHandle,
}

impl HeaderRequest {
  pub fn new(username: impl Into<String>, email: impl Into<String>, target: impl AsRef<Path>) -> Self {
    Self::for_file(username, email, FileHandle::new(target))
  }

  pub fn for_file(username: impl Into<String>, email: impl Into<String>, file: FileHandle) -> Self {
    Self {
      username: username.into(),
      email: email.into(),
      file,
    }
  }

  pub fn username(&self) -> &str {
    &self.username
  }

  pub fn email(&self) -> &str {
    &self.email
  }

  /// The target file the header is written into.
  pub const fn file(&self) -> &FileHandle {
    &self.file
  }

  /// Replacement text for a placeholder name (without angle brackets).
  fn value_for(&self, placeholder: &str) -> String {
    match placeholder {
      "FILE" => self.file.name().unwrap_or_default().to_string(),
      "FILEPATH" => self.file.path().display().to_string(),
      "FILENAME" => self
        .file
        .full_name()
        .unwrap_or_else(|_| self.file.file_name().to_string()),
      "USERNAME" => self.username.clone(),
      "EMAIL" => self.email.clone(),
      "DATE" => self.file.formatted_date().unwrap_or_default(),
      other => format!("<{}>", other),
    }
  }
}
