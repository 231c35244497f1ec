//! Placeholder expansion for URL prefixes, cache directories and binary paths.
//!
//! Templates recognise a fixed set of `{{NAME}}` placeholders. Anything else that
//! looks like a placeholder is rejected instead of being copied through, so a
//! typo in configuration surfaces as soon as the template is expanded.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{AssetError, Result};

/// Placeholders understood by [`Template`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Placeholder {
  /// Last-modified timestamp of the asset, in seconds since the Unix epoch.
  LastModified,
  /// Version token from [`crate::version::VersionResolver`].
  VersionHash,
  /// Root directory holding node binaries used by external filters.
  NodeModules,
}

impl Placeholder {
  /// Every supported placeholder.
  pub const ALL: [Placeholder; 3] = [
    Placeholder::LastModified,
    Placeholder::VersionHash,
    Placeholder::NodeModules,
  ];

  /// Name between the braces.
  pub fn name(self) -> &'static str {
    match self {
      Placeholder::LastModified => "LAST_MODIFIED",
      Placeholder::VersionHash => "VERSION_HASH",
      Placeholder::NodeModules => "NODE_MODULES",
    }
  }

  fn from_name(name: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|placeholder| placeholder.name() == name)
  }
}

impl fmt::Display for Placeholder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{{{{{}}}}}", self.name())
  }
}

/// Values available while rendering a template.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
  values: BTreeMap<Placeholder, String>,
}

impl Bindings {
  /// Create an empty binding set.
  pub fn new() -> Self {
    Self::default()
  }

  /// Builder-style insert.
  pub fn with(mut self, placeholder: Placeholder, value: impl Into<String>) -> Self {
    self.insert(placeholder, value);
    self
  }

  /// Bind a placeholder, replacing any previous value.
  pub fn insert(&mut self, placeholder: Placeholder, value: impl Into<String>) {
    self.values.insert(placeholder, value.into());
  }

  fn get(&self, placeholder: Placeholder) -> Option<&str> {
    self.values.get(&placeholder).map(String::as_str)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
  Literal(String),
  Placeholder(Placeholder),
}

/// A validated template string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
  source: String,
  segments: Vec<Segment>,
}

fn placeholder_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r"\{\{([^{}]*)\}\}").expect("invalid placeholder regex"))
}

impl Template {
  /// Parse and validate a template.
  pub fn parse(source: &str) -> Result<Self> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    for captures in placeholder_pattern().captures_iter(source) {
      let Some(whole) = captures.get(0) else {
        continue;
      };
      push_literal(source, &source[cursor..whole.start()], &mut segments)?;

      let name = &captures[1];
      let placeholder = Placeholder::from_name(name)
        .ok_or_else(|| AssetError::template(source, format!("unknown placeholder '{{{{{name}}}}}'")))?;
      segments.push(Segment::Placeholder(placeholder));
      cursor = whole.end();
    }
    push_literal(source, &source[cursor..], &mut segments)?;

    Ok(Self {
      source: source.to_string(),
      segments,
    })
  }

  /// Whether the template mentions `placeholder`.
  pub fn uses(&self, placeholder: Placeholder) -> bool {
    self
      .segments
      .iter()
      .any(|segment| *segment == Segment::Placeholder(placeholder))
  }

  /// Substitute every placeholder. A placeholder without a binding is an error.
  pub fn render(&self, bindings: &Bindings) -> Result<String> {
    let mut rendered = String::with_capacity(self.source.len());
    for segment in &self.segments {
      match segment {
        Segment::Literal(text) => rendered.push_str(text),
        Segment::Placeholder(placeholder) => {
          let value = bindings.get(*placeholder).ok_or_else(|| {
            AssetError::template(&self.source, format!("no value available for {placeholder}"))
          })?;
          rendered.push_str(value);
        }
      }
    }
    Ok(rendered)
  }
}

fn push_literal(source: &str, text: &str, segments: &mut Vec<Segment>) -> Result<()> {
  if text.contains("{{") || text.contains("}}") {
    return Err(AssetError::template(source, "unbalanced placeholder braces"));
  }
  if !text.is_empty() {
    segments.push(Segment::Literal(text.to_string()));
  }
  Ok(())
}

/// Parse `template` and render it with `bindings` in one step.
pub fn expand(template: &str, bindings: &Bindings) -> Result<String> {
  Template::parse(template)?.render(bindings)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn expands_known_placeholders() {
    let bindings = Bindings::new()
      .with(Placeholder::LastModified, "1700000000")
      .with(Placeholder::VersionHash, "abc123");

    let url = expand("/assets/{{VERSION_HASH}}/{{LAST_MODIFIED}}", &bindings).unwrap();
    assert_eq!(url, "/assets/abc123/1700000000");
  }

  #[test]
  fn plain_strings_pass_through() {
    assert_eq!(expand("/static", &Bindings::new()).unwrap(), "/static");
    assert_eq!(expand("", &Bindings::new()).unwrap(), "");
  }

  #[test]
  fn rejects_unknown_placeholders() {
    let err = expand("/cache/{{BUILD_ID}}", &Bindings::new()).unwrap_err();
    assert!(matches!(err, AssetError::Template { .. }));
    assert!(err.to_string().contains("BUILD_ID"));
  }

  #[test]
  fn rejects_unterminated_placeholders() {
    let err = Template::parse("/cache/{{VERSION_HASH").unwrap_err();
    assert!(matches!(err, AssetError::Template { .. }));
  }

  #[test]
  fn missing_binding_is_an_error() {
    let template = Template::parse("{{NODE_MODULES}}/uglify-js/bin/uglifyjs").unwrap();
    assert!(template.render(&Bindings::new()).is_err());
  }

  #[test]
  fn reports_placeholders_in_use() {
    let template = Template::parse("{{VERSION_HASH}}/{{LAST_MODIFIED}}/{{VERSION_HASH}}").unwrap();
    assert!(template.uses(Placeholder::VersionHash));
    assert!(template.uses(Placeholder::LastModified));
    assert!(!template.uses(Placeholder::NodeModules));
  }
}
