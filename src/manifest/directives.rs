//! Parsing of `require` directives from a source file's header comment.

use std::sync::OnceLock;

use regex::Regex;

/// A dependency declared in a file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
  /// `require name`: one logical asset, extension optional.
  Require(String),
  /// `require_tree dir`: every file below a directory, in path order.
  RequireTree(String),
}

fn directive_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r#"^\s*(?:/\*|//|\*|#)=\s*(require_tree|require)\s+['"]?([^'"\s]+)['"]?\s*(?:\*/)?\s*$"#)
      .expect("invalid directive regex")
  })
}

fn parse_line(line: &str) -> Option<Directive> {
  let captures = directive_pattern().captures(line)?;
  let argument = captures.get(2)?.as_str().to_string();
  match captures.get(1)?.as_str() {
    "require_tree" => Some(Directive::RequireTree(argument)),
    _ => Some(Directive::Require(argument)),
  }
}

/// Directives found in the leading comment block of `source`.
///
/// Scanning stops at the first line that is neither blank nor part of a
/// comment, so directives further down the file are ignored.
pub fn parse_directives(source: &str) -> Vec<Directive> {
  let mut directives = Vec::new();
  let mut in_block = false;

  for line in source.lines() {
    let trimmed = line.trim();

    if in_block {
      directives.extend(parse_line(trimmed));
      if trimmed.contains("*/") {
        in_block = false;
      }
      continue;
    }

    if trimmed.is_empty() {
      continue;
    }

    if trimmed.starts_with("//") || trimmed.starts_with('#') {
      directives.extend(parse_line(trimmed));
    } else if let Some(rest) = trimmed.strip_prefix("/*") {
      directives.extend(parse_line(trimmed));
      in_block = !rest.contains("*/");
    } else {
      break;
    }
  }

  directives
}
