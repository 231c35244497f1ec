use std::sync::OnceLock;

use regex::Regex;

fn url_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r#"url\(\s*(?:"([^"]*)"|'([^']*)'|([^)"'\s]*))\s*\)"#).expect("invalid url() regex")
  })
}

fn alpha_loader_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r"(?i)AlphaImageLoader\([^)]*\)").expect("invalid AlphaImageLoader regex")
  })
}

fn alpha_src_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r#"(?i)src\s*=\s*(?:"([^"]*)"|'([^']*)'|([^,)"'\s]*))"#)
      .expect("invalid AlphaImageLoader src regex")
  })
}

fn first_group(captures: &regex::Captures<'_>) -> Option<String> {
  (1..=3)
    .find_map(|index| captures.get(index))
    .map(|value| value.as_str().to_string())
}

/// Extract embedded resource references from stylesheet content.
///
/// Every `url(...)` reference is returned first, in document order, followed by
/// the `src=` values of legacy `AlphaImageLoader(...)` filter expressions. The
/// order is stable so two renders of the same stylesheet can be compared
/// position by position.
pub fn extract_references(content: &str) -> Vec<String> {
  let mut references: Vec<String> = url_pattern()
    .captures_iter(content)
    .filter_map(|captures| first_group(&captures))
    .collect();

  for expression in alpha_loader_pattern().find_iter(content) {
    references.extend(
      alpha_src_pattern()
        .captures_iter(expression.as_str())
        .filter_map(|captures| first_group(&captures)),
    );
  }

  references
}

/// Rewrite embedded stylesheet references in place.
///
/// `rewrite` receives each reference found by [`extract_references`] and returns
/// the replacement, or `None` to keep it. Quoting style is preserved.
pub fn rewrite_references<F>(content: &str, mut rewrite: F) -> String
where
  F: FnMut(&str) -> Option<String>,
{
  let with_urls = url_pattern().replace_all(content, |captures: &regex::Captures<'_>| {
    replace_captured(captures, &mut rewrite, "url(", ")")
  });

  alpha_loader_pattern()
    .replace_all(&with_urls, |expression: &regex::Captures<'_>| {
      alpha_src_pattern()
        .replace_all(&expression[0], |captures: &regex::Captures<'_>| {
          replace_captured(captures, &mut rewrite, "src=", "")
        })
        .into_owned()
    })
    .into_owned()
}

fn replace_captured<F>(
  captures: &regex::Captures<'_>,
  rewrite: &mut F,
  open: &str,
  close: &str,
) -> String
where
  F: FnMut(&str) -> Option<String>,
{
  let quote = match (captures.get(1), captures.get(2)) {
    (Some(_), _) => "\"",
    (None, Some(_)) => "'",
    _ => "",
  };
  let Some(reference) = (1..=3).find_map(|index| captures.get(index)) else {
    return captures[0].to_string();
  };

  match rewrite(reference.as_str()) {
    Some(replacement) => format!("{open}{quote}{replacement}{quote}{close}"),
    None => captures[0].to_string(),
  }
}
