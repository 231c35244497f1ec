use regex::Regex;

fn asset_reference_ignores() -> &'static [Regex] {
  use std::sync::OnceLock;

  static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
  PATTERNS
    .get_or_init(|| {
      vec![
        Regex::new(r"(?i)^[a-z][a-z0-9+.-]*:").expect("invalid scheme regex"),
        Regex::new(r"^//").expect("invalid protocol-relative regex"),
        Regex::new(r"^#").expect("invalid fragment regex"),
      ]
    })
    .as_slice()
}

/// Determine whether a stylesheet reference points outside the asset tree.
///
/// Schemed URLs (`https:`, `data:`, `mailto:` ...), protocol-relative URLs and
/// bare fragments can never be resolved to a local file, so they are neither
/// rewritten nor copied.
pub fn should_ignore_asset_reference(value: &str) -> bool {
  let value = value.trim();
  value.is_empty()
    || asset_reference_ignores()
      .iter()
      .any(|pattern| pattern.is_match(value))
}

/// Whether a reference is already absolute on the current host.
pub fn is_root_relative(value: &str) -> bool {
  value.starts_with('/') && !value.starts_with("//")
}
