//! Version token used for cache busting in URL prefixes and cache paths.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::debug;

use crate::error::{AssetError, Result};

/// Resolves the version token at most once per successful lookup.
///
/// An explicit token is used as-is. Otherwise the first line of the version file
/// is read and trimmed. Failed reads are not remembered, so a version file that
/// appears later is picked up on the next call.
#[derive(Debug, Default)]
pub struct VersionResolver {
  configured: Option<String>,
  version_file: Option<PathBuf>,
  resolved: OnceLock<String>,
}

impl VersionResolver {
  /// Create a resolver from the configured token and/or version file.
  pub fn new(configured: Option<String>, version_file: Option<PathBuf>) -> Self {
    Self {
      configured,
      version_file,
      resolved: OnceLock::new(),
    }
  }

  /// Return the version token, reading the version file if necessary.
  pub fn resolve(&self) -> Result<String> {
    if let Some(version) = self.resolved.get() {
      return Ok(version.clone());
    }

    let version = match (&self.configured, &self.version_file) {
      (Some(configured), _) => configured.clone(),
      (None, Some(path)) => read_version_file(path)?,
      (None, None) => {
        return Err(AssetError::VersionFile {
          path: PathBuf::new(),
          reason: "neither version_hash nor version_file is configured".into(),
        });
      }
    };

    debug!(version = %version, "resolved asset version");
    Ok(self.resolved.get_or_init(|| version).clone())
  }
}

fn read_version_file(path: &Path) -> Result<String> {
  let content = fs::read_to_string(path).map_err(|err| AssetError::VersionFile {
    path: path.to_path_buf(),
    reason: err.to_string(),
  })?;

  let first_line = content.lines().next().unwrap_or_default().trim();
  if first_line.is_empty() {
    return Err(AssetError::VersionFile {
      path: path.to_path_buf(),
      reason: "first line is empty".into(),
    });
  }

  Ok(first_line.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn configured_value_wins_over_file() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("VERSION");
    fs::write(&file, "from-file\n").unwrap();

    let resolver = VersionResolver::new(Some("explicit".into()), Some(file));
    assert_eq!(resolver.resolve().unwrap(), "explicit");
  }

  #[test]
  fn reads_and_trims_first_line() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("VERSION");
    fs::write(&file, "  3f2a9c  \nsecond line\n").unwrap();

    let resolver = VersionResolver::new(None, Some(file));
    assert_eq!(resolver.resolve().unwrap(), "3f2a9c");
  }

  #[test]
  fn successful_read_is_memoized() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("VERSION");
    fs::write(&file, "first").unwrap();

    let resolver = VersionResolver::new(None, Some(file.clone()));
    assert_eq!(resolver.resolve().unwrap(), "first");

    fs::write(&file, "second").unwrap();
    assert_eq!(resolver.resolve().unwrap(), "first");
  }

  #[test]
  fn failed_read_is_retried() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("VERSION");

    let resolver = VersionResolver::new(None, Some(file.clone()));
    assert!(matches!(
      resolver.resolve(),
      Err(AssetError::VersionFile { .. })
    ));

    fs::write(&file, "").unwrap();
    assert!(resolver.resolve().is_err());

    fs::write(&file, "recovered\n").unwrap();
    assert_eq!(resolver.resolve().unwrap(), "recovered");
  }

  #[test]
  fn unconfigured_resolver_fails() {
    let resolver = VersionResolver::default();
    assert!(resolver.resolve().is_err());
  }
}
