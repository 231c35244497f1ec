//! Error type shared by every stage of the asset pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, AssetError>;

/// Failures raised while resolving, transforming, caching or precompiling assets.
///
/// None of these are recovered internally: each aborts the current logical-asset
/// operation and is handed back to the caller.
#[derive(Debug, Error)]
pub enum AssetError {
  /// A filter step names a factory that was never registered.
  #[error("unknown filter named '{name}'")]
  UnknownFilter {
    /// Filter name requested by an extension binding.
    name: String,
  },
  /// No tag renderer exists for the requested kind.
  #[error("no known tag renderer for asset kind '{kind}'")]
  UnknownRenderer {
    /// Asset kind that was requested.
    kind: String,
  },
  /// Known-asset gating is active and the name is not whitelisted.
  #[error("'{name}' was not found in the known assets configuration")]
  UnknownAsset {
    /// Requested logical name.
    name: String,
  },
  /// The manifest resolver found no file for a logical name.
  #[error("asset '{name}' could not be found in any search path")]
  AssetNotFound {
    /// Requested logical name.
    name: String,
  },
  /// The version token could not be read from the version file.
  #[error("failed to resolve version from {}: {reason}", path.display())]
  VersionFile {
    /// Version file that was consulted (empty when none is configured).
    path: PathBuf,
    /// Human readable cause.
    reason: String,
  },
  /// A filesystem operation failed.
  #[error("i/o failure at {}: {source}", path.display())]
  Io {
    /// Path being read or written.
    path: PathBuf,
    /// Underlying error.
    #[source]
    source: std::io::Error,
  },
  /// A template string is malformed or needs a value that was not bound.
  #[error("invalid template '{template}': {reason}")]
  Template {
    /// The offending template.
    template: String,
    /// Human readable cause.
    reason: String,
  },
  /// A transformer failed to process a file.
  #[error("filter '{filter}' failed: {message}")]
  Transform {
    /// Filter name.
    filter: String,
    /// Failure detail, usually captured stderr.
    message: String,
  },
  /// Configuration could not be loaded.
  #[error("failed to load configuration from {}: {message}", path.display())]
  Config {
    /// Configuration file path.
    path: PathBuf,
    /// Parse or read failure.
    message: String,
  },
  /// A precompile run was aborted.
  #[error("precompiling '{asset}' failed: {source}")]
  Precompile {
    /// Known asset being precompiled when the failure happened.
    asset: String,
    /// The failure that aborted the run.
    #[source]
    source: Box<AssetError>,
  },
}

impl AssetError {
  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Io {
      path: path.into(),
      source,
    }
  }

  pub(crate) fn template(template: &str, reason: impl Into<String>) -> Self {
    Self::Template {
      template: template.to_string(),
      reason: reason.into(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::error::Error as _;

  #[test]
  fn precompile_error_exposes_inner_failure() {
    let inner = AssetError::AssetNotFound {
      name: "images/logo.png".into(),
    };
    let err = AssetError::Precompile {
      asset: "app.css".into(),
      source: Box::new(inner),
    };

    assert!(err.to_string().contains("app.css"));
    let source = err.source().expect("precompile errors carry a source");
    assert!(source.to_string().contains("images/logo.png"));
  }

  #[test]
  fn io_helper_keeps_path() {
    let err = AssetError::io(
      "cache/app.js",
      std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
    );
    assert!(err.to_string().starts_with("i/o failure at cache/app.js"));
  }
}
