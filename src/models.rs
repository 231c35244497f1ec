//! Data structures passed between the resolver, the filters and the service.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A physical file backing (part of) a logical asset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AssetDescriptor {
  /// File name as found on disk, carrying every extension (`app.css.scss`).
  pub requested_name: String,
  /// Absolute path of the source file.
  pub absolute_path: PathBuf,
  /// Slash separated path used for public URLs and output paths (`css/app.css`).
  pub logical_path: String,
  /// Modification time in seconds since the Unix epoch.
  pub last_modified: u64,
}

impl AssetDescriptor {
  /// Build a descriptor, reading the modification time from the filesystem.
  pub fn from_file(
    absolute_path: &Path,
    logical_path: impl Into<String>,
  ) -> std::io::Result<Self> {
    let metadata = std::fs::metadata(absolute_path)?;
    let requested_name = absolute_path
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_default();

    Ok(Self {
      requested_name,
      absolute_path: absolute_path.to_path_buf(),
      logical_path: logical_path.into().replace('\\', "/"),
      last_modified: epoch_seconds(metadata.modified()?),
    })
  }
}

/// Convert a [`SystemTime`] into whole seconds since the Unix epoch.
pub fn epoch_seconds(time: SystemTime) -> u64 {
  time
    .duration_since(UNIX_EPOCH)
    .map(|duration| duration.as_secs())
    .unwrap_or_default()
}

/// The output of running one file through its filter chain.
#[derive(Debug, Clone)]
pub struct TransformedFile {
  /// Descriptor of the source file.
  pub descriptor: AssetDescriptor,
  /// Public URL the content will be delivered from.
  pub target_url: String,
  /// Transformed bytes.
  pub content: Vec<u8>,
}

/// Summary of a precompile run.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PrecompileReport {
  /// Logical paths of the known assets written to the output tree.
  pub assets: Vec<String>,
  /// Logical paths of sub-resources copied into the output tree.
  pub dependencies: Vec<String>,
}
