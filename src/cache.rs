//! Disk cache for bundled production content.
//!
//! Entries never expire: the cache path is templated from the inputs that change
//! the output (last modified time, version token), so a changed input selects a
//! different file. Writes go through a temporary file in the destination
//! directory and are renamed into place, so readers never observe partial content.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{AssetError, Result};

/// Existence-checked byte cache rooted at an expanded cache directory.
#[derive(Debug, Clone)]
pub struct DiskCache {
  root: PathBuf,
}

impl DiskCache {
  /// Cache rooted at `root`; the directory is created on first write.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Location of the entry for the slash separated `key`.
  pub fn entry_path(&self, key: &str) -> PathBuf {
    key
      .split('/')
      .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
      .fold(self.root.clone(), |path, segment| path.join(segment))
  }

  /// Cached bytes for `key`, or `None` when no entry exists.
  pub fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>> {
    let path = self.entry_path(key);
    match fs::read(&path) {
      Ok(bytes) => {
        debug!(path = %path.display(), "asset cache hit");
        Ok(Some(bytes))
      }
      Err(err) if err.kind() == ErrorKind::NotFound => {
        debug!(path = %path.display(), "asset cache miss");
        Ok(None)
      }
      Err(err) => Err(AssetError::io(path, err)),
    }
  }

  /// Atomically store `bytes` for `key`, creating parent directories as needed.
  pub fn store(&self, key: &str, bytes: &[u8]) -> Result<PathBuf> {
    let path = self.entry_path(key);
    let parent = path.parent().unwrap_or(&self.root).to_path_buf();
    fs::create_dir_all(&parent).map_err(|err| AssetError::io(&parent, err))?;

    let mut staged = NamedTempFile::new_in(&parent).map_err(|err| AssetError::io(&parent, err))?;
    staged
      .write_all(bytes)
      .map_err(|err| AssetError::io(staged.path(), err))?;
    staged
      .persist(&path)
      .map_err(|err| AssetError::io(&path, err.error))?;

    info!(path = %path.display(), bytes = bytes.len(), "wrote asset cache entry");
    Ok(path)
  }
}
