//! Concatenation of transformed files into one deliverable.

use crate::models::TransformedFile;

/// Joins the transformed constituents of a logical asset.
pub trait Combine: Send + Sync {
  /// Combine `files`, which arrive in manifest order.
  fn combine(&self, files: Vec<TransformedFile>) -> Vec<u8>;
}

/// Joins file contents with a single newline between them.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewlineCombiner;

impl Combine for NewlineCombiner {
  fn combine(&self, files: Vec<TransformedFile>) -> Vec<u8> {
    let total: usize = files.iter().map(|file| file.content.len() + 1).sum();
    let mut combined = Vec::with_capacity(total);
    for (index, file) in files.into_iter().enumerate() {
      if index > 0 {
        combined.push(b'\n');
      }
      combined.extend(file.content);
    }
    combined
  }
}
