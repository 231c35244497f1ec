//! Manifest resolution: mapping a logical asset name to the physical files behind it.

mod directives;
mod resolver;
mod scanning;

use crate::error::Result;
use crate::models::AssetDescriptor;

pub use directives::{Directive, parse_directives};
pub use resolver::DirectiveResolver;
pub use scanning::{FoundFile, collect_tree, find_in_root};

/// Source of asset descriptors for logical names.
pub trait ManifestResolver: Send + Sync {
  /// Every constituent file of `name`, dependencies before dependents, ending
  /// with the file that answers to `name` itself.
  fn resolve_all(&self, name: &str) -> Result<Vec<AssetDescriptor>>;

  /// The single file answering to `name`, without following its dependencies.
  fn resolve_one(&self, name: &str) -> Result<AssetDescriptor>;
}
