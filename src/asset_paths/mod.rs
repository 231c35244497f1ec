//! Helpers for building, normalising and discovering asset paths and URLs.
//!
//! The responsibilities are split into focused submodules so that URL joining,
//! reference filtering, candidate expansion and reference extraction can be
//! tested independently. The same helpers are shared by the manifest resolver,
//! the CSS URL rewriter and the precompile service.

mod candidates;
mod filters;
mod references;
mod urls;

pub use candidates::generate_asset_candidates;
pub use filters::{is_root_relative, should_ignore_asset_reference};
pub use references::{extract_references, rewrite_references};
pub use urls::{join_url, resolve_relative_url, url_directory};
