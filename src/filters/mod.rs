//! Content transformation: the transformer interface, the built-in filters and the
//! registry that assembles per-extension filter chains.

mod builtin;
mod css_urls;
mod external;
mod registry;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use builtin::BuiltinFilter;
pub use css_urls::CssUrlRewrite;
pub use external::ExternalCommand;
pub use registry::{FactoryFn, FilterFactory, FilterRegistry};

/// When a transformer runs relative to the other steps of a file's chain.
///
/// Every `Load` step of a chain runs before any `Dump` step; within a stage the
/// chain order is kept. Compilers are load steps, minifiers and rewriters are
/// dump steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformStage {
  /// Turns source syntax into deliverable syntax.
  Load,
  /// Post-processes deliverable content.
  Dump,
}

/// Information about the file being transformed.
#[derive(Debug, Clone, Copy)]
pub struct TransformContext<'a> {
  /// Physical source file.
  pub source_path: &'a Path,
  /// URL the output will be served from.
  pub target_url: &'a str,
}

/// A content transformation step.
pub trait Transformer: Send + Sync {
  /// Stage the transformer belongs to.
  fn stage(&self) -> TransformStage {
    TransformStage::Dump
  }

  /// Transform `source` and return the new content.
  fn apply(&self, source: &[u8], context: &TransformContext<'_>) -> Result<Vec<u8>>;
}

/// One entry of an extension binding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "FilterStepRepr")]
pub struct FilterStep {
  /// Registered filter name.
  pub name: String,
  /// Optional steps are skipped in debug mode.
  #[serde(default)]
  pub optional: bool,
}

impl FilterStep {
  /// A step that always runs.
  pub fn required(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      optional: false,
    }
  }

  /// A step skipped in debug mode.
  pub fn optional(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      optional: true,
    }
  }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FilterStepRepr {
  Name(String),
  Full {
    name: String,
    #[serde(default)]
    optional: bool,
  },
}

impl From<FilterStepRepr> for FilterStep {
  fn from(repr: FilterStepRepr) -> Self {
    match repr {
      FilterStepRepr::Name(name) => Self::required(name),
      FilterStepRepr::Full { name, optional } => Self { name, optional },
    }
  }
}

/// A transformer instance together with the name it was registered under.
#[derive(Clone)]
pub struct NamedTransformer {
  /// Filter name.
  pub name: String,
  /// Shared instance.
  pub transformer: Arc<dyn Transformer>,
}

impl fmt::Debug for NamedTransformer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("NamedTransformer")
      .field("name", &self.name)
      .field("stage", &self.transformer.stage())
      .finish()
  }
}

/// Run `source` through `chain`: load steps first, then dump steps.
pub fn apply_chain(
  chain: &[NamedTransformer],
  source: Vec<u8>,
  context: &TransformContext<'_>,
) -> Result<Vec<u8>> {
  let mut content = source;
  for stage in [TransformStage::Load, TransformStage::Dump] {
    for step in chain.iter().filter(|step| step.transformer.stage() == stage) {
      tracing::trace!(filter = %step.name, source = %context.source_path.display(), "applying filter");
      content = step.transformer.apply(&content, context)?;
    }
  }
  Ok(content)
}
