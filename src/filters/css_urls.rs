use crate::asset_paths::{
  is_root_relative, resolve_relative_url, rewrite_references, should_ignore_asset_reference,
  url_directory,
};
use crate::error::{AssetError, Result};

use super::{TransformContext, TransformStage, Transformer};

/// Rewrites relative stylesheet references so they resolve from the delivery URL.
///
/// A reference such as `../images/logo.png` inside a file served from
/// `/assets/1700000000/css/site.css` becomes `/assets/1700000000/images/logo.png`.
/// External, fragment and root-relative references are kept verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct CssUrlRewrite;

impl Transformer for CssUrlRewrite {
  fn stage(&self) -> TransformStage {
    TransformStage::Dump
  }

  fn apply(&self, source: &[u8], context: &TransformContext<'_>) -> Result<Vec<u8>> {
    let css = std::str::from_utf8(source).map_err(|err| AssetError::Transform {
      filter: "css_urls".into(),
      message: format!("{} is not valid UTF-8: {err}", context.source_path.display()),
    })?;

    let base_dir = url_directory(context.target_url);
    let rewritten = rewrite_references(css, |reference| {
      if should_ignore_asset_reference(reference) || is_root_relative(reference) {
        None
      } else {
        Some(resolve_relative_url(base_dir, reference))
      }
    });

    Ok(rewritten.into_bytes())
  }
}
