use std::sync::Arc;

use crate::config::NodeModulesConfig;
use crate::error::Result;
use crate::template::{Bindings, Placeholder, expand};

use super::{CssUrlRewrite, ExternalCommand, FilterStep, TransformStage, Transformer};

/// The filters shipped with the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinFilter {
  /// CoffeeScript compiler.
  Coffee,
  /// Sass/SCSS compiler.
  Scss,
  /// Rewrites relative stylesheet references against the delivery URL.
  CssUrls,
  /// UglifyJS minifier.
  UglifyJs,
  /// UglifyCSS minifier.
  UglifyCss,
}

impl BuiltinFilter {
  /// Every built-in filter.
  pub const ALL: [BuiltinFilter; 5] = [
    BuiltinFilter::Coffee,
    BuiltinFilter::Scss,
    BuiltinFilter::CssUrls,
    BuiltinFilter::UglifyJs,
    BuiltinFilter::UglifyCss,
  ];

  /// Name the filter is registered under.
  pub fn name(self) -> &'static str {
    match self {
      BuiltinFilter::Coffee => "coffee",
      BuiltinFilter::Scss => "scss",
      BuiltinFilter::CssUrls => "css_urls",
      BuiltinFilter::UglifyJs => "uglify_js",
      BuiltinFilter::UglifyCss => "uglify_css",
    }
  }

  fn default_binary(self) -> Option<&'static str> {
    match self {
      BuiltinFilter::Coffee => Some("{{NODE_MODULES}}/coffee-script/bin/coffee"),
      BuiltinFilter::Scss => Some("{{NODE_MODULES}}/.bin/sass"),
      BuiltinFilter::UglifyJs => Some("{{NODE_MODULES}}/uglify-js/bin/uglifyjs"),
      BuiltinFilter::UglifyCss => Some("{{NODE_MODULES}}/uglifycss/uglifycss"),
      BuiltinFilter::CssUrls => None,
    }
  }

  /// Build an instance using the configured node binaries.
  pub fn instantiate(self, node_modules: &NodeModulesConfig) -> Result<Arc<dyn Transformer>> {
    let Some(default_binary) = self.default_binary() else {
      return Ok(Arc::new(CssUrlRewrite));
    };

    let binary_template = node_modules
      .binaries
      .get(self.name())
      .map(String::as_str)
      .unwrap_or(default_binary);
    let bindings = Bindings::new().with(Placeholder::NodeModules, node_modules.path.clone());
    let binary = expand(binary_template, &bindings)?;

    let (stage, args): (TransformStage, &[&str]) = match self {
      BuiltinFilter::Coffee => (TransformStage::Load, &["-c", "-p"]),
      BuiltinFilter::Scss => (TransformStage::Load, &["--no-source-map"]),
      _ => (TransformStage::Dump, &[]),
    };
    Ok(Arc::new(
      ExternalCommand::new(self.name(), binary, stage).args(args.iter().copied()),
    ))
  }
}

/// Extension bindings used when configuration does not replace them.
pub(super) fn default_bindings() -> Vec<(&'static str, Vec<FilterStep>)> {
  vec![
    ("coffee", vec![FilterStep::required("coffee")]),
    ("js", vec![FilterStep::optional("uglify_js")]),
    ("scss", vec![FilterStep::required("scss")]),
    ("css", vec![
      FilterStep::required("css_urls"),
      FilterStep::optional("uglify_css"),
    ]),
  ]
}
