use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{AssetError, Result};

/// Kind used for stylesheet tags.
pub const STYLE: &str = "style";
/// Kind used for script tags.
pub const SCRIPT: &str = "script";

const STYLE_TEMPLATE: &str = r#"<link rel="stylesheet" href="{url}" />"#;
const SCRIPT_TEMPLATE: &str = r#"<script type="text/javascript" src="{url}"></script>"#;

/// Renders the HTML that includes an asset URL in a page.
pub trait TagRenderer: Send + Sync {
  /// Produce markup for `url`.
  fn render(&self, url: &str) -> String;
}

impl<F> TagRenderer for F
where
  F: Fn(&str) -> String + Send + Sync,
{
  fn render(&self, url: &str) -> String {
    self(url)
  }
}

/// Renderer backed by a string containing a `{url}` marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagTemplate(String);

impl TagTemplate {
  /// Wrap a template string.
  pub fn new(template: impl Into<String>) -> Self {
    Self(template.into())
  }
}

impl TagRenderer for TagTemplate {
  fn render(&self, url: &str) -> String {
    self.0.replace("{url}", url)
  }
}

/// Asset kind → renderer table.
#[derive(Clone)]
pub struct TagRendererRegistry {
  renderers: BTreeMap<String, Arc<dyn TagRenderer>>,
}

impl fmt::Debug for TagRendererRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TagRendererRegistry")
      .field("kinds", &self.renderers.keys().collect::<Vec<_>>())
      .finish()
  }
}

impl Default for TagRendererRegistry {
  fn default() -> Self {
    let style: Arc<dyn TagRenderer> = Arc::new(TagTemplate::new(STYLE_TEMPLATE));
    let script: Arc<dyn TagRenderer> = Arc::new(TagTemplate::new(SCRIPT_TEMPLATE));

    let mut renderers = BTreeMap::new();
    renderers.insert(STYLE.to_string(), Arc::clone(&style));
    renderers.insert("css".to_string(), style);
    renderers.insert(SCRIPT.to_string(), Arc::clone(&script));
    renderers.insert("js".to_string(), script);

    Self { renderers }
  }
}

impl TagRendererRegistry {
  /// Registry without any renderers.
  pub fn empty() -> Self {
    Self {
      renderers: BTreeMap::new(),
    }
  }

  /// Bind `kind` to `renderer`, replacing any previous binding.
  pub fn register(&mut self, kind: impl Into<String>, renderer: impl TagRenderer + 'static) {
    self.renderers.insert(kind.into(), Arc::new(renderer));
  }

  /// Renderer for `kind`.
  pub fn get(&self, kind: &str) -> Result<Arc<dyn TagRenderer>> {
    self
      .renderers
      .get(kind)
      .cloned()
      .ok_or_else(|| AssetError::UnknownRenderer {
        kind: kind.to_string(),
      })
  }

  /// Render a single tag.
  pub fn render(&self, kind: &str, url: &str) -> Result<String> {
    Ok(self.get(kind)?.render(url))
  }
}
