use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::config::{AssetConfig, NodeModulesConfig};
use crate::error::{AssetError, Result};

use super::builtin::default_bindings;
use super::{BuiltinFilter, FilterStep, NamedTransformer, Transformer};

/// Signature of a configuration supplied filter factory.
pub type FactoryFn = dyn Fn(&NodeModulesConfig) -> Result<Arc<dyn Transformer>> + Send + Sync;

/// How a filter name is turned into a transformer instance.
#[derive(Clone)]
pub enum FilterFactory {
  /// One of the filters shipped with the crate.
  Builtin(BuiltinFilter),
  /// A factory registered by the embedding application.
  Custom(Arc<FactoryFn>),
}

impl fmt::Debug for FilterFactory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Builtin(filter) => f.debug_tuple("Builtin").field(filter).finish(),
      Self::Custom(_) => f.write_str("Custom(..)"),
    }
  }
}

impl FilterFactory {
  /// Wrap a closure as a custom factory.
  pub fn custom<F>(factory: F) -> Self
  where
    F: Fn(&NodeModulesConfig) -> Result<Arc<dyn Transformer>> + Send + Sync + 'static,
  {
    Self::Custom(Arc::new(factory))
  }

  fn build(&self, node_modules: &NodeModulesConfig) -> Result<Arc<dyn Transformer>> {
    match self {
      Self::Builtin(filter) => filter.instantiate(node_modules),
      Self::Custom(factory) => factory(node_modules),
    }
  }
}

/// Extension → filter chain table with lazily created, shared transformer instances.
///
/// Instances are built at most once per name and chains are memoized per
/// extension and mode. Mutating the registry drops the memoized state it affects.
pub struct FilterRegistry {
  factories: BTreeMap<String, FilterFactory>,
  bindings: BTreeMap<String, Vec<FilterStep>>,
  disabled: BTreeSet<String>,
  node_modules: NodeModulesConfig,
  instances: Mutex<HashMap<String, Arc<dyn Transformer>>>,
  chains: Mutex<HashMap<(String, bool), Vec<NamedTransformer>>>,
}

impl fmt::Debug for FilterRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FilterRegistry")
      .field("factories", &self.factories)
      .field("bindings", &self.bindings)
      .field("disabled", &self.disabled)
      .finish_non_exhaustive()
  }
}

impl Default for FilterRegistry {
  fn default() -> Self {
    let mut registry = Self::empty(NodeModulesConfig::default());
    for filter in BuiltinFilter::ALL {
      registry.register_factory(filter.name(), FilterFactory::Builtin(filter));
    }
    for (extension, steps) in default_bindings() {
      registry.bind_extension(extension, steps);
    }
    registry
  }
}

impl FilterRegistry {
  /// Registry without factories or bindings.
  pub fn empty(node_modules: NodeModulesConfig) -> Self {
    Self {
      factories: BTreeMap::new(),
      bindings: BTreeMap::new(),
      disabled: BTreeSet::new(),
      node_modules,
      instances: Mutex::new(HashMap::new()),
      chains: Mutex::new(HashMap::new()),
    }
  }

  /// Built-in factories and default bindings overlaid with configuration.
  pub fn from_config(config: &AssetConfig) -> Self {
    let mut registry = Self {
      node_modules: config.filters.node_modules.clone(),
      ..Self::default()
    };
    for (extension, steps) in &config.filters.by_extension {
      registry.bind_extension(extension.clone(), steps.clone());
    }
    for name in &config.disabled_filters {
      registry.disable(name.clone());
    }
    registry
  }

  /// Register (or replace) the factory for `name`.
  pub fn register_factory(&mut self, name: impl Into<String>, factory: FilterFactory) {
    let name = name.into();
    self.instances.get_mut().remove(&name);
    self.chains.get_mut().clear();
    self.factories.insert(name, factory);
  }

  /// Bind `extension` to `steps`, replacing any previous binding.
  pub fn bind_extension(&mut self, extension: impl Into<String>, steps: Vec<FilterStep>) {
    self.chains.get_mut().clear();
    self.bindings.insert(extension.into(), steps);
  }

  /// Remove `name` from every chain.
  pub fn disable(&mut self, name: impl Into<String>) {
    self.chains.get_mut().clear();
    self.disabled.insert(name.into());
  }

  /// Shared instance for `name`, created on first use.
  pub fn instance(&self, name: &str) -> Result<Arc<dyn Transformer>> {
    if let Some(instance) = self.instances.lock().get(name) {
      return Ok(Arc::clone(instance));
    }

    let factory = self
      .factories
      .get(name)
      .ok_or_else(|| AssetError::UnknownFilter {
        name: name.to_string(),
      })?;
    let built = factory.build(&self.node_modules)?;
    debug!(filter = name, "instantiated filter");

    let mut instances = self.instances.lock();
    let instance = instances
      .entry(name.to_string())
      .or_insert_with(|| built);
    Ok(Arc::clone(instance))
  }

  /// Ordered transformers bound to `extension`.
  ///
  /// Optional steps are skipped in debug mode and disabled filters are dropped
  /// everywhere. The result is memoized per extension and mode.
  pub fn chain_for(&self, extension: &str, debug: bool) -> Result<Vec<NamedTransformer>> {
    let key = (extension.to_string(), debug);
    if let Some(chain) = self.chains.lock().get(&key) {
      return Ok(chain.clone());
    }

    let mut chain = Vec::new();
    for step in self.bindings.get(extension).into_iter().flatten() {
      if (step.optional && debug) || self.disabled.contains(&step.name) {
        continue;
      }
      let transformer = self.instance(&step.name)?;
      chain.push(NamedTransformer {
        name: step.name.clone(),
        transformer,
      });
    }

    self.chains.lock().insert(key, chain.clone());
    Ok(chain)
  }

  /// Chain for a file: its extension chains concatenated right to left.
  ///
  /// `widget.coffee.js` yields the `js` chain followed by the `coffee` chain. A
  /// filter requested by several extensions is kept only at its first position.
  pub fn file_chain(&self, file_name: &str, debug: bool) -> Result<Vec<NamedTransformer>> {
    let base_name = file_name.rsplit('/').next().unwrap_or(file_name);
    let mut chain: Vec<NamedTransformer> = Vec::new();

    for extension in base_name.rsplit('.') {
      for step in self.chain_for(extension, debug)? {
        if !chain.iter().any(|existing| existing.name == step.name) {
          chain.push(step);
        }
      }
    }

    Ok(chain)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::filters::{TransformContext, TransformStage};
  use std::sync::atomic::{AtomicUsize, Ordering};

  struct Identity(TransformStage);

  impl Transformer for Identity {
    fn stage(&self) -> TransformStage {
      self.0
    }

    fn apply(&self, source: &[u8], _context: &TransformContext<'_>) -> Result<Vec<u8>> {
      Ok(source.to_vec())
    }
  }

  fn counting_factory(counter: Arc<AtomicUsize>, stage: TransformStage) -> FilterFactory {
    FilterFactory::custom(move |_| {
      counter.fetch_add(1, Ordering::SeqCst);
      Ok(Arc::new(Identity(stage)) as Arc<dyn Transformer>)
    })
  }

  fn names(chain: &[NamedTransformer]) -> Vec<&str> {
    chain.iter().map(|step| step.name.as_str()).collect()
  }

  fn widget_registry(counter: Arc<AtomicUsize>) -> FilterRegistry {
    let mut registry = FilterRegistry::empty(NodeModulesConfig::default());
    registry.register_factory(
      "uglify_js",
      counting_factory(Arc::clone(&counter), TransformStage::Dump),
    );
    registry.register_factory("coffee", counting_factory(counter, TransformStage::Load));
    registry.bind_extension("js", vec![FilterStep::optional("uglify_js")]);
    registry.bind_extension("coffee", vec![FilterStep::required("coffee")]);
    registry
  }

  #[test]
  fn file_chain_walks_extensions_right_to_left() {
    let registry = widget_registry(Arc::new(AtomicUsize::new(0)));

    let production = registry.file_chain("widget.coffee.js", false).unwrap();
    assert_eq!(names(&production), vec!["uglify_js", "coffee"]);

    let debug = registry.file_chain("widget.coffee.js", true).unwrap();
    assert_eq!(names(&debug), vec!["coffee"]);
  }

  #[test]
  fn chains_and_instances_are_memoized() {
    let counter = Arc::new(AtomicUsize::new(0));
    let registry = widget_registry(Arc::clone(&counter));

    let first = registry.chain_for("js", false).unwrap();
    let second = registry.chain_for("js", false).unwrap();

    assert_eq!(names(&first), names(&second));
    assert!(Arc::ptr_eq(&first[0].transformer, &second[0].transformer));
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    registry.file_chain("other.coffee.js", false).unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn unknown_filter_fails_at_chain_build() {
    let mut registry = FilterRegistry::empty(NodeModulesConfig::default());
    registry.bind_extension("js", vec![FilterStep::required("closure")]);

    assert!(matches!(
      registry.chain_for("js", false),
      Err(AssetError::UnknownFilter { name }) if name == "closure"
    ));
  }

  #[test]
  fn disabled_filters_are_removed_everywhere() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut registry = widget_registry(counter);
    registry.bind_extension("mjs", vec![FilterStep::required("uglify_js")]);
    registry.disable("uglify_js");

    assert!(registry.chain_for("js", false).unwrap().is_empty());
    assert!(registry.chain_for("mjs", false).unwrap().is_empty());
    assert_eq!(names(&registry.file_chain("a.coffee.js", false).unwrap()), vec![
      "coffee"
    ]);
  }

  #[test]
  fn disabling_an_unregistered_filter_is_harmless() {
    let mut registry = FilterRegistry::empty(NodeModulesConfig::default());
    registry.bind_extension("css", vec![FilterStep::required("not_installed")]);
    assert!(registry.chain_for("css", false).is_err());

    registry.disable("not_installed");
    assert!(registry.chain_for("css", true).unwrap().is_empty());
  }

  #[test]
  fn duplicate_filters_are_applied_once() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut registry = widget_registry(counter);
    registry.bind_extension("min", vec![FilterStep::required("uglify_js")]);

    let chain = registry.file_chain("lib.min.js", false).unwrap();
    assert_eq!(names(&chain), vec!["uglify_js"]);
  }

  #[test]
  fn later_binding_replaces_earlier_one() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut registry = widget_registry(counter);
    assert_eq!(names(&registry.chain_for("js", false).unwrap()), vec![
      "uglify_js"
    ]);

    registry.bind_extension("js", vec![FilterStep::required("coffee")]);
    assert_eq!(names(&registry.chain_for("js", false).unwrap()), vec![
      "coffee"
    ]);
  }

  #[test]
  fn defaults_cover_stylesheets_and_scripts() {
    let registry = FilterRegistry::default();
    let css = registry.chain_for("css", false).unwrap();
    assert_eq!(names(&css), vec!["css_urls", "uglify_css"]);
    assert_eq!(names(&registry.chain_for("css", true).unwrap()), vec![
      "css_urls"
    ]);
    assert!(registry.chain_for("png", false).unwrap().is_empty());
  }

  #[test]
  fn configuration_replaces_bindings_and_disables() {
    let mut config = AssetConfig::default();
    config
      .filters
      .by_extension
      .insert("css".into(), vec![FilterStep::required("css_urls")]);
    config.disabled_filters.push("uglify_js".into());

    let registry = FilterRegistry::from_config(&config);
    assert_eq!(names(&registry.chain_for("css", false).unwrap()), vec![
      "css_urls"
    ]);
    assert!(registry.chain_for("js", false).unwrap().is_empty());
    assert_eq!(names(&registry.chain_for("coffee", false).unwrap()), vec![
      "coffee"
    ]);
  }
}
