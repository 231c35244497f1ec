//! The asset service: tags, content, metadata and the unprefixed sibling used by precompilation.

use std::fmt;
use std::fs;
use std::sync::Arc;

use tracing::debug;

use crate::asset_paths::join_url;
use crate::cache::DiskCache;
use crate::combine::{Combine, NewlineCombiner};
use crate::config::{AssetConfig, KnownAssetPolicy};
use crate::error::{AssetError, Result};
use crate::filters::{FilterRegistry, TransformContext, apply_chain};
use crate::manifest::{DirectiveResolver, ManifestResolver};
use crate::models::{AssetDescriptor, TransformedFile};
use crate::registry::{ContentTypeRegistry, SCRIPT, STYLE, TagRendererRegistry, TagTemplate};
use crate::template::{Bindings, Placeholder, Template};
use crate::version::VersionResolver;

/// Source of the public URL prefix.
#[derive(Clone)]
pub enum UrlPrefix {
  /// A fixed template such as `/assets/{{LAST_MODIFIED}}`.
  Template(String),
  /// A callback evaluated on every URL build; its result is expanded as a template.
  Dynamic(Arc<dyn Fn() -> String + Send + Sync>),
}

impl UrlPrefix {
  /// Prefix computed by `callback` at URL build time.
  pub fn dynamic<F>(callback: F) -> Self
  where
    F: Fn() -> String + Send + Sync + 'static,
  {
    Self::Dynamic(Arc::new(callback))
  }

  fn current(&self) -> String {
    match self {
      Self::Template(template) => template.clone(),
      Self::Dynamic(callback) => callback(),
    }
  }
}

impl fmt::Debug for UrlPrefix {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Template(template) => f.debug_tuple("Template").field(template).finish(),
      Self::Dynamic(_) => f.write_str("Dynamic(..)"),
    }
  }
}

/// Turns logical asset names into tags and deliverable content.
///
/// In debug mode every constituent file is delivered on its own, optional filters
/// are skipped and nothing is cached. In production mode a logical asset is one
/// bundled artifact whose last modified time is the newest of its files, and
/// content is cached on disk when a cache directory is configured.
///
/// Clones share registries, memoized transformers and the version token.
#[derive(Clone)]
pub struct AssetService {
  config: Arc<AssetConfig>,
  known_assets: Arc<Vec<String>>,
  url_prefix: UrlPrefix,
  resolver: Arc<dyn ManifestResolver>,
  filters: Arc<FilterRegistry>,
  tags: Arc<TagRendererRegistry>,
  content_types: Arc<ContentTypeRegistry>,
  version: Arc<VersionResolver>,
  combiner: Arc<dyn Combine>,
}

impl fmt::Debug for AssetService {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AssetService")
      .field("debug", &self.config.debug)
      .field("url_prefix", &self.url_prefix)
      .field("known_assets", &self.known_assets)
      .field("filters", &self.filters)
      .finish_non_exhaustive()
  }
}

impl AssetService {
  /// Service using the directive resolver over the configured search paths.
  pub fn from_config(config: AssetConfig) -> Self {
    let resolver = DirectiveResolver::new(config.search_paths.clone());
    Self::new(config, Arc::new(resolver))
  }

  /// Service with registries built from `config` and the given resolver.
  pub fn new(config: AssetConfig, resolver: Arc<dyn ManifestResolver>) -> Self {
    let filters = FilterRegistry::from_config(&config);

    let mut tags = TagRendererRegistry::default();
    for (kind, template) in &config.tag_templates {
      tags.register(kind.clone(), TagTemplate::new(template.clone()));
    }

    let mut content_types = ContentTypeRegistry::default();
    for (extension, mime) in &config.content_types {
      content_types.register(extension.clone(), mime.clone());
    }

    let version = VersionResolver::new(config.version_hash.clone(), config.version_file.clone());

    Self {
      known_assets: Arc::new(config.known_asset_names()),
      url_prefix: UrlPrefix::Template(config.url_prefix.clone()),
      config: Arc::new(config),
      resolver,
      filters: Arc::new(filters),
      tags: Arc::new(tags),
      content_types: Arc::new(content_types),
      version: Arc::new(version),
      combiner: Arc::new(NewlineCombiner),
    }
  }

  /// Replace the filter registry.
  pub fn with_filters(mut self, filters: FilterRegistry) -> Self {
    self.filters = Arc::new(filters);
    self
  }

  /// Replace the tag renderer registry.
  pub fn with_tag_renderers(mut self, tags: TagRendererRegistry) -> Self {
    self.tags = Arc::new(tags);
    self
  }

  /// Replace the content type registry.
  pub fn with_content_types(mut self, content_types: ContentTypeRegistry) -> Self {
    self.content_types = Arc::new(content_types);
    self
  }

  /// Replace the combiner used for production bundles.
  pub fn with_combiner(mut self, combiner: impl Combine + 'static) -> Self {
    self.combiner = Arc::new(combiner);
    self
  }

  /// Replace the URL prefix.
  pub fn with_url_prefix(mut self, url_prefix: UrlPrefix) -> Self {
    self.url_prefix = url_prefix;
    self
  }

  /// Configuration the service was built from.
  pub fn config(&self) -> &AssetConfig {
    &self.config
  }

  /// Whether the service runs in debug mode.
  pub fn is_debug(&self) -> bool {
    self.config.debug
  }

  /// Filter registry in use.
  pub fn filters(&self) -> &FilterRegistry {
    &self.filters
  }

  /// Tag renderer registry in use.
  pub fn tag_renderers(&self) -> &TagRendererRegistry {
    &self.tags
  }

  /// Content type registry in use.
  pub fn content_types(&self) -> &ContentTypeRegistry {
    &self.content_types
  }

  /// Known assets in configuration order.
  pub fn known_assets(&self) -> &[String] {
    &self.known_assets
  }

  /// Sibling sharing everything but the URL prefix, which is empty.
  ///
  /// The sibling has no disk cache: cache paths do not depend on the prefix, so
  /// sharing one would hand back the prefixed bundle.
  pub fn unprefixed_variant(&self) -> Self {
    let config = AssetConfig {
      cache_dir: None,
      ..AssetConfig::clone(&self.config)
    };
    Self {
      config: Arc::new(config),
      url_prefix: UrlPrefix::Template(String::new()),
      ..self.clone()
    }
  }

  /// Sibling sharing everything but the mode, which is production.
  pub fn production_variant(&self) -> Self {
    if !self.config.debug {
      return self.clone();
    }
    let config = AssetConfig {
      debug: false,
      ..AssetConfig::clone(&self.config)
    };
    Self {
      config: Arc::new(config),
      ..self.clone()
    }
  }

  /// Markup including `name` with the renderer registered for `kind`.
  ///
  /// With the gated policy and a non-empty known asset list, only listed names
  /// are accepted and the tag is built from the name alone, without consulting
  /// the resolver. No file timestamp is known on that path, so a URL prefix
  /// that mentions `{{LAST_MODIFIED}}` fails with a template error; gated
  /// prefixes should rely on `{{VERSION_HASH}}`. Otherwise debug mode yields one
  /// tag per constituent file, joined by newlines, and production mode yields
  /// one tag.
  pub fn render_tag(&self, name: &str, kind: &str) -> Result<String> {
    let renderer = self.tags.get(kind)?;

    if self.config.effective_known_asset_policy() == KnownAssetPolicy::Gated
      && !self.known_assets.is_empty()
    {
      if !self.known_assets.iter().any(|known| known == name) {
        return Err(AssetError::UnknownAsset {
          name: name.to_string(),
        });
      }
      let url = self.public_url(name, None)?;
      return Ok(renderer.render(&url));
    }

    let descriptors = if self.config.debug {
      self.resolver.resolve_all(name)?
    } else {
      vec![self.resolver.resolve_one(name)?]
    };

    let mut tags = Vec::with_capacity(descriptors.len());
    for descriptor in &descriptors {
      let url = self.public_url(&descriptor.logical_path, Some(descriptor.last_modified))?;
      tags.push(renderer.render(&url));
    }
    Ok(tags.join("\n"))
  }

  /// Stylesheet tag(s) for `name`.
  pub fn style_tag(&self, name: &str) -> Result<String> {
    self.render_tag(name, STYLE)
  }

  /// Script tag(s) for `name`.
  pub fn script_tag(&self, name: &str) -> Result<String> {
    self.render_tag(name, SCRIPT)
  }

  /// MIME type for `name`.
  pub fn content_type(&self, name: &str) -> &str {
    self.content_types.lookup(name)
  }

  /// Last modified time of `name` in seconds since the Unix epoch.
  ///
  /// Production mode reports the newest file of the whole manifest, debug mode
  /// the file answering to `name`.
  pub fn last_modified(&self, name: &str) -> Result<u64> {
    if self.config.debug {
      Ok(self.resolver.resolve_one(name)?.last_modified)
    } else {
      Ok(newest(&self.resolver.resolve_all(name)?))
    }
  }

  /// Descriptor of the single file answering to `name`.
  pub fn asset_path_info(&self, name: &str) -> Result<AssetDescriptor> {
    self.resolver.resolve_one(name)
  }

  /// Deliverable bytes for `name`.
  ///
  /// Production mode bundles the whole manifest and, when a cache directory is
  /// configured, serves and stores the bundle through the disk cache. Debug mode
  /// transforms the single file answering to `name` and never touches the cache.
  pub fn content(&self, name: &str) -> Result<Vec<u8>> {
    if self.config.debug {
      let descriptor = self.resolver.resolve_one(name)?;
      return self.transform(vec![descriptor]);
    }

    let manifest = self.resolver.resolve_all(name)?;
    let Some(cache) = self.disk_cache(newest(&manifest))? else {
      return self.transform(manifest);
    };

    let key = name.trim().trim_start_matches('/');
    if let Some(bytes) = cache.fetch(key)? {
      return Ok(bytes);
    }

    let bytes = self.transform(manifest)?;
    cache.store(key, &bytes)?;
    Ok(bytes)
  }

  fn transform(&self, descriptors: Vec<AssetDescriptor>) -> Result<Vec<u8>> {
    let mut files = Vec::with_capacity(descriptors.len());

    for descriptor in descriptors {
      let chain = self
        .filters
        .file_chain(&descriptor.requested_name, self.config.debug)?;
      let target_url = self.public_url(&descriptor.logical_path, Some(descriptor.last_modified))?;
      let source =
        fs::read(&descriptor.absolute_path).map_err(|err| AssetError::io(&descriptor.absolute_path, err))?;

      debug!(
        file = %descriptor.logical_path,
        filters = chain.len(),
        "transforming asset file"
      );
      let context = TransformContext {
        source_path: &descriptor.absolute_path,
        target_url: &target_url,
      };
      let content = apply_chain(&chain, source, &context)?;

      files.push(TransformedFile {
        descriptor,
        target_url,
        content,
      });
    }

    Ok(self.combiner.combine(files))
  }

  fn disk_cache(&self, last_modified: u64) -> Result<Option<DiskCache>> {
    let Some(cache_dir) = &self.config.cache_dir else {
      return Ok(None);
    };
    let template = Template::parse(cache_dir)?;
    let root = template.render(&self.bindings(&template, Some(last_modified))?)?;
    Ok(Some(DiskCache::new(root)))
  }

  fn public_url(&self, logical_path: &str, last_modified: Option<u64>) -> Result<String> {
    let template = Template::parse(&self.url_prefix.current())?;
    let prefix = template.render(&self.bindings(&template, last_modified)?)?;
    Ok(join_url(&prefix, logical_path))
  }

  /// Values for the placeholders `template` mentions. The version token is only
  /// resolved when it is needed.
  fn bindings(&self, template: &Template, last_modified: Option<u64>) -> Result<Bindings> {
    let mut bindings = Bindings::new();
    if let Some(last_modified) = last_modified
      && template.uses(Placeholder::LastModified)
    {
      bindings.insert(Placeholder::LastModified, last_modified.to_string());
    }
    if template.uses(Placeholder::VersionHash) {
      bindings.insert(Placeholder::VersionHash, self.version.resolve()?);
    }
    if template.uses(Placeholder::NodeModules) {
      bindings.insert(
        Placeholder::NodeModules,
        self.config.filters.node_modules.path.clone(),
      );
    }
    Ok(bindings)
  }
}

fn newest(manifest: &[AssetDescriptor]) -> u64 {
  manifest
    .iter()
    .map(|descriptor| descriptor.last_modified)
    .max()
    .unwrap_or_default()
}
