//! Asset pipeline configuration.
//!
//! One typed structure covers every recognised option. Files may be JSON or YAML;
//! every field has a default so partial files are fine.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AssetError, Result};
use crate::filters::FilterStep;

const DEFAULT_CONFIG_FILES: &[&str] = &["assets.config.json", "assets.config.yaml", "assets.config.yml"];

/// How tag rendering treats the configured known assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KnownAssetPolicy {
  /// Tags are only rendered for whitelisted names, without consulting the manifest.
  Gated,
  /// The manifest is always consulted; the whitelist only drives precompilation.
  Bypass,
}

/// Directory searched by the manifest resolver.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SearchPath {
  /// Optional name; logical paths under this root are prefixed with it.
  #[serde(default)]
  pub name: String,
  /// Directory on disk.
  pub dir: PathBuf,
}

/// Location of node based filter binaries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeModulesConfig {
  /// Root substituted for `{{NODE_MODULES}}`.
  pub path: String,
  /// Filter name → binary path template, overriding the built-in defaults.
  pub binaries: BTreeMap<String, String>,
}

impl Default for NodeModulesConfig {
  fn default() -> Self {
    Self {
      path: "node_modules".into(),
      binaries: BTreeMap::new(),
    }
  }
}

/// Filter related options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FiltersConfig {
  /// Extension → ordered filter steps. Replaces the default binding per extension.
  pub by_extension: BTreeMap<String, Vec<FilterStep>>,
  /// Node binary configuration for external filters.
  pub node_modules: NodeModulesConfig,
}

/// Complete configuration of an [`crate::AssetService`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetConfig {
  /// Serve every constituent file individually, untransformed by optional filters and uncached.
  pub debug: bool,
  /// Template for the public URL prefix.
  pub url_prefix: String,
  /// Template for the disk cache directory. Disabled when absent.
  pub cache_dir: Option<String>,
  /// Explicit version token.
  pub version_hash: Option<String>,
  /// File whose first line holds the version token.
  pub version_file: Option<PathBuf>,
  /// Names allowed for tag rendering and precompiled by the precompile service.
  pub known_assets: Vec<String>,
  /// Whether tag rendering is gated by `known_assets`. Defaults to bypass in debug mode.
  pub known_asset_policy: Option<KnownAssetPolicy>,
  /// Filters removed from every chain.
  pub disabled_filters: Vec<String>,
  /// Filter bindings and binaries.
  pub filters: FiltersConfig,
  /// Extra or overriding content types keyed by extension.
  pub content_types: BTreeMap<String, String>,
  /// Extra or overriding tag templates keyed by kind, containing `{url}`.
  pub tag_templates: BTreeMap<String, String>,
  /// Directories searched by the default manifest resolver, in order.
  pub search_paths: Vec<SearchPath>,
}

impl Default for AssetConfig {
  fn default() -> Self {
    Self {
      debug: false,
      url_prefix: "/assets".into(),
      cache_dir: None,
      version_hash: None,
      version_file: None,
      known_assets: Vec::new(),
      known_asset_policy: None,
      disabled_filters: Vec::new(),
      filters: FiltersConfig::default(),
      content_types: BTreeMap::new(),
      tag_templates: BTreeMap::new(),
      search_paths: Vec::new(),
    }
  }
}

impl AssetConfig {
  /// Look for a configuration file in `dir`.
  ///
  /// Returns the defaults when no candidate file exists. A file that exists but
  /// fails to parse is an error rather than a silent fallback.
  pub fn discover(dir: &Path) -> Result<Self> {
    for file_name in DEFAULT_CONFIG_FILES {
      let candidate = dir.join(file_name);
      if candidate.is_file() {
        return Self::from_path(&candidate);
      }
    }
    Ok(Self::default())
  }

  /// Read configuration from a JSON or YAML file.
  ///
  /// Relative paths inside the file are resolved against the file's directory.
  pub fn from_path(path: &Path) -> Result<Self> {
    let content = fs::read_to_string(path).map_err(|err| AssetError::Config {
      path: path.to_path_buf(),
      message: err.to_string(),
    })?;

    let is_yaml = path
      .extension()
      .and_then(|ext| ext.to_str())
      .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    let config: Self = if is_yaml {
      serde_yaml::from_str(&content).map_err(|err| AssetError::Config {
        path: path.to_path_buf(),
        message: err.to_string(),
      })?
    } else {
      serde_json::from_str(&content).map_err(|err| AssetError::Config {
        path: path.to_path_buf(),
        message: err.to_string(),
      })?
    };

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(config.relative_to(base))
  }

  /// Resolve relative directories and files against `base`.
  pub fn relative_to(mut self, base: &Path) -> Self {
    for search_path in &mut self.search_paths {
      if search_path.dir.is_relative() {
        search_path.dir = base.join(&search_path.dir);
      }
    }
    if let Some(version_file) = &self.version_file
      && version_file.is_relative()
    {
      self.version_file = Some(base.join(version_file));
    }
    if let Some(cache_dir) = &self.cache_dir
      && Path::new(cache_dir).is_relative()
    {
      self.cache_dir = Some(base.join(cache_dir).to_string_lossy().into_owned());
    }
    self
  }

  /// Known asset policy after applying the debug-mode default.
  pub fn effective_known_asset_policy(&self) -> KnownAssetPolicy {
    self.known_asset_policy.unwrap_or(if self.debug {
      KnownAssetPolicy::Bypass
    } else {
      KnownAssetPolicy::Gated
    })
  }

  /// Known assets in configuration order with duplicates and blanks removed.
  pub fn known_asset_names(&self) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in &self.known_assets {
      let name = name.trim();
      if !name.is_empty() && !names.iter().any(|existing| existing == name) {
        names.push(name.to_string());
      }
    }
    names
  }
}
