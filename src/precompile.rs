//! Static output tree generation for deployment.
//!
//! Every known asset is rendered twice: once with the configured URL prefix and
//! once through the unprefixed sibling service. Embedded references that differ
//! between the two renders were rewritten against the prefix, so they point at
//! files that must ship next to the asset. Those files are copied into the output
//! tree once per run, followed by the asset's own prefixed content.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use same_file::is_same_file;
use tracing::{info, warn};

use crate::asset_paths::extract_references;
use crate::error::{AssetError, Result};
use crate::models::PrecompileReport;
use crate::service::AssetService;

/// Writes known assets and the sub-resources they reference into a directory.
#[derive(Debug, Clone)]
pub struct PrecompileService {
  service: AssetService,
  unprefixed: AssetService,
}

impl PrecompileService {
  /// Precompile with the production variant of `service` and its unprefixed
  /// sibling. A debug service still yields bundled output.
  pub fn new(service: AssetService) -> Self {
    let service = service.production_variant();
    let unprefixed = service.unprefixed_variant();
    Self {
      service,
      unprefixed,
    }
  }

  /// Precompile every known asset into `output_dir`.
  ///
  /// The first failure aborts the run and is reported against the asset being
  /// processed.
  pub fn run(&self, output_dir: &Path) -> Result<PrecompileReport> {
    let mut copied = BTreeSet::new();
    let mut report = PrecompileReport::default();

    for name in self.service.known_assets() {
      self
        .precompile_asset(name, output_dir, &mut copied, &mut report)
        .map_err(|source| AssetError::Precompile {
          asset: name.clone(),
          source: Box::new(source),
        })?;
    }

    info!(
      assets = report.assets.len(),
      dependencies = report.dependencies.len(),
      output = %output_dir.display(),
      "precompiled assets"
    );
    Ok(report)
  }

  fn precompile_asset(
    &self,
    name: &str,
    output_dir: &Path,
    copied: &mut BTreeSet<String>,
    report: &mut PrecompileReport,
  ) -> Result<()> {
    let content = self.service.content(name)?;
    let unprefixed_content = self.unprefixed.content(name)?;

    let references = extract_references(&String::from_utf8_lossy(&content));
    let unprefixed_references = extract_references(&String::from_utf8_lossy(&unprefixed_content));
    if references.len() != unprefixed_references.len() {
      warn!(
        asset = name,
        prefixed = references.len(),
        unprefixed = unprefixed_references.len(),
        "reference counts differ between renders; comparing the common prefix only"
      );
    }

    for (reference, unprefixed) in references.iter().zip(&unprefixed_references) {
      if reference == unprefixed {
        continue;
      }

      let logical = strip_query(unprefixed.trim_start_matches('/'));
      let dependency = self.service.asset_path_info(logical)?;
      if !copied.insert(dependency.logical_path.clone()) {
        continue;
      }

      let destination = output_path(output_dir, &dependency.logical_path);
      install_file(&dependency.absolute_path, &destination)?;
      info!(asset = name, dependency = %dependency.logical_path, "copied referenced file");
      report.dependencies.push(dependency.logical_path);
    }

    let asset = self.unprefixed.asset_path_info(name)?;
    let destination = output_path(output_dir, &asset.logical_path);
    write_file(&destination, &content)?;
    info!(asset = %asset.logical_path, bytes = content.len(), "wrote precompiled asset");
    report.assets.push(asset.logical_path);

    Ok(())
  }
}

fn strip_query(reference: &str) -> &str {
  reference
    .split(['?', '#'])
    .next()
    .unwrap_or(reference)
}

fn output_path(output_dir: &Path, logical_path: &str) -> PathBuf {
  logical_path
    .split('/')
    .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
    .fold(output_dir.to_path_buf(), |path, segment| path.join(segment))
}

fn create_parent(destination: &Path) -> Result<()> {
  if let Some(parent) = destination.parent() {
    fs::create_dir_all(parent).map_err(|err| AssetError::io(parent, err))?;
  }
  Ok(())
}

fn write_file(destination: &Path, content: &[u8]) -> Result<()> {
  create_parent(destination)?;
  fs::write(destination, content).map_err(|err| AssetError::io(destination, err))
}

/// Copy `source` to `destination` unless both already name the same file.
fn install_file(source: &Path, destination: &Path) -> Result<()> {
  create_parent(destination)?;
  if destination.exists()
    && is_same_file(source, destination).map_err(|err| AssetError::io(destination, err))?
  {
    return Ok(());
  }

  fs::copy(source, destination)
    .map(|_| ())
    .map_err(|err| AssetError::io(source, err))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{AssetConfig, NodeModulesConfig, SearchPath};
  use crate::filters::{
    BuiltinFilter, FilterFactory, FilterRegistry, FilterStep, TransformContext, Transformer,
  };
  use std::sync::Arc;
  use tempfile::tempdir;

  fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
  }

  /// Appends a reference that only exists when a URL prefix is in effect.
  struct PrefixOnlyReference;

  impl Transformer for PrefixOnlyReference {
    fn apply(&self, source: &[u8], context: &TransformContext<'_>) -> Result<Vec<u8>> {
      let mut content = source.to_vec();
      if context.target_url.starts_with("/assets/") {
        content.extend_from_slice(b" .extra{background:url(/assets/v1/images/extra.png)}");
      }
      Ok(content)
    }
  }

  fn config(source_dir: &Path, known_assets: &[&str]) -> AssetConfig {
    AssetConfig {
      url_prefix: "/assets/{{VERSION_HASH}}".into(),
      version_hash: Some("v1".into()),
      known_assets: known_assets.iter().map(|name| name.to_string()).collect(),
      search_paths: vec![SearchPath {
        name: String::new(),
        dir: source_dir.to_path_buf(),
      }],
      ..AssetConfig::default()
    }
  }

  fn css_filters(steps: &[&str]) -> FilterRegistry {
    let mut filters = FilterRegistry::empty(NodeModulesConfig::default());
    filters.register_factory("css_urls", FilterFactory::Builtin(BuiltinFilter::CssUrls));
    filters.register_factory(
      "prefix_only",
      FilterFactory::custom(|_| Ok(Arc::new(PrefixOnlyReference) as Arc<dyn Transformer>)),
    );
    filters.bind_extension(
      "css",
      steps.iter().map(|step| FilterStep::required(*step)).collect(),
    );
    filters
  }

  fn service(source_dir: &Path, known_assets: &[&str], rewrite_urls: bool) -> AssetService {
    let steps: &[&str] = if rewrite_urls { &["css_urls"] } else { &[] };
    AssetService::from_config(config(source_dir, known_assets)).with_filters(css_filters(steps))
  }

  #[test]
  fn copies_shared_dependencies_once() {
    let source = tempdir().unwrap();
    let output = tempdir().unwrap();
    write(source.path(), "css/a.css", "body{background:url(../images/logo.png)}");
    write(
      source.path(),
      "css/b.css",
      ".x{background:url('../images/logo.png?v=2')} .y{background:url(/fonts/abs.woff)}",
    );
    write(source.path(), "images/logo.png", "PNG");

    let precompile = PrecompileService::new(service(source.path(), &["css/a.css", "css/b.css"], true));
    let report = precompile.run(output.path()).unwrap();

    assert_eq!(report.assets, vec!["css/a.css", "css/b.css"]);
    assert_eq!(report.dependencies, vec!["images/logo.png"]);
    assert_eq!(
      fs::read_to_string(output.path().join("css/a.css")).unwrap(),
      "body{background:url(/assets/v1/images/logo.png)}"
    );
    assert_eq!(
      fs::read_to_string(output.path().join("images/logo.png")).unwrap(),
      "PNG"
    );
    assert!(!output.path().join("fonts").exists());
  }

  #[test]
  fn identical_references_are_not_copied() {
    let source = tempdir().unwrap();
    let output = tempdir().unwrap();
    write(source.path(), "site.css", "body{background:url(images/logo.png)}");
    write(source.path(), "images/logo.png", "PNG");

    let precompile = PrecompileService::new(service(source.path(), &["site.css"], false));
    let report = precompile.run(output.path()).unwrap();

    assert!(report.dependencies.is_empty());
    assert!(!output.path().join("images").exists());
    assert_eq!(
      fs::read_to_string(output.path().join("site.css")).unwrap(),
      "body{background:url(images/logo.png)}"
    );
  }

  #[test]
  fn missing_dependency_aborts_the_run() {
    let source = tempdir().unwrap();
    let output = tempdir().unwrap();
    write(source.path(), "css/a.css", "a{background:url(../images/missing.png)}");

    let precompile = PrecompileService::new(service(source.path(), &["css/a.css"], true));
    let err = precompile.run(output.path()).unwrap_err();

    assert!(matches!(
      &err,
      AssetError::Precompile { asset, source }
        if asset == "css/a.css" && matches!(**source, AssetError::AssetNotFound { .. })
    ));
    assert!(!output.path().join("css/a.css").exists());
  }

  #[test]
  fn scripts_are_written_under_their_logical_path() {
    let source = tempdir().unwrap();
    let output = tempdir().unwrap();
    write(source.path(), "js/app.js", "//= require ./lib\nvar app;\n");
    write(source.path(), "js/lib.js", "var lib;\n");

    let precompile = PrecompileService::new(service(source.path(), &["js/app.js"], false));
    let report = precompile.run(output.path()).unwrap();

    assert_eq!(report.assets, vec!["js/app.js"]);
    assert_eq!(
      fs::read_to_string(output.path().join("js/app.js")).unwrap(),
      "var lib;\n\n//= require ./lib\nvar app;\n"
    );
  }

  #[test]
  fn debug_services_still_write_bundles() {
    let source = tempdir().unwrap();
    let output = tempdir().unwrap();
    write(source.path(), "app.js", "//= require ./lib\nvar app;\n");
    write(source.path(), "lib.js", "var lib;\n");

    let config = AssetConfig {
      debug: true,
      ..config(source.path(), &["app.js"])
    };
    let debug_service = AssetService::from_config(config).with_filters(css_filters(&[]));
    let precompile = PrecompileService::new(debug_service.clone());
    precompile.run(output.path()).unwrap();

    let written = fs::read_to_string(output.path().join("app.js")).unwrap();
    assert_eq!(written, "var lib;\n\n//= require ./lib\nvar app;\n");
    assert!(debug_service.is_debug());
  }

  #[test]
  fn reference_count_mismatch_compares_the_common_prefix() {
    let source = tempdir().unwrap();
    let output = tempdir().unwrap();
    write(source.path(), "css/a.css", "a{background:url(../images/a.png)}");
    write(source.path(), "images/a.png", "A");
    write(source.path(), "images/extra.png", "EXTRA");

    let service = AssetService::from_config(config(source.path(), &["css/a.css"]))
      .with_filters(css_filters(&["css_urls", "prefix_only"]));
    let report = PrecompileService::new(service).run(output.path()).unwrap();

    assert_eq!(report.dependencies, vec!["images/a.png"]);
    assert!(output.path().join("images/a.png").exists());
    assert!(!output.path().join("images/extra.png").exists());
    assert!(
      fs::read_to_string(output.path().join("css/a.css"))
        .unwrap()
        .contains("url(/assets/v1/images/extra.png)")
    );
  }

  #[test]
  fn alpha_image_loader_sources_are_copied_once() {
    let source = tempdir().unwrap();
    let output = tempdir().unwrap();
    write(
      source.path(),
      "css/ie.css",
      ".logo{filter:progid:DXImageTransform.Microsoft.AlphaImageLoader(src='../images/ie.png', sizingMethod='scale')}",
    );
    write(source.path(), "css/b.css", ".b{background:url(../images/ie.png)}");
    write(source.path(), "images/ie.png", "IE");

    let precompile = PrecompileService::new(service(source.path(), &["css/ie.css", "css/b.css"], true));
    let report = precompile.run(output.path()).unwrap();

    assert_eq!(report.dependencies, vec!["images/ie.png"]);
    assert_eq!(
      fs::read_to_string(output.path().join("images/ie.png")).unwrap(),
      "IE"
    );
    assert!(
      fs::read_to_string(output.path().join("css/ie.css"))
        .unwrap()
        .contains("src='/assets/v1/images/ie.png'")
    );
  }

  #[test]
  fn install_file_skips_identical_destinations() {
    let temp = tempdir().unwrap();
    let file = temp.path().join("file.txt");
    fs::write(&file, b"content").unwrap();

    install_file(&file, &file).unwrap();
    assert_eq!(fs::read(&file).unwrap(), b"content");

    let copy = temp.path().join("mirror/file.txt");
    install_file(&file, &copy).unwrap();
    assert!(!is_same_file(&file, &copy).unwrap());
    assert_eq!(fs::read(&copy).unwrap(), b"content");
  }
}
