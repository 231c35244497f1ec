use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::asset_paths::{generate_asset_candidates, resolve_relative_url, url_directory};
use crate::config::SearchPath;
use crate::error::{AssetError, Result};
use crate::models::AssetDescriptor;

use super::ManifestResolver;
use super::directives::{Directive, parse_directives};
use super::scanning::{FoundFile, collect_tree, find_in_root};

/// Resolves logical names against ordered search roots and expands `require`
/// directives found in file headers.
///
/// A logical name whose first segment equals the name of a search root is looked
/// up inside that root only, and the results keep the root name as their
/// logical prefix. Any other name is looked up in the unnamed roots, in order.
#[derive(Debug, Clone, Default)]
pub struct DirectiveResolver {
  roots: Vec<SearchPath>,
}

impl DirectiveResolver {
  /// Resolver over `roots`, searched in order.
  pub fn new(roots: Vec<SearchPath>) -> Self {
    Self { roots }
  }

  /// Search roots applicable to `logical`, each with the remainder to look up
  /// inside it and the logical prefix results should carry.
  fn scopes<'a>(&'a self, logical: &'a str) -> Vec<(&'a SearchPath, &'a str, &'a str)> {
    if let Some((head, rest)) = logical.split_once('/')
      && let Some(root) = self.roots.iter().find(|root| !root.name.is_empty() && root.name == head)
    {
      return vec![(root, rest, head)];
    }

    self
      .roots
      .iter()
      .filter(|root| root.name.is_empty())
      .map(|root| (root, logical, ""))
      .collect()
  }

  fn locate(&self, logical: &str) -> Option<(FoundFile, String)> {
    self.scopes(logical).into_iter().find_map(|(root, relative, prefix)| {
      find_in_root(&root.dir, relative).map(|file| {
        let logical_path = prefixed(prefix, &delivered_path(relative, &file.relative_path));
        (file, logical_path)
      })
    })
  }

  fn describe(&self, file: &FoundFile, logical_path: String) -> Result<AssetDescriptor> {
    AssetDescriptor::from_file(&file.path, logical_path).map_err(|err| AssetError::io(&file.path, err))
  }

  fn lookup(&self, name: &str) -> Result<AssetDescriptor> {
    let logical = name.trim().trim_matches('/');
    let (file, logical_path) = self.locate(logical).ok_or_else(|| AssetError::AssetNotFound {
      name: name.to_string(),
    })?;
    self.describe(&file, logical_path)
  }

  fn require(&self, name: &str, including: &AssetDescriptor) -> Result<AssetDescriptor> {
    let logical = anchor(name, &including.logical_path);
    let extension = delivered_extension(&including.requested_name);

    for candidate in generate_asset_candidates(&logical, extension) {
      if let Some((file, logical_path)) = self.locate(&candidate) {
        return self.describe(&file, logical_path);
      }
    }

    Err(AssetError::AssetNotFound {
      name: name.to_string(),
    })
  }

  fn require_tree(&self, dir: &str, including: &AssetDescriptor) -> Result<Vec<AssetDescriptor>> {
    let logical_dir = anchor(dir, &including.logical_path);
    let extension = delivered_extension(&including.requested_name);
    let mut found = Vec::new();

    for (root, relative, prefix) in self.scopes(&logical_dir) {
      for file in collect_tree(&root.dir, relative) {
        let file_name = file.relative_path.rsplit('/').next().unwrap_or_default();
        if extension.is_some() && delivered_extension(file_name) != extension {
          continue;
        }
        let logical_path = prefixed(prefix, &file.relative_path);
        found.push(self.describe(&file, logical_path)?);
      }
    }

    Ok(found)
  }

  fn expand(
    &self,
    descriptor: AssetDescriptor,
    visited: &mut BTreeSet<PathBuf>,
    manifest: &mut Vec<AssetDescriptor>,
  ) -> Result<()> {
    if !visited.insert(descriptor.absolute_path.clone()) {
      return Ok(());
    }

    // Binary files carry no directives.
    let directives = fs::read_to_string(&descriptor.absolute_path)
      .map(|source| parse_directives(&source))
      .unwrap_or_default();

    for directive in directives {
      match directive {
        Directive::Require(name) => {
          let required = self.require(&name, &descriptor)?;
          self.expand(required, visited, manifest)?;
        }
        Directive::RequireTree(dir) => {
          for required in self.require_tree(&dir, &descriptor)? {
            self.expand(required, visited, manifest)?;
          }
        }
      }
    }

    manifest.push(descriptor);
    Ok(())
  }
}

impl ManifestResolver for DirectiveResolver {
  fn resolve_all(&self, name: &str) -> Result<Vec<AssetDescriptor>> {
    let root = self.lookup(name)?;
    let mut visited = BTreeSet::new();
    let mut manifest = Vec::new();
    self.expand(root, &mut visited, &mut manifest)?;
    debug!(asset = name, files = manifest.len(), "expanded asset manifest");
    Ok(manifest)
  }

  fn resolve_one(&self, name: &str) -> Result<AssetDescriptor> {
    self.lookup(name)
  }
}

/// Logical path of a found file.
///
/// When the request named an extension the request itself is the delivered path
/// (`app.css` for `app.css.scss`); otherwise the file's own path is used.
fn delivered_path(requested: &str, found: &str) -> String {
  let requested_base = requested.rsplit('/').next().unwrap_or(requested);
  if requested_base.contains('.') {
    requested.to_string()
  } else {
    found.to_string()
  }
}

/// First extension of a file name: `js` for `app.js.coffee`, `coffee` for `app.coffee`.
fn delivered_extension(file_name: &str) -> Option<&str> {
  file_name.split('.').nth(1).filter(|ext| !ext.is_empty())
}

/// `./` and `../` requires are relative to the including file.
fn anchor(name: &str, including_logical: &str) -> String {
  let name = name.trim();
  if name.starts_with("./") || name.starts_with("../") {
    resolve_relative_url(url_directory(including_logical), name)
      .trim_start_matches('/')
      .to_string()
  } else {
    name.to_string()
  }
}

fn prefixed(prefix: &str, path: &str) -> String {
  if prefix.is_empty() {
    path.to_string()
  } else {
    format!("{prefix}/{path}")
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::path::Path;
  use tempfile::tempdir;

  fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
  }

  fn logical(manifest: &[AssetDescriptor]) -> Vec<&str> {
    manifest.iter().map(|asset| asset.logical_path.as_str()).collect()
  }

  fn unnamed(dir: &Path) -> SearchPath {
    SearchPath {
      name: String::new(),
      dir: dir.to_path_buf(),
    }
  }

  #[test]
  fn expands_requires_dependencies_first() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "js/app.js", "//= require lib/util\n//= require ./widget\nvar app;\n");
    write(root, "js/widget.js.coffee", "#= require lib/util\nclass Widget\n");
    write(root, "lib/util.js", "var util;\n");

    let resolver = DirectiveResolver::new(vec![unnamed(root)]);
    let manifest = resolver.resolve_all("js/app.js").unwrap();

    assert_eq!(logical(&manifest), vec![
      "lib/util.js",
      "js/widget.js.coffee",
      "js/app.js"
    ]);
    assert_eq!(manifest[1].requested_name, "widget.js.coffee");
  }

  #[test]
  fn resolve_one_ignores_directives() {
    let dir = tempdir().unwrap();
    write(dir.path(), "app.css.scss", "/*\n *= require reset\n */\n");
    write(dir.path(), "reset.css", "");

    let resolver = DirectiveResolver::new(vec![unnamed(dir.path())]);
    let asset = resolver.resolve_one("/app.css").unwrap();

    assert_eq!(asset.logical_path, "app.css");
    assert_eq!(asset.requested_name, "app.css.scss");
    assert_eq!(logical(&resolver.resolve_all("app.css").unwrap()), vec![
      "reset.css",
      "app.css"
    ]);
  }

  #[test]
  fn require_tree_filters_by_delivered_extension() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "app.js", "//= require_tree ./widgets\n");
    write(root, "widgets/b.js", "");
    write(root, "widgets/a.js.coffee", "");
    write(root, "widgets/skin.css", "");

    let resolver = DirectiveResolver::new(vec![unnamed(root)]);
    let manifest = resolver.resolve_all("app.js").unwrap();

    assert_eq!(logical(&manifest), vec![
      "widgets/a.js.coffee",
      "widgets/b.js",
      "app.js"
    ]);
  }

  #[test]
  fn cycles_are_visited_once() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.js", "//= require b\n");
    write(dir.path(), "b.js", "//= require a\n");

    let resolver = DirectiveResolver::new(vec![unnamed(dir.path())]);
    assert_eq!(logical(&resolver.resolve_all("a.js").unwrap()), vec![
      "b.js", "a.js"
    ]);
  }

  #[test]
  fn named_roots_prefix_logical_paths() {
    let app = tempdir().unwrap();
    let vendor = tempdir().unwrap();
    write(app.path(), "app.js", "//= require vendor/jquery\n");
    write(vendor.path(), "jquery.js", "");

    let resolver = DirectiveResolver::new(vec![unnamed(app.path()), SearchPath {
      name: "vendor".into(),
      dir: vendor.path().to_path_buf(),
    }]);

    assert_eq!(logical(&resolver.resolve_all("app.js").unwrap()), vec![
      "vendor/jquery.js",
      "app.js"
    ]);
    assert!(resolver.resolve_one("jquery.js").is_err());
  }

  #[test]
  fn earlier_roots_shadow_later_ones() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    write(first.path(), "app.js", "first");
    write(second.path(), "app.js", "second");
    write(second.path(), "only.js", "second");

    let resolver = DirectiveResolver::new(vec![unnamed(first.path()), unnamed(second.path())]);
    assert_eq!(
      resolver.resolve_one("app.js").unwrap().absolute_path,
      first.path().join("app.js")
    );
    assert_eq!(
      resolver.resolve_one("only.js").unwrap().absolute_path,
      second.path().join("only.js")
    );
  }

  #[test]
  fn missing_files_are_reported() {
    let dir = tempdir().unwrap();
    write(dir.path(), "app.js", "//= require ghost\n");

    let resolver = DirectiveResolver::new(vec![unnamed(dir.path())]);
    assert!(matches!(
      resolver.resolve_one("nope.js"),
      Err(AssetError::AssetNotFound { name }) if name == "nope.js"
    ));
    assert!(matches!(
      resolver.resolve_all("app.js"),
      Err(AssetError::AssetNotFound { name }) if name == "ghost"
    ));
  }
}
