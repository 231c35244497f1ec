//! Directory scanning used by the manifest resolver to find source files.

use std::fs;
use std::path::{Path, PathBuf};

/// A source file located below a search root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundFile {
  /// Absolute location on disk.
  pub path: PathBuf,
  /// Slash separated path relative to the search root.
  pub relative_path: String,
}

/// Find the file answering to `relative` inside `root`.
///
/// A file matches when its name equals the requested base name, or starts with
/// it followed by a `.` (so `app.css` finds `app.css.scss`). An exact match wins;
/// otherwise the lexicographically first prefix match is used. Hidden files are
/// never considered.
pub fn find_in_root(root: &Path, relative: &str) -> Option<FoundFile> {
  let (directory, base_name) = match relative.rsplit_once('/') {
    Some((directory, base_name)) => (directory, base_name),
    None => ("", relative),
  };
  if base_name.is_empty() {
    return None;
  }

  let dir_path = join_relative(root, directory);
  let prefix = format!("{base_name}.");
  let mut prefixed: Vec<String> = Vec::new();

  for entry in fs::read_dir(&dir_path).ok()?.flatten() {
    let file_name = entry.file_name();
    let name = file_name.to_string_lossy();
    if name.starts_with('.') || !entry.file_type().is_ok_and(|kind| kind.is_file()) {
      continue;
    }
    if name == base_name {
      return Some(found(&dir_path, directory, &name));
    }
    if name.starts_with(&prefix) {
      prefixed.push(name.into_owned());
    }
  }

  prefixed.sort();
  prefixed
    .first()
    .map(|name| found(&dir_path, directory, name))
}

/// Every non-hidden file below `root/relative_dir`, sorted by relative path.
pub fn collect_tree(root: &Path, relative_dir: &str) -> Vec<FoundFile> {
  let mut files = Vec::new();
  let start = join_relative(root, relative_dir);
  collect_recursively(&start, relative_dir.trim_matches('/'), &mut files);
  files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
  files
}

fn collect_recursively(dir: &Path, relative_root: &str, files: &mut Vec<FoundFile>) {
  let Ok(entries) = fs::read_dir(dir) else {
    return;
  };

  for entry in entries.flatten() {
    let file_name = entry.file_name();
    let name = file_name.to_string_lossy();
    if name.starts_with('.') {
      continue;
    }

    let Ok(file_type) = entry.file_type() else {
      continue;
    };
    let next_relative = if relative_root.is_empty() {
      name.to_string()
    } else {
      format!("{relative_root}/{name}")
    };

    if file_type.is_dir() {
      collect_recursively(&entry.path(), &next_relative, files);
    } else if file_type.is_file() {
      files.push(FoundFile {
        path: entry.path(),
        relative_path: next_relative,
      });
    }
  }
}

fn join_relative(root: &Path, relative: &str) -> PathBuf {
  relative
    .split('/')
    .filter(|segment| !segment.is_empty())
    .fold(root.to_path_buf(), |path, segment| path.join(segment))
}

fn found(dir_path: &Path, directory: &str, name: &str) -> FoundFile {
  let relative_path = if directory.is_empty() {
    name.to_string()
  } else {
    format!("{directory}/{name}")
  };
  FoundFile {
    path: dir_path.join(name),
    relative_path,
  }
}
