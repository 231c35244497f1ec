use std::collections::BTreeSet;

/// Generate candidate logical names for a `require` directive.
///
/// Directives may omit the extension (`require jquery`), point at a directory
/// with an index file, or carry stray leading/trailing slashes. The generator
/// expands the value into a deterministic, de-duplicated list that the resolver
/// tries in order. `inherited_extension` is the delivered extension of the file
/// holding the directive (`js` for `app.js.coffee`).
pub fn generate_asset_candidates(name: &str, inherited_extension: Option<&str>) -> Vec<String> {
  let mut builder = CandidateBuilder::new(name, inherited_extension);
  if builder.trimmed.is_none() {
    return Vec::new();
  }

  builder.add_trimmed_candidate();
  builder.add_extension_candidate();
  builder.add_index_candidate();

  builder.finish()
}

struct CandidateBuilder<'a> {
  trimmed: Option<&'a str>,
  extension: Option<&'a str>,
  seen: BTreeSet<String>,
  result: Vec<String>,
}

impl<'a> CandidateBuilder<'a> {
  fn new(name: &'a str, inherited_extension: Option<&'a str>) -> Self {
    let trimmed_value = name.trim().trim_matches('/');
    let trimmed = if trimmed_value.is_empty() {
      None
    } else {
      Some(trimmed_value)
    };

    let extension = inherited_extension
      .map(|ext| ext.trim_start_matches('.'))
      .filter(|ext| !ext.is_empty());

    Self {
      trimmed,
      extension,
      seen: BTreeSet::new(),
      result: Vec::new(),
    }
  }

  fn has_extension(&self) -> bool {
    self
      .trimmed
      .and_then(|path| path.rsplit('/').next())
      .is_some_and(|base| base.contains('.'))
  }

  fn add_trimmed_candidate(&mut self) {
    if let Some(path) = self.trimmed {
      self.push(path.to_string());
    }
  }

  fn add_extension_candidate(&mut self) {
    if self.has_extension() {
      return;
    }
    if let (Some(path), Some(ext)) = (self.trimmed, self.extension) {
      self.push(format!("{path}.{ext}"));
    }
  }

  fn add_index_candidate(&mut self) {
    if self.has_extension() {
      return;
    }
    if let (Some(path), Some(ext)) = (self.trimmed, self.extension) {
      self.push(format!("{path}/index.{ext}"));
    }
  }

  fn finish(self) -> Vec<String> {
    self.result
  }

  fn push(&mut self, candidate: String) {
    if self.seen.insert(candidate.clone()) {
      self.result.push(candidate);
    }
  }
}
