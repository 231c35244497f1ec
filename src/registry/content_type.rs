use std::collections::BTreeMap;

const DEFAULT_CONTENT_TYPES: &[(&str, &str)] = &[
  ("", "text/plain"),
  ("css", "text/css"),
  ("gif", "image/gif"),
  ("ico", "image/vnd.microsoft.icon"),
  ("jpeg", "image/jpeg"),
  ("jpg", "image/jpeg"),
  ("js", "text/javascript"),
  ("png", "image/png"),
  ("svg", "image/svg+xml"),
  ("woff", "font/woff"),
  ("woff2", "font/woff2"),
];

/// Maps filename segments to MIME types.
#[derive(Debug, Clone)]
pub struct ContentTypeRegistry {
  content_types: BTreeMap<String, String>,
}

impl Default for ContentTypeRegistry {
  fn default() -> Self {
    Self {
      content_types: DEFAULT_CONTENT_TYPES
        .iter()
        .map(|(ext, mime)| (ext.to_string(), mime.to_string()))
        .collect(),
    }
  }
}

impl ContentTypeRegistry {
  /// Bind `extension` to `content_type`. The empty extension is the fallback.
  pub fn register(&mut self, extension: impl Into<String>, content_type: impl Into<String>) {
    self
      .content_types
      .insert(extension.into(), content_type.into());
  }

  /// MIME type for `file_name`.
  ///
  /// The basename is split on `.` and the segments are checked left to right; the
  /// first segment with a binding wins. `app.min.js` therefore checks `app`, then
  /// `min`, then `js`. Without any match the fallback binding is returned.
  pub fn lookup(&self, file_name: &str) -> &str {
    let base_name = file_name.rsplit('/').next().unwrap_or(file_name);
    base_name
      .split('.')
      .find_map(|segment| self.content_types.get(segment))
      .or_else(|| self.content_types.get(""))
      .map(String::as_str)
      .unwrap_or("application/octet-stream")
  }
}
