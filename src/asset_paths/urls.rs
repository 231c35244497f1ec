/// Join a URL prefix and a logical path with exactly one `/` between them.
///
/// The generated URL always uses forward slashes so that paths discovered on
/// Windows produce the same URLs as everywhere else. An empty prefix yields a
/// root-relative URL.
pub fn join_url(prefix: &str, logical_path: &str) -> String {
  let path = logical_path.replace('\\', "/");
  format!(
    "{}/{}",
    prefix.trim_end_matches('/'),
    path.trim_start_matches('/')
  )
}

/// Directory part of a URL, without a trailing slash.
pub fn url_directory(url: &str) -> &str {
  match url.rfind('/') {
    Some(index) => &url[..index],
    None => "",
  }
}

/// Resolve `reference` against `base_dir`, collapsing `.` and `..` segments.
///
/// Query strings and fragments on the reference are carried over untouched.
/// Segments that would climb above the root of `base_dir`'s path are dropped.
pub fn resolve_relative_url(base_dir: &str, reference: &str) -> String {
  let split_at = reference.find(['?', '#']).unwrap_or(reference.len());
  let (path, suffix) = reference.split_at(split_at);

  let (origin, base_path) = split_origin(base_dir);
  let mut segments: Vec<&str> = base_path.split('/').filter(|s| !s.is_empty()).collect();

  for segment in path.split('/') {
    match segment {
      "" | "." => {}
      ".." => {
        segments.pop();
      }
      other => segments.push(other),
    }
  }

  format!("{origin}/{}{suffix}", segments.join("/"))
}

/// Split `https://host/path` into (`https://host`, `/path`); plain paths have no origin.
fn split_origin(url: &str) -> (&str, &str) {
  let Some(scheme_end) = url.find("://") else {
    return ("", url);
  };
  let after_scheme = scheme_end + 3;
  match url[after_scheme..].find('/') {
    Some(index) => url.split_at(after_scheme + index),
    None => (url, ""),
  }
}
