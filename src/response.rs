//! Framework-neutral HTTP responses for asset delivery.
//!
//! Web frameworks convert [`AssetResponse`] into their own response type; the
//! conditional request handling and cache headers live here so every adapter
//! behaves the same way.

use chrono::{DateTime, Months, Utc};

use crate::error::Result;
use crate::service::AssetService;

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";
const PRODUCTION_MAX_AGE: &str = "public, max-age=31536000";

/// Conditional headers of an inbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionalRequest {
  /// Raw `If-Modified-Since` header value.
  pub if_modified_since: Option<String>,
}

impl ConditionalRequest {
  /// Request carrying an `If-Modified-Since` header.
  pub fn if_modified_since(value: impl Into<String>) -> Self {
    Self {
      if_modified_since: Some(value.into()),
    }
  }

  fn modified_since(&self) -> Option<DateTime<Utc>> {
    let value = self.if_modified_since.as_deref()?;
    DateTime::parse_from_rfc2822(value.trim())
      .ok()
      .map(|date| date.with_timezone(&Utc))
  }
}

/// Status, headers and body of an asset response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetResponse {
  /// HTTP status code.
  pub status: u16,
  /// Header names and values, in emission order.
  pub headers: Vec<(String, String)>,
  /// Response body; empty for `304 Not Modified`.
  pub body: Vec<u8>,
}

impl AssetResponse {
  /// Value of the first header named `name`, compared case-insensitively.
  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(key, _)| key.eq_ignore_ascii_case(name))
      .map(|(_, value)| value.as_str())
  }

  /// Whether the response is a `304 Not Modified`.
  pub fn is_not_modified(&self) -> bool {
    self.status == 304
  }
}

/// Produces HTTP responses for logical asset names.
pub trait ResponseAdapter {
  /// Respond to a request for `name`.
  fn respond(&self, name: &str, request: &ConditionalRequest) -> Result<AssetResponse>;
}

impl ResponseAdapter for AssetService {
  fn respond(&self, name: &str, request: &ConditionalRequest) -> Result<AssetResponse> {
    let last_modified = http_time(self.last_modified(name)?);

    let mut headers = vec![
      ("Content-Type".to_string(), self.content_type(name).to_string()),
      ("Last-Modified".to_string(), format_http_date(&last_modified)),
    ];
    if self.is_debug() {
      headers.push(("Cache-Control".to_string(), "public".to_string()));
    } else {
      let now = Utc::now();
      let expires = now.checked_add_months(Months::new(12)).unwrap_or(now);
      headers.push(("Cache-Control".to_string(), PRODUCTION_MAX_AGE.to_string()));
      headers.push(("Expires".to_string(), format_http_date(&expires)));
    }

    if request
      .modified_since()
      .is_some_and(|since| since >= last_modified)
    {
      return Ok(AssetResponse {
        status: 304,
        headers,
        body: Vec::new(),
      });
    }

    Ok(AssetResponse {
      status: 200,
      headers,
      body: self.content(name)?,
    })
  }
}

fn http_time(epoch_seconds: u64) -> DateTime<Utc> {
  i64::try_from(epoch_seconds)
    .ok()
    .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
    .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Format `date` as an IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn format_http_date(date: &DateTime<Utc>) -> String {
  date.format(HTTP_DATE_FORMAT).to_string()
}
