//! Small lookup tables consulted by the asset service.
//!
//! Content types are keyed by filename segment and tag renderers by asset kind.
//! Both ship with sensible defaults and accept overrides from configuration.

mod content_type;
mod tags;

pub use content_type::ContentTypeRegistry;
pub use tags::{SCRIPT, STYLE, TagRenderer, TagRendererRegistry, TagTemplate};
