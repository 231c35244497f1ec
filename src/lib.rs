#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![allow(clippy::module_inception)]

pub mod asset_paths;
pub mod cache;
pub mod combine;
pub mod config;
pub mod error;
pub mod filters;
pub mod manifest;
pub mod models;
pub mod precompile;
pub mod registry;
pub mod response;
pub mod service;
pub mod template;
pub mod version;

pub use cache::DiskCache;
pub use combine::{Combine, NewlineCombiner};
pub use config::{AssetConfig, KnownAssetPolicy, SearchPath};
pub use error::{AssetError, Result};
pub use filters::{FilterRegistry, FilterStep, Transformer};
pub use manifest::{DirectiveResolver, ManifestResolver};
pub use models::{AssetDescriptor, PrecompileReport, TransformedFile};
pub use precompile::PrecompileService;
pub use registry::{ContentTypeRegistry, SCRIPT, STYLE, TagRendererRegistry};
pub use response::{AssetResponse, ConditionalRequest, ResponseAdapter};
pub use service::{AssetService, UrlPrefix};
