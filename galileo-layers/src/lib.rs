//! Galileo layers resolves layer descriptors into layer configuration trees.
//!
//! A [`LayerDescriptor`] names a service (WMS, ArcGIS MapServer/FeatureServer or a GeoPackage file)
//! and the layers of the service to show. The [`LayerConfigResolver`] loads the service metadata,
//! validates the declared layers against it and produces a [`ConfigTree`]: groups and leaves with
//! their names, geometry kinds, styles, feature info schemas, scale limits and temporal
//! dimensions.
//!
//! # Quick start
//!
//! ```no_run
//! use galileo_layers::{LayerConfigResolver, LayerDescriptor, LayerEntryConfig, ResolverConfig, ServiceType};
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio_test::block_on(async {
//! let resolver = LayerConfigResolver::new(ResolverConfig::default().with_proxy("https://proxy.example.com/?"))?;
//! let descriptor = LayerDescriptor::new(
//!     "hydro",
//!     ServiceType::EsriDynamic,
//!     "https://example.com/arcgis/rest/services/Hydro/MapServer",
//! )
//! .with_entries(vec![LayerEntryConfig::group(
//!     "water",
//!     vec![LayerEntryConfig::leaf("1"), LayerEntryConfig::leaf("2")],
//! )]);
//!
//! let resolved = resolver.resolve(&descriptor, &CancellationToken::new()).await?;
//! for node in resolved.tree.iter() {
//!     println!("{} {:?}", node.layer_path(), node.status());
//! }
//! # Ok::<(), galileo_layers::LayerConfigError>(())
//! # });
//! ```
//!
//! # Partial failure
//!
//! Resolution fails as a whole only if the service metadata cannot be loaded. Any other problem
//! (a layer id missing from the service, a failed request for the metadata of a single layer,
//! a cancelled request) is recorded against the affected node: the node gets the
//! [`LayerStatus::Error`] status and a [`LoadError`] is added to
//! [`ResolvedLayerConfig::errors`]. A group whose children all failed is failed as well, with
//! [`LayerConfigError::EmptyGroup`].

#![warn(clippy::unwrap_used)]
#![warn(missing_docs)]

pub mod builder;
mod color;
mod config;
pub mod descriptor;
pub mod error;
pub mod fetch;
pub mod metadata;
pub mod node;
mod resolver;
pub mod status;
pub mod style;
mod xml;

pub use color::Color;
pub use config::ResolverConfig;
pub use descriptor::{LayerDescriptor, LayerEntryConfig, LocalizedString, ServiceType};
pub use error::{ErrorKind, LayerConfigError, LoadError};
pub use galileo_gpkg::FieldType;
pub use node::{ConfigNode, ConfigTree};
pub use resolver::{LayerConfigResolver, ResolvedLayerConfig};
pub use status::LayerStatus;
pub use style::{GeometryKind, StyleDefinition};
