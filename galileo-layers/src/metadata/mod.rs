//! Service metadata normalized from the service-native formats.

pub mod capabilities;
pub mod index;
pub mod packaged;

pub use capabilities::{CapabilitiesDocument, CapabilityLayer, PathStep};
pub use index::{IndexEntry, IndexNode, LayerMetadata, ServiceIndex};
pub use packaged::{PackagedMetadata, PackagedTable};

/// Metadata of a service.
#[derive(Debug, Clone)]
pub enum ServiceMetadata {
    /// WMS capabilities document.
    Capabilities(CapabilitiesDocument),
    /// ArcGIS service index.
    Index(ServiceIndex),
    /// GeoPackage content.
    Packaged(PackagedMetadata),
}

impl ServiceMetadata {
    /// Capabilities document, if this is WMS metadata.
    pub fn as_capabilities(&self) -> Option<&CapabilitiesDocument> {
        match self {
            Self::Capabilities(document) => Some(document),
            _ => None,
        }
    }

    /// Service index, if this is ArcGIS metadata.
    pub fn as_index(&self) -> Option<&ServiceIndex> {
        match self {
            Self::Index(index) => Some(index),
            _ => None,
        }
    }

    /// Package content, if this is GeoPackage metadata.
    pub fn as_packaged(&self) -> Option<&PackagedMetadata> {
        match self {
            Self::Packaged(package) => Some(package),
            _ => None,
        }
    }
}
