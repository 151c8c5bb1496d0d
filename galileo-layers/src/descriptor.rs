//! Input description of a layer: which service to use and which of its layers to show.

use serde::{Deserialize, Serialize};

use crate::node::FeatureInfo;
use crate::style::StyleDefinition;

/// Text in the two supported languages.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedString {
    /// English text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub en: Option<String>,
    /// French text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fr: Option<String>,
}

impl LocalizedString {
    /// Same text in both languages.
    pub fn both(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            en: Some(text.clone()),
            fr: Some(text),
        }
    }

    /// Returns true if no text is set.
    pub fn is_empty(&self) -> bool {
        self.en.is_none() && self.fr.is_none()
    }
}

/// Protocol of the service.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServiceType {
    /// OGC Web Map Service.
    Wms,
    /// ArcGIS MapServer.
    EsriDynamic,
    /// ArcGIS FeatureServer.
    EsriFeature,
    /// GeoPackage file.
    GeoPackage,
}

/// Leaf entry: a single layer of the service.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafEntry {
    /// Id of the layer in the service.
    pub id: String,
    /// Display name. Takes precedence over the name from the service metadata.
    #[serde(default)]
    pub name: Option<LocalizedString>,
    /// Style override.
    #[serde(default)]
    pub style: Option<StyleDefinition>,
    /// Feature info override.
    #[serde(default)]
    pub feature_info: Option<FeatureInfo>,
    /// Minimum scale override.
    #[serde(default)]
    pub min_scale: Option<f64>,
    /// Maximum scale override.
    #[serde(default)]
    pub max_scale: Option<f64>,
}

impl LeafEntry {
    /// Creates an entry with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: LocalizedString) -> Self {
        self.name = Some(name);
        self
    }

    /// Sets the feature info override.
    pub fn with_feature_info(mut self, feature_info: FeatureInfo) -> Self {
        self.feature_info = Some(feature_info);
        self
    }

    /// Sets the style override.
    pub fn with_style(mut self, style: StyleDefinition) -> Self {
        self.style = Some(style);
        self
    }
}

/// Group entry: a named collection of entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupEntry {
    /// Id of the group. Groups don't need to exist in the service.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<LocalizedString>,
    /// Children.
    #[serde(default)]
    pub entries: Vec<LayerEntryConfig>,
}

/// Declared layer entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entryType", rename_all = "camelCase")]
pub enum LayerEntryConfig {
    /// Layer of the service.
    Leaf(LeafEntry),
    /// Group of entries.
    Group(GroupEntry),
}

impl LayerEntryConfig {
    /// Leaf entry with the given id.
    pub fn leaf(id: impl Into<String>) -> Self {
        Self::Leaf(LeafEntry::new(id))
    }

    /// Group entry with the given children.
    pub fn group(id: impl Into<String>, entries: Vec<LayerEntryConfig>) -> Self {
        Self::Group(GroupEntry {
            id: id.into(),
            name: None,
            entries,
        })
    }

    /// Id of the entry.
    pub fn id(&self) -> &str {
        match self {
            Self::Leaf(leaf) => &leaf.id,
            Self::Group(group) => &group.id,
        }
    }
}

/// Layer descriptor: service endpoint and the layers to show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDescriptor {
    /// Id of the layer. Root of all layer paths of the configuration.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<LocalizedString>,
    /// Service protocol.
    pub service_type: ServiceType,
    /// Url of the service metadata.
    pub metadata_access_path: String,
    /// Declared entries. If empty, entries are discovered from the service metadata.
    #[serde(default)]
    pub entries: Vec<LayerEntryConfig>,
    /// Style applied to every layer that doesn't have its own style.
    #[serde(default)]
    pub style: Option<StyleDefinition>,
    /// EPSG code of the projection to request data in.
    #[serde(default)]
    pub projection: Option<u32>,
    /// Extent hint `[min x, min y, max x, max y]`.
    #[serde(default)]
    pub extent: Option<[f64; 4]>,
    /// For WMS: load the capabilities of every declared layer separately and merge them.
    #[serde(default)]
    pub fetch_per_layer: bool,
}

impl LayerDescriptor {
    /// Creates a descriptor without declared entries.
    pub fn new(
        id: impl Into<String>,
        service_type: ServiceType,
        metadata_access_path: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: None,
            service_type,
            metadata_access_path: metadata_access_path.into(),
            entries: vec![],
            style: None,
            projection: None,
            extent: None,
            fetch_per_layer: false,
        }
    }

    /// Sets the declared entries.
    pub fn with_entries(mut self, entries: Vec<LayerEntryConfig>) -> Self {
        self.entries = entries;
        self
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: LocalizedString) -> Self {
        self.name = Some(name);
        self
    }

    /// Sets the style override.
    pub fn with_style(mut self, style: StyleDefinition) -> Self {
        self.style = Some(style);
        self
    }

    /// Sets the projection.
    pub fn with_projection(mut self, epsg: u32) -> Self {
        self.projection = Some(epsg);
        self
    }

    /// Enables per-layer capabilities loading.
    pub fn with_fetch_per_layer(mut self, fetch_per_layer: bool) -> Self {
        self.fetch_per_layer = fetch_per_layer;
        self
    }
}
