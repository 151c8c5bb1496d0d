//! Layer configuration tree.

use galileo_gpkg::FieldType;
use serde::{Deserialize, Serialize};

use crate::descriptor::{LocalizedString, ServiceType};
use crate::metadata::index::FieldDomain;
use crate::status::LayerStatus;
use crate::style::{GeometryKind, StyleDefinition};

mod tree;

pub use tree::ConfigTree;

/// Where the data of a layer comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Url of the data. For ArcGIS layers this is the url of the layer itself.
    pub access_path: String,
    /// EPSG code of the data projection.
    pub projection: Option<u32>,
    /// Service protocol.
    pub format: ServiceType,
    /// Proxy prefix the service is accessed through.
    pub proxy: Option<String>,
}

/// Field of a queryable layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Name of the field.
    pub name: String,
    /// Display alias.
    pub alias: Option<String>,
    /// Value type.
    pub field_type: FieldType,
    /// Allowed values.
    pub domain: Option<FieldDomain>,
}

impl FieldInfo {
    /// Creates a field without alias and domain.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            alias: None,
            field_type,
            domain: None,
        }
    }
}

/// Feature info schema of a layer.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureInfo {
    /// Whether features of the layer can be queried.
    #[serde(default)]
    pub queryable: bool,
    /// Field used as the display name of a feature.
    #[serde(default)]
    pub name_field: Option<String>,
    /// Fields.
    #[serde(default)]
    pub fields: Vec<FieldInfo>,
}

/// Temporal dimension of a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalDimension {
    /// Field or dimension name storing the time.
    pub field: String,
    /// Default value.
    pub default: Option<String>,
    /// Range or list of values.
    pub range: Option<String>,
}

/// Visibility scale limits. `None` means no limit.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleLimits {
    /// Layer is hidden when zoomed out beyond this scale.
    pub min_scale: Option<f64>,
    /// Layer is hidden when zoomed in beyond this scale.
    pub max_scale: Option<f64>,
}

/// Fields shared by leaves and groups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeCommon {
    /// Id of the entry within its parent.
    pub entry_id: String,
    /// Unique path of the node: ids from the descriptor to the node joined with `/`.
    pub layer_path: String,
    /// Display name.
    pub name: LocalizedString,
    /// Resolution status.
    pub status: LayerStatus,
    /// Path of the parent node. `None` for the top level entries.
    pub parent_path: Option<String>,
    /// Data source.
    pub source: SourceConfig,
    /// Style.
    pub style: StyleDefinition,
    /// Feature info schema.
    pub feature_info: FeatureInfo,
    /// Scale limits.
    pub scale_limits: ScaleLimits,
    /// Temporal dimension.
    pub temporal_dimension: Option<TemporalDimension>,
    /// Geometry kind of vector layers.
    pub geometry_kind: Option<GeometryKind>,
    /// Extent `[min x, min y, max x, max y]`.
    pub extent: Option<[f64; 4]>,
}

impl NodeCommon {
    /// Creates a registered node.
    pub fn new(
        entry_id: impl Into<String>,
        parent_path: &str,
        is_top_level: bool,
        source: SourceConfig,
    ) -> Self {
        let entry_id = entry_id.into();
        Self {
            layer_path: format!("{parent_path}/{entry_id}"),
            entry_id,
            name: LocalizedString::default(),
            status: LayerStatus::Registered,
            parent_path: (!is_top_level).then(|| parent_path.to_string()),
            source,
            style: StyleDefinition::new(),
            feature_info: FeatureInfo::default(),
            scale_limits: ScaleLimits::default(),
            temporal_dimension: None,
            geometry_kind: None,
            extent: None,
        }
    }
}

/// Leaf node: a single renderable layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeafNode {
    /// Common fields.
    #[serde(flatten)]
    pub common: NodeCommon,
}

/// Group node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupNode {
    /// Common fields.
    #[serde(flatten)]
    pub common: NodeCommon,
    /// Children in display order.
    pub children: Vec<ConfigNode>,
}

/// Node of the configuration tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "nodeType", rename_all = "camelCase")]
pub enum ConfigNode {
    /// Layer.
    Leaf(LeafNode),
    /// Group of layers.
    Group(GroupNode),
}

impl ConfigNode {
    /// Common fields.
    pub fn common(&self) -> &NodeCommon {
        match self {
            Self::Leaf(leaf) => &leaf.common,
            Self::Group(group) => &group.common,
        }
    }

    /// Common fields.
    pub fn common_mut(&mut self) -> &mut NodeCommon {
        match self {
            Self::Leaf(leaf) => &mut leaf.common,
            Self::Group(group) => &mut group.common,
        }
    }

    /// Path of the node.
    pub fn layer_path(&self) -> &str {
        &self.common().layer_path
    }

    /// Status of the node.
    pub fn status(&self) -> LayerStatus {
        self.common().status
    }

    /// Children of a group, empty for leaves.
    pub fn children(&self) -> &[ConfigNode] {
        match self {
            Self::Leaf(_) => &[],
            Self::Group(group) => &group.children,
        }
    }

    /// Returns true for groups.
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }

    /// Whether this node and all its descendants are settled.
    pub fn is_settled(&self) -> bool {
        self.status().is_settled() && self.children().iter().all(ConfigNode::is_settled)
    }

    /// Finds the node with the given path in this subtree.
    pub fn find(&self, layer_path: &str) -> Option<&ConfigNode> {
        if self.layer_path() == layer_path {
            return Some(self);
        }

        let prefix = format!("{}/", self.layer_path());
        if !layer_path.starts_with(&prefix) {
            return None;
        }

        self.children()
            .iter()
            .find_map(|child| child.find(layer_path))
    }
}
