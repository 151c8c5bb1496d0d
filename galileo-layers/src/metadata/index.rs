//! ArcGIS MapServer / FeatureServer service index and per-layer metadata.

use std::collections::{BTreeMap, BTreeSet};

use galileo_gpkg::FieldType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LayerConfigError;
use crate::style::GeometryKind;

/// Entry of a service index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    /// Layer id.
    pub id: i64,
    /// Layer name.
    #[serde(default)]
    pub name: String,
    /// Ids of the sublayers. Services report `null` for layers without sublayers.
    #[serde(default)]
    pub sub_layer_ids: Option<Vec<i64>>,
    /// Layer type, e.g. `Feature Layer` or `Group Layer`.
    #[serde(default, rename = "type")]
    pub layer_type: Option<String>,
    /// Geometry type, e.g. `esriGeometryPolygon`.
    #[serde(default)]
    pub geometry_type: Option<String>,
    /// Minimum scale the layer is visible at. `0` means no limit.
    #[serde(default)]
    pub min_scale: Option<f64>,
    /// Maximum scale the layer is visible at. `0` means no limit.
    #[serde(default)]
    pub max_scale: Option<f64>,
    /// Whether the layer is visible by default.
    #[serde(default)]
    pub default_visibility: Option<bool>,
}

impl IndexEntry {
    /// Sublayer ids, empty for leaf layers.
    pub fn sub_ids(&self) -> &[i64] {
        self.sub_layer_ids.as_deref().unwrap_or_default()
    }

    /// Geometry kind of the layer.
    pub fn geometry_kind(&self) -> Option<GeometryKind> {
        self.geometry_type
            .as_deref()
            .and_then(GeometryKind::from_esri_type)
    }
}

/// Service index: flat list of the layers of a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceIndex {
    /// Description of the service.
    #[serde(default)]
    pub service_description: Option<String>,
    /// Layers.
    #[serde(default)]
    pub layers: Vec<IndexEntry>,
    /// Non-spatial tables.
    #[serde(default)]
    pub tables: Vec<IndexEntry>,
    /// Spatial reference of the service.
    #[serde(default)]
    pub spatial_reference: Option<SpatialReference>,
}

/// Spatial reference of an ArcGIS service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatialReference {
    /// Well-known id.
    #[serde(default)]
    pub wkid: Option<u32>,
    /// Latest well-known id.
    #[serde(default)]
    pub latest_wkid: Option<u32>,
}

impl SpatialReference {
    /// EPSG code of the reference.
    pub fn epsg(&self) -> Option<u32> {
        self.latest_wkid.or(self.wkid)
    }
}

/// Node of the layer forest built from a [`ServiceIndex`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexNode {
    /// Layer id.
    pub id: i64,
    /// Sublayers in the order of the sub-id list.
    pub children: Vec<IndexNode>,
}

impl ServiceIndex {
    /// Parses the index document.
    pub fn from_json(value: &Value) -> Result<Self, LayerConfigError> {
        let index: Self = serde_json::from_value(value.clone())?;

        let mut seen = BTreeSet::new();
        for entry in &index.layers {
            if !seen.insert(entry.id) {
                return Err(LayerConfigError::MalformedServiceIndex(format!(
                    "layer id {} is listed more than once",
                    entry.id
                )));
            }
        }

        Ok(index)
    }

    /// Entry with the given id.
    pub fn entry(&self, id: i64) -> Option<&IndexEntry> {
        self.layers.iter().find(|entry| entry.id == id)
    }

    /// Builds the layer forest.
    ///
    /// Every id listed as a sublayer of another entry becomes a child of that entry; ids never
    /// listed as sublayers are roots. Roots are ordered by id, so the result does not depend on the
    /// order of the entries in the index.
    ///
    /// Fails with [`LayerConfigError::MalformedServiceIndex`] if a layer is listed as a sublayer of
    /// several layers or the references form a cycle. Sub-ids that are not in the index are skipped.
    pub fn forest(&self) -> Result<Vec<IndexNode>, LayerConfigError> {
        let entries: BTreeMap<i64, &IndexEntry> =
            self.layers.iter().map(|entry| (entry.id, entry)).collect();

        let mut parents: BTreeMap<i64, i64> = BTreeMap::new();
        let mut children: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
        for (id, entry) in &entries {
            let list = children.entry(*id).or_default();
            for sub_id in entry.sub_ids() {
                if !entries.contains_key(sub_id) {
                    log::warn!("Layer {id} references unknown sublayer {sub_id}");
                    continue;
                }

                match parents.get(sub_id) {
                    Some(parent) if parent == id => {
                        log::warn!("Layer {id} lists sublayer {sub_id} more than once");
                    }
                    Some(parent) => {
                        return Err(LayerConfigError::MalformedServiceIndex(format!(
                            "layer {sub_id} is a sublayer of both {parent} and {id}"
                        )));
                    }
                    None => {
                        parents.insert(*sub_id, *id);
                        list.push(*sub_id);
                    }
                }
            }
        }

        let roots: Vec<IndexNode> = entries
            .keys()
            .filter(|id| !parents.contains_key(*id))
            .map(|id| build_node(*id, &children))
            .collect();

        // With a single parent per layer, the layers unreachable from the roots are exactly the
        // layers on a cycle.
        let reachable: usize = roots.iter().map(IndexNode::node_count).sum();
        if reachable != entries.len() {
            let mut reached = BTreeSet::new();
            for root in &roots {
                root.collect_ids(&mut reached);
            }
            let cycle: Vec<String> = entries
                .keys()
                .filter(|id| !reached.contains(*id))
                .map(|id| id.to_string())
                .collect();
            return Err(LayerConfigError::MalformedServiceIndex(format!(
                "sublayer references form a cycle through layers {}",
                cycle.join(", ")
            )));
        }

        Ok(roots)
    }
}

fn build_node(id: i64, children: &BTreeMap<i64, Vec<i64>>) -> IndexNode {
    IndexNode {
        id,
        children: children
            .get(&id)
            .map(|ids| ids.iter().map(|id| build_node(*id, children)).collect())
            .unwrap_or_default(),
    }
}

impl IndexNode {
    /// Number of nodes in the subtree, including this one.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(IndexNode::node_count).sum::<usize>()
    }

    fn collect_ids(&self, ids: &mut BTreeSet<i64>) {
        ids.insert(self.id);
        for child in &self.children {
            child.collect_ids(ids);
        }
    }
}

/// Coded value of a field domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodedValue {
    /// Display name.
    pub name: String,
    /// Stored value.
    pub code: Value,
}

/// Domain of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FieldDomain {
    /// The field takes one of the listed values.
    CodedValue {
        /// Allowed values.
        #[serde(rename = "codedValues")]
        coded_values: Vec<CodedValue>,
    },
    /// The field takes values in the range.
    Range {
        /// `[min, max]`.
        range: [f64; 2],
    },
    /// Domain of unknown type.
    #[serde(other)]
    Unknown,
}

/// Field of a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EsriField {
    /// Name.
    pub name: String,
    /// Field type, e.g. `esriFieldTypeString`.
    #[serde(rename = "type")]
    pub field_type: String,
    /// Display alias.
    #[serde(default)]
    pub alias: Option<String>,
    /// Domain.
    #[serde(default)]
    pub domain: Option<FieldDomain>,
}

impl EsriField {
    /// Field type as exposed to the users of the layer.
    pub fn value_type(&self) -> FieldType {
        match self.field_type.as_str() {
            "esriFieldTypeDate" | "esriFieldTypeDateOnly" | "esriFieldTypeTimestampOffset" => {
                FieldType::Date
            }
            "esriFieldTypeOID"
            | "esriFieldTypeSmallInteger"
            | "esriFieldTypeInteger"
            | "esriFieldTypeBigInteger"
            | "esriFieldTypeSingle"
            | "esriFieldTypeDouble" => FieldType::Number,
            _ => FieldType::String,
        }
    }

    /// Whether the field stores geometries.
    pub fn is_geometry(&self) -> bool {
        self.field_type == "esriFieldTypeGeometry"
    }
}

/// Time settings of a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeInfo {
    /// Field storing the start time of a feature.
    #[serde(default)]
    pub start_time_field: Option<String>,
    /// Field storing the end time of a feature.
    #[serde(default)]
    pub end_time_field: Option<String>,
    /// `[start, end]` of the layer data as epoch milliseconds.
    #[serde(default)]
    pub time_extent: Option<[Option<i64>; 2]>,
}

/// Drawing settings of a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingInfo {
    /// Renderer definition, see [`crate::style::esri`].
    #[serde(default)]
    pub renderer: Option<Value>,
}

/// Extent of a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EsriExtent {
    /// Minimum x.
    pub xmin: f64,
    /// Minimum y.
    pub ymin: f64,
    /// Maximum x.
    pub xmax: f64,
    /// Maximum y.
    pub ymax: f64,
    /// Spatial reference of the coordinates.
    #[serde(default)]
    pub spatial_reference: Option<SpatialReference>,
}

/// Metadata document of a single layer (`{service}/{id}?f=json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerMetadata {
    /// Layer id.
    pub id: i64,
    /// Layer name.
    #[serde(default)]
    pub name: String,
    /// Layer type.
    #[serde(default, rename = "type")]
    pub layer_type: Option<String>,
    /// Geometry type.
    #[serde(default)]
    pub geometry_type: Option<String>,
    /// Field used as the display name of features.
    #[serde(default)]
    pub display_field: Option<String>,
    /// Minimum visible scale, `0` for no limit.
    #[serde(default)]
    pub min_scale: Option<f64>,
    /// Maximum visible scale, `0` for no limit.
    #[serde(default)]
    pub max_scale: Option<f64>,
    /// Comma separated list of supported operations, e.g. `Map,Query,Data`.
    #[serde(default)]
    pub capabilities: Option<String>,
    /// Fields.
    #[serde(default)]
    pub fields: Option<Vec<EsriField>>,
    /// Time settings.
    #[serde(default)]
    pub time_info: Option<TimeInfo>,
    /// Drawing settings.
    #[serde(default)]
    pub drawing_info: Option<DrawingInfo>,
    /// Extent.
    #[serde(default)]
    pub extent: Option<EsriExtent>,
}

impl LayerMetadata {
    /// Parses the layer document.
    pub fn from_json(value: &Value) -> Result<Self, LayerConfigError> {
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Whether the layer supports feature queries.
    pub fn is_queryable(&self) -> bool {
        self.capabilities.as_deref().is_some_and(|capabilities| {
            capabilities
                .split(',')
                .any(|capability| capability.trim().eq_ignore_ascii_case("query"))
        })
    }

    /// Geometry kind of the layer.
    pub fn geometry_kind(&self) -> Option<GeometryKind> {
        self.geometry_type
            .as_deref()
            .and_then(GeometryKind::from_esri_type)
    }

    /// Non-geometry fields.
    pub fn attribute_fields(&self) -> impl Iterator<Item = &EsriField> {
        self.fields
            .iter()
            .flatten()
            .filter(|field| !field.is_geometry())
    }

    /// Renderer definition.
    pub fn renderer(&self) -> Option<&Value> {
        self.drawing_info
            .as_ref()
            .and_then(|info| info.renderer.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn index(layers: Value) -> ServiceIndex {
        ServiceIndex::from_json(&json!({ "layers": layers })).unwrap()
    }

    fn ids(nodes: &[IndexNode]) -> Vec<i64> {
        nodes.iter().map(|node| node.id).collect()
    }

    #[test]
    fn forest_roots_are_unreferenced_ids() {
        let index = index(json!([
            {"id": 0, "name": "Transport", "subLayerIds": [1, 2]},
            {"id": 1, "name": "Roads", "subLayerIds": null},
            {"id": 2, "name": "Rail", "subLayerIds": [3]},
            {"id": 3, "name": "Stations"},
            {"id": 4, "name": "Water"},
        ]));

        let forest = index.forest().unwrap();
        assert_eq!(ids(&forest), vec![0, 4]);
        assert_eq!(ids(&forest[0].children), vec![1, 2]);
        assert_eq!(ids(&forest[0].children[1].children), vec![3]);
        assert_eq!(forest.iter().map(IndexNode::node_count).sum::<usize>(), 5);
    }

    #[test]
    fn forest_does_not_depend_on_order() {
        let layers = vec![
            json!({"id": 5, "name": "e", "subLayerIds": [7]}),
            json!({"id": 2, "name": "b", "subLayerIds": [3, 1]}),
            json!({"id": 3, "name": "c"}),
            json!({"id": 1, "name": "a"}),
            json!({"id": 7, "name": "g"}),
        ];
        let expected = index(Value::Array(layers.clone())).forest().unwrap();

        let mut reversed = layers.clone();
        reversed.reverse();
        assert_eq!(index(Value::Array(reversed)).forest().unwrap(), expected);

        let mut rotated = layers;
        rotated.rotate_left(2);
        assert_eq!(index(Value::Array(rotated)).forest().unwrap(), expected);

        assert_eq!(ids(&expected), vec![2, 5]);
        assert_eq!(ids(&expected[0].children), vec![3, 1]);
    }

    #[test]
    fn dangling_sub_ids_are_skipped() {
        let index = index(json!([
            {"id": 0, "name": "group", "subLayerIds": [1, 9]},
            {"id": 1, "name": "a"},
        ]));
        let forest = index.forest().unwrap();
        assert_eq!(ids(&forest[0].children), vec![1]);
    }

    #[test]
    fn cycles_fail_fast() {
        let index = index(json!([
            {"id": 0, "name": "root"},
            {"id": 1, "name": "a", "subLayerIds": [2]},
            {"id": 2, "name": "b", "subLayerIds": [1]},
        ]));
        assert_matches!(
            index.forest(),
            Err(LayerConfigError::MalformedServiceIndex(message)) if message.contains("1, 2")
        );

        let index = self::index(json!([{"id": 0, "name": "self", "subLayerIds": [0]}]));
        assert_matches!(
            index.forest(),
            Err(LayerConfigError::MalformedServiceIndex(_))
        );
    }

    #[test]
    fn several_parents_fail() {
        let index = index(json!([
            {"id": 0, "name": "a", "subLayerIds": [2]},
            {"id": 1, "name": "b", "subLayerIds": [2]},
            {"id": 2, "name": "c"},
        ]));
        assert_matches!(
            index.forest(),
            Err(LayerConfigError::MalformedServiceIndex(_))
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let result = ServiceIndex::from_json(&json!({"layers": [
            {"id": 0, "name": "a"},
            {"id": 0, "name": "b"},
        ]}));
        assert_matches!(result, Err(LayerConfigError::MalformedServiceIndex(_)));
    }

    #[test]
    fn layer_metadata() {
        let metadata = LayerMetadata::from_json(&json!({
            "id": 3,
            "name": "Wells",
            "type": "Feature Layer",
            "geometryType": "esriGeometryPoint",
            "displayField": "NAME",
            "minScale": 500000,
            "maxScale": 0,
            "capabilities": "Map, Query,Data",
            "fields": [
                {"name": "OBJECTID", "type": "esriFieldTypeOID", "alias": "Object id"},
                {"name": "SHAPE", "type": "esriFieldTypeGeometry"},
                {"name": "NAME", "type": "esriFieldTypeString", "domain": null},
                {"name": "DRILLED", "type": "esriFieldTypeDate"},
                {"name": "STATUS", "type": "esriFieldTypeSmallInteger", "domain": {
                    "type": "codedValue",
                    "name": "status",
                    "codedValues": [{"name": "Active", "code": 1}, {"name": "Closed", "code": 2}]
                }},
                {"name": "DEPTH", "type": "esriFieldTypeDouble", "domain": {"type": "range", "range": [0, 5000]}},
            ],
            "timeInfo": {"startTimeField": "DRILLED", "timeExtent": [0, null]},
            "drawingInfo": {"renderer": {"type": "simple"}},
        }))
        .unwrap();

        assert!(metadata.is_queryable());
        assert_eq!(metadata.geometry_kind(), Some(GeometryKind::Point));
        assert_eq!(metadata.attribute_fields().count(), 5);

        let types: Vec<FieldType> = metadata.attribute_fields().map(EsriField::value_type).collect();
        assert_eq!(
            types,
            vec![
                FieldType::Number,
                FieldType::String,
                FieldType::Date,
                FieldType::Number,
                FieldType::Number
            ]
        );

        let status = metadata.attribute_fields().nth(3).unwrap();
        assert_matches!(&status.domain, Some(FieldDomain::CodedValue { coded_values }) if coded_values.len() == 2);
        let depth = metadata.attribute_fields().nth(4).unwrap();
        assert_eq!(depth.domain, Some(FieldDomain::Range { range: [0.0, 5000.0] }));

        let time = metadata.time_info.as_ref().unwrap();
        assert_eq!(time.start_time_field.as_deref(), Some("DRILLED"));
        assert_eq!(time.time_extent, Some([Some(0), None]));
        assert!(metadata.renderer().is_some());
    }

    #[test]
    fn layer_without_query_capability() {
        let metadata = LayerMetadata::from_json(&json!({"id": 1, "capabilities": "Map"})).unwrap();
        assert!(!metadata.is_queryable());
        assert!(metadata.geometry_kind().is_none());
        assert_eq!(metadata.attribute_fields().count(), 0);
    }
}
