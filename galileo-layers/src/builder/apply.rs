//! Copying of service metadata into configuration nodes. Values declared in the descriptor are
//! never replaced.

use crate::descriptor::{LayerDescriptor, LeafEntry, LocalizedString};
use crate::metadata::capabilities::CapabilityLayer;
use crate::metadata::index::{IndexEntry, LayerMetadata};
use crate::metadata::packaged::PackagedTable;
use crate::node::{FeatureInfo, FieldInfo, NodeCommon, ScaleLimits, TemporalDimension};
use crate::style::esri::style_from_renderer;

/// ArcGIS uses `0` for "no limit".
fn scale_limit(value: Option<f64>) -> Option<f64> {
    value.filter(|scale| *scale > 0.0)
}

fn epsg_code(crs: &str) -> Option<u32> {
    let (authority, code) = crs.split_once(':')?;
    if !authority.eq_ignore_ascii_case("EPSG") {
        return None;
    }

    code.trim().parse().ok()
}

pub(super) fn index_entry(common: &mut NodeCommon, entry: &IndexEntry, declared_scale: bool) {
    if common.name.is_empty() && !entry.name.is_empty() {
        common.name = LocalizedString::both(&entry.name);
    }

    common.geometry_kind = entry.geometry_kind();
    if !declared_scale {
        common.scale_limits = ScaleLimits {
            min_scale: scale_limit(entry.min_scale),
            max_scale: scale_limit(entry.max_scale),
        };
    }
}

pub(super) fn layer_metadata(
    common: &mut NodeCommon,
    metadata: &LayerMetadata,
    declared_feature_info: bool,
    declared_scale: bool,
) {
    if common.name.is_empty() && !metadata.name.is_empty() {
        common.name = LocalizedString::both(&metadata.name);
    }

    common.geometry_kind = metadata.geometry_kind().or(common.geometry_kind);

    if !declared_scale {
        common.scale_limits = ScaleLimits {
            min_scale: scale_limit(metadata.min_scale).or(common.scale_limits.min_scale),
            max_scale: scale_limit(metadata.max_scale).or(common.scale_limits.max_scale),
        };
    }

    let fields: Vec<FieldInfo> = metadata
        .attribute_fields()
        .map(|field| FieldInfo {
            name: field.name.clone(),
            alias: field.alias.clone(),
            field_type: field.value_type(),
            domain: field.domain.clone(),
        })
        .collect();

    if declared_feature_info {
        let info = &mut common.feature_info;
        if info.fields.is_empty() {
            info.fields = fields;
        }
        if info.name_field.is_none() {
            info.name_field = metadata.display_field.clone();
        }
    } else {
        common.feature_info = FeatureInfo {
            queryable: metadata.is_queryable(),
            name_field: metadata.display_field.clone(),
            fields,
        };
    }

    if let Some(time_info) = &metadata.time_info {
        if let Some(field) = &time_info.start_time_field {
            common.temporal_dimension = Some(TemporalDimension {
                field: field.clone(),
                default: None,
                range: time_info.time_extent.map(|[start, end]| {
                    let bound = |value: Option<i64>| value.map(|v| v.to_string()).unwrap_or_default();
                    format!("{}/{}", bound(start), bound(end))
                }),
            });
        }
    }

    if let (Some(renderer), Some(kind)) = (metadata.renderer(), common.geometry_kind) {
        common.style.merge_missing(&style_from_renderer(renderer, kind));
    }

    if common.extent.is_none() {
        common.extent = metadata
            .extent
            .as_ref()
            .map(|extent| [extent.xmin, extent.ymin, extent.xmax, extent.ymax]);
    }
}

pub(super) fn capability_layer(
    common: &mut NodeCommon,
    layer: &CapabilityLayer,
    descriptor: &LayerDescriptor,
    leaf: &LeafEntry,
) {
    if leaf.feature_info.is_none() {
        common.feature_info.queryable = layer.is_queryable();
    }

    // Scale denominators grow when zooming out.
    if leaf.min_scale.is_none() {
        common.scale_limits.min_scale = layer.max_scale_denominator;
    }
    if leaf.max_scale.is_none() {
        common.scale_limits.max_scale = layer.min_scale_denominator;
    }

    common.temporal_dimension = layer.time_dimension().map(|dimension| TemporalDimension {
        field: dimension.name.clone(),
        default: dimension.default.clone(),
        range: dimension.values.clone(),
    });

    common.extent = descriptor.extent.or(layer.geographic_bbox);
    if common.source.projection.is_none() {
        common.source.projection = layer.crs.iter().find_map(|crs| epsg_code(crs));
    }
}

pub(super) fn packaged_table(
    common: &mut NodeCommon,
    table: &PackagedTable,
    descriptor: &LayerDescriptor,
    leaf: &LeafEntry,
) {
    if common.name.is_empty() {
        common.name = LocalizedString::both(&table.info.name);
    }

    common.geometry_kind = table.geometry_kind;
    if descriptor.projection.is_none() && table.info.srs_id > 0 {
        common.source.projection = u32::try_from(table.info.srs_id).ok();
    }

    if leaf.feature_info.is_none() {
        common.feature_info = FeatureInfo {
            queryable: true,
            name_field: None,
            fields: table
                .fields
                .iter()
                .map(|field| FieldInfo::new(&field.name, field.field_type))
                .collect(),
        };
    }

    common.style.merge_missing(&table.style);
    common.extent = descriptor.extent;
}
