//! WMS capabilities document.
//!
//! The layer tree of a capabilities document relies on inheritance: a layer that does not declare
//! an attribute takes it from its nearest ancestor. [`CapabilitiesDocument::parse`] resolves the
//! inheritance once, so every [`CapabilityLayer`] of a parsed document carries its effective
//! values.
//!
//! Two policies are used:
//! * replace: bounding boxes, queryable, cascaded, opaque, fixed size, scale denominators,
//!   dimensions and attribution are copied from the ancestor only when the layer has no value;
//! * add: styles and CRS lists are the union of the layer's own values and the ancestor's ones,
//!   de-duplicated by name.

use serde::Serialize;

use crate::error::LayerConfigError;
use crate::xml::XmlElement;

/// Parsed capabilities document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapabilitiesDocument {
    /// Version of the document.
    pub version: Option<String>,
    /// Title of the service.
    pub title: Option<String>,
    /// Url of the `GetMap` operation.
    pub get_map_url: Option<String>,
    /// Url of the `GetFeatureInfo` operation. `None` if the operation is not supported.
    pub get_feature_info_url: Option<String>,
    /// Image formats supported by `GetMap`.
    pub map_formats: Vec<String>,
    /// Root layer.
    pub root: CapabilityLayer,
}

/// Geographic bounding box in degrees: `[west, south, east, north]`.
pub type GeographicBox = [f64; 4];

/// Bounding box in the given coordinate system.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundingBox {
    /// Coordinate system identifier.
    pub crs: String,
    /// `[min x, min y, max x, max y]`.
    pub extent: [f64; 4],
}

/// Style offered for a layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapabilityStyle {
    /// Name of the style.
    pub name: String,
    /// Title of the style.
    pub title: Option<String>,
    /// Url of the legend image.
    pub legend_url: Option<String>,
}

/// Dimension of a layer, e.g. `time` or `elevation`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dimension {
    /// Name of the dimension.
    pub name: String,
    /// Units of the values.
    pub units: Option<String>,
    /// Default value.
    pub default: Option<String>,
    /// Values or interval specification.
    pub values: Option<String>,
}

/// Attribution of a layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribution {
    /// Attribution text.
    pub title: Option<String>,
    /// Url of the data provider.
    pub url: Option<String>,
}

/// Layer of a capabilities document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CapabilityLayer {
    /// Name of the layer. Layers without a name are only containers and cannot be requested.
    pub name: Option<String>,
    /// Human readable title.
    pub title: Option<String>,
    /// Description.
    pub abstract_text: Option<String>,
    /// Supported coordinate systems.
    pub crs: Vec<String>,
    /// Extent in geographic coordinates.
    pub geographic_bbox: Option<GeographicBox>,
    /// Extents in supported coordinate systems.
    pub bounding_boxes: Vec<BoundingBox>,
    /// Styles.
    pub styles: Vec<CapabilityStyle>,
    /// Whether `GetFeatureInfo` is supported for the layer.
    pub queryable: Option<bool>,
    /// Number of times the layer was cascaded.
    pub cascaded: Option<u32>,
    /// Whether the layer is opaque.
    pub opaque: Option<bool>,
    /// Fixed width of the map images.
    pub fixed_width: Option<u32>,
    /// Fixed height of the map images.
    pub fixed_height: Option<u32>,
    /// Minimum scale denominator the layer is shown at.
    pub min_scale_denominator: Option<f64>,
    /// Maximum scale denominator the layer is shown at.
    pub max_scale_denominator: Option<f64>,
    /// Dimensions.
    pub dimensions: Vec<Dimension>,
    /// Attribution.
    pub attribution: Option<Attribution>,
    /// Sublayers.
    pub layers: Vec<CapabilityLayer>,
}

/// Step of a positional path in the layer tree.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum PathStep {
    /// The root layer. It is a single object rather than an element of a list.
    Object,
    /// Sublayer with the given index.
    Index(usize),
}

impl CapabilitiesDocument {
    /// Parses the document and resolves attribute inheritance.
    pub fn parse(document: &str) -> Result<Self, LayerConfigError> {
        let element = XmlElement::parse(document)?;
        if element.name != "WMS_Capabilities" && element.name != "WMT_MS_Capabilities" {
            return Err(LayerConfigError::MalformedMetadata(format!(
                "expected capabilities document, got <{}>",
                element.name
            )));
        }

        let capability = element.child("Capability").ok_or_else(|| {
            LayerConfigError::MalformedMetadata("capabilities document has no Capability".into())
        })?;
        let root_layer = capability.child("Layer").ok_or_else(|| {
            LayerConfigError::MalformedMetadata("capabilities document has no root layer".into())
        })?;

        let request = capability.child("Request");
        let get_map = request.and_then(|request| request.child("GetMap"));
        let get_feature_info = request.and_then(|request| request.child("GetFeatureInfo"));

        let mut root = CapabilityLayer::from_element(root_layer);
        root.resolve_inheritance();

        Ok(Self {
            version: element.attr("version").map(str::to_string),
            title: element
                .child("Service")
                .and_then(|service| service.child_text("Title"))
                .map(str::to_string),
            get_map_url: get_map.and_then(operation_url),
            get_feature_info_url: get_feature_info.and_then(operation_url),
            map_formats: get_map
                .map(|get_map| {
                    get_map
                        .children_named("Format")
                        .map(|format| format.text.trim().to_string())
                        .collect()
                })
                .unwrap_or_default(),
            root,
        })
    }

    /// Finds the first layer with the given name in depth-first order.
    ///
    /// Returns the layer and its positional path: [`PathStep::Object`] for the root followed by the
    /// sublayer indices.
    pub fn find_layer(&self, name: &str) -> Option<(&CapabilityLayer, Vec<PathStep>)> {
        let mut path = vec![PathStep::Object];
        find_in(&self.root, name, &mut path).map(|layer| (layer, path))
    }

    /// Merges the layer with the given name from a separately loaded document into this one.
    ///
    /// The layer is placed at the position it has in `source`, as deep as this document's tree
    /// allows. Returns false if the layer is already present or `source` has no such layer.
    pub fn merge_layer(&mut self, source: &CapabilitiesDocument, name: &str) -> bool {
        if self.find_layer(name).is_some() {
            log::trace!("Layer {name} is already present, merge is skipped");
            return false;
        }

        let Some((layer, path)) = source.find_layer(name) else {
            return false;
        };

        let Some((last, parents)) = path.split_last() else {
            return false;
        };

        let mut target = &mut self.root;
        for step in parents {
            match step {
                PathStep::Object => {}
                PathStep::Index(index) => {
                    if *index >= target.layers.len() {
                        break;
                    }
                    target = &mut target.layers[*index];
                }
            }
        }

        match last {
            PathStep::Object => {
                // The source document consists of the requested layer only.
                target.layers.push(layer.clone());
            }
            PathStep::Index(index) => {
                let index = (*index).min(target.layers.len());
                target.layers.insert(index, layer.clone());
            }
        }

        true
    }

    /// Iterates over all layers in depth-first order.
    pub fn layers(&self) -> impl Iterator<Item = &CapabilityLayer> {
        let mut stack = vec![&self.root];
        std::iter::from_fn(move || {
            let layer = stack.pop()?;
            stack.extend(layer.layers.iter().rev());
            Some(layer)
        })
    }
}

fn find_in<'a>(
    layer: &'a CapabilityLayer,
    name: &str,
    path: &mut Vec<PathStep>,
) -> Option<&'a CapabilityLayer> {
    if layer.name.as_deref() == Some(name) {
        return Some(layer);
    }

    for (index, child) in layer.layers.iter().enumerate() {
        path.push(PathStep::Index(index));
        if let Some(found) = find_in(child, name, path) {
            return Some(found);
        }
        path.pop();
    }

    None
}

fn operation_url(operation: &XmlElement) -> Option<String> {
    operation
        .find("Get")
        .and_then(|get| get.child("OnlineResource"))
        .and_then(|resource| resource.attr("href"))
        .map(str::to_string)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

fn parse_number<T: std::str::FromStr>(value: Option<&str>) -> Option<T> {
    value.and_then(|value| value.trim().parse().ok())
}

/// Ground distance of the diagonal of one pixel at scale denominator 1, in meters.
const SCALE_HINT_UNIT: f64 = 0.00028 * std::f64::consts::SQRT_2;

/// WMS 1.1.1 `ScaleHint` values are pixel diagonals in meters, not scale denominators.
fn scale_hint_denominator(value: Option<&str>) -> Option<f64> {
    parse_number::<f64>(value).map(|diagonal| diagonal / SCALE_HINT_UNIT)
}

fn geographic_bbox(element: &XmlElement) -> Option<GeographicBox> {
    if let Some(bbox) = element.child("EX_GeographicBoundingBox") {
        return Some([
            parse_number(bbox.child_text("westBoundLongitude"))?,
            parse_number(bbox.child_text("southBoundLatitude"))?,
            parse_number(bbox.child_text("eastBoundLongitude"))?,
            parse_number(bbox.child_text("northBoundLatitude"))?,
        ]);
    }

    let bbox = element.child("LatLonBoundingBox")?;
    Some([
        parse_number(bbox.attr("minx"))?,
        parse_number(bbox.attr("miny"))?,
        parse_number(bbox.attr("maxx"))?,
        parse_number(bbox.attr("maxy"))?,
    ])
}

fn bounding_box(element: &XmlElement) -> Option<BoundingBox> {
    Some(BoundingBox {
        crs: element.attr("CRS").or_else(|| element.attr("SRS"))?.to_string(),
        extent: [
            parse_number(element.attr("minx"))?,
            parse_number(element.attr("miny"))?,
            parse_number(element.attr("maxx"))?,
            parse_number(element.attr("maxy"))?,
        ],
    })
}

fn style(element: &XmlElement) -> Option<CapabilityStyle> {
    Some(CapabilityStyle {
        name: element.child_text("Name")?.to_string(),
        title: element.child_text("Title").map(str::to_string),
        legend_url: element
            .child("LegendURL")
            .and_then(|legend| legend.child("OnlineResource"))
            .and_then(|resource| resource.attr("href"))
            .map(str::to_string),
    })
}

fn dimensions(element: &XmlElement) -> Vec<Dimension> {
    let mut dimensions: Vec<Dimension> = element
        .children_named("Dimension")
        .filter_map(|dimension| {
            let text = dimension.text.trim();
            Some(Dimension {
                name: dimension.attr("name")?.to_string(),
                units: dimension.attr("units").map(str::to_string),
                default: dimension.attr("default").map(str::to_string),
                values: (!text.is_empty()).then(|| text.to_string()),
            })
        })
        .collect();

    // Version 1.1.1 declares the values and the default in a separate Extent element.
    for extent in element.children_named("Extent") {
        let Some(name) = extent.attr("name") else {
            continue;
        };
        let text = extent.text.trim();
        let values = (!text.is_empty()).then(|| text.to_string());
        let default = extent.attr("default").map(str::to_string);

        match dimensions.iter_mut().find(|dimension| dimension.name == name) {
            Some(dimension) => {
                dimension.values = dimension.values.take().or(values);
                dimension.default = dimension.default.take().or(default);
            }
            None => dimensions.push(Dimension {
                name: name.to_string(),
                units: None,
                default,
                values,
            }),
        }
    }

    dimensions
}

fn add_missing<T: Clone>(own: &mut Vec<T>, inherited: &[T], key: impl Fn(&T) -> &str) {
    for value in inherited {
        if !own.iter().any(|existing| key(existing) == key(value)) {
            own.push(value.clone());
        }
    }
}

fn dedup_by_key<T>(values: &mut Vec<T>, key: impl Fn(&T) -> &str) {
    let mut seen: Vec<String> = vec![];
    values.retain(|value| {
        let name = key(value);
        if seen.iter().any(|existing| existing == name) {
            false
        } else {
            seen.push(name.to_string());
            true
        }
    });
}

impl CapabilityLayer {
    fn from_element(element: &XmlElement) -> Self {
        let mut crs: Vec<String> = element
            .children
            .iter()
            .filter(|child| child.name == "CRS" || child.name == "SRS")
            .flat_map(|child| child.text.split_whitespace().map(str::to_string))
            .collect();
        dedup_by_key(&mut crs, String::as_str);

        let mut styles: Vec<CapabilityStyle> =
            element.children_named("Style").filter_map(style).collect();
        dedup_by_key(&mut styles, |style| style.name.as_str());

        let scale_hint = element.child("ScaleHint");

        Self {
            name: element.child_text("Name").map(str::to_string),
            title: element.child_text("Title").map(str::to_string),
            abstract_text: element.child_text("Abstract").map(str::to_string),
            crs,
            geographic_bbox: geographic_bbox(element),
            bounding_boxes: element
                .children_named("BoundingBox")
                .filter_map(bounding_box)
                .collect(),
            styles,
            queryable: element.attr("queryable").and_then(parse_bool),
            cascaded: parse_number(element.attr("cascaded")),
            opaque: element.attr("opaque").and_then(parse_bool),
            fixed_width: parse_number(element.attr("fixedWidth")),
            fixed_height: parse_number(element.attr("fixedHeight")),
            min_scale_denominator: parse_number(element.child_text("MinScaleDenominator"))
                .or_else(|| scale_hint_denominator(scale_hint.and_then(|hint| hint.attr("min")))),
            max_scale_denominator: parse_number(element.child_text("MaxScaleDenominator"))
                .or_else(|| scale_hint_denominator(scale_hint.and_then(|hint| hint.attr("max")))),
            dimensions: dimensions(element),
            attribution: element.child("Attribution").map(|attribution| Attribution {
                title: attribution.child_text("Title").map(str::to_string),
                url: attribution
                    .child("OnlineResource")
                    .and_then(|resource| resource.attr("href"))
                    .map(str::to_string),
            }),
            layers: element
                .children_named("Layer")
                .map(CapabilityLayer::from_element)
                .collect(),
        }
    }

    fn inherit_from(&mut self, parent: &CapabilityLayer) {
        if self.geographic_bbox.is_none() {
            self.geographic_bbox = parent.geographic_bbox;
        }
        if self.bounding_boxes.is_empty() {
            self.bounding_boxes = parent.bounding_boxes.clone();
        }
        if self.queryable.is_none() {
            self.queryable = parent.queryable;
        }
        if self.cascaded.is_none() {
            self.cascaded = parent.cascaded;
        }
        if self.opaque.is_none() {
            self.opaque = parent.opaque;
        }
        if self.fixed_width.is_none() {
            self.fixed_width = parent.fixed_width;
        }
        if self.fixed_height.is_none() {
            self.fixed_height = parent.fixed_height;
        }
        if self.min_scale_denominator.is_none() {
            self.min_scale_denominator = parent.min_scale_denominator;
        }
        if self.max_scale_denominator.is_none() {
            self.max_scale_denominator = parent.max_scale_denominator;
        }
        if self.dimensions.is_empty() {
            self.dimensions = parent.dimensions.clone();
        }
        if self.attribution.is_none() {
            self.attribution = parent.attribution.clone();
        }

        add_missing(&mut self.styles, &parent.styles, |style| style.name.as_str());
        add_missing(&mut self.crs, &parent.crs, String::as_str);
    }

    /// Applies inheritance to all descendants. Ancestors are processed before their children, so a
    /// value is passed down any number of levels.
    fn resolve_inheritance(&mut self) {
        let mut layers = std::mem::take(&mut self.layers);
        for layer in &mut layers {
            layer.inherit_from(self);
            layer.resolve_inheritance();
        }
        self.layers = layers;
    }

    /// Whether the layer supports feature info requests. Layers that do not declare it are not
    /// queryable.
    pub fn is_queryable(&self) -> bool {
        self.queryable.unwrap_or(false)
    }

    /// The `time` dimension of the layer.
    pub fn time_dimension(&self) -> Option<&Dimension> {
        self.dimensions
            .iter()
            .find(|dimension| dimension.name.eq_ignore_ascii_case("time"))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<WMS_Capabilities version="1.3.0" xmlns="http://www.opengis.net/wms" xmlns:xlink="http://www.w3.org/1999/xlink">
  <Service><Title>Test service</Title></Service>
  <Capability>
    <Request>
      <GetMap>
        <Format>image/png</Format>
        <Format>image/jpeg</Format>
        <DCPType><HTTP><Get><OnlineResource xlink:href="https://svc/wms?"/></Get></HTTP></DCPType>
      </GetMap>
      <GetFeatureInfo>
        <Format>text/xml</Format>
        <DCPType><HTTP><Get><OnlineResource xlink:href="https://svc/wms/info?"/></Get></HTTP></DCPType>
      </GetFeatureInfo>
    </Request>
    <Layer queryable="1" opaque="0">
      <Title>Root</Title>
      <CRS>EPSG:4326</CRS>
      <CRS>EPSG:3857</CRS>
      <EX_GeographicBoundingBox>
        <westBoundLongitude>-141</westBoundLongitude>
        <eastBoundLongitude>-52</eastBoundLongitude>
        <southBoundLatitude>41</southBoundLatitude>
        <northBoundLatitude>83</northBoundLatitude>
      </EX_GeographicBoundingBox>
      <Style><Name>default</Name><Title>Default</Title></Style>
      <Dimension name="time" units="ISO8601" default="2020-01-01">2019-01-01/2020-01-01/P1D</Dimension>
      <Attribution><Title>Provider</Title><OnlineResource xlink:href="https://provider"/></Attribution>
      <Layer>
        <Name>rivers</Name>
        <Title>Rivers</Title>
        <CRS>EPSG:3978</CRS>
        <CRS>EPSG:4326</CRS>
        <Style><Name>blue</Name></Style>
        <Style><Name>default</Name><Title>Own default</Title></Style>
        <MaxScaleDenominator>500000</MaxScaleDenominator>
        <Layer queryable="0">
          <Name>streams</Name>
          <Title>Streams</Title>
        </Layer>
      </Layer>
      <Layer opaque="1">
        <Name>lakes</Name>
        <EX_GeographicBoundingBox>
          <westBoundLongitude>-100</westBoundLongitude>
          <eastBoundLongitude>-90</eastBoundLongitude>
          <southBoundLatitude>45</southBoundLatitude>
          <northBoundLatitude>50</northBoundLatitude>
        </EX_GeographicBoundingBox>
      </Layer>
    </Layer>
  </Capability>
</WMS_Capabilities>"#;

    fn layer<'a>(document: &'a CapabilitiesDocument, name: &str) -> &'a CapabilityLayer {
        document.find_layer(name).unwrap().0
    }

    #[test]
    fn service_information() {
        let document = CapabilitiesDocument::parse(DOCUMENT).unwrap();
        assert_eq!(document.version.as_deref(), Some("1.3.0"));
        assert_eq!(document.title.as_deref(), Some("Test service"));
        assert_eq!(document.get_map_url.as_deref(), Some("https://svc/wms?"));
        assert_eq!(
            document.get_feature_info_url.as_deref(),
            Some("https://svc/wms/info?")
        );
        assert_eq!(document.map_formats, vec!["image/png", "image/jpeg"]);
        assert_eq!(document.layers().count(), 4);
    }

    #[test]
    fn absent_attributes_are_inherited() {
        let document = CapabilitiesDocument::parse(DOCUMENT).unwrap();
        let rivers = layer(&document, "rivers");
        assert_eq!(rivers.queryable, Some(true));
        assert_eq!(rivers.opaque, Some(false));
        assert_eq!(rivers.geographic_bbox, document.root.geographic_bbox);
        assert_eq!(rivers.time_dimension(), document.root.time_dimension());
        assert_eq!(rivers.attribution, document.root.attribution);
        assert_eq!(rivers.cascaded, None);

        let streams = layer(&document, "streams");
        assert_eq!(streams.queryable, Some(false));
        assert_abs_diff_eq!(streams.max_scale_denominator.unwrap(), 500000.0);
        assert_eq!(streams.min_scale_denominator, None);
        assert_eq!(streams.geographic_bbox, document.root.geographic_bbox);
    }

    #[test]
    fn own_attributes_are_not_replaced() {
        let document = CapabilitiesDocument::parse(DOCUMENT).unwrap();
        let lakes = layer(&document, "lakes");
        assert_eq!(lakes.opaque, Some(true));
        assert_eq!(lakes.geographic_bbox, Some([-100.0, 45.0, -90.0, 50.0]));
        assert_eq!(lakes.max_scale_denominator, None);
    }

    #[test]
    fn styles_and_crs_are_united() {
        let document = CapabilitiesDocument::parse(DOCUMENT).unwrap();
        let rivers = layer(&document, "rivers");
        assert_eq!(rivers.crs, vec!["EPSG:3978", "EPSG:4326", "EPSG:3857"]);

        let style_names: Vec<&str> = rivers.styles.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(style_names, vec!["blue", "default"]);
        assert_eq!(rivers.styles[1].title.as_deref(), Some("Own default"));

        let streams = layer(&document, "streams");
        assert_eq!(streams.crs, rivers.crs);
        assert_eq!(streams.styles, rivers.styles);

        let lakes = layer(&document, "lakes");
        assert_eq!(lakes.crs, vec!["EPSG:4326", "EPSG:3857"]);
    }

    #[test]
    fn find_layer_returns_path() {
        let document = CapabilitiesDocument::parse(DOCUMENT).unwrap();
        let (streams, path) = document.find_layer("streams").unwrap();
        assert_eq!(streams.title.as_deref(), Some("Streams"));
        assert_eq!(
            path,
            vec![PathStep::Object, PathStep::Index(0), PathStep::Index(0)]
        );

        let (_, path) = document.find_layer("lakes").unwrap();
        assert_eq!(path, vec![PathStep::Object, PathStep::Index(1)]);

        assert!(document.find_layer("roads").is_none());
    }

    #[test]
    fn merge_layer_is_idempotent() {
        let mut master = CapabilitiesDocument::parse(DOCUMENT).unwrap();
        let streams_layer = master.root.layers[0].layers.remove(0);
        let source = CapabilitiesDocument::parse(DOCUMENT).unwrap();
        assert!(master.find_layer("streams").is_none());

        assert!(master.merge_layer(&source, "streams"));
        let (merged, path) = master.find_layer("streams").unwrap();
        assert_eq!(merged, &streams_layer);
        assert_eq!(
            path,
            vec![PathStep::Object, PathStep::Index(0), PathStep::Index(0)]
        );

        let before = master.clone();
        assert!(!master.merge_layer(&source, "streams"));
        assert_eq!(master, before);
        assert!(!master.merge_layer(&source, "roads"));
    }

    #[test]
    fn version_1_1_1_elements() {
        let document = CapabilitiesDocument::parse(
            r#"<WMT_MS_Capabilities version="1.1.1">
              <Capability>
                <Layer>
                  <SRS>EPSG:4326 EPSG:900913</SRS>
                  <LatLonBoundingBox minx="-10" miny="-5" maxx="10" maxy="5"/>
                  <ScaleHint min="0.028" max="0.28"/>
                  <Dimension name="time" units="ISO8601"/>
                  <Extent name="time" default="2021">2020,2021</Extent>
                  <Layer queryable="true"><Name>a</Name></Layer>
                  <Layer>
                    <Name>b</Name>
                    <ScaleHint min="0.028" max="0.28"/>
                    <MaxScaleDenominator>5000</MaxScaleDenominator>
                  </Layer>
                </Layer>
              </Capability>
            </WMT_MS_Capabilities>"#,
        )
        .unwrap();

        let a = layer(&document, "a");
        assert_eq!(a.crs, vec!["EPSG:4326", "EPSG:900913"]);
        assert_eq!(a.geographic_bbox, Some([-10.0, -5.0, 10.0, 5.0]));
        assert_abs_diff_eq!(a.min_scale_denominator.unwrap(), 70.7107, epsilon = 1e-3);
        assert_abs_diff_eq!(a.max_scale_denominator.unwrap(), 707.1068, epsilon = 1e-3);
        assert!(a.is_queryable());
        assert_eq!(layer(&document, "b").max_scale_denominator, Some(5000.0));
        let time = a.time_dimension().unwrap();
        assert_eq!(time.default.as_deref(), Some("2021"));
        assert_eq!(time.values.as_deref(), Some("2020,2021"));
    }

    #[test]
    fn rejects_other_documents() {
        assert!(CapabilitiesDocument::parse("<html><body/></html>").is_err());
        assert!(CapabilitiesDocument::parse("<WMS_Capabilities/>").is_err());
    }
}
