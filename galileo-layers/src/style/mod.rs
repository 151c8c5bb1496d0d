//! Internal style table of a layer and its extraction from service-native symbology.
//!
//! [`StyleDefinition`] stores at most one [`StyleSettings`] per [`GeometryKind`]. Extractors fill it
//! in rule order and never replace a kind that is already set, so the first rule for a geometry kind
//! always wins.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::color::Color;

pub mod esri;
pub mod sld;

/// Kind of geometry a style applies to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GeometryKind {
    /// Points and multipoints.
    Point,
    /// Lines and multilines.
    LineString,
    /// Polygons and multipolygons.
    Polygon,
}

impl GeometryKind {
    /// Geometry kind of a GeoPackage geometry type name (`POINT`, `MULTILINESTRING` etc).
    pub fn from_gpkg_type(type_name: &str) -> Option<Self> {
        match type_name.to_ascii_uppercase().trim_start_matches("MULTI") {
            "POINT" => Some(Self::Point),
            "LINESTRING" | "CURVE" => Some(Self::LineString),
            "POLYGON" | "SURFACE" => Some(Self::Polygon),
            _ => None,
        }
    }

    /// Geometry kind of an ArcGIS geometry type (`esriGeometryPoint` etc).
    pub fn from_esri_type(type_name: &str) -> Option<Self> {
        match type_name {
            "esriGeometryPoint" | "esriGeometryMultipoint" => Some(Self::Point),
            "esriGeometryPolyline" | "esriGeometryLine" => Some(Self::LineString),
            "esriGeometryPolygon" | "esriGeometryEnvelope" => Some(Self::Polygon),
            _ => None,
        }
    }
}

/// Style of a layer: one entry per geometry kind.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDefinition {
    styles: BTreeMap<GeometryKind, StyleSettings>,
}

impl StyleDefinition {
    /// Creates an empty style.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the style for the geometry kind unless it is already set. Returns true if the style was
    /// set.
    pub fn set_if_absent(&mut self, kind: GeometryKind, settings: StyleSettings) -> bool {
        if self.styles.contains_key(&kind) {
            log::trace!("Style for {kind:?} is already set, ignoring the new one");
            return false;
        }

        self.styles.insert(kind, settings);
        true
    }

    /// Adds every kind of `other` that is not set in `self`.
    pub fn merge_missing(&mut self, other: &StyleDefinition) {
        for (kind, settings) in &other.styles {
            self.set_if_absent(*kind, settings.clone());
        }
    }

    /// Style for the given geometry kind.
    pub fn get(&self, kind: GeometryKind) -> Option<&StyleSettings> {
        self.styles.get(&kind)
    }

    /// Iterates over the set styles in geometry kind order.
    pub fn iter(&self) -> impl Iterator<Item = (GeometryKind, &StyleSettings)> {
        self.styles.iter().map(|(kind, settings)| (*kind, settings))
    }

    /// Returns true if no style is set.
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

/// Style for one geometry kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StyleSettings {
    /// All features are drawn with the same symbol.
    Simple {
        /// Legend label.
        label: String,
        /// Symbol to draw the features with.
        settings: SymbolSettings,
    },
    /// Symbol is selected by the values of the given fields.
    UniqueValue {
        /// Fields the values are taken from.
        fields: Vec<String>,
        /// Symbol for features that match no value.
        default_settings: Option<SymbolSettings>,
        /// Symbols for value combinations.
        infos: Vec<UniqueValueInfo>,
    },
    /// Symbol is selected by the range the value of the field falls into.
    ClassBreaks {
        /// Field the value is taken from.
        field: String,
        /// Symbol for features outside of all ranges.
        default_settings: Option<SymbolSettings>,
        /// Symbols for ranges.
        infos: Vec<ClassBreakInfo>,
    },
}

/// Symbol for a combination of field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniqueValueInfo {
    /// Legend label.
    pub label: String,
    /// Values, one per field of the style.
    pub values: Vec<String>,
    /// Symbol.
    pub settings: SymbolSettings,
}

/// Symbol for a range of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassBreakInfo {
    /// Legend label.
    pub label: String,
    /// Lower bound (inclusive).
    pub min: Option<f64>,
    /// Upper bound (inclusive).
    pub max: f64,
    /// Symbol.
    pub settings: SymbolSettings,
}

/// Symbol drawing a single feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SymbolSettings {
    /// Named mark for points.
    Mark(MarkSymbol),
    /// Raster icon for points.
    Icon(IconSymbol),
    /// Line symbol.
    Line(LineSymbol),
    /// Polygon fill.
    Fill(FillSymbol),
}

/// Shapes of a point mark.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkShape {
    /// Circle.
    Circle,
    /// Square rotated by 45 degrees.
    Diamond,
    /// Plus sign.
    Cross,
    /// Square.
    Square,
    /// Triangle.
    Triangle,
    /// Diagonal cross.
    X,
}

/// Fill patterns of a polygon.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FillPattern {
    /// Fill with solid color.
    #[default]
    Solid,
    /// Transparent fill.
    Null,
    /// Vertical lines.
    Vertical,
    /// Horizontal lines.
    Horizontal,
    /// Lines from the bottom left to the top right.
    ForwardDiagonal,
    /// Lines from the top left to the bottom right.
    BackwardDiagonal,
    /// Horizontal and vertical lines.
    Cross,
    /// Both diagonal lines.
    DiagonalCross,
}

/// Dash patterns of a line.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LinePattern {
    /// Continuous line.
    #[default]
    Solid,
    /// Dashes.
    Dash,
    /// Dots.
    Dot,
    /// Dash followed by a dot.
    DashDot,
    /// Invisible line.
    Null,
}

/// Outline of a mark or a polygon.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    /// Line color.
    pub color: Option<Color>,
    /// Line width in pixels.
    pub width: Option<f64>,
    /// Dash pattern.
    pub pattern: Option<LinePattern>,
}

impl Stroke {
    /// Returns true if no property is set.
    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.width.is_none() && self.pattern.is_none()
    }
}

/// Named mark symbol of a point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkSymbol {
    /// Shape of the mark.
    pub shape: MarkShape,
    /// Fill color.
    pub color: Option<Color>,
    /// Size in pixels.
    pub size: Option<f64>,
    /// Rotation in degrees.
    pub rotation: Option<f64>,
    /// Anchor offset in pixels.
    pub offset: Option<[f64; 2]>,
    /// Outline.
    pub stroke: Option<Stroke>,
}

impl MarkSymbol {
    /// Creates a mark without optional properties.
    pub fn new(shape: MarkShape) -> Self {
        Self {
            shape,
            color: None,
            size: None,
            rotation: None,
            offset: None,
            stroke: None,
        }
    }
}

/// Embedded raster icon of a point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IconSymbol {
    /// Mime type of the image.
    pub mime_type: String,
    /// Base64 encoded image data.
    pub src: String,
    /// Size in pixels.
    pub size: Option<f64>,
    /// Rotation in degrees.
    pub rotation: Option<f64>,
    /// Anchor offset in pixels.
    pub offset: Option<[f64; 2]>,
    /// Opacity in range `[0.0, 1.0]`.
    pub opacity: Option<f64>,
}

/// Line symbol.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSymbol {
    /// Line properties.
    pub stroke: Stroke,
}

/// Polygon fill symbol.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillSymbol {
    /// Fill color.
    pub color: Option<Color>,
    /// Fill pattern.
    pub pattern: FillPattern,
    /// Outline.
    pub stroke: Stroke,
}
