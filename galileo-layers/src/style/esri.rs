//! Conversion of ArcGIS renderers (`drawingInfo.renderer`) into internal styles.

use serde::Deserialize;
use serde_json::Value;

use super::{
    ClassBreakInfo, FillPattern, FillSymbol, GeometryKind, IconSymbol, LinePattern, LineSymbol,
    MarkShape, MarkSymbol, StyleDefinition, StyleSettings, Stroke, SymbolSettings,
    UniqueValueInfo,
};
use crate::color::Color;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Renderer {
    #[serde(rename = "simple")]
    Simple {
        symbol: Symbol,
        #[serde(default)]
        label: String,
    },
    #[serde(rename = "uniqueValue", rename_all = "camelCase")]
    UniqueValue {
        field1: String,
        field2: Option<String>,
        field3: Option<String>,
        field_delimiter: Option<String>,
        default_symbol: Option<Symbol>,
        #[serde(default)]
        unique_value_infos: Vec<RendererUniqueValue>,
    },
    #[serde(rename = "classBreaks", rename_all = "camelCase")]
    ClassBreaks {
        field: String,
        min_value: Option<f64>,
        default_symbol: Option<Symbol>,
        #[serde(default)]
        class_break_infos: Vec<RendererClassBreak>,
    },
}

#[derive(Debug, Deserialize)]
struct RendererUniqueValue {
    value: Value,
    #[serde(default)]
    label: String,
    symbol: Symbol,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RendererClassBreak {
    class_min_value: Option<f64>,
    class_max_value: f64,
    #[serde(default)]
    label: String,
    symbol: Symbol,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Symbol {
    #[serde(rename = "esriSMS")]
    Marker {
        style: Option<String>,
        color: Option<Vec<Value>>,
        size: Option<f64>,
        angle: Option<f64>,
        xoffset: Option<f64>,
        yoffset: Option<f64>,
        outline: Option<LineProperties>,
    },
    #[serde(rename = "esriPMS", rename_all = "camelCase")]
    Picture {
        image_data: String,
        content_type: Option<String>,
        width: Option<f64>,
        angle: Option<f64>,
        xoffset: Option<f64>,
        yoffset: Option<f64>,
    },
    #[serde(rename = "esriSLS")]
    Line(LineProperties),
    #[serde(rename = "esriSFS")]
    Fill {
        style: Option<String>,
        color: Option<Vec<Value>>,
        outline: Option<LineProperties>,
    },
}

#[derive(Debug, Deserialize)]
struct LineProperties {
    style: Option<String>,
    color: Option<Vec<Value>>,
    width: Option<f64>,
}

fn color(channels: &Option<Vec<Value>>) -> Option<Color> {
    channels
        .as_deref()
        .and_then(Color::try_from_channels)
}

fn offset(x: Option<f64>, y: Option<f64>) -> Option<[f64; 2]> {
    (x.is_some() || y.is_some()).then(|| [x.unwrap_or(0.0), y.unwrap_or(0.0)])
}

fn line_pattern(style: Option<&str>) -> Option<LinePattern> {
    Some(match style? {
        "esriSLSSolid" => LinePattern::Solid,
        "esriSLSDash" | "esriSLSLongDash" | "esriSLSShortDash" => LinePattern::Dash,
        "esriSLSDot" | "esriSLSShortDot" => LinePattern::Dot,
        "esriSLSDashDot" | "esriSLSDashDotDot" | "esriSLSShortDashDot" => LinePattern::DashDot,
        "esriSLSNull" => LinePattern::Null,
        _ => return None,
    })
}

fn stroke(line: &LineProperties) -> Stroke {
    Stroke {
        color: color(&line.color),
        width: line.width,
        pattern: line_pattern(line.style.as_deref()),
    }
}

/// Maps an `esriSMS` style to a mark shape.
pub fn marker_shape(style: Option<&str>) -> MarkShape {
    match style {
        Some("esriSMSDiamond") => MarkShape::Diamond,
        Some("esriSMSCross") => MarkShape::Cross,
        Some("esriSMSSquare") => MarkShape::Square,
        Some("esriSMSTriangle") => MarkShape::Triangle,
        Some("esriSMSX") => MarkShape::X,
        _ => MarkShape::Circle,
    }
}

/// Maps an `esriSFS` style to a fill pattern.
pub fn fill_pattern(style: Option<&str>) -> FillPattern {
    match style {
        Some("esriSFSNull") => FillPattern::Null,
        Some("esriSFSVertical") => FillPattern::Vertical,
        Some("esriSFSHorizontal") => FillPattern::Horizontal,
        Some("esriSFSForwardDiagonal") => FillPattern::ForwardDiagonal,
        Some("esriSFSBackwardDiagonal") => FillPattern::BackwardDiagonal,
        Some("esriSFSCross") => FillPattern::Cross,
        Some("esriSFSDiagonalCross") => FillPattern::DiagonalCross,
        _ => FillPattern::Solid,
    }
}

impl Symbol {
    fn settings(&self) -> SymbolSettings {
        match self {
            Symbol::Marker {
                style,
                color: fill,
                size,
                angle,
                xoffset,
                yoffset,
                outline,
            } => SymbolSettings::Mark(MarkSymbol {
                shape: marker_shape(style.as_deref()),
                color: color(fill),
                size: *size,
                rotation: *angle,
                offset: offset(*xoffset, *yoffset),
                stroke: outline.as_ref().map(stroke),
            }),
            Symbol::Picture {
                image_data,
                content_type,
                width,
                angle,
                xoffset,
                yoffset,
            } => SymbolSettings::Icon(IconSymbol {
                mime_type: content_type
                    .clone()
                    .unwrap_or_else(|| "image/png".to_string()),
                src: image_data.clone(),
                size: *width,
                rotation: *angle,
                offset: offset(*xoffset, *yoffset),
                opacity: None,
            }),
            Symbol::Line(line) => SymbolSettings::Line(LineSymbol {
                stroke: stroke(line),
            }),
            Symbol::Fill {
                style,
                color: fill,
                outline,
            } => SymbolSettings::Fill(FillSymbol {
                color: color(fill),
                pattern: fill_pattern(style.as_deref()),
                stroke: outline.as_ref().map(stroke).unwrap_or_default(),
            }),
        }
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(value) => value.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Converts an ArcGIS renderer into style settings. Returns `None` for renderer kinds that cannot
/// be represented.
pub fn renderer_settings(renderer: &Value) -> Option<StyleSettings> {
    let renderer: Renderer = match serde_json::from_value(renderer.clone()) {
        Ok(renderer) => renderer,
        Err(error) => {
            log::warn!("Unsupported renderer: {error}");
            return None;
        }
    };

    let settings = match renderer {
        Renderer::Simple { symbol, label } => StyleSettings::Simple {
            label,
            settings: symbol.settings(),
        },
        Renderer::UniqueValue {
            field1,
            field2,
            field3,
            field_delimiter,
            default_symbol,
            unique_value_infos,
        } => {
            let fields: Vec<String> = [Some(field1), field2, field3]
                .into_iter()
                .flatten()
                .collect();
            let delimiter = field_delimiter.unwrap_or_else(|| ",".to_string());
            let infos = unique_value_infos
                .iter()
                .map(|info| {
                    let value = value_to_string(&info.value);
                    let values = if fields.len() > 1 {
                        value
                            .split(delimiter.as_str())
                            .map(|v| v.trim().to_string())
                            .collect()
                    } else {
                        vec![value]
                    };

                    UniqueValueInfo {
                        label: info.label.clone(),
                        values,
                        settings: info.symbol.settings(),
                    }
                })
                .collect();

            StyleSettings::UniqueValue {
                fields,
                default_settings: default_symbol.as_ref().map(Symbol::settings),
                infos,
            }
        }
        Renderer::ClassBreaks {
            field,
            min_value,
            default_symbol,
            class_break_infos,
        } => {
            let mut previous_max = min_value;
            let infos = class_break_infos
                .iter()
                .map(|info| {
                    let min = info.class_min_value.or(previous_max);
                    previous_max = Some(info.class_max_value);
                    ClassBreakInfo {
                        label: info.label.clone(),
                        min,
                        max: info.class_max_value,
                        settings: info.symbol.settings(),
                    }
                })
                .collect();

            StyleSettings::ClassBreaks {
                field,
                default_settings: default_symbol.as_ref().map(Symbol::settings),
                infos,
            }
        }
    };

    Some(settings)
}

/// Creates a style for the layer of the given geometry kind from its renderer.
pub fn style_from_renderer(renderer: &Value, kind: GeometryKind) -> StyleDefinition {
    let mut style = StyleDefinition::new();
    if let Some(settings) = renderer_settings(renderer) {
        style.set_if_absent(kind, settings);
    }

    style
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn simple_marker() {
        let renderer = json!({
            "type": "simple",
            "label": "Stations",
            "symbol": {
                "type": "esriSMS",
                "style": "esriSMSDiamond",
                "color": [255, 0, 0, 255],
                "size": 8,
                "angle": 0,
                "xoffset": 0,
                "yoffset": 0,
                "outline": {"color": [0, 0, 0, 255], "width": 1}
            }
        });

        let style = style_from_renderer(&renderer, GeometryKind::Point);
        assert_matches!(
            style.get(GeometryKind::Point),
            Some(StyleSettings::Simple { label, settings: SymbolSettings::Mark(mark) })
                if label == "Stations"
                    && mark.shape == MarkShape::Diamond
                    && mark.color == Some(Color::rgba(255, 0, 0, 255))
                    && mark.offset == Some([0.0, 0.0])
                    && mark.stroke.as_ref().and_then(|s| s.width) == Some(1.0)
        );
    }

    #[test]
    fn unique_values_with_several_fields() {
        let renderer = json!({
            "type": "uniqueValue",
            "field1": "kind",
            "field2": "status",
            "fieldDelimiter": ", ",
            "uniqueValueInfos": [
                {"value": "road, open", "label": "Open road", "symbol": {"type": "esriSLS", "style": "esriSLSDash", "color": [1, 2, 3], "width": 2}}
            ]
        });

        let settings = renderer_settings(&renderer).unwrap();
        let StyleSettings::UniqueValue { fields, default_settings, infos } = settings else {
            panic!("expected unique value style");
        };
        assert_eq!(fields, vec!["kind", "status"]);
        assert!(default_settings.is_none());
        assert_eq!(infos[0].values, vec!["road", "open"]);
        assert_matches!(
            &infos[0].settings,
            SymbolSettings::Line(LineSymbol { stroke }) if stroke.pattern == Some(LinePattern::Dash)
        );
    }

    #[test]
    fn class_breaks_chain_bounds() {
        let fill = json!({"type": "esriSFS", "style": "esriSFSCross", "color": [0, 0, 0, 0]});
        let renderer = json!({
            "type": "classBreaks",
            "field": "population",
            "minValue": 0,
            "classBreakInfos": [
                {"classMaxValue": 10, "symbol": fill},
                {"classMaxValue": 100, "symbol": fill}
            ]
        });

        let StyleSettings::ClassBreaks { field, infos, .. } = renderer_settings(&renderer).unwrap()
        else {
            panic!("expected class breaks");
        };
        assert_eq!(field, "population");
        let bounds: Vec<(Option<f64>, f64)> = infos.iter().map(|i| (i.min, i.max)).collect();
        assert_eq!(bounds, vec![(Some(0.0), 10.0), (Some(10.0), 100.0)]);
        assert_matches!(
            &infos[0].settings,
            SymbolSettings::Fill(fill) if fill.pattern == FillPattern::Cross
        );
    }

    #[test]
    fn picture_marker() {
        let renderer = json!({
            "type": "simple",
            "symbol": {"type": "esriPMS", "imageData": "aGVsbG8=", "contentType": "image/png", "width": 12}
        });
        assert_matches!(
            renderer_settings(&renderer),
            Some(StyleSettings::Simple { settings: SymbolSettings::Icon(icon), .. })
                if icon.src == "aGVsbG8=" && icon.size == Some(12.0)
        );
    }

    #[test]
    fn unsupported_renderer() {
        let renderer = json!({"type": "heatmap"});
        assert!(renderer_settings(&renderer).is_none());
        assert!(style_from_renderer(&renderer, GeometryKind::Point).is_empty());
    }

    #[test]
    fn fill_patterns() {
        assert_eq!(fill_pattern(Some("esriSFSForwardDiagonal")), FillPattern::ForwardDiagonal);
        assert_eq!(fill_pattern(Some("esriSFSUnknown")), FillPattern::Solid);
        assert_eq!(fill_pattern(None), FillPattern::Solid);
        assert_eq!(marker_shape(Some("esriSMSX")), MarkShape::X);
    }
}
