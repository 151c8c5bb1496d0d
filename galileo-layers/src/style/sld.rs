//! Extraction of styles from Styled Layer Descriptor (SLD) documents, as stored in the
//! `layer_styles` table of GeoPackages.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::{
    FillPattern, FillSymbol, GeometryKind, IconSymbol, LinePattern, LineSymbol, MarkShape,
    MarkSymbol, StyleDefinition, StyleSettings, Stroke, SymbolSettings,
};
use crate::color::Color;
use crate::error::LayerConfigError;
use crate::xml::XmlElement;

/// Symbolizers of an SLD document in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    /// Symbolizers of all rules. Rules that have several symbolizers contribute all of them in their
    /// order.
    pub symbolizers: Vec<Symbolizer>,
}

/// Symbolizer of a single geometry kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbolizer {
    /// Title or name of the rule the symbolizer belongs to.
    pub label: String,
    /// Geometry kind of the symbolizer.
    pub kind: GeometryKind,
    /// `Fill` element of a polygon symbolizer.
    pub fill: Option<SldFill>,
    /// `Stroke` element of a line or polygon symbolizer.
    pub stroke: Option<SldStroke>,
    /// `Graphic` element of a point symbolizer.
    pub graphic: Option<SldGraphic>,
}

/// `Fill` element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SldFill {
    /// Fill color.
    pub color: Option<Color>,
    /// `GraphicFill` element.
    pub graphic_fill: Option<Box<SldGraphic>>,
}

/// `Stroke` element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SldStroke {
    /// Line color.
    pub color: Option<Color>,
    /// Line width.
    pub width: Option<f64>,
    /// Dash array is set.
    pub dashed: bool,
}

/// `Graphic` element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SldGraphic {
    /// Well known name of the mark.
    pub mark_name: Option<String>,
    /// Fill of the mark.
    pub mark_fill: Option<SldFill>,
    /// Stroke of the mark.
    pub mark_stroke: Option<SldStroke>,
    /// Mime type and base64 content of an embedded image.
    pub image: Option<(String, String)>,
    /// Size.
    pub size: Option<f64>,
    /// Rotation.
    pub rotation: Option<f64>,
    /// Opacity.
    pub opacity: Option<f64>,
    /// Displacement.
    pub displacement: Option<[f64; 2]>,
}

fn parse_number(value: Option<&str>) -> Option<f64> {
    value?.trim().parse().ok()
}

/// Value of an element: its text, or the text of an `ogc:Literal` child.
fn element_value(element: &XmlElement) -> Option<&str> {
    let text = element.text.trim();
    if !text.is_empty() {
        return Some(text);
    }

    element.child_text("Literal")
}

fn parameters(element: &XmlElement) -> impl Iterator<Item = (&str, &str)> {
    element
        .children
        .iter()
        .filter(|child| child.name == "CssParameter" || child.name == "SvgParameter")
        .filter_map(|child| Some((child.attr("name")?, element_value(child)?)))
}

fn child_value<'a>(element: &'a XmlElement, name: &str) -> Option<&'a str> {
    element.child(name).and_then(element_value)
}

fn parse_fill(element: &XmlElement) -> SldFill {
    let mut color = None;
    let mut opacity = None;
    for (name, value) in parameters(element) {
        match name {
            "fill" => color = Color::try_from_hex(value),
            "fill-opacity" => opacity = parse_number(Some(value)),
            _ => {}
        }
    }

    SldFill {
        color: apply_opacity(color, opacity),
        graphic_fill: element
            .child("GraphicFill")
            .and_then(|graphic_fill| graphic_fill.child("Graphic"))
            .map(|graphic| Box::new(parse_graphic(graphic))),
    }
}

fn parse_stroke(element: &XmlElement) -> SldStroke {
    let mut stroke = SldStroke::default();
    let mut opacity = None;
    for (name, value) in parameters(element) {
        match name {
            "stroke" => stroke.color = Color::try_from_hex(value),
            "stroke-width" => stroke.width = parse_number(Some(value)),
            "stroke-opacity" => opacity = parse_number(Some(value)),
            "stroke-dasharray" => stroke.dashed = !value.trim().is_empty(),
            _ => {}
        }
    }

    stroke.color = apply_opacity(stroke.color, opacity);
    stroke
}

fn apply_opacity(color: Option<Color>, opacity: Option<f64>) -> Option<Color> {
    match (color, opacity) {
        (Some(color), Some(opacity)) => Some(color.with_opacity(opacity)),
        (color, _) => color,
    }
}

fn parse_graphic(element: &XmlElement) -> SldGraphic {
    let mut graphic = SldGraphic {
        size: parse_number(child_value(element, "Size")),
        rotation: parse_number(child_value(element, "Rotation")),
        opacity: parse_number(child_value(element, "Opacity")),
        ..Default::default()
    };

    if let Some(displacement) = element.child("Displacement") {
        let x = parse_number(child_value(displacement, "DisplacementX"));
        let y = parse_number(child_value(displacement, "DisplacementY"));
        if x.is_some() || y.is_some() {
            graphic.displacement = Some([x.unwrap_or(0.0), y.unwrap_or(0.0)]);
        }
    }

    if let Some(mark) = element.child("Mark") {
        graphic.mark_name = mark.child_text("WellKnownName").map(str::to_string);
        graphic.mark_fill = mark.child("Fill").map(parse_fill);
        graphic.mark_stroke = mark.child("Stroke").map(parse_stroke);
    }

    if let Some(external) = element.child("ExternalGraphic") {
        graphic.image = parse_external_graphic(external);
    }

    graphic
}

fn parse_external_graphic(element: &XmlElement) -> Option<(String, String)> {
    let format = element.child_text("Format").unwrap_or("image/png");

    if let Some(inline) = element.child("InlineContent") {
        let content: String = inline.text.split_whitespace().collect();
        if STANDARD.decode(&content).is_ok() {
            return Some((format.to_string(), content));
        }

        log::warn!("Inline content of an external graphic is not valid base64, ignoring it");
        return None;
    }

    // Images can also be embedded as data urls: `data:image/png;base64,...`
    let href = element.child("OnlineResource")?.attr("href")?;
    let (header, content) = href.strip_prefix("data:")?.split_once(',')?;
    let mime_type = header.strip_suffix(";base64")?;
    STANDARD.decode(content).ok()?;
    Some((mime_type.to_string(), content.to_string()))
}

impl RuleSet {
    /// Reads symbolizers of all rules in the SLD document.
    pub fn parse(sld: &str) -> Result<Self, LayerConfigError> {
        let root = XmlElement::parse(sld)?;
        let mut rules = vec![];
        root.find_all("Rule", &mut rules);

        let mut symbolizers = vec![];
        for rule in rules {
            let label = rule
                .child("Description")
                .and_then(|description| description.child_text("Title"))
                .or_else(|| rule.child_text("Title"))
                .or_else(|| rule.child_text("Name"))
                .unwrap_or_default()
                .to_string();

            for element in &rule.children {
                let kind = match element.name.as_str() {
                    "PointSymbolizer" => GeometryKind::Point,
                    "LineSymbolizer" => GeometryKind::LineString,
                    "PolygonSymbolizer" => GeometryKind::Polygon,
                    _ => continue,
                };

                symbolizers.push(Symbolizer {
                    label: label.clone(),
                    kind,
                    fill: element.child("Fill").map(parse_fill),
                    stroke: element.child("Stroke").map(parse_stroke),
                    graphic: element.child("Graphic").map(parse_graphic),
                });
            }
        }

        Ok(Self { symbolizers })
    }
}

/// Maps a well known name of a graphic fill mark to a fill pattern.
pub fn fill_pattern(well_known_name: Option<&str>) -> FillPattern {
    let Some(name) = well_known_name else {
        return FillPattern::Solid;
    };

    match name.trim().trim_start_matches("shape://").to_ascii_lowercase().as_str() {
        "vertline" => FillPattern::Vertical,
        "horline" => FillPattern::Horizontal,
        "slash" => FillPattern::ForwardDiagonal,
        "backslash" => FillPattern::BackwardDiagonal,
        "plus" => FillPattern::Cross,
        "times" => FillPattern::DiagonalCross,
        _ => FillPattern::Solid,
    }
}

/// Maps a well known name of a point mark to a mark shape.
pub fn mark_shape(well_known_name: Option<&str>) -> Option<MarkShape> {
    let name = well_known_name?.trim().trim_start_matches("shape://");
    match name.to_ascii_lowercase().as_str() {
        "circle" | "dot" => Some(MarkShape::Circle),
        "diamond" => Some(MarkShape::Diamond),
        "cross" | "plus" => Some(MarkShape::Cross),
        "square" => Some(MarkShape::Square),
        "triangle" => Some(MarkShape::Triangle),
        "x" | "times" => Some(MarkShape::X),
        _ => None,
    }
}

fn to_stroke(stroke: &SldStroke) -> Stroke {
    Stroke {
        color: stroke.color,
        width: stroke.width,
        pattern: stroke.dashed.then_some(LinePattern::Dash),
    }
}

fn polygon_symbol(symbolizer: &Symbolizer) -> SymbolSettings {
    let fill = symbolizer.fill.as_ref();
    let graphic_fill = fill.and_then(|fill| fill.graphic_fill.as_deref());
    let pattern = fill_pattern(graphic_fill.and_then(|graphic| graphic.mark_name.as_deref()));

    // Hatch color of a pattern fill is the stroke of the pattern mark.
    let pattern_color = graphic_fill.and_then(|graphic| {
        graphic
            .mark_stroke
            .as_ref()
            .and_then(|stroke| stroke.color)
            .or_else(|| graphic.mark_fill.as_ref().and_then(|fill| fill.color))
    });

    SymbolSettings::Fill(FillSymbol {
        color: fill.and_then(|fill| fill.color).or(pattern_color),
        pattern,
        stroke: symbolizer.stroke.as_ref().map(to_stroke).unwrap_or_default(),
    })
}

fn line_symbol(symbolizer: &Symbolizer) -> SymbolSettings {
    SymbolSettings::Line(LineSymbol {
        stroke: symbolizer.stroke.as_ref().map(to_stroke).unwrap_or_default(),
    })
}

/// A symbolizer without a `Graphic` element is a plain circle mark.
fn point_symbol(symbolizer: &Symbolizer) -> SymbolSettings {
    let default_graphic = SldGraphic::default();
    let graphic = symbolizer.graphic.as_ref().unwrap_or(&default_graphic);

    if let Some((mime_type, src)) = &graphic.image {
        return SymbolSettings::Icon(IconSymbol {
            mime_type: mime_type.clone(),
            src: src.clone(),
            size: graphic.size,
            rotation: graphic.rotation,
            offset: graphic.displacement,
            opacity: graphic.opacity,
        });
    }

    let shape = match &graphic.mark_name {
        Some(name) => mark_shape(Some(name)).unwrap_or_else(|| {
            log::warn!("Unknown mark {name}, using circle");
            MarkShape::Circle
        }),
        None => MarkShape::Circle,
    };

    SymbolSettings::Mark(MarkSymbol {
        shape,
        color: graphic.mark_fill.as_ref().and_then(|fill| fill.color),
        size: graphic.size,
        rotation: graphic.rotation,
        offset: graphic.displacement,
        stroke: graphic
            .mark_stroke
            .as_ref()
            .map(to_stroke)
            .filter(|stroke| !stroke.is_empty()),
    })
}

/// Converts the rule set into the internal style table. For every geometry kind only the first
/// symbolizer is used.
pub fn extract_style(rules: &RuleSet) -> StyleDefinition {
    let mut style = StyleDefinition::new();
    for symbolizer in &rules.symbolizers {
        if style.get(symbolizer.kind).is_some() {
            continue;
        }

        let settings = match symbolizer.kind {
            GeometryKind::Polygon => polygon_symbol(symbolizer),
            GeometryKind::LineString => line_symbol(symbolizer),
            GeometryKind::Point => point_symbol(symbolizer),
        };

        style.set_if_absent(
            symbolizer.kind,
            StyleSettings::Simple {
                label: symbolizer.label.clone(),
                settings,
            },
        );
    }

    style
}

/// Parses the SLD document and extracts the style from it.
pub fn style_from_sld(sld: &str) -> Result<StyleDefinition, LayerConfigError> {
    Ok(extract_style(&RuleSet::parse(sld)?))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use assert_matches::assert_matches;

    use super::*;

    fn sld(rules: &str) -> String {
        format!(
            r#"<StyledLayerDescriptor xmlns="http://www.opengis.net/sld" xmlns:se="http://www.opengis.net/se" xmlns:ogc="http://www.opengis.net/ogc">
                <NamedLayer><UserStyle><se:FeatureTypeStyle>{rules}</se:FeatureTypeStyle></UserStyle></NamedLayer>
            </StyledLayerDescriptor>"#
        )
    }

    fn simple(style: &StyleDefinition, kind: GeometryKind) -> &SymbolSettings {
        match style.get(kind) {
            Some(StyleSettings::Simple { settings, .. }) => settings,
            other => panic!("unexpected style {other:?}"),
        }
    }

    #[test]
    fn first_point_rule_wins() {
        let document = sld(
            r#"<se:Rule><se:Name>first</se:Name><se:PointSymbolizer><se:Graphic>
                    <se:Mark><se:WellKnownName>triangle</se:WellKnownName></se:Mark><se:Size>4</se:Size>
               </se:Graphic></se:PointSymbolizer></se:Rule>
               <se:Rule><se:Name>better</se:Name><se:PointSymbolizer><se:Graphic>
                    <se:Mark><se:WellKnownName>circle</se:WellKnownName>
                        <se:Fill><se:SvgParameter name="fill">#FF0000</se:SvgParameter></se:Fill></se:Mark>
                    <se:Size>12</se:Size><se:Rotation>45</se:Rotation>
               </se:Graphic></se:PointSymbolizer></se:Rule>"#,
        );

        let style = style_from_sld(&document).unwrap();
        assert_eq!(style.iter().count(), 1);
        assert_matches!(
            style.get(GeometryKind::Point),
            Some(StyleSettings::Simple { label, settings: SymbolSettings::Mark(mark) })
                if label == "first" && mark.shape == MarkShape::Triangle && mark.size == Some(4.0)
                    && mark.color.is_none() && mark.rotation.is_none()
        );
    }

    #[test]
    fn point_symbolizer_without_graphic_claims_the_kind() {
        let document = sld(
            r#"<se:Rule><se:Name>first</se:Name><se:PointSymbolizer/></se:Rule>
               <se:Rule><se:Name>second</se:Name><se:PointSymbolizer><se:Graphic>
                    <se:Mark><se:WellKnownName>square</se:WellKnownName></se:Mark>
               </se:Graphic></se:PointSymbolizer></se:Rule>"#,
        );

        let style = style_from_sld(&document).unwrap();
        assert_matches!(
            style.get(GeometryKind::Point),
            Some(StyleSettings::Simple { label, settings: SymbolSettings::Mark(mark) })
                if label == "first" && *mark == MarkSymbol::new(MarkShape::Circle)
        );
    }

    #[test]
    fn polygon_with_pattern_fill() {
        let document = sld(
            r#"<se:Rule><se:PolygonSymbolizer>
                <se:Fill><se:GraphicFill><se:Graphic><se:Mark>
                    <se:WellKnownName>shape://backslash</se:WellKnownName>
                    <se:Stroke><se:SvgParameter name="stroke">#00FF00</se:SvgParameter></se:Stroke>
                </se:Mark></se:Graphic></se:GraphicFill></se:Fill>
                <se:Stroke>
                    <se:SvgParameter name="stroke">#0000FF</se:SvgParameter>
                    <se:SvgParameter name="stroke-width">2.5</se:SvgParameter>
                </se:Stroke>
            </se:PolygonSymbolizer></se:Rule>"#,
        );

        let style = style_from_sld(&document).unwrap();
        let SymbolSettings::Fill(fill) = simple(&style, GeometryKind::Polygon) else {
            panic!("expected fill");
        };
        assert_eq!(fill.pattern, FillPattern::BackwardDiagonal);
        assert_eq!(fill.color, Some(Color::rgba(0, 255, 0, 255)));
        assert_eq!(fill.stroke.color, Some(Color::rgba(0, 0, 255, 255)));
        assert_abs_diff_eq!(fill.stroke.width.unwrap(), 2.5);
    }

    #[test]
    fn polygon_solid_fill_with_opacity() {
        let document = sld(
            r#"<Rule><PolygonSymbolizer><Fill>
                <CssParameter name="fill">#102030</CssParameter>
                <CssParameter name="fill-opacity"><ogc:Literal>0.5</ogc:Literal></CssParameter>
            </Fill></PolygonSymbolizer></Rule>"#,
        );

        let style = style_from_sld(&document).unwrap();
        let SymbolSettings::Fill(fill) = simple(&style, GeometryKind::Polygon) else {
            panic!("expected fill");
        };
        assert_eq!(fill.pattern, FillPattern::Solid);
        assert_eq!(fill.color, Some(Color::rgba(16, 32, 48, 128)));
        assert!(fill.stroke.is_empty());
    }

    #[test]
    fn line_outline_only() {
        let document = sld(
            r#"<Rule><LineSymbolizer><Stroke>
                <CssParameter name="stroke">#000000</CssParameter>
                <CssParameter name="stroke-dasharray">4 2</CssParameter>
            </Stroke></LineSymbolizer></Rule>"#,
        );

        let style = style_from_sld(&document).unwrap();
        let SymbolSettings::Line(line) = simple(&style, GeometryKind::LineString) else {
            panic!("expected line");
        };
        assert_eq!(line.stroke.color, Some(Color::BLACK));
        assert_eq!(line.stroke.width, None);
        assert_eq!(line.stroke.pattern, Some(LinePattern::Dash));
    }

    #[test]
    fn point_icon() {
        let document = sld(
            r#"<Rule><PointSymbolizer><Graphic>
                <ExternalGraphic>
                    <InlineContent encoding="base64">aGVs
                    bG8=</InlineContent>
                    <Format>image/svg+xml</Format>
                </ExternalGraphic>
                <Size>16</Size>
                <Displacement><DisplacementX>1</DisplacementX><DisplacementY>-2</DisplacementY></Displacement>
            </Graphic></PointSymbolizer></Rule>"#,
        );

        let style = style_from_sld(&document).unwrap();
        let SymbolSettings::Icon(icon) = simple(&style, GeometryKind::Point) else {
            panic!("expected icon");
        };
        assert_eq!(icon.mime_type, "image/svg+xml");
        assert_eq!(icon.src, "aGVsbG8=");
        assert_eq!(icon.size, Some(16.0));
        assert_eq!(icon.offset, Some([1.0, -2.0]));
    }

    #[test]
    fn vocabularies() {
        let patterns: Vec<FillPattern> = [
            "shape://vertline",
            "shape://horline",
            "shape://slash",
            "shape://backslash",
            "shape://plus",
            "shape://times",
            "shape://dot",
        ]
        .into_iter()
        .map(|name| fill_pattern(Some(name)))
        .collect();
        assert_eq!(
            patterns,
            vec![
                FillPattern::Vertical,
                FillPattern::Horizontal,
                FillPattern::ForwardDiagonal,
                FillPattern::BackwardDiagonal,
                FillPattern::Cross,
                FillPattern::DiagonalCross,
                FillPattern::Solid,
            ]
        );
        assert_eq!(fill_pattern(None), FillPattern::Solid);

        assert_eq!(mark_shape(Some("X")), Some(MarkShape::X));
        assert_eq!(mark_shape(Some("diamond")), Some(MarkShape::Diamond));
        assert_eq!(mark_shape(Some("star")), None);
    }

    #[test]
    fn empty_rule_set() {
        let style = style_from_sld(&sld("")).unwrap();
        assert!(style.is_empty());
    }
}
