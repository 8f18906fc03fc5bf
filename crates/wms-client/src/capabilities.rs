//! WMS GetCapabilities document parsing.
//!
//! Reads WMS 1.1.1 (`WMT_MS_Capabilities`) and 1.3.0 (`WMS_Capabilities`)
//! documents with the quick-xml event reader and flattens the layer tree,
//! applying the inheritance rules of the WMS specification:
//! - CRS/SRS and styles are additive (children add to their parent's list)
//! - geographic bounding box, per-CRS bounding boxes and dimensions are
//!   inherited and replaced when the child redeclares them

use std::collections::BTreeMap;

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use ogc_common::time::TimeParseError;
use ogc_common::xml::{attributes, local_name, parse_bool};
use ogc_common::{AxisOrder, BoundingBox, CrsCode, OgcError, OgcResult, TimeDimensionValues};

use crate::version::WmsVersion;

/// Parsed capabilities document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Capabilities {
    pub version: WmsVersion,
    pub service_title: Option<String>,
    pub service_abstract: Option<String>,
    pub get_map_url: Option<String>,
    pub get_feature_info_url: Option<String>,
    pub get_legend_graphic_url: Option<String>,
    pub map_formats: Vec<String>,
    pub info_formats: Vec<String>,
    pub exception_formats: Vec<String>,
    /// All layers in document order, inheritance applied.
    pub layers: Vec<CapabilitiesLayer>,
}

/// A layer as declared by the server, with inherited properties resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapabilitiesLayer {
    /// Only named layers can be requested
    pub name: Option<String>,
    pub title: String,
    pub abstract_text: Option<String>,
    pub queryable: bool,
    pub opaque: bool,
    pub crs: Vec<CrsCode>,
    /// Extent in CRS:84 (lon/lat)
    pub geographic_bbox: Option<BoundingBox>,
    /// Per-CRS extents, always stored in x/y order
    pub bounding_boxes: Vec<(CrsCode, BoundingBox)>,
    pub styles: Vec<StyleInfo>,
    pub dimensions: Vec<DimensionInfo>,
    /// Nesting depth in the layer tree (0 for the root layer)
    pub depth: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleInfo {
    pub name: String,
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub legend: Option<LegendUrl>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegendUrl {
    pub format: Option<String>,
    pub href: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DimensionInfo {
    /// Dimension name as declared (e.g. "time", "elevation")
    pub name: String,
    pub units: Option<String>,
    pub unit_symbol: Option<String>,
    pub default: Option<String>,
    /// Raw extent text (list, interval or both)
    pub values: String,
    pub multiple_values: bool,
    pub nearest_value: bool,
    pub current: bool,
}

impl DimensionInfo {
    pub fn is_time(&self) -> bool {
        self.name.eq_ignore_ascii_case("time")
    }

    pub fn is_elevation(&self) -> bool {
        self.name.eq_ignore_ascii_case("elevation")
    }

    /// Interpret the extent as time values.
    pub fn time_values(&self) -> Result<TimeDimensionValues, TimeParseError> {
        TimeDimensionValues::parse(&self.values)
    }
}

impl Capabilities {
    /// Parse a capabilities document.
    pub fn from_xml(xml: &str) -> OgcResult<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut parser = CapabilitiesParser::default();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let attrs = attributes(&e)?;
                    parser.on_start(local_name(&e), &attrs);
                }
                Ok(Event::Empty(e)) => {
                    let attrs = attributes(&e)?;
                    parser.on_start(local_name(&e), &attrs);
                    parser.on_end();
                }
                Ok(Event::End(_)) => parser.on_end(),
                Ok(Event::Text(t)) => parser.text.push_str(&t.unescape()?),
                Ok(Event::CData(c)) => parser
                    .text
                    .push_str(&String::from_utf8_lossy(&c.into_inner())),
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(OgcError::Xml(format!(
                        "XML parsing error at position {}: {:?}",
                        reader.buffer_position(),
                        e
                    )))
                }
                _ => {}
            }
        }

        parser.finish()
    }

    /// Look up a named layer.
    pub fn layer(&self, name: &str) -> OgcResult<&CapabilitiesLayer> {
        self.layers
            .iter()
            .find(|l| l.name.as_deref() == Some(name))
            .ok_or_else(|| OgcError::LayerNotFound(name.to_string()))
    }

    /// Layers that can be requested by name.
    pub fn named_layers(&self) -> impl Iterator<Item = &CapabilitiesLayer> {
        self.layers.iter().filter(|l| l.name.is_some())
    }

    pub fn supports_map_format(&self, format: &str) -> bool {
        self.map_formats
            .iter()
            .any(|f| f.eq_ignore_ascii_case(format))
    }
}

impl CapabilitiesLayer {
    pub fn supports_crs(&self, crs: &CrsCode) -> bool {
        self.crs.contains(crs)
    }

    pub fn bounding_box_for(&self, crs: &CrsCode) -> Option<BoundingBox> {
        self.bounding_boxes
            .iter()
            .find(|(c, _)| c == crs)
            .map(|(_, b)| *b)
    }

    /// The style the server applies when none is requested: the first one
    /// declared (inherited styles come first).
    pub fn default_style(&self) -> Option<&StyleInfo> {
        self.styles.first()
    }

    pub fn style(&self, name: &str) -> Option<&StyleInfo> {
        self.styles.iter().find(|s| s.name == name)
    }

    pub fn dimension(&self, name: &str) -> Option<&DimensionInfo> {
        self.dimensions
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
    }

    pub fn time_dimension(&self) -> Option<&DimensionInfo> {
        self.dimensions.iter().find(|d| d.is_time())
    }

    pub fn elevation_dimension(&self) -> Option<&DimensionInfo> {
        self.dimensions.iter().find(|d| d.is_elevation())
    }

    /// Inherit from the enclosing layer.
    fn child_of(parent: &CapabilitiesLayer) -> Self {
        Self {
            name: None,
            title: String::new(),
            abstract_text: None,
            queryable: parent.queryable,
            opaque: parent.opaque,
            crs: parent.crs.clone(),
            geographic_bbox: parent.geographic_bbox,
            bounding_boxes: parent.bounding_boxes.clone(),
            styles: parent.styles.clone(),
            dimensions: parent.dimensions.clone(),
            depth: parent.depth + 1,
        }
    }

    fn add_crs(&mut self, crs: CrsCode) {
        if !self.crs.contains(&crs) {
            self.crs.push(crs);
        }
    }

    fn set_bounding_box(&mut self, crs: CrsCode, bbox: BoundingBox) {
        match self.bounding_boxes.iter_mut().find(|(c, _)| *c == crs) {
            Some(entry) => entry.1 = bbox,
            None => self.bounding_boxes.push((crs, bbox)),
        }
    }

    fn set_style(&mut self, style: StyleInfo) {
        match self.styles.iter_mut().find(|s| s.name == style.name) {
            Some(existing) => *existing = style,
            None => self.styles.push(style),
        }
    }
}

/// Which element declared a dimension: 1.3.0 `Dimension` carries the
/// values, 1.1.1 splits the declaration (`Dimension`) and values (`Extent`).
#[derive(Debug, Clone, Copy, PartialEq)]
enum DimensionSource {
    Dimension,
    Extent,
}

#[derive(Default)]
struct CapabilitiesParser {
    caps: Capabilities,
    version_seen: bool,
    path: Vec<String>,
    text: String,
    /// Open layers with the slot reserved for them in document order
    layer_stack: Vec<(usize, CapabilitiesLayer)>,
    slots: Vec<Option<CapabilitiesLayer>>,
    style: Option<StyleInfo>,
    legend: Option<LegendUrl>,
    dimension: Option<(DimensionInfo, DimensionSource)>,
    geo_bounds: BTreeMap<String, f64>,
}

impl CapabilitiesParser {
    fn current_layer(&mut self) -> Option<&mut CapabilitiesLayer> {
        self.layer_stack.last_mut().map(|(_, layer)| layer)
    }

    fn parent_name(&self) -> Option<&str> {
        let len = self.path.len();
        if len >= 2 {
            Some(self.path[len - 2].as_str())
        } else {
            None
        }
    }

    /// The operation (GetMap, GetFeatureInfo, ...) an element sits under.
    fn enclosing_operation(&self) -> Option<&str> {
        let request_idx = self.path.iter().position(|p| p == "Request")?;
        self.path.get(request_idx + 1).map(String::as_str)
    }

    fn on_start(&mut self, name: String, attrs: &BTreeMap<String, String>) {
        self.text.clear();
        // the element itself is not on the path yet
        let in_layer = self.path.last().is_some_and(|p| p == "Layer");

        match name.as_str() {
            "WMT_MS_Capabilities" | "WMS_Capabilities" if self.path.is_empty() => {
                let declared = attrs.get("version").and_then(|v| v.parse().ok());
                self.caps.version = declared.unwrap_or(if name == "WMT_MS_Capabilities" {
                    WmsVersion::V1_1_1
                } else {
                    WmsVersion::V1_3_0
                });
                self.version_seen = true;
            }
            "Layer" => {
                let mut layer = match self.layer_stack.last() {
                    Some((_, parent)) => CapabilitiesLayer::child_of(parent),
                    None => CapabilitiesLayer::default(),
                };
                if let Some(q) = parse_bool(attrs.get("queryable")) {
                    layer.queryable = q;
                }
                if let Some(o) = parse_bool(attrs.get("opaque")) {
                    layer.opaque = o;
                }
                let slot = self.slots.len();
                self.slots.push(None);
                self.layer_stack.push((slot, layer));
            }
            "Style" if !self.layer_stack.is_empty() => {
                self.style = Some(StyleInfo::default());
            }
            "LegendURL" if self.style.is_some() => {
                self.legend = Some(LegendUrl {
                    width: attrs.get("width").and_then(|w| w.parse().ok()),
                    height: attrs.get("height").and_then(|h| h.parse().ok()),
                    ..Default::default()
                });
            }
            "OnlineResource" => {
                if let Some(href) = attrs.get("href") {
                    self.on_online_resource(href.clone());
                }
            }
            "LatLonBoundingBox" => {
                if let (Some(bbox), Some(layer)) = (bbox_from_attrs(attrs), self.current_layer()) {
                    layer.geographic_bbox = Some(bbox);
                }
            }
            "EX_GeographicBoundingBox" => self.geo_bounds.clear(),
            "BoundingBox" if in_layer => {
                self.on_bounding_box(attrs);
            }
            "Dimension" | "Extent" if in_layer => {
                let source = if name == "Extent" {
                    DimensionSource::Extent
                } else {
                    DimensionSource::Dimension
                };
                let flag = |key: &str| parse_bool(attrs.get(key)).unwrap_or(false);
                let dimension = DimensionInfo {
                    name: attrs.get("name").cloned().unwrap_or_default(),
                    units: attrs.get("units").cloned(),
                    unit_symbol: attrs.get("unitSymbol").cloned(),
                    default: attrs.get("default").cloned(),
                    values: String::new(),
                    multiple_values: flag("multipleValues"),
                    nearest_value: flag("nearestValue"),
                    current: flag("current"),
                };
                self.dimension = Some((dimension, source));
            }
            _ => {}
        }

        self.path.push(name);
    }

    fn on_online_resource(&mut self, href: String) {
        if let Some(legend) = self.legend.as_mut() {
            legend.href = href;
            return;
        }
        if !self.path.iter().any(|p| p == "DCPType") || !self.path.iter().any(|p| p == "Get") {
            return;
        }
        let operation = self.enclosing_operation().map(str::to_string);
        let target = match operation.as_deref() {
            Some("GetMap") | Some("Map") => &mut self.caps.get_map_url,
            Some("GetFeatureInfo") | Some("FeatureInfo") => &mut self.caps.get_feature_info_url,
            Some("GetLegendGraphic") => &mut self.caps.get_legend_graphic_url,
            _ => return,
        };
        if target.is_none() {
            *target = Some(href);
        }
    }

    fn on_bounding_box(&mut self, attrs: &BTreeMap<String, String>) {
        let version = self.caps.version;
        let Some(crs_name) = attrs.get("CRS").or_else(|| attrs.get("SRS")) else {
            return;
        };
        let Ok(crs) = CrsCode::from_wms_string(crs_name) else {
            debug!(crs = %crs_name, "Ignoring bounding box with unparseable CRS");
            return;
        };
        let Some(mut bbox) = bbox_from_attrs(attrs) else {
            return;
        };
        // 1.3.0 bounding boxes follow the CRS axis order
        if version.axis_order(&crs) == AxisOrder::LatLon {
            bbox = bbox.swap_axes();
        }
        if let Some(layer) = self.current_layer() {
            layer.set_bounding_box(crs, bbox);
        }
    }

    fn on_end(&mut self) {
        let text = std::mem::take(&mut self.text).trim().to_string();
        let Some(name) = self.path.last().cloned() else {
            return;
        };
        let parent = self.parent_name().map(str::to_string);

        match (parent.as_deref(), name.as_str()) {
            (Some("Service"), "Title") => self.caps.service_title = Some(text),
            (Some("Service"), "Abstract") => self.caps.service_abstract = Some(text),
            (Some("Layer"), "Name") => {
                if let Some(layer) = self.current_layer() {
                    layer.name = Some(text);
                }
            }
            (Some("Layer"), "Title") => {
                if let Some(layer) = self.current_layer() {
                    layer.title = text;
                }
            }
            (Some("Layer"), "Abstract") => {
                if let Some(layer) = self.current_layer() {
                    layer.abstract_text = Some(text);
                }
            }
            (Some("Layer"), "SRS") | (Some("Layer"), "CRS") => {
                // some 1.1.1 servers list several codes in one element
                for code in text.split_whitespace() {
                    match CrsCode::from_wms_string(code) {
                        Ok(crs) => {
                            if let Some(layer) = self.current_layer() {
                                layer.add_crs(crs);
                            }
                        }
                        Err(e) => debug!(code = %code, error = %e, "Ignoring layer CRS"),
                    }
                }
            }
            (Some("Style"), "Name") => {
                if let Some(style) = self.style.as_mut() {
                    style.name = text;
                }
            }
            (Some("Style"), "Title") => {
                if let Some(style) = self.style.as_mut() {
                    style.title = Some(text);
                }
            }
            (Some("Style"), "Abstract") => {
                if let Some(style) = self.style.as_mut() {
                    style.abstract_text = Some(text);
                }
            }
            (Some("LegendURL"), "Format") => {
                if let Some(legend) = self.legend.as_mut() {
                    legend.format = Some(text);
                }
            }
            (Some("Style"), "LegendURL") => {
                if let (Some(style), Some(legend)) = (self.style.as_mut(), self.legend.take()) {
                    if style.legend.is_none() {
                        style.legend = Some(legend);
                    }
                }
            }
            (Some("Layer"), "Style") => {
                if let Some(style) = self.style.take() {
                    if let Some(layer) = self.current_layer() {
                        layer.set_style(style);
                    }
                }
            }
            (Some("EX_GeographicBoundingBox"), bound) => {
                if let Ok(value) = text.parse::<f64>() {
                    self.geo_bounds.insert(bound.to_string(), value);
                }
            }
            (_, "EX_GeographicBoundingBox") => {
                let get = |k: &str| self.geo_bounds.get(k).copied();
                if let (Some(w), Some(s), Some(e), Some(n)) = (
                    get("westBoundLongitude"),
                    get("southBoundLatitude"),
                    get("eastBoundLongitude"),
                    get("northBoundLatitude"),
                ) {
                    if let Some(layer) = self.current_layer() {
                        layer.geographic_bbox = Some(BoundingBox::new(w, s, e, n));
                    }
                }
            }
            (Some("Exception"), "Format") => self.caps.exception_formats.push(text),
            (Some(_), "Format") if self.path.iter().any(|p| p == "Request") => {
                let operation = self.enclosing_operation().map(str::to_string);
                match operation.as_deref() {
                    Some("GetMap") | Some("Map") => self.caps.map_formats.push(text),
                    Some("GetFeatureInfo") | Some("FeatureInfo") => {
                        self.caps.info_formats.push(text)
                    }
                    _ => {}
                }
            }
            (Some("Layer"), "Dimension") | (Some("Layer"), "Extent") => {
                if let Some((mut dimension, source)) = self.dimension.take() {
                    dimension.values = text;
                    if let Some(layer) = self.current_layer() {
                        merge_dimension(layer, dimension, source);
                    }
                }
            }
            (_, "Layer") => {
                if let Some((slot, layer)) = self.layer_stack.pop() {
                    self.slots[slot] = Some(layer);
                }
            }
            _ => {}
        }

        self.path.pop();
    }

    fn finish(self) -> OgcResult<Capabilities> {
        if !self.version_seen {
            return Err(OgcError::MalformedDocument(
                "not a WMS capabilities document".to_string(),
            ));
        }
        let mut caps = self.caps;
        caps.layers = self.slots.into_iter().flatten().collect();
        debug!(
            version = %caps.version,
            layers = caps.layers.len(),
            "Parsed WMS capabilities"
        );
        Ok(caps)
    }
}

fn merge_dimension(layer: &mut CapabilitiesLayer, dimension: DimensionInfo, source: DimensionSource) {
    let existing = layer
        .dimensions
        .iter_mut()
        .find(|d| d.name.eq_ignore_ascii_case(&dimension.name));

    match (existing, source) {
        (None, _) => layer.dimensions.push(dimension),
        // a 1.3.0 redeclaration replaces the inherited dimension
        (Some(current), DimensionSource::Dimension) if !dimension.values.is_empty() => {
            *current = dimension
        }
        (Some(current), DimensionSource::Dimension) => {
            current.units = dimension.units;
            current.unit_symbol = dimension.unit_symbol;
        }
        (Some(current), DimensionSource::Extent) => {
            current.default = dimension.default;
            current.values = dimension.values;
            current.multiple_values = dimension.multiple_values;
            current.nearest_value = dimension.nearest_value;
            current.current = dimension.current;
        }
    }
}

fn bbox_from_attrs(attrs: &BTreeMap<String, String>) -> Option<BoundingBox> {
    let get = |k: &str| attrs.get(k).and_then(|v| v.trim().parse::<f64>().ok());
    Some(BoundingBox::new(
        get("minx")?,
        get("miny")?,
        get("maxx")?,
        get("maxy")?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_capabilities_document() {
        let result = Capabilities::from_xml("<ExceptionReport/>");
        assert!(matches!(result, Err(OgcError::MalformedDocument(_))));
    }

    #[test]
    fn test_minimal_document() {
        let xml = r#"<WMS_Capabilities version="1.3.0">
            <Capability><Layer><Name>a</Name><Title>A</Title></Layer></Capability>
        </WMS_Capabilities>"#;
        let caps = Capabilities::from_xml(xml).unwrap();
        assert_eq!(caps.version, WmsVersion::V1_3_0);
        assert_eq!(caps.layers.len(), 1);
        assert_eq!(caps.layer("a").unwrap().title, "A");
        assert!(matches!(caps.layer("b"), Err(OgcError::LayerNotFound(_))));
    }

    #[test]
    fn test_extent_fills_inherited_dimension() {
        let xml = r#"<WMT_MS_Capabilities version="1.1.1"><Capability>
            <Layer><Title>root</Title>
              <Dimension name="time" units="ISO8601"/>
              <Layer><Name>child</Name><Title>c</Title>
                <Extent name="time" default="2024-01-01T00:00:00Z">2024-01-01T00:00:00Z,2024-01-02T00:00:00Z</Extent>
              </Layer>
            </Layer>
        </Capability></WMT_MS_Capabilities>"#;
        let caps = Capabilities::from_xml(xml).unwrap();
        let child = caps.layer("child").unwrap();
        let time = child.time_dimension().unwrap();
        assert_eq!(time.units.as_deref(), Some("ISO8601"));
        assert_eq!(time.default.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(time.time_values().unwrap().entries.len(), 2);

        // the root layer keeps its value-less declaration
        assert!(caps.layers[0].time_dimension().unwrap().values.is_empty());
    }
}
