//! Capabilities parsing against the shared 1.1.1 and 1.3.0 documents.

use ogc_common::{BoundingBox, CrsCode};
use test_utils::documents::{CAPABILITIES_1_1_1, CAPABILITIES_1_3_0};
use test_utils::fixtures::layers;
use test_utils::assert_bbox_approx_eq;
use wms_client::{Capabilities, WmsVersion};

fn caps_1_3_0() -> Capabilities {
    Capabilities::from_xml(CAPABILITIES_1_3_0).unwrap()
}

fn caps_1_1_1() -> Capabilities {
    Capabilities::from_xml(CAPABILITIES_1_1_1).unwrap()
}

#[test]
fn test_service_and_operations() {
    let caps = caps_1_3_0();
    assert_eq!(caps.version, WmsVersion::V1_3_0);
    assert_eq!(caps.service_title.as_deref(), Some("GeotoolKit demo server"));
    assert_eq!(
        caps.service_abstract.as_deref(),
        Some("Sample layers for client tests & demos")
    );
    assert_eq!(
        caps.get_map_url.as_deref(),
        Some("http://example.com/geoserver/wms?")
    );
    assert_eq!(
        caps.get_feature_info_url.as_deref(),
        Some("http://example.com/geoserver/wms/info?")
    );
    assert_eq!(
        caps.get_legend_graphic_url.as_deref(),
        Some("http://example.com/geoserver/wms/legend?")
    );
    assert_eq!(caps.map_formats, vec!["image/png", "image/jpeg"]);
    assert_eq!(
        caps.info_formats,
        vec!["text/plain", "application/json", "text/html"]
    );
    assert_eq!(caps.exception_formats, vec!["XML", "INIMAGE"]);
    assert!(caps.supports_map_format("IMAGE/PNG"));
    assert!(!caps.supports_map_format("image/gif"));
}

#[test]
fn test_layers_in_document_order() {
    let caps = caps_1_3_0();
    let names: Vec<Option<&str>> = caps.layers.iter().map(|l| l.name.as_deref()).collect();
    assert_eq!(
        names,
        vec![
            None,
            Some(layers::STATES),
            Some(layers::BASEMAP),
            None,
            Some(layers::TEMPERATURE),
            Some(layers::WIND),
            Some(layers::ROADS_UTM),
        ]
    );
    assert_eq!(caps.named_layers().count(), 5);
    assert_eq!(caps.layers[4].depth, 2);
}

#[test]
fn test_crs_is_additive() {
    let caps = caps_1_3_0();
    let states = caps.layer(layers::STATES).unwrap();
    assert_eq!(
        states.crs,
        vec![CrsCode::WEB_MERCATOR, CrsCode::WGS84, CrsCode::Crs84]
    );

    let basemap = caps.layer(layers::BASEMAP).unwrap();
    assert_eq!(basemap.crs, vec![CrsCode::WEB_MERCATOR]);

    let roads = caps.layer(layers::ROADS_UTM).unwrap();
    assert!(roads.supports_crs(&CrsCode::Epsg(32618)));
    assert!(!roads.supports_crs(&CrsCode::WGS84));
}

#[test]
fn test_bounding_boxes() {
    let caps = caps_1_3_0();
    let states = caps.layer(layers::STATES).unwrap();

    let geo = states.geographic_bbox.unwrap();
    assert_bbox_approx_eq!(geo, (-124.731422, 24.955967, -66.969849, 49.371735), 1e-9);

    // EPSG:4326 is declared lat/lon in 1.3.0 and stored lon/lat
    let bbox = states.bounding_box_for(&CrsCode::WGS84).unwrap();
    assert_eq!(bbox, geo);

    // inherited from the root layer
    assert!(states.bounding_box_for(&CrsCode::WEB_MERCATOR).is_some());

    let basemap = caps.layer(layers::BASEMAP).unwrap();
    assert_eq!(
        basemap.geographic_bbox,
        Some(BoundingBox::new(-180.0, -90.0, 180.0, 90.0))
    );
}

#[test]
fn test_styles_and_legends() {
    let caps = caps_1_3_0();
    let states = caps.layer(layers::STATES).unwrap();
    assert!(states.queryable);
    assert_eq!(states.default_style().unwrap().name, "population");
    let legend = states.style("population").unwrap().legend.as_ref().unwrap();
    assert_eq!(legend.format.as_deref(), Some("image/png"));
    assert_eq!(legend.width, Some(20));
    assert_eq!(
        legend.href,
        "http://example.com/geoserver/legends/population.png"
    );
    assert!(states.style("pophatch").unwrap().legend.is_none());

    // inherited styles come first
    let temperature = caps.layer(layers::TEMPERATURE).unwrap();
    let styles: Vec<&str> = temperature.styles.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(styles, vec!["default", "warm"]);

    let basemap = caps.layer(layers::BASEMAP).unwrap();
    assert!(basemap.styles.is_empty());
    assert!(!basemap.queryable);
    assert!(basemap.opaque);
}

#[test]
fn test_dimensions() {
    let caps = caps_1_3_0();

    let temperature = caps.layer(layers::TEMPERATURE).unwrap();
    let time = temperature.time_dimension().unwrap();
    assert_eq!(time.default.as_deref(), Some("2024-01-03T00:00:00Z"));
    assert_eq!(time.values, "2024-01-01T00:00:00Z/2024-01-03T00:00:00Z/P1D");

    let elevation = temperature.elevation_dimension().unwrap();
    assert_eq!(elevation.units.as_deref(), Some("EPSG:5030"));
    assert_eq!(elevation.unit_symbol.as_deref(), Some("m"));
    assert!(elevation.nearest_value);
    assert!(!elevation.multiple_values);
    assert_eq!(elevation.values, "0,500,1000");
    assert!(temperature.dimension("ELEVATION").is_some());

    let wind = caps.layer(layers::WIND).unwrap();
    let time = wind.time_dimension().unwrap();
    assert!(time.multiple_values);
    assert_eq!(time.default, None);
    assert_eq!(time.time_values().unwrap().entries.len(), 2);
    assert!(wind.elevation_dimension().is_none());

    assert!(caps.layer(layers::STATES).unwrap().dimensions.is_empty());
}

#[test]
fn test_1_1_1_document() {
    let caps = caps_1_1_1();
    assert_eq!(caps.version, WmsVersion::V1_1_1);
    assert_eq!(caps.service_title.as_deref(), Some("Legacy map server"));
    assert_eq!(caps.get_map_url.as_deref(), Some("http://example.com/wms?"));
    assert_eq!(caps.exception_formats, vec!["application/vnd.ogc.se_xml"]);

    let roads = caps.layer(layers::SF_ROADS).unwrap();
    // space separated SRS list, legacy Google code normalized
    assert_eq!(
        roads.crs,
        vec![CrsCode::WGS84, CrsCode::WEB_MERCATOR, CrsCode::Epsg(26713)]
    );
    assert_bbox_approx_eq!(
        roads.geographic_bbox.unwrap(),
        (-103.87, 44.37, -103.62, 44.50),
        1e-9
    );
    // 1.1.1 bounding boxes are never swapped
    assert_bbox_approx_eq!(
        roads.bounding_box_for(&CrsCode::Epsg(26713)).unwrap(),
        (589434.85, 4914006.34, 609527.21, 4928063.4),
        1e-6
    );

    let time = roads.time_dimension().unwrap();
    assert_eq!(time.units.as_deref(), Some("ISO8601"));
    assert_eq!(time.default.as_deref(), Some("2024-01-01T00:00:00Z"));
    assert_eq!(time.values, "2024-01-01T00:00:00Z,2024-01-02T00:00:00Z");

    let legend = roads.default_style().unwrap().legend.as_ref().unwrap();
    assert_eq!(
        legend.href,
        "http://example.com/wms?REQUEST=GetLegendGraphic&LAYER=sf:roads"
    );

    let restricted = caps.layer(layers::SF_RESTRICTED).unwrap();
    assert!(restricted.time_dimension().unwrap().values.is_empty());
}

#[test]
fn test_malformed_document() {
    assert!(Capabilities::from_xml("<WMS_Capabilities><Layer></WMS_Capabilities>").is_err());
}
