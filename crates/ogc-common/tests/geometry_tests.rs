//! Tests for bounding boxes, CRS handling and envelope reprojection.

use approx::assert_relative_eq;
use ogc_common::bbox::{BboxParseError, WORLD_WGS84};
use ogc_common::crs::{transform_bbox, MERCATOR_MAX_EXTENT};
use ogc_common::{AxisOrder, BoundingBox, CrsCode, Envelope, OgcError};

// ============================================================================
// BoundingBox parsing and validity
// ============================================================================

#[test]
fn test_parse_wms_bbox_with_spaces() {
    let bbox = BoundingBox::from_wms_string(" -10.5, 40 ,5,52.25").unwrap();
    assert_eq!(bbox, BoundingBox::new(-10.5, 40.0, 5.0, 52.25));
}

#[test]
fn test_parse_wms_bbox_wrong_arity() {
    assert!(matches!(
        BoundingBox::from_wms_string("0,0,100"),
        Err(BboxParseError::InvalidFormat(_))
    ));
    assert!(matches!(
        BoundingBox::from_wms_string("0,0,100,x"),
        Err(BboxParseError::InvalidNumber(_))
    ));
}

#[test]
fn test_bbox_parse_error_converts_to_ogc_error() {
    let err: OgcError = BoundingBox::from_wms_string("").unwrap_err().into();
    assert_eq!(err.exception_code(), "InvalidBBox");
}

#[test]
fn test_bbox_validity() {
    assert!(WORLD_WGS84.is_valid());
    assert!(BoundingBox::new(0.0, 0.0, 0.0, 0.0).is_valid());
    assert!(!BoundingBox::new(10.0, 0.0, 5.0, 1.0).is_valid());
    assert!(!BoundingBox::new(f64::NAN, 0.0, 5.0, 1.0).is_valid());
}

#[test]
fn test_bbox_intersection() {
    let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
    assert_eq!(
        a.intersection(&b),
        Some(BoundingBox::new(5.0, 5.0, 10.0, 10.0))
    );
    // Touching edges do not intersect
    let c = BoundingBox::new(10.0, 0.0, 20.0, 10.0);
    assert!(a.intersection(&c).is_none());
}

#[test]
fn test_bbox_contains_point_includes_edges() {
    let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    assert!(bbox.contains_point(5.0, 5.0));
    assert!(bbox.contains_point(10.0, 0.0));
    assert!(!bbox.contains_point(10.5, 5.0));
    assert!(!WORLD_WGS84.contains_point(0.0, 91.0));
}

// ============================================================================
// CRS axis order
// ============================================================================

#[test]
fn test_geographic_detection() {
    assert!(CrsCode::Crs84.is_geographic());
    assert!(CrsCode::Epsg(4326).is_geographic());
    assert!(CrsCode::Epsg(4258).is_geographic());
    assert!(!CrsCode::Epsg(3857).is_geographic());
    assert!(!CrsCode::Epsg(32633).is_geographic());
    assert!(!CrsCode::Other("AUTO:42001".into()).is_geographic());
}

#[test]
fn test_axis_order_of_projected_crs() {
    assert_eq!(CrsCode::Epsg(2154).axis_order_wms_1_3(), AxisOrder::XY);
    assert_eq!(CrsCode::Epsg(4269).axis_order_wms_1_3(), AxisOrder::LatLon);
}

// ============================================================================
// Transformations
// ============================================================================

#[test]
fn test_world_to_mercator_is_clamped() {
    let merc = transform_bbox(&CrsCode::Crs84, &CrsCode::WEB_MERCATOR, &WORLD_WGS84).unwrap();
    assert_relative_eq!(merc.min_x, -MERCATOR_MAX_EXTENT, epsilon = 1e-3);
    assert_relative_eq!(merc.max_x, MERCATOR_MAX_EXTENT, epsilon = 1e-3);
    assert_relative_eq!(merc.max_y, MERCATOR_MAX_EXTENT, epsilon = 1e-3);
    assert_relative_eq!(merc.min_y, -MERCATOR_MAX_EXTENT, epsilon = 1e-3);
}

#[test]
fn test_mercator_to_wgs84_bbox() {
    let merc = BoundingBox::new(0.0, 0.0, 1_113_194.907_932_7, 1_118_889.974_857_9);
    let geo = transform_bbox(&CrsCode::WEB_MERCATOR, &CrsCode::WGS84, &merc).unwrap();
    assert_relative_eq!(geo.min_x, 0.0, epsilon = 1e-9);
    assert_relative_eq!(geo.max_x, 10.0, epsilon = 1e-6);
    assert_relative_eq!(geo.max_y, 10.0, epsilon = 1e-6);
}

#[test]
fn test_wgs84_equivalents_are_identity() {
    let bbox = BoundingBox::new(1.0, 2.0, 3.0, 4.0);
    let out = transform_bbox(&CrsCode::Crs84, &CrsCode::Epsg(4326), &bbox).unwrap();
    assert_eq!(out, bbox);
}

#[test]
fn test_envelope_transform_unsupported() {
    let env = Envelope::new(CrsCode::Epsg(27700), BoundingBox::new(0.0, 0.0, 1000.0, 1000.0));
    assert!(!CrsCode::Epsg(27700).can_transform_to(&CrsCode::WGS84));
    assert!(matches!(
        env.transform_to(&CrsCode::WGS84),
        Err(OgcError::Projection(_))
    ));
}
