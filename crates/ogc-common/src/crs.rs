//! Coordinate Reference System identifiers, axis order and transforms.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::{BoundingBox, OgcError, OgcResult};

/// WGS84 semi-major axis used by spherical Web Mercator.
const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude limit of the Web Mercator square.
pub const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_6;

/// Half the width of the Web Mercator square in meters.
pub const MERCATOR_MAX_EXTENT: f64 = 20_037_508.342_789_244;

/// Points sampled along each edge when transforming a bounding box.
const DENSIFY_STEPS: usize = 20;

/// Identifier of a coordinate reference system as used in OGC requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrsCode {
    /// OGC CRS:84, WGS84 with longitude/latitude axis order
    Crs84,
    /// EPSG registry code
    Epsg(u32),
    /// Any other authority (AUTO:42001, IAU:..., local codes)
    Other(String),
}

impl CrsCode {
    pub const WGS84: CrsCode = CrsCode::Epsg(4326);
    pub const WEB_MERCATOR: CrsCode = CrsCode::Epsg(3857);

    /// Parse a CRS identifier from an OGC request or capabilities document.
    ///
    /// Accepts formats like:
    /// - "EPSG:4326" / "epsg:4326"
    /// - "CRS:84"
    /// - "urn:ogc:def:crs:EPSG::4326", "urn:ogc:def:crs:OGC:1.3:CRS84"
    /// - "http://www.opengis.net/def/crs/EPSG/0/4326"
    ///
    /// Legacy Web Mercator aliases resolve to EPSG:3857.
    pub fn from_wms_string(s: &str) -> Result<Self, CrsParseError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CrsParseError::Empty);
        }
        let normalized = trimmed.to_uppercase();

        if matches!(
            normalized.as_str(),
            "CRS:84" | "CRS84" | "URN:OGC:DEF:CRS:OGC:1.3:CRS84" | "URN:OGC:DEF:CRS:OGC::CRS84"
        ) || normalized.ends_with("/OGC/1.3/CRS84")
        {
            return Ok(CrsCode::Crs84);
        }

        let code = if let Some(rest) = normalized.strip_prefix("EPSG:") {
            Some(rest)
        } else if let Some(rest) = normalized.strip_prefix("URN:OGC:DEF:CRS:EPSG:") {
            // version part may be empty ("EPSG::4326") or present ("EPSG:6.6:4326")
            rest.rsplit(':').next()
        } else if normalized.contains("/DEF/CRS/EPSG/") {
            normalized.rsplit('/').next()
        } else {
            None
        };

        match code {
            Some(code) => {
                let value: u32 = code
                    .parse()
                    .map_err(|_| CrsParseError::InvalidCode(trimmed.to_string()))?;
                Ok(CrsCode::Epsg(normalize_epsg(value)))
            }
            None => Ok(CrsCode::Other(trimmed.to_string())),
        }
    }

    /// EPSG code, if this is an EPSG CRS.
    pub fn epsg_code(&self) -> Option<u32> {
        match self {
            CrsCode::Epsg(code) => Some(*code),
            _ => None,
        }
    }

    /// Get the axis order for this CRS in WMS 1.3.0.
    ///
    /// WMS 1.3.0 uses the axis order defined by the CRS authority:
    /// - Geographic EPSG CRS: lat, lon (y, x)
    /// - CRS:84 and projected CRS: easting, northing (x, y)
    pub fn axis_order_wms_1_3(&self) -> AxisOrder {
        if self.is_geographic() && *self != CrsCode::Crs84 {
            AxisOrder::LatLon
        } else {
            AxisOrder::XY
        }
    }

    /// Get the axis order for WMS 1.1.1 (always x, y regardless of CRS).
    pub fn axis_order_wms_1_1(&self) -> AxisOrder {
        AxisOrder::XY
    }

    /// Check if this is a geographic (lat/lon) CRS.
    ///
    /// The EPSG 4000-4999 block holds the geographic 2D definitions.
    pub fn is_geographic(&self) -> bool {
        match self {
            CrsCode::Crs84 => true,
            CrsCode::Epsg(code) => (4000..5000).contains(code),
            CrsCode::Other(_) => false,
        }
    }

    /// CRSs treated as plain WGS84 longitude/latitude for transformation.
    pub fn is_wgs84_equivalent(&self) -> bool {
        matches!(self, CrsCode::Crs84 | CrsCode::Epsg(4326) | CrsCode::Epsg(4269))
    }

    pub fn is_web_mercator(&self) -> bool {
        *self == CrsCode::WEB_MERCATOR
    }

    /// Whether `transform_bbox` can convert between `self` and `other`.
    pub fn can_transform_to(&self, other: &CrsCode) -> bool {
        self == other || (self.is_transformable() && other.is_transformable())
    }

    fn is_transformable(&self) -> bool {
        self.is_wgs84_equivalent() || self.is_web_mercator()
    }

    /// Get the valid bounds for this CRS, in x/y order.
    pub fn valid_bounds(&self) -> Option<BoundingBox> {
        if self.is_wgs84_equivalent() {
            Some(crate::bbox::WORLD_WGS84)
        } else if self.is_web_mercator() {
            Some(BoundingBox::new(
                -MERCATOR_MAX_EXTENT,
                -MERCATOR_MAX_EXTENT,
                MERCATOR_MAX_EXTENT,
                MERCATOR_MAX_EXTENT,
            ))
        } else {
            None
        }
    }
}

fn normalize_epsg(code: u32) -> u32 {
    match code {
        900913 | 3785 | 102100 | 102113 => 3857,
        other => other,
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrsCode::Crs84 => write!(f, "CRS:84"),
            CrsCode::Epsg(code) => write!(f, "EPSG:{}", code),
            CrsCode::Other(code) => write!(f, "{}", code),
        }
    }
}

impl FromStr for CrsCode {
    type Err = CrsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CrsCode::from_wms_string(s)
    }
}

/// Axis order for coordinate interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisOrder {
    /// X (longitude/easting), Y (latitude/northing)
    XY,
    /// Y (latitude/northing), X (longitude/easting)
    LatLon,
}

#[derive(Debug, thiserror::Error)]
pub enum CrsParseError {
    #[error("Empty CRS identifier")]
    Empty,

    #[error("Invalid CRS code: {0}")]
    InvalidCode(String),
}

impl From<CrsParseError> for OgcError {
    fn from(err: CrsParseError) -> Self {
        OgcError::InvalidCrs(err.to_string())
    }
}

/// Convert WGS84 longitude/latitude to Web Mercator meters.
pub fn wgs84_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT);
    let x = EARTH_RADIUS * lon.to_radians();
    let y = EARTH_RADIUS * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

/// Convert Web Mercator meters to WGS84 longitude/latitude.
pub fn mercator_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
    (lon, lat)
}

/// Transform a single x/y point between two supported CRSs.
pub fn transform_point(from: &CrsCode, to: &CrsCode, x: f64, y: f64) -> OgcResult<(f64, f64)> {
    if from == to || (from.is_wgs84_equivalent() && to.is_wgs84_equivalent()) {
        return Ok((x, y));
    }
    if from.is_wgs84_equivalent() && to.is_web_mercator() {
        return Ok(wgs84_to_mercator(x, y));
    }
    if from.is_web_mercator() && to.is_wgs84_equivalent() {
        return Ok(mercator_to_wgs84(x, y));
    }
    Err(OgcError::Projection(format!(
        "no transformation available from {} to {}",
        from, to
    )))
}

/// Transform a bounding box, densifying its edges so curved images of the
/// edges are covered.
pub fn transform_bbox(from: &CrsCode, to: &CrsCode, bbox: &BoundingBox) -> OgcResult<BoundingBox> {
    if from == to || (from.is_wgs84_equivalent() && to.is_wgs84_equivalent()) {
        return Ok(*bbox);
    }

    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for step in 0..=DENSIFY_STEPS {
        let t = step as f64 / DENSIFY_STEPS as f64;
        let x = bbox.min_x + t * bbox.width();
        let y = bbox.min_y + t * bbox.height();
        for (px, py) in [
            (x, bbox.min_y),
            (x, bbox.max_y),
            (bbox.min_x, y),
            (bbox.max_x, y),
        ] {
            let (tx, ty) = transform_point(from, to, px, py)?;
            min_x = min_x.min(tx);
            min_y = min_y.min(ty);
            max_x = max_x.max(tx);
            max_y = max_y.max(ty);
        }
    }

    let result = BoundingBox::new(min_x, min_y, max_x, max_y);
    if !result.is_valid() {
        return Err(OgcError::Projection(format!(
            "transformed envelope is degenerate: {:?}",
            result
        )));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_crs() {
        assert_eq!(
            CrsCode::from_wms_string("EPSG:4326").unwrap(),
            CrsCode::Epsg(4326)
        );
        assert_eq!(
            CrsCode::from_wms_string("epsg:3857").unwrap(),
            CrsCode::Epsg(3857)
        );
        assert_eq!(CrsCode::from_wms_string("CRS:84").unwrap(), CrsCode::Crs84);
        assert_eq!(
            CrsCode::from_wms_string("EPSG:900913").unwrap(),
            CrsCode::Epsg(3857)
        );
        assert_eq!(
            CrsCode::from_wms_string("urn:ogc:def:crs:EPSG::4326").unwrap(),
            CrsCode::Epsg(4326)
        );
        assert_eq!(
            CrsCode::from_wms_string("http://www.opengis.net/def/crs/EPSG/0/27700").unwrap(),
            CrsCode::Epsg(27700)
        );
        assert_eq!(
            CrsCode::from_wms_string("AUTO:42001").unwrap(),
            CrsCode::Other("AUTO:42001".to_string())
        );
        assert!(CrsCode::from_wms_string("EPSG:abc").is_err());
        assert!(CrsCode::from_wms_string("  ").is_err());
    }

    #[test]
    fn test_axis_order() {
        assert_eq!(CrsCode::WGS84.axis_order_wms_1_3(), AxisOrder::LatLon);
        assert_eq!(CrsCode::Epsg(4258).axis_order_wms_1_3(), AxisOrder::LatLon);
        assert_eq!(CrsCode::Crs84.axis_order_wms_1_3(), AxisOrder::XY);
        assert_eq!(CrsCode::WEB_MERCATOR.axis_order_wms_1_3(), AxisOrder::XY);

        // WMS 1.1.1 always uses X,Y
        assert_eq!(CrsCode::WGS84.axis_order_wms_1_1(), AxisOrder::XY);
    }

    #[test]
    fn test_display() {
        assert_eq!(CrsCode::Crs84.to_string(), "CRS:84");
        assert_eq!(CrsCode::Epsg(32633).to_string(), "EPSG:32633");
    }

    #[test]
    fn test_mercator_round_trip() {
        let (x, y) = wgs84_to_mercator(2.35, 48.85);
        let (lon, lat) = mercator_to_wgs84(x, y);
        assert!((lon - 2.35).abs() < 1e-9);
        assert!((lat - 48.85).abs() < 1e-9);
    }

    #[test]
    fn test_unsupported_transform() {
        let result = transform_point(&CrsCode::Epsg(27700), &CrsCode::WGS84, 0.0, 0.0);
        assert!(matches!(result, Err(OgcError::Projection(_))));
    }
}
