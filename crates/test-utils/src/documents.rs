//! XML documents as served by WMS and WFS servers.
//!
//! The files live in `testdata/` and are embedded at compile time.

/// WMS 1.3.0 capabilities with nested layers, inherited CRSs, styles and
/// time/elevation dimensions.
///
/// Layers in document order:
/// 0. (unnamed root) CRS EPSG:3857
/// 1. `topp:states` adds EPSG:4326 and CRS:84, two styles
/// 2. `osm:basemap` inherits everything
/// 3. (unnamed "Weather") declares a time dimension and a default style
/// 4. `weather:temperature` adds EPSG:4326 and an elevation dimension
/// 5. `weather:wind` replaces the time dimension
/// 6. `tiger:roads` adds EPSG:32618
pub const CAPABILITIES_1_3_0: &str = include_str!("../testdata/capabilities_1_3_0.xml");

/// WMS 1.1.1 capabilities using SRS, LatLonBoundingBox and Extent.
pub const CAPABILITIES_1_1_1: &str = include_str!("../testdata/capabilities_1_1_1.xml");

/// WMS ServiceExceptionReport with an InvalidCRS exception.
pub const WMS_EXCEPTION: &str = include_str!("../testdata/wms_exception.xml");

/// WFS 2.0 FeatureCollection with two `topp:states` members.
pub const FEATURE_COLLECTION: &str = include_str!("../testdata/feature_collection.xml");

pub const TRANSACTION_RESPONSE: &str = include_str!("../testdata/transaction_response.xml");

pub const LOCK_FEATURE_RESPONSE: &str = include_str!("../testdata/lock_feature_response.xml");

/// OWS 1.1 ExceptionReport as returned by WFS 2.0 servers.
pub const WFS_EXCEPTION: &str = include_str!("../testdata/wfs_exception.xml");

pub const LIST_STORED_QUERIES_RESPONSE: &str =
    include_str!("../testdata/list_stored_queries_response.xml");

pub const DESCRIBE_STORED_QUERIES_RESPONSE: &str =
    include_str!("../testdata/describe_stored_queries_response.xml");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documents_are_embedded() {
        assert!(CAPABILITIES_1_3_0.contains("<WMS_Capabilities"));
        assert!(CAPABILITIES_1_1_1.contains("<WMT_MS_Capabilities"));
        assert!(FEATURE_COLLECTION.contains("wfs:FeatureCollection"));
        assert!(WFS_EXCEPTION.contains("ows:ExceptionReport"));
    }
}
