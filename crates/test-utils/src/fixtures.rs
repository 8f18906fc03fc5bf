//! Common test fixtures for GeotoolKit tests.

/// Common bounding boxes as (min_x, min_y, max_x, max_y).
pub mod bbox {
    /// Continental United States bounding box
    pub const CONUS: (f64, f64, f64, f64) = (-125.0, 24.0, -66.0, 50.0);

    /// Europe bounding box
    pub const EUROPE: (f64, f64, f64, f64) = (-15.0, 35.0, 45.0, 72.0);

    /// Europe in Web Mercator meters
    pub const EUROPE_MERCATOR: (f64, f64, f64, f64) =
        (-1_669_792.36, 4_163_881.14, 5_009_377.09, 11_753_184.62);
}

/// Layer names of the capabilities documents.
pub mod layers {
    pub const STATES: &str = "topp:states";
    pub const BASEMAP: &str = "osm:basemap";
    pub const TEMPERATURE: &str = "weather:temperature";
    pub const WIND: &str = "weather:wind";
    pub const ROADS_UTM: &str = "tiger:roads";
    pub const SF_ROADS: &str = "sf:roads";
    pub const SF_RESTRICTED: &str = "sf:restricted";
}

/// Client configuration files.
pub mod config {
    pub const CLIENT_YAML: &str = r#"
base_url: "http://example.com/geoserver/wms"
version: "1.1.1"
timeout_secs: 10
capabilities_ttl_secs: 60
format: "image/jpeg"
transparent: false
match_capabilities_dates: true
"#;

    pub const INVALID_CLIENT_YAML: &str = r#"
base_url: ""
timeout_secs: 0
"#;
}
