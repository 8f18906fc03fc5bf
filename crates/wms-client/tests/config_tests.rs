//! Loading the client configuration from YAML files.

use test_utils::fixtures::config::{CLIENT_YAML, INVALID_CLIENT_YAML};
use test_utils::temp_file_with;
use wms_client::{ClientConfig, WmsVersion};

#[test]
fn test_from_file() {
    let file = temp_file_with(".yaml", CLIENT_YAML);
    let config = ClientConfig::from_file(file.path()).unwrap();

    assert_eq!(config.base_url, "http://example.com/geoserver/wms");
    assert_eq!(config.version, WmsVersion::V1_1_1);
    assert_eq!(config.timeout_secs, 10);
    assert_eq!(config.capabilities_ttl_secs, 60);
    assert_eq!(config.format, "image/jpeg");
    assert!(!config.transparent);
    assert!(config.match_capabilities_dates);
    // not in the file
    assert!(config.use_local_reprojection);
    assert!(!config.force_longitude_first);
}

#[test]
fn test_from_file_rejects_invalid_values() {
    let file = temp_file_with(".yaml", INVALID_CLIENT_YAML);
    let err = ClientConfig::from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("Invalid client config"));
}

#[test]
fn test_from_file_missing() {
    let dir = test_utils::temp_test_dir();
    let err = ClientConfig::from_file(dir.path().join("absent.yaml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read client config"));
}
