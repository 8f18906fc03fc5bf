//! Configuration for the WMS client.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::resource::ResourceOptions;
use crate::version::WmsVersion;

/// Configuration for a [`crate::WmsClient`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Service endpoint, e.g. `https://host/geoserver/wms`.
    pub base_url: String,

    /// Protocol version used for every request.
    pub version: WmsVersion,

    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,

    /// How long parsed capabilities are reused.
    pub capabilities_ttl_secs: u64,

    /// Default GetMap output format.
    pub format: String,

    pub transparent: bool,

    /// Reproject envelopes in CRSs the layer does not support.
    pub use_local_reprojection: bool,

    /// Snap requested times to the dates the layer declares.
    pub match_capabilities_dates: bool,

    /// Send EPSG:4326 as CRS:84 on WMS 1.3.0.
    pub force_longitude_first: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            version: WmsVersion::V1_3_0,
            timeout_secs: 30,
            capabilities_ttl_secs: 120,
            format: "image/png".to_string(),
            transparent: true,
            use_local_reprojection: true,
            match_capabilities_dates: false,
            force_longitude_first: false,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Load configuration from a YAML file. Missing keys take their
    /// default values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read client config {:?}", path))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse client config {:?}", path))?;
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid client config {:?}: {}", path, e))?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("WMS_BASE_URL") {
            config.base_url = val;
        }

        if let Ok(val) = std::env::var("WMS_VERSION") {
            if let Ok(version) = val.parse() {
                config.version = version;
            }
        }

        if let Ok(val) = std::env::var("WMS_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                config.timeout_secs = secs;
            }
        }

        if let Ok(val) = std::env::var("CAPABILITIES_CACHE_TTL_SECS") {
            if let Ok(secs) = val.parse() {
                config.capabilities_ttl_secs = secs;
            }
        }

        if let Ok(val) = std::env::var("WMS_FORMAT") {
            config.format = val;
        }

        if let Ok(val) = std::env::var("WMS_TRANSPARENT") {
            config.transparent = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("WMS_USE_LOCAL_REPROJECTION") {
            config.use_local_reprojection = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("WMS_MATCH_CAPABILITIES_DATES") {
            config.match_capabilities_dates = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("WMS_FORCE_LONGITUDE_FIRST") {
            config.force_longitude_first = parse_flag(&val);
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("base_url must be set".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(format!("base_url must be an http(s) URL: {}", self.base_url));
        }

        if self.timeout_secs == 0 {
            return Err("timeout_secs must be > 0".to_string());
        }

        if self.format.trim().is_empty() {
            return Err("format must not be empty".to_string());
        }

        Ok(())
    }

    /// Request options for resources created from this configuration.
    pub fn resource_options(&self) -> ResourceOptions {
        ResourceOptions {
            format: self.format.clone(),
            transparent: self.transparent,
            use_local_reprojection: self.use_local_reprojection,
            match_capabilities_dates: self.match_capabilities_dates,
            force_longitude_first: self.force_longitude_first,
            ..Default::default()
        }
    }
}

fn parse_flag(val: &str) -> bool {
    val.to_lowercase() == "true" || val == "1"
}
