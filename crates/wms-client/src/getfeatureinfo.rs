//! WMS GetFeatureInfo request building.
//!
//! A GetFeatureInfo request repeats the GetMap parameters describing the map
//! the user is looking at, plus the layers to query and a pixel position.

use serde::{Deserialize, Serialize};

use ogc_common::kvp::QueryParams;
use ogc_common::{Envelope, OgcError, OgcResult};

use crate::getmap::GetMapRequest;

/// GetFeatureInfo request parameters
#[derive(Debug, Clone)]
pub struct GetFeatureInfoRequest {
    /// The map the query point refers to
    pub map: GetMapRequest,
    /// Layers to query; defaults to the map layers when empty
    pub query_layers: Vec<String>,
    /// Response MIME type
    pub info_format: Option<String>,
    /// Maximum number of features to return
    pub feature_count: Option<u32>,
    /// Pixel column (0-based from left)
    pub i: u32,
    /// Pixel row (0-based from top)
    pub j: u32,
}

impl GetFeatureInfoRequest {
    pub fn new(map: GetMapRequest, i: u32, j: u32) -> Self {
        Self {
            map,
            query_layers: Vec::new(),
            info_format: None,
            feature_count: None,
            i,
            j,
        }
    }

    pub fn info_format(mut self, format: impl Into<String>) -> Self {
        self.info_format = Some(format.into());
        self
    }

    pub fn feature_count(mut self, count: u32) -> Self {
        self.feature_count = Some(count);
        self
    }

    pub fn query_layers<I, S>(mut self, layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query_layers = layers.into_iter().map(Into::into).collect();
        self
    }

    /// Map coordinates of the queried pixel centre, when the map has an
    /// envelope and a size.
    pub fn query_point(&self) -> Option<(f64, f64)> {
        let envelope = self.map.envelope.as_ref()?;
        let (width, height) = (self.map.width?, self.map.height?);
        Some(pixel_to_geographic(envelope, width, height, self.i, self.j))
    }

    /// Validate the request and produce its KVP parameters.
    pub fn to_params(&self) -> OgcResult<QueryParams> {
        let mut params = self.map.to_params()?;
        // to_params succeeded, so both are present
        let (width, height) = self.map.checked_size()?;
        let version = self
            .map
            .version
            .ok_or_else(|| OgcError::MissingParameter("VERSION".to_string()))?;

        let info_format = self
            .info_format
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .ok_or_else(|| OgcError::MissingParameter("INFO_FORMAT".to_string()))?;

        if self.i >= width || self.j >= height {
            return Err(OgcError::invalid_parameter(
                "I/J",
                format!(
                    "pixel ({}, {}) outside of {}x{} image",
                    self.i, self.j, width, height
                ),
            ));
        }

        let query_layers = if self.query_layers.is_empty() {
            &self.map.layers
        } else {
            &self.query_layers
        };

        params.set("REQUEST", "GetFeatureInfo");
        params.set("QUERY_LAYERS", query_layers.join(","));
        params.set("INFO_FORMAT", info_format);
        params.set_opt("FEATURE_COUNT", self.feature_count.map(|c| c.to_string()));
        let (col, row) = version.pixel_param_names();
        params.set(col, self.i.to_string());
        params.set(row, self.j.to_string());

        Ok(params)
    }

    pub fn to_url(&self, base_url: &str) -> OgcResult<String> {
        Ok(self.to_params()?.to_url(base_url))
    }
}

/// GetFeatureInfo response formats the client knows how to ask for.
///
/// Serialized as the MIME type, so config files can name them directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
pub enum InfoFormat {
    #[serde(rename = "application/json")]
    Json,
    #[serde(rename = "text/html")]
    Html,
    #[serde(rename = "text/xml")]
    Xml,
    /// GML feature collection (`application/vnd.ogc.gml`)
    #[serde(rename = "application/vnd.ogc.gml")]
    Gml,
    #[serde(rename = "text/plain")]
    #[default]
    Text,
}

impl InfoFormat {
    /// Recognize a MIME type, ignoring case and parameters such as charset.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or(mime).trim();
        match essence.to_ascii_lowercase().as_str() {
            "application/json" => Some(Self::Json),
            "text/html" => Some(Self::Html),
            "text/xml" => Some(Self::Xml),
            "application/vnd.ogc.gml" | "application/gml+xml" => Some(Self::Gml),
            "text/plain" => Some(Self::Text),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Html => "text/html",
            Self::Xml => "text/xml",
            Self::Gml => "application/vnd.ogc.gml",
            Self::Text => "text/plain",
        }
    }

    /// Pick the preferred format among those a server advertises.
    pub fn negotiate(preferred: &[InfoFormat], advertised: &[String]) -> Option<String> {
        preferred.iter().find_map(|wanted| {
            advertised
                .iter()
                .find(|offered| InfoFormat::from_mime(offered) == Some(*wanted))
                .cloned()
        })
    }
}

/// Coordinates of the centre of pixel (`i`, `j`) in a `width` x `height`
/// map of `envelope`, in the envelope CRS. Row 0 is the top edge.
pub fn pixel_to_geographic(
    envelope: &Envelope,
    width: u32,
    height: u32,
    i: u32,
    j: u32,
) -> (f64, f64) {
    envelope.pixel_to_coordinate(i as f64, j as f64, width, height)
}
