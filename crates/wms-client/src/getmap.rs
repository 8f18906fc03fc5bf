//! WMS GetMap request building.
//!
//! Translates an envelope, output size, format and styling options into
//! the KVP parameters of a GetMap request, honouring the axis order rules of
//! the requested WMS version.

use std::collections::BTreeMap;

use ogc_common::kvp::QueryParams;
use ogc_common::{AxisOrder, Envelope, OgcError, OgcResult};

use crate::version::WmsVersion;

/// GetMap request parameters.
#[derive(Debug, Clone, Default)]
pub struct GetMapRequest {
    pub version: Option<WmsVersion>,
    pub layers: Vec<String>,
    /// One style per layer, or empty for server defaults
    pub styles: Vec<String>,
    pub envelope: Option<Envelope>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: Option<String>,
    pub transparent: bool,
    /// Background color as 0xRRGGBB
    pub bgcolor: Option<String>,
    pub exceptions: Option<String>,
    pub sld: Option<String>,
    pub sld_body: Option<String>,
    pub sld_version: Option<String>,
    /// Extra dimensions, sent as DIM_<NAME>
    pub dimensions: BTreeMap<String, String>,
    /// Vendor specific parameters, sent verbatim
    pub vendor: Vec<(String, String)>,
}

impl GetMapRequest {
    pub fn new(version: WmsVersion) -> Self {
        Self {
            version: Some(version),
            ..Default::default()
        }
    }

    pub fn layer(mut self, name: impl Into<String>) -> Self {
        self.layers.push(name.into());
        self
    }

    pub fn layers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.layers.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn styles<I, S>(mut self, styles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.styles = styles.into_iter().map(Into::into).collect();
        self
    }

    pub fn envelope(mut self, envelope: Envelope) -> Self {
        self.envelope = Some(envelope);
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn transparent(mut self, transparent: bool) -> Self {
        self.transparent = transparent;
        self
    }

    pub fn dimension(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.dimensions.insert(name.into(), value.into());
        self
    }

    pub fn vendor_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vendor.push((key.into(), value.into()));
        self
    }

    /// Validate the request and produce its KVP parameters.
    pub fn to_params(&self) -> OgcResult<QueryParams> {
        let version = self
            .version
            .ok_or_else(|| OgcError::MissingParameter("VERSION".to_string()))?;
        if self.layers.is_empty() {
            return Err(OgcError::MissingParameter("LAYERS".to_string()));
        }
        if !self.styles.is_empty() && self.styles.len() != self.layers.len() {
            return Err(OgcError::invalid_parameter(
                "STYLES",
                format!(
                    "{} styles given for {} layers",
                    self.styles.len(),
                    self.layers.len()
                ),
            ));
        }
        let envelope = self
            .envelope
            .as_ref()
            .ok_or_else(|| OgcError::MissingParameter("BBOX".to_string()))?;
        if !envelope.bbox.is_valid() {
            return Err(OgcError::InvalidBbox(format!("{:?}", envelope.bbox)));
        }
        let (width, height) = self.checked_size()?;
        let format = self
            .format
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .ok_or_else(|| OgcError::MissingParameter("FORMAT".to_string()))?;

        let mut params = QueryParams::new();
        params.set("SERVICE", "WMS");
        params.set("REQUEST", "GetMap");
        params.set("VERSION", version.as_str());
        params.set("LAYERS", self.layers.join(","));
        params.set("STYLES", self.styles.join(","));
        params.set(version.crs_param_name(), envelope.crs.to_string());
        params.set("BBOX", encode_bbox(version, envelope));
        params.set("WIDTH", width.to_string());
        params.set("HEIGHT", height.to_string());
        params.set("FORMAT", format);
        params.set("TRANSPARENT", if self.transparent { "TRUE" } else { "FALSE" });
        params.set_opt("BGCOLOR", self.bgcolor.as_deref());
        params.set_opt("EXCEPTIONS", self.exceptions.as_deref());

        if let Some(time) = &envelope.time {
            params.set("TIME", time.to_wms_time());
        }
        if let Some((min, max)) = envelope.elevation {
            params.set("ELEVATION", encode_elevation(min, max));
        }

        params.set_opt("SLD", self.sld.as_deref());
        params.set_opt("SLD_BODY", self.sld_body.as_deref());
        if self.sld.is_some() || self.sld_body.is_some() || self.sld_version.is_some() {
            let sld_version = match (&self.sld_version, version) {
                (Some(v), _) => Some(v.clone()),
                (None, WmsVersion::V1_3_0) => Some("1.1.0".to_string()),
                (None, WmsVersion::V1_1_1) => None,
            };
            params.set_opt("SLD_VERSION", sld_version);
        }

        for (name, value) in &self.dimensions {
            params.set(dimension_param_name(name), value.clone());
        }
        for (key, value) in &self.vendor {
            params.set(key.clone(), value.clone());
        }

        Ok(params)
    }

    /// Full GetMap URL against the given service endpoint.
    pub fn to_url(&self, base_url: &str) -> OgcResult<String> {
        Ok(self.to_params()?.to_url(base_url))
    }

    pub(crate) fn checked_size(&self) -> OgcResult<(u32, u32)> {
        let width = self
            .width
            .ok_or_else(|| OgcError::MissingParameter("WIDTH".to_string()))?;
        let height = self
            .height
            .ok_or_else(|| OgcError::MissingParameter("HEIGHT".to_string()))?;
        if width == 0 || height == 0 {
            return Err(OgcError::invalid_parameter(
                "WIDTH/HEIGHT",
                format!("image size must be positive, got {}x{}", width, height),
            ));
        }
        Ok((width, height))
    }
}

/// BBOX value in the axis order mandated by the version and CRS.
pub fn encode_bbox(version: WmsVersion, envelope: &Envelope) -> String {
    match version.axis_order(&envelope.crs) {
        AxisOrder::XY => envelope.bbox.to_wms_string(),
        AxisOrder::LatLon => envelope.bbox.swap_axes().to_wms_string(),
    }
}

/// ELEVATION value: a single value or a `min/max` range.
pub fn encode_elevation(min: f64, max: f64) -> String {
    if min == max {
        format!("{}", min)
    } else {
        format!("{}/{}", min, max)
    }
}

/// TIME and ELEVATION are first-class parameters; other dimensions use the
/// DIM_ prefix.
fn dimension_param_name(name: &str) -> String {
    let upper = name.to_uppercase();
    if upper == "TIME" || upper == "ELEVATION" || upper.starts_with("DIM_") {
        upper
    } else {
        format!("DIM_{}", upper)
    }
}
