//! WMS GetLegendGraphic request building (SLD profile).

use ogc_common::kvp::QueryParams;
use ogc_common::{OgcError, OgcResult};

use crate::version::WmsVersion;

#[derive(Debug, Clone, Default)]
pub struct GetLegendGraphicRequest {
    pub version: Option<WmsVersion>,
    pub layer: Option<String>,
    pub format: Option<String>,
    pub style: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub rule: Option<String>,
    /// Map scale denominator the legend should reflect
    pub scale: Option<f64>,
    pub sld: Option<String>,
    pub sld_body: Option<String>,
    pub sld_version: Option<String>,
    pub exceptions: Option<String>,
}

impl GetLegendGraphicRequest {
    pub fn new(version: WmsVersion, layer: impl Into<String>) -> Self {
        Self {
            version: Some(version),
            layer: Some(layer.into()),
            ..Default::default()
        }
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn to_params(&self) -> OgcResult<QueryParams> {
        let version = self
            .version
            .ok_or_else(|| OgcError::MissingParameter("VERSION".to_string()))?;
        let layer = self
            .layer
            .as_deref()
            .filter(|l| !l.is_empty())
            .ok_or_else(|| OgcError::MissingParameter("LAYER".to_string()))?;
        let format = self
            .format
            .as_deref()
            .filter(|f| !f.is_empty())
            .ok_or_else(|| OgcError::MissingParameter("FORMAT".to_string()))?;

        let mut params = QueryParams::new();
        params.set("SERVICE", "WMS");
        params.set("REQUEST", "GetLegendGraphic");
        params.set("VERSION", version.as_str());
        params.set("LAYER", layer);
        params.set("FORMAT", format);
        params.set_opt("STYLE", self.style.as_deref().filter(|s| !s.is_empty()));
        params.set_opt("WIDTH", self.width.map(|w| w.to_string()));
        params.set_opt("HEIGHT", self.height.map(|h| h.to_string()));
        params.set_opt("RULE", self.rule.as_deref());
        params.set_opt("SCALE", self.scale.map(|s| s.to_string()));
        params.set_opt("SLD", self.sld.as_deref());
        params.set_opt("SLD_BODY", self.sld_body.as_deref());
        params.set_opt("EXCEPTIONS", self.exceptions.as_deref());

        // The SLD profile of WMS 1.3.0 makes SLD_VERSION mandatory.
        let sld_version = match (&self.sld_version, version) {
            (Some(v), _) => Some(v.as_str()),
            (None, WmsVersion::V1_3_0) => Some("1.1.0"),
            (None, WmsVersion::V1_1_1) => None,
        };
        params.set_opt("SLD_VERSION", sld_version);

        Ok(params)
    }

    pub fn to_url(&self, base_url: &str) -> OgcResult<String> {
        Ok(self.to_params()?.to_url(base_url))
    }
}
