//! Capability-driven request preparation.
//!
//! A [`WmsResource`] is a set of named layers of one server together with
//! the server's capabilities. It turns a client envelope into requests the
//! server will accept:
//! - the CRS is kept when the layer supports it, otherwise the envelope is
//!   reprojected locally to a supported CRS (geographic first, then Web
//!   Mercator, then anything we can transform to)
//! - CRS:84 / EPSG:4326 are exchanged where the version requires it
//! - styles default to each layer's first declared style
//! - TIME can be snapped to the nearest date the layer declares
//!
//! Capability lookups that fail are logged and fall back (EPSG:4326, full
//! WGS84 extent) instead of failing the request.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use ogc_common::bbox::WORLD_WGS84;
use ogc_common::crs::transform_point;
use ogc_common::{BoundingBox, CrsCode, Envelope, OgcError, OgcResult, TimeRange};

use crate::capabilities::{Capabilities, CapabilitiesLayer};
use crate::getfeatureinfo::{GetFeatureInfoRequest, InfoFormat};
use crate::getlegend::GetLegendGraphicRequest;
use crate::getmap::GetMapRequest;
use crate::version::WmsVersion;

/// Info formats tried, in order, when none is requested explicitly.
const PREFERRED_INFO_FORMATS: [InfoFormat; 5] = [
    InfoFormat::Json,
    InfoFormat::Gml,
    InfoFormat::Xml,
    InfoFormat::Html,
    InfoFormat::Text,
];

/// Request options applied to every request prepared by a resource.
#[derive(Debug, Clone)]
pub struct ResourceOptions {
    pub format: String,
    pub transparent: bool,
    /// Explicit styles, one per layer; empty means capability defaults
    pub styles: Vec<String>,
    /// Reproject envelopes whose CRS the layer does not support
    pub use_local_reprojection: bool,
    /// Snap TIME to the nearest date declared by the layer
    pub match_capabilities_dates: bool,
    /// Send EPSG:4326 envelopes as CRS:84 on WMS 1.3.0
    pub force_longitude_first: bool,
    pub exceptions: Option<String>,
    pub sld: Option<String>,
    pub sld_body: Option<String>,
}

impl Default for ResourceOptions {
    fn default() -> Self {
        Self {
            format: "image/png".to_string(),
            transparent: true,
            styles: Vec::new(),
            use_local_reprojection: true,
            match_capabilities_dates: false,
            force_longitude_first: false,
            exceptions: None,
            sld: None,
            sld_body: None,
        }
    }
}

/// A GetMap request together with the envelope it actually asks for,
/// which differs from the caller's envelope after reprojection.
#[derive(Debug, Clone)]
pub struct PreparedGetMap {
    pub request: GetMapRequest,
    pub envelope: Envelope,
}

/// Where a legend image can be obtained.
#[derive(Debug, Clone)]
pub enum LegendSource {
    /// The style advertises a static legend image
    Url(String),
    /// The legend has to be rendered by the server
    Request(GetLegendGraphicRequest),
}

#[derive(Debug, Clone)]
pub struct WmsResource {
    capabilities: Arc<Capabilities>,
    layers: Vec<String>,
    options: ResourceOptions,
}

impl WmsResource {
    pub fn new(
        capabilities: Arc<Capabilities>,
        layers: Vec<String>,
        options: ResourceOptions,
    ) -> OgcResult<Self> {
        if layers.is_empty() || layers.iter().any(|l| l.trim().is_empty()) {
            return Err(OgcError::MissingParameter("LAYERS".to_string()));
        }
        if !options.styles.is_empty() && options.styles.len() != layers.len() {
            return Err(OgcError::invalid_parameter(
                "STYLES",
                format!(
                    "{} styles given for {} layers",
                    options.styles.len(),
                    layers.len()
                ),
            ));
        }
        Ok(Self {
            capabilities,
            layers,
            options,
        })
    }

    pub fn layers(&self) -> &[String] {
        &self.layers
    }

    pub fn options(&self) -> &ResourceOptions {
        &self.options
    }

    pub fn version(&self) -> WmsVersion {
        self.capabilities.version
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Capabilities of the first layer, the one that drives defaulting.
    fn primary_layer(&self) -> Option<&CapabilitiesLayer> {
        let name = &self.layers[0];
        match self.capabilities.layer(name) {
            Ok(layer) => Some(layer),
            Err(e) => {
                warn!(layer = %name, error = %e, "Layer missing from capabilities");
                None
            }
        }
    }

    /// Build the GetMap request for `envelope` at the given image size.
    pub fn prepare_get_map(
        &self,
        envelope: &Envelope,
        width: u32,
        height: u32,
    ) -> OgcResult<PreparedGetMap> {
        if !envelope.bbox.is_valid() {
            return Err(OgcError::InvalidBbox(format!("{:?}", envelope.bbox)));
        }
        let version = self.version();
        let layer = self.primary_layer();

        let mut requested = match layer {
            Some(layer) => self.reconcile_crs(layer, envelope),
            None => reproject_or_keep(envelope, &CrsCode::WGS84),
        };

        if version == WmsVersion::V1_3_0
            && self.options.force_longitude_first
            && requested.crs == CrsCode::WGS84
        {
            requested.crs = CrsCode::Crs84;
        } else if version == WmsVersion::V1_1_1 && requested.crs == CrsCode::Crs84 {
            // 1.1.1 has no CRS:84
            requested.crs = CrsCode::WGS84;
        }

        if let (Some(layer), Some(time)) = (layer, requested.time) {
            if self.options.match_capabilities_dates {
                requested.time = Some(snap_time(layer, time));
            }
        }

        if !self.capabilities.map_formats.is_empty()
            && !self.capabilities.supports_map_format(&self.options.format)
        {
            warn!(format = %self.options.format, "Format not advertised by the server");
        }

        let mut request = GetMapRequest::new(version)
            .layers(self.layers.iter().cloned())
            .styles(self.resolve_styles(layer.is_some()))
            .envelope(requested.clone())
            .size(width, height)
            .format(self.options.format.clone())
            .transparent(self.options.transparent);
        request.exceptions = self.options.exceptions.clone();
        request.sld = self.options.sld.clone();
        request.sld_body = self.options.sld_body.clone();

        debug!(
            layers = %self.layers.join(","),
            crs = %requested.crs,
            "Prepared GetMap request"
        );

        Ok(PreparedGetMap {
            request,
            envelope: requested,
        })
    }

    /// Build a GetFeatureInfo request for pixel (`x`, `y`) of the image the
    /// caller rendered for `envelope`.
    #[allow(clippy::too_many_arguments)]
    pub fn prepare_get_feature_info(
        &self,
        envelope: &Envelope,
        width: u32,
        height: u32,
        x: u32,
        y: u32,
        info_format: Option<&str>,
        feature_count: Option<u32>,
    ) -> OgcResult<GetFeatureInfoRequest> {
        if x >= width || y >= height {
            return Err(OgcError::invalid_parameter(
                "I/J",
                format!("pixel ({x}, {y}) is outside the {width}x{height} image"),
            ));
        }
        let prepared = self.prepare_get_map(envelope, width, height)?;

        // The requested envelope may differ from the caller's one, so the
        // pixel has to be located again in the requested image.
        let (i, j) = if prepared.envelope.bbox == envelope.bbox {
            (x, y)
        } else {
            let (cx, cy) = envelope.pixel_to_coordinate(x as f64, y as f64, width, height);
            let (tx, ty) = transform_point(&envelope.crs, &prepared.envelope.crs, cx, cy)?;
            let (fi, fj) = prepared.envelope.coordinate_to_pixel(tx, ty, width, height);
            (clamp_pixel(fi, width), clamp_pixel(fj, height))
        };

        let info_format = info_format.map(str::to_string).or_else(|| {
            InfoFormat::negotiate(&PREFERRED_INFO_FORMATS, &self.capabilities.info_formats)
        });

        let mut request = GetFeatureInfoRequest::new(prepared.request, i, j)
            .query_layers(self.layers.iter().cloned());
        request.info_format = info_format;
        request.feature_count = feature_count;
        Ok(request)
    }

    /// Legend of the first layer for the style that will be rendered.
    pub fn prepare_get_legend(&self, width: Option<u32>, height: Option<u32>) -> OgcResult<LegendSource> {
        let name = &self.layers[0];
        let explicit_style = self.options.styles.first().filter(|s| !s.is_empty());

        if let Some(layer) = self.primary_layer() {
            let style = match explicit_style {
                Some(s) => layer.style(s),
                None => layer.default_style(),
            };
            if let Some(legend) = style.and_then(|s| s.legend.as_ref()) {
                if !legend.href.is_empty() {
                    return Ok(LegendSource::Url(legend.href.clone()));
                }
            }
        }

        let mut request = GetLegendGraphicRequest::new(self.version(), name.clone())
            .format(self.options.format.clone());
        if let Some(style) = explicit_style {
            request = request.style(style.clone());
        }
        request.width = width;
        request.height = height;
        request.sld = self.options.sld.clone();
        request.sld_body = self.options.sld_body.clone();
        request.exceptions = self.options.exceptions.clone();
        Ok(LegendSource::Request(request))
    }

    /// Geographic extent of the first layer, in CRS:84.
    pub fn bounds(&self) -> BoundingBox {
        let Some(layer) = self.primary_layer() else {
            return WORLD_WGS84;
        };
        if let Some(bbox) = layer.geographic_bbox {
            return bbox;
        }
        let derived = layer.bounding_boxes.iter().find_map(|(crs, bbox)| {
            Envelope::new(crs.clone(), *bbox)
                .transform_to(&CrsCode::Crs84)
                .ok()
                .map(|e| e.bbox)
        });
        derived.unwrap_or_else(|| {
            warn!(layer = %self.layers[0], "Layer declares no usable extent, using world");
            WORLD_WGS84
        })
    }

    fn reconcile_crs(&self, layer: &CapabilitiesLayer, envelope: &Envelope) -> Envelope {
        if layer.supports_crs(&envelope.crs) || layer.crs.is_empty() {
            return envelope.clone();
        }
        // CRS:84 and EPSG:4326 share x/y coordinates here
        if envelope.crs.is_wgs84_equivalent() {
            if let Some(crs) = [CrsCode::Crs84, CrsCode::WGS84]
                .into_iter()
                .find(|c| layer.supports_crs(c))
            {
                return Envelope {
                    crs,
                    ..envelope.clone()
                };
            }
        }
        if !self.options.use_local_reprojection {
            return envelope.clone();
        }
        match best_crs(layer, &envelope.crs) {
            Some(target) => reproject_or_keep(envelope, &target),
            None => {
                warn!(
                    crs = %envelope.crs,
                    "No supported CRS reachable from the envelope CRS"
                );
                envelope.clone()
            }
        }
    }

    fn resolve_styles(&self, layer_known: bool) -> Vec<String> {
        if !self.options.styles.is_empty() {
            return self.options.styles.clone();
        }
        if !layer_known {
            return Vec::new();
        }
        let defaults: Vec<String> = self
            .layers
            .iter()
            .map(|name| {
                self.capabilities
                    .layer(name)
                    .ok()
                    .and_then(CapabilitiesLayer::default_style)
                    .map(|s| s.name.clone())
                    .unwrap_or_default()
            })
            .collect();
        if defaults.iter().all(String::is_empty) {
            Vec::new()
        } else {
            defaults
        }
    }
}

/// Target CRS for local reprojection.
fn best_crs(layer: &CapabilitiesLayer, source: &CrsCode) -> Option<CrsCode> {
    let preferred = [CrsCode::Crs84, CrsCode::WGS84, CrsCode::WEB_MERCATOR];
    preferred
        .into_iter()
        .find(|c| layer.supports_crs(c) && source.can_transform_to(c))
        .or_else(|| {
            layer
                .crs
                .iter()
                .find(|c| source.can_transform_to(c))
                .cloned()
        })
}

fn reproject_or_keep(envelope: &Envelope, target: &CrsCode) -> Envelope {
    match envelope.transform_to(target) {
        Ok(reprojected) => reprojected,
        Err(e) => {
            warn!(
                from = %envelope.crs,
                to = %target,
                error = %e,
                "Envelope reprojection failed, keeping original CRS"
            );
            envelope.clone()
        }
    }
}

fn snap_time(layer: &CapabilitiesLayer, time: TimeRange) -> TimeRange {
    let Some(dimension) = layer.time_dimension() else {
        return time;
    };
    match dimension.time_values() {
        Ok(values) => {
            let snap = |t: DateTime<Utc>| values.nearest(&t).unwrap_or(t);
            TimeRange::new(snap(time.start), snap(time.end))
        }
        Err(e) => {
            warn!(error = %e, "Unparseable time dimension, sending requested time");
            time
        }
    }
}

fn clamp_pixel(value: f64, size: u32) -> u32 {
    value.round().clamp(0.0, size.saturating_sub(1) as f64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{LegendUrl, StyleInfo};

    fn caps(version: WmsVersion, crs: Vec<CrsCode>) -> Arc<Capabilities> {
        Arc::new(Capabilities {
            version,
            layers: vec![CapabilitiesLayer {
                name: Some("roads".to_string()),
                title: "Roads".to_string(),
                crs,
                styles: vec![StyleInfo {
                    name: "default".to_string(),
                    legend: Some(LegendUrl {
                        href: "http://host/legend.png".to_string(),
                        ..Default::default()
                    }),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        })
    }

    #[test]
    fn test_requires_layers() {
        let caps = caps(WmsVersion::V1_3_0, vec![]);
        assert!(WmsResource::new(caps, vec![], ResourceOptions::default()).is_err());
    }

    #[test]
    fn test_crs84_sent_as_4326_on_1_1_1() {
        let caps = caps(WmsVersion::V1_1_1, vec![CrsCode::WGS84]);
        let resource =
            WmsResource::new(caps, vec!["roads".to_string()], ResourceOptions::default()).unwrap();
        let prepared = resource
            .prepare_get_map(&Envelope::wgs84_world(), 512, 256)
            .unwrap();
        assert_eq!(prepared.envelope.crs, CrsCode::WGS84);
        assert_eq!(prepared.request.styles, vec!["default".to_string()]);
    }

    #[test]
    fn test_legend_url_preferred() {
        let caps = caps(WmsVersion::V1_3_0, vec![CrsCode::WGS84]);
        let resource =
            WmsResource::new(caps, vec!["roads".to_string()], ResourceOptions::default()).unwrap();
        match resource.prepare_get_legend(None, None).unwrap() {
            LegendSource::Url(url) => assert_eq!(url, "http://host/legend.png"),
            other => panic!("unexpected legend source {:?}", other),
        }
    }

    #[test]
    fn test_clamp_pixel() {
        assert_eq!(clamp_pixel(-3.2, 10), 0);
        assert_eq!(clamp_pixel(4.4, 10), 4);
        assert_eq!(clamp_pixel(12.0, 10), 9);
    }
}
