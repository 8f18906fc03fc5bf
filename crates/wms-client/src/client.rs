//! Async WMS client.
//!
//! Fetches and caches capabilities, builds [`WmsResource`]s from them and
//! executes prepared requests. Exception reports returned by the server are
//! surfaced as [`OgcError::ServiceException`].

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::{header, Client};
use tracing::{debug, info, instrument, warn};

use ogc_common::kvp::QueryParams;
use ogc_common::{Envelope, OgcError, OgcResult};

use crate::capabilities::Capabilities;
use crate::capabilities_cache::CapabilitiesCache;
use crate::config::ClientConfig;
use crate::exceptions::{exception_report_to_error, looks_like_exception};
use crate::getfeatureinfo::GetFeatureInfoRequest;
use crate::getlegend::GetLegendGraphicRequest;
use crate::resource::{PreparedGetMap, ResourceOptions, WmsResource};

/// A successful response body with its content type.
#[derive(Debug, Clone)]
pub struct WmsResponse {
    pub content_type: Option<String>,
    pub body: Bytes,
}

pub struct WmsClient {
    http: Client,
    config: ClientConfig,
    cache: CapabilitiesCache,
}

impl WmsClient {
    /// Create a client for the configured server.
    pub fn new(config: ClientConfig) -> OgcResult<Self> {
        config.validate().map_err(OgcError::Config)?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs.min(30)))
            .build()
            .map_err(|e| OgcError::Http(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            base_url = %config.base_url,
            version = %config.version,
            "Created WMS client"
        );

        Ok(Self {
            http,
            cache: CapabilitiesCache::new(config.capabilities_ttl_secs),
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn get_capabilities_url(&self) -> String {
        let mut params = QueryParams::new();
        params.set("SERVICE", "WMS");
        params.set("REQUEST", "GetCapabilities");
        params.set("VERSION", self.config.version.as_str());
        params.to_url(&self.config.base_url)
    }

    /// Capabilities of the server, from cache while they are fresh.
    pub async fn capabilities(&self) -> OgcResult<Arc<Capabilities>> {
        let url = self.get_capabilities_url();
        if let Some(cached) = self.cache.get(&url).await {
            return Ok(cached);
        }

        let response = self.fetch(&url).await?;
        let text = String::from_utf8_lossy(&response.body);
        let capabilities = Arc::new(Capabilities::from_xml(&text)?);

        if capabilities.version != self.config.version {
            warn!(
                requested = %self.config.version,
                returned = %capabilities.version,
                "Server answered with another WMS version"
            );
        }

        self.cache.set(&url, Arc::clone(&capabilities)).await;
        Ok(capabilities)
    }

    /// Forget cached capabilities so the next call refetches them.
    pub async fn invalidate_capabilities(&self) {
        self.cache.invalidate(&self.get_capabilities_url()).await;
    }

    /// A resource over `layers` using the configured request options.
    pub async fn resource<I, S>(&self, layers: I) -> OgcResult<WmsResource>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resource_with_options(layers, self.config.resource_options())
            .await
    }

    pub async fn resource_with_options<I, S>(
        &self,
        layers: I,
        options: ResourceOptions,
    ) -> OgcResult<WmsResource>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let capabilities = self.capabilities().await?;
        WmsResource::new(
            capabilities,
            layers.into_iter().map(Into::into).collect(),
            options,
        )
    }

    /// GET `url`, turning exception reports and HTTP failures into errors.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &str) -> OgcResult<WmsResponse> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| OgcError::Http(e.to_string()))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| OgcError::Http(e.to_string()))?;

        debug!(
            status = status.as_u16(),
            content_type = ?content_type,
            bytes = body.len(),
            "WMS response"
        );

        // Exception reports are sent with both success and error statuses
        if looks_like_exception(content_type.as_deref(), &body) {
            return Err(exception_report_to_error(&String::from_utf8_lossy(&body)));
        }
        if !status.is_success() {
            return Err(OgcError::Http(format!("HTTP {} for {}", status, url)));
        }

        Ok(WmsResponse { content_type, body })
    }

    pub async fn get_map(&self, prepared: &PreparedGetMap) -> OgcResult<WmsResponse> {
        let base = self
            .capabilities()
            .await?
            .get_map_url
            .clone()
            .unwrap_or_else(|| self.config.base_url.clone());
        self.fetch(&prepared.request.to_url(&base)?).await
    }

    /// Prepare and fetch a map in one go.
    pub async fn get_map_for(
        &self,
        resource: &WmsResource,
        envelope: &Envelope,
        width: u32,
        height: u32,
    ) -> OgcResult<WmsResponse> {
        let prepared = resource.prepare_get_map(envelope, width, height)?;
        self.get_map(&prepared).await
    }

    pub async fn get_feature_info(&self, request: &GetFeatureInfoRequest) -> OgcResult<WmsResponse> {
        let capabilities = self.capabilities().await?;
        let base = capabilities
            .get_feature_info_url
            .as_deref()
            .or(capabilities.get_map_url.as_deref())
            .unwrap_or(&self.config.base_url);
        self.fetch(&request.to_url(base)?).await
    }

    pub async fn get_legend_graphic(
        &self,
        request: &GetLegendGraphicRequest,
    ) -> OgcResult<WmsResponse> {
        let capabilities = self.capabilities().await?;
        let base = capabilities
            .get_legend_graphic_url
            .as_deref()
            .unwrap_or(&self.config.base_url);
        self.fetch(&request.to_url(base)?).await
    }
}
