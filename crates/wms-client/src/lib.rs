//! OGC WMS client.
//!
//! Supports:
//! - WMS 1.1.1 and WMS 1.3.0 capabilities parsing
//! - GetMap, GetFeatureInfo and GetLegendGraphic request building
//! - Capability-driven request preparation (CRS reconciliation, style and
//!   dimension defaulting) through [`WmsResource`]

pub mod capabilities;
pub mod capabilities_cache;
pub mod client;
pub mod config;
pub mod exceptions;
pub mod getfeatureinfo;
pub mod getlegend;
pub mod getmap;
pub mod resource;
pub mod version;

pub use capabilities::{Capabilities, CapabilitiesLayer, DimensionInfo, LegendUrl, StyleInfo};
pub use client::{WmsClient, WmsResponse};
pub use config::ClientConfig;
pub use exceptions::ServiceException;
pub use getfeatureinfo::{GetFeatureInfoRequest, InfoFormat};
pub use getlegend::GetLegendGraphicRequest;
pub use getmap::GetMapRequest;
pub use ogc_common::kvp::QueryParams;
pub use ogc_common::{OgcError, OgcResult};
pub use resource::{LegendSource, PreparedGetMap, ResourceOptions, WmsResource};
pub use version::WmsVersion;
