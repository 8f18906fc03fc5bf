//! WMS protocol versions and their wire differences.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use ogc_common::{AxisOrder, CrsCode, OgcError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WmsVersion {
    #[serde(rename = "1.1.1")]
    V1_1_1,
    #[serde(rename = "1.3.0")]
    #[default]
    V1_3_0,
}

impl WmsVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            WmsVersion::V1_1_1 => "1.1.1",
            WmsVersion::V1_3_0 => "1.3.0",
        }
    }

    /// Name of the CRS parameter: `SRS` before 1.3.0, `CRS` after.
    pub fn crs_param_name(&self) -> &'static str {
        match self {
            WmsVersion::V1_1_1 => "SRS",
            WmsVersion::V1_3_0 => "CRS",
        }
    }

    /// Names of the GetFeatureInfo pixel parameters (column, row).
    pub fn pixel_param_names(&self) -> (&'static str, &'static str) {
        match self {
            WmsVersion::V1_1_1 => ("X", "Y"),
            WmsVersion::V1_3_0 => ("I", "J"),
        }
    }

    /// Axis order of BBOX values for the given CRS.
    pub fn axis_order(&self, crs: &CrsCode) -> AxisOrder {
        match self {
            WmsVersion::V1_1_1 => crs.axis_order_wms_1_1(),
            WmsVersion::V1_3_0 => crs.axis_order_wms_1_3(),
        }
    }
}

impl fmt::Display for WmsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WmsVersion {
    type Err = OgcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1.1.1" | "1.1" => Ok(WmsVersion::V1_1_1),
            "1.3.0" | "1.3" => Ok(WmsVersion::V1_3_0),
            other => Err(OgcError::invalid_parameter(
                "VERSION",
                format!("unsupported WMS version: {}", other),
            )),
        }
    }
}
