//! Error types for the GeotoolKit OGC crates.

use thiserror::Error;

/// Result type alias using OgcError.
pub type OgcResult<T> = Result<T, OgcError>;

/// Primary error type for OGC client operations.
#[derive(Debug, Error)]
pub enum OgcError {
    // === Request Validation Errors ===
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Invalid CRS: {0}")]
    InvalidCrs(String),

    #[error("Invalid BBOX: {0}")]
    InvalidBbox(String),

    #[error("Invalid time specification: {0}")]
    InvalidTime(String),

    #[error("Requested format not supported: {0}")]
    UnsupportedFormat(String),

    // === Capabilities Errors ===
    #[error("Layer not found in capabilities: {0}")]
    LayerNotFound(String),

    #[error("Style not found: {0}")]
    StyleNotFound(String),

    // === Document Errors ===
    #[error("XML error: {0}")]
    Xml(String),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Service exception [{code}]: {message}")]
    ServiceException { code: String, message: String },

    // === Infrastructure Errors ===
    #[error("Projection error: {0}")]
    Projection(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl OgcError {
    /// Get the OGC exception code matching this error.
    pub fn exception_code(&self) -> &str {
        match self {
            OgcError::MissingParameter(_) => "MissingParameterValue",
            OgcError::InvalidParameter { .. } => "InvalidParameterValue",
            OgcError::LayerNotFound(_) => "LayerNotDefined",
            OgcError::StyleNotFound(_) => "StyleNotDefined",
            OgcError::InvalidCrs(_) => "InvalidCRS",
            OgcError::InvalidBbox(_) => "InvalidBBox",
            OgcError::InvalidTime(_) => "InvalidDimensionValue",
            OgcError::UnsupportedFormat(_) => "InvalidFormat",
            OgcError::ServiceException { code, .. } => code,
            _ => "NoApplicableCode",
        }
    }

    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        OgcError::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }
}

impl From<quick_xml::Error> for OgcError {
    fn from(err: quick_xml::Error) -> Self {
        OgcError::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for OgcError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        OgcError::Xml(format!("attribute error: {}", err))
    }
}

impl From<std::io::Error> for OgcError {
    fn from(err: std::io::Error) -> Self {
        OgcError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for OgcError {
    fn from(err: serde_json::Error) -> Self {
        OgcError::MalformedDocument(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_codes() {
        assert_eq!(
            OgcError::MissingParameter("LAYERS".into()).exception_code(),
            "MissingParameterValue"
        );
        assert_eq!(
            OgcError::LayerNotFound("roads".into()).exception_code(),
            "LayerNotDefined"
        );
        let remote = OgcError::ServiceException {
            code: "OperationNotSupported".into(),
            message: "nope".into(),
        };
        assert_eq!(remote.exception_code(), "OperationNotSupported");
        assert_eq!(
            OgcError::Projection("x".into()).exception_code(),
            "NoApplicableCode"
        );
    }
}
