//! OWS 1.1 exception reports returned by WFS 2.0 servers.

use serde::{Deserialize, Serialize};

use ogc_common::{OgcError, OgcResult};

use crate::xml::{children, open_root, reader, text, Attrs, Builder, Element, XmlReader, OWS_NAMESPACE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwsException {
    pub code: String,
    pub locator: Option<String>,
    pub texts: Vec<String>,
}

impl OwsException {
    pub fn new(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            locator: None,
            texts: vec![text.into()],
        }
    }

    pub fn message(&self) -> String {
        self.texts.join("; ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExceptionReport {
    pub version: Option<String>,
    pub lang: Option<String>,
    pub exceptions: Vec<OwsException>,
}

impl ExceptionReport {
    pub fn from_xml(xml: &str) -> OgcResult<Self> {
        let mut reader = reader(xml);
        let root = open_root(&mut reader, "ExceptionReport")?;
        Self::read(&mut reader, &root)
    }

    pub(crate) fn read(reader: &mut XmlReader<'_>, root: &Element) -> OgcResult<Self> {
        let mut report = ExceptionReport {
            version: root.attr_string("version"),
            lang: root.attr_string("lang"),
            exceptions: Vec::new(),
        };

        children(reader, root, |r, child| {
            if child.name != "Exception" {
                return Ok(false);
            }
            let mut exception = OwsException {
                code: child
                    .attr_string("exceptionCode")
                    .unwrap_or_else(|| "NoApplicableCode".to_string()),
                locator: child.attr_string("locator"),
                texts: Vec::new(),
            };
            children(r, child, |r, grandchild| {
                if grandchild.name == "ExceptionText" {
                    exception.texts.push(text(r, grandchild)?);
                    return Ok(true);
                }
                Ok(false)
            })?;
            report.exceptions.push(exception);
            Ok(true)
        })?;

        Ok(report)
    }

    pub fn to_xml(&self) -> OgcResult<String> {
        let mut xml = Builder::new();
        xml.declaration()?;

        let mut attrs = Attrs::new();
        attrs
            .push("xmlns:ows", OWS_NAMESPACE)
            .push("version", self.version.as_deref().unwrap_or("2.0.0"))
            .push_opt("xml:lang", self.lang.as_deref());
        xml.start("ows:ExceptionReport", &attrs.refs())?;

        for exception in &self.exceptions {
            let mut attrs = Attrs::new();
            attrs
                .push("exceptionCode", exception.code.as_str())
                .push_opt("locator", exception.locator.as_deref());
            xml.start("ows:Exception", &attrs.refs())?;
            for text in &exception.texts {
                xml.text_element("ows:ExceptionText", text)?;
            }
            xml.end("ows:Exception")?;
        }

        xml.end("ows:ExceptionReport")?;
        xml.into_string()
    }
}

impl From<ExceptionReport> for OgcError {
    /// The first exception of the report becomes the error.
    fn from(report: ExceptionReport) -> Self {
        match report.exceptions.into_iter().next() {
            Some(exception) => {
                let mut message = exception.message();
                if let Some(locator) = &exception.locator {
                    message = format!("{} (locator: {})", message, locator);
                }
                OgcError::ServiceException {
                    code: exception.code,
                    message,
                }
            }
            None => OgcError::ServiceException {
                code: "NoApplicableCode".to_string(),
                message: "empty exception report".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_without_text() {
        let report = ExceptionReport::from_xml(
            r#"<ows:ExceptionReport xmlns:ows="http://www.opengis.net/ows/1.1" version="2.0.0"><ows:Exception exceptionCode="OperationNotSupported"/></ows:ExceptionReport>"#,
        )
        .unwrap();
        assert_eq!(report.exceptions.len(), 1);
        assert!(report.exceptions[0].texts.is_empty());
        assert_eq!(report.exceptions[0].locator, None);
    }

    #[test]
    fn test_empty_report_still_an_error() {
        let error: OgcError = ExceptionReport::default().into();
        assert_eq!(error.exception_code(), "NoApplicableCode");
    }

    #[test]
    fn test_round_trip() {
        let mut exception = OwsException::new("MissingParameterValue", "TYPENAMES is required");
        exception.locator = Some("typeNames".to_string());
        let report = ExceptionReport {
            version: Some("2.0.0".to_string()),
            lang: Some("en".to_string()),
            exceptions: vec![exception],
        };
        let parsed = ExceptionReport::from_xml(&report.to_xml().unwrap()).unwrap();
        assert_eq!(parsed, report);
    }
}
