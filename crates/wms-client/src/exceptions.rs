//! WMS service exception reports.
//!
//! Servers answer failed requests with a `ServiceExceptionReport` document
//! (usually with HTTP 200), e.g.
//! `<ServiceExceptionReport><ServiceException code="LayerNotDefined">...`.

use quick_xml::events::Event;
use quick_xml::Reader;

use ogc_common::xml::{attributes, local_name};
use ogc_common::{OgcError, OgcResult};

/// A single exception from a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceException {
    pub code: Option<String>,
    pub locator: Option<String>,
    pub message: String,
}

impl From<ServiceException> for OgcError {
    fn from(e: ServiceException) -> Self {
        OgcError::ServiceException {
            code: e.code.unwrap_or_else(|| "NoApplicableCode".to_string()),
            message: e.message,
        }
    }
}

/// Parse every `ServiceException` of a report.
pub fn parse_exception_report(xml: &str) -> OgcResult<Vec<ServiceException>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut found_report = false;
    let mut exceptions = Vec::new();
    let mut current: Option<ServiceException> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if local_name(&e) == "ServiceExceptionReport" => {
                found_report = true;
            }
            Event::Start(e) if local_name(&e) == "ServiceException" => {
                let attrs = attributes(&e)?;
                current = Some(ServiceException {
                    code: attrs.get("code").cloned(),
                    locator: attrs.get("locator").cloned(),
                    message: String::new(),
                });
            }
            Event::Empty(e) if local_name(&e) == "ServiceException" => {
                let attrs = attributes(&e)?;
                exceptions.push(ServiceException {
                    code: attrs.get("code").cloned(),
                    locator: attrs.get("locator").cloned(),
                    message: String::new(),
                });
            }
            Event::Text(t) => {
                if let Some(ex) = current.as_mut() {
                    ex.message.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some(ex) = current.as_mut() {
                    ex.message.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"ServiceException" => {
                if let Some(mut ex) = current.take() {
                    ex.message = ex.message.trim().to_string();
                    exceptions.push(ex);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !found_report {
        return Err(OgcError::MalformedDocument(
            "not a ServiceExceptionReport".to_string(),
        ));
    }
    Ok(exceptions)
}

/// Turn a report into the error it describes (the first exception wins).
pub fn exception_report_to_error(xml: &str) -> OgcError {
    match parse_exception_report(xml) {
        Ok(exceptions) => exceptions
            .into_iter()
            .next()
            .map(OgcError::from)
            .unwrap_or_else(|| OgcError::ServiceException {
                code: "NoApplicableCode".to_string(),
                message: "empty exception report".to_string(),
            }),
        Err(e) => e,
    }
}

/// Whether a response carries an exception report rather than the
/// requested payload.
pub fn looks_like_exception(content_type: Option<&str>, body: &[u8]) -> bool {
    if let Some(ct) = content_type {
        let ct = ct.to_ascii_lowercase();
        if ct.contains("vnd.ogc.se_xml") {
            return true;
        }
        if ct.starts_with("image/") {
            return false;
        }
    }
    let head = &body[..body.len().min(512)];
    let head = String::from_utf8_lossy(head);
    head.contains("ServiceExceptionReport")
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ServiceExceptionReport version="1.3.0" xmlns="http://www.opengis.net/ogc">
  <ServiceException code="LayerNotDefined" locator="LAYERS">
    Unknown layer: foo &amp; bar
  </ServiceException>
  <ServiceException>second</ServiceException>
</ServiceExceptionReport>"#;

    #[test]
    fn test_parse_report() {
        let exceptions = parse_exception_report(REPORT).unwrap();
        assert_eq!(exceptions.len(), 2);
        assert_eq!(exceptions[0].code.as_deref(), Some("LayerNotDefined"));
        assert_eq!(exceptions[0].locator.as_deref(), Some("LAYERS"));
        assert_eq!(exceptions[0].message, "Unknown layer: foo & bar");
        assert_eq!(exceptions[1].code, None);
    }

    #[test]
    fn test_report_to_error() {
        match exception_report_to_error(REPORT) {
            OgcError::ServiceException { code, message } => {
                assert_eq!(code, "LayerNotDefined");
                assert!(message.starts_with("Unknown layer"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_not_a_report() {
        assert!(matches!(
            parse_exception_report("<WMS_Capabilities/>"),
            Err(OgcError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_looks_like_exception() {
        assert!(looks_like_exception(
            Some("application/vnd.ogc.se_xml"),
            b"<x/>"
        ));
        assert!(looks_like_exception(Some("text/xml"), REPORT.as_bytes()));
        assert!(!looks_like_exception(Some("image/png"), REPORT.as_bytes()));
        assert!(!looks_like_exception(None, b"\x89PNG...."));
    }
}
