//! GetFeature and GetPropertyValue requests.

use serde::{Deserialize, Serialize};

use ogc_common::{OgcError, OgcResult, QueryParams};

use crate::query::{queries_to_kvp, write_queries, QueryExpression};
use crate::types::{
    ResolveValue, ResultType, DEFAULT_FORMAT, DEFAULT_RESOLVE_DEPTH, DEFAULT_RESOLVE_TIMEOUT,
    WFS_SERVICE, WFS_VERSION,
};
use crate::xml::{children, open_root, reader, Attrs, Builder, Element, XmlReader};

/// A GetFeature request. Unset optional attributes keep their schema
/// defaults, which the accessor methods apply.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetFeature {
    pub service: Option<String>,
    pub version: Option<String>,
    pub handle: Option<String>,
    pub queries: Vec<QueryExpression>,
    pub count: Option<u64>,
    pub start_index: Option<u64>,
    pub result_type: Option<ResultType>,
    pub output_format: Option<String>,
    pub resolve: Option<ResolveValue>,
    pub resolve_depth: Option<String>,
    pub resolve_timeout: Option<u64>,
}

impl GetFeature {
    pub fn new(query: impl Into<QueryExpression>) -> Self {
        Self {
            queries: vec![query.into()],
            ..Default::default()
        }
    }

    pub fn service(&self) -> &str {
        self.service.as_deref().unwrap_or(WFS_SERVICE)
    }

    pub fn version(&self) -> &str {
        self.version.as_deref().unwrap_or(WFS_VERSION)
    }

    pub fn start_index(&self) -> u64 {
        self.start_index.unwrap_or(0)
    }

    pub fn result_type(&self) -> ResultType {
        self.result_type.unwrap_or_default()
    }

    pub fn output_format(&self) -> &str {
        self.output_format.as_deref().unwrap_or(DEFAULT_FORMAT)
    }

    pub fn resolve(&self) -> ResolveValue {
        self.resolve.unwrap_or_default()
    }

    pub fn resolve_depth(&self) -> &str {
        self.resolve_depth.as_deref().unwrap_or(DEFAULT_RESOLVE_DEPTH)
    }

    pub fn resolve_timeout(&self) -> u64 {
        self.resolve_timeout.unwrap_or(DEFAULT_RESOLVE_TIMEOUT)
    }

    pub fn to_xml(&self) -> OgcResult<String> {
        if self.queries.is_empty() {
            return Err(OgcError::MissingParameter("Query".to_string()));
        }

        let mut xml = Builder::new();
        xml.declaration()?;
        let attrs = self.root_attrs();
        xml.start("wfs:GetFeature", &attrs.refs())?;
        write_queries(&mut xml, &self.queries)?;
        xml.end("wfs:GetFeature")?;
        xml.into_string()
    }

    pub fn from_xml(xml: &str) -> OgcResult<Self> {
        let mut reader = reader(xml);
        let root = open_root(&mut reader, "GetFeature")?;
        Self::read(&mut reader, &root)
    }

    /// KVP encoding for HTTP GET.
    pub fn to_kvp(&self) -> OgcResult<QueryParams> {
        let mut params = self.base_kvp("GetFeature");
        queries_to_kvp(&self.queries, &mut params)?;
        Ok(params)
    }

    /// Attributes of the request element. Only explicitly set optional
    /// attributes are written.
    pub(crate) fn root_attrs(&self) -> Attrs {
        let mut attrs = Attrs::wfs_root();
        attrs
            .push("service", self.service())
            .push("version", self.version())
            .push_opt("handle", self.handle.as_deref())
            .push_opt("count", self.count)
            .push_opt("startIndex", self.start_index)
            .push_opt("resultType", self.result_type)
            .push_opt("outputFormat", self.output_format.as_deref())
            .push_opt("resolve", self.resolve)
            .push_opt("resolveDepth", self.resolve_depth.as_deref())
            .push_opt("resolveTimeout", self.resolve_timeout);
        attrs
    }

    pub(crate) fn base_kvp(&self, request: &str) -> QueryParams {
        let mut params = QueryParams::new();
        params.set("SERVICE", self.service());
        params.set("VERSION", self.version());
        params.set("REQUEST", request);
        params.set_opt("COUNT", self.count.map(|c| c.to_string()));
        params.set_opt("STARTINDEX", self.start_index.map(|i| i.to_string()));
        params.set_opt("RESULTTYPE", self.result_type.map(|r| r.to_string()));
        params.set_opt("OUTPUTFORMAT", self.output_format.as_deref());
        params.set_opt("RESOLVE", self.resolve.map(|r| r.to_string()));
        params.set_opt("RESOLVEDEPTH", self.resolve_depth.as_deref());
        params.set_opt("RESOLVETIMEOUT", self.resolve_timeout.map(|t| t.to_string()));
        params
    }

    pub(crate) fn read(reader: &mut XmlReader<'_>, root: &Element) -> OgcResult<Self> {
        let mut request = GetFeature {
            service: root.attr_string("service"),
            version: root.attr_string("version"),
            handle: root.attr_string("handle"),
            queries: Vec::new(),
            count: root.attr_parse("count")?,
            start_index: root.attr_parse("startIndex")?,
            result_type: root.attr_parse("resultType")?,
            output_format: root.attr_string("outputFormat"),
            resolve: root.attr_parse("resolve")?,
            resolve_depth: root.attr_string("resolveDepth"),
            resolve_timeout: root.attr_parse("resolveTimeout")?,
        };

        children(reader, root, |r, child| {
            match QueryExpression::read(r, child)? {
                Some(query) => {
                    request.queries.push(query);
                    Ok(true)
                }
                None => Ok(false),
            }
        })?;

        Ok(request)
    }
}

/// GetPropertyValue: the values at `value_reference` of the features the
/// single query of `request` selects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetPropertyValue {
    pub value_reference: String,
    pub resolve_path: Option<String>,
    pub request: GetFeature,
}

impl GetPropertyValue {
    pub fn new(value_reference: impl Into<String>, query: impl Into<QueryExpression>) -> Self {
        Self {
            value_reference: value_reference.into(),
            resolve_path: None,
            request: GetFeature::new(query),
        }
    }

    pub fn query(&self) -> Option<&QueryExpression> {
        self.request.queries.first()
    }

    fn single_query(&self) -> OgcResult<&QueryExpression> {
        match self.request.queries.as_slice() {
            [query] => Ok(query),
            [] => Err(OgcError::MissingParameter("Query".to_string())),
            _ => Err(OgcError::invalid_parameter(
                "Query",
                "GetPropertyValue takes exactly one query",
            )),
        }
    }

    pub fn to_xml(&self) -> OgcResult<String> {
        let query = self.single_query()?;

        let mut xml = Builder::new();
        xml.declaration()?;
        let mut attrs = self.request.root_attrs();
        attrs
            .push("valueReference", self.value_reference.as_str())
            .push_opt("resolvePath", self.resolve_path.as_deref());
        xml.start("wfs:GetPropertyValue", &attrs.refs())?;
        query.write(&mut xml)?;
        xml.end("wfs:GetPropertyValue")?;
        xml.into_string()
    }

    pub fn from_xml(xml: &str) -> OgcResult<Self> {
        let mut reader = reader(xml);
        let root = open_root(&mut reader, "GetPropertyValue")?;
        let value_reference = root.require_attr("valueReference")?;
        let resolve_path = root.attr_string("resolvePath");
        let request = GetFeature::read(&mut reader, &root)?;
        Ok(Self {
            value_reference,
            resolve_path,
            request,
        })
    }

    pub fn to_kvp(&self) -> OgcResult<QueryParams> {
        let query = self.single_query()?;
        let mut params = self.request.base_kvp("GetPropertyValue");
        params.set("VALUEREFERENCE", self.value_reference.as_str());
        params.set_opt("RESOLVEPATH", self.resolve_path.as_deref());
        queries_to_kvp(std::slice::from_ref(query), &mut params)?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Query, StoredQuery};
    use crate::types::Value;

    #[test]
    fn test_defaults_are_applied_lazily() {
        let request = GetFeature::new(Query::new("topp:states"));
        assert_eq!(request.service(), "WFS");
        assert_eq!(request.version(), "2.0.0");
        assert_eq!(request.result_type(), ResultType::Results);
        assert_eq!(request.output_format(), "application/gml+xml; version=3.2");
        assert_eq!(request.start_index(), 0);
        assert_eq!(request.resolve(), ResolveValue::None);
        assert_eq!(request.resolve_depth(), "*");
        assert_eq!(request.resolve_timeout(), 300);

        // Defaults are not written back into the document
        let xml = request.to_xml().unwrap();
        assert!(!xml.contains("resultType"));
        assert!(!xml.contains("outputFormat"));
    }

    #[test]
    fn test_to_xml() {
        let mut request = GetFeature::new(
            Query::new("topp:states")
                .with_property_names(["STATE_NAME"])
                .with_filter("<fes:ResourceId rid=\"states.1\"/>"),
        );
        request.count = Some(10);
        request.result_type = Some(ResultType::Hits);

        let xml = request.to_xml().unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains(r#"<wfs:GetFeature xmlns:wfs="http://www.opengis.net/wfs/2.0""#));
        assert!(xml.contains(r#"service="WFS" version="2.0.0" count="10" resultType="hits""#));
        assert!(xml.contains(
            r#"<wfs:Query typeNames="topp:states"><wfs:PropertyName>STATE_NAME</wfs:PropertyName><fes:Filter><fes:ResourceId rid="states.1"/></fes:Filter></wfs:Query>"#
        ));
    }

    #[test]
    fn test_empty_request_is_rejected() {
        assert!(matches!(
            GetFeature::default().to_xml(),
            Err(OgcError::MissingParameter(_))
        ));
    }

    #[test]
    fn test_to_kvp() {
        let mut request = GetFeature::new(Query::new("topp:states"));
        request.count = Some(5);
        request.start_index = Some(10);
        request.output_format = Some("application/json".to_string());

        let params = request.to_kvp().unwrap();
        assert_eq!(
            params.to_query_string(),
            "SERVICE=WFS&VERSION=2.0.0&REQUEST=GetFeature&COUNT=5&STARTINDEX=10&OUTPUTFORMAT=application%2Fjson&TYPENAMES=topp%3Astates"
        );
    }

    #[test]
    fn test_stored_query_round_trip() {
        let request = GetFeature::new(
            StoredQuery::new("urn:ogc:def:query:OGC-WFS::GetFeatureById")
                .with_parameter("ID", Value::text("states.1")),
        );
        let parsed = GetFeature::from_xml(&request.to_xml().unwrap()).unwrap();
        assert_eq!(parsed.queries, request.queries);
        assert_eq!(parsed.service.as_deref(), Some("WFS"));
    }

    #[test]
    fn test_get_property_value() {
        let request = GetPropertyValue::new("topp:STATE_NAME", Query::new("topp:states"));

        let xml = request.to_xml().unwrap();
        assert!(xml.contains(r#"valueReference="topp:STATE_NAME""#));
        let parsed = GetPropertyValue::from_xml(&xml).unwrap();
        assert_eq!(parsed.value_reference, "topp:STATE_NAME");
        assert_eq!(parsed.query(), request.query());

        let params = request.to_kvp().unwrap();
        assert_eq!(params.get("REQUEST"), Some("GetPropertyValue"));
        assert_eq!(params.get("VALUEREFERENCE"), Some("topp:STATE_NAME"));
        assert_eq!(params.get("TYPENAMES"), Some("topp:states"));
    }

    #[test]
    fn test_get_property_value_needs_one_query() {
        let mut request = GetPropertyValue::new("NAME", Query::new("a"));
        request.request.queries.push(Query::new("b").into());
        assert!(request.to_xml().is_err());
        request.request.queries.clear();
        assert!(matches!(
            request.to_kvp(),
            Err(OgcError::MissingParameter(_))
        ));
    }
}
