//! Query expressions: ad-hoc `wfs:Query` and `wfs:StoredQuery`.

use serde::{Deserialize, Serialize};

use ogc_common::{OgcError, OgcResult, QueryParams};

use crate::types::{SortOrder, Value};
use crate::xml::{
    children, filter_document, inner_xml, parse_value, text, value, write_filter, write_value,
    Attrs, Builder, Element, XmlReader,
};

/// Sort key of an ad-hoc query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortProperty {
    pub value_reference: String,
    pub sort_order: Option<SortOrder>,
}

impl SortProperty {
    pub fn new(value_reference: impl Into<String>, sort_order: Option<SortOrder>) -> Self {
        Self {
            value_reference: value_reference.into(),
            sort_order,
        }
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order.unwrap_or_default()
    }
}

/// Ad-hoc query over one or more feature types.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Query {
    pub type_names: Vec<String>,
    pub aliases: Vec<String>,
    pub srs_name: Option<String>,
    pub feature_version: Option<String>,
    pub handle: Option<String>,
    pub property_names: Vec<String>,
    /// Filter predicate as FES markup, without the enclosing `fes:Filter`.
    pub filter: Option<String>,
    pub sort_by: Vec<SortProperty>,
}

impl Query {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_names: vec![type_name.into()],
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, predicate: impl Into<String>) -> Self {
        self.filter = Some(predicate.into());
        self
    }

    pub fn with_property_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.property_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_srs_name(mut self, srs_name: impl Into<String>) -> Self {
        self.srs_name = Some(srs_name.into());
        self
    }

    pub fn sorted_by(mut self, value_reference: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by.push(SortProperty::new(value_reference, Some(order)));
        self
    }

    pub(crate) fn write(&self, xml: &mut Builder) -> OgcResult<()> {
        if self.type_names.is_empty() {
            return Err(OgcError::MissingParameter("typeNames".to_string()));
        }

        let mut attrs = Attrs::new();
        attrs.push("typeNames", self.type_names.join(" "));
        if !self.aliases.is_empty() {
            attrs.push("aliases", self.aliases.join(" "));
        }
        attrs
            .push_opt("srsName", self.srs_name.as_deref())
            .push_opt("featureVersion", self.feature_version.as_deref())
            .push_opt("handle", self.handle.as_deref());
        xml.start("wfs:Query", &attrs.refs())?;

        for name in &self.property_names {
            xml.text_element("wfs:PropertyName", name)?;
        }
        if let Some(filter) = &self.filter {
            write_filter(xml, filter)?;
        }
        if !self.sort_by.is_empty() {
            xml.start("fes:SortBy", &[])?;
            for property in &self.sort_by {
                xml.start("fes:SortProperty", &[])?;
                xml.text_element("fes:ValueReference", &property.value_reference)?;
                if let Some(order) = property.sort_order {
                    xml.text_element("fes:SortOrder", order.as_str())?;
                }
                xml.end("fes:SortProperty")?;
            }
            xml.end("fes:SortBy")?;
        }

        xml.end("wfs:Query")?;
        Ok(())
    }

    pub(crate) fn read(reader: &mut XmlReader<'_>, element: &Element) -> OgcResult<Self> {
        let mut query = Query {
            type_names: element.attr_list("typeNames"),
            aliases: element.attr_list("aliases"),
            srs_name: element.attr_string("srsName"),
            feature_version: element.attr_string("featureVersion"),
            handle: element.attr_string("handle"),
            ..Default::default()
        };

        children(reader, element, |r, child| {
            match child.name.as_str() {
                "PropertyName" => query.property_names.push(text(r, child)?),
                "Filter" => query.filter = Some(inner_xml(r, child)?),
                "SortBy" => query.sort_by = read_sort_by(r, child)?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;

        Ok(query)
    }
}

fn read_sort_by(reader: &mut XmlReader<'_>, element: &Element) -> OgcResult<Vec<SortProperty>> {
    let mut properties = Vec::new();
    children(reader, element, |r, child| {
        if child.name != "SortProperty" {
            return Ok(false);
        }
        let mut value_reference = String::new();
        let mut sort_order = None;
        children(r, child, |r, part| {
            match part.name.as_str() {
                "ValueReference" => value_reference = text(r, part)?,
                "SortOrder" => sort_order = Some(parse_value("SortOrder", &text(r, part)?)?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        properties.push(SortProperty {
            value_reference,
            sort_order,
        });
        Ok(true)
    })?;
    Ok(properties)
}

/// Named parameter value of a stored query invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: Value,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Invocation of a server-side stored query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoredQuery {
    pub id: String,
    pub handle: Option<String>,
    pub parameters: Vec<Parameter>,
}

impl StoredQuery {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameters.push(Parameter::new(name, value));
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    pub(crate) fn write(&self, xml: &mut Builder) -> OgcResult<()> {
        let mut attrs = Attrs::new();
        attrs
            .push("id", self.id.as_str())
            .push_opt("handle", self.handle.as_deref());
        xml.start("wfs:StoredQuery", &attrs.refs())?;
        for parameter in &self.parameters {
            write_value(
                xml,
                "wfs:Parameter",
                &[("name", parameter.name.as_str())],
                &parameter.value,
            )?;
        }
        xml.end("wfs:StoredQuery")?;
        Ok(())
    }

    pub(crate) fn read(reader: &mut XmlReader<'_>, element: &Element) -> OgcResult<Self> {
        let mut query = StoredQuery {
            id: element.require_attr("id")?,
            handle: element.attr_string("handle"),
            parameters: Vec::new(),
        };

        children(reader, element, |r, child| {
            if child.name != "Parameter" {
                return Ok(false);
            }
            let name = child.require_attr("name")?;
            query.parameters.push(Parameter {
                name,
                value: value(r, child)?,
            });
            Ok(true)
        })?;

        Ok(query)
    }
}

/// One query of a GetFeature, GetPropertyValue or LockFeature request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryExpression {
    AdHoc(Query),
    Stored(StoredQuery),
}

impl From<Query> for QueryExpression {
    fn from(query: Query) -> Self {
        QueryExpression::AdHoc(query)
    }
}

impl From<StoredQuery> for QueryExpression {
    fn from(query: StoredQuery) -> Self {
        QueryExpression::Stored(query)
    }
}

impl QueryExpression {
    pub(crate) fn write(&self, xml: &mut Builder) -> OgcResult<()> {
        match self {
            QueryExpression::AdHoc(query) => query.write(xml),
            QueryExpression::Stored(query) => query.write(xml),
        }
    }

    /// Parse `element` if it is a query expression.
    pub(crate) fn read(reader: &mut XmlReader<'_>, element: &Element) -> OgcResult<Option<Self>> {
        match element.name.as_str() {
            "Query" => Ok(Some(QueryExpression::AdHoc(Query::read(reader, element)?))),
            "StoredQuery" => Ok(Some(QueryExpression::Stored(StoredQuery::read(
                reader, element,
            )?))),
            _ => Ok(None),
        }
    }
}

pub(crate) fn write_queries(xml: &mut Builder, queries: &[QueryExpression]) -> OgcResult<()> {
    for query in queries {
        query.write(xml)?;
    }
    Ok(())
}

/// KVP parameters of a list of query expressions.
///
/// The KVP encoding carries either ad-hoc queries, whose list parameters are
/// parenthesized per query when there are several, or a single stored query.
pub(crate) fn queries_to_kvp(queries: &[QueryExpression], params: &mut QueryParams) -> OgcResult<()> {
    let mut ad_hoc = Vec::new();
    let mut stored = Vec::new();
    for query in queries {
        match query {
            QueryExpression::AdHoc(q) => ad_hoc.push(q),
            QueryExpression::Stored(q) => stored.push(q),
        }
    }

    match (ad_hoc.is_empty(), stored.as_slice()) {
        (true, []) => Err(OgcError::MissingParameter("TYPENAMES".to_string())),
        (true, [query]) => {
            params.set("STOREDQUERY_ID", query.id.as_str());
            for parameter in &query.parameters {
                let value = match &parameter.value {
                    Value::Text(text) | Value::Xml(text) => text.as_str(),
                };
                params.set(parameter.name.as_str(), value);
            }
            Ok(())
        }
        (true, _) => Err(OgcError::invalid_parameter(
            "STOREDQUERY_ID",
            "only one stored query can be encoded as KVP",
        )),
        (false, []) => {
            ad_hoc_to_kvp(&ad_hoc, params);
            Ok(())
        }
        (false, _) => Err(OgcError::invalid_parameter(
            "TYPENAMES",
            "ad-hoc and stored queries cannot be mixed in KVP",
        )),
    }
}

fn ad_hoc_to_kvp(queries: &[&Query], params: &mut QueryParams) {
    params.set_opt("TYPENAMES", list_param(queries, |q| joined(&q.type_names)));
    params.set_opt("ALIASES", list_param(queries, |q| joined(&q.aliases)));
    params.set_opt("SRSNAME", queries.iter().find_map(|q| q.srs_name.clone()));
    params.set_opt(
        "PROPERTYNAME",
        list_param(queries, |q| joined(&q.property_names)),
    );
    params.set_opt(
        "FILTER",
        list_param(queries, |q| q.filter.as_deref().map(filter_document)),
    );
    params.set_opt(
        "SORTBY",
        list_param(queries, |q| {
            let keys: Vec<String> = q
                .sort_by
                .iter()
                .map(|p| match p.sort_order {
                    Some(order) => format!("{} {}", p.value_reference, order),
                    None => p.value_reference.clone(),
                })
                .collect();
            joined(&keys)
        }),
    );
}

/// One value per query, `(a)(b)` when there are several.
fn list_param<F>(queries: &[&Query], f: F) -> Option<String>
where
    F: Fn(&Query) -> Option<String>,
{
    let values: Vec<Option<String>> = queries.iter().map(|q| f(q)).collect();
    if values.iter().all(Option::is_none) {
        return None;
    }
    if let [single] = values.as_slice() {
        return single.clone();
    }
    Some(
        values
            .into_iter()
            .map(|v| format!("({})", v.unwrap_or_default()))
            .collect(),
    )
}

fn joined(items: &[String]) -> Option<String> {
    (!items.is_empty()).then(|| items.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kvp(queries: &[QueryExpression]) -> OgcResult<QueryParams> {
        let mut params = QueryParams::new();
        queries_to_kvp(queries, &mut params)?;
        Ok(params)
    }

    #[test]
    fn test_single_query_kvp() {
        let query = Query::new("topp:states")
            .with_property_names(["STATE_NAME", "PERSONS"])
            .with_srs_name("EPSG:4326")
            .sorted_by("PERSONS", SortOrder::Desc);
        let params = kvp(&[query.into()]).unwrap();
        assert_eq!(params.get("TYPENAMES"), Some("topp:states"));
        assert_eq!(params.get("PROPERTYNAME"), Some("STATE_NAME,PERSONS"));
        assert_eq!(params.get("SRSNAME"), Some("EPSG:4326"));
        assert_eq!(params.get("SORTBY"), Some("PERSONS DESC"));
        assert_eq!(params.get("FILTER"), None);
    }

    #[test]
    fn test_multiple_queries_are_parenthesized() {
        let first = Query::new("topp:states").with_property_names(["STATE_NAME"]);
        let second = Query::new("tiger:roads");
        let params = kvp(&[first.into(), second.into()]).unwrap();
        assert_eq!(params.get("TYPENAMES"), Some("(topp:states)(tiger:roads)"));
        assert_eq!(params.get("PROPERTYNAME"), Some("(STATE_NAME)()"));
    }

    #[test]
    fn test_filter_is_a_standalone_document() {
        let query = Query::new("topp:states").with_filter("<fes:ResourceId rid=\"states.1\"/>");
        let params = kvp(&[query.into()]).unwrap();
        assert_eq!(
            params.get("FILTER"),
            Some("<fes:Filter xmlns:fes=\"http://www.opengis.net/fes/2.0\"><fes:ResourceId rid=\"states.1\"/></fes:Filter>")
        );
    }

    #[test]
    fn test_stored_query_kvp() {
        let query = StoredQuery::new("StatesByName").with_parameter("name", Value::text("Ohio"));
        let params = kvp(&[query.into()]).unwrap();
        assert_eq!(params.get("STOREDQUERY_ID"), Some("StatesByName"));
        assert_eq!(params.get("name"), Some("Ohio"));
        assert_eq!(params.get("TYPENAMES"), None);
    }

    #[test]
    fn test_kvp_rejects_unencodable_query_lists() {
        assert!(matches!(kvp(&[]), Err(OgcError::MissingParameter(_))));

        let mixed: Vec<QueryExpression> =
            vec![Query::new("a").into(), StoredQuery::new("b").into()];
        assert!(kvp(&mixed).is_err());

        let two_stored: Vec<QueryExpression> =
            vec![StoredQuery::new("a").into(), StoredQuery::new("b").into()];
        assert!(kvp(&two_stored).is_err());
    }

    #[test]
    fn test_sort_order_default() {
        assert_eq!(SortProperty::new("NAME", None).sort_order(), SortOrder::Asc);
    }

    #[test]
    fn test_query_without_type_names_cannot_be_written() {
        let mut xml = Builder::new();
        assert!(Query::default().write(&mut xml).is_err());
    }
}
