//! Stored query management: listing, describing, creating and dropping
//! server-side queries.

use serde::{Deserialize, Serialize};

use ogc_common::{OgcError, OgcResult, QueryParams};

use crate::types::{LanguageString, WFS_SERVICE, WFS_VERSION};
use crate::xml::{
    children, inner_xml, language_string, open_root, open_root_any, reader, text,
    write_language_strings, Attrs, Builder, Element, XmlReader,
};

/// Language of query expressions built from `wfs:Query` elements.
pub const WFS_QUERY_LANGUAGE: &str = "urn:ogc:def:queryLanguage:OGC-WFS::WFSQueryExpression";

/// Common attributes of the stored query requests.
fn request_attrs(service: &Option<String>, version: &Option<String>, handle: &Option<String>) -> Attrs {
    let mut attrs = Attrs::wfs_root();
    attrs
        .push("service", service.as_deref().unwrap_or(WFS_SERVICE))
        .push("version", version.as_deref().unwrap_or(WFS_VERSION))
        .push_opt("handle", handle.as_deref());
    attrs
}

fn request_kvp(service: &Option<String>, version: &Option<String>, request: &str) -> QueryParams {
    let mut params = QueryParams::new();
    params.set("SERVICE", service.as_deref().unwrap_or(WFS_SERVICE));
    params.set("VERSION", version.as_deref().unwrap_or(WFS_VERSION));
    params.set("REQUEST", request);
    params
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListStoredQueries {
    pub service: Option<String>,
    pub version: Option<String>,
    pub handle: Option<String>,
}

impl ListStoredQueries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_xml(&self) -> OgcResult<String> {
        let mut xml = Builder::new();
        xml.declaration()?;
        let attrs = request_attrs(&self.service, &self.version, &self.handle);
        xml.empty("wfs:ListStoredQueries", &attrs.refs())?;
        xml.into_string()
    }

    pub fn to_kvp(&self) -> QueryParams {
        request_kvp(&self.service, &self.version, "ListStoredQueries")
    }
}

/// Entry of a ListStoredQueries response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoredQueryListItem {
    pub id: String,
    pub titles: Vec<LanguageString>,
    pub return_feature_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListStoredQueriesResponse {
    pub stored_queries: Vec<StoredQueryListItem>,
}

impl ListStoredQueriesResponse {
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.stored_queries.iter().map(|q| q.id.as_str())
    }

    pub fn from_xml(xml: &str) -> OgcResult<Self> {
        let mut reader = reader(xml);
        let root = open_root(&mut reader, "ListStoredQueriesResponse")?;

        let mut response = ListStoredQueriesResponse::default();
        children(&mut reader, &root, |r, child| {
            if child.name != "StoredQuery" {
                return Ok(false);
            }
            let mut item = StoredQueryListItem {
                id: child.require_attr("id")?,
                ..Default::default()
            };
            children(r, child, |r, part| {
                match part.name.as_str() {
                    "Title" => item.titles.push(language_string(r, part)?),
                    "ReturnFeatureType" => item.return_feature_types.push(text(r, part)?),
                    _ => return Ok(false),
                }
                Ok(true)
            })?;
            response.stored_queries.push(item);
            Ok(true)
        })?;

        Ok(response)
    }

    pub fn to_xml(&self) -> OgcResult<String> {
        let mut xml = Builder::new();
        xml.declaration()?;
        xml.start("wfs:ListStoredQueriesResponse", &Attrs::wfs_root().refs())?;
        for item in &self.stored_queries {
            xml.start("wfs:StoredQuery", &[("id", item.id.as_str())])?;
            write_language_strings(&mut xml, "wfs:Title", &item.titles)?;
            for type_name in &item.return_feature_types {
                xml.text_element("wfs:ReturnFeatureType", type_name)?;
            }
            xml.end("wfs:StoredQuery")?;
        }
        xml.end("wfs:ListStoredQueriesResponse")?;
        xml.into_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DescribeStoredQueries {
    pub service: Option<String>,
    pub version: Option<String>,
    pub handle: Option<String>,
    /// Queries to describe; all of them when empty.
    pub stored_query_ids: Vec<String>,
}

impl DescribeStoredQueries {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stored_query_ids: ids.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn to_xml(&self) -> OgcResult<String> {
        let mut xml = Builder::new();
        xml.declaration()?;
        let attrs = request_attrs(&self.service, &self.version, &self.handle);
        xml.start("wfs:DescribeStoredQueries", &attrs.refs())?;
        for id in &self.stored_query_ids {
            xml.text_element("wfs:StoredQueryId", id)?;
        }
        xml.end("wfs:DescribeStoredQueries")?;
        xml.into_string()
    }

    pub fn to_kvp(&self) -> QueryParams {
        let mut params = request_kvp(&self.service, &self.version, "DescribeStoredQueries");
        if !self.stored_query_ids.is_empty() {
            params.set("STOREDQUERY_ID", self.stored_query_ids.join(","));
        }
        params
    }
}

/// Declared parameter of a stored query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParameterExpression {
    pub name: String,
    /// Qualified schema type, e.g. `xsd:string`.
    pub type_name: String,
    pub titles: Vec<LanguageString>,
    pub abstracts: Vec<LanguageString>,
}

/// Body of a stored query in some query language.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryExpressionText {
    pub return_feature_types: Vec<String>,
    pub language: String,
    pub is_private: Option<bool>,
    /// Query markup, e.g. one or more `wfs:Query` elements.
    pub content: String,
}

impl QueryExpressionText {
    pub fn wfs_query(return_feature_types: Vec<String>, content: impl Into<String>) -> Self {
        Self {
            return_feature_types,
            language: WFS_QUERY_LANGUAGE.to_string(),
            is_private: None,
            content: content.into(),
        }
    }

    pub fn is_private(&self) -> bool {
        self.is_private.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoredQueryDescription {
    pub id: String,
    pub titles: Vec<LanguageString>,
    pub abstracts: Vec<LanguageString>,
    pub parameters: Vec<ParameterExpression>,
    pub query_expression_texts: Vec<QueryExpressionText>,
}

impl StoredQueryDescription {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterExpression> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Feature types any of the query texts return.
    pub fn return_feature_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = Vec::new();
        for text in &self.query_expression_texts {
            for t in &text.return_feature_types {
                if !types.contains(&t.as_str()) {
                    types.push(t);
                }
            }
        }
        types
    }

    /// Serialize as `element` (`wfs:StoredQueryDescription` or
    /// `wfs:StoredQueryDefinition`).
    fn write(&self, xml: &mut Builder, element: &str) -> OgcResult<()> {
        xml.start(element, &[("id", self.id.as_str())])?;
        write_language_strings(xml, "wfs:Title", &self.titles)?;
        write_language_strings(xml, "wfs:Abstract", &self.abstracts)?;

        for parameter in &self.parameters {
            let has_content = !parameter.titles.is_empty() || !parameter.abstracts.is_empty();
            let attrs = [
                ("name", parameter.name.as_str()),
                ("type", parameter.type_name.as_str()),
            ];
            if has_content {
                xml.start("wfs:Parameter", &attrs)?;
                write_language_strings(xml, "wfs:Title", &parameter.titles)?;
                write_language_strings(xml, "wfs:Abstract", &parameter.abstracts)?;
                xml.end("wfs:Parameter")?;
            } else {
                xml.empty("wfs:Parameter", &attrs)?;
            }
        }

        for text in &self.query_expression_texts {
            let mut attrs = Attrs::new();
            attrs
                .push("returnFeatureTypes", text.return_feature_types.join(" "))
                .push("language", text.language.as_str())
                .push_opt("isPrivate", text.is_private);
            xml.start("wfs:QueryExpressionText", &attrs.refs())?;
            xml.raw(&text.content)?;
            xml.end("wfs:QueryExpressionText")?;
        }

        xml.end(element)?;
        Ok(())
    }

    fn read(reader: &mut XmlReader<'_>, element: &Element) -> OgcResult<Self> {
        let mut description = StoredQueryDescription::new(element.require_attr("id")?);

        children(reader, element, |r, child| {
            match child.name.as_str() {
                "Title" => description.titles.push(language_string(r, child)?),
                "Abstract" => description.abstracts.push(language_string(r, child)?),
                "Parameter" => description.parameters.push(read_parameter(r, child)?),
                "QueryExpressionText" => description.query_expression_texts.push(
                    QueryExpressionText {
                        return_feature_types: child.attr_list("returnFeatureTypes"),
                        language: child.attr_string("language").unwrap_or_default(),
                        is_private: ogc_common::xml::parse_bool(child.attrs.get("isPrivate")),
                        content: inner_xml(r, child)?,
                    },
                ),
                _ => return Ok(false),
            }
            Ok(true)
        })?;

        Ok(description)
    }
}

fn read_parameter(reader: &mut XmlReader<'_>, element: &Element) -> OgcResult<ParameterExpression> {
    let mut parameter = ParameterExpression {
        name: element.require_attr("name")?,
        type_name: element.require_attr("type")?,
        ..Default::default()
    };
    children(reader, element, |r, child| {
        match child.name.as_str() {
            "Title" => parameter.titles.push(language_string(r, child)?),
            "Abstract" => parameter.abstracts.push(language_string(r, child)?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    Ok(parameter)
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DescribeStoredQueriesResponse {
    pub descriptions: Vec<StoredQueryDescription>,
}

impl DescribeStoredQueriesResponse {
    pub fn description(&self, id: &str) -> Option<&StoredQueryDescription> {
        self.descriptions.iter().find(|d| d.id == id)
    }

    pub fn from_xml(xml: &str) -> OgcResult<Self> {
        let mut reader = reader(xml);
        let root = open_root(&mut reader, "DescribeStoredQueriesResponse")?;

        let mut response = DescribeStoredQueriesResponse::default();
        children(&mut reader, &root, |r, child| {
            if child.name != "StoredQueryDescription" {
                return Ok(false);
            }
            response
                .descriptions
                .push(StoredQueryDescription::read(r, child)?);
            Ok(true)
        })?;
        Ok(response)
    }

    pub fn to_xml(&self) -> OgcResult<String> {
        let mut xml = Builder::new();
        xml.declaration()?;
        xml.start("wfs:DescribeStoredQueriesResponse", &Attrs::wfs_root().refs())?;
        for description in &self.descriptions {
            description.write(&mut xml, "wfs:StoredQueryDescription")?;
        }
        xml.end("wfs:DescribeStoredQueriesResponse")?;
        xml.into_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreateStoredQuery {
    pub service: Option<String>,
    pub version: Option<String>,
    pub handle: Option<String>,
    pub definitions: Vec<StoredQueryDescription>,
}

impl CreateStoredQuery {
    pub fn new(definition: StoredQueryDescription) -> Self {
        Self {
            definitions: vec![definition],
            ..Default::default()
        }
    }

    pub fn to_xml(&self) -> OgcResult<String> {
        if self.definitions.is_empty() {
            return Err(OgcError::MissingParameter("StoredQueryDefinition".to_string()));
        }

        let mut xml = Builder::new();
        xml.declaration()?;
        let attrs = request_attrs(&self.service, &self.version, &self.handle);
        xml.start("wfs:CreateStoredQuery", &attrs.refs())?;
        for definition in &self.definitions {
            definition.write(&mut xml, "wfs:StoredQueryDefinition")?;
        }
        xml.end("wfs:CreateStoredQuery")?;
        xml.into_string()
    }

    pub fn from_xml(xml: &str) -> OgcResult<Self> {
        let mut reader = reader(xml);
        let root = open_root(&mut reader, "CreateStoredQuery")?;

        let mut request = CreateStoredQuery {
            service: root.attr_string("service"),
            version: root.attr_string("version"),
            handle: root.attr_string("handle"),
            definitions: Vec::new(),
        };
        children(&mut reader, &root, |r, child| {
            if child.name != "StoredQueryDefinition" {
                return Ok(false);
            }
            request.definitions.push(StoredQueryDescription::read(r, child)?);
            Ok(true)
        })?;
        Ok(request)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DropStoredQuery {
    pub service: Option<String>,
    pub version: Option<String>,
    pub handle: Option<String>,
    pub id: String,
}

impl DropStoredQuery {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn to_xml(&self) -> OgcResult<String> {
        let mut xml = Builder::new();
        xml.declaration()?;
        let mut attrs = request_attrs(&self.service, &self.version, &self.handle);
        attrs.push("id", self.id.as_str());
        xml.empty("wfs:DropStoredQuery", &attrs.refs())?;
        xml.into_string()
    }

    pub fn to_kvp(&self) -> QueryParams {
        let mut params = request_kvp(&self.service, &self.version, "DropStoredQuery");
        params.set("STOREDQUERY_ID", self.id.as_str());
        params
    }
}

/// Outcome of CreateStoredQuery or DropStoredQuery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStatus {
    pub status: String,
}

impl ExecutionStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("OK")
    }

    pub fn from_xml(xml: &str) -> OgcResult<Self> {
        let mut reader = reader(xml);
        let root = open_root_any(
            &mut reader,
            &["CreateStoredQueryResponse", "DropStoredQueryResponse"],
        )?;
        Ok(Self {
            status: root.require_attr("status")?,
        })
    }
}
