//! GetFeature responses.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use ogc_common::time::{format_wms_time, parse_iso8601};
use ogc_common::{OgcError, OgcResult};

use crate::types::Value;
use crate::xml::{
    children, open_root, reader, value, write_value, Attrs, Builder, Element, XmlReader,
    GML_NAMESPACE, WFS_NAMESPACE,
};

/// `numberMatched`: a count, or `unknown` when the server did not compute it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NumberMatched {
    Known(u64),
    #[default]
    Unknown,
}

impl NumberMatched {
    pub fn known(&self) -> Option<u64> {
        match self {
            NumberMatched::Known(n) => Some(*n),
            NumberMatched::Unknown => None,
        }
    }
}

impl fmt::Display for NumberMatched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberMatched::Known(n) => write!(f, "{}", n),
            NumberMatched::Unknown => f.write_str("unknown"),
        }
    }
}

impl FromStr for NumberMatched {
    type Err = OgcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unknown") {
            return Ok(NumberMatched::Unknown);
        }
        s.parse()
            .map(NumberMatched::Known)
            .map_err(|_| OgcError::invalid_parameter("numberMatched", format!("'{}'", s)))
    }
}

/// A feature property as written, e.g. `topp:STATE_NAME`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: Value,
}

impl Property {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Feature {
    /// Qualified feature type name, e.g. `topp:states`.
    pub type_name: String,
    pub gml_id: Option<String>,
    pub properties: Vec<Property>,
}

impl Feature {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    pub fn local_type_name(&self) -> &str {
        local_part(&self.type_name)
    }

    /// First property whose qualified or local name is `name`.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|p| p.name == name || p.local_name() == name)
            .map(|p| &p.value)
    }

    /// Text value of a property.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.property(name).and_then(Value::as_text)
    }

    fn read(reader: &mut XmlReader<'_>, element: &Element) -> OgcResult<Self> {
        let mut feature = Feature {
            type_name: element.qname.clone(),
            gml_id: element.attr_string("id"),
            properties: Vec::new(),
        };
        children(reader, element, |r, child| {
            feature.properties.push(Property {
                name: child.qname.clone(),
                value: value(r, child)?,
            });
            Ok(true)
        })?;
        Ok(feature)
    }

    fn write(&self, xml: &mut Builder) -> OgcResult<()> {
        let mut attrs = Attrs::new();
        attrs.push_opt("gml:id", self.gml_id.as_deref());
        xml.start(&self.type_name, &attrs.refs())?;
        for property in &self.properties {
            write_value(xml, &property.name, &[], &property.value)?;
        }
        xml.end(&self.type_name)?;
        Ok(())
    }
}

fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// A page of GetFeature results.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeatureCollection {
    pub timestamp: Option<DateTime<Utc>>,
    pub number_matched: NumberMatched,
    pub number_returned: u64,
    /// URL of the next page.
    pub next: Option<String>,
    pub previous: Option<String>,
    pub members: Vec<Feature>,
    /// Namespace declarations of the document element as (prefix, uri),
    /// kept so that feature markup can be written back with its prefixes.
    pub namespaces: Vec<(String, String)>,
}

impl FeatureCollection {
    pub fn new(members: Vec<Feature>) -> Self {
        Self {
            number_returned: members.len() as u64,
            members,
            ..Default::default()
        }
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn features_of<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a Feature> {
        self.members
            .iter()
            .filter(move |f| f.type_name == type_name || f.local_type_name() == type_name)
    }

    pub fn from_xml(xml: &str) -> OgcResult<Self> {
        let mut reader = reader(xml);
        let root = open_root(&mut reader, "FeatureCollection")?;

        let timestamp = match root.attr("timeStamp") {
            Some(value) => Some(parse_iso8601(value)?),
            None => None,
        };
        let number_returned = root.attr_parse("numberReturned")?;

        let mut collection = FeatureCollection {
            timestamp,
            number_matched: root.attr_parse("numberMatched")?.unwrap_or_default(),
            number_returned: 0,
            next: root.attr_string("next"),
            previous: root.attr_string("previous"),
            members: Vec::new(),
            namespaces: root.namespaces.clone(),
        };

        children(&mut reader, &root, |r, child| {
            if child.name != "member" {
                return Ok(false);
            }
            children(r, child, |r, feature| {
                collection.members.push(Feature::read(r, feature)?);
                Ok(true)
            })?;
            Ok(true)
        })?;

        collection.number_returned = number_returned.unwrap_or(collection.members.len() as u64);
        debug!(
            returned = collection.number_returned,
            matched = %collection.number_matched,
            "Parsed feature collection"
        );
        Ok(collection)
    }

    pub fn to_xml(&self) -> OgcResult<String> {
        let mut xml = Builder::new();
        xml.declaration()?;

        let mut attrs = Attrs::new();
        for (prefix, uri) in &self.namespaces {
            attrs.push(format!("xmlns:{}", prefix), uri.as_str());
        }
        if !attrs.contains("xmlns:wfs") {
            attrs.push("xmlns:wfs", WFS_NAMESPACE);
        }
        if !attrs.contains("xmlns:gml") {
            attrs.push("xmlns:gml", GML_NAMESPACE);
        }
        attrs
            .push_opt("timeStamp", self.timestamp.as_ref().map(format_wms_time))
            .push("numberMatched", self.number_matched.to_string())
            .push("numberReturned", self.number_returned.to_string())
            .push_opt("next", self.next.as_deref())
            .push_opt("previous", self.previous.as_deref());
        xml.start("wfs:FeatureCollection", &attrs.refs())?;

        for feature in &self.members {
            xml.start("wfs:member", &[])?;
            feature.write(&mut xml)?;
            xml.end("wfs:member")?;
        }

        xml.end("wfs:FeatureCollection")?;
        xml.into_string()
    }
}
