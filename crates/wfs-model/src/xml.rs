//! Reading and writing helpers shared by the WFS document codecs.

use std::collections::BTreeMap;
use std::str::FromStr;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use ogc_common::xml::{attributes, local_name, read_inner_xml, read_text, XmlBuilder};
use ogc_common::{OgcError, OgcResult};

use crate::exception::ExceptionReport;
use crate::types::{LanguageString, Value};

pub const WFS_NAMESPACE: &str = "http://www.opengis.net/wfs/2.0";
pub const FES_NAMESPACE: &str = "http://www.opengis.net/fes/2.0";
pub const GML_NAMESPACE: &str = "http://www.opengis.net/gml/3.2";
pub const OWS_NAMESPACE: &str = "http://www.opengis.net/ows/1.1";

pub(crate) type XmlReader<'a> = Reader<&'a [u8]>;
pub(crate) type Builder = XmlBuilder<Vec<u8>>;

/// Attributes with owned values, in the order they are written.
#[derive(Debug, Default)]
pub(crate) struct Attrs(Vec<(String, String)>);

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    /// `xmlns:wfs`, `xmlns:fes` and `xmlns:gml`.
    pub fn wfs_root() -> Self {
        let mut attrs = Self::new();
        attrs
            .push("xmlns:wfs", WFS_NAMESPACE)
            .push("xmlns:fes", FES_NAMESPACE)
            .push("xmlns:gml", GML_NAMESPACE);
        attrs
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.push((key.into(), value.into()));
        self
    }

    pub fn push_opt<T: ToString>(&mut self, key: &str, value: Option<T>) -> &mut Self {
        if let Some(value) = value {
            self.0.push((key.to_string(), value.to_string()));
        }
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    pub fn refs(&self) -> Vec<(&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }
}

/// A start (or empty) tag that was just read.
#[derive(Debug, Clone)]
pub(crate) struct Element {
    /// Local name, e.g. `Query`.
    pub name: String,
    /// Name as written, e.g. `wfs:Query`.
    pub qname: String,
    /// Attributes by local name, namespace declarations excluded.
    pub attrs: BTreeMap<String, String>,
    /// `xmlns:prefix` declarations as (prefix, uri).
    pub namespaces: Vec<(String, String)>,
    /// Tag content between `<` and `>` as written.
    pub raw: String,
    pub empty: bool,
}

impl Element {
    fn new(start: &BytesStart<'_>, empty: bool) -> OgcResult<Self> {
        let mut namespaces = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = attr.key.as_ref();
            if let Some(prefix) = key.strip_prefix(b"xmlns:") {
                namespaces.push((
                    String::from_utf8_lossy(prefix).into_owned(),
                    attr.unescape_value()?.into_owned(),
                ));
            }
        }

        Ok(Self {
            name: local_name(start),
            qname: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            attrs: attributes(start)?,
            namespaces,
            raw: String::from_utf8_lossy(start).into_owned(),
            empty,
        })
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn attr_string(&self, key: &str) -> Option<String> {
        self.attrs.get(key).cloned()
    }

    /// Attribute parsed with `FromStr`; a value that does not parse is an
    /// error naming the attribute.
    pub fn attr_parse<T>(&self, key: &str) -> OgcResult<Option<T>>
    where
        T: FromStr,
    {
        match self.attrs.get(key) {
            Some(value) => parse_value(key, value).map(Some),
            None => Ok(None),
        }
    }

    /// Whitespace separated list attribute such as `typeNames`.
    pub fn attr_list(&self, key: &str) -> Vec<String> {
        self.attrs
            .get(key)
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn require_attr(&self, key: &str) -> OgcResult<String> {
        self.attr_string(key).ok_or_else(|| {
            OgcError::MalformedDocument(format!("{} without {} attribute", self.name, key))
        })
    }
}

pub(crate) fn parse_value<T: FromStr>(key: &str, value: &str) -> OgcResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| OgcError::invalid_parameter(key, format!("cannot parse '{}'", value)))
}

pub(crate) fn reader(xml: &str) -> XmlReader<'_> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    reader
}

/// Read up to the document element and check its local name.
///
/// An OWS exception report in place of the expected document is returned
/// as the service exception it carries.
pub(crate) fn open_root(reader: &mut XmlReader<'_>, expected: &str) -> OgcResult<Element> {
    open_root_any(reader, &[expected])
}

/// [`open_root`] accepting any of several document elements.
pub(crate) fn open_root_any(reader: &mut XmlReader<'_>, expected: &[&str]) -> OgcResult<Element> {
    let root = loop {
        match reader.read_event()? {
            Event::Start(e) => break Element::new(&e, false)?,
            Event::Empty(e) => break Element::new(&e, true)?,
            Event::Eof => {
                return Err(OgcError::MalformedDocument(format!(
                    "empty document, expected {}",
                    expected.join(" or ")
                )))
            }
            _ => {}
        }
    };

    if expected.contains(&root.name.as_str()) {
        return Ok(root);
    }

    if root.name == "ExceptionReport" {
        let report = ExceptionReport::read(reader, &root)?;
        debug!(expected = ?expected, "Server returned an exception report");
        return Err(report.into());
    }

    Err(OgcError::MalformedDocument(format!(
        "expected {}, found {}",
        expected.join(" or "),
        root.qname
    )))
}

/// Visit the child elements of `parent`, whose start tag was just read.
///
/// `visit` returns whether it consumed the child; children left unread are
/// skipped.
pub(crate) fn children<F>(reader: &mut XmlReader<'_>, parent: &Element, mut visit: F) -> OgcResult<()>
where
    F: FnMut(&mut XmlReader<'_>, &Element) -> OgcResult<bool>,
{
    if parent.empty {
        return Ok(());
    }

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let child = Element::new(&e, false)?;
                if !visit(reader, &child)? {
                    read_inner_xml(reader)?;
                }
            }
            Event::Empty(e) => {
                let child = Element::new(&e, true)?;
                visit(reader, &child)?;
            }
            Event::End(_) => return Ok(()),
            Event::Eof => {
                return Err(OgcError::MalformedDocument(format!(
                    "unexpected end of document inside {}",
                    parent.qname
                )))
            }
            _ => {}
        }
    }
}

/// Text content of `element`.
pub(crate) fn text(reader: &mut XmlReader<'_>, element: &Element) -> OgcResult<String> {
    if element.empty {
        return Ok(String::new());
    }
    read_text(reader)
}

/// Inner markup of `element`.
pub(crate) fn inner_xml(reader: &mut XmlReader<'_>, element: &Element) -> OgcResult<String> {
    if element.empty {
        return Ok(String::new());
    }
    read_inner_xml(reader)
}

/// `element` serialized with its own tags.
pub(crate) fn outer_xml(reader: &mut XmlReader<'_>, element: &Element) -> OgcResult<String> {
    if element.empty {
        return Ok(format!("<{}/>", element.raw));
    }
    let inner = read_inner_xml(reader)?;
    Ok(format!("<{}>{}</{}>", element.raw, inner, element.qname))
}

/// Content of `element` as text, or as markup when it has child elements.
pub(crate) fn value(reader: &mut XmlReader<'_>, element: &Element) -> OgcResult<Value> {
    let inner = inner_xml(reader, element)?;
    if inner.contains('<') {
        return Ok(Value::Xml(inner));
    }
    let text = quick_xml::escape::unescape(&inner).map_err(|e| OgcError::Xml(e.to_string()))?;
    Ok(Value::Text(text.into_owned()))
}

pub(crate) fn language_string(
    reader: &mut XmlReader<'_>,
    element: &Element,
) -> OgcResult<LanguageString> {
    Ok(LanguageString {
        lang: element.attr_string("lang"),
        value: text(reader, element)?,
    })
}

/// Numeric text content, e.g. `<wfs:totalInserted>2</wfs:totalInserted>`.
pub(crate) fn number<T: FromStr>(reader: &mut XmlReader<'_>, element: &Element) -> OgcResult<T> {
    let content = text(reader, element)?;
    parse_value(&element.name, &content)
}

pub(crate) fn write_value(
    xml: &mut Builder,
    name: &str,
    attrs: &[(&str, &str)],
    value: &Value,
) -> OgcResult<()> {
    xml.start(name, attrs)?;
    match value {
        Value::Text(text) => xml.text(text)?,
        Value::Xml(markup) => xml.raw(markup)?,
    };
    xml.end(name)?;
    Ok(())
}

pub(crate) fn write_language_strings(
    xml: &mut Builder,
    name: &str,
    values: &[LanguageString],
) -> OgcResult<()> {
    for value in values {
        match &value.lang {
            Some(lang) => {
                xml.start(name, &[("xml:lang", lang.as_str())])?
                    .text(&value.value)?
                    .end(name)?;
            }
            None => {
                xml.text_element(name, &value.value)?;
            }
        }
    }
    Ok(())
}

/// `<fes:Filter>predicate</fes:Filter>`.
pub(crate) fn write_filter(xml: &mut Builder, predicate: &str) -> OgcResult<()> {
    xml.start("fes:Filter", &[])?.raw(predicate)?.end("fes:Filter")?;
    Ok(())
}

/// Standalone filter document for KVP `FILTER` parameters.
pub(crate) fn filter_document(predicate: &str) -> String {
    format!(
        "<fes:Filter xmlns:fes=\"{}\">{}</fes:Filter>",
        FES_NAMESPACE, predicate
    )
}

/// `rid` values of the `fes:ResourceId` children of `element`.
pub(crate) fn resource_ids(reader: &mut XmlReader<'_>, element: &Element) -> OgcResult<Vec<String>> {
    let mut ids = Vec::new();
    children(reader, element, |_, child| {
        if child.name == "ResourceId" {
            if let Some(rid) = child.attr_string("rid") {
                ids.push(rid);
            }
        }
        Ok(false)
    })?;
    Ok(ids)
}

pub(crate) fn write_resource_ids(xml: &mut Builder, ids: &[String]) -> OgcResult<()> {
    for id in ids {
        xml.empty("fes:ResourceId", &[("rid", id.as_str())])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_and<T>(xml: &str, f: impl FnOnce(&mut XmlReader<'_>, Element) -> T) -> T {
        let mut reader = reader(xml);
        let root = loop {
            match reader.read_event().unwrap() {
                Event::Start(e) => break Element::new(&e, false).unwrap(),
                Event::Empty(e) => break Element::new(&e, true).unwrap(),
                _ => {}
            }
        };
        f(&mut reader, root)
    }

    #[test]
    fn test_element_keeps_raw_tag_and_namespaces() {
        root_and(
            r#"<topp:states xmlns:topp="http://www.openplans.org/topp" gml:id="states.1"/>"#,
            |_, root| {
                assert_eq!(root.name, "states");
                assert_eq!(root.qname, "topp:states");
                assert_eq!(root.attr("id"), Some("states.1"));
                assert_eq!(
                    root.namespaces,
                    vec![("topp".to_string(), "http://www.openplans.org/topp".to_string())]
                );
                assert!(root.empty);
            },
        );
    }

    #[test]
    fn test_children_skips_unvisited() {
        let xml = "<a><b>1</b><c><d>2</d></c><b>3</b></a>";
        let values = root_and(xml, |reader, root| {
            let mut values = Vec::new();
            children(reader, &root, |r, child| {
                if child.name == "b" {
                    values.push(text(r, child)?);
                    return Ok(true);
                }
                Ok(false)
            })
            .unwrap();
            values
        });
        assert_eq!(values, vec!["1", "3"]);
    }

    #[test]
    fn test_value_distinguishes_text_and_markup() {
        let xml = "<a><p>x &amp; y</p><q><gml:pos>1 2</gml:pos></q><r/></a>";
        let values = root_and(xml, |reader, root| {
            let mut values = Vec::new();
            children(reader, &root, |r, child| {
                values.push(value(r, child)?);
                Ok(true)
            })
            .unwrap();
            values
        });
        assert_eq!(
            values,
            vec![
                Value::text("x & y"),
                Value::xml("<gml:pos>1 2</gml:pos>"),
                Value::text(""),
            ]
        );
    }

    #[test]
    fn test_outer_xml() {
        let xml = r#"<a><topp:states gml:id="s.1"><topp:NAME>x</topp:NAME></topp:states></a>"#;
        let outer = root_and(xml, |reader, root| {
            let mut outer = String::new();
            children(reader, &root, |r, child| {
                outer = outer_xml(r, child)?;
                Ok(true)
            })
            .unwrap();
            outer
        });
        assert_eq!(
            outer,
            r#"<topp:states gml:id="s.1"><topp:NAME>x</topp:NAME></topp:states>"#
        );
    }

    #[test]
    fn test_open_root_rejects_other_documents() {
        let mut r = reader("<wfs:Other/>");
        assert!(matches!(
            open_root(&mut r, "FeatureCollection"),
            Err(OgcError::MalformedDocument(_))
        ));
    }
}
