//! Small helpers over the quick-xml event API shared by the document codecs.

use std::collections::BTreeMap;
use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::{OgcError, OgcResult};

/// Local part of an element or attribute name (`wfs:Query` -> `Query`).
pub fn local_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

/// Attributes keyed by local name, namespace declarations skipped.
pub fn attributes(start: &BytesStart<'_>) -> OgcResult<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        let name = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        out.insert(name, attr.unescape_value()?.into_owned());
    }
    Ok(out)
}

/// Parse an xsd:boolean attribute value ("1"/"true").
pub fn parse_bool(value: Option<&String>) -> Option<bool> {
    value.map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "True"))
}

/// Re-serialize everything up to the end tag of the element whose start tag
/// was just read. Returns the inner markup without the enclosing element.
pub fn read_inner_xml(reader: &mut Reader<&[u8]>) -> OgcResult<String> {
    let mut writer = Writer::new(Vec::new());
    let mut depth = 0usize;

    loop {
        let event = reader.read_event()?;
        match &event {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Event::Eof => {
                return Err(OgcError::MalformedDocument(
                    "unexpected end of document inside element".to_string(),
                ))
            }
            _ => {}
        }
        writer.write_event(event)?;
    }

    String::from_utf8(writer.into_inner()).map_err(|e| OgcError::Xml(e.to_string()))
}

/// Collect the text content of the element whose start tag was just read.
/// Nested markup is skipped.
pub fn read_text(reader: &mut Reader<&[u8]>) -> OgcResult<String> {
    let mut text = String::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Event::Text(t) if depth == 0 => text.push_str(&t.unescape()?),
            Event::CData(c) if depth == 0 => {
                text.push_str(&String::from_utf8_lossy(&c.into_inner()))
            }
            Event::Eof => {
                return Err(OgcError::MalformedDocument(
                    "unexpected end of document inside element".to_string(),
                ))
            }
            _ => {}
        }
    }

    Ok(text.trim().to_string())
}

/// Skip the remainder of the element whose start tag was just read.
pub fn skip_element(reader: &mut Reader<&[u8]>) -> OgcResult<()> {
    read_inner_xml(reader).map(|_| ())
}

/// Thin wrapper around a quick-xml writer producing compact documents.
pub struct XmlBuilder<W: Write> {
    writer: Writer<W>,
}

impl XmlBuilder<Vec<u8>> {
    pub fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
        }
    }

    pub fn into_string(self) -> OgcResult<String> {
        String::from_utf8(self.writer.into_inner()).map_err(|e| OgcError::Xml(e.to_string()))
    }
}

impl Default for XmlBuilder<Vec<u8>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> XmlBuilder<W> {
    pub fn declaration(&mut self) -> OgcResult<&mut Self> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(self)
    }

    pub fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> OgcResult<&mut Self> {
        let start = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Start(start))?;
        Ok(self)
    }

    pub fn end(&mut self, name: &str) -> OgcResult<&mut Self> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(self)
    }

    pub fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> OgcResult<&mut Self> {
        let start = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Empty(start))?;
        Ok(self)
    }

    /// Escaped character data.
    pub fn text(&mut self, text: &str) -> OgcResult<&mut Self> {
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        Ok(self)
    }

    /// `<name>text</name>` with the text escaped.
    pub fn text_element(&mut self, name: &str, text: &str) -> OgcResult<&mut Self> {
        self.start(name, &[])?.text(text)?.end(name)
    }

    /// Insert an already serialized fragment verbatim.
    pub fn raw(&mut self, fragment: &str) -> OgcResult<&mut Self> {
        self.writer
            .write_event(Event::Text(BytesText::from_escaped(fragment)))?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_inner_xml_keeps_nested_markup() {
        let xml = r#"<root><Filter><PropertyIsEqualTo><ValueReference>name</ValueReference><Literal>a &amp; b</Literal></PropertyIsEqualTo></Filter><next/></root>"#;
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        // <root>, then <Filter>
        reader.read_event().unwrap();
        reader.read_event().unwrap();
        let inner = read_inner_xml(&mut reader).unwrap();
        assert_eq!(
            inner,
            "<PropertyIsEqualTo><ValueReference>name</ValueReference><Literal>a &amp; b</Literal></PropertyIsEqualTo>"
        );

        // Reader continues after </Filter>
        match reader.read_event().unwrap() {
            Event::Empty(e) => assert_eq!(local_name(&e), "next"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_attributes_skip_namespaces() {
        let xml = r#"<wfs:Query xmlns:wfs="http://www.opengis.net/wfs/2.0" typeNames="topp:states" wfs:handle="q1"/>"#;
        let mut reader = Reader::from_str(xml);
        match reader.read_event().unwrap() {
            Event::Empty(e) => {
                assert_eq!(local_name(&e), "Query");
                let attrs = attributes(&e).unwrap();
                assert_eq!(attrs.len(), 2);
                assert_eq!(attrs["typeNames"], "topp:states");
                assert_eq!(attrs["handle"], "q1");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_builder_escapes_text() {
        let mut xml = XmlBuilder::new();
        xml.start("a", &[("k", "v<")]).unwrap();
        xml.text_element("b", "x & y").unwrap();
        xml.end("a").unwrap();
        assert_eq!(
            xml.into_string().unwrap(),
            r#"<a k="v&lt;"><b>x &amp; y</b></a>"#
        );
    }
}
