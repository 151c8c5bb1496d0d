//! Minimal element tree on top of `quick-xml`, used by the capability document and SLD readers.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::LayerConfigError;

/// XML element with namespace prefixes stripped from element and attribute names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: String,
}

fn malformed(error: impl std::fmt::Display) -> LayerConfigError {
    LayerConfigError::MalformedMetadata(error.to_string())
}

fn start_element(start: &BytesStart) -> Result<XmlElement, LayerConfigError> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut attributes = vec![];
    for attribute in start.attributes() {
        let attribute = attribute.map_err(malformed)?;
        let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
        let value = attribute.unescape_value().map_err(malformed)?.into_owned();
        attributes.push((key, value));
    }

    Ok(XmlElement {
        name,
        attributes,
        children: vec![],
        text: String::new(),
    })
}

impl XmlElement {
    /// Parses a document and returns its root element.
    pub fn parse(document: &str) -> Result<Self, LayerConfigError> {
        let mut reader = Reader::from_str(document);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlElement> = vec![];
        let mut root = None;

        loop {
            let event = reader.read_event().map_err(malformed)?;
            match event {
                Event::Start(start) => stack.push(start_element(&start)?),
                Event::Empty(start) => {
                    let element = start_element(&start)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => root = Some(element),
                    }
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| malformed("unexpected closing tag"))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => root = Some(element),
                    }
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text.unescape().map_err(malformed)?);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current
                            .text
                            .push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(malformed("unexpected end of document"));
        }

        root.ok_or_else(|| malformed("document has no root element"))
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Trimmed text of the child element, if the child exists and has non-empty text.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|child| child.text.trim())
            .filter(|text| !text.is_empty())
    }

    /// First element with the given name in depth-first order, including `self`.
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        if self.name == name {
            return Some(self);
        }

        self.children.iter().find_map(|child| child.find(name))
    }

    /// All descendants with the given name in depth-first order, not descending into matches.
    pub fn find_all<'a>(&'a self, name: &str, result: &mut Vec<&'a XmlElement>) {
        for child in &self.children {
            if child.name == name {
                result.push(child);
            } else {
                child.find_all(name, result);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements() {
        let root = XmlElement::parse(
            r#"<?xml version="1.0"?>
            <wms:Root xmlns:wms="http://x" version="1.3.0">
                <Child a="1">text &amp; more</Child>
                <Empty b="2"/>
                <Child><![CDATA[data]]></Child>
            </wms:Root>"#,
        )
        .unwrap();

        assert_eq!(root.name, "Root");
        assert_eq!(root.attr("version"), Some("1.3.0"));
        assert_eq!(root.children.len(), 3);
        assert_eq!(root.child_text("Child"), Some("text & more"));
        assert_eq!(root.child("Empty").unwrap().attr("b"), Some("2"));
        let texts: Vec<&str> = root
            .children_named("Child")
            .map(|child| child.text.as_str())
            .collect();
        assert_eq!(texts, vec!["text & more", "data"]);
    }

    #[test]
    fn finds_descendants() {
        let root = XmlElement::parse("<a><b><c>1</c></b><c>2</c></a>").unwrap();
        assert_eq!(root.find("c").unwrap().text, "1");

        let mut found = vec![];
        root.find_all("c", &mut found);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn rejects_broken_documents() {
        assert!(XmlElement::parse("<a><b></a>").is_err());
        assert!(XmlElement::parse("").is_err());
    }
}
