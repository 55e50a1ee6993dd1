//! Attribute-preserving markup tree and the parser capability behind it.
//!
//! The manifest builder never talks to an XML library directly; it consumes
//! an [`Element`] tree produced by any [`MarkupParser`]. Attributes and child
//! elements live in separate collections, and children are always a list,
//! so a stream with one quality level looks the same as one with many.

use crate::error::{MssError, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

/// One element of a parsed document.
///
/// The document itself is represented as an unnamed element whose children
/// are the top-level elements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Value of the attribute `name`, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// All direct children called `name`, in document order.
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }
}

/// Capability that turns complete decoded text into an [`Element`] tree.
pub trait MarkupParser {
    /// Parse `text` into a document element.
    ///
    /// # Errors
    /// Returns [`MssError::Markup`] for text that is not well-formed.
    fn parse(&self, text: &str) -> Result<Element>;
}

/// [`MarkupParser`] backed by `quick-xml`'s pull reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuickXmlParser;

impl MarkupParser for QuickXmlParser {
    fn parse(&self, text: &str) -> Result<Element> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        // stack[0] is the document; the last entry is the open element
        let mut stack = vec![Element::default()];

        loop {
            let event = reader.read_event().map_err(|e| {
                MssError::Markup(format!(
                    "at byte {}: {}",
                    reader.buffer_position(),
                    e
                ))
            })?;

            match event {
                Event::Start(start) => {
                    stack.push(element_from(&start)?);
                }
                Event::Empty(start) => {
                    let element = element_from(&start)?;
                    append_child(&mut stack, element);
                }
                Event::End(_) => {
                    if stack.len() < 2 {
                        return Err(MssError::Markup(format!(
                            "at byte {}: unmatched end tag",
                            reader.buffer_position()
                        )));
                    }
                    if let Some(element) = stack.pop() {
                        append_child(&mut stack, element);
                    }
                }
                Event::Eof => break,
                // text, comments, declarations and PIs carry nothing we model
                _ => {}
            }
        }

        if stack.len() != 1 {
            let open = stack.last().map(|e| e.name.as_str()).unwrap_or_default();
            return Err(MssError::Markup(format!(
                "unexpected end of document inside <{}>",
                open
            )));
        }

        let document = stack.pop().unwrap_or_default();
        debug!(
            "Parsed markup document with {} top-level element(s)",
            document.children.len()
        );
        Ok(document)
    }
}

fn append_child(stack: &mut [Element], element: Element) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    }
}

fn element_from(start: &BytesStart<'_>) -> Result<Element> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = Element::new(name);

    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| {
            MssError::Markup(format!("bad attribute in <{}>: {}", element.name, e))
        })?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|e| MssError::Markup(format!("bad value for {}: {}", key, e)))?
            .into_owned();
        element.attributes.push((key, value));
    }

    Ok(element)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_and_attributes() {
        let doc = QuickXmlParser
            .parse(
                r#"<?xml version="1.0"?>
                <Root A="1" B="two &amp; three">
                  <Child N="x"/>
                  <Child N="y"><Leaf/></Child>
                  <Other/>
                </Root>"#,
            )
            .unwrap();

        let root = doc.children("Root").next().unwrap();
        assert_eq!(root.attr("A"), Some("1"));
        assert_eq!(root.attr("B"), Some("two & three"));
        assert_eq!(root.attr("C"), None);

        let children: Vec<_> = root.children("Child").collect();
        assert_eq!(children.len(), 2);
        assert_eq!(children[1].attr("N"), Some("y"));
        assert_eq!(children[1].children("Leaf").count(), 1);
        assert_eq!(root.children("Other").count(), 1);
    }

    #[test]
    fn single_child_is_still_a_list() {
        let doc = QuickXmlParser.parse("<Root><Child/></Root>").unwrap();
        let root = doc.children("Root").next().unwrap();
        assert_eq!(root.children("Child").count(), 1);
        assert_eq!(root.children("Missing").count(), 0);
    }

    #[test]
    fn empty_text_yields_empty_document() {
        let doc = QuickXmlParser.parse("").unwrap();
        assert!(doc.children.is_empty());
    }

    #[test]
    fn mismatched_end_tag_is_markup_error() {
        let result = QuickXmlParser.parse("<Root><Child></Root>");
        assert!(matches!(result, Err(MssError::Markup(_))));
    }

    #[test]
    fn unclosed_element_is_markup_error() {
        let result = QuickXmlParser.parse("<Root><Child/>");
        assert!(matches!(result, Err(MssError::Markup(_))));
    }

    #[test]
    fn stray_end_tag_is_markup_error() {
        let result = QuickXmlParser.parse("<Root/></Root>");
        assert!(matches!(result, Err(MssError::Markup(_))));
    }
}
