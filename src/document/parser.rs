//! XML parsing into `XmlNode` trees.
//!
//! This module turns XML text into the content tree the extraction engine
//! walks. It drives a streaming `quick_xml::Reader`, keeps a stack of open
//! elements, and resolves namespace prefixes against the declarations in
//! scope as each element opens.
//!
//! # Example
//!
//! ```
//! use xmlquill::document::parser::parse_xml;
//!
//! let root = parse_xml("<api><user id=\"1\">Alice</user></api>", true).unwrap();
//! assert_eq!(root.name(), "api");
//! assert_eq!(root.children()[0].text(), "Alice");
//! ```

use super::node::XmlNode;
use indexmap::IndexMap;
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// Errors raised while reading XML text.
#[derive(Debug, Error)]
pub enum XmlParseError {
    #[error("xml parse: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("attribute: {0}")]
    Attribute(#[from] AttrError),
    #[error("utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("document has no root element")]
    NoRoot,
    #[error("document has more than one root element")]
    MultipleRoots,
    #[error("element <{0}> is never closed")]
    Unclosed(String),
}

/// Parses XML text into its root element.
///
/// When `trim` is set, whitespace around text nodes is dropped, so
/// indentation between elements never shows up as element text.
///
/// # Errors
///
/// Returns an error if the text is not well-formed XML, has no root element,
/// or has more than one.
///
/// ```
/// use xmlquill::document::parser::parse_xml;
///
/// assert!(parse_xml("<open>", true).is_err());
/// assert!(parse_xml("", true).is_err());
/// ```
pub fn parse_xml(text: &str, trim: bool) -> Result<XmlNode, XmlParseError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(trim);

    let mut stack: Vec<XmlNode> = Vec::new();
    // Namespace bindings visible at each open element, innermost last
    let mut scopes: Vec<IndexMap<String, String>> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let (node, bindings) = open_element(&start, scopes.last())?;
                scopes.push(bindings);
                stack.push(node);
            }
            Event::Empty(start) => {
                let (node, _) = open_element(&start, scopes.last())?;
                attach(node, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                scopes.pop();
                if let Some(node) = stack.pop() {
                    attach(node, &mut stack, &mut root)?;
                }
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    current.push_text(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    let raw = data.into_inner();
                    current.push_text(std::str::from_utf8(&raw)?);
                }
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and doctypes
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(XmlParseError::Unclosed(open.qualified_name()));
    }

    root.ok_or(XmlParseError::NoRoot)
}

/// Builds a node from a start tag and returns it with the namespace
/// bindings in effect inside it.
fn open_element(
    start: &BytesStart,
    inherited: Option<&IndexMap<String, String>>,
) -> Result<(XmlNode, IndexMap<String, String>), XmlParseError> {
    let name = std::str::from_utf8(start.name().as_ref())?.to_string();
    let mut node = XmlNode::new(&name);
    let mut bindings = inherited.cloned().unwrap_or_default();

    for attr in start.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let value = attr.unescape_value()?.into_owned();

        if key == "xmlns" {
            node.declare_namespace("", &value);
            bindings.insert(String::new(), value);
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            node.declare_namespace(prefix, &value);
            bindings.insert(prefix.to_string(), value);
        } else {
            node.set_attribute(&key, &value);
        }
    }

    let lookup = node.prefix().unwrap_or("");
    node.set_namespace(bindings.get(lookup).cloned());

    Ok((node, bindings))
}

/// Attaches a closed element to its parent, or makes it the root.
fn attach(
    node: XmlNode,
    stack: &mut [XmlNode],
    root: &mut Option<XmlNode>,
) -> Result<(), XmlParseError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.push_child(node);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(node);
            Ok(())
        }
        None => Err(XmlParseError::MultipleRoots),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_element() {
        let root = parse_xml("<foo><bar>foobar</bar></foo>", true).unwrap();
        assert_eq!(root.name(), "foo");
        assert_eq!(root.children().len(), 1);
        assert_eq!(root.children()[0].name(), "bar");
        assert_eq!(root.children()[0].text(), "foobar");
    }

    #[test]
    fn test_parse_attributes_in_order() {
        let root = parse_xml(r#"<user followers="5" id="1"/>"#, true).unwrap();
        let keys: Vec<&String> = root.attributes().keys().collect();
        assert_eq!(keys, vec!["followers", "id"]);
        assert_eq!(root.attribute("followers"), Some("5"));
    }

    #[test]
    fn test_parse_trims_indentation() {
        let xml = "<api>\n    <user>\n        <id>1</id>\n    </user>\n</api>";
        let root = parse_xml(xml, true).unwrap();
        assert_eq!(root.text(), "");
        assert_eq!(root.children()[0].children()[0].text(), "1");
    }

    #[test]
    fn test_parse_keeps_whitespace_without_trim() {
        let xml = "<api>\n  <id> 1 </id>\n</api>";
        let root = parse_xml(xml, false).unwrap();
        assert_eq!(root.children()[0].text(), " 1 ");
    }

    #[test]
    fn test_parse_unescapes_entities_and_cdata() {
        let root = parse_xml("<a><b>Tom &amp; Jerry</b><c><![CDATA[<raw>]]></c></a>", true)
            .unwrap();
        assert_eq!(root.children()[0].text(), "Tom & Jerry");
        assert_eq!(root.children()[1].text(), "<raw>");
    }

    #[test]
    fn test_parse_resolves_namespaces() {
        let xml = r#"<people xmlns:p="http://example.org/ns" xmlns="http://example.org/default">
            <p:person id="1">John</p:person>
            <item>x</item>
        </people>"#;
        let root = parse_xml(xml, true).unwrap();

        assert_eq!(root.namespace(), Some("http://example.org/default"));
        assert_eq!(root.declarations().get("p").map(String::as_str), Some("http://example.org/ns"));
        assert!(root.attributes().is_empty());

        let person = &root.children()[0];
        assert_eq!(person.name(), "person");
        assert_eq!(person.prefix(), Some("p"));
        assert_eq!(person.namespace(), Some("http://example.org/ns"));
        assert_eq!(person.attribute("id"), Some("1"));

        assert_eq!(root.children()[1].namespace(), Some("http://example.org/default"));
    }

    #[test]
    fn test_parse_skips_declaration_and_comments() {
        let xml = r#"<?xml version="1.0" standalone="yes"?><!-- note --><root>ok</root>"#;
        let root = parse_xml(xml, true).unwrap();
        assert_eq!(root.text(), "ok");
    }

    #[test]
    fn test_parse_invalid_documents() {
        let invalid_cases = vec!["", "plain text", "<open>", "<a></b>", "<a/><b/>"];

        for invalid in invalid_cases {
            assert!(parse_xml(invalid, true).is_err(), "Expected error for: {}", invalid);
        }
    }
}
