//! XML content nodes and extracted output values.
//!
//! This module provides the two data structures the extraction engine works
//! with. An `XmlNode` is one element of a parsed XML document, carrying its
//! name, namespace information, attributes, direct text and child elements.
//! A `Value` is what extraction produces: text, lists and ordered records,
//! plus the literal scalars a schema may declare as defaults.
//!
//! # Example
//!
//! ```
//! use xmlquill::document::node::{XmlNode, Value};
//!
//! let mut user = XmlNode::new("user");
//! user.set_attribute("followers", "5");
//! user.push_child(XmlNode::with_text("id", "1"));
//!
//! assert_eq!(user.attribute("followers"), Some("5"));
//! assert_eq!(user.children().len(), 1);
//! assert_eq!(Value::from("1"), Value::String("1".to_string()));
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// An ordered record of extracted values keyed by output name.
pub type Record = IndexMap<String, Value>;

/// A value produced by extraction or declared in a schema.
///
/// Text pulled out of a document is always a `String`; the other scalar
/// variants only appear when a schema declares them as literal defaults.
/// Records keep the order in which their keys were first written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    /// Absent value
    #[default]
    Null,
    /// Boolean literal
    Bool(bool),
    /// Integer literal
    Integer(i64),
    /// Floating point literal
    Float(f64),
    /// Text, either extracted or literal
    String(String),
    /// Ordered list of values
    List(Vec<Value>),
    /// Ordered key/value record
    Record(Record),
}

impl Value {
    /// Returns the text if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the items if this value is a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the fields if this value is a record.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(fields) => Some(fields),
            _ => None,
        }
    }

    /// Returns true when the value counts as "not there" for scalar lookups.
    ///
    /// Null, the empty string and empty collections are absent. The literal
    /// text `"0"` is a real value and is never absent.
    ///
    /// ```
    /// use xmlquill::document::node::Value;
    ///
    /// assert!(Value::from("").is_effectively_absent());
    /// assert!(Value::List(vec![]).is_effectively_absent());
    /// assert!(!Value::from("0").is_effectively_absent());
    /// ```
    pub fn is_effectively_absent(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Record(fields) => fields.is_empty(),
            Value::Bool(_) | Value::Integer(_) | Value::Float(_) => false,
        }
    }

    /// Renders a scalar as the text used for record keys.
    ///
    /// Collections have no key form and return `None`.
    pub fn to_key(&self) -> Option<String> {
        match self {
            Value::Null => Some(String::new()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::List(_) | Value::Record(_) => None,
        }
    }

    /// Applies `f` to every string leaf, leaving other values untouched.
    pub fn map_text<F>(self, f: &F) -> Value
    where
        F: Fn(String) -> String,
    {
        match self {
            Value::String(s) => Value::String(f(s)),
            Value::List(items) => Value::List(items.into_iter().map(|v| v.map_text(f)).collect()),
            Value::Record(fields) => Value::Record(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, v.map_text(f)))
                    .collect(),
            ),
            other => other,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Record> for Value {
    fn from(fields: Record) -> Self {
        Value::Record(fields)
    }
}

/// One element of a parsed XML document.
///
/// Names are split into a local part and an optional prefix; `namespace`
/// holds the URI the prefix (or the default namespace) resolved to while
/// reading. Namespace declarations (`xmlns`, `xmlns:p`) are kept apart from
/// ordinary attributes.
///
/// A node produced by [`XmlNode::scoped`] carries a namespace `scope`: child
/// lookups on it only see children from that namespace.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlNode {
    pub(crate) name: String,
    pub(crate) prefix: Option<String>,
    pub(crate) namespace: Option<String>,
    pub(crate) attributes: IndexMap<String, String>,
    pub(crate) declarations: IndexMap<String, String>,
    pub(crate) text: String,
    pub(crate) children: Vec<XmlNode>,
    pub(crate) scope: Option<String>,
}

impl XmlNode {
    /// Creates an element with the given name and no content.
    ///
    /// A `prefix:local` name is split into its prefix and local part.
    ///
    /// ```
    /// use xmlquill::document::node::XmlNode;
    ///
    /// let node = XmlNode::new("p:person");
    /// assert_eq!(node.name(), "person");
    /// assert_eq!(node.prefix(), Some("p"));
    /// assert_eq!(node.qualified_name(), "p:person");
    /// ```
    pub fn new(name: &str) -> Self {
        let (prefix, local) = match name.split_once(':') {
            Some((p, l)) => (Some(p.to_string()), l.to_string()),
            None => (None, name.to_string()),
        };
        Self {
            name: local,
            prefix,
            ..Self::default()
        }
    }

    /// Creates an element holding only text.
    pub fn with_text(name: &str, text: &str) -> Self {
        let mut node = Self::new(name);
        node.text = text.to_string();
        node
    }

    /// Local name of the element.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace prefix as written in the source, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Name including the prefix, as written in the source.
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{}:{}", p, self.name),
            None => self.name.clone(),
        }
    }

    /// Resolved namespace URI of the element, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn set_namespace(&mut self, uri: Option<String>) {
        self.namespace = uri;
    }

    /// Namespace this node's child lookups are restricted to, if rescoped.
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Direct text content (text and CDATA children concatenated).
    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Attributes in document order, keyed by qualified name.
    pub fn attributes(&self) -> &IndexMap<String, String> {
        &self.attributes
    }

    /// Looks up an attribute by qualified name, or by local name when the
    /// attribute carries no prefix.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        if let Some(value) = self.attributes.get(name) {
            return Some(value);
        }
        self.attributes
            .iter()
            .find(|(key, _)| key.split_once(':').map(|(_, local)| local) == Some(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) {
        self.attributes.insert(name.to_string(), value.to_string());
    }

    /// Namespace declarations made on this element (prefix to URI).
    ///
    /// The default namespace is stored under the empty prefix.
    pub fn declarations(&self) -> &IndexMap<String, String> {
        &self.declarations
    }

    pub fn declare_namespace(&mut self, prefix: &str, uri: &str) {
        self.declarations
            .insert(prefix.to_string(), uri.to_string());
    }

    /// Child elements in document order.
    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    pub fn push_child(&mut self, child: XmlNode) {
        self.children.push(child);
    }

    /// Returns true if the element has no children, no attributes and no text.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.attributes.is_empty() && self.text.is_empty()
    }

    /// Returns a copy of this node whose child lookups only see elements
    /// bound to the namespace `uri`.
    pub fn scoped(&self, uri: &str) -> XmlNode {
        let mut node = self.clone();
        node.scope = Some(uri.to_string());
        node
    }

    /// Returns true if `child` is visible from this node under `segment`.
    ///
    /// Unscoped nodes match unprefixed children by local name and prefixed
    /// children by `prefix:local`. Scoped nodes match children of the scope
    /// namespace by local name. A prefixed element also matches its children
    /// from its own namespace by local name, so a scope carries downward.
    pub(crate) fn child_matches(&self, child: &XmlNode, segment: &str) -> bool {
        match &self.scope {
            Some(uri) => child.namespace.as_deref() == Some(uri.as_str()) && child.name == segment,
            None => match &child.prefix {
                Some(p) => {
                    segment.split_once(':') == Some((p.as_str(), child.name.as_str()))
                        || (self.prefix.is_some()
                            && self.namespace.is_some()
                            && self.namespace == child.namespace
                            && child.name == segment)
                }
                None => child.name == segment,
            },
        }
    }

    /// Children visible from this node, honoring a namespace scope.
    pub(crate) fn visible_children(&self) -> impl Iterator<Item = &XmlNode> {
        let scope = self.scope.as_deref();
        self.children
            .iter()
            .filter(move |child| scope.is_none() || child.namespace.as_deref() == scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_splits_prefix() {
        let node = XmlNode::new("p:person");
        assert_eq!(node.name(), "person");
        assert_eq!(node.prefix(), Some("p"));

        let plain = XmlNode::new("user");
        assert_eq!(plain.name(), "user");
        assert_eq!(plain.prefix(), None);
    }

    #[test]
    fn test_attribute_lookup_by_local_name() {
        let mut node = XmlNode::new("item");
        node.set_attribute("xml:lang", "en");
        node.set_attribute("id", "7");

        assert_eq!(node.attribute("id"), Some("7"));
        assert_eq!(node.attribute("xml:lang"), Some("en"));
        assert_eq!(node.attribute("lang"), Some("en"));
        assert_eq!(node.attribute("missing"), None);
    }

    #[test]
    fn test_is_empty() {
        assert!(XmlNode::new("user").is_empty());
        assert!(!XmlNode::with_text("tag", "PHP").is_empty());

        let mut with_attr = XmlNode::new("user");
        with_attr.set_attribute("id", "1");
        assert!(!with_attr.is_empty());
    }

    #[test]
    fn test_child_matches_prefixed_name() {
        let parent = XmlNode::new("people");
        let child = XmlNode::new("p:person");

        assert!(parent.child_matches(&child, "p:person"));
        assert!(!parent.child_matches(&child, "person"));
        assert!(!parent.child_matches(&child, "q:person"));
    }

    #[test]
    fn test_scoped_matches_by_namespace() {
        let mut parent = XmlNode::new("people");
        let mut child = XmlNode::new("p:person");
        child.set_namespace(Some("http://example.org/ns".to_string()));
        parent.push_child(child.clone());
        parent.push_child(XmlNode::new("other"));

        let scoped = parent.scoped("http://example.org/ns");
        assert!(scoped.child_matches(&child, "person"));
        assert_eq!(scoped.visible_children().count(), 1);
    }

    #[test]
    fn test_effectively_absent() {
        assert!(Value::Null.is_effectively_absent());
        assert!(Value::from("").is_effectively_absent());
        assert!(Value::List(vec![]).is_effectively_absent());
        assert!(!Value::from("0").is_effectively_absent());
        assert!(!Value::Bool(false).is_effectively_absent());
    }

    #[test]
    fn test_map_text_reaches_nested_strings() {
        let mut record = Record::new();
        record.insert("name".to_string(), Value::from("alice"));
        record.insert("tags".to_string(), Value::List(vec![Value::from("a")]));
        record.insert("age".to_string(), Value::Integer(3));

        let upper = Value::Record(record).map_text(&|s: String| s.to_uppercase());
        let fields = upper.as_record().unwrap();
        assert_eq!(fields["name"], Value::from("ALICE"));
        assert_eq!(fields["tags"], Value::List(vec![Value::from("A")]));
        assert_eq!(fields["age"], Value::Integer(3));
    }

    #[test]
    fn test_value_serializes_untagged() {
        let mut record = Record::new();
        record.insert("id".to_string(), Value::from("1"));
        record.insert("missing".to_string(), Value::Null);
        let json = serde_json::to_string(&Value::Record(record)).unwrap();
        assert_eq!(json, r#"{"id":"1","missing":null}"#);
    }

    #[test]
    fn test_value_deserializes_literals() {
        let value: Value = serde_json::from_str(r#"[false, 3, "x", null]"#).unwrap();
        assert_eq!(
            value,
            Value::List(vec![
                Value::Bool(false),
                Value::Integer(3),
                Value::from("x"),
                Value::Null
            ])
        );
    }
}
