//! XML documents and schema-driven extraction.
//!
//! A [`Document`] holds a parsed XML tree and extracts records from it with
//! a [`Schema`]. The current content can be moved to a sub-element with
//! [`Document::rebase`] or restricted to one namespace with
//! [`Document::namespaced`]; the original tree is always kept.
//!
//! # Example
//!
//! ```
//! use xmlquill::document::node::Value;
//! use xmlquill::document::parser::parse_xml;
//! use xmlquill::document::Document;
//! use xmlquill::schema::{FieldSpec, ParseOptions, Schema};
//!
//! let root = parse_xml("<api><user><id>1</id></user></api>", true).unwrap();
//! let document = Document::new(root);
//!
//! let schema = Schema::new()
//!     .field("id", FieldSpec::uses("user.id").unwrap())
//!     .field("email", FieldSpec::uses("user.email").unwrap().default("none"));
//!
//! let output = document.parse(&schema, ParseOptions::default());
//! assert_eq!(output["id"], Value::from("1"));
//! assert_eq!(output["email"], Value::from("none"));
//! ```

pub mod node;
pub mod parser;
pub mod resolver;

use crate::filter::FilterRegistry;
use crate::schema::{Field, FieldSpec, ParseOptions, Schema, Uses};
use crate::usepath::{Evaluator, NamespaceTable};
use indexmap::IndexMap;
use node::{Record, Value, XmlNode};
use once_cell::unsync::OnceCell;
use thiserror::Error;

/// Errors raised by document operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Base path '{base}' does not match any element")]
    BaseNotFound { base: String },
}

/// A parsed XML document ready for extraction.
#[derive(Debug, Clone)]
pub struct Document {
    content: XmlNode,
    original_content: XmlNode,
    namespaces: OnceCell<IndexMap<String, String>>,
    filters: FilterRegistry,
}

impl Document {
    /// Creates a document over `root` with the built-in filters.
    pub fn new(root: XmlNode) -> Self {
        Document {
            content: root.clone(),
            original_content: root,
            namespaces: OnceCell::new(),
            filters: FilterRegistry::with_builtins(),
        }
    }

    /// Replaces the filter registry.
    pub fn with_filters(mut self, filters: FilterRegistry) -> Self {
        self.filters = filters;
        self
    }

    /// Replaces both the current and the original content.
    pub fn set_content(&mut self, root: XmlNode) -> &mut Self {
        self.content = root.clone();
        self.original_content = root;
        self.namespaces = OnceCell::new();
        self
    }

    /// The element extraction currently starts from.
    pub fn content(&self) -> &XmlNode {
        &self.content
    }

    pub fn original_content(&self) -> &XmlNode {
        &self.original_content
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut FilterRegistry {
        &mut self.filters
    }

    /// Moves the current content to the first element at `base`, resolved
    /// from the original root. `None` restores the original root.
    ///
    /// # Errors
    ///
    /// Returns `BaseNotFound` if `base` matches nothing; the current content
    /// is left unchanged.
    pub fn rebase(&mut self, base: Option<&str>) -> Result<&mut Self, DocumentError> {
        let Some(base) = base else {
            self.content = self.original_content.clone();
            return Ok(self);
        };

        match resolver::resolve_first(&self.original_content, base) {
            Some(found) => {
                tracing::debug!(base, element = found.name(), "rebased document");
                self.content = found.clone();
                Ok(self)
            }
            None => Err(DocumentError::BaseNotFound {
                base: base.to_string(),
            }),
        }
    }

    /// Restricts the current content to the children bound to `prefix`,
    /// then parses. An undeclared prefix leaves the content as it is.
    pub fn namespaced(&mut self, prefix: &str, schema: &Schema, options: ParseOptions) -> Record {
        match self.namespace_uri(prefix).map(str::to_string) {
            Some(uri) => {
                tracing::debug!(prefix, uri = %uri, "scoping content to namespace");
                self.content = resolver::children_in_namespace(&self.content, &uri);
            }
            None => tracing::debug!(prefix, "namespace prefix not declared, content unchanged"),
        }

        self.parse(schema, options)
    }

    /// Every namespace declared in the original content, computed once.
    pub fn available_namespaces(&self) -> &IndexMap<String, String> {
        self.namespaces
            .get_or_init(|| resolver::available_namespaces(&self.original_content))
    }

    /// Extracts one record from the current content.
    ///
    /// # Arguments
    ///
    /// * `schema` - Output keys in emission order, each a literal or a field
    ///   specification
    /// * `options` - With `ignore` set, every field is still evaluated and
    ///   filtered, but nothing is emitted
    ///
    /// # Returns
    ///
    /// A record with one entry per schema key. Fields that match nothing
    /// take their default (or `Null`), so extraction never fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlquill::document::node::Value;
    /// use xmlquill::file::loader::Reader;
    /// use xmlquill::schema::{FieldSpec, ParseOptions, Schema};
    ///
    /// let document = Reader::new().extract("<api><user><id>1</id></user></api>").unwrap();
    /// let schema = Schema::new()
    ///     .field("id", FieldSpec::uses("user.id").unwrap())
    ///     .field("email", FieldSpec::uses("user.email").unwrap().default("none"));
    ///
    /// let output = document.parse(&schema, ParseOptions::default());
    /// assert_eq!(output["id"], Value::from("1"));
    /// assert_eq!(output["email"], Value::from("none"));
    /// ```
    pub fn parse(&self, schema: &Schema, options: ParseOptions) -> Record {
        let evaluator = Evaluator::new(self);
        let mut output = Record::new();

        for (key, field) in schema.iter() {
            let value = match field {
                Field::Literal(value) => value.clone(),
                Field::Spec(spec) => self.resolve_field(&evaluator, key, spec),
            };

            if !options.ignore {
                output.insert(key.clone(), value);
            }
        }

        output
    }

    fn resolve_field(&self, evaluator: &Evaluator<'_, Self>, key: &str, spec: &FieldSpec) -> Value {
        let value = match &spec.uses {
            None => spec.fallback(),
            Some(Uses::One(expr)) => evaluator.evaluate(&self.content, expr).or(spec.fallback()),
            Some(Uses::Many(exprs)) => Value::List(
                exprs
                    .iter()
                    .map(|expr| evaluator.evaluate(&self.content, expr).or(spec.fallback()))
                    .collect(),
            ),
        };
        tracing::trace!(key, "resolved field");

        match &spec.filter {
            Some(filter) => self.filters.apply(filter, value),
            None => value,
        }
    }
}

impl NamespaceTable for Document {
    fn namespace_uri(&self, prefix: &str) -> Option<&str> {
        self.available_namespaces().get(prefix).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parser::parse_xml;

    fn document(xml: &str) -> Document {
        Document::new(parse_xml(xml, true).unwrap())
    }

    #[test]
    fn test_parse_literal_and_missing_fields() {
        let doc = document("<api><user><id>1</id></user></api>");
        let schema = Schema::new()
            .field("source", "api")
            .field("id", FieldSpec::uses("user.id").unwrap())
            .field("name", FieldSpec::uses("user.name").unwrap())
            .field("plain", FieldSpec::new());

        let output = doc.parse(&schema, ParseOptions::default());
        assert_eq!(output["source"], Value::from("api"));
        assert_eq!(output["id"], Value::from("1"));
        assert_eq!(output["name"], Value::Null);
        assert_eq!(output["plain"], Value::Null);
    }

    #[test]
    fn test_parse_uses_many_fills_default_per_entry() {
        let doc = document("<api><a>1</a></api>");
        let schema = Schema::new().field(
            "both",
            FieldSpec::uses_many(&["a", "b"]).unwrap().default("none"),
        );

        let output = doc.parse(&schema, ParseOptions::default());
        assert_eq!(
            output["both"],
            Value::List(vec![Value::from("1"), Value::from("none")])
        );
    }

    #[test]
    fn test_parse_ignore_emits_nothing() {
        let doc = document("<api><a>1</a></api>");
        let schema = Schema::new()
            .field("a", FieldSpec::uses("a").unwrap())
            .field("lit", "x");

        assert!(doc.parse(&schema, ParseOptions { ignore: true }).is_empty());
    }

    #[test]
    fn test_filter_applies_after_default() {
        let doc = document("<api/>");
        let schema = Schema::new().field(
            "name",
            FieldSpec::uses("name")
                .unwrap()
                .default("guest")
                .filter("@strToUpper"),
        );

        let output = doc.parse(&schema, ParseOptions::default());
        assert_eq!(output["name"], Value::from("GUEST"));
    }

    #[test]
    fn test_rebase() {
        let mut doc = document("<api><user><id>1</id></user></api>");
        doc.rebase(Some("user")).unwrap();
        assert_eq!(doc.content().name(), "user");

        let err = doc.rebase(Some("missing")).unwrap_err();
        assert_eq!(
            err,
            DocumentError::BaseNotFound {
                base: "missing".to_string()
            }
        );
        assert_eq!(doc.content().name(), "user");

        doc.rebase(None).unwrap();
        assert_eq!(doc.content().name(), "api");
    }

    #[test]
    fn test_available_namespaces_are_memoized() {
        let doc = document(r#"<rss xmlns:g="urn:g"><item/></rss>"#);
        let first = doc.available_namespaces() as *const _;
        let second = doc.available_namespaces() as *const _;
        assert_eq!(first, second);
        assert_eq!(doc.namespace_uri("g"), Some("urn:g"));
        assert_eq!(doc.namespace_uri("h"), None);
    }

    #[test]
    fn test_namespaced_unknown_prefix_keeps_content() {
        let mut doc = document("<api><id>1</id></api>");
        let schema = Schema::new().field("id", FieldSpec::uses("id").unwrap());

        let output = doc.namespaced("nope", &schema, ParseOptions::default());
        assert_eq!(output["id"], Value::from("1"));
        assert!(doc.content().scope().is_none());
    }

    #[test]
    fn test_set_content_resets_namespaces() {
        let mut doc = document(r#"<a xmlns:x="urn:x"/>"#);
        assert!(doc.available_namespaces().contains_key("x"));

        doc.set_content(parse_xml(r#"<b xmlns:y="urn:y"/>"#, true).unwrap());
        assert!(doc.available_namespaces().contains_key("y"));
        assert!(!doc.available_namespaces().contains_key("x"));
    }
}
