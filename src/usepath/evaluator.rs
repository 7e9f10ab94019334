//! Use-expression evaluation against XML content.
//!
//! The evaluator walks a parsed [`UseExpr`] and a content node together.
//! Scalars and attributes read text, collections and groups build one
//! record per matched element, and self-matching patterns rotate repeated
//! elements into a keyed record or a list. Members of collections and
//! groups may be any expression kind, nested to any depth.

use super::ast::{SelfMatchKey, UseExpr};
use crate::document::node::{Record, Value, XmlNode};
use crate::document::resolver::{resolve, resolve_attribute, resolve_first};
use indexmap::IndexMap;

/// Outcome of resolving an expression.
///
/// `NotFound` means no path, attribute or collection root matched; the
/// caller decides which default stands in for it.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found(Value),
    NotFound,
}

impl Resolution {
    /// Returns the found value, or `default` when nothing matched.
    pub fn or(self, default: Value) -> Value {
        match self {
            Resolution::Found(value) => value,
            Resolution::NotFound => default,
        }
    }

    /// Returns the found value, or `Null` when nothing matched.
    pub fn or_null(self) -> Value {
        self.or(Value::Null)
    }
}

/// Maps namespace prefixes to URIs for collection scoping (`path/prefix[...]`).
pub trait NamespaceTable {
    fn namespace_uri(&self, prefix: &str) -> Option<&str>;
}

impl NamespaceTable for IndexMap<String, String> {
    fn namespace_uri(&self, prefix: &str) -> Option<&str> {
        self.get(prefix).map(String::as_str)
    }
}

/// Result of a self-matching pattern before it is placed in a record.
enum Rotation {
    /// `name(key=value)` - one entry per element, keyed by the resolved key
    Keyed(Record),
    /// `name(@=value)` - every value in document order
    Items(Vec<Value>),
}

/// Evaluates use-expressions against content nodes.
pub struct Evaluator<'a, N: NamespaceTable + ?Sized> {
    namespaces: &'a N,
}

impl<'a, N: NamespaceTable + ?Sized> Evaluator<'a, N> {
    pub fn new(namespaces: &'a N) -> Self {
        Evaluator { namespaces }
    }

    /// Evaluates an expression as a whole field.
    ///
    /// A group yields the list of its records directly; a self-matching
    /// pattern yields its keyed record or item list.
    pub fn evaluate(&self, node: &XmlNode, expr: &UseExpr) -> Resolution {
        match expr {
            UseExpr::Scalar { path, .. } => self.scalar(node, path),
            UseExpr::Attribute {
                path, attribute, ..
            } => self.attribute(node, path, attribute),
            UseExpr::Collection {
                path,
                namespace,
                members,
                ..
            } => self.collection(node, path, namespace.as_deref(), members),
            UseExpr::Group { root, members, .. } => {
                let records = self.group(node, root, members);
                if records.is_empty() {
                    Resolution::NotFound
                } else {
                    Resolution::Found(Value::List(records))
                }
            }
            UseExpr::SelfMatch {
                name, key, value, ..
            } => match self.self_match(node, name, key, value) {
                Some(Rotation::Keyed(fields)) => Resolution::Found(Value::Record(fields)),
                Some(Rotation::Items(items)) => Resolution::Found(Value::List(items)),
                None => Resolution::NotFound,
            },
        }
    }

    /// Builds one record by evaluating every member against `node`.
    pub fn evaluate_record(&self, node: &XmlNode, members: &[UseExpr]) -> Record {
        let mut record = Record::new();
        for member in members {
            self.apply_member(&mut record, node, member);
        }
        record
    }

    /// Writes the result of one member into `record`.
    fn apply_member(&self, record: &mut Record, node: &XmlNode, member: &UseExpr) {
        match member {
            UseExpr::Group {
                root,
                alias,
                members,
            } => {
                let records = self.group(node, root, members);
                record.insert(alias.clone(), Value::List(records));
            }
            UseExpr::SelfMatch {
                name,
                key,
                value,
                alias,
            } => {
                let rotation = self.self_match(node, name, key, value);
                match (rotation, alias) {
                    (Some(Rotation::Keyed(fields)), None) => record.extend(fields),
                    (Some(Rotation::Keyed(fields)), Some(alias)) => {
                        record.insert(alias.clone(), Value::Record(fields));
                    }
                    (Some(Rotation::Items(items)), alias) => {
                        let key = alias.as_deref().unwrap_or(name);
                        record.insert(key.to_string(), Value::List(items));
                    }
                    (None, Some(alias)) => {
                        let empty = match key {
                            SelfMatchKey::Item => Value::List(Vec::new()),
                            SelfMatchKey::Expr(_) => Value::Record(Record::new()),
                        };
                        record.insert(alias.clone(), empty);
                    }
                    (None, None) => {}
                }
            }
            _ => {
                let value = self.evaluate(node, member).or_null();
                record.insert(member.output_key(), value);
            }
        }
    }

    /// Text of the first element at `path`, unless it is effectively absent.
    ///
    /// A path with a `*` segment collects the text of every match into a
    /// list; an empty list is absent.
    fn scalar(&self, node: &XmlNode, path: &str) -> Resolution {
        let value = if path.split('.').any(|segment| segment.trim() == "*") {
            Value::List(
                resolve(node, path)
                    .into_iter()
                    .map(|found| Value::from(found.text()))
                    .collect(),
            )
        } else {
            match resolve_first(node, path) {
                Some(found) => Value::from(found.text()),
                None => return Resolution::NotFound,
            }
        };

        if value.is_effectively_absent() {
            Resolution::NotFound
        } else {
            Resolution::Found(value)
        }
    }

    fn attribute(&self, node: &XmlNode, path: &str, attribute: &str) -> Resolution {
        match resolve_attribute(node, path, attribute) {
            Some(text) => Resolution::Found(Value::from(text)),
            None => {
                tracing::trace!(path, attribute, "attribute not found");
                Resolution::NotFound
            }
        }
    }

    /// One record per non-empty element at `path`, in document order.
    ///
    /// A root that does not match is `NotFound`; a root whose elements are
    /// all empty is an empty list.
    fn collection(
        &self,
        node: &XmlNode,
        path: &str,
        namespace: Option<&str>,
        members: &[UseExpr],
    ) -> Resolution {
        let matched = resolve(node, path);
        if matched.is_empty() {
            tracing::trace!(path, "collection root not found");
            return Resolution::NotFound;
        }

        let scope = namespace.and_then(|prefix| self.namespaces.namespace_uri(prefix));

        let records = matched
            .into_iter()
            .filter(|element| !element.is_empty())
            .map(|element| match scope {
                Some(uri) => self.evaluate_record(&element.scoped(uri), members),
                None => self.evaluate_record(element, members),
            })
            .map(Value::Record)
            .collect();

        Resolution::Found(Value::List(records))
    }

    /// One record per element at `root`; no match yields an empty list.
    fn group(&self, node: &XmlNode, root: &str, members: &[UseExpr]) -> Vec<Value> {
        resolve(node, root)
            .into_iter()
            .map(|element| Value::Record(self.evaluate_record(element, members)))
            .collect()
    }

    /// Rotates the repeated elements at `name` into keyed entries or items.
    ///
    /// Returns `None` when no non-empty element matched. On duplicate keys
    /// the last element wins.
    fn self_match(
        &self,
        node: &XmlNode,
        name: &str,
        key: &SelfMatchKey,
        value: &UseExpr,
    ) -> Option<Rotation> {
        let elements: Vec<&XmlNode> = resolve(node, name)
            .into_iter()
            .filter(|element| !element.is_empty())
            .collect();
        if elements.is_empty() {
            return None;
        }

        match key {
            SelfMatchKey::Item => Some(Rotation::Items(
                elements
                    .into_iter()
                    .map(|element| self.evaluate(element, value).or_null())
                    .collect(),
            )),
            SelfMatchKey::Expr(key_expr) => {
                let mut fields = Record::new();
                for element in elements {
                    let resolved_key = match self.evaluate(element, key_expr) {
                        Resolution::Found(k) => k.to_key(),
                        Resolution::NotFound => None,
                    };
                    let Some(resolved_key) = resolved_key else {
                        tracing::trace!(name, "self-matching key did not resolve");
                        continue;
                    };
                    let resolved_value = self.evaluate(element, value).or_null();
                    if fields.insert(resolved_key.clone(), resolved_value).is_some() {
                        tracing::trace!(name, key = %resolved_key, "self-matching key overwritten");
                    }
                }
                Some(Rotation::Keyed(fields))
            }
        }
    }
}
