//! Named value filters applied after extraction.
//!
//! A schema field may name a filter that post-processes its value. Two
//! reference forms exist:
//!
//! - `@strToUpper` - a filter hosted by the document, registered under the
//!   capability name `filterStrToUpper`
//! - `Class@method` - a filter registered under a class and method name;
//!   a bare `Class` means the method `filter`
//!
//! Filters are looked up in an explicit [`FilterRegistry`]. A reference
//! that does not resolve leaves the value unchanged.

use crate::document::node::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// A filter function. Shared so registries can be cloned into documents.
pub type FilterFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// A reference to a filter, as written in a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterRef {
    /// `@method`
    Hosted { method: String },
    /// `Class@method` or bare `Class`
    Class { class: String, method: String },
}

impl FilterRef {
    /// Parses a filter reference.
    ///
    /// ```
    /// use xmlquill::filter::FilterRef;
    ///
    /// assert_eq!(
    ///     FilterRef::parse("@strToUpper"),
    ///     FilterRef::Hosted { method: "strToUpper".to_string() }
    /// );
    /// assert_eq!(
    ///     FilterRef::parse("Slug"),
    ///     FilterRef::Class { class: "Slug".to_string(), method: "filter".to_string() }
    /// );
    /// ```
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        match text.split_once('@') {
            Some(("", method)) => FilterRef::Hosted {
                method: method.to_string(),
            },
            Some((class, method)) => FilterRef::Class {
                class: class.to_string(),
                method: method.to_string(),
            },
            None => FilterRef::Class {
                class: text.to_string(),
                method: "filter".to_string(),
            },
        }
    }

    /// Key the referenced filter is registered under.
    ///
    /// Hosted filters use the capability name `filter` + the method with
    /// its first letter uppercased.
    pub fn registry_key(&self) -> String {
        match self {
            FilterRef::Hosted { method } => capability_name(method),
            FilterRef::Class { class, method } => format!("{}@{}", class, method),
        }
    }
}

fn capability_name(method: &str) -> String {
    let mut chars = method.chars();
    match chars.next() {
        Some(first) => format!("filter{}{}", first.to_uppercase(), chars.as_str()),
        None => "filter".to_string(),
    }
}

impl fmt::Display for FilterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterRef::Hosted { method } => write!(f, "@{}", method),
            FilterRef::Class { class, method } => write!(f, "{}@{}", class, method),
        }
    }
}

impl FromStr for FilterRef {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(FilterRef::parse(s))
    }
}

impl Serialize for FilterRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FilterRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(FilterRef::parse(&text))
    }
}

/// Registry of filters available to a document.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: IndexMap<String, FilterFn>,
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("filters", &self.filters.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FilterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in hosted filters:
    /// `@strToUpper`, `@strToLower` and `@trim`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_hosted("strToUpper", |value: Value| {
            value.map_text(&|s: String| s.to_uppercase())
        });
        registry.register_hosted("strToLower", |value: Value| {
            value.map_text(&|s: String| s.to_lowercase())
        });
        registry.register_hosted("trim", |value: Value| {
            value.map_text(&|s: String| s.trim().to_string())
        });
        registry
    }

    /// Registers a hosted filter, referenced from schemas as `@method`.
    pub fn register_hosted<F>(&mut self, method: &str, f: F) -> &mut Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.filters.insert(capability_name(method), Arc::new(f));
        self
    }

    /// Registers a filter referenced as `class@method`.
    ///
    /// # Arguments
    ///
    /// * `class` - The class part of the reference; a bare `Class` reference
    ///   looks up the `filter` method
    /// * `method` - The method part of the reference
    /// * `f` - The function applied to field values
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlquill::document::node::Value;
    /// use xmlquill::filter::{FilterRef, FilterRegistry};
    ///
    /// let mut filters = FilterRegistry::new();
    /// filters.register("Slug", "filter", |value: Value| {
    ///     value.map_text(&|s: String| s.replace(' ', "-"))
    /// });
    ///
    /// let slug = FilterRef::parse("Slug");
    /// assert_eq!(filters.apply(&slug, Value::from("a b")), Value::from("a-b"));
    /// ```
    pub fn register<F>(&mut self, class: &str, method: &str, f: F) -> &mut Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.filters
            .insert(format!("{}@{}", class, method), Arc::new(f));
        self
    }

    /// Looks up the function registered for `filter`.
    ///
    /// # Arguments
    ///
    /// * `filter` - A parsed schema reference, hosted (`@method`) or
    ///   class-based (`Class@method`)
    ///
    /// # Returns
    ///
    /// - `Some(&FilterFn)` if a filter is registered under the reference's key
    /// - `None` otherwise; callers decide whether that is an error
    pub fn resolve(&self, filter: &FilterRef) -> Option<&FilterFn> {
        self.filters.get(&filter.registry_key())
    }

    pub fn contains(&self, filter: &FilterRef) -> bool {
        self.resolve(filter).is_some()
    }

    /// Applies `filter` to `value`.
    ///
    /// An unknown filter is not an error: the value passes through
    /// unchanged and the miss is logged at debug level.
    pub fn apply(&self, filter: &FilterRef, value: Value) -> Value {
        match self.resolve(filter) {
            Some(f) => f(value),
            None => {
                tracing::debug!(filter = %filter, "filter not registered, value unchanged");
                value
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!(
            FilterRef::parse("Money@cents"),
            FilterRef::Class {
                class: "Money".to_string(),
                method: "cents".to_string()
            }
        );
        assert_eq!(
            "@trim".parse::<FilterRef>().unwrap(),
            FilterRef::Hosted {
                method: "trim".to_string()
            }
        );
    }

    #[test]
    fn test_registry_key() {
        assert_eq!(FilterRef::parse("@strToUpper").registry_key(), "filterStrToUpper");
        assert_eq!(FilterRef::parse("Slug").registry_key(), "Slug@filter");
    }

    #[test]
    fn test_display_round_trips() {
        assert_eq!(FilterRef::parse("@trim").to_string(), "@trim");
        assert_eq!(FilterRef::parse("Slug").to_string(), "Slug@filter");
    }

    #[test]
    fn test_builtins_map_text_leaves() {
        let registry = FilterRegistry::with_builtins();
        let upper = FilterRef::parse("@strToUpper");

        assert_eq!(registry.apply(&upper, Value::from("abc")), Value::from("ABC"));
        assert_eq!(
            registry.apply(&upper, Value::List(vec![Value::from("a"), Value::Null])),
            Value::List(vec![Value::from("A"), Value::Null])
        );
    }

    #[test]
    fn test_unknown_filter_passes_through() {
        let registry = FilterRegistry::new();
        let value = Value::from("keep");
        assert_eq!(registry.apply(&FilterRef::parse("@nope"), value.clone()), value);
    }

    #[test]
    fn test_register_class_filter() {
        let mut registry = FilterRegistry::new();
        registry.register("Slug", "filter", |value: Value| {
            value.map_text(&|s: String| s.replace(' ', "-"))
        });

        let slug = FilterRef::parse("Slug");
        assert!(registry.contains(&slug));
        assert_eq!(registry.apply(&slug, Value::from("a b")), Value::from("a-b"));
    }

    #[test]
    fn test_resolve_hosted_by_capability_name() {
        let registry = FilterRegistry::with_builtins();
        assert!(registry.resolve(&FilterRef::parse("@strToUpper")).is_some());
        assert!(registry.resolve(&FilterRef::parse("StrToUpper")).is_none());
        assert!(registry.resolve(&FilterRef::parse("@strtoupper")).is_none());
    }

    #[test]
    fn test_deserialize_from_string() {
        let filter: FilterRef = serde_json::from_str("\"@strToLower\"").unwrap();
        assert_eq!(
            filter,
            FilterRef::Hosted {
                method: "strToLower".to_string()
            }
        );
    }
}
