//! Extraction schemas.
//!
//! A schema maps output keys to fields. A field is either a literal value
//! emitted as-is, or a specification with any of:
//!
//! - `uses` - a use-expression, or a list of them
//! - `default` - the value used when nothing matched
//! - `filter` - a filter reference applied to the result
//!
//! Schemas can be built in code or loaded from YAML, JSON or TOML. Every
//! use-expression is parsed when the schema is built, so a malformed
//! expression is reported before any document is touched.
//!
//! # Example
//!
//! ```
//! use xmlquill::schema::{FieldSpec, Schema};
//!
//! let schema = Schema::from_yaml_str(
//!     "id:\n  uses: user.id\nname:\n  uses: user.name\n  default: anonymous\n",
//! )
//! .unwrap();
//! assert_eq!(schema.len(), 2);
//!
//! let built = Schema::new()
//!     .field("id", FieldSpec::uses("user.id").unwrap())
//!     .field("source", "api");
//! assert_eq!(built.len(), 2);
//! ```

use crate::document::node::{Record, Value};
use crate::filter::FilterRef;
use crate::usepath::{Parser, UseExpr, UseExprError};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use std::path::Path;
use thiserror::Error;

/// Errors raised while building or loading a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Invalid YAML schema: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid JSON schema: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid TOML schema: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Field '{key}' has an invalid use-expression")]
    Expression {
        key: String,
        #[source]
        source: UseExprError,
    },
    #[error("Field '{key}' is invalid: {reason}")]
    InvalidField { key: String, reason: String },
    #[error("Unsupported schema format for {path} (expected .yaml, .yml, .json or .toml)")]
    UnsupportedFormat { path: String },
    #[error("Failed to read schema: {0}")]
    Io(#[from] std::io::Error),
}

/// Options for one parse run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ParseOptions {
    /// Evaluate every field but emit no keys.
    #[serde(default)]
    pub ignore: bool,
}

/// The `uses` of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum Uses {
    One(UseExpr),
    /// Each entry resolves separately; the field value is the list.
    Many(Vec<UseExpr>),
}

/// A field that is resolved against the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSpec {
    pub uses: Option<Uses>,
    pub default: Option<Value>,
    pub filter: Option<FilterRef>,
}

impl FieldSpec {
    /// An empty field; it resolves to `Null`.
    pub fn new() -> Self {
        FieldSpec {
            uses: None,
            default: None,
            filter: None,
        }
    }

    /// A field reading one use-expression.
    pub fn uses(expr: &str) -> Result<Self, UseExprError> {
        Ok(FieldSpec {
            uses: Some(Uses::One(Parser::parse(expr)?)),
            ..Default::default()
        })
    }

    /// A field reading several use-expressions into a list.
    pub fn uses_many(exprs: &[&str]) -> Result<Self, UseExprError> {
        let parsed = exprs
            .iter()
            .map(|expr| Parser::parse(expr))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FieldSpec {
            uses: Some(Uses::Many(parsed)),
            ..Default::default()
        })
    }

    /// A field with no `uses`, always resolving to `value`.
    pub fn default_only(value: impl Into<Value>) -> Self {
        FieldSpec {
            default: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn filter(mut self, filter: &str) -> Self {
        self.filter = Some(FilterRef::parse(filter));
        self
    }

    /// Value used when `uses` did not match, `Null` if none was given.
    pub fn fallback(&self) -> Value {
        self.default.clone().unwrap_or_default()
    }

    /// Builds a field from the mapping form (`uses`, `default`, `filter`).
    fn from_record(key: &str, fields: Record) -> Result<Self, SchemaError> {
        let mut spec = FieldSpec::new();

        for (name, value) in fields {
            match name.as_str() {
                "uses" => spec.uses = Some(parse_uses(key, value)?),
                "default" => spec.default = Some(value),
                "filter" => match value {
                    Value::String(text) => spec.filter = Some(FilterRef::parse(&text)),
                    Value::Null => {}
                    _ => return Err(invalid(key, "filter must be a string")),
                },
                other => {
                    return Err(invalid(
                        key,
                        &format!("unknown key '{}' (expected uses, default or filter)", other),
                    ))
                }
            }
        }

        Ok(spec)
    }
}

fn invalid(key: &str, reason: &str) -> SchemaError {
    SchemaError::InvalidField {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_uses(key: &str, value: Value) -> Result<Uses, SchemaError> {
    let parse = |text: &str| {
        Parser::parse(text).map_err(|source| SchemaError::Expression {
            key: key.to_string(),
            source,
        })
    };

    match value {
        Value::String(text) => Ok(Uses::One(parse(&text)?)),
        Value::List(items) => items
            .iter()
            .map(|item| match item.as_str() {
                Some(text) => parse(text),
                None => Err(invalid(key, "uses entries must be strings")),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Uses::Many),
        _ => Err(invalid(key, "uses must be a string or a list of strings")),
    }
}

/// One schema entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Spec(FieldSpec),
    /// Emitted as-is, without touching the document.
    Literal(Value),
}

impl From<FieldSpec> for Field {
    fn from(spec: FieldSpec) -> Self {
        Field::Spec(spec)
    }
}

impl From<Value> for Field {
    fn from(value: Value) -> Self {
        Field::Literal(value)
    }
}

impl From<&str> for Field {
    fn from(text: &str) -> Self {
        Field::Literal(Value::from(text))
    }
}

/// Ordered mapping from output key to field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: IndexMap<String, Field>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the field written to `key`.
    pub fn field(mut self, key: &str, field: impl Into<Field>) -> Self {
        self.fields.insert(key.to_string(), field.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Field> {
        self.fields.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Field)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Builds a schema from raw values.
    ///
    /// Mappings become field specifications; anything else is a literal.
    pub fn from_values(raw: IndexMap<String, Value>) -> Result<Self, SchemaError> {
        let mut fields = IndexMap::with_capacity(raw.len());
        for (key, value) in raw {
            let field = match value {
                Value::Record(record) => Field::Spec(FieldSpec::from_record(&key, record)?),
                other => Field::Literal(other),
            };
            fields.insert(key, field);
        }
        Ok(Schema { fields })
    }

    /// Parses a YAML schema.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlquill::schema::Schema;
    ///
    /// let schema = Schema::from_yaml_str("id:\n  uses: user.id\nsite: example.com\n").unwrap();
    /// assert_eq!(schema.len(), 2);
    ///
    /// assert!(Schema::from_yaml_str("id:\n  uses: user[id\n").is_err());
    /// ```
    pub fn from_yaml_str(text: &str) -> Result<Self, SchemaError> {
        let raw: IndexMap<String, Value> = serde_yaml::from_str(text)?;
        Self::from_values(raw)
    }

    pub fn from_json_str(text: &str) -> Result<Self, SchemaError> {
        let raw: IndexMap<String, Value> = serde_json::from_str(text)?;
        Self::from_values(raw)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, SchemaError> {
        let raw: IndexMap<String, Value> = toml::from_str(text)?;
        Self::from_values(raw)
    }

    /// Loads a schema file, choosing the format by extension.
    ///
    /// # Arguments
    ///
    /// * `path` - A `.yaml`, `.yml`, `.json` or `.toml` file
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `UnsupportedFormat` for any other extension, before reading the file
    /// - `Io` if the file can't be read
    /// - `Yaml`, `Json` or `Toml` if the contents don't parse
    /// - `Expression` or `InvalidField` if a field is malformed
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        let read = || std::fs::read_to_string(path);
        match extension.as_deref() {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&read()?),
            Some("json") => Self::from_json_str(&read()?),
            Some("toml") => Self::from_toml_str(&read()?),
            _ => Err(SchemaError::UnsupportedFormat {
                path: path.display().to_string(),
            }),
        }
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = IndexMap::<String, Value>::deserialize(deserializer)?;
        Schema::from_values(raw).map_err(serde::de::Error::custom)
    }
}
