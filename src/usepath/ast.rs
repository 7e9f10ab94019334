//! Abstract syntax tree types for use-expressions.

use std::fmt;

/// One parsed use-expression.
///
/// Each variant renders back to canonical source text through `Display`;
/// that text (without the alias) is the output key of an unaliased member.
#[derive(Debug, Clone, PartialEq)]
pub enum UseExpr {
    /// Dot-path to an element whose text is the value (`user.id`, `@`)
    Scalar { path: String, alias: Option<String> },
    /// Attribute on the element at `path` (`user::followers`, `::id`)
    Attribute {
        path: String,
        attribute: String,
        alias: Option<String>,
    },
    /// One record per element at `path` (`user[id,name>fullname]`).
    /// `namespace` is the prefix after a `/` in the path (`item/g[id]`).
    Collection {
        path: String,
        namespace: Option<String>,
        members: Vec<UseExpr>,
        alias: Option<String>,
    },
    /// Multi-level grouping (`FEATURE{FNAME>name}>features`).
    /// `alias` defaults to `root`.
    Group {
        root: String,
        alias: String,
        members: Vec<UseExpr>,
    },
    /// Key/value rotation over repeated elements (`property(::id=value)`)
    SelfMatch {
        name: String,
        key: SelfMatchKey,
        value: Box<UseExpr>,
        alias: Option<String>,
    },
}

/// Left-hand side of a self-matching pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum SelfMatchKey {
    /// `@` - collect values into a list
    Item,
    /// Expression resolved on each element to produce its key
    Expr(Box<UseExpr>),
}

impl UseExpr {
    /// Explicit alias, if one was written (`>alias`).
    ///
    /// A group always reports its alias, which defaults to its root.
    pub fn alias(&self) -> Option<&str> {
        match self {
            UseExpr::Scalar { alias, .. }
            | UseExpr::Attribute { alias, .. }
            | UseExpr::Collection { alias, .. }
            | UseExpr::SelfMatch { alias, .. } => alias.as_deref(),
            UseExpr::Group { alias, .. } => Some(alias),
        }
    }

    /// Key this expression writes to when it is a member of a record.
    ///
    /// ```
    /// use xmlquill::usepath::Parser;
    ///
    /// assert_eq!(Parser::parse("name>fullname").unwrap().output_key(), "fullname");
    /// assert_eq!(Parser::parse("user::id").unwrap().output_key(), "user::id");
    /// assert_eq!(Parser::parse("A{B}").unwrap().output_key(), "A");
    /// ```
    pub fn output_key(&self) -> String {
        match self.alias() {
            Some(alias) => alias.to_string(),
            None => self.source(),
        }
    }

    /// Canonical source text without the alias.
    pub fn source(&self) -> String {
        match self {
            UseExpr::Scalar { path, .. } => path.clone(),
            UseExpr::Attribute {
                path, attribute, ..
            } => format!("{}::{}", path, attribute),
            UseExpr::Collection {
                path,
                namespace,
                members,
                ..
            } => {
                let scope = namespace
                    .as_ref()
                    .map(|ns| format!("/{}", ns))
                    .unwrap_or_default();
                format!("{}{}[{}]", path, scope, join(members))
            }
            UseExpr::Group { root, members, .. } => format!("{}{{{}}}", root, join(members)),
            UseExpr::SelfMatch {
                name, key, value, ..
            } => {
                let key = match key {
                    SelfMatchKey::Item => "@".to_string(),
                    SelfMatchKey::Expr(expr) => expr.to_string(),
                };
                format!("{}({}={})", name, key, value)
            }
        }
    }
}

fn join(members: &[UseExpr]) -> String {
    members
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl fmt::Display for UseExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source())?;
        match self {
            UseExpr::Group { root, alias, .. } if alias != root => write!(f, ">{}", alias),
            UseExpr::Group { .. } => Ok(()),
            _ => match self.alias() {
                Some(alias) => write!(f, ">{}", alias),
                None => Ok(()),
            },
        }
    }
}
