//! Use-expression grammar and evaluator for XML field extraction.
//!
//! A use-expression says where a field's value lives in an XML document
//! and what shape the extracted value takes.
//!
//! # Supported Syntax
//!
//! - `user.id` - text of the first `id` under the first `user`
//! - `@` - the current element
//! - `user::followers` or `::id` - an attribute
//! - `*.name` - fan out over every child element
//! - `user[id,name>fullname]` - one record per `user`, with aliased members
//! - `item/g[id]` - records scoped to the namespace bound to prefix `g`
//! - `FEATURE{FNAME>name}>features` - nested grouping, any depth
//! - `property(::id=value)` - rotate repeated elements into a keyed record
//! - `tag(@=@)` - collect repeated elements into a list
//!
//! # Examples
//!
//! ```
//! use xmlquill::usepath::Parser;
//!
//! let expr = Parser::parse("user[id,name>fullname]").unwrap();
//! assert_eq!(expr.to_string(), "user[id,name>fullname]");
//! ```

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod parser;

pub use ast::{SelfMatchKey, UseExpr};
pub use error::UseExprError;
pub use evaluator::{Evaluator, NamespaceTable, Resolution};
pub use parser::{tokenize, Parser};
