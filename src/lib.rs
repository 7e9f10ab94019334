//! XMLQuill - schema-driven field extraction from XML documents.
//!
//! A schema maps output keys to use-expressions; a [`document::Document`]
//! evaluates them against its XML tree and returns an ordered record.
//!
//! ```
//! use xmlquill::file::loader::Reader;
//! use xmlquill::schema::{ParseOptions, Schema};
//!
//! let document = Reader::new()
//!     .extract("<api><user><id>1</id><name>Mior</name></user></api>")
//!     .unwrap();
//! let schema = Schema::from_yaml_str("users:\n  uses: user[id,name>fullname]\n").unwrap();
//!
//! let output = document.parse(&schema, ParseOptions::default());
//! assert_eq!(
//!     serde_json::to_string(&output).unwrap(),
//!     r#"{"users":[{"id":"1","fullname":"Mior"}]}"#
//! );
//! ```

pub mod config;
pub mod document;
pub mod file;
pub mod filter;
pub mod schema;
pub mod usepath;
