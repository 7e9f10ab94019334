//! XML source loading.
//!
//! This module provides the [`Reader`], which turns XML text, files or
//! standard input into [`Document`]s ready for extraction. Gzipped files
//! and gzipped stdin are decompressed transparently.

use crate::config::Config;
use crate::document::parser::parse_xml;
use crate::document::Document;
use crate::filter::FilterRegistry;
use flate2::read::GzDecoder;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use thiserror::Error;

/// Errors raised while reading XML sources.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("File not found: {path}")]
    NotFound { path: String },
    #[error("Invalid XML content: {reason}")]
    InvalidContent { reason: String },
    #[error("Failed to read source: {0}")]
    Io(#[from] io::Error),
}

/// Builds documents from XML sources.
///
/// # Examples
///
/// ```
/// use xmlquill::file::loader::Reader;
///
/// let document = Reader::new().extract("<api><id>1</id></api>").unwrap();
/// assert_eq!(document.content().name(), "api");
///
/// assert!(Reader::new().extract("not xml").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Reader {
    trim_text: bool,
    filters: FilterRegistry,
}

impl Default for Reader {
    fn default() -> Self {
        Self::new()
    }
}

impl Reader {
    /// Creates a reader that trims text and provides the built-in filters.
    pub fn new() -> Self {
        Reader {
            trim_text: true,
            filters: FilterRegistry::with_builtins(),
        }
    }

    /// Creates a reader honoring the `trim_text` setting.
    pub fn with_config(config: &Config) -> Self {
        Reader {
            trim_text: config.trim_text,
            ..Self::new()
        }
    }

    /// Replaces the filter registry handed to every document.
    pub fn with_filters(mut self, filters: FilterRegistry) -> Self {
        self.filters = filters;
        self
    }

    /// Parses XML text into a document.
    ///
    /// # Errors
    ///
    /// Returns `InvalidContent` if the text is not well-formed XML or has
    /// no root element.
    pub fn extract(&self, text: &str) -> Result<Document, ReaderError> {
        let root = parse_xml(text, self.trim_text).map_err(|err| ReaderError::InvalidContent {
            reason: err.to_string(),
        })?;
        tracing::debug!(root = root.name(), "parsed XML document");
        Ok(Document::new(root).with_filters(self.filters.clone()))
    }

    /// Reads and parses an XML file; `.gz` files are decompressed.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file can't be read or decompressed, and
    /// `InvalidContent` if it is not valid XML.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Document, ReaderError> {
        let path = path.as_ref();
        let is_gzipped = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext == "gz")
            .unwrap_or(false);

        let content = if is_gzipped {
            read_gzipped(fs::File::open(path)?)?
        } else {
            fs::read_to_string(path)?
        };

        self.extract(&content)
    }

    /// Like [`Reader::load`], but reports a missing file as `NotFound`.
    pub fn local<P: AsRef<Path>>(&self, path: P) -> Result<Document, ReaderError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ReaderError::NotFound {
                path: path.display().to_string(),
            });
        }
        self.load(path)
    }

    /// Reads XML from standard input until EOF.
    pub fn from_stdin(&self) -> Result<Document, ReaderError> {
        let mut buffer = Vec::new();
        io::stdin().read_to_end(&mut buffer)?;
        self.from_bytes(&buffer)
    }

    /// Parses raw bytes, detecting gzip by its magic bytes (0x1f 0x8b).
    pub fn from_bytes(&self, bytes: &[u8]) -> Result<Document, ReaderError> {
        let content = if bytes.starts_with(&[0x1f, 0x8b]) {
            read_gzipped(bytes)?
        } else {
            String::from_utf8(bytes.to_vec()).map_err(|err| ReaderError::InvalidContent {
                reason: err.to_string(),
            })?
        };
        self.extract(&content)
    }
}

fn read_gzipped<R: Read>(source: R) -> Result<String, ReaderError> {
    let mut decoder = GzDecoder::new(source);
    let mut content = String::new();
    decoder.read_to_string(&mut content)?;
    Ok(content)
}
