//! Error types for use-expression parsing.

use thiserror::Error;

/// Errors that can occur while parsing a use-expression.
///
/// Positions are byte offsets into the full expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UseExprError {
    /// An opening bracket, brace or parenthesis is never closed.
    #[error("Unclosed '{open}' opened at position {position}")]
    Unclosed { open: char, position: usize },
    /// A closing character that does not match the innermost opener.
    #[error("Unexpected token '{found}' at position {position}, expected {expected}")]
    UnexpectedToken {
        position: usize,
        found: char,
        expected: String,
    },
    /// Text left over after a complete group, collection or pattern.
    #[error("Unexpected trailing input '{found}' at position {position}")]
    TrailingInput { position: usize, found: String },
    /// Invalid syntax with description.
    #[error("Invalid use-expression syntax: {message}")]
    InvalidSyntax { message: String },
}
