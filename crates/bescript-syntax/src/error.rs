//! Error types for bescript-syntax

use thiserror::Error;

/// Result type for parsing operations
pub type SyntaxResult<T> = std::result::Result<T, SyntaxError>;

/// Errors that can occur while lexing or parsing Bes source
#[derive(Debug, Error)]
pub enum SyntaxError {
    /// Unexpected character in the input
    #[error("line {line}: unexpected character '{ch}'")]
    UnexpectedChar { ch: char, line: u32 },

    /// A backtick-delimited literal with no closing delimiter
    #[error("line {line}: unterminated formula literal")]
    UnterminatedFormula { line: u32 },

    /// A string literal with no closing quote
    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: u32 },

    /// Generic parse error with a message
    #[error("line {line}: {message}")]
    Parse { message: String, line: u32 },
}

impl SyntaxError {
    /// Create a parse error with a message
    pub fn parse<S: Into<String>>(message: S, line: u32) -> Self {
        SyntaxError::Parse {
            message: message.into(),
            line,
        }
    }
}
