//! Error types for bescript-compiler
//!
//! Only structural failures travel this channel; user-level name problems
//! are collected in [`crate::diagnostics::Diagnostics`] instead.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`CompileError`]
pub type CompileResult<T> = std::result::Result<T, CompileError>;

/// Fatal errors that abort the current compile immediately
#[derive(Debug, Error)]
pub enum CompileError {
    /// Failed to read a source file
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A source file did not parse
    #[error("{path}: {source}")]
    Syntax {
        path: PathBuf,
        #[source]
        source: bescript_syntax::SyntaxError,
    },

    /// A grammar invariant was violated; indicates an upstream defect,
    /// not a user mistake
    #[error("structural error: {0}")]
    Structural(String),
}
