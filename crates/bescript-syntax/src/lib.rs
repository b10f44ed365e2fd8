//! # bescript-syntax
//!
//! Lexer, parser and AST for the Bes scripting language.
//!
//! This crate turns `.bes` source text into the syntax tree consumed by
//! `bescript-compiler`:
//! - [`SourceUnit`] - one parsed file: import declarations plus top-level statements
//! - [`Statement`] - `let` bindings, macro-style definitions and function definitions
//! - [`Expr`] - blocks, conditional chains, literals and references
//!
//! ## Example
//!
//! ```rust
//! use bescript_syntax::parse_source;
//!
//! let unit = parse_source("let x = `1 + 2`").unwrap();
//! assert_eq!(unit.statements.len(), 1);
//! ```

pub mod ast;
pub mod error;
pub mod parser;

pub use ast::{Expr, ImportDecl, Parameter, SourceUnit, Statement};
pub use error::{SyntaxError, SyntaxResult};
pub use parser::parse_source;
