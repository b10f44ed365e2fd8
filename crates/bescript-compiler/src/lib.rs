//! # bescript-compiler
//!
//! Compiles Bes programs into named spreadsheet formulas.
//!
//! The pipeline:
//! 1. [`resolver`] walks the import graph and merges every reachable file
//!    into one partitioned program
//! 2. [`compile`] translates macros, lets and functions into formula text,
//!    applying scoping ([`env`]), name validation ([`names`]), parameter
//!    hygiene ([`hygiene`]) and the versioned-function tagging pass
//!    ([`versioned`])
//! 3. [`publish`] writes the resulting [`FormulaTable`] into a
//!    [`NamedFormulaStore`]
//!
//! Name-level problems accumulate in [`Diagnostics`] instead of aborting;
//! only I/O and parse failures return an error.
//!
//! ## Example
//!
//! ```rust
//! use bescript_compiler::compile_source;
//!
//! let output = compile_source("let total = `SUM(A:A)`").unwrap();
//! assert!(output.diagnostics.is_clean());
//! assert_eq!(output.table.get("total"), Some("SUM(A:A)"));
//! ```

pub mod compile;
pub mod diagnostics;
pub mod env;
pub mod error;
pub mod hygiene;
pub mod names;
pub mod partition;
pub mod publish;
pub mod resolver;
pub mod table;
pub mod versioned;

use std::path::Path;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{CompileError, CompileResult};
pub use publish::{publish, NamedFormulaStore, PublishOptions, OWNERSHIP_MARKER};
pub use table::FormulaTable;

/// The result of one compile run: the formula table plus everything the
/// compiler had to say about it. The table is complete even when the
/// diagnostics are dirty; callers gate emission on
/// [`Diagnostics::is_clean`].
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub table: FormulaTable,
    pub diagnostics: Diagnostics,
}

/// Compile a script file and everything it imports.
pub fn compile_file(path: &Path) -> CompileResult<CompileOutput> {
    let mut diagnostics = Diagnostics::new();
    let parts = resolver::resolve_file(path, &mut diagnostics)?;
    let table = compile::compile_parts(&parts, &mut diagnostics);
    Ok(CompileOutput { table, diagnostics })
}

/// Compile a standalone source string. Import declarations have no
/// directory to resolve against here and are rejected.
pub fn compile_source(source: &str) -> CompileResult<CompileOutput> {
    let unit = bescript_syntax::parse_source(source).map_err(|source| CompileError::Syntax {
        path: "<source>".into(),
        source,
    })?;
    let (imports, parts) = partition::partition(unit);
    if let Some(import) = imports.first() {
        return Err(CompileError::Structural(format!(
            "cannot resolve import `{}` when compiling from a string",
            import.name
        )));
    }
    let mut diagnostics = Diagnostics::new();
    let table = compile::compile_parts(&parts, &mut diagnostics);
    Ok(CompileOutput { table, diagnostics })
}
