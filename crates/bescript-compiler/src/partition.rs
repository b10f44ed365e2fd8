//! Program partitioner
//!
//! Splits a parsed source unit into the three statement kinds, preserving
//! source order within each bucket. The buckets fix the top-level
//! compilation order (macros, then lets, then functions); within a bucket,
//! order only affects diagnostic ordering and which duplicate is reported
//! first, never the content of non-conflicting names.
//!
//! The "exactly one statement kind per node" check of the original grammar
//! is enforced at the type level by [`Statement`]'s closed variants, so no
//! runtime structural check is needed here.

use bescript_syntax::{ImportDecl, SourceUnit, Statement};

/// Top-level statements of a (possibly merged) program, partitioned by kind
#[derive(Debug, Default, Clone)]
pub struct ProgramParts {
    /// Macro-style `name : expr` definitions
    pub defines: Vec<Statement>,
    /// `let name = expr` bindings
    pub lets: Vec<Statement>,
    /// `name(params) { ... }` definitions
    pub functions: Vec<Statement>,
}

impl ProgramParts {
    /// Append another file's statements after this one's, preserving order
    pub fn extend(&mut self, other: ProgramParts) {
        self.defines.extend(other.defines);
        self.lets.extend(other.lets);
        self.functions.extend(other.functions);
    }

    /// Total number of top-level statements
    pub fn len(&self) -> usize {
        self.defines.len() + self.lets.len() + self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partition one parsed file into its imports and statement buckets
pub fn partition(unit: SourceUnit) -> (Vec<ImportDecl>, ProgramParts) {
    let mut parts = ProgramParts::default();

    for stm in unit.statements {
        match stm {
            Statement::Define { .. } => parts.defines.push(stm),
            Statement::Let { .. } => parts.lets.push(stm),
            Statement::Function { .. } => parts.functions.push(stm),
        }
    }

    (unit.imports, parts)
}
