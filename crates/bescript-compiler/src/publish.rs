//! Publishing compiled formulas into a named-formula store
//!
//! The compiler owns the names it creates and nothing else. Ownership is
//! tracked through the name's comment: every published name carries the
//! marker, and a later run only clears names whose comment contains it.
//! Hand-authored names are never touched; a collision with one is an error
//! unless overwriting was requested.

use std::collections::HashMap;

use crate::diagnostics::Diagnostics;
use crate::table::FormulaTable;

/// Comment marker identifying names created by this compiler
pub const OWNERSHIP_MARKER: &str = "===Compiled with bescript===";

/// Destination for published name → formula definitions.
///
/// Implemented by the workbook container; tests use an in-memory store.
pub trait NamedFormulaStore {
    /// All currently defined names, in store order
    fn names(&self) -> Vec<String>;
    /// The stored formula text for a name
    fn formula(&self, name: &str) -> Option<&str>;
    /// The stored comment for a name
    fn comment(&self, name: &str) -> Option<&str>;
    /// Define or replace a name
    fn set(&mut self, name: &str, formula: &str, comment: Option<&str>);
    /// Remove a name; removing an absent name is a no-op
    fn remove(&mut self, name: &str);
}

/// Knobs for one publish pass
#[derive(Debug, Clone, Copy)]
pub struct PublishOptions {
    /// Remove previously published names before writing the new set
    pub clear_previous: bool,
    /// Replace names not created by this compiler instead of erroring
    pub overwrite: bool,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            clear_previous: true,
            overwrite: false,
        }
    }
}

/// Write the compiled table into `store`.
///
/// Existing comments on previously published names survive the rewrite, so
/// a user annotation appended after the marker is kept across recompiles.
/// Collisions with foreign names are recorded as diagnostics; the caller
/// decides whether a dirty run still gets saved.
pub fn publish<S: NamedFormulaStore>(
    table: &FormulaTable,
    store: &mut S,
    options: PublishOptions,
    diags: &mut Diagnostics,
) {
    let mut old_comments: HashMap<String, String> = HashMap::new();

    if options.clear_previous {
        for name in store.names() {
            let owned_comment = store
                .comment(&name)
                .filter(|c| c.contains(OWNERSHIP_MARKER))
                .map(str::to_string);
            if let Some(comment) = owned_comment {
                old_comments.insert(name.clone(), comment);
                store.remove(&name);
            }
        }
    }

    for (name, formula) in table.iter() {
        if store.formula(name).is_some() && !options.overwrite {
            diags.error(format!(
                "the name `{name}` is already defined in the workbook and overwriting was not requested"
            ));
            continue;
        }
        let comment = old_comments
            .get(name)
            .map(String::as_str)
            .unwrap_or(OWNERSHIP_MARKER);
        store.set(name, formula, Some(comment));
    }
}
