//! The compiled formula table
//!
//! Maps each top-level name to its compiled formula text, in insertion
//! order. Every name occupies exactly one slot: on a duplicate insert the
//! first binding wins and the caller reports the redefinition.

/// Insertion-ordered name → compiled-formula mapping
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FormulaTable {
    entries: Vec<(String, String)>,
}

impl FormulaTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a compiled formula. Returns false (keeping the first value)
    /// if the name is already present.
    pub fn insert(&mut self, name: &str, formula: String) -> bool {
        if self.contains(name) {
            return false;
        }
        self.entries.push((name.to_string(), formula));
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, f)| f.as_str())
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, f)| (n.as_str(), f.as_str()))
    }

    /// Rewrite every formula in place (used by the versioned-function pass)
    pub fn map_formulas<F: Fn(&str) -> String>(&mut self, f: F) {
        for (_, formula) in &mut self.entries {
            *formula = f(formula);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
