//! Name environment
//!
//! Two tiers of macro-style definitions: the global table accumulated across
//! the whole program, and a per-block local overlay that is cloned on block
//! entry and discarded when the block's compilation completes. Real runtime
//! (`let`) bindings live outside this module, in the block compiler, because
//! they materialize in the output instead of being inlined.

use std::collections::hash_map::HashMap;
use std::collections::HashSet;

/// An insertion-ordered map from name to compiled formula text
#[derive(Debug, Default, Clone)]
pub struct DefineMap {
    order: Vec<String>,
    values: HashMap<String, String>,
}

impl DefineMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a definition. Returns false (and keeps the first value) if the
    /// name was already defined.
    pub fn insert(&mut self, name: &str, value: String) -> bool {
        if self.values.contains_key(name) {
            return false;
        }
        self.order.push(name.to_string());
        self.values.insert(name.to_string(), value);
        true
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterate definitions in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.order
            .iter()
            .map(|name| (name.as_str(), self.values[name].as_str()))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// The per-block local overlay of macro definitions.
///
/// `own` tracks the names this block itself introduced: the uniqueness check
/// applies only among a block's own macro names, so shadowing an outer or
/// global definition of the same spelling is allowed.
#[derive(Debug, Default, Clone)]
pub struct Scope {
    defines: DefineMap,
    own: HashSet<String>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a nested block: inherit the overlay, start a fresh `own` set
    pub fn child(&self) -> Scope {
        Scope {
            defines: self.defines.clone(),
            own: HashSet::new(),
        }
    }

    /// Add a macro definition introduced by this block.
    /// Returns false if this block already defined the name.
    pub fn define(&mut self, name: &str, value: String) -> bool {
        if self.own.contains(name) {
            return false;
        }
        self.own.insert(name.to_string());
        // Shadowing an inherited definition replaces it for this scope.
        if self.defines.contains(name) {
            let mut rebuilt = DefineMap::new();
            for (n, v) in self.defines.iter() {
                if n != name {
                    rebuilt.insert(n, v.to_string());
                }
            }
            self.defines = rebuilt;
        }
        self.defines.insert(name, value);
        true
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.defines.get(name)
    }

    pub fn defined_here(&self, name: &str) -> bool {
        self.own.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_map_keeps_first() {
        let mut map = DefineMap::new();
        assert!(map.insert("a", "1".into()));
        assert!(!map.insert("a", "2".into()));
        assert_eq!(map.get("a"), Some("1"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_define_map_insertion_order() {
        let mut map = DefineMap::new();
        map.insert("z", "1".into());
        map.insert("a", "2".into());
        map.insert("m", "3".into());
        let names: Vec<&str> = map.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_scope_shadowing_allowed_redefinition_not() {
        let mut outer = Scope::new();
        assert!(outer.define("x", "1".into()));

        let mut inner = outer.child();
        // Shadowing the inherited definition is fine
        assert!(inner.define("x", "2".into()));
        assert_eq!(inner.get("x"), Some("2"));
        // Redefining within the same block is not
        assert!(!inner.define("x", "3".into()));
        assert_eq!(inner.get("x"), Some("2"));

        // The outer scope never sees the inner overlay
        assert_eq!(outer.get("x"), Some("1"));
    }
}
