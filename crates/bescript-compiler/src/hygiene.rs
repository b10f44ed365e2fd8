//! Hygiene rewriter
//!
//! Whole-word textual qualification of bound names in generated formula
//! text. The target formula language has no structured representation
//! available here, so this is a pure `(names, text) → text` transformation.
//!
//! A candidate occurrence only counts as a whole word when
//! - the preceding character is not a word character or a backslash, and
//! - the following character is not a word character, a field-access dot,
//!   or a backslash.
//!
//! The dot exclusion keeps `RATE` in `STDEV.P` style names intact, and the
//! backslash exclusion leaves deliberately escaped text alone. At any match
//! position the longest candidate name wins, so a dotted registry name
//! beats its own prefix.

/// Prefix qualifying let-bound names and closure parameters in storage
pub const PARAM_PREFIX: &str = "_xlpm.";

/// Prefix qualifying optional/array-style closure parameters
pub const OPTIONAL_PARAM_PREFIX: &str = "_xlop.";

fn blocks_word_start(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '\\'
}

fn blocks_word_end(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '\\'
}

/// Rewrite every whole-word occurrence of any of `names` in `text` to
/// `prefix` + name.
pub fn qualify_names<S: AsRef<str>>(text: &str, names: &[S], prefix: &str) -> String {
    let mut candidates: Vec<&str> = names
        .iter()
        .map(AsRef::as_ref)
        .filter(|n| !n.is_empty())
        .collect();
    if candidates.is_empty() {
        return text.to_string();
    }
    // Longest first, so e.g. NORM.S.DIST is tried before NORM.DIST
    candidates.sort_by(|a, b| b.len().cmp(&a.len()));

    let mut out = String::with_capacity(text.len() + prefix.len());
    let mut prev: Option<char> = None;
    let mut i = 0;

    while i < text.len() {
        let at_word_start = prev.map_or(true, |c| !blocks_word_start(c));
        if at_word_start {
            let matched = candidates.iter().find(|name| {
                text[i..].starts_with(**name)
                    && text[i + name.len()..]
                        .chars()
                        .next()
                        .map_or(true, |c| !blocks_word_end(c))
            });
            if let Some(name) = matched {
                out.push_str(prefix);
                out.push_str(name);
                prev = name.chars().last();
                i += name.len();
                continue;
            }
        }

        let c = text[i..].chars().next().unwrap();
        out.push(c);
        prev = Some(c);
        i += c.len_utf8();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn qualify(text: &str, names: &[&str]) -> String {
        qualify_names(text, names, PARAM_PREFIX)
    }

    #[test]
    fn test_whole_word_rewrite() {
        assert_eq!(qualify("a + b", &["a"]), "_xlpm.a + b");
        assert_eq!(qualify("IF(a>0,a,b)", &["a", "b"]), "IF(_xlpm.a>0,_xlpm.a,_xlpm.b)");
    }

    #[test]
    fn test_partial_words_untouched() {
        assert_eq!(qualify("abc + ab", &["ab"]), "abc + _xlpm.ab");
        assert_eq!(qualify("cab", &["ab"]), "cab");
        assert_eq!(qualify("ab_c", &["ab"]), "ab_c");
        assert_eq!(qualify("ab1", &["ab"]), "ab1");
    }

    #[test]
    fn test_field_access_dot_blocks_match() {
        assert_eq!(qualify("rec.x + x", &["x"]), "rec.x + _xlpm.x");
        // A trailing dot means the name is a field-access head, not a binding
        assert_eq!(qualify("x.field", &["x"]), "x.field");
    }

    #[test]
    fn test_backslash_escape_blocks_match() {
        assert_eq!(qualify(r"\x + x", &["x"]), r"\x + _xlpm.x");
        assert_eq!(qualify(r"x\y", &["x"]), r"x\y");
    }

    #[test]
    fn test_longest_name_wins() {
        let out = qualify_names("NORM.S.DIST(z,TRUE)", &["NORM.S.DIST", "NORM.DIST"], "_xlfn.");
        assert_eq!(out, "_xlfn.NORM.S.DIST(z,TRUE)");
    }

    #[test]
    fn test_adjacent_occurrences() {
        assert_eq!(qualify("x,x,x", &["x"]), "_xlpm.x,_xlpm.x,_xlpm.x");
    }

    #[test]
    fn test_match_at_start_and_end() {
        assert_eq!(qualify("x", &["x"]), "_xlpm.x");
        assert_eq!(qualify("(x)", &["x"]), "(_xlpm.x)");
    }

    #[test]
    fn test_empty_name_set_is_identity() {
        let names: [&str; 0] = [];
        assert_eq!(qualify_names("a + b", &names, "_xlpm."), "a + b");
    }
}
