//! Name-shape validation
//!
//! Stored names must not collide with the spreadsheet's own reference
//! syntax: anything shaped like an A1 cell reference or an R1C1 reference
//! is rejected, as are names longer than the container's 250-character
//! limit.

use lazy_regex::regex_is_match;

use crate::diagnostics::Diagnostics;

/// Maximum length of a stored name
pub const MAX_NAME_LEN: usize = 250;

/// Validate a name, recording a diagnostic for each violation
pub fn validate_name(name: &str, line: u32, diags: &mut Diagnostics) {
    if regex_is_match!(r"^[a-zA-Z]{1,3}[1-9][0-9]*$", name) {
        diags.error_at(
            format!("the name `{name}` is not valid: it is an A1-style reference to a cell"),
            line,
        );
        return;
    }
    if regex_is_match!(r"^R[1-9][0-9]*C[1-9][0-9]*$", name) {
        diags.error_at(
            format!("the name `{name}` is not valid: it is an R1C1-style reference to a cell"),
            line,
        );
        return;
    }
    if name.chars().count() > MAX_NAME_LEN {
        diags.error_at(
            format!("the name `{name}` is not valid: it is longer than {MAX_NAME_LEN} characters"),
            line,
        );
    }
}
