//! Import resolver
//!
//! Walks the import graph depth-first from a root file and merges every
//! reachable file's statements into one [`ProgramParts`]. A file's own
//! statements land before those of the files it imports, and imports are
//! visited in declaration order.
//!
//! Each file contributes exactly once: the visited set is keyed on the
//! canonical path and a file is marked visited before its imports are
//! descended into, so diamond imports merge once and cyclic imports
//! terminate instead of recursing forever.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use bescript_syntax::parse_source;
use log::debug;

use crate::diagnostics::Diagnostics;
use crate::error::{CompileError, CompileResult};
use crate::partition::{partition, ProgramParts};

/// File extension appended to an import name when locating its file
pub const SOURCE_EXTENSION: &str = "bes";

/// Resolve `root` and everything it transitively imports into one merged
/// program. A file that cannot be read or parsed aborts the run; bad import
/// names are recorded as diagnostics and skipped.
pub fn resolve_file(root: &Path, diags: &mut Diagnostics) -> CompileResult<ProgramParts> {
    let mut visited = HashSet::new();
    let mut parts = ProgramParts::default();
    resolve_into(root, &mut visited, &mut parts, diags)?;
    Ok(parts)
}

fn resolve_into(
    path: &Path,
    visited: &mut HashSet<PathBuf>,
    parts: &mut ProgramParts,
    diags: &mut Diagnostics,
) -> CompileResult<()> {
    // Canonicalization keys the visited set; a path that does not resolve
    // (dangling import) falls back to its literal spelling and fails in the
    // read below with a proper error.
    let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !visited.insert(key) {
        debug!("skipping already-imported file {}", path.display());
        return Ok(());
    }

    let source = fs::read_to_string(path).map_err(|source| CompileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let unit = parse_source(&source).map_err(|source| CompileError::Syntax {
        path: path.to_path_buf(),
        source,
    })?;
    let (imports, own) = partition(unit);
    debug!(
        "resolved {} ({} statements, {} imports)",
        path.display(),
        own.len(),
        imports.len()
    );
    parts.extend(own);

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    for import in imports {
        // Escaped identifiers are valid in expressions but never name files
        if import.name.starts_with('\\') {
            diags.error_at(
                format!("illegal import name `{}`", import.name),
                import.line,
            );
            continue;
        }
        let target = dir.join(format!("{}.{SOURCE_EXTENSION}", import.name));
        resolve_into(&target, visited, parts, diags)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn names(parts: &ProgramParts) -> Vec<&str> {
        parts.lets.iter().map(|s| s.name()).collect()
    }

    #[test]
    fn test_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = write_file(dir.path(), "main.bes", "let a = `1`");
        let mut diags = Diagnostics::new();
        let parts = resolve_file(&root, &mut diags).unwrap();
        assert!(diags.is_clean());
        assert_eq!(names(&parts), vec!["a"]);
    }

    #[test]
    fn test_own_statements_before_imported() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "util.bes", "let u = `1`");
        let root = write_file(dir.path(), "main.bes", "import util\nlet a = `2`");
        let mut diags = Diagnostics::new();
        let parts = resolve_file(&root, &mut diags).unwrap();
        assert_eq!(names(&parts), vec!["a", "u"]);
    }

    #[test]
    fn test_diamond_import_merges_once() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "base.bes", "let shared = `1`");
        write_file(dir.path(), "left.bes", "import base\nlet l = `2`");
        write_file(dir.path(), "right.bes", "import base\nlet r = `3`");
        let root = write_file(dir.path(), "main.bes", "import left\nimport right");
        let mut diags = Diagnostics::new();
        let parts = resolve_file(&root, &mut diags).unwrap();
        assert!(diags.is_clean());
        assert_eq!(names(&parts), vec!["l", "shared", "r"]);
    }

    #[test]
    fn test_import_cycle_terminates() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.bes", "import b\nlet a = `1`");
        write_file(dir.path(), "b.bes", "import a\nlet b = `2`");
        let root = write_file(dir.path(), "main.bes", "import a");
        let mut diags = Diagnostics::new();
        let parts = resolve_file(&root, &mut diags).unwrap();
        assert!(diags.is_clean());
        assert_eq!(names(&parts), vec!["a", "b"]);
    }

    #[test]
    fn test_self_import_terminates() {
        let dir = tempfile::tempdir().unwrap();
        let root = write_file(dir.path(), "main.bes", "import main\nlet a = `1`");
        let mut diags = Diagnostics::new();
        let parts = resolve_file(&root, &mut diags).unwrap();
        assert_eq!(names(&parts), vec!["a"]);
    }

    #[test]
    fn test_missing_import_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = write_file(dir.path(), "main.bes", "import ghost");
        let mut diags = Diagnostics::new();
        let err = resolve_file(&root, &mut diags).unwrap_err();
        assert!(matches!(err, CompileError::Io { .. }));
    }

    #[test]
    fn test_escaped_import_name_diagnosed() {
        let dir = tempfile::tempdir().unwrap();
        let root = write_file(dir.path(), "main.bes", "import \\up\nlet a = `1`");
        let mut diags = Diagnostics::new();
        let parts = resolve_file(&root, &mut diags).unwrap();
        assert_eq!(diags.error_count(), 1);
        assert_eq!(names(&parts), vec!["a"]);
    }
}
