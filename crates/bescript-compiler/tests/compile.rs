//! End-to-end compiler tests driving the public API

use std::fs;
use std::path::{Path, PathBuf};

use bescript_compiler::{compile_file, compile_source, CompileError};
use pretty_assertions::assert_eq;

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_compile_source_simple_let() {
    let output = compile_source("let x = `1 + 2`").unwrap();
    assert!(output.diagnostics.is_clean());
    assert_eq!(output.table.get("x"), Some("1 + 2"));
}

#[test]
fn test_compile_source_full_program() {
    let source = "\
rate: `0.05`
let total = `SUM(Sales)`
let taxed = { let base = `total * \\`rate\\``; `ROUND(base, 2)` }
Growth(from, to) { `(to - from) / from` }
";
    let output = compile_source(source).unwrap();
    assert!(output.diagnostics.is_clean(), "{:?}", output.diagnostics);
    assert_eq!(output.table.get("total"), Some("SUM(Sales)"));
    assert_eq!(
        output.table.get("taxed"),
        Some("_xlfn.LET(_xlpm.base,total * (0.05),ROUND(_xlpm.base, 2))")
    );
    assert_eq!(
        output.table.get("Growth"),
        Some("_xlfn.LAMBDA(_xlpm.from,_xlpm.to,(_xlpm.to - _xlpm.from) / _xlpm.from)")
    );
}

#[test]
fn test_compile_source_rejects_imports() {
    let err = compile_source("import util\nlet x = `1`").unwrap_err();
    assert!(matches!(err, CompileError::Structural(_)));
}

#[test]
fn test_compile_file_with_imports() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "rates.bes", "tax: `0.2`");
    let main = write_file(
        dir.path(),
        "main.bes",
        "import rates\nlet net = `gross * (1 - \\`tax\\`)`",
    );

    let output = compile_file(&main).unwrap();
    assert!(output.diagnostics.is_clean(), "{:?}", output.diagnostics);
    assert_eq!(output.table.get("net"), Some("gross * (1 - (0.2))"));
}

#[test]
fn test_compile_file_import_cycle_merges_each_file_once() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.bes", "import b\nlet a = `1`");
    write_file(dir.path(), "b.bes", "import a\nlet b = `2`");
    let main = write_file(dir.path(), "main.bes", "import a\nlet m = `3`");

    let output = compile_file(&main).unwrap();
    assert!(output.diagnostics.is_clean());
    assert_eq!(output.table.len(), 3);
    let names: Vec<&str> = output.table.iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["m", "a", "b"]);
}

#[test]
fn test_compile_file_missing_import_errors() {
    let dir = tempfile::tempdir().unwrap();
    let main = write_file(dir.path(), "main.bes", "import nowhere");
    let err = compile_file(&main).unwrap_err();
    assert!(matches!(err, CompileError::Io { .. }));
}

#[test]
fn test_duplicate_across_files_keeps_first_and_diagnoses() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "util.bes", "let x = `imported`");
    let main = write_file(dir.path(), "main.bes", "import util\nlet x = `own`");

    let output = compile_file(&main).unwrap();
    // Own statements come before imported ones, so the root file wins.
    assert_eq!(output.table.get("x"), Some("own"));
    assert_eq!(output.diagnostics.error_count(), 1);
}

#[test]
fn test_dirty_run_still_produces_full_table() {
    let output = compile_source("let A1 = `1`\nlet ok = `2`").unwrap();
    assert_eq!(output.diagnostics.error_count(), 1);
    assert_eq!(output.table.get("A1"), Some("1"));
    assert_eq!(output.table.get("ok"), Some("2"));
}

#[test]
fn test_compile_is_deterministic() {
    let source = "\
r: `0.05`
let v = if `x > 0` { `x` } else if `x < 0` { `-x` } else { `0` }
Apply(f, v) { `f(v)` }
";
    let first = compile_source(source).unwrap();
    let second = compile_source(source).unwrap();
    assert_eq!(first.table, second.table);
}
