//! Expression compiler
//!
//! Recursive translation of expression nodes into formula text. The
//! conditional flattener lives here too: nested if/else-if trees become an
//! ordered list of (condition, value) arms consumed by both the eager and
//! the lazy conditional forms.

use bescript_syntax::{Expr, Parameter, Statement};

use crate::diagnostics::Diagnostics;
use crate::env::{DefineMap, Scope};
use crate::hygiene::{qualify_names, OPTIONAL_PARAM_PREFIX, PARAM_PREFIX};
use crate::names::validate_name;
use crate::partition::ProgramParts;
use crate::table::FormulaTable;
use crate::versioned::tag_versioned;

/// Compile a partitioned program into its formula table.
///
/// The three passes run in fixed order - macros, lets, functions - each
/// against the definitions accumulated by earlier passes. The versioned
/// tagger runs last, over final text.
pub fn compile_parts(parts: &ProgramParts, diags: &mut Diagnostics) -> FormulaTable {
    let compiler = Compiler {
        globals: DefineMap::new(),
        diags,
    };
    compiler.run(parts)
}

struct Compiler<'d> {
    globals: DefineMap,
    diags: &'d mut Diagnostics,
}

/// One flattened conditional arm. `cond: None` is the always-true sentinel
/// of a trailing `else`.
struct Arm<'e> {
    cond: Option<&'e Expr>,
    value: &'e Expr,
}

impl<'d> Compiler<'d> {
    fn run(mut self, parts: &ProgramParts) -> FormulaTable {
        let mut table = FormulaTable::new();
        let top = Scope::new();

        for stm in &parts.defines {
            if let Statement::Define { name, expr, line } = stm {
                let value = self.compile_expr(expr, &top, *line);
                if self.globals.contains(name) {
                    self.diags
                        .error_at(format!("redefinition of name `{name}`"), *line);
                } else {
                    validate_name(name, *line, self.diags);
                    self.globals.insert(name, value);
                }
            }
        }

        for stm in &parts.lets {
            if let Statement::Let { name, expr, line } = stm {
                let value = self.compile_expr(expr, &top, *line);
                self.insert_toplevel(&mut table, name, value, *line);
            }
        }

        for stm in &parts.functions {
            if let Statement::Function {
                name,
                params,
                body,
                line,
            } = stm
            {
                let value = self.compile_function(params, body, &top, *line);
                self.insert_toplevel(&mut table, name, value, *line);
            }
        }

        table.map_formulas(tag_versioned);
        table
    }

    fn insert_toplevel(&mut self, table: &mut FormulaTable, name: &str, value: String, line: u32) {
        if table.contains(name) {
            self.diags
                .error_at(format!("redefinition of name `{name}`"), line);
        } else {
            validate_name(name, line, self.diags);
            table.insert(name, value);
        }
    }

    // === Expression dispatch ===

    fn compile_expr(&mut self, expr: &Expr, scope: &Scope, line: u32) -> String {
        match expr {
            Expr::Block { statements, tail } => self.compile_block(statements, tail, scope, line),
            Expr::If { cond, then, orelse } => {
                let mut arms = Vec::new();
                flatten_chain(cond, then, orelse.as_deref(), &mut arms);
                self.compile_eager_if(&arms, scope, line)
            }
            Expr::LazyIf { cond, then, orelse } => {
                let mut arms = Vec::new();
                flatten_chain(cond, then, orelse.as_deref(), &mut arms);
                self.compile_lazy_if(&arms, scope, line)
            }
            Expr::FormulaLiteral { text } => {
                let unescaped = unescape(text);
                self.expand_references(&unescaped, scope, line)
            }
            // Only the opening delimiter is stripped; the trailing quote is
            // part of the compiled text.
            Expr::StringLiteral { text } => text[1..].to_string(),
            Expr::DefinedRef { text } => self.expand_references(text, scope, line),
            Expr::Identifier { name } => {
                if let Some(value) = scope.get(name) {
                    value.to_string()
                } else if let Some(value) = self.globals.get(name) {
                    value.to_string()
                } else {
                    // Unresolved identifiers pass through verbatim: they may
                    // be native functions or pre-existing container names.
                    name.clone()
                }
            }
            Expr::Grouped(inner) => self.compile_expr(inner, scope, line),
        }
    }

    // === Blocks ===

    fn compile_block(
        &mut self,
        statements: &[Statement],
        tail: &Expr,
        scope: &Scope,
        line: u32,
    ) -> String {
        let mut scope = scope.child();
        let mut lets: Vec<(String, String)> = Vec::new();

        for stm in statements {
            self.compile_block_statement(stm, &mut scope, &mut lets);
        }

        let tail_text = self.compile_expr(tail, &scope, line);
        if lets.is_empty() {
            // No runtime bindings: the block collapses to its tail.
            return tail_text;
        }

        let mut formula = String::from("LET(");
        let mut bound: Vec<&str> = Vec::new();
        for (name, value) in &lets {
            // Binding k is rewritten using bindings 1..k-1 only.
            let value = if bound.is_empty() {
                value.clone()
            } else {
                qualify_names(value, &bound, PARAM_PREFIX)
            };
            formula.push_str(PARAM_PREFIX);
            formula.push_str(name);
            formula.push(',');
            formula.push_str(&value);
            formula.push(',');
            bound.push(name);
        }
        formula.push_str(&qualify_names(&tail_text, &bound, PARAM_PREFIX));
        formula.push(')');
        formula
    }

    fn compile_block_statement(
        &mut self,
        stm: &Statement,
        scope: &mut Scope,
        lets: &mut Vec<(String, String)>,
    ) {
        match stm {
            Statement::Let { name, expr, line } => {
                let value = self.compile_expr(expr, scope, *line);
                if lets.iter().any(|(n, _)| n == name) {
                    self.diags
                        .error_at(format!("redefinition of name `{name}`"), *line);
                } else {
                    validate_name(name, *line, self.diags);
                    lets.push((name.clone(), value));
                }
            }
            Statement::Define { name, expr, line } => {
                let value = self.compile_expr(expr, scope, *line);
                if scope.defined_here(name) {
                    self.diags
                        .error_at(format!("redefinition of name `{name}`"), *line);
                } else {
                    validate_name(name, *line, self.diags);
                    scope.define(name, value);
                }
            }
            Statement::Function {
                name,
                params,
                body,
                line,
            } => {
                let value = self.compile_function(params, body, scope, *line);
                if lets.iter().any(|(n, _)| n == name) {
                    self.diags
                        .error_at(format!("redefinition of name `{name}`"), *line);
                } else {
                    validate_name(name, *line, self.diags);
                    lets.push((name.clone(), value));
                }
            }
        }
    }

    // === Functions ===

    fn compile_function(
        &mut self,
        params: &[Parameter],
        body: &Expr,
        scope: &Scope,
        line: u32,
    ) -> String {
        let mut args = String::new();
        let mut matchable: Vec<&str> = Vec::new();

        for param in params {
            validate_name(&param.name, param.line, self.diags);
            matchable.push(&param.name);
            args.push_str(if param.bracketed {
                OPTIONAL_PARAM_PREFIX
            } else {
                PARAM_PREFIX
            });
            args.push_str(&param.name);
            args.push(',');
        }

        let mut body_text = self.compile_expr(body, scope, line);
        if !args.is_empty() {
            // The stored body refers to parameters by qualified name; the
            // UI still shows the bare spelling.
            body_text = qualify_names(&body_text, &matchable, PARAM_PREFIX);
        }

        format!("LAMBDA({args}{body_text})")
    }

    // === Conditionals ===

    fn compile_eager_if(&mut self, arms: &[Arm<'_>], scope: &Scope, line: u32) -> String {
        if let [Arm {
            cond: Some(cond),
            value: then,
        }, Arm {
            cond: None,
            value: orelse,
        }] = arms
        {
            let c = self.compile_expr(cond, scope, line);
            let t = self.compile_expr(then, scope, line);
            let e = self.compile_expr(orelse, scope, line);
            return format!("IF({c}, {t}, {e})");
        }

        let mut formula = String::from("IFS(");
        for arm in arms {
            let c = match arm.cond {
                Some(cond) => self.compile_expr(cond, scope, line),
                // The sentinel is a literal truthy value, never re-compiled
                None => "TRUE".to_string(),
            };
            let v = self.compile_expr(arm.value, scope, line);
            formula.push_str(&c);
            formula.push(',');
            formula.push_str(&v);
            formula.push(',');
        }
        formula.pop();
        formula.push(')');
        formula
    }

    fn compile_lazy_if(&mut self, arms: &[Arm<'_>], scope: &Scope, line: u32) -> String {
        if let [Arm {
            cond: Some(cond),
            value: then,
        }, Arm {
            cond: None,
            value: orelse,
        }] = arms
        {
            let c = self.compile_expr(cond, scope, line);
            let t = self.compile_expr(then, scope, line);
            let e = self.compile_expr(orelse, scope, line);
            return format!("IF({c}, LAMBDA({t}), LAMBDA({e}))()");
        }

        let mut formula = String::from("IFS(");
        for arm in arms {
            let c = match arm.cond {
                Some(cond) => self.compile_expr(cond, scope, line),
                None => "TRUE".to_string(),
            };
            let v = self.compile_expr(arm.value, scope, line);
            formula.push_str(&c);
            formula.push_str(",LAMBDA(");
            formula.push_str(&v);
            formula.push_str("),");
        }
        formula.pop();
        formula.push_str(")()");
        formula
    }

    // === Reference expansion ===

    /// Expand every backtick-delimited name token in `text` by substituting
    /// the parenthesized compiled text of that name. An unresolvable name
    /// records a diagnostic and the token is left unexpanded. An unpaired
    /// trailing backtick passes the rest of the text through unchanged.
    fn expand_references(&mut self, text: &str, scope: &Scope, line: u32) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find('`') {
            let Some(len) = rest[start + 1..].find('`') else {
                break;
            };
            let end = start + 1 + len;
            let name = &rest[start + 1..end];
            out.push_str(&rest[..start]);

            let value: Option<String> = scope
                .get(name)
                .map(str::to_string)
                .or_else(|| self.globals.get(name).map(str::to_string));
            match value {
                Some(v) => {
                    out.push('(');
                    out.push_str(&v);
                    out.push(')');
                }
                None => {
                    self.diags.error_at(
                        format!("unrecognized reference to name `{name}` in \"{text}\""),
                        line,
                    );
                    out.push_str(&rest[start..=end]);
                }
            }
            rest = &rest[end + 1..];
        }

        out.push_str(rest);
        out
    }
}

/// Flatten a conditional chain into ordered arms. A trailing `else` block
/// becomes the always-true sentinel arm; a nested conditional in else
/// position continues the chain.
fn flatten_chain<'e>(cond: &'e Expr, then: &'e Expr, orelse: Option<&'e Expr>, arms: &mut Vec<Arm<'e>>) {
    arms.push(Arm {
        cond: Some(cond),
        value: then,
    });

    match orelse {
        Some(Expr::If { cond, then, orelse }) | Some(Expr::LazyIf { cond, then, orelse }) => {
            flatten_chain(cond, then, orelse.as_deref(), arms);
        }
        Some(other) => arms.push(Arm {
            cond: None,
            value: other,
        }),
        None => {}
    }
}

/// Resolve backslash escape sequences in formula-literal text.
///
/// Recognized: `\\`, `` \` ``, `\"`, `\n`, `\t`, `\r`. An unrecognized
/// sequence keeps both characters.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('`') => out.push('`'),
            Some('"') => out.push('"'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn compile_one(source: &str) -> (FormulaTable, Diagnostics) {
        let unit = bescript_syntax::parse_source(source).expect("source should parse");
        let (_, parts) = crate::partition::partition(unit);
        let mut diags = Diagnostics::new();
        let table = compile_parts(&parts, &mut diags);
        (table, diags)
    }

    fn formula(source: &str, name: &str) -> String {
        let (table, diags) = compile_one(source);
        assert!(diags.is_clean(), "unexpected diagnostics: {:?}", diags);
        table.get(name).expect("name should be compiled").to_string()
    }

    #[test]
    fn test_formula_literal_passthrough() {
        assert_eq!(formula("let x = `1 + 2`", "x"), "1 + 2");
    }

    #[test]
    fn test_macro_inlines_without_wrapper() {
        assert_eq!(formula("let v = { y: `5`; y }", "v"), "5");
    }

    #[test]
    fn test_let_block_emits_scoping_construct() {
        assert_eq!(
            formula("let v = { let z = `5`; z }", "v"),
            "_xlfn.LET(_xlpm.z,5,_xlpm.z)"
        );
    }

    #[test]
    fn test_let_block_sibling_hygiene() {
        // b's value references a; the tail references both. Every earlier
        // binding must be qualified, in declaration order.
        let got = formula("let v = { let a = `1`; let b = `a + 1`; `a + b` }", "v");
        assert_eq!(
            got,
            "_xlfn.LET(_xlpm.a,1,_xlpm.b,_xlpm.a + 1,_xlpm.a + _xlpm.b)"
        );
    }

    #[test]
    fn test_hygiene_is_incremental_not_retroactive() {
        // The first binding's value mentions `b`, which is bound LATER in
        // the same block: it must stay unqualified (it refers to an outer
        // name of the same spelling, not the sibling).
        let got = formula("let v = { let a = `b + 1`; let b = `2`; a }", "v");
        assert_eq!(got, "_xlfn.LET(_xlpm.a,b + 1,_xlpm.b,2,_xlpm.a)");
    }

    #[test]
    fn test_two_branch_if() {
        assert_eq!(
            formula("let v = if `a > 0` { `1` } else { `2` }", "v"),
            "IF(a > 0, 1, 2)"
        );
    }

    #[test]
    fn test_if_chain_flattens_to_ifs() {
        assert_eq!(
            formula(
                "let v = if `a > 0` { `1` } else if `b > 0` { `2` } else { `3` }",
                "v"
            ),
            "_xlfn.IFS(a > 0,1,b > 0,2,TRUE,3)"
        );
    }

    #[test]
    fn test_if_without_else_uses_ifs() {
        assert_eq!(
            formula("let v = if `a > 0` { `1` }", "v"),
            "_xlfn.IFS(a > 0,1)"
        );
    }

    #[test]
    fn test_chain_without_catchall_uses_ifs() {
        // Two arms but no sentinel: not the two-argument form.
        assert_eq!(
            formula("let v = if `a > 0` { `1` } else if `b > 0` { `2` }", "v"),
            "_xlfn.IFS(a > 0,1,b > 0,2)"
        );
    }

    #[test]
    fn test_lazy_if_two_branches() {
        assert_eq!(
            formula("let v = ifl `a > 0` { `1` } else { `2` }", "v"),
            "IF(a > 0, _xlfn.LAMBDA(1), _xlfn.LAMBDA(2))()"
        );
    }

    #[test]
    fn test_lazy_if_chain() {
        assert_eq!(
            formula(
                "let v = ifl `a > 0` { `1` } else ifl `b > 0` { `2` } else { `3` }",
                "v"
            ),
            "_xlfn.IFS(a > 0,_xlfn.LAMBDA(1),b > 0,_xlfn.LAMBDA(2),TRUE,_xlfn.LAMBDA(3))()"
        );
    }

    #[test]
    fn test_lazy_and_eager_same_shape() {
        // Same arms, same order; only the thunk wrapping differs.
        let eager = formula(
            "let v = if `a > 0` { `1` } else if `b > 0` { `2` } else { `3` }",
            "v",
        );
        let lazy = formula(
            "let v = ifl `a > 0` { `1` } else ifl `b > 0` { `2` } else { `3` }",
            "v",
        );
        assert_eq!(eager, "_xlfn.IFS(a > 0,1,b > 0,2,TRUE,3)");
        assert_eq!(
            lazy,
            "_xlfn.IFS(a > 0,_xlfn.LAMBDA(1),b > 0,_xlfn.LAMBDA(2),TRUE,_xlfn.LAMBDA(3))()"
        );
    }

    #[test]
    fn test_function_parameters_qualified() {
        assert_eq!(
            formula("Double(x) { `x * 2` }", "Double"),
            "_xlfn.LAMBDA(_xlpm.x,_xlpm.x * 2)"
        );
    }

    #[test]
    fn test_function_body_identifier_params() {
        // A bare identifier in the body resolves to nothing and passes
        // through; the hygiene pass then qualifies it as a parameter.
        assert_eq!(
            formula("Pick(a, [b]) { a }", "Pick"),
            "_xlfn.LAMBDA(_xlpm.a,_xlop.b,_xlpm.a)"
        );
    }

    #[test]
    fn test_macro_reference_by_identifier() {
        assert_eq!(formula("rate: `0.05`\nlet v = rate", "v"), "0.05");
    }

    #[test]
    fn test_macro_expansion_in_literal_is_parenthesized() {
        assert_eq!(
            formula("rate: `1 + 1`\nlet v = `\\`rate\\` * 2`", "v"),
            "(1 + 1) * 2"
        );
    }

    #[test]
    fn test_defined_ref_expands() {
        assert_eq!(formula("rate: `0.05`\nlet v = `rate`", "v"), "(0.05)");
    }

    #[test]
    fn test_unresolved_identifier_passes_through() {
        assert_eq!(formula("let v = SUM", "v"), "SUM");
    }

    #[test]
    fn test_unresolved_backtick_reference_diagnosed() {
        let (table, diags) = compile_one("let v = `missing`");
        assert_eq!(diags.error_count(), 1);
        // The token is left unexpanded in the output.
        assert_eq!(table.get("v"), Some("`missing`"));
    }

    #[test]
    fn test_unpaired_backtick_passes_through() {
        let (table, diags) = compile_one(r"let v = `a \` b`");
        assert!(diags.is_clean());
        assert_eq!(table.get("v"), Some("a ` b"));
    }

    #[test]
    fn test_string_literal_keeps_trailing_quote() {
        assert_eq!(formula("let s = \"hi\"", "s"), "hi\"");
    }

    #[test]
    fn test_grouped_compiles_inner_unchanged() {
        assert_eq!(formula("let v = (`1 + 2`)", "v"), "1 + 2");
    }

    #[test]
    fn test_top_level_redefinition_keeps_first() {
        let (table, diags) = compile_one("let x = `1`\nlet x = `2`");
        assert_eq!(diags.error_count(), 1);
        assert_eq!(table.get("x"), Some("1"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_block_macro_redefinition_diagnosed() {
        let (_, diags) = compile_one("let v = { y: `1`; y: `2`; y }");
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn test_block_macro_shadows_global() {
        assert_eq!(
            formula("y: `global`\nlet v = { y: `local`; y }", "v"),
            "local"
        );
    }

    #[test]
    fn test_block_macros_do_not_leak() {
        // The second block cannot see the first block's macro; the
        // identifier passes through verbatim.
        let got = formula("let v = { y: `1`; y }\nlet w = { `y + 0` }", "w");
        assert_eq!(got, "y + 0");
    }

    #[test]
    fn test_invalid_names_rejected() {
        let (_, diags) = compile_one("let A1 = `1`\nlet R3C5 = `2`\nlet TotalSum = `3`");
        assert_eq!(diags.error_count(), 2);
    }

    #[test]
    fn test_versioned_tagging_runs_last() {
        assert_eq!(
            formula("let v = `XLOOKUP(1, a, b)`", "v"),
            "_xlfn.XLOOKUP(1, a, b)"
        );
    }

    #[test]
    fn test_nested_block_in_let_binding() {
        let got = formula("let v = { let a = { let b = `1`; b }; a }", "v");
        assert_eq!(
            got,
            "_xlfn.LET(_xlpm.a,_xlfn.LET(_xlpm.b,1,_xlpm.b),_xlpm.a)"
        );
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\`b\`c"), "a`b`c");
        assert_eq!(unescape(r"a\nb\tc"), "a\nb\tc");
        assert_eq!(unescape(r"a\\b"), r"a\b");
        assert_eq!(unescape(r"a\qb"), r"a\qb");
    }

    #[test]
    fn test_idempotent_compile() {
        let source = "rate: `0.05`\nlet v = { let a = `1`; `a * \\`rate\\`` }\nF(x) { x }";
        let (first, d1) = compile_one(source);
        let (second, d2) = compile_one(source);
        assert!(d1.is_clean() && d2.is_clean());
        assert_eq!(first, second);
    }
}
