//! Abstract syntax tree for Bes source files

/// One parsed source file: imports followed by top-level statements.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceUnit {
    pub imports: Vec<ImportDecl>,
    pub statements: Vec<Statement>,
}

/// An `import name` declaration, resolved to a sibling `.bes` file.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub name: String,
    pub line: u32,
}

/// A top-level or block-level statement.
///
/// Every statement carries the source line of its name token so diagnostics
/// can point back at the definition.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `let name = expr` - becomes a real runtime binding in the output
    Let { name: String, expr: Expr, line: u32 },

    /// `name : expr` - macro-style definition, inlined at every reference
    Define { name: String, expr: Expr, line: u32 },

    /// `name(a, [b]) { ... }` - compiles to a closure over its parameters
    Function {
        name: String,
        params: Vec<Parameter>,
        body: Expr,
        line: u32,
    },
}

impl Statement {
    /// The name this statement defines
    pub fn name(&self) -> &str {
        match self {
            Statement::Let { name, .. }
            | Statement::Define { name, .. }
            | Statement::Function { name, .. } => name,
        }
    }

    /// Source line of the name token
    pub fn line(&self) -> u32 {
        match self {
            Statement::Let { line, .. }
            | Statement::Define { line, .. }
            | Statement::Function { line, .. } => *line,
        }
    }
}

/// A function parameter. Square brackets in the source mark an
/// optional/array-style parameter, which is stored with a different
/// qualifying prefix in the output.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub bracketed: bool,
    pub line: u32,
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `{ statements... tail }`
    Block {
        statements: Vec<Statement>,
        tail: Box<Expr>,
    },

    /// `if cond { ... } else ...` - eager conditional chain
    If {
        cond: Box<Expr>,
        then: Box<Expr>,
        orelse: Option<Box<Expr>>,
    },

    /// `ifl cond { ... } else ...` - lazy conditional chain; unselected
    /// branches are never evaluated
    LazyIf {
        cond: Box<Expr>,
        then: Box<Expr>,
        orelse: Option<Box<Expr>>,
    },

    /// Backtick-delimited formula text, delimiters stripped, backslash
    /// escapes still intact
    FormulaLiteral { text: String },

    /// Double-quoted string, raw token text including both quotes
    StringLiteral { text: String },

    /// A backtick-delimited bare name token, kept with its backticks
    /// (e.g. `` `total` ``)
    DefinedRef { text: String },

    /// A bare identifier
    Identifier { name: String },

    /// `( expr )`
    Grouped(Box<Expr>),
}
