//! Bes parser
//!
//! A recursive descent parser for Bes source files. Scanning and parsing
//! live in one struct; the parser keeps one token of lookahead because
//! `name :`, `name(` and a bare `name` expression only diverge at the
//! second token.

use crate::ast::{Expr, ImportDecl, Parameter, SourceUnit, Statement};
use crate::error::{SyntaxError, SyntaxResult};

/// Parse a whole Bes source file into a [`SourceUnit`]
///
/// # Example
/// ```rust
/// use bescript_syntax::parse_source;
///
/// let unit = parse_source("import util\nlet x = `1 + 2`").unwrap();
/// assert_eq!(unit.imports.len(), 1);
/// assert_eq!(unit.statements.len(), 1);
/// ```
pub fn parse_source(input: &str) -> SyntaxResult<SourceUnit> {
    let mut parser = Parser::new(input)?;
    let unit = parser.parse_file()?;

    if !matches!(parser.current_token(), Token::Eof) {
        return Err(SyntaxError::parse(
            format!("unexpected token {:?} after last statement", parser.current_token()),
            parser.current_line(),
        ));
    }

    Ok(unit)
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
enum Token {
    // Keywords
    Import,
    Let,
    If,
    Ifl,
    Else,

    // Identifiers and literals
    Ident(String),
    /// Backtick-delimited formula text, delimiters stripped, escapes intact
    FormulaLiteral(String),
    /// Double-quoted string, raw text including both quotes
    StringLiteral(String),
    /// Backtick-delimited bare name, raw text including the backticks
    DefinedRef(String),

    // Punctuation
    Colon,
    Equal,
    Comma,
    Semi,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,

    // End of input
    Eof,
}

/// Bes parser
struct Parser<'a> {
    input: &'a str,
    pos: usize,
    line: u32,
    current: Option<(Token, u32)>,
    lookahead: Option<(Token, u32)>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> SyntaxResult<Self> {
        let mut parser = Self {
            input,
            pos: 0,
            line: 1,
            current: None,
            lookahead: None,
        };
        parser.advance_token()?;
        parser.advance_token()?;
        Ok(parser)
    }

    // === Token scanning ===

    fn advance_token(&mut self) -> SyntaxResult<()> {
        self.current = self.lookahead.take();
        self.skip_trivia();
        let line = self.line;
        let token = self.scan_token()?;
        self.lookahead = Some((token, line));
        Ok(())
    }

    fn scan_token(&mut self) -> SyntaxResult<Token> {
        if self.is_at_end() {
            return Ok(Token::Eof);
        }

        let c = self.peek_char().unwrap();

        match c {
            ':' => {
                self.advance();
                return Ok(Token::Colon);
            }
            '=' => {
                self.advance();
                return Ok(Token::Equal);
            }
            ',' => {
                self.advance();
                return Ok(Token::Comma);
            }
            ';' => {
                self.advance();
                return Ok(Token::Semi);
            }
            '(' => {
                self.advance();
                return Ok(Token::LeftParen);
            }
            ')' => {
                self.advance();
                return Ok(Token::RightParen);
            }
            '{' => {
                self.advance();
                return Ok(Token::LeftBrace);
            }
            '}' => {
                self.advance();
                return Ok(Token::RightBrace);
            }
            '[' => {
                self.advance();
                return Ok(Token::LeftBracket);
            }
            ']' => {
                self.advance();
                return Ok(Token::RightBracket);
            }
            '`' => return self.scan_backtick(),
            '"' => return self.scan_string(),
            _ => {}
        }

        if c.is_ascii_alphabetic() || c == '_' || c == '\\' {
            return Ok(self.scan_identifier());
        }

        Err(SyntaxError::UnexpectedChar { ch: c, line: self.line })
    }

    /// Scan a backtick-delimited token.
    ///
    /// If the inner text is exactly one identifier the token is a defined
    /// reference (kept with its backticks); anything else is formula text
    /// (delimiters stripped). A backslash escapes the following character;
    /// both characters stay in the raw text for the compiler to resolve.
    fn scan_backtick(&mut self) -> SyntaxResult<Token> {
        let start_line = self.line;
        self.advance(); // opening backtick

        let mut raw = String::new();
        loop {
            match self.peek_char() {
                None => return Err(SyntaxError::UnterminatedFormula { line: start_line }),
                Some('`') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    raw.push('\\');
                    self.advance();
                    if let Some(escaped) = self.peek_char() {
                        raw.push(escaped);
                        self.advance();
                    }
                }
                Some(c) => {
                    raw.push(c);
                    self.advance();
                }
            }
        }

        if is_plain_identifier(&raw) {
            Ok(Token::DefinedRef(format!("`{}`", raw)))
        } else {
            Ok(Token::FormulaLiteral(raw))
        }
    }

    fn scan_string(&mut self) -> SyntaxResult<Token> {
        let start_line = self.line;
        let mut raw = String::from('"');
        self.advance(); // opening quote

        loop {
            match self.peek_char() {
                None => return Err(SyntaxError::UnterminatedString { line: start_line }),
                Some('"') => {
                    raw.push('"');
                    self.advance();
                    break;
                }
                Some('\\') => {
                    raw.push('\\');
                    self.advance();
                    if let Some(escaped) = self.peek_char() {
                        raw.push(escaped);
                        self.advance();
                    }
                }
                Some(c) => {
                    raw.push(c);
                    self.advance();
                }
            }
        }

        Ok(Token::StringLiteral(raw))
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.pos;

        // Leading backslash is legal here so the illegal-import diagnostic
        // can fire downstream; dots are legal in stored names.
        while self.peek_char().map_or(false, |c| {
            c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '\\'
        }) {
            self.advance();
        }

        let text = &self.input[start..self.pos];
        match text {
            "import" => Token::Import,
            "let" => Token::Let,
            "if" => Token::If,
            "ifl" => Token::Ifl,
            "else" => Token::Else,
            _ => Token::Ident(text.to_string()),
        }
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            if c == '\n' {
                self.line += 1;
            }
            self.pos += c.len_utf8();
        }
    }

    /// Skip whitespace and `//` line comments
    fn skip_trivia(&mut self) {
        loop {
            while self.peek_char().map_or(false, |c| c.is_whitespace()) {
                self.advance();
            }
            if self.input[self.pos..].starts_with("//") {
                while self.peek_char().map_or(false, |c| c != '\n') {
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current_token(&self) -> &Token {
        self.current.as_ref().map(|(t, _)| t).unwrap_or(&Token::Eof)
    }

    fn current_line(&self) -> u32 {
        self.current.as_ref().map(|(_, l)| *l).unwrap_or(self.line)
    }

    fn peek_token(&self) -> &Token {
        self.lookahead.as_ref().map(|(t, _)| t).unwrap_or(&Token::Eof)
    }

    fn consume(&mut self) -> SyntaxResult<Token> {
        let token = self
            .current
            .take()
            .map(|(t, _)| t)
            .unwrap_or(Token::Eof);
        self.advance_token()?;
        Ok(token)
    }

    fn expect(&mut self, expected: &Token, what: &str) -> SyntaxResult<()> {
        if self.current_token() == expected {
            self.consume()?;
            Ok(())
        } else {
            Err(SyntaxError::parse(
                format!("expected {}, got {:?}", what, self.current_token()),
                self.current_line(),
            ))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> SyntaxResult<(String, u32)> {
        let line = self.current_line();
        match self.current_token().clone() {
            Token::Ident(name) => {
                self.consume()?;
                Ok((name, line))
            }
            other => Err(SyntaxError::parse(
                format!("expected {}, got {:?}", what, other),
                line,
            )),
        }
    }

    fn skip_semis(&mut self) -> SyntaxResult<()> {
        while matches!(self.current_token(), Token::Semi) {
            self.consume()?;
        }
        Ok(())
    }

    // === Grammar productions ===

    fn parse_file(&mut self) -> SyntaxResult<SourceUnit> {
        let mut imports = Vec::new();
        let mut statements = Vec::new();

        self.skip_semis()?;
        while matches!(self.current_token(), Token::Import) {
            let line = self.current_line();
            self.consume()?;
            let (name, _) = self.expect_identifier("import name")?;
            imports.push(ImportDecl { name, line });
            self.skip_semis()?;
        }

        while !matches!(self.current_token(), Token::Eof) {
            statements.push(self.parse_statement()?);
            self.skip_semis()?;
        }

        Ok(SourceUnit { imports, statements })
    }

    fn parse_statement(&mut self) -> SyntaxResult<Statement> {
        match self.current_token() {
            Token::Let => {
                self.consume()?;
                let (name, line) = self.expect_identifier("name after 'let'")?;
                self.expect(&Token::Equal, "'='")?;
                let expr = self.parse_expression()?;
                Ok(Statement::Let { name, expr, line })
            }
            Token::Ident(_) => {
                let (name, line) = self.expect_identifier("name")?;
                match self.current_token() {
                    Token::Colon => {
                        self.consume()?;
                        let expr = self.parse_expression()?;
                        Ok(Statement::Define { name, expr, line })
                    }
                    Token::LeftParen => {
                        let params = self.parse_params()?;
                        let body = self.parse_block()?;
                        Ok(Statement::Function {
                            name,
                            params,
                            body,
                            line,
                        })
                    }
                    other => Err(SyntaxError::parse(
                        format!("expected ':' or '(' after name '{}', got {:?}", name, other),
                        self.current_line(),
                    )),
                }
            }
            other => Err(SyntaxError::parse(
                format!("expected a statement, got {:?}", other),
                self.current_line(),
            )),
        }
    }

    fn parse_params(&mut self) -> SyntaxResult<Vec<Parameter>> {
        self.expect(&Token::LeftParen, "'('")?;
        let mut params = Vec::new();

        if !matches!(self.current_token(), Token::RightParen) {
            loop {
                params.push(self.parse_param()?);
                if matches!(self.current_token(), Token::Comma) {
                    self.consume()?;
                } else {
                    break;
                }
            }
        }

        self.expect(&Token::RightParen, "')'")?;
        Ok(params)
    }

    fn parse_param(&mut self) -> SyntaxResult<Parameter> {
        if matches!(self.current_token(), Token::LeftBracket) {
            self.consume()?;
            let (name, line) = self.expect_identifier("parameter name")?;
            self.expect(&Token::RightBracket, "']'")?;
            Ok(Parameter {
                name,
                bracketed: true,
                line,
            })
        } else {
            let (name, line) = self.expect_identifier("parameter name")?;
            Ok(Parameter {
                name,
                bracketed: false,
                line,
            })
        }
    }

    fn parse_expression(&mut self) -> SyntaxResult<Expr> {
        match self.current_token().clone() {
            Token::LeftBrace => self.parse_block(),
            Token::If => self.parse_if(false),
            Token::Ifl => self.parse_if(true),

            Token::FormulaLiteral(text) => {
                self.consume()?;
                Ok(Expr::FormulaLiteral { text })
            }
            Token::StringLiteral(text) => {
                self.consume()?;
                Ok(Expr::StringLiteral { text })
            }
            Token::DefinedRef(text) => {
                self.consume()?;
                Ok(Expr::DefinedRef { text })
            }
            Token::Ident(name) => {
                self.consume()?;
                Ok(Expr::Identifier { name })
            }

            Token::LeftParen => {
                self.consume()?;
                let inner = self.parse_expression()?;
                self.expect(&Token::RightParen, "')'")?;
                Ok(Expr::Grouped(Box::new(inner)))
            }

            other => Err(SyntaxError::parse(
                format!("expected an expression, got {:?}", other),
                self.current_line(),
            )),
        }
    }

    fn parse_block(&mut self) -> SyntaxResult<Expr> {
        self.expect(&Token::LeftBrace, "'{'")?;

        let mut statements = Vec::new();
        loop {
            self.skip_semis()?;
            let starts_statement = match self.current_token() {
                Token::Let => true,
                Token::Ident(_) => {
                    matches!(self.peek_token(), Token::Colon | Token::LeftParen)
                }
                _ => false,
            };
            if !starts_statement {
                break;
            }
            statements.push(self.parse_statement()?);
        }

        let tail = self.parse_expression()?;
        self.skip_semis()?;
        self.expect(&Token::RightBrace, "'}'")?;

        Ok(Expr::Block {
            statements,
            tail: Box::new(tail),
        })
    }

    fn parse_if(&mut self, lazy: bool) -> SyntaxResult<Expr> {
        // consumes the 'if' / 'ifl' keyword
        self.consume()?;
        let cond = self.parse_expression()?;

        if !matches!(self.current_token(), Token::LeftBrace) {
            return Err(SyntaxError::parse(
                "expected '{' after condition",
                self.current_line(),
            ));
        }
        let then = self.parse_block()?;

        let orelse = if matches!(self.current_token(), Token::Else) {
            self.consume()?;
            let branch = match self.current_token() {
                Token::If => self.parse_if(false)?,
                Token::Ifl => self.parse_if(true)?,
                Token::LeftBrace => self.parse_block()?,
                other => {
                    return Err(SyntaxError::parse(
                        format!("expected '{{', 'if' or 'ifl' after 'else', got {:?}", other),
                        self.current_line(),
                    ))
                }
            };
            Some(Box::new(branch))
        } else {
            None
        };

        let (cond, then) = (Box::new(cond), Box::new(then));
        if lazy {
            Ok(Expr::LazyIf { cond, then, orelse })
        } else {
            Ok(Expr::If { cond, then, orelse })
        }
    }
}

/// True if `text` is exactly one identifier (no dots, escapes or operators)
fn is_plain_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
