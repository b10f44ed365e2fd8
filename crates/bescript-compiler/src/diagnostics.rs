//! Diagnostics collector
//!
//! Name-level problems are collected, not thrown: the compiler keeps going
//! after each one so a single run surfaces as many problems as possible.
//! A nonzero error count blocks emission at the end of the run.

use std::fmt;

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// One collected problem, pointing back at a source line when there is one
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Source line of the offending name, if the problem has one
    pub line: Option<u32>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        match self.line {
            Some(line) => write!(f, "{}: {} (line {})", tag, self.message, line),
            None => write!(f, "{}: {}", tag, self.message),
        }
    }
}

/// Accumulator for one compile run. Created fresh per run, never retained.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error at a source line
    pub fn error_at<S: Into<String>>(&mut self, message: S, line: u32) {
        self.items.push(Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            line: Some(line),
        });
    }

    /// Record an error with no source position (e.g. a workbook collision)
    pub fn error<S: Into<String>>(&mut self, message: S) {
        self.items.push(Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            line: None,
        });
    }

    pub fn warning_at<S: Into<String>>(&mut self, message: S, line: u32) {
        self.items.push(Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
            line: Some(line),
        });
    }

    /// Number of error-severity diagnostics
    pub fn error_count(&self) -> usize {
        self.items
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    /// True if no errors were recorded (warnings do not block emission)
    pub fn is_clean(&self) -> bool {
        self.error_count() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
