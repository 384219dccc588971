//! Diagnostic records and the bounded collector used by the lexer and parser.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Location of a diagnostic or token. `line` and `column` are 1-based; `column` counts chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub const START: Position = Position {
        offset: 0,
        line: 1,
        column: 1,
    };

    #[must_use]
    pub fn new(offset: usize, line: u32, column: u32) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::START
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Unterminated quote/string/bracket or a character the lexer does not know.
    Lexical,
    /// Grammar violation.
    Syntax,
    /// Recognized construct the parser refuses to handle (e.g. `CREATE KPI`).
    Unsupported,
    /// Reserved; nothing raises it yet.
    SemanticWarning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    pub position: Position,
}

impl Diagnostic {
    #[must_use]
    pub fn error(kind: DiagnosticKind, message: impl Into<String>, position: Position) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            message: message.into(),
            position,
        }
    }

    #[must_use]
    pub fn warning(message: impl Into<String>, position: Position) -> Self {
        Self {
            severity: Severity::Warning,
            kind: DiagnosticKind::SemanticWarning,
            message: message.into(),
            position,
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.position, self.message)
    }
}

/// Ordered diagnostics, capped at `max_errors` errors.
///
/// Once the cap is reached every further diagnostic is dropped and [`Diagnostics::is_overflowed`]
/// reports `true`. The parser uses that as its signal to stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
    max_errors: usize,
    error_count: usize,
    overflowed: bool,
}

impl Diagnostics {
    /// A cap of `0` is raised to `1`: the first error is always kept.
    #[must_use]
    pub fn with_max_errors(max_errors: usize) -> Self {
        Self {
            items: Vec::new(),
            max_errors: max_errors.max(1),
            error_count: 0,
            overflowed: false,
        }
    }

    /// Records `diagnostic`, returning `false` if it was dropped because the cap was reached.
    pub fn push(&mut self, diagnostic: Diagnostic) -> bool {
        if self.overflowed {
            return false;
        }
        if diagnostic.is_error() {
            if self.error_count >= self.max_errors {
                self.overflowed = true;
                return false;
            }
            self.error_count += 1;
        }
        self.items.push(diagnostic);
        true
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.error_count > 0 || self.overflowed
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    #[must_use]
    pub fn max_errors(&self) -> usize {
        self.max_errors
    }

    #[must_use]
    pub fn is_overflowed(&self) -> bool {
        self.overflowed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.items
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }

    /// Every diagnostic as a `line:col: message` line.
    #[must_use]
    pub fn report(&self) -> String {
        self.to_string()
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::with_max_errors(crate::options::DEFAULT_MAX_ERRORS)
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, diagnostic) in self.items.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{diagnostic}")?;
        }
        if self.overflowed {
            if !self.items.is_empty() {
                writeln!(f)?;
            }
            write!(
                f,
                "too many errors (limit {}); remaining diagnostics suppressed",
                self.max_errors
            )?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn syntax(message: &str, line: u32, column: u32) -> Diagnostic {
        Diagnostic::error(
            DiagnosticKind::Syntax,
            message,
            Position::new(0, line, column),
        )
    }

    #[test]
    fn report_joins_line_col_message() {
        let mut diagnostics = Diagnostics::with_max_errors(10);
        diagnostics.push(syntax("syntax error, unexpected ')'", 1, 12));
        diagnostics.push(Diagnostic::warning("unused", Position::new(3, 2, 1)));

        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.error_count(), 1);
        assert_eq!(
            diagnostics.report(),
            "1:12: syntax error, unexpected ')'\n2:1: unused"
        );
    }

    #[test]
    fn errors_beyond_the_cap_are_dropped() {
        let mut diagnostics = Diagnostics::with_max_errors(2);
        assert!(diagnostics.push(syntax("a", 1, 1)));
        assert!(diagnostics.push(syntax("b", 1, 2)));
        assert!(!diagnostics.push(syntax("c", 1, 3)));
        // Warnings are dropped too once the collector has overflowed.
        assert!(!diagnostics.push(Diagnostic::warning("w", Position::START)));

        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.is_overflowed());
        assert!(diagnostics.report().ends_with("remaining diagnostics suppressed"));
    }

    #[test]
    fn warnings_alone_are_not_errors() {
        let mut diagnostics = Diagnostics::with_max_errors(1);
        diagnostics.push(Diagnostic::warning("w", Position::START));
        assert!(!diagnostics.has_errors());

        diagnostics.push(syntax("e", 1, 1));
        assert!(diagnostics.has_errors());
        assert!(!diagnostics.is_overflowed());
        assert_eq!(diagnostics.len(), 2);
    }

    #[test]
    fn zero_cap_still_keeps_the_first_error() {
        let mut diagnostics = Diagnostics::with_max_errors(0);
        assert_eq!(diagnostics.max_errors(), 1);
        assert!(diagnostics.push(syntax("KPI are not yet supported", 1, 8)));
        assert!(!diagnostics.push(syntax("later", 2, 1)));

        assert!(diagnostics.is_overflowed());
        assert_eq!(
            diagnostics.report(),
            "1:8: KPI are not yet supported\n\
             too many errors (limit 1); remaining diagnostics suppressed"
        );
    }
}
