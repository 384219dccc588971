#![forbid(unsafe_code)]
#![deny(unreachable_patterns)]

//! Syntax layer for DAX measure scripts and queries.
//!
//! [`parse`] turns a script of `CREATE MEASURE`, `DEFINE ... EVALUATE` and `EVALUATE` statements
//! into [`Measure`]s plus [`Diagnostics`]; [`parse_script`] is the strict variant that fails on
//! any error. [`find_statement_spans`] is a separate, much cheaper pass that only locates the
//! top-level statements of a script (for folding/outlining in an editor) and never builds a tree.
//!
//! Nothing here evaluates expressions or checks that tables and columns exist.

mod ast;
mod diagnostics;
mod error;
mod lexer;
mod measure;
mod options;
mod outline;
mod parser;

pub use crate::ast::{BinaryOp, DataTableColumn, DataTableType, Expr, ExprKind, Span, UnaryOp};
pub use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Position, Severity};
pub use crate::error::ParseFailure;
pub use crate::lexer::{tokenize, Keyword, Lexer, Token, TokenKind};
pub use crate::measure::{CalcProperty, FormatType, Measure};
pub use crate::options::{ParseOptions, DEFAULT_MAX_ERRORS};
pub use crate::outline::{find_statement_spans, StatementSpan};
pub use crate::parser::{parse, parse_expression, ParseResult};

/// Parse `src` with default options, failing if any error was reported.
pub fn parse_script(src: &str) -> Result<Vec<Measure>, ParseFailure> {
    parse(src, &ParseOptions::default()).into_result()
}
