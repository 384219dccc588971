//! Statement and expression parser.
//!
//! A hand-written recursive-descent parser over the lazy [`Lexer`] token stream. Expressions use
//! precedence climbing (see [`Parser::infix_binding_power`]). Errors never escape as panics or
//! `Err`: each statement that fails is reported through [`Diagnostics`], skipped, and parsing
//! resumes at the next statement.

use crate::ast::{BinaryOp, DataTableColumn, DataTableType, Expr, ExprKind, Span, UnaryOp};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::ParseFailure;
use crate::lexer::{Keyword, Lexer, Token, TokenKind};
use crate::measure::{CalcProperty, FormatType, Measure, MeasureSource};
use crate::options::ParseOptions;
use std::collections::VecDeque;

pub(crate) const KPI_NOT_SUPPORTED: &str = "KPI are not yet supported";
pub(crate) const WRONG_CALC_PROPERTY_TYPE: &str = "Wrong calculation property type";

/// Deepest expression nesting the parser descends into before reporting an error.
pub(crate) const MAX_NESTING_DEPTH: usize = 128;

/// Outcome of [`parse`].
#[derive(Clone, Debug, PartialEq)]
pub struct ParseResult {
    /// Measures in source order. Only statements parsed before the first error contribute.
    pub measures: Vec<Measure>,
    pub diagnostics: Diagnostics,
    /// `false` when parsing stopped early because the error cap was reached.
    pub complete: bool,
}

impl ParseResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    /// Aggregated `line:col: message` report of every diagnostic.
    #[must_use]
    pub fn report(&self) -> String {
        self.diagnostics.report()
    }

    /// All-or-nothing view: any error turns the whole parse into a [`ParseFailure`].
    pub fn into_result(self) -> Result<Vec<Measure>, ParseFailure> {
        if self.has_errors() {
            Err(ParseFailure::from_diagnostics(self.diagnostics))
        } else {
            Ok(self.measures)
        }
    }
}

/// Parse a script of measure definitions, queries and cube statements.
pub fn parse(src: &str, options: &ParseOptions) -> ParseResult {
    Parser::new(src, options).parse_script()
}

/// Parse a single expression, optionally preceded by `=`.
pub fn parse_expression(src: &str) -> Result<Expr, ParseFailure> {
    let mut parser = Parser::new(src, &ParseOptions::default());
    if matches!(parser.peek_kind(0), TokenKind::Eq) {
        parser.bump();
    }
    let parsed = parser
        .parse_expr(0)
        .and_then(|expr| parser.expect(TokenKind::Eof).map(|_| expr));
    match parsed {
        Ok(expr) if !parser.diagnostics.has_errors() => Ok(expr),
        Ok(_) => Err(ParseFailure::from_diagnostics(parser.diagnostics)),
        Err(err) => {
            parser.report(err);
            Err(ParseFailure::from_diagnostics(parser.diagnostics))
        }
    }
}

/// A diagnostic that aborts the statement being parsed.
type PResult<T> = Result<T, Diagnostic>;

struct Parser<'a> {
    src: &'a str,
    lexer: Lexer<'a>,
    /// Significant (non-comment) tokens pulled from the lexer but not consumed yet. Once the
    /// lexer is exhausted the trailing `Eof` token stays here forever.
    lookahead: VecDeque<Token>,
    diagnostics: Diagnostics,
    measures: Vec<Measure>,
    halted: bool,
    /// Current expression nesting, bounded by [`MAX_NESTING_DEPTH`].
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, options: &ParseOptions) -> Self {
        Self {
            src,
            lexer: Lexer::new(src),
            lookahead: VecDeque::new(),
            diagnostics: Diagnostics::with_max_errors(options.max_errors),
            measures: Vec::new(),
            halted: false,
            depth: 0,
        }
    }

    fn parse_script(mut self) -> ParseResult {
        while !self.halted {
            match self.peek_kind(0) {
                TokenKind::Eof => break,
                TokenKind::Semicolon => {
                    self.bump();
                }
                _ => {
                    if let Err(err) = self.parse_statement() {
                        self.report(err);
                        self.skip_to_statement_end();
                    }
                }
            }
        }

        ParseResult {
            measures: self.measures,
            diagnostics: self.diagnostics,
            complete: !self.halted,
        }
    }

    // -----------------------------------------------------------------------------------------
    // Token plumbing
    // -----------------------------------------------------------------------------------------

    fn fill(&mut self, n: usize) {
        while self.lookahead.len() <= n {
            let Some(token) = self.lexer.next() else {
                break;
            };
            for diagnostic in self.lexer.take_diagnostics() {
                self.report(diagnostic);
            }
            if !token.kind.is_trivia() {
                self.lookahead.push_back(token);
            }
        }
    }

    fn peek(&mut self, n: usize) -> &Token {
        self.fill(n);
        let idx = n.min(self.lookahead.len().saturating_sub(1));
        &self.lookahead[idx]
    }

    fn peek_kind(&mut self, n: usize) -> &TokenKind {
        &self.peek(n).kind
    }

    /// Consume the lookahead token. `Eof` is returned but never consumed.
    fn bump(&mut self) -> Token {
        let token = self.peek(0).clone();
        if !matches!(token.kind, TokenKind::Eof) {
            self.lookahead.pop_front();
        }
        token
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        if !self.diagnostics.push(diagnostic) && !self.halted {
            log::warn!(
                "DAX parser reached the error limit ({}); stopping",
                self.diagnostics.max_errors()
            );
            self.halted = true;
        }
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token> {
        if std::mem::discriminant(self.peek_kind(0)) == std::mem::discriminant(&kind) {
            Ok(self.bump())
        } else {
            let expected = kind.describe();
            Err(self.unexpected(&expected))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> PResult<Token> {
        if self.peek_kind(0).is_keyword(keyword) {
            Ok(self.bump())
        } else {
            Err(self.unexpected(keyword.as_str()))
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind(0) == kind {
            self.bump();
            true
        } else {
            false
        }
    }

    /// `syntax error, unexpected <lookahead>, expecting <expected>` at the lookahead token.
    fn unexpected(&mut self, expected: &str) -> Diagnostic {
        let token = self.peek(0);
        let message = format!(
            "syntax error, unexpected {}, expecting {expected}",
            token.kind.describe()
        );
        let position = token.position;
        Diagnostic::error(DiagnosticKind::Syntax, message, position)
    }

    fn syntax_error(token: &Token, message: impl AsRef<str>) -> Diagnostic {
        Diagnostic::error(
            DiagnosticKind::Syntax,
            format!("syntax error, {}", message.as_ref()),
            token.position,
        )
    }

    fn at_statement_end(&mut self) -> bool {
        match self.peek_kind(0) {
            TokenKind::Semicolon | TokenKind::Eof => true,
            TokenKind::Keyword(kw) => kw.starts_statement(),
            _ => false,
        }
    }

    fn expect_statement_end(&mut self) -> PResult<()> {
        if self.at_statement_end() {
            Ok(())
        } else {
            Err(self.unexpected("';' or end of statement"))
        }
    }

    /// Skip to just past the next top-level `;`, or up to the next statement keyword.
    fn skip_to_statement_end(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek_kind(0) {
                TokenKind::Eof => return,
                TokenKind::Semicolon if depth == 0 => {
                    self.bump();
                    return;
                }
                TokenKind::Keyword(kw) if depth == 0 && kw.starts_statement() => return,
                TokenKind::LParen | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBrace => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.bump();
        }
    }

    fn push_measure(&mut self, measure: Measure) {
        if self.diagnostics.has_errors() {
            log::debug!(
                "dropping measure {}[{}] recorded after an earlier error",
                measure.table_name,
                measure.name
            );
            return;
        }
        log::trace!("measure {}[{}]", measure.table_name, measure.name);
        self.measures.push(measure);
    }

    // -----------------------------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------------------------

    fn parse_statement(&mut self) -> PResult<()> {
        match self.peek_kind(0) {
            TokenKind::Keyword(Keyword::Create) => self.parse_create(),
            TokenKind::Keyword(Keyword::Define) => self.parse_define(),
            TokenKind::Keyword(Keyword::Evaluate) => self.parse_evaluate(),
            TokenKind::Eq => {
                self.bump();
                self.parse_expr(0)?;
                self.expect_statement_end()
            }
            _ => {
                let token = self.bump();
                log::debug!(
                    "skipping unsupported statement starting with {} at {}",
                    token.kind.describe(),
                    token.position
                );
                self.skip_to_statement_end();
                Ok(())
            }
        }
    }

    fn parse_create(&mut self) -> PResult<()> {
        let create = self.bump();
        match self.peek_kind(0) {
            TokenKind::Keyword(Keyword::Measure) => {
                self.bump();
                let measure = self.parse_measure_definition(create.span.start)?;
                self.expect_statement_end()?;
                self.push_measure(measure);
                Ok(())
            }
            TokenKind::Ident(name) if name.eq_ignore_ascii_case("KPI") => {
                let position = self.peek(0).position;
                Err(Diagnostic::error(
                    DiagnosticKind::Unsupported,
                    KPI_NOT_SUPPORTED,
                    position,
                ))
            }
            _ => {
                log::debug!(
                    "skipping cube statement CREATE {} at {}",
                    self.peek(0).kind.describe(),
                    create.position
                );
                self.skip_to_statement_end();
                Ok(())
            }
        }
    }

    /// `<table>[<name>] = <expr> [CALCULATION PROPERTY ...]`, after the `MEASURE` keyword.
    fn parse_measure_definition(&mut self, statement_start: usize) -> PResult<Measure> {
        let table = self.bump();
        match &table.kind {
            // Keywords such as `Order` or `Property` are ordinary table names here.
            TokenKind::Ident(_) | TokenKind::Keyword(_) => {}
            TokenKind::QuotedIdent(name) if name.is_empty() => {
                return Err(Self::syntax_error(&table, "empty table name"));
            }
            TokenKind::QuotedIdent(_) => {}
            other => {
                return Err(Self::syntax_error(
                    &table,
                    format!("unexpected {}, expecting table name", other.describe()),
                ));
            }
        }

        let name = self.bump();
        match &name.kind {
            TokenKind::BracketRef(value) if value.is_empty() => {
                return Err(Self::syntax_error(&name, "empty measure name"));
            }
            TokenKind::BracketRef(_) => {}
            other => {
                return Err(Self::syntax_error(
                    &name,
                    format!("unexpected {}, expecting [measure name]", other.describe()),
                ));
            }
        }

        self.expect(TokenKind::Eq)?;
        let expr = self.parse_expr(0)?;
        let calc_property = if self.peek_kind(0).is_keyword(Keyword::Calculation) {
            Some(self.parse_calc_property()?)
        } else {
            None
        };

        Ok(MeasureSource {
            statement_start,
            table: table.span,
            name: name.span,
            expression: expr.span,
        }
        .build(self.src, calc_property))
    }

    /// `CALCULATION PROPERTY <FormatType> [Accuracy=n] [ThousandSeparator=b] [Format='s']`
    fn parse_calc_property(&mut self) -> PResult<CalcProperty> {
        self.expect_keyword(Keyword::Calculation)?;
        self.expect_keyword(Keyword::Property)?;

        let format_token = self.bump();
        let format = match &format_token.kind {
            TokenKind::Ident(name) => FormatType::from_keyword(name),
            _ => None,
        };
        let Some(format) = format else {
            return Err(Diagnostic::error(
                DiagnosticKind::Syntax,
                format!(
                    "{WRONG_CALC_PROPERTY_TYPE} '{}'",
                    format_token.span.slice(self.src)
                ),
                format_token.position,
            ));
        };

        let mut property = CalcProperty::new(format);
        while let TokenKind::Ident(key) = self.peek_kind(0) {
            let key = key.clone();
            let key_token = self.bump();
            self.expect(TokenKind::Eq)?;
            let value = self.bump();

            let duplicate = if key.eq_ignore_ascii_case("Accuracy") {
                let accuracy = match value.kind {
                    TokenKind::Number(n)
                        if n >= 0.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX) =>
                    {
                        n as u32
                    }
                    _ => {
                        return Err(Self::syntax_error(
                            &value,
                            "Accuracy expects a non-negative integer",
                        ))
                    }
                };
                property.accuracy.replace(accuracy).is_some()
            } else if key.eq_ignore_ascii_case("ThousandSeparator") {
                let flag = match value.kind {
                    TokenKind::Keyword(Keyword::True) => true,
                    TokenKind::Keyword(Keyword::False) => false,
                    _ => {
                        return Err(Self::syntax_error(
                            &value,
                            "ThousandSeparator expects True or False",
                        ))
                    }
                };
                property.thousand_separator.replace(flag).is_some()
            } else if key.eq_ignore_ascii_case("Format") {
                let format_string = match value.kind {
                    TokenKind::QuotedIdent(text) | TokenKind::String(text) => text,
                    _ => {
                        return Err(Self::syntax_error(&value, "Format expects a quoted string"))
                    }
                };
                property.format_string.replace(format_string).is_some()
            } else {
                return Err(Self::syntax_error(
                    &key_token,
                    format!("unknown calculation property attribute '{key}'"),
                ));
            };

            if duplicate {
                return Err(Self::syntax_error(
                    &key_token,
                    format!("duplicate calculation property attribute '{key}'"),
                ));
            }
        }

        Ok(property)
    }

    /// `DEFINE (MEASURE ... | VAR ...)+ EVALUATE ...`
    fn parse_define(&mut self) -> PResult<()> {
        self.bump();
        let mut pending = Vec::new();
        let mut definitions = 0usize;
        loop {
            match self.peek_kind(0) {
                TokenKind::Keyword(Keyword::Measure) => {
                    let keyword = self.bump();
                    pending.push(self.parse_measure_definition(keyword.span.start)?);
                }
                TokenKind::Keyword(Keyword::Var) => {
                    self.bump();
                    self.parse_binding()?;
                }
                TokenKind::Keyword(Keyword::Evaluate) if definitions > 0 => break,
                _ if definitions == 0 => return Err(self.unexpected("MEASURE or VAR")),
                _ => return Err(self.unexpected("MEASURE, VAR or EVALUATE")),
            }
            definitions += 1;
        }

        self.parse_evaluate()?;
        for measure in pending {
            self.push_measure(measure);
        }
        Ok(())
    }

    /// `EVALUATE <expr> [ORDER BY <expr> [ASC|DESC], ...]`
    fn parse_evaluate(&mut self) -> PResult<()> {
        self.expect_keyword(Keyword::Evaluate)?;
        self.parse_expr(0)?;

        if self.peek_kind(0).is_keyword(Keyword::Order) {
            self.bump();
            self.expect_keyword(Keyword::By)?;
            loop {
                self.parse_expr(0)?;
                if matches!(
                    self.peek_kind(0),
                    TokenKind::Keyword(Keyword::Asc | Keyword::Desc)
                ) {
                    self.bump();
                }
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }

        self.expect_statement_end()
    }

    // -----------------------------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------------------------

    fn parse_expr(&mut self, min_bp: u8) -> PResult<Expr> {
        let mut left = self.parse_prefix()?;
        loop {
            let Some((op, bp)) = self.infix_binding_power() else {
                break;
            };
            if bp < min_bp {
                break;
            }
            self.bump();
            let right = self.parse_expr(bp + 1)?;
            let span = left.span.to(right.span);
            left = Expr::new(
                ExprKind::BinaryOp {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn infix_binding_power(&mut self) -> Option<(BinaryOp, u8)> {
        // Higher binds tighter:
        //   * /  >  + -  >  &  >  comparisons  >  NOT  >  && AND  >  || OR
        match self.peek_kind(0) {
            TokenKind::OrOr | TokenKind::Keyword(Keyword::Or) => Some((BinaryOp::Or, 1)),
            TokenKind::AndAnd | TokenKind::Keyword(Keyword::And) => Some((BinaryOp::And, 2)),
            TokenKind::Eq => Some((BinaryOp::Equals, 4)),
            TokenKind::Ne => Some((BinaryOp::NotEquals, 4)),
            TokenKind::Lt => Some((BinaryOp::Less, 4)),
            TokenKind::Le => Some((BinaryOp::LessEquals, 4)),
            TokenKind::Gt => Some((BinaryOp::Greater, 4)),
            TokenKind::Ge => Some((BinaryOp::GreaterEquals, 4)),
            TokenKind::Keyword(Keyword::In) => Some((BinaryOp::In, 4)),
            TokenKind::Amp => Some((BinaryOp::Concat, 5)),
            TokenKind::Plus => Some((BinaryOp::Add, 6)),
            TokenKind::Minus => Some((BinaryOp::Subtract, 6)),
            TokenKind::Star => Some((BinaryOp::Multiply, 7)),
            TokenKind::Slash => Some((BinaryOp::Divide, 7)),
            _ => None,
        }
    }

    fn parse_prefix(&mut self) -> PResult<Expr> {
        if self.depth >= MAX_NESTING_DEPTH {
            let token = self.peek(0).clone();
            return Err(Self::syntax_error(
                &token,
                format!("expression nesting exceeds {MAX_NESTING_DEPTH} levels"),
            ));
        }
        self.depth += 1;
        let expr = self.parse_prefix_inner();
        self.depth -= 1;
        expr
    }

    fn parse_prefix_inner(&mut self) -> PResult<Expr> {
        let token = self.peek(0).clone();
        let followed_by_paren = matches!(self.peek_kind(1), TokenKind::LParen);
        let followed_by_bracket = matches!(self.peek_kind(1), TokenKind::BracketRef(_));
        match token.kind {
            TokenKind::Keyword(kw) if followed_by_bracket && kw != Keyword::Not => {
                self.bump();
                let table = token.span.slice(self.src).to_string();
                self.parse_table_prefixed(table, token.span)
            }
            TokenKind::Keyword(Keyword::Var) => self.parse_let(),
            TokenKind::Keyword(Keyword::Not) => self.parse_unary(UnaryOp::Not, 3),
            TokenKind::Minus => self.parse_unary(UnaryOp::Negate, 8),
            TokenKind::Plus => self.parse_unary(UnaryOp::Plus, 8),
            TokenKind::Number(n) => {
                self.bump();
                Ok(Expr::new(ExprKind::Number(n), token.span))
            }
            TokenKind::String(text) => {
                self.bump();
                Ok(Expr::new(ExprKind::Text(text), token.span))
            }
            TokenKind::Keyword(
                kw @ (Keyword::True | Keyword::False | Keyword::Blank | Keyword::And | Keyword::Or),
            ) if followed_by_paren => {
                self.bump();
                self.parse_call(kw.as_str().to_string(), token.span)
            }
            TokenKind::Keyword(Keyword::True) => {
                self.bump();
                Ok(Expr::new(ExprKind::Boolean(true), token.span))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.bump();
                Ok(Expr::new(ExprKind::Boolean(false), token.span))
            }
            TokenKind::Keyword(Keyword::Blank) => {
                self.bump();
                Ok(Expr::new(ExprKind::Blank, token.span))
            }
            TokenKind::Keyword(Keyword::DataTable) => self.parse_datatable(),
            TokenKind::Ident(name) => {
                self.bump();
                if followed_by_paren {
                    self.parse_call(name, token.span)
                } else {
                    self.parse_table_prefixed(name, token.span)
                }
            }
            TokenKind::QuotedIdent(name) => {
                self.bump();
                self.parse_table_prefixed(name, token.span)
            }
            TokenKind::BracketRef(name) => {
                self.bump();
                let expr = Expr::new(ExprKind::Measure(name), token.span);
                self.parse_calculate_shortcut(expr)
            }
            TokenKind::LParen => self.parse_group(),
            TokenKind::LBrace => self.parse_table_literal(),
            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_unary(&mut self, op: UnaryOp, bp: u8) -> PResult<Expr> {
        let operator = self.bump();
        let expr = self.parse_expr(bp)?;
        let span = operator.span.to(expr.span);
        Ok(Expr::new(
            ExprKind::UnaryOp {
                op,
                expr: Box::new(expr),
            },
            span,
        ))
    }

    /// `Table[Column]`, or a bare table/variable name.
    fn parse_table_prefixed(&mut self, table: String, table_span: Span) -> PResult<Expr> {
        if let TokenKind::BracketRef(column) = self.peek_kind(0) {
            let column = column.clone();
            let column_token = self.bump();
            let expr = Expr::new(
                ExprKind::ColumnRef { table, column },
                table_span.to(column_token.span),
            );
            return self.parse_calculate_shortcut(expr);
        }
        Ok(Expr::new(ExprKind::TableName(table), table_span))
    }

    /// `[Measure](filters...)`; returns `target` untouched when no `(` follows.
    fn parse_calculate_shortcut(&mut self, target: Expr) -> PResult<Expr> {
        if !matches!(self.peek_kind(0), TokenKind::LParen) {
            return Ok(target);
        }
        let (filters, end) = self.parse_arguments()?;
        let span = Span::new(target.span.start, end);
        Ok(Expr::new(
            ExprKind::CalculateShortcut {
                target: Box::new(target),
                filters,
            },
            span,
        ))
    }

    fn parse_call(&mut self, name: String, name_span: Span) -> PResult<Expr> {
        let (args, end) = self.parse_arguments()?;
        Ok(Expr::new(
            ExprKind::Call { name, args },
            Span::new(name_span.start, end),
        ))
    }

    /// `( [expr (, expr)*] )`, returning the arguments and the end offset of `)`.
    ///
    /// Empty positions, including a trailing one as in `f(x, )`, are syntax errors.
    fn parse_arguments(&mut self) -> PResult<(Vec<Expr>, usize)> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !matches!(self.peek_kind(0), TokenKind::RParen) {
            loop {
                args.push(self.parse_expr(0)?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        let close = self.expect(TokenKind::RParen)?;
        Ok((args, close.span.end))
    }

    /// `VAR name = expr (VAR name = expr)* RETURN expr`
    fn parse_let(&mut self) -> PResult<Expr> {
        let start = self.peek(0).span.start;
        let mut bindings = Vec::new();
        while self.eat(&TokenKind::Keyword(Keyword::Var)) {
            bindings.push(self.parse_binding()?);
        }
        self.expect_keyword(Keyword::Return)?;
        let body = self.parse_expr(0)?;
        let span = Span::new(start, body.span.end);
        Ok(Expr::new(
            ExprKind::Let {
                bindings,
                body: Box::new(body),
            },
            span,
        ))
    }

    /// `name = expr`, after the `VAR` keyword.
    fn parse_binding(&mut self) -> PResult<(String, Expr)> {
        let name = match self.peek_kind(0) {
            TokenKind::Ident(name) => name.clone(),
            _ => return Err(self.unexpected("variable name")),
        };
        self.bump();
        self.expect(TokenKind::Eq)?;
        let value = self.parse_expr(0)?;
        Ok((name, value))
    }

    fn parse_group(&mut self) -> PResult<Expr> {
        let open = self.expect(TokenKind::LParen)?;
        let first = self.parse_expr(0)?;
        if matches!(self.peek_kind(0), TokenKind::Comma) {
            // Row constructor / tuple: `(expr1, expr2, ...)`
            let mut values = vec![first];
            while self.eat(&TokenKind::Comma) {
                values.push(self.parse_expr(0)?);
            }
            let close = self.expect(TokenKind::RParen)?;
            return Ok(Expr::new(ExprKind::Tuple(values), open.span.to(close.span)));
        }
        let close = self.expect(TokenKind::RParen)?;
        Ok(Expr::new(first.kind, open.span.to(close.span)))
    }

    fn parse_table_literal(&mut self) -> PResult<Expr> {
        let open = self.expect(TokenKind::LBrace)?;
        let mut rows: Vec<Vec<Expr>> = Vec::new();
        let mut expected_cols: Option<usize> = None;
        if !matches!(self.peek_kind(0), TokenKind::RBrace) {
            loop {
                let row_token = self.peek(0).clone();
                // Any parenthesized element inside `{...}` is treated as a row tuple, so
                // `{(1, 2), (3, 4)}` is a two-column table.
                let row = match self.parse_expr(0)? {
                    Expr {
                        kind: ExprKind::Tuple(values),
                        ..
                    } => values,
                    Expr {
                        kind: ExprKind::TableLiteral { .. },
                        ..
                    } => {
                        return Err(Self::syntax_error(
                            &row_token,
                            "nested table constructors are not supported",
                        ));
                    }
                    expr => vec![expr],
                };

                match expected_cols {
                    Some(expected) if row.len() != expected => {
                        return Err(Self::syntax_error(
                            &row_token,
                            format!(
                                "table constructor rows must all have the same number of values (expected {expected}, got {})",
                                row.len()
                            ),
                        ));
                    }
                    Some(_) => {}
                    None => expected_cols = Some(row.len()),
                }
                rows.push(row);

                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        let close = self.expect(TokenKind::RBrace)?;
        Ok(Expr::new(
            ExprKind::TableLiteral { rows },
            open.span.to(close.span),
        ))
    }

    /// `DATATABLE("col", TYPE, ..., { {v, ...}, ... })`
    fn parse_datatable(&mut self) -> PResult<Expr> {
        let keyword = self.expect_keyword(Keyword::DataTable)?;
        self.expect(TokenKind::LParen)?;

        let mut columns = Vec::new();
        while !matches!(self.peek_kind(0), TokenKind::LBrace) {
            let name = match self.peek_kind(0) {
                TokenKind::String(name) => name.clone(),
                _ => return Err(self.unexpected("column name string or '{'")),
            };
            self.bump();
            self.expect(TokenKind::Comma)?;
            let type_token = self.bump();
            let data_type = match &type_token.kind {
                TokenKind::Ident(ident) => DataTableType::from_ident(ident),
                _ => None,
            };
            let Some(data_type) = data_type else {
                return Err(Self::syntax_error(
                    &type_token,
                    format!(
                        "unknown DATATABLE column type '{}'",
                        type_token.span.slice(self.src)
                    ),
                ));
            };
            columns.push(DataTableColumn { name, data_type });
            self.expect(TokenKind::Comma)?;
        }
        if columns.is_empty() {
            return Err(self.unexpected("column name string"));
        }

        self.expect(TokenKind::LBrace)?;
        let mut rows = Vec::new();
        if !matches!(self.peek_kind(0), TokenKind::RBrace) {
            loop {
                let row_token = self.peek(0).clone();
                let row = self.parse_datatable_row()?;
                if row.len() != columns.len() {
                    return Err(Self::syntax_error(
                        &row_token,
                        format!(
                            "DATATABLE row has {} values, expected {}",
                            row.len(),
                            columns.len()
                        ),
                    ));
                }
                rows.push(row);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBrace)?;
        let close = self.expect(TokenKind::RParen)?;

        Ok(Expr::new(
            ExprKind::DataTable { columns, rows },
            keyword.span.to(close.span),
        ))
    }

    /// `{ [expr] (, [expr])* }` where any position may be empty.
    fn parse_datatable_row(&mut self) -> PResult<Vec<Option<Expr>>> {
        self.expect(TokenKind::LBrace)?;
        let mut values = Vec::new();
        loop {
            if matches!(self.peek_kind(0), TokenKind::Comma | TokenKind::RBrace) {
                values.push(None);
            } else {
                values.push(Some(self.parse_expr(0)?));
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(values)
    }
}
