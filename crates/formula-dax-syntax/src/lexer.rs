//! DAX tokenizer.
//!
//! [`Lexer`] is a lazy, single-pass iterator over [`Token`]s. It never fails: problems such as an
//! unterminated quoted identifier are recorded as diagnostics (see [`Lexer::take_diagnostics`])
//! and lexing resumes with a best-effort token.

use crate::ast::Span;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Position};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Keyword {
    Create,
    Measure,
    Define,
    Evaluate,
    Order,
    By,
    Asc,
    Desc,
    Var,
    Return,
    Calculation,
    Property,
    DataTable,
    True,
    False,
    Not,
    And,
    Or,
    Blank,
    In,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("CREATE", Keyword::Create),
    ("MEASURE", Keyword::Measure),
    ("DEFINE", Keyword::Define),
    ("EVALUATE", Keyword::Evaluate),
    ("ORDER", Keyword::Order),
    ("BY", Keyword::By),
    ("ASC", Keyword::Asc),
    ("DESC", Keyword::Desc),
    ("VAR", Keyword::Var),
    ("RETURN", Keyword::Return),
    ("CALCULATION", Keyword::Calculation),
    ("PROPERTY", Keyword::Property),
    ("DATATABLE", Keyword::DataTable),
    ("TRUE", Keyword::True),
    ("FALSE", Keyword::False),
    ("NOT", Keyword::Not),
    ("AND", Keyword::And),
    ("OR", Keyword::Or),
    ("BLANK", Keyword::Blank),
    ("IN", Keyword::In),
];

impl Keyword {
    /// Case-insensitive keyword lookup.
    pub fn from_ident(ident: &str) -> Option<Self> {
        KEYWORDS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(ident))
            .map(|(_, kw)| *kw)
    }

    pub fn as_str(self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|(_, kw)| *kw == self)
            .map_or("", |(name, _)| *name)
    }

    /// Keywords that begin a top-level statement.
    pub fn starts_statement(self) -> bool {
        matches!(self, Keyword::Create | Keyword::Define | Keyword::Evaluate)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Ident(String),
    /// `'Table Name'`, with `''` unescaped.
    QuotedIdent(String),
    /// `[Name]`, without the brackets.
    BracketRef(String),
    /// `"text"`, with `""` unescaped.
    String(String),
    Number(f64),
    Keyword(Keyword),
    /// `-- ...` or `// ...` up to (not including) the end of the line.
    Comment(String),
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Dot,
    Plus,
    Minus,
    Star,
    Slash,
    Amp,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    AndAnd,
    OrOr,
    Eof,
}

impl TokenKind {
    #[must_use]
    pub fn is_trivia(&self) -> bool {
        matches!(self, TokenKind::Comment(_))
    }

    #[must_use]
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(self, TokenKind::Keyword(kw) if *kw == keyword)
    }

    /// Human-readable form used in diagnostics.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier '{name}'"),
            TokenKind::QuotedIdent(name) => format!("table name '{}'", name.replace('\'', "''")),
            TokenKind::BracketRef(name) => format!("reference [{name}]"),
            TokenKind::String(text) => format!("string \"{}\"", text.replace('"', "\"\"")),
            TokenKind::Number(n) => format!("number {n}"),
            TokenKind::Keyword(kw) => format!("keyword {}", kw.as_str()),
            TokenKind::Comment(_) => "comment".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            other => format!("'{}'", other.punct_str()),
        }
    }

    fn punct_str(&self) -> &'static str {
        match self {
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::Dot => ".",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Amp => "&",
            TokenKind::Eq => "=",
            TokenKind::Ne => "<>",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::Le => "<=",
            TokenKind::Ge => ">=",
            TokenKind::AndAnd => "&&",
            TokenKind::OrOr => "||",
            _ => "",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Line/column of `span.start`.
    pub position: Position,
}

/// Tokenize `src` eagerly. The last token is always [`TokenKind::Eof`].
///
/// Lexical diagnostics are discarded; use [`Lexer`] directly to observe them.
pub fn tokenize(src: &str) -> Vec<Token> {
    Lexer::new(src).collect()
}

pub struct Lexer<'a> {
    src: &'a str,
    chars: std::str::Chars<'a>,
    idx: usize,
    line: u32,
    column: u32,
    finished: bool,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.chars(),
            idx: 0,
            line: 1,
            column: 1,
            finished: false,
            diagnostics: Vec::new(),
        }
    }

    /// Drain the lexical diagnostics produced so far.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Position of the next unread char; at end of input, the end-of-input position.
    pub(crate) fn cursor(&self) -> Position {
        Position::new(self.idx, self.line, self.column)
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        self.idx += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    /// Reset to `idx`, which must lie on the same line as `position`.
    fn rollback_to(&mut self, position: Position, idx: usize) {
        self.idx = idx;
        self.chars = self.src[idx..].chars();
        self.line = position.line;
        let advanced = self.src[position.offset..idx].chars().count();
        self.column = position
            .column
            .saturating_add(u32::try_from(advanced).unwrap_or(u32::MAX));
    }

    fn take_while_into<F>(&mut self, mut pred: F, out: &mut String)
    where
        F: FnMut(char) -> bool,
    {
        while let Some(ch) = self.peek_char() {
            if !pred(ch) {
                break;
            }
            self.bump();
            out.push(ch);
        }
    }

    fn error(&mut self, message: impl Into<String>, position: Position) {
        self.diagnostics
            .push(Diagnostic::error(DiagnosticKind::Lexical, message, position));
    }

    fn next_token(&mut self) -> Token {
        loop {
            while self.peek_char().is_some_and(char::is_whitespace) {
                self.bump();
            }

            let start = self.cursor();
            let Some(ch) = self.bump() else {
                return Token {
                    kind: TokenKind::Eof,
                    span: Span::new(start.offset, start.offset),
                    position: start,
                };
            };

            let kind = match ch {
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '{' => TokenKind::LBrace,
                '}' => TokenKind::RBrace,
                ',' => TokenKind::Comma,
                ';' => TokenKind::Semicolon,
                '+' => TokenKind::Plus,
                '*' => TokenKind::Star,
                '=' => TokenKind::Eq,
                '-' | '/' if self.peek_char() == Some(ch) => {
                    self.bump();
                    let mut text = String::new();
                    self.take_while_into(|c| c != '\n' && c != '\r', &mut text);
                    TokenKind::Comment(text)
                }
                '-' => TokenKind::Minus,
                '/' => TokenKind::Slash,
                '<' => match self.peek_char() {
                    Some('=') => {
                        self.bump();
                        TokenKind::Le
                    }
                    Some('>') => {
                        self.bump();
                        TokenKind::Ne
                    }
                    _ => TokenKind::Lt,
                },
                '>' => {
                    if self.peek_char() == Some('=') {
                        self.bump();
                        TokenKind::Ge
                    } else {
                        TokenKind::Gt
                    }
                }
                '&' => {
                    if self.peek_char() == Some('&') {
                        self.bump();
                        TokenKind::AndAnd
                    } else {
                        TokenKind::Amp
                    }
                }
                '|' if self.peek_char() == Some('|') => {
                    self.bump();
                    TokenKind::OrOr
                }
                '"' => TokenKind::String(self.lex_delimited(start, '"', true, "string literal")),
                '\'' => TokenKind::QuotedIdent(self.lex_delimited(
                    start,
                    '\'',
                    true,
                    "quoted identifier",
                )),
                '[' => TokenKind::BracketRef(self.lex_delimited(
                    start,
                    ']',
                    false,
                    "bracketed reference",
                )),
                '.' if self.peek_char().is_some_and(|c| c.is_ascii_digit()) => {
                    self.lex_number(start, ch)
                }
                '.' => TokenKind::Dot,
                c if c.is_ascii_digit() => self.lex_number(start, c),
                c if is_ident_start(c) => {
                    let mut ident = String::from(c);
                    self.take_while_into(is_ident_part, &mut ident);
                    match Keyword::from_ident(&ident) {
                        Some(kw) => TokenKind::Keyword(kw),
                        None => TokenKind::Ident(ident),
                    }
                }
                other => {
                    self.error(format!("unexpected character {other:?}"), start);
                    continue;
                }
            };

            return Token {
                kind,
                span: Span::new(start.offset, self.idx),
                position: start,
            };
        }
    }

    /// Lex the body of a `'…'`, `"…"` or `[…]` token whose opening delimiter was consumed.
    ///
    /// When the closing delimiter is missing, the value becomes the remainder of the opening line
    /// and lexing resumes at the line break.
    fn lex_delimited(
        &mut self,
        start: Position,
        close: char,
        doubled_escape: bool,
        what: &str,
    ) -> String {
        let mut value = String::new();
        loop {
            match self.bump() {
                Some(c) if c == close => {
                    if doubled_escape && self.peek_char() == Some(close) {
                        self.bump();
                        value.push(close);
                        continue;
                    }
                    return value;
                }
                Some(c) => value.push(c),
                None => break,
            }
        }

        self.error(format!("unterminated {what}"), start);
        let body_start = start.offset + 1;
        let line_end = self.src[body_start..]
            .find(['\r', '\n'])
            .map_or(self.src.len(), |i| body_start + i);
        self.rollback_to(start, line_end);
        self.src[body_start..line_end].to_string()
    }

    fn lex_number(&mut self, start: Position, first: char) -> TokenKind {
        let mut text = String::from(first);
        self.take_while_into(|c| c.is_ascii_digit(), &mut text);
        if first != '.'
            && self.peek_char() == Some('.')
            && self.peek_second().map_or(true, |c| !is_ident_start(c))
        {
            self.bump();
            text.push('.');
            self.take_while_into(|c| c.is_ascii_digit(), &mut text);
        }
        match text.parse::<f64>() {
            Ok(n) => TokenKind::Number(n),
            Err(_) => {
                self.error(format!("invalid number {text:?}"), start);
                TokenKind::Number(0.0)
            }
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        if matches!(token.kind, TokenKind::Eof) {
            self.finished = true;
        }
        Some(token)
    }
}

fn is_ident_start(c: char) -> bool {
    // Table/variable/function identifiers can contain non-ASCII letters (e.g. `Straße`).
    c.is_alphabetic() || c == '_'
}

fn is_ident_part(c: char) -> bool {
    // `.` shows up in dotted function names (`PERCENTILE.INC`) and cube paths
    // (`CURRENTCUBE.Measures`).
    c.is_alphanumeric() || c == '_' || c == '.'
}
