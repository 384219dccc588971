//! Statement boundaries for editor folding.
//!
//! This is a single character-level pass that does not build a parse tree, so it stays cheap
//! enough to run on every visible-range refresh and tolerates half-typed input.

use crate::measure::strip_brackets;
use serde::{Deserialize, Serialize};

/// A top-level statement range, `start..end` in bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementSpan {
    pub start: usize,
    /// Exclusive. Includes the `;` terminator when there is one.
    pub end: usize,
    /// Collapsed form for measure statements, e.g. `'Sales'[Total]`.
    pub label: Option<String>,
    /// Full statement text (trimmed, without terminator) for measure statements.
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatementKeyword {
    Create,
    Define,
    Evaluate,
    Alter,
}

impl StatementKeyword {
    fn from_word(word: &str) -> Option<Self> {
        if word.eq_ignore_ascii_case("CREATE") {
            Some(Self::Create)
        } else if word.eq_ignore_ascii_case("DEFINE") {
            Some(Self::Define)
        } else if word.eq_ignore_ascii_case("EVALUATE") {
            Some(Self::Evaluate)
        } else if word.eq_ignore_ascii_case("ALTER") {
            Some(Self::Alter)
        } else {
            None
        }
    }
}

/// Locate the top-level statements of `src`, in source order.
///
/// Only statements introduced by `CREATE`, `DEFINE`, `EVALUATE` or `ALTER` are reported; blank,
/// comment-only and free-text segments are not.
pub fn find_statement_spans(src: &str) -> Vec<StatementSpan> {
    let mut scanner = Scanner::new(src);
    scanner.run();
    scanner.spans
}

struct Scanner<'a> {
    src: &'a str,
    paren_depth: usize,
    brace_depth: usize,
    bracket_depth: usize,
    in_single_quote: bool,
    in_double_quote: bool,
    in_comment: bool,
    /// Offset of the first significant char of the current statement.
    start: Option<usize>,
    /// End offset of the last significant char seen.
    last_end: usize,
    first_keyword: Option<StatementKeyword>,
    saw_evaluate: bool,
    spans: Vec<StatementSpan>,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            paren_depth: 0,
            brace_depth: 0,
            bracket_depth: 0,
            in_single_quote: false,
            in_double_quote: false,
            in_comment: false,
            start: None,
            last_end: 0,
            first_keyword: None,
            saw_evaluate: false,
            spans: Vec::new(),
        }
    }

    fn at_top_level(&self) -> bool {
        self.paren_depth == 0 && self.brace_depth == 0 && self.bracket_depth == 0
    }

    fn run(&mut self) {
        let src = self.src;
        let mut chars = src.char_indices().peekable();
        while let Some((idx, ch)) = chars.next() {
            let next = chars.peek().map(|&(_, c)| c);
            let end = idx + ch.len_utf8();

            if self.in_comment {
                if ch == '\n' {
                    self.in_comment = false;
                }
                continue;
            }

            if self.in_single_quote || self.in_double_quote {
                let close = if self.in_single_quote { '\'' } else { '"' };
                if ch == close {
                    if next == Some(close) {
                        chars.next();
                        self.last_end = end + close.len_utf8();
                        continue;
                    }
                    self.in_single_quote = false;
                    self.in_double_quote = false;
                }
                self.last_end = end;
                continue;
            }

            // Bracketed references are raw text up to the first `]`.
            if self.bracket_depth > 0 {
                if ch == ']' {
                    self.bracket_depth -= 1;
                }
                self.last_end = end;
                continue;
            }

            match ch {
                c if c.is_whitespace() => continue,
                '-' | '/' if next == Some(ch) => {
                    chars.next();
                    self.in_comment = true;
                    continue;
                }
                ';' if self.at_top_level() => {
                    self.finish(Some(end));
                    continue;
                }
                c if is_word_start(c) => {
                    let mut word_end = end;
                    while let Some(&(j, c)) = chars.peek() {
                        if !is_word_part(c) {
                            break;
                        }
                        word_end = j + c.len_utf8();
                        chars.next();
                    }
                    self.on_word(idx, word_end);
                    continue;
                }
                _ => {}
            }

            self.begin(idx, None);
            match ch {
                '\'' => self.in_single_quote = true,
                '"' => self.in_double_quote = true,
                '[' => self.bracket_depth += 1,
                '(' => self.paren_depth += 1,
                ')' => self.paren_depth = self.paren_depth.saturating_sub(1),
                '{' => self.brace_depth += 1,
                '}' => self.brace_depth = self.brace_depth.saturating_sub(1),
                _ => {}
            }
            self.last_end = end;
        }

        self.finish(None);
    }

    fn on_word(&mut self, start: usize, end: usize) {
        let keyword = StatementKeyword::from_word(&self.src[start..end]);
        if let Some(keyword) = keyword {
            if self.start.is_some() && self.at_top_level() && self.splits_before(keyword) {
                self.finish(None);
            }
            if keyword == StatementKeyword::Evaluate {
                self.saw_evaluate = true;
            }
        }
        self.begin(start, keyword);
        self.last_end = end;
    }

    /// Whether a top-level `keyword` starts a new statement.
    fn splits_before(&self, keyword: StatementKeyword) -> bool {
        match keyword {
            // `DEFINE ... EVALUATE` is a single query.
            StatementKeyword::Evaluate => {
                self.first_keyword != Some(StatementKeyword::Define) || self.saw_evaluate
            }
            StatementKeyword::Create | StatementKeyword::Define | StatementKeyword::Alter => true,
        }
    }

    fn begin(&mut self, start: usize, keyword: Option<StatementKeyword>) {
        if self.start.is_none() {
            self.start = Some(start);
            self.first_keyword = keyword;
            self.saw_evaluate = false;
        }
    }

    /// Close the current statement. `terminator_end` is the offset just past its `;`.
    fn finish(&mut self, terminator_end: Option<usize>) {
        let Some(start) = self.start.take() else {
            return;
        };
        let first_keyword = self.first_keyword.take();
        self.saw_evaluate = false;
        self.paren_depth = 0;
        self.brace_depth = 0;
        self.bracket_depth = 0;
        self.in_single_quote = false;
        self.in_double_quote = false;

        if first_keyword.is_none() {
            return;
        }

        let content_end = self.last_end.max(start);
        let text = &self.src[start..content_end];
        let label = measure_label(text);
        let hint = label.as_ref().map(|_| text.to_string());
        self.spans.push(StatementSpan {
            start,
            end: terminator_end.unwrap_or(content_end),
            label,
            hint,
        });
    }
}

fn is_word_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_word_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

/// `<table>[<name>]` for `CREATE MEASURE` / `DEFINE MEASURE` statements. The table keeps its
/// source spelling (quotes included); the measure name loses its brackets.
fn measure_label(text: &str) -> Option<String> {
    let rest = strip_word(text, "CREATE").or_else(|| strip_word(text, "DEFINE"))?;
    let rest = strip_word(rest.trim_start(), "MEASURE")?.trim_start();

    let table_len = if rest.starts_with('\'') {
        quoted_len(rest)?
    } else {
        rest.find(|c: char| !is_word_part(c)).unwrap_or(rest.len())
    };
    if table_len == 0 {
        return None;
    }
    let (table, rest) = rest.split_at(table_len);

    let rest = rest.trim_start();
    if !rest.starts_with('[') {
        return None;
    }
    let close = rest.find(']')?;
    let name = strip_brackets(&rest[..=close]);
    if name.is_empty() {
        return None;
    }
    Some(format!("{table}[{name}]"))
}

/// `text` without a leading case-insensitive `word`, if `word` is a whole word there.
fn strip_word<'t>(text: &'t str, word: &str) -> Option<&'t str> {
    let head = text.get(..word.len())?;
    if !head.eq_ignore_ascii_case(word) {
        return None;
    }
    let rest = &text[word.len()..];
    if rest.chars().next().is_some_and(is_word_part) {
        return None;
    }
    Some(rest)
}

/// Byte length of a `'…'` token at the start of `text`, honouring `''` escapes.
fn quoted_len(text: &str) -> Option<usize> {
    let mut chars = text.char_indices().skip(1).peekable();
    while let Some((idx, ch)) = chars.next() {
        if ch == '\'' {
            if chars.peek().is_some_and(|&(_, c)| c == '\'') {
                chars.next();
                continue;
            }
            return Some(idx + 1);
        }
    }
    None
}
