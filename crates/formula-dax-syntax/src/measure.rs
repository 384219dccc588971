use crate::ast::Span;
use serde::{Deserialize, Serialize};

/// A named, table-scoped calculated expression from a `CREATE MEASURE` / `DEFINE MEASURE`
/// statement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    /// Table name with surrounding quotes removed and `''` unescaped.
    pub table_name: String,
    /// Measure name without brackets.
    pub name: String,
    /// Source text of the right-hand side, trimmed.
    pub expression: String,
    /// Source text from the leading keyword to the end of the expression. Excludes any
    /// `CALCULATION PROPERTY` clause and the statement terminator.
    pub full_text: String,
    pub calc_property: Option<CalcProperty>,
    /// Byte range of `full_text` in the parsed source.
    pub span: Span,
}

/// Formatting metadata attached by a `CALCULATION PROPERTY` clause.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalcProperty {
    pub format: FormatType,
    pub calculation_type: String,
    /// Number of decimal places.
    pub accuracy: Option<u32>,
    pub thousand_separator: Option<bool>,
    /// Display format string, e.g. `#,0.00`.
    pub format_string: Option<String>,
}

impl CalcProperty {
    pub const MEMBER: &'static str = "Member";

    #[must_use]
    pub fn new(format: FormatType) -> Self {
        Self {
            format,
            calculation_type: Self::MEMBER.to_string(),
            accuracy: None,
            thousand_separator: None,
            format_string: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatType {
    General,
    NumberWhole,
    NumberDecimal,
    Percentage,
    Scientific,
    Currency,
    DateTimeCustom,
    DateTimeShortDatePattern,
    DateTimeGeneral,
    Text,
}

const FORMAT_TYPES: &[(&str, FormatType)] = &[
    ("General", FormatType::General),
    ("NumberWhole", FormatType::NumberWhole),
    ("NumberDecimal", FormatType::NumberDecimal),
    ("Percentage", FormatType::Percentage),
    ("Scientific", FormatType::Scientific),
    ("Currency", FormatType::Currency),
    ("DateTimeCustom", FormatType::DateTimeCustom),
    ("DateTimeShortDatePattern", FormatType::DateTimeShortDatePattern),
    ("DateTimeGeneral", FormatType::DateTimeGeneral),
    ("Text", FormatType::Text),
];

impl FormatType {
    /// Case-insensitive lookup of the keyword following `CALCULATION PROPERTY`.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        FORMAT_TYPES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(keyword))
            .map(|(_, format)| *format)
    }

    pub fn as_str(self) -> &'static str {
        FORMAT_TYPES
            .iter()
            .find(|(_, format)| *format == self)
            .map_or("", |(name, _)| *name)
    }
}

/// Source locations collected while parsing one measure definition.
#[derive(Clone, Copy, Debug)]
pub(crate) struct MeasureSource {
    /// Start of the `CREATE` (or, inside `DEFINE`, the `MEASURE`) keyword.
    pub statement_start: usize,
    pub table: Span,
    pub name: Span,
    pub expression: Span,
}

impl MeasureSource {
    pub(crate) fn build(self, src: &str, calc_property: Option<CalcProperty>) -> Measure {
        let full = Span::new(self.statement_start, self.expression.end);
        Measure {
            table_name: unquote_table_name(self.table.slice(src)),
            name: strip_brackets(self.name.slice(src)).to_string(),
            expression: self.expression.slice(src).trim().to_string(),
            full_text: full.slice(src).trim().to_string(),
            calc_property,
            span: full,
        }
    }
}

/// `'Sales ''24'` -> `Sales '24`; unquoted names are returned as-is.
pub(crate) fn unquote_table_name(raw: &str) -> String {
    match raw
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    {
        Some(inner) => inner.replace("''", "'"),
        None => raw.to_string(),
    }
}

/// `[Total Amount]` -> `Total Amount`.
pub(crate) fn strip_brackets(raw: &str) -> &str {
    raw.strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unquotes_doubled_quotes() {
        assert_eq!(unquote_table_name("'Sales ''24'"), "Sales '24");
        assert_eq!(unquote_table_name("Sales"), "Sales");
        assert_eq!(unquote_table_name("'T T'"), "T T");
    }

    #[test]
    fn strips_brackets() {
        assert_eq!(strip_brackets("[Total Amount]"), "Total Amount");
        assert_eq!(strip_brackets("Total"), "Total");
    }

    #[test]
    fn format_types_are_case_insensitive() {
        assert_eq!(
            FormatType::from_keyword("numberdecimal"),
            Some(FormatType::NumberDecimal)
        );
        assert_eq!(FormatType::from_keyword("WrongFormatType"), None);
        assert_eq!(FormatType::Currency.as_str(), "Currency");
    }

    #[test]
    fn build_slices_exact_source() {
        let src = "CREATE MEASURE 'T'[M] =  SUM(T[x])  ;";
        let measure = MeasureSource {
            statement_start: 0,
            table: Span::new(15, 18),
            name: Span::new(18, 21),
            expression: Span::new(25, 34),
        }
        .build(src, None);

        assert_eq!(measure.table_name, "T");
        assert_eq!(measure.name, "M");
        assert_eq!(measure.expression, "SUM(T[x])");
        assert_eq!(measure.full_text, "CREATE MEASURE 'T'[M] =  SUM(T[x])");
        assert_eq!(measure.span, Span::new(0, 34));
    }
}
