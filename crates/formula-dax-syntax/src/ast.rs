use serde::{Deserialize, Serialize};

/// Byte range into the parsed source (end exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    #[must_use]
    pub fn to(self, other: Span) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Source text covered by this span, or `""` if the span does not fall on char boundaries of
    /// `src`.
    #[must_use]
    pub fn slice<'a>(&self, src: &'a str) -> &'a str {
        src.get(self.start..self.end).unwrap_or("")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    #[must_use]
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Number(f64),
    Text(String),
    /// Bare `TRUE` / `FALSE` keyword literal. The call forms `TRUE()` / `FALSE()` parse as
    /// [`ExprKind::Call`].
    Boolean(bool),
    /// Bare `BLANK` keyword. `BLANK()` parses as a call.
    Blank,
    /// Table constructor like `{1, 2}` or `{(1, "a"), (2, "b")}`.
    TableLiteral {
        rows: Vec<Vec<Expr>>,
    },
    /// A row constructor / tuple expression like `(1, 2)`.
    ///
    /// This is primarily useful as the left-hand side of `IN` for multi-column membership tests.
    Tuple(Vec<Expr>),
    /// Bare identifier or quoted table name: a table, or a variable bound by `VAR`.
    TableName(String),
    /// `[Name]` without a table prefix.
    Measure(String),
    ColumnRef {
        table: String,
        column: String,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
    /// `[Measure](filter, ...)`, shorthand for `CALCULATE([Measure], filter, ...)`.
    CalculateShortcut {
        target: Box<Expr>,
        filters: Vec<Expr>,
    },
    Let {
        bindings: Vec<(String, Expr)>,
        body: Box<Expr>,
    },
    DataTable {
        columns: Vec<DataTableColumn>,
        /// `None` marks an omitted position such as the middle value of `{"Q3",, "x"}`.
        rows: Vec<Vec<Option<Expr>>>,
    },
    UnaryOp {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    BinaryOp {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Plus,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Concat,
    Equals,
    NotEquals,
    Less,
    LessEquals,
    Greater,
    GreaterEquals,
    In,
    And,
    Or,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataTableColumn {
    pub name: String,
    pub data_type: DataTableType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataTableType {
    String,
    Integer,
    Double,
    Currency,
    DateTime,
    Boolean,
}

impl DataTableType {
    pub fn from_ident(ident: &str) -> Option<Self> {
        const TYPES: &[(&str, DataTableType)] = &[
            ("STRING", DataTableType::String),
            ("INTEGER", DataTableType::Integer),
            ("DOUBLE", DataTableType::Double),
            ("CURRENCY", DataTableType::Currency),
            ("DATETIME", DataTableType::DateTime),
            ("BOOLEAN", DataTableType::Boolean),
        ];
        TYPES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(ident))
            .map(|(_, ty)| *ty)
    }
}
