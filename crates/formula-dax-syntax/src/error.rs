use crate::diagnostics::{Diagnostic, Diagnostics};

/// A parse that recorded at least one error, for callers that treat any error as fatal.
///
/// The `Display` output is the aggregated `line:col: message` report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{report}")]
pub struct ParseFailure {
    diagnostics: Vec<Diagnostic>,
    report: String,
}

impl ParseFailure {
    pub(crate) fn from_diagnostics(diagnostics: Diagnostics) -> Self {
        let report = diagnostics.report();
        Self {
            diagnostics: diagnostics.into_vec(),
            report,
        }
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// First error-severity diagnostic, if any survived the error cap.
    #[must_use]
    pub fn first_error(&self) -> Option<&Diagnostic> {
        self.diagnostics.iter().find(|d| d.is_error())
    }

    #[must_use]
    pub fn report(&self) -> &str {
        &self.report
    }
}
