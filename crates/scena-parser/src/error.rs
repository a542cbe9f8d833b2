//! The ParseError type for wrapping parsing diagnostics.
//!
//! [`ParseError`] wraps one or more [`Diagnostic`]s that occurred while
//! turning source text into a document tree. Parse failures never produce
//! a partial tree.

use std::fmt;

use scena_core::diagnostic::Diagnostic;

/// Error type for the parsing lifecycle.
///
/// Wraps one or more diagnostics.
#[derive(Debug)]
pub struct ParseError {
    diagnostics: Vec<Diagnostic>,
}

impl ParseError {
    /// Create a new parse error from diagnostics.
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    /// Get all diagnostics in this error.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Consume the error, yielding its diagnostics.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(first) = self.diagnostics.first() {
            write!(f, "{}", first)?;
            if self.diagnostics.len() > 1 {
                write!(f, " (+{} more)", self.diagnostics.len() - 1)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

impl From<Diagnostic> for ParseError {
    fn from(diagnostic: Diagnostic) -> Self {
        Self {
            diagnostics: vec![diagnostic],
        }
    }
}

impl From<Vec<Diagnostic>> for ParseError {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scena_core::diagnostic::DiagnosticKind;

    #[test]
    fn test_parse_error_from_diagnostic() {
        let diag = Diagnostic::critical(DiagnosticKind::SyntaxError, "unterminated string literal");
        let err: ParseError = diag.into();

        assert_eq!(err.diagnostics().len(), 1);
        assert_eq!(err.diagnostics()[0].message(), "unterminated string literal");
    }

    #[test]
    fn test_parse_error_display_single() {
        let diag = Diagnostic::critical(DiagnosticKind::SyntaxError, "expected element tag name");
        let err: ParseError = diag.into();

        assert_eq!(
            err.to_string(),
            "critical[S000]: expected element tag name"
        );
    }

    #[test]
    fn test_parse_error_display_multiple() {
        let diags = vec![
            Diagnostic::critical(DiagnosticKind::SyntaxError, "first"),
            Diagnostic::critical(DiagnosticKind::SyntaxError, "second"),
            Diagnostic::critical(DiagnosticKind::SyntaxError, "third"),
        ];
        let err: ParseError = diags.into();

        assert_eq!(err.to_string(), "critical[S000]: first (+2 more)");
    }
}
