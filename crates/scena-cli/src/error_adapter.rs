//! Error adapter for converting ScenaError to miette diagnostics.
//!
//! This module provides the bridge between the library's standard error
//! types and miette's rich diagnostic formatting used in the CLI.
//!
//! # Multi-Error Support
//!
//! When a [`scena_parser::error::ParseError`] or a validation report
//! contains multiple diagnostics, each diagnostic is rendered
//! independently.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan, SourceSpan};

use scena::{ScenaError, diagnostic::Diagnostic, diagnostic::Severity, span::Span};

/// Adapter for a single scena diagnostic.
///
/// Wraps one [`Diagnostic`] (optionally with its source text) and
/// implements [`MietteDiagnostic`] to enable rich error formatting.
pub struct DiagnosticAdapter<'a> {
    /// The wrapped diagnostic
    diag: &'a Diagnostic,
    /// Source code for displaying snippets, when available
    src: Option<&'a str>,
}

impl<'a> DiagnosticAdapter<'a> {
    /// Create a new diagnostic adapter.
    pub fn new(diag: &'a Diagnostic, src: Option<&'a str>) -> Self {
        Self { diag, src }
    }
}

impl fmt::Debug for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticAdapter")
            .field("diag", &self.diag)
            .finish()
    }
}

impl fmt::Display for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.diag.message())
    }
}

impl std::error::Error for DiagnosticAdapter<'_> {}

impl MietteDiagnostic for DiagnosticAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.diag.kind().code()))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.diag.severity() {
            Severity::Critical | Severity::High => miette::Severity::Error,
            Severity::Medium => miette::Severity::Warning,
            Severity::Low => miette::Severity::Advice,
        })
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match (self.diag.help(), self.diag.suggested_fix()) {
            (Some(help), Some(fix)) => Some(Box::new(format!("{help}; suggested fix: {fix}"))),
            (Some(help), None) => Some(Box::new(help.to_string())),
            (None, Some(fix)) => Some(Box::new(format!("suggested fix: {fix}"))),
            (None, None) => None,
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.src.as_ref().map(|src| src as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.diag.span()?;
        self.src?;
        let label = LabeledSpan::new_primary_with_span(
            Some(self.diag.kind().description().to_string()),
            span_to_miette(span),
        );
        Some(Box::new(std::iter::once(label)))
    }
}

/// Adapter for [`ScenaError`] variants without rich diagnostics.
pub struct ErrorAdapter<'a>(pub &'a ScenaError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            ScenaError::Io(_) => "scena::io",
            ScenaError::Parse { .. } => return None,
            ScenaError::Validation { .. } => "scena::validation",
            ScenaError::ResumableTimeout { .. } => "scena::resumable_timeout",
            ScenaError::UnknownOperation(_) => "scena::unknown_operation",
            ScenaError::System(_) => "scena::system",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match &self.0 {
            ScenaError::ResumableTimeout { operation_id } => Some(Box::new(format!(
                "re-run the command to resume operation `{operation_id}`"
            ))),
            _ => None,
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        None
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        None
    }
}

/// A reportable error that can be rendered by miette.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// A rich diagnostic, optionally with source snippets.
    Diagnostic(DiagnosticAdapter<'a>),
    /// A simple error without source location.
    Error(ErrorAdapter<'a>),
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::Diagnostic(d) => fmt::Display::fmt(d, f),
            Reportable::Error(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::Diagnostic(_) => None,
            Reportable::Error(e) => e.source(),
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.code(),
            Reportable::Error(e) => e.code(),
        }
    }

    fn severity(&self) -> Option<miette::Severity> {
        match self {
            Reportable::Diagnostic(d) => d.severity(),
            Reportable::Error(e) => e.severity(),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.help(),
            Reportable::Error(e) => e.help(),
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            Reportable::Diagnostic(d) => d.source_code(),
            Reportable::Error(e) => e.source_code(),
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match self {
            Reportable::Diagnostic(d) => d.labels(),
            Reportable::Error(e) => e.labels(),
        }
    }
}

/// Convert a scena [`Span`] to a miette [`SourceSpan`].
fn span_to_miette(span: Span) -> SourceSpan {
    SourceSpan::new(span.start().into(), span.len())
}

/// Convert a [`ScenaError`] into a list of reportable errors.
///
/// For [`ScenaError::Parse`] this returns one [`Reportable`] per
/// diagnostic, with source snippets. For [`ScenaError::Validation`] each
/// report diagnostic is rendered without snippets. Other variants yield a
/// single [`Reportable`].
pub fn to_reportables(err: &ScenaError) -> Vec<Reportable<'_>> {
    match err {
        ScenaError::Parse { err: parse_err, src } => parse_err
            .diagnostics()
            .iter()
            .map(|d| Reportable::Diagnostic(DiagnosticAdapter::new(d, Some(src))))
            .collect(),
        ScenaError::Validation { report } => report
            .diagnostics()
            .iter()
            .map(|d| Reportable::Diagnostic(DiagnosticAdapter::new(d, None)))
            .collect(),
        _ => vec![Reportable::Error(ErrorAdapter(err))],
    }
}

#[cfg(test)]
mod tests {
    use scena::diagnostic::DiagnosticKind;
    use scena_parser::error::ParseError;

    use super::*;

    #[test]
    fn test_single_parse_diagnostic() {
        let diag = Diagnostic::critical(DiagnosticKind::SyntaxError, "missing closing tag")
            .with_span(Span::new(0..5))
            .with_help("close the element");
        let parse_err = ParseError::from(diag);
        let err = ScenaError::new_parse_error(parse_err, "<tag>");

        let reportables = to_reportables(&err);
        assert_eq!(reportables.len(), 1);

        match &reportables[0] {
            Reportable::Diagnostic(d) => {
                assert_eq!(d.to_string(), "missing closing tag");
                assert!(d.source_code().is_some());
                assert_eq!(d.labels().unwrap().count(), 1);
            }
            Reportable::Error(_) => panic!("Expected Diagnostic"),
        }
    }

    #[test]
    fn test_validation_report_renders_each_diagnostic() {
        let report = scena::diagnostic::ValidationReport::new(vec![
            Diagnostic::critical(DiagnosticKind::UndefinedReference, "undefined reference `a`"),
            Diagnostic::low(DiagnosticKind::UnusedDeclaration, "declaration `b` unused"),
        ]);
        let err = ScenaError::Validation { report };

        let reportables = to_reportables(&err);
        assert_eq!(reportables.len(), 2);
        assert_eq!(reportables[0].to_string(), "undefined reference `a`");
        assert_eq!(
            reportables[1].severity(),
            Some(miette::Severity::Advice)
        );
    }

    #[test]
    fn test_non_diagnostic_error() {
        let err = ScenaError::System("broken state".to_string());
        let reportables = to_reportables(&err);

        assert_eq!(reportables.len(), 1);
        match &reportables[0] {
            Reportable::Error(e) => {
                assert_eq!(e.to_string(), "internal error: broken state");
            }
            Reportable::Diagnostic(_) => panic!("Expected Error"),
        }
    }

    #[test]
    fn test_timeout_help_mentions_resume() {
        let err = ScenaError::ResumableTimeout {
            operation_id: "op-9".to_string(),
        };
        let reportables = to_reportables(&err);
        let help = reportables[0].help().unwrap().to_string();
        assert!(help.contains("op-9"));
    }
}
