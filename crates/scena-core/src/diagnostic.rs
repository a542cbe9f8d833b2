//! The layered diagnostic system for composition documents.
//!
//! Diagnostics are pure observations produced by the validation pipeline and
//! the transition analyzer. They never mutate the tree. Codes are organized
//! by layer:
//!
//! - `S0xx` - Structural syntax
//! - `S1xx` - Reference completeness
//! - `S2xx` - Static typing
//! - `S3xx` - Template completion
//! - `S4xx` - Timing invariants
//! - `S5xx` - Transition consistency

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::span::Span;

/// The severity level of a diagnostic.
///
/// [`Severity::Critical`] diagnostics make a document invalid; the other
/// levels are advisory in decreasing order of urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// A fatal issue that must be fixed before the document can be used.
    Critical,
    /// A serious issue that is very likely to produce broken output.
    High,
    /// An issue that should be addressed but does not block usage.
    Medium,
    /// A minor advisory.
    Low,
}

impl Severity {
    /// Returns `true` if this is a critical severity.
    pub fn is_critical(&self) -> bool {
        matches!(self, Severity::Critical)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::High => write!(f, "high"),
            Severity::Medium => write!(f, "medium"),
            Severity::Low => write!(f, "low"),
        }
    }
}

/// The kind of defect a diagnostic reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    // =========================================================================
    // Structural syntax (S0xx)
    // =========================================================================
    /// The document failed to parse.
    SyntaxError,
    /// An expression container holds no expression text.
    EmptyExpression,

    // =========================================================================
    // Reference completeness (S1xx)
    // =========================================================================
    /// An expression references an identifier with no declaration in scope
    /// and no builtin of that name.
    UndefinedReference,
    /// A declaration is never referenced by any expression in its scope.
    UnusedDeclaration,

    // =========================================================================
    // Static typing (S2xx)
    // =========================================================================
    /// An expression could not be parsed by the type checker.
    TypeSyntax,
    /// Operands or arguments with incompatible types.
    TypeMismatch,
    /// A typing oddity that is tolerated under the permissive configuration.
    TypeAdvisory,

    // =========================================================================
    // Template completion (S3xx)
    // =========================================================================
    /// An unresolved `{{placeholder}}` marker remains in the text.
    UnresolvedPlaceholder,
    /// A pending-work marker (`TODO`, `FIXME`) remains in the text.
    PendingMarker,
    /// An expression container is literally `undefined` or `null`.
    LiteralNullExpression,

    // =========================================================================
    // Timing invariants (S4xx)
    // =========================================================================
    /// A timeline transform call has fewer than three arguments.
    TransformArity,
    /// Input and output ranges of a transform have different lengths.
    RangeLengthMismatch,
    /// The input range of a transform is descending.
    DescendingInputRange,
    /// Transforms exist but the timeline clock is never invoked.
    MissingClockAccessor,
    /// A literal division by zero.
    DivisionByZero,

    // =========================================================================
    // Transition consistency (S5xx)
    // =========================================================================
    /// A fade-in starts too early relative to a preceding fade-out.
    TransitionOverlap,
    /// Dead air between a fade-out and the next fade-in.
    TransitionGap,
}

impl DiagnosticKind {
    /// Returns the diagnostic code as a string (e.g., "S100").
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::SyntaxError => "S000",
            DiagnosticKind::EmptyExpression => "S001",
            DiagnosticKind::UndefinedReference => "S100",
            DiagnosticKind::UnusedDeclaration => "S101",
            DiagnosticKind::TypeSyntax => "S200",
            DiagnosticKind::TypeMismatch => "S201",
            DiagnosticKind::TypeAdvisory => "S202",
            DiagnosticKind::UnresolvedPlaceholder => "S300",
            DiagnosticKind::PendingMarker => "S301",
            DiagnosticKind::LiteralNullExpression => "S302",
            DiagnosticKind::TransformArity => "S400",
            DiagnosticKind::RangeLengthMismatch => "S401",
            DiagnosticKind::DescendingInputRange => "S402",
            DiagnosticKind::MissingClockAccessor => "S403",
            DiagnosticKind::DivisionByZero => "S404",
            DiagnosticKind::TransitionOverlap => "S500",
            DiagnosticKind::TransitionGap => "S501",
        }
    }

    /// Returns a short description of what this kind means.
    pub fn description(&self) -> &'static str {
        match self {
            DiagnosticKind::SyntaxError => "syntax error",
            DiagnosticKind::EmptyExpression => "empty expression container",
            DiagnosticKind::UndefinedReference => "undefined reference",
            DiagnosticKind::UnusedDeclaration => "unused declaration",
            DiagnosticKind::TypeSyntax => "expression syntax error",
            DiagnosticKind::TypeMismatch => "type mismatch",
            DiagnosticKind::TypeAdvisory => "typing advisory",
            DiagnosticKind::UnresolvedPlaceholder => "unresolved placeholder",
            DiagnosticKind::PendingMarker => "pending-work marker",
            DiagnosticKind::LiteralNullExpression => "literal null expression",
            DiagnosticKind::TransformArity => "transform arity too small",
            DiagnosticKind::RangeLengthMismatch => "range length mismatch",
            DiagnosticKind::DescendingInputRange => "descending input range",
            DiagnosticKind::MissingClockAccessor => "clock accessor never invoked",
            DiagnosticKind::DivisionByZero => "division by zero",
            DiagnosticKind::TransitionOverlap => "transition overlap",
            DiagnosticKind::TransitionGap => "transition dead air",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A single observation about a composition document.
///
/// Diagnostics carry a kind, a severity, a human-readable message, an
/// optional source location, and optional suggested-fix and help text.
///
/// # Example
///
/// ```
/// use scena_core::diagnostic::{Diagnostic, DiagnosticKind, Severity};
/// use scena_core::span::Span;
///
/// let diag = Diagnostic::critical(DiagnosticKind::UndefinedReference, "undefined reference `pallete`")
///     .with_span(Span::new(120..127))
///     .at(4, 18)
///     .with_help("did you mean `palette`?");
///
/// assert!(diag.severity().is_critical());
/// assert_eq!(diag.to_string(), "critical[S100]: undefined reference `pallete`");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    kind: DiagnosticKind,
    severity: Severity,
    message: String,
    span: Option<Span>,
    line: Option<usize>,
    column: Option<usize>,
    suggested_fix: Option<String>,
    help: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with the given kind, severity, and message.
    pub fn new(kind: DiagnosticKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            span: None,
            line: None,
            column: None,
            suggested_fix: None,
            help: None,
        }
    }

    /// Create a critical diagnostic.
    pub fn critical(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Critical, message)
    }

    /// Create a high-severity diagnostic.
    pub fn high(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::High, message)
    }

    /// Create a medium-severity diagnostic.
    pub fn medium(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Medium, message)
    }

    /// Create a low-severity diagnostic.
    pub fn low(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Low, message)
    }

    /// Get the kind of this diagnostic.
    pub fn kind(&self) -> DiagnosticKind {
        self.kind
    }

    /// Get the severity of this diagnostic.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Get the primary message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source span, if any.
    pub fn span(&self) -> Option<Span> {
        self.span
    }

    /// Get the 1-based source line, if any.
    pub fn line(&self) -> Option<usize> {
        self.line
    }

    /// Get the 1-based source column, if any.
    pub fn column(&self) -> Option<usize> {
        self.column
    }

    /// Get the suggested textual fix, if any.
    pub fn suggested_fix(&self) -> Option<&str> {
        self.suggested_fix.as_deref()
    }

    /// Get the help text, if any.
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Set the source span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Set the 1-based source line and column.
    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    /// Set the suggested textual fix.
    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }

    /// Set the help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.kind.code(), self.message)
    }
}

impl std::error::Error for Diagnostic {}

/// The accumulated outcome of running the validation pipeline.
///
/// `is_valid` holds iff no critical diagnostic was produced; `runtime_safe`
/// additionally requires that no undefined-reference diagnostic exists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    /// Create a report from accumulated diagnostics.
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    /// All diagnostics in pipeline order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Append further diagnostics to the report.
    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    /// `true` iff zero critical diagnostics exist.
    pub fn is_valid(&self) -> bool {
        !self.diagnostics.iter().any(|d| d.severity().is_critical())
    }

    /// `true` iff the document is valid and has no unresolved references.
    pub fn runtime_safe(&self) -> bool {
        self.is_valid()
            && !self
                .diagnostics
                .iter()
                .any(|d| d.kind() == DiagnosticKind::UndefinedReference)
    }

    /// Number of diagnostics at the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity() == severity)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_display() {
        assert_eq!(Severity::Critical.to_string(), "critical");
        assert_eq!(Severity::Low.to_string(), "low");
    }

    #[test]
    fn test_kind_codes() {
        assert_eq!(DiagnosticKind::SyntaxError.code(), "S000");
        assert_eq!(DiagnosticKind::UndefinedReference.code(), "S100");
        assert_eq!(DiagnosticKind::TransformArity.code(), "S400");
        assert_eq!(DiagnosticKind::TransitionOverlap.code(), "S500");
    }

    #[test]
    fn test_kind_description() {
        assert_eq!(
            DiagnosticKind::UndefinedReference.description(),
            "undefined reference"
        );
        assert_eq!(
            DiagnosticKind::MissingClockAccessor.description(),
            "clock accessor never invoked"
        );
    }

    #[test]
    fn test_diagnostic_builder_chain() {
        let diag = Diagnostic::high(DiagnosticKind::TypeMismatch, "`+` applied to string and list")
            .with_span(Span::new(10..24))
            .at(2, 7)
            .with_fix("convert the list with `len(...)`")
            .with_help("string concatenation requires string or number operands");

        assert_eq!(diag.severity(), Severity::High);
        assert_eq!(diag.kind(), DiagnosticKind::TypeMismatch);
        assert_eq!(diag.span(), Some(Span::new(10..24)));
        assert_eq!(diag.line(), Some(2));
        assert_eq!(diag.column(), Some(7));
        assert!(diag.suggested_fix().is_some());
        assert!(diag.help().is_some());
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::critical(DiagnosticKind::UndefinedReference, "undefined reference `x`");
        assert_eq!(diag.to_string(), "critical[S100]: undefined reference `x`");
    }

    #[test]
    fn test_report_validity() {
        let mut report = ValidationReport::default();
        assert!(report.is_valid());
        assert!(report.runtime_safe());

        report.extend([Diagnostic::low(
            DiagnosticKind::UnusedDeclaration,
            "declaration `palette` is never referenced",
        )]);
        assert!(report.is_valid());

        report.extend([Diagnostic::critical(
            DiagnosticKind::UndefinedReference,
            "undefined reference `pallete`",
        )]);
        assert!(!report.is_valid());
        assert!(!report.runtime_safe());
        assert_eq!(report.count(Severity::Critical), 1);
        assert_eq!(report.count(Severity::Low), 1);
    }
}
