//! Layer 4: template completion.
//!
//! Scans the raw source for unresolved placeholder markers
//! (`{{NAME}}` with a bare identifier inside), pending-work markers
//! (`TODO`, `FIXME`), and expression containers that are literally
//! `undefined` or `null`.

use scena_core::{
    diagnostic::{Diagnostic, DiagnosticKind},
    document::Document,
    span::{Span, line_col},
};

pub(crate) fn check(doc: &Document, source: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    diagnostics.extend(placeholder_markers(source));
    diagnostics.extend(pending_markers(source));
    diagnostics.extend(null_containers(doc));
    diagnostics
}

/// `{{NAME}}` markers: double braces around a single bare identifier.
///
/// Object-literal attributes (`style={{opacity: 1}}`) also start with
/// `{{`, so only contents with no `:` or `,` count as placeholders.
fn placeholder_markers(source: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut offset = 0;
    while let Some(found) = source[offset..].find("{{") {
        let start = offset + found;
        let Some(close) = source[start + 2..].find("}}") else {
            break;
        };
        let content = &source[start + 2..start + 2 + close];
        offset = start + 2;
        let name = content.trim();
        let is_bare_ident = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            && !name.chars().next().is_some_and(|c| c.is_ascii_digit());
        if is_bare_ident {
            let end = start + 2 + close + 2;
            let (line, column) = line_col(source, start);
            diagnostics.push(
                Diagnostic::critical(
                    DiagnosticKind::UnresolvedPlaceholder,
                    format!("unresolved placeholder `{{{{{name}}}}}`"),
                )
                .with_span(Span::new(start..end))
                .at(line, column)
                .with_fix(format!("replace `{{{{{name}}}}}` with a concrete value")),
            );
            offset = end;
        }
    }
    diagnostics
}

/// `TODO` and `FIXME` pending-work markers.
fn pending_markers(source: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for marker in ["TODO", "FIXME"] {
        let mut offset = 0;
        while let Some(found) = source[offset..].find(marker) {
            let start = offset + found;
            let (line, column) = line_col(source, start);
            diagnostics.push(
                Diagnostic::medium(
                    DiagnosticKind::PendingMarker,
                    format!("pending-work marker `{marker}` left in the document"),
                )
                .with_span(Span::new(start..start + marker.len()))
                .at(line, column)
                .with_fix("resolve the pending work or remove the marker"),
            );
            offset = start + marker.len();
        }
    }
    diagnostics
}

/// Expression containers that are literally `undefined` or `null`.
fn null_containers(doc: &Document) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    doc.for_each_expression(&mut |expr| {
        let text = expr.text().trim();
        if text == "undefined" || text == "null" {
            diagnostics.push(
                Diagnostic::critical(
                    DiagnosticKind::LiteralNullExpression,
                    format!("expression container is literally `{text}`"),
                )
                .with_fix("replace with a concrete expression or remove the container"),
            );
        }
    });
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use scena_core::diagnostic::Severity;

    fn check_source(source: &str) -> Vec<Diagnostic> {
        let doc = scena_parser::parse(source).unwrap();
        check(&doc, source)
    }

    #[test]
    fn test_bare_placeholder_is_critical() {
        let diags = check_source("<title>{{HEADLINE}}</title>");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind(), DiagnosticKind::UnresolvedPlaceholder);
        assert_eq!(diags[0].severity(), Severity::Critical);
        assert!(diags[0].suggested_fix().unwrap().contains("{{HEADLINE}}"));
        assert!(diags[0].line().is_some());
    }

    #[test]
    fn test_style_objects_are_not_placeholders() {
        let diags = check_source("<background style={{opacity: 1, scale: 2}}/>");
        assert!(diags.is_empty());
    }

    #[test]
    fn test_pending_markers_are_medium() {
        let diags = check_source("<title>TODO pick the final copy</title>");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind(), DiagnosticKind::PendingMarker);
        assert_eq!(diags[0].severity(), Severity::Medium);
    }

    #[test]
    fn test_null_and_undefined_containers() {
        let diags = check_source("<group>{undefined}<clip a={null}/></group>");
        assert_eq!(diags.len(), 2);
        assert!(diags
            .iter()
            .all(|d| d.kind() == DiagnosticKind::LiteralNullExpression));
    }

    #[test]
    fn test_clean_document_has_no_template_diagnostics() {
        let diags = check_source("<composition><title>Launch day</title></composition>");
        assert!(diags.is_empty());
    }
}
