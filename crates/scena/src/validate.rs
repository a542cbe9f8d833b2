//! The five-layer validation pipeline.
//!
//! Layers accumulate diagnostics; nothing short-circuits except a layer-1
//! parse failure, which yields only the parse diagnostics (no tree means
//! nothing else can run). Order:
//!
//! 1. Structural syntax (re-parse, empty expression containers)
//! 2. Reference completeness ([`references`])
//! 3. Permissive static typing ([`typing`], optional)
//! 4. Template completion ([`templates`])
//! 5. Domain timing invariants ([`timing`])

mod references;
mod templates;
mod timing;
mod typing;

pub use references::{BUILTINS, is_builtin};

use log::debug;
use serde::{Deserialize, Serialize};

use scena_core::{
    diagnostic::{Diagnostic, DiagnosticKind, ValidationReport},
    document::Document,
};

/// Options controlling which optional layers run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    /// Run the permissive static typing layer.
    pub type_check: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self { type_check: true }
    }
}

/// Validate source text through all five layers.
///
/// A parse failure short-circuits with the parse diagnostics alone.
pub fn validate_text(source: &str, options: &ValidationOptions) -> ValidationReport {
    match scena_parser::parse(source) {
        Err(err) => ValidationReport::new(err.into_diagnostics()),
        Ok(doc) => validate_document(&doc, source, options),
    }
}

/// Validate an already-parsed document (layers 2–5 plus structural
/// container checks) against its source text.
pub fn validate_document(
    doc: &Document,
    source: &str,
    options: &ValidationOptions,
) -> ValidationReport {
    let mut diagnostics = Vec::new();

    diagnostics.extend(empty_expression_containers(doc));
    diagnostics.extend(references::check(doc));
    if options.type_check {
        diagnostics.extend(typing::check(doc));
    }
    diagnostics.extend(templates::check(doc, source));
    diagnostics.extend(timing::check(doc));

    let report = ValidationReport::new(diagnostics);
    debug!(
        diagnostics = report.diagnostics().len(),
        is_valid = report.is_valid(),
        runtime_safe = report.runtime_safe();
        "Validation pipeline finished"
    );
    report
}

/// Layer 1b: expression containers holding no expression text.
fn empty_expression_containers(doc: &Document) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    doc.for_each_expression(&mut |expr| {
        if expr.text().trim().is_empty() {
            diagnostics.push(
                Diagnostic::critical(
                    DiagnosticKind::EmptyExpression,
                    "expression container holds no expression",
                )
                .with_fix("remove the empty container or add an expression"),
            );
        }
    });
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use scena_core::diagnostic::Severity;

    fn valid_source() -> &'static str {
        r#"
        <composition width={1920} height={1080}>
          {let palette = [2, 3, 5, 8, 13]}
          <background style={{opacity: interpolate(clock(), [0, 30], [0, 1])}}/>
          <series values={palette}/>
        </composition>
        "#
    }

    #[test]
    fn test_valid_document_passes_all_layers() {
        let report = validate_text(valid_source(), &ValidationOptions::default());
        assert!(report.is_valid(), "diagnostics: {:?}", report.diagnostics());
        assert!(report.runtime_safe());
    }

    #[test]
    fn test_parse_failure_short_circuits() {
        let report = validate_text("<composition>", &ValidationOptions::default());
        assert!(!report.is_valid());
        assert_eq!(report.diagnostics().len(), 1);
        assert_eq!(report.diagnostics()[0].kind(), DiagnosticKind::SyntaxError);
    }

    #[test]
    fn test_empty_container_is_critical() {
        let report = validate_text(
            "<composition><group>{}</group></composition>",
            &ValidationOptions::default(),
        );
        assert!(!report.is_valid());
        assert!(
            report
                .diagnostics()
                .iter()
                .any(|d| d.kind() == DiagnosticKind::EmptyExpression
                    && d.severity() == Severity::Critical)
        );
    }

    #[test]
    fn test_validation_monotonicity() {
        // Adding one unresolved identifier to a valid document flips
        // is_valid and adds exactly one undefined-reference critical.
        let base = validate_text(valid_source(), &ValidationOptions::default());
        assert!(base.is_valid());

        let broken = valid_source().replace(
            "values={palette}",
            "values={palette} markers={misspelled}",
        );
        let report = validate_text(&broken, &ValidationOptions::default());
        assert!(!report.is_valid());
        let undefined: Vec<_> = report
            .diagnostics()
            .iter()
            .filter(|d| d.kind() == DiagnosticKind::UndefinedReference)
            .collect();
        assert_eq!(undefined.len(), 1);
        assert_eq!(undefined[0].severity(), Severity::Critical);
        assert_eq!(
            report.count(Severity::Critical),
            base.count(Severity::Critical) + 1
        );
    }

    #[test]
    fn test_type_check_layer_is_optional() {
        let source = r#"<composition><clip width={"wide" * 2}/></composition>"#;
        let with_types = validate_text(source, &ValidationOptions { type_check: true });
        assert!(
            with_types
                .diagnostics()
                .iter()
                .any(|d| d.kind() == DiagnosticKind::TypeMismatch)
        );
        let without = validate_text(source, &ValidationOptions { type_check: false });
        assert!(
            !without
                .diagnostics()
                .iter()
                .any(|d| d.kind() == DiagnosticKind::TypeMismatch)
        );
    }
}
