//! Layer 2: reference completeness.
//!
//! Every identifier referenced by an expression must resolve to a
//! declaration in an enclosing lexical scope or to the fixed builtin
//! allow-list. A declaration is visible throughout its enclosing
//! element's subtree. Declarations that are never referenced earn a
//! low-severity warning, except names prefixed with an underscore.

use scena_core::{
    diagnostic::{Diagnostic, DiagnosticKind},
    document::{AttrValue, Child, Document, Expression, Node},
};

/// The fixed builtin allow-list: the timeline clock accessor,
/// math/collection primitives, and element constructors.
pub const BUILTINS: [&str; 18] = [
    // Clock accessor
    "clock",
    // Math primitives
    "sin", "cos", "abs", "min", "max", "floor", "round", "sqrt",
    // Collection primitives and timeline transforms
    "interpolate", "range", "push", "concat", "len", "map", "hsl",
    // Element constructors
    "node", "layer",
];

/// Whether a name resolves through the builtin allow-list.
pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

struct ScopeEntry {
    name: String,
    used: bool,
}

pub(crate) fn check(doc: &Document) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut scopes: Vec<Vec<ScopeEntry>> = Vec::new();
    visit(doc.root(), &mut scopes, &mut diagnostics);
    diagnostics
}

fn visit(node: &Node, scopes: &mut Vec<Vec<ScopeEntry>>, diagnostics: &mut Vec<Diagnostic>) {
    // Declarations are visible throughout the enclosing element's
    // subtree, so collect the frame before resolving anything.
    let frame: Vec<ScopeEntry> = node
        .children()
        .iter()
        .filter_map(|child| match child {
            Child::Declaration { name, .. } => Some(ScopeEntry {
                name: name.resolve(),
                used: false,
            }),
            _ => None,
        })
        .collect();
    scopes.push(frame);

    for value in node.attributes().values() {
        resolve_value(value, scopes, diagnostics);
    }
    for child in node.children() {
        match child {
            Child::Element(element) => visit(element, scopes, diagnostics),
            Child::Expression(expr) => resolve_expression(expr, scopes, diagnostics),
            Child::Declaration { value, .. } => resolve_expression(value, scopes, diagnostics),
            Child::Text(_) => {}
        }
    }

    let frame = scopes.pop().unwrap_or_default();
    for entry in frame {
        if !entry.used && !entry.name.starts_with('_') {
            diagnostics.push(
                Diagnostic::low(
                    DiagnosticKind::UnusedDeclaration,
                    format!("declaration `{}` is never referenced", entry.name),
                )
                .with_help("prefix the name with `_` to silence this warning"),
            );
        }
    }
}

fn resolve_value(
    value: &AttrValue,
    scopes: &mut Vec<Vec<ScopeEntry>>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        AttrValue::Expression(expr) => resolve_expression(expr, scopes, diagnostics),
        AttrValue::Object(map) => {
            for nested in map.values() {
                resolve_value(nested, scopes, diagnostics);
            }
        }
        _ => {}
    }
}

fn resolve_expression(
    expr: &Expression,
    scopes: &mut Vec<Vec<ScopeEntry>>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for id in expr.referenced() {
        let name = id.resolve();
        if is_builtin(&name) {
            continue;
        }
        let mut resolved = false;
        'frames: for frame in scopes.iter_mut().rev() {
            for entry in frame.iter_mut() {
                if entry.name == name {
                    entry.used = true;
                    resolved = true;
                    break 'frames;
                }
            }
        }
        if !resolved {
            diagnostics.push(
                Diagnostic::critical(
                    DiagnosticKind::UndefinedReference,
                    format!("undefined reference `{name}`"),
                )
                .with_help("declare it with `{let ... = ...}` in an enclosing element"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scena_core::diagnostic::Severity;

    fn check_source(source: &str) -> Vec<Diagnostic> {
        check(&scena_parser::parse(source).unwrap())
    }

    #[test]
    fn test_builtins_resolve() {
        let diags = check_source(
            "<composition><clip width={min(sin(clock()), 1)}/></composition>",
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn test_declaration_resolves_for_siblings_and_descendants() {
        let diags = check_source(
            "<composition>{let palette = [2, 3, 5]}<group><series values={palette}/></group></composition>",
        );
        assert!(diags.is_empty(), "got {diags:?}");
    }

    #[test]
    fn test_undefined_reference_is_critical() {
        let diags = check_source("<composition><clip width={missing}/></composition>");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind(), DiagnosticKind::UndefinedReference);
        assert_eq!(diags[0].severity(), Severity::Critical);
        assert!(diags[0].message().contains("missing"));
    }

    #[test]
    fn test_inner_declaration_invisible_outside() {
        let diags = check_source(
            "<composition><group>{let inner = 3}{inner}</group><clip width={inner}/></composition>",
        );
        let undefined: Vec<_> = diags
            .iter()
            .filter(|d| d.kind() == DiagnosticKind::UndefinedReference)
            .collect();
        assert_eq!(undefined.len(), 1);
    }

    #[test]
    fn test_unused_declaration_is_low_warning() {
        let diags = check_source("<composition>{let palette = [2, 3]}</composition>");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind(), DiagnosticKind::UnusedDeclaration);
        assert_eq!(diags[0].severity(), Severity::Low);
    }

    #[test]
    fn test_underscore_prefix_exempt_from_unused() {
        let diags = check_source("<composition>{let _scratch = [2, 3]}</composition>");
        assert!(diags.is_empty());
    }

    #[test]
    fn test_each_undefined_occurrence_reported() {
        let diags = check_source(
            "<composition><clip a={ghost} b={ghost}/></composition>",
        );
        assert_eq!(diags.len(), 2);
    }
}
