//! Layer 5: domain timing invariants.
//!
//! Every recognized timeline transform call is checked for arity,
//! matched input/output range lengths, and monotonic input ranges; the
//! document as a whole must invoke the clock accessor whenever transforms
//! exist, and no expression may contain a literal division by zero.

use scena_core::{
    diagnostic::{Diagnostic, DiagnosticKind},
    document::{CallArg, CallSignature, Document},
    timeline::{CLOCK_FN, TRANSFORM_FN},
};

pub(crate) fn check(doc: &Document) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut transforms: Vec<CallSignature> = Vec::new();
    let mut clock_invoked = false;

    doc.for_each_expression(&mut |expr| {
        if expr.text().contains(&format!("{CLOCK_FN}(")) {
            clock_invoked = true;
        }
        if let Some(call) = expr.call() {
            if call.base_name() == TRANSFORM_FN {
                transforms.push(call.clone());
            }
        }
        diagnostics.extend(division_by_zero(expr.text()));
    });

    for call in &transforms {
        diagnostics.extend(check_transform(call));
    }

    if !transforms.is_empty() && !clock_invoked {
        diagnostics.push(
            Diagnostic::critical(
                DiagnosticKind::MissingClockAccessor,
                format!(
                    "timeline transforms exist but `{CLOCK_FN}()` is never invoked"
                ),
            )
            .with_help("drive the first transform argument from the timeline clock"),
        );
    }

    diagnostics
}

fn check_transform(call: &CallSignature) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    if call.args().len() < 3 {
        diagnostics.push(
            Diagnostic::critical(
                DiagnosticKind::TransformArity,
                format!(
                    "`{TRANSFORM_FN}` requires at least 3 arguments, found {}",
                    call.args().len()
                ),
            )
            .with_fix("pass the clock value, an input range, and an output range"),
        );
        return diagnostics;
    }

    let inputs = match call.args().get(1) {
        Some(CallArg::NumberList(values)) => Some(values),
        _ => None,
    };
    let outputs = match call.args().get(2) {
        Some(CallArg::NumberList(values)) => Some(values),
        _ => None,
    };

    if let (Some(inputs), Some(outputs)) = (inputs, outputs) {
        if inputs.len() != outputs.len() {
            diagnostics.push(
                Diagnostic::critical(
                    DiagnosticKind::RangeLengthMismatch,
                    format!(
                        "input range has {} entries but output range has {}",
                        inputs.len(),
                        outputs.len()
                    ),
                )
                .with_fix("make the input and output ranges the same length"),
            );
        }
        if inputs.len() >= 2 && inputs.windows(2).all(|w| w[1] < w[0]) {
            // A warning, not an error: a reversed range can be intentional.
            diagnostics.push(
                Diagnostic::low(
                    DiagnosticKind::DescendingInputRange,
                    format!("input range {inputs:?} is descending"),
                )
                .with_help("reverse the range unless the inversion is intentional"),
            );
        }
    }

    diagnostics
}

/// Literal `/ 0` patterns (not followed by a further digit or `.`).
fn division_by_zero(text: &str) -> Vec<Diagnostic> {
    let chars: Vec<char> = text.chars().collect();
    let mut diagnostics = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '/' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if chars.get(j) == Some(&'0') {
                let after = chars.get(j + 1);
                let continues = after.is_some_and(|c| c.is_ascii_digit() || *c == '.');
                if !continues {
                    diagnostics.push(
                        Diagnostic::critical(
                            DiagnosticKind::DivisionByZero,
                            format!("literal division by zero in `{text}`"),
                        )
                        .with_fix("replace the zero divisor"),
                    );
                }
            }
        }
        i += 1;
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use scena_core::diagnostic::Severity;

    fn check_source(source: &str) -> Vec<Diagnostic> {
        check(&scena_parser::parse(source).unwrap())
    }

    #[test]
    fn test_well_formed_transform_passes() {
        let diags = check_source(
            "<clip style={{opacity: interpolate(clock(), [0, 30], [0, 1])}}/>",
        );
        assert!(diags.is_empty(), "got {diags:?}");
    }

    #[test]
    fn test_arity_below_three_is_critical() {
        let diags = check_source("<clip width={interpolate(clock(), [0, 30])}/>");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind(), DiagnosticKind::TransformArity);
        assert_eq!(diags[0].severity(), Severity::Critical);
    }

    #[test]
    fn test_range_length_mismatch_is_critical() {
        let diags = check_source(
            "<clip width={interpolate(clock(), [0, 15, 30], [0, 1])}/>",
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind(), DiagnosticKind::RangeLengthMismatch);
        assert_eq!(diags[0].severity(), Severity::Critical);
    }

    #[test]
    fn test_descending_input_range_is_a_warning() {
        let diags = check_source(
            "<clip width={interpolate(clock(), [30, 0], [0, 1])}/>",
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind(), DiagnosticKind::DescendingInputRange);
        assert_eq!(diags[0].severity(), Severity::Low);
    }

    #[test]
    fn test_missing_clock_accessor_with_transforms() {
        let diags = check_source("<clip width={interpolate(frame, [0, 30], [0, 1])}/>");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind(), DiagnosticKind::MissingClockAccessor);
        assert_eq!(diags[0].severity(), Severity::Critical);
    }

    #[test]
    fn test_no_transforms_means_no_clock_requirement() {
        let diags = check_source("<clip width={base * 2}/>");
        assert!(diags.is_empty());
    }

    #[test]
    fn test_division_by_zero_literal() {
        let diags = check_source("<clip width={total / 0}/>");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind(), DiagnosticKind::DivisionByZero);
        assert_eq!(diags[0].severity(), Severity::Critical);
    }

    #[test]
    fn test_division_by_decimal_is_fine() {
        assert!(check_source("<clip width={total / 0.5}/>").is_empty());
        assert!(check_source("<clip width={total / 10}/>").is_empty());
    }
}
