//! Motion synthesis: semantic roles to timeline-driven expressions.
//!
//! The rendering stage cannot depend on runtime mutable state; every
//! animated value must be a pure function of the timeline clock and the
//! element's ordinal index. [`rewrite_collections`] finds push-into-array
//! call patterns carrying an object-literal argument and rewrites each
//! recognized field into a deterministic closed-form expression via
//! [`synthesize`]. Unrecognized fields keep their original expression —
//! never fabricate a value for an unknown role.

use log::debug;

use scena_core::{
    document::{CallArg, Document, Expression, Node, format_number},
    role::{SemanticRole, classify},
};
use scena_parser::expression::analyze_expression;

/// Golden-angle hue spacing, in degrees.
pub const GOLDEN_ANGLE_DEG: f64 = 137.508;

// Per-role synthesis constants. These are documented fixed values, not
// caller-tunable configuration.
const X_CENTER: f64 = 960.0;
const X_AMPLITUDE: f64 = 420.0;
const X_FREQ: f64 = 0.02;
const X_PHASE_STEP: f64 = 0.7;
const Y_CENTER: f64 = 540.0;
const Y_AMPLITUDE: f64 = 260.0;
const Y_FREQ: f64 = 0.03;
const Y_PHASE_STEP: f64 = 1.1;
const SIZE_BASE: f64 = 36.0;
const SIZE_SWING: f64 = 6.0;
const SIZE_FREQ: f64 = 0.08;
const HUE_DRIFT: f64 = 2.0;
const VELOCITY_FREQ: f64 = 0.04;
const VELOCITY_X_SCALE: f64 = 1.6;
const VELOCITY_Y_SCALE: f64 = 0.9;
const DELAY_BASE: f64 = 6.0;
const DELAY_JITTER: f64 = 3.0;
const DELAY_PHASE_STEP: f64 = 1.7;
const SPIN_RATE: f64 = 1.2;
const SPIN_OFFSET_STEP: f64 = 15.0;
const OPACITY_BASE: f64 = 0.65;
const OPACITY_SWING: f64 = 0.35;
const OPACITY_FREQ: f64 = 0.05;
const OPACITY_PHASE_STEP: f64 = 0.8;

/// Which spatial axis a velocity expression drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// Produce the closed-form expression for a role and element index.
///
/// Returns `None` for [`SemanticRole::Generic`]: the caller must keep the
/// original expression unchanged. This fallback-to-original is a hard
/// invariant.
pub fn synthesize(role: SemanticRole, element_index: usize) -> Option<String> {
    let i = element_index as f64;
    let expr = match role {
        SemanticRole::PositionX => format!(
            "{} + {} * sin(clock() * {} + {})",
            format_number(X_CENTER),
            format_number(X_AMPLITUDE),
            format_number(X_FREQ),
            format_number(i * X_PHASE_STEP),
        ),
        SemanticRole::PositionY => format!(
            "{} + {} * sin(clock() * {} + {})",
            format_number(Y_CENTER),
            format_number(Y_AMPLITUDE),
            format_number(Y_FREQ),
            format_number(i * Y_PHASE_STEP),
        ),
        SemanticRole::Size => format!(
            "{} + {} * sin(clock() * {} + {})",
            format_number(SIZE_BASE),
            format_number(SIZE_SWING),
            format_number(SIZE_FREQ),
            format_number(i),
        ),
        SemanticRole::Color => format!(
            "hsl(({} + clock() * {}) % 360, 80, 60)",
            format_number((i * GOLDEN_ANGLE_DEG) % 360.0),
            format_number(HUE_DRIFT),
        ),
        SemanticRole::Velocity => synthesize_velocity(Axis::X, element_index),
        SemanticRole::Timing => format!(
            "{} + {} * sin({})",
            format_number(DELAY_BASE),
            format_number(DELAY_JITTER),
            format_number(i * DELAY_PHASE_STEP),
        ),
        SemanticRole::Rotation => format!(
            "clock() * {} + {}",
            format_number(SPIN_RATE),
            format_number(i * SPIN_OFFSET_STEP),
        ),
        SemanticRole::Opacity => format!(
            "{} + {} * sin(clock() * {} + {})",
            format_number(OPACITY_BASE),
            format_number(OPACITY_SWING),
            format_number(OPACITY_FREQ),
            format_number(i * OPACITY_PHASE_STEP),
        ),
        SemanticRole::Generic => return None,
    };
    Some(expr)
}

/// Velocity synthesis with an explicit axis; the y axis is scaled
/// differently from the x axis.
pub fn synthesize_velocity(axis: Axis, element_index: usize) -> String {
    let i = element_index as f64;
    let scale = match axis {
        Axis::X => VELOCITY_X_SCALE,
        Axis::Y => VELOCITY_Y_SCALE,
    };
    format!(
        "{} * cos(clock() * {} + {})",
        format_number(scale),
        format_number(VELOCITY_FREQ),
        format_number(i),
    )
}

/// Rewrite push-into-array collection builders into timeline-driven
/// generators, returning change descriptions.
///
/// For every declaration or expression child whose expression is a
/// push-style call with an object-literal argument, each recognized field
/// value is replaced with the synthesized expression for its role and the
/// containing element's pre-order index. Generic fields stay untouched.
pub fn rewrite_collections(doc: &mut Document) -> Vec<String> {
    let mut changes = Vec::new();
    let mut next_index = 0usize;
    rewrite_node(doc.root_mut(), &mut next_index, &mut changes);
    debug!(rewrites = changes.len(); "Collection rewrite pass finished");
    changes
}

fn rewrite_node(node: &mut Node, next_index: &mut usize, changes: &mut Vec<String>) {
    let element_index = *next_index;
    *next_index += 1;
    let tag = node.tag();

    for child in node.children_mut() {
        match child {
            scena_core::document::Child::Declaration { value, .. } => {
                rewrite_expression(value, element_index, &tag.to_string(), changes);
            }
            scena_core::document::Child::Expression(expr) => {
                rewrite_expression(expr, element_index, &tag.to_string(), changes);
            }
            scena_core::document::Child::Element(element) => {
                rewrite_node(element, next_index, changes);
            }
            scena_core::document::Child::Text(_) => {}
        }
    }
}

fn rewrite_expression(
    expr: &mut Expression,
    element_index: usize,
    tag: &str,
    changes: &mut Vec<String>,
) {
    let Some(call) = expr.call() else {
        return;
    };
    if call.base_name() != "push" {
        return;
    }
    let mut call = call.clone();
    let mut rewrote_fields = Vec::new();
    for arg in call.args_mut() {
        let CallArg::Object(pairs) = arg else {
            continue;
        };
        for (key, value) in pairs.iter_mut() {
            let name = key.resolve();
            let role = classify(&name);
            let synthesized = match role {
                SemanticRole::Generic => None,
                SemanticRole::Velocity => {
                    Some(synthesize_velocity(axis_for(&name), element_index))
                }
                other => synthesize(other, element_index),
            };
            if let Some(text) = synthesized {
                if *value != text {
                    *value = text;
                    rewrote_fields.push(name);
                }
            }
        }
    }
    if !rewrote_fields.is_empty() {
        let rendered = call.render();
        *expr = analyze_expression(&rendered);
        changes.push(format!(
            "rewrote collection fields [{}] in <{tag}> into timeline-driven expressions",
            rewrote_fields.join(", ")
        ));
    }
}

/// Resolve the velocity axis from a property name.
fn axis_for(name: &str) -> Axis {
    if name.to_ascii_lowercase().contains('y') {
        Axis::Y
    } else {
        Axis::X
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scena_core::document::AttrValue;
    use scena_core::timeline::CLOCK_FN;

    #[test]
    fn test_synthesize_is_deterministic() {
        for role in [
            SemanticRole::PositionX,
            SemanticRole::PositionY,
            SemanticRole::Size,
            SemanticRole::Color,
            SemanticRole::Velocity,
            SemanticRole::Timing,
            SemanticRole::Rotation,
            SemanticRole::Opacity,
        ] {
            assert_eq!(synthesize(role, 3), synthesize(role, 3));
            assert_ne!(synthesize(role, 0), synthesize(role, 7));
        }
    }

    #[test]
    fn test_generic_synthesis_returns_none() {
        assert_eq!(synthesize(SemanticRole::Generic, 0), None);
        assert_eq!(synthesize(SemanticRole::Generic, 42), None);
    }

    #[test]
    fn test_color_uses_golden_angle_hue() {
        let expr = synthesize(SemanticRole::Color, 2).unwrap();
        assert!(expr.starts_with("hsl(("));
        assert!(expr.contains("275.016"));
        assert!(expr.contains("% 360"));
    }

    #[test]
    fn test_velocity_axis_scaling_differs() {
        let x = synthesize_velocity(Axis::X, 1);
        let y = synthesize_velocity(Axis::Y, 1);
        assert_ne!(x, y);
        assert!(x.starts_with("1.6 *"));
        assert!(y.starts_with("0.9 *"));
    }

    #[test]
    fn test_rotation_is_linear_in_clock() {
        let expr = synthesize(SemanticRole::Rotation, 2).unwrap();
        assert_eq!(expr, "clock() * 1.2 + 30");
    }

    #[test]
    fn test_rewrite_collections_replaces_recognized_fields() {
        let mut doc = scena_parser::parse(
            r#"<composition>{let items = particles.push({ x: 12, color: "red", flavor: "sour" })}</composition>"#,
        )
        .unwrap();
        let changes = rewrite_collections(&mut doc);
        assert_eq!(changes.len(), 1);
        assert!(changes[0].contains("x, color"));

        let text = crate::generate::generate(&doc);
        // Recognized fields are now clock-driven
        assert!(text.contains(CLOCK_FN));
        assert!(text.contains("hsl("));
        // The generic field keeps its original value
        assert!(text.contains("flavor: \"sour\""));
    }

    #[test]
    fn test_rewrite_skips_non_push_calls() {
        let source = "<composition>{let v = interpolate(clock(), [0, 10], [0, 1])}</composition>";
        let mut doc = scena_parser::parse(source).unwrap();
        let before = doc.clone();
        let changes = rewrite_collections(&mut doc);
        assert!(changes.is_empty());
        assert_eq!(doc, before);
    }

    #[test]
    fn test_rewrite_uses_element_preorder_index() {
        let mut doc = scena_parser::parse(
            "<composition><a>{sprites.push({ x: 1 })}</a><b>{sprites.push({ x: 1 })}</b></composition>",
        )
        .unwrap();
        rewrite_collections(&mut doc);
        let text = crate::generate::generate(&doc);
        // Node <a> has pre-order index 1, <b> index 2: different phases.
        assert!(text.contains(&synthesize(SemanticRole::PositionX, 1).unwrap()));
        assert!(text.contains(&synthesize(SemanticRole::PositionX, 2).unwrap()));
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let mut doc = scena_parser::parse(
            "<composition>{let items = particles.push({ x: 12, y: 400 })}</composition>",
        )
        .unwrap();
        rewrite_collections(&mut doc);
        let once = crate::generate::generate(&doc);
        let changes = rewrite_collections(&mut doc);
        assert!(changes.is_empty());
        assert_eq!(crate::generate::generate(&doc), once);
    }

    #[test]
    fn test_rewritten_attribute_values_untouched() {
        let mut doc = scena_parser::parse("<clip width={base * 2}/>").unwrap();
        rewrite_collections(&mut doc);
        assert!(matches!(
            doc.root().attribute("width"),
            Some(AttrValue::Expression(_))
        ));
    }
}
