//! Transition consistency analysis and repair.
//!
//! Opacity-bearing timeline transforms describe fades. A fade-in that
//! starts too early relative to a preceding fade-out makes both layers
//! semi-visible at once (content bleeds through); a fade-in that starts
//! too late leaves dead air. The analyzer extracts every fade window,
//! pairs each fade-out with the later fade-ins, and reports defects.
//! Overlap defects are auto-repaired by shifting the fade-in's input
//! range forward, preserving its duration; defects are fixed in document
//! order, independently.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use scena_core::{
    diagnostic::{Diagnostic, DiagnosticKind, Severity},
    document::{AttrValue, CallArg, Child, Document, Node},
    identifier::Id,
    timeline::TimedInterval,
};
use scena_parser::expression::analyze_expression;

use crate::select::NodePath;

/// Tunable frame thresholds for transition analysis.
///
/// With the defaults, a fade-in may start up to 15 frames before the
/// preceding fade-out ends (`minimum_overlap` is a floor on the signed
/// gap) and no more than 30 frames after it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionPolicy {
    /// Signed-gap floor; gaps below it are overlap defects.
    pub minimum_overlap: i64,
    /// Signed-gap ceiling; gaps above it are dead-air defects.
    pub maximum_gap: i64,
    /// Overlap the auto-fix establishes between fade-out end and fade-in
    /// start.
    pub recommended_overlap: i64,
}

impl Default for TransitionPolicy {
    fn default() -> Self {
        Self {
            minimum_overlap: -15,
            maximum_gap: 30,
            recommended_overlap: 15,
        }
    }
}

/// Direction of an opacity fade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeDirection {
    /// Output trends toward 1, starting after frame 0.
    In,
    /// Output trends toward 0.
    Out,
}

/// One opacity fade extracted from the document.
#[derive(Debug, Clone)]
pub struct Fade {
    /// The animation window.
    pub interval: TimedInterval,
    /// Fade direction.
    pub direction: FadeDirection,
    /// Tag of the carrying node, for reporting.
    pub node_tag: String,
    path: NodePath,
}

/// The kind of transition defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefectKind {
    /// The fade-in starts too early; content bleeds through.
    Overlap,
    /// The fade-in starts too late; dead air between transitions.
    DeadAir,
}

/// A defective (fade-out, later fade-in) pair.
#[derive(Debug, Clone)]
pub struct TransitionDefect {
    pub kind: DefectKind,
    pub severity: Severity,
    /// `fade_in.start - fade_out.end`, in frames.
    pub gap: i64,
    pub fade_out: TimedInterval,
    pub fade_in: TimedInterval,
    /// Tag of the fade-in's node, for reporting.
    pub fade_in_tag: String,
    fade_in_path: NodePath,
}

impl TransitionDefect {
    /// The input range the auto-fix would give the fade-in.
    pub fn recommended_range(&self, policy: &TransitionPolicy) -> (i64, i64) {
        let start = self.fade_out.end - policy.recommended_overlap;
        (start, start + self.fade_in.duration())
    }
}

/// Extract every opacity fade, in document order.
pub fn extract_fades(doc: &Document) -> Vec<Fade> {
    let mut fades = Vec::new();
    let mut path = Vec::new();
    walk(doc.root(), &mut path, &mut fades);
    debug!(fades = fades.len(); "Extracted opacity fades");
    fades
}

fn walk(node: &Node, path: &mut NodePath, fades: &mut Vec<Fade>) {
    if let Some(style) = node.style() {
        if let Some(AttrValue::Expression(expr)) = style.get(&Id::new("opacity")) {
            if let Some(call) = expr.call() {
                if let Some(interval) = TimedInterval::from_call("opacity", call) {
                    if let Some(direction) = fade_direction(&interval) {
                        fades.push(Fade {
                            interval,
                            direction,
                            node_tag: node.tag().to_string(),
                            path: path.clone(),
                        });
                    }
                }
            }
        }
    }
    for (index, child) in node.children().iter().enumerate() {
        if let Child::Element(element) = child {
            path.push(index);
            walk(element, path, fades);
            path.pop();
        }
    }
}

/// Classify an interval as a fade, when it is one.
fn fade_direction(interval: &TimedInterval) -> Option<FadeDirection> {
    let first = *interval.values.first()?;
    let last = *interval.values.last()?;
    if last < first && last <= 0.1 {
        Some(FadeDirection::Out)
    } else if last > first && interval.start > 0 {
        Some(FadeDirection::In)
    } else {
        None
    }
}

/// Find every transition defect under the policy.
pub fn analyze(doc: &Document, policy: &TransitionPolicy) -> Vec<TransitionDefect> {
    let fades = extract_fades(doc);
    let mut defects = Vec::new();
    for (out_pos, fade_out) in fades.iter().enumerate() {
        if fade_out.direction != FadeDirection::Out {
            continue;
        }
        for fade_in in fades.iter().skip(out_pos + 1) {
            if fade_in.direction != FadeDirection::In {
                continue;
            }
            let gap = fade_in.interval.start - fade_out.interval.end;
            if gap < policy.minimum_overlap {
                let severity = if gap < -10 {
                    Severity::Critical
                } else {
                    Severity::High
                };
                defects.push(TransitionDefect {
                    kind: DefectKind::Overlap,
                    severity,
                    gap,
                    fade_out: fade_out.interval.clone(),
                    fade_in: fade_in.interval.clone(),
                    fade_in_tag: fade_in.node_tag.clone(),
                    fade_in_path: fade_in.path.clone(),
                });
            } else if gap > policy.maximum_gap {
                defects.push(TransitionDefect {
                    kind: DefectKind::DeadAir,
                    severity: Severity::Medium,
                    gap,
                    fade_out: fade_out.interval.clone(),
                    fade_in: fade_in.interval.clone(),
                    fade_in_tag: fade_in.node_tag.clone(),
                    fade_in_path: fade_in.path.clone(),
                });
            }
        }
    }
    defects
}

/// Render defects as diagnostics.
pub fn defects_to_diagnostics(
    defects: &[TransitionDefect],
    policy: &TransitionPolicy,
) -> Vec<Diagnostic> {
    defects
        .iter()
        .map(|defect| match defect.kind {
            DefectKind::Overlap => {
                let (start, end) = defect.recommended_range(policy);
                Diagnostic::new(
                    DiagnosticKind::TransitionOverlap,
                    defect.severity,
                    format!(
                        "fade-in on <{}> overlaps the preceding fade-out (gap {} frames)",
                        defect.fade_in_tag, defect.gap
                    ),
                )
                .with_fix(format!("shift fade-in input range to [{start}, {end}]"))
                .with_help("overlapping fades leave both layers semi-visible; content bleeds through")
            }
            DefectKind::DeadAir => Diagnostic::new(
                DiagnosticKind::TransitionGap,
                defect.severity,
                format!(
                    "dead air of {} frames before the fade-in on <{}>",
                    defect.gap, defect.fade_in_tag
                ),
            )
            .with_help("close the gap so the next layer starts fading while attention holds"),
        })
        .collect()
}

/// Repair overlap defects by shifting each fade-in forward, preserving
/// its duration.
///
/// Returns the diagnostics of the defects that were found (pre-repair)
/// and the change descriptions of the applied fixes. Defects are fixed in
/// document order, independently; dead-air defects are reported but not
/// auto-fixed.
pub fn apply_fixes(
    doc: &mut Document,
    policy: &TransitionPolicy,
) -> (Vec<Diagnostic>, Vec<String>) {
    let defects = analyze(doc, policy);
    let diagnostics = defects_to_diagnostics(&defects, policy);
    let mut changes = Vec::new();

    for defect in &defects {
        if defect.kind != DefectKind::Overlap {
            continue;
        }
        let (new_start, new_end) = defect.recommended_range(policy);
        let delta = new_start - defect.fade_in.start;
        if shift_fade_input(doc, &defect.fade_in_path, delta) {
            info!(
                node = defect.fade_in_tag,
                delta = delta;
                "Shifted fade-in input range"
            );
            changes.push(format!(
                "shifted fade-in on <{}> input range to [{new_start}, {new_end}]",
                defect.fade_in_tag
            ));
        }
    }
    (diagnostics, changes)
}

/// Shift the input range of the opacity transform at `path` by `delta`
/// frames, through the call structure.
fn shift_fade_input(doc: &mut Document, path: &NodePath, delta: i64) -> bool {
    let Some(node) = crate::select::node_at_path_mut(doc, path) else {
        return false;
    };
    let Some(AttrValue::Object(style)) = node.attributes_mut().get_mut(&Id::new(scena_core::document::STYLE_ATTR)) else {
        return false;
    };
    let Some(AttrValue::Expression(expr)) = style.get_mut(&Id::new("opacity")) else {
        return false;
    };
    let Some(call) = expr.call() else {
        return false;
    };
    let mut call = call.clone();
    let Some(CallArg::NumberList(inputs)) = call.args_mut().get_mut(1) else {
        return false;
    };
    for value in inputs.iter_mut() {
        *value += delta as f64;
    }
    let rendered = call.render();
    *expr = analyze_expression(&rendered);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::generate;

    /// A background fading out over [90, 120] while a title fades in
    /// over [100, 130]: twenty frames of double exposure.
    fn overlap_document() -> Document {
        scena_parser::parse(
            "<composition>\
               <background style={{opacity: interpolate(clock(), [90, 120], [1, 0])}}/>\
               <title style={{opacity: interpolate(clock(), [100, 130], [0, 1])}}/>\
             </composition>",
        )
        .unwrap()
    }

    #[test]
    fn test_extract_fades_directions() {
        let doc = overlap_document();
        let fades = extract_fades(&doc);
        assert_eq!(fades.len(), 2);
        assert_eq!(fades[0].direction, FadeDirection::Out);
        assert_eq!(fades[0].interval.start, 90);
        assert_eq!(fades[0].interval.end, 120);
        assert_eq!(fades[1].direction, FadeDirection::In);
        assert_eq!(fades[1].node_tag, "title");
    }

    #[test]
    fn test_fade_in_at_frame_zero_is_not_a_fade_in() {
        let doc = scena_parser::parse(
            "<composition><title style={{opacity: interpolate(clock(), [0, 30], [0, 1])}}/></composition>",
        )
        .unwrap();
        assert!(extract_fades(&doc).is_empty());
    }

    #[test]
    fn test_overlap_defect_reported_critical() {
        let doc = overlap_document();
        let defects = analyze(&doc, &TransitionPolicy::default());
        assert_eq!(defects.len(), 1);
        let defect = &defects[0];
        assert_eq!(defect.kind, DefectKind::Overlap);
        assert_eq!(defect.gap, -20);
        assert_eq!(defect.severity, Severity::Critical);
    }

    #[test]
    fn test_auto_fix_shifts_fade_in_preserving_duration() {
        let mut doc = overlap_document();
        let (diagnostics, changes) = apply_fixes(&mut doc, &TransitionPolicy::default());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind(), DiagnosticKind::TransitionOverlap);
        assert_eq!(
            diagnostics[0].suggested_fix(),
            Some("shift fade-in input range to [105, 135]")
        );
        assert_eq!(changes.len(), 1);

        let text = generate(&doc);
        assert!(text.contains("interpolate(clock(), [105, 135], [0, 1])"));
        // The fade-out is untouched.
        assert!(text.contains("interpolate(clock(), [90, 120], [1, 0])"));
        // The repaired document has no remaining overlap defects.
        assert!(analyze(&doc, &TransitionPolicy::default()).is_empty());
    }

    #[test]
    fn test_dead_air_reported_medium_and_not_fixed() {
        let mut doc = scena_parser::parse(
            "<composition>\
               <background style={{opacity: interpolate(clock(), [0, 30], [1, 0])}}/>\
               <title style={{opacity: interpolate(clock(), [100, 130], [0, 1])}}/>\
             </composition>",
        )
        .unwrap();
        let defects = analyze(&doc, &TransitionPolicy::default());
        assert_eq!(defects.len(), 1);
        assert_eq!(defects[0].kind, DefectKind::DeadAir);
        assert_eq!(defects[0].severity, Severity::Medium);
        assert_eq!(defects[0].gap, 70);

        let before = generate(&doc);
        let (_, changes) = apply_fixes(&mut doc, &TransitionPolicy::default());
        assert!(changes.is_empty());
        assert_eq!(generate(&doc), before);
    }

    #[test]
    fn test_acceptable_crossfade_has_no_defects() {
        let doc = scena_parser::parse(
            "<composition>\
               <background style={{opacity: interpolate(clock(), [90, 120], [1, 0])}}/>\
               <title style={{opacity: interpolate(clock(), [110, 140], [0, 1])}}/>\
             </composition>",
        )
        .unwrap();
        // Gap of -10 sits inside the allowed overlap band.
        assert!(analyze(&doc, &TransitionPolicy::default()).is_empty());
    }

    #[test]
    fn test_multiple_defects_fixed_in_document_order() {
        let mut doc = scena_parser::parse(
            "<composition>\
               <background style={{opacity: interpolate(clock(), [60, 90], [1, 0])}}/>\
               <caption style={{opacity: interpolate(clock(), [40, 70], [0, 1])}}/>\
               <title style={{opacity: interpolate(clock(), [50, 80], [0, 1])}}/>\
             </composition>",
        )
        .unwrap();
        let (diagnostics, changes) = apply_fixes(&mut doc, &TransitionPolicy::default());
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(changes.len(), 2);
        let text = generate(&doc);
        // Both fade-ins now start recommended_overlap before the fade-out end.
        assert!(text.contains("[75, 105]"));
    }
}
