//! Content richness scoring and automatic augmentation.
//!
//! The richness score is a 0–100 heuristic built from four independent
//! 0–25 sub-scores: large literal collections, meaningful numeric
//! density, background/foreground layering, and distinct custom
//! components. Documents scoring below the augmentation threshold get a
//! deterministic enrichment pass; documents that still score below the
//! acceptance threshold are flagged for non-automatic rework.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use scena_core::{
    document::{AttrValue, Child, Document, Node},
    identifier::Id,
};
use scena_parser::expression::analyze_expression;

/// Minimum element count for an array literal to count as a large
/// collection.
const LARGE_COLLECTION_MIN_LEN: usize = 5;
/// Collections needed for the maximum collections sub-score.
const COLLECTIONS_FOR_MAX: usize = 3;
/// Meaningful numeric literals needed for the maximum density sub-score.
const NUMERICS_FOR_MAX: usize = 50;
/// Distinct custom components needed for the maximum components sub-score.
const COMPONENTS_FOR_MAX: usize = 4;

/// Tags that ship with the composition language and do not count as
/// custom components.
const BUILTIN_TAGS: [&str; 11] = [
    "composition",
    "sequence",
    "group",
    "layer",
    "background",
    "overlay",
    "title",
    "text",
    "image",
    "rect",
    "clip",
];

/// Richness thresholds, tunable through configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RichnessConfig {
    /// Scores below this trigger automatic augmentation.
    pub augment_threshold: u8,
    /// Augmented scores below this are flagged for manual rework.
    pub accept_threshold: u8,
}

impl Default for RichnessConfig {
    fn default() -> Self {
        Self {
            augment_threshold: 40,
            accept_threshold: 60,
        }
    }
}

/// Classification bands over the total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RichnessBand {
    Basic,
    Moderate,
    Rich,
    Premium,
}

impl RichnessBand {
    /// Band for a total score.
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=39 => RichnessBand::Basic,
            40..=59 => RichnessBand::Moderate,
            60..=79 => RichnessBand::Rich,
            _ => RichnessBand::Premium,
        }
    }
}

/// The four independent sub-scores, each 0–25.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichnessBreakdown {
    /// Large literal collections.
    pub collections: u8,
    /// Meaningful numeric literal density.
    pub numeric_density: u8,
    /// Background/foreground layering components.
    pub layering: u8,
    /// Distinctly named custom components.
    pub components: u8,
}

impl RichnessBreakdown {
    /// Sum of the sub-scores, 0–100.
    pub fn total(&self) -> u8 {
        self.collections + self.numeric_density + self.layering + self.components
    }

    /// Band of the total score.
    pub fn band(&self) -> RichnessBand {
        RichnessBand::from_score(self.total())
    }
}

/// Score a document's content richness.
pub fn score(doc: &Document) -> RichnessBreakdown {
    let collections = count_large_collections(doc);
    let numerics = count_meaningful_numerics(doc);
    let (has_background, has_foreground) = detect_layering(doc);
    let components = count_custom_components(doc);

    let breakdown = RichnessBreakdown {
        collections: scaled(collections, COLLECTIONS_FOR_MAX),
        numeric_density: scaled(numerics, NUMERICS_FOR_MAX),
        layering: match (has_background, has_foreground) {
            (true, true) => 25,
            (true, false) | (false, true) => 12,
            (false, false) => 0,
        },
        components: scaled(components, COMPONENTS_FOR_MAX),
    };
    debug!(
        collections = collections,
        numerics = numerics,
        components = components,
        total = breakdown.total();
        "Scored document richness"
    );
    breakdown
}

/// The visual domain detected for augmentation data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Domain {
    Chart,
    Particles,
    Generic,
}

/// Deterministically enrich a document that scored below the augmentation
/// threshold, returning change descriptions.
///
/// Injects a background layer (when absent), a data-rich subtree keyed to
/// the detected domain, and additional visual-depth layers.
pub fn augment(doc: &mut Document, project_hint: Option<&str>) -> Vec<String> {
    let mut changes = Vec::new();
    let domain = detect_domain(doc, project_hint);
    info!(domain:? = domain; "Augmenting low-richness document");

    let (has_background, _) = detect_layering(doc);
    if !has_background {
        let background = Node::new(Id::new("background"))
            .with_attribute(Id::new("class"), AttrValue::Str("layer backdrop".into()))
            .with_attribute(
                Id::new("style"),
                style_object(&[("opacity", AttrValue::Number(0.92)), ("color", AttrValue::Str("#0b1622".into()))]),
            );
        doc.root_mut().children_mut().insert(0, Child::Element(background));
        changes.push("injected background layer <background class=\"layer backdrop\">".to_string());
    }

    let data_group = build_data_subtree(domain);
    doc.root_mut().push_child(Child::Element(data_group));
    changes.push(format!("injected {} data subtree", domain_name(domain)));

    for (class, opacity, scale) in [("depth far", 0.7, 1.08), ("depth near", 0.85, 0.96)] {
        let layer = Node::new(Id::new("layer"))
            .with_attribute(Id::new("class"), AttrValue::Str(class.into()))
            .with_attribute(
                Id::new("style"),
                style_object(&[
                    ("opacity", AttrValue::Number(opacity)),
                    ("scale", AttrValue::Number(scale)),
                ]),
            );
        doc.root_mut().push_child(Child::Element(layer));
        changes.push(format!("injected visual-depth layer <layer class=\"{class}\">"));
    }

    changes
}

fn domain_name(domain: Domain) -> &'static str {
    match domain {
        Domain::Chart => "chart",
        Domain::Particles => "particle",
        Domain::Generic => "generic",
    }
}

fn detect_domain(doc: &Document, project_hint: Option<&str>) -> Domain {
    let mut haystack = project_hint.unwrap_or_default().to_ascii_lowercase();
    doc.for_each_node(&mut |_, node| {
        haystack.push(' ');
        haystack.push_str(&node.tag().to_string().to_ascii_lowercase());
    });
    haystack.push(' ');
    haystack.push_str(&doc.root().text_content().to_ascii_lowercase());

    if ["chart", "graph", "metric", "dashboard"].iter().any(|k| haystack.contains(k)) {
        Domain::Chart
    } else if ["particle", "motion", "float", "starfield"].iter().any(|k| haystack.contains(k)) {
        Domain::Particles
    } else {
        Domain::Generic
    }
}

fn build_data_subtree(domain: Domain) -> Node {
    let mut group = Node::new(Id::new("group"))
        .with_attribute(Id::new("class"), AttrValue::Str("scene-data".into()));

    // Deterministic pseudo-varied sequences; no runtime randomness.
    let primary: Vec<f64> = (0..16).map(|i| (12 + (i * 37) % 53) as f64).collect();
    let secondary: Vec<f64> = (0..12).map(|i| (8 + (i * 23) % 41) as f64).collect();
    let tertiary: Vec<f64> = (0..8).map(|i| (3 + (i * 11) % 29) as f64).collect();

    let (names, consumer_tag): ([&str; 3], &str) = match domain {
        Domain::Chart => (["series", "baselines", "markers"], "bar-chart"),
        Domain::Particles => (["offsets", "sizes", "phases"], "particle-field"),
        Domain::Generic => (["dataset", "weights", "accents"], "series"),
    };

    for (name, values) in names.iter().zip([&primary, &secondary, &tertiary]) {
        group.push_child(Child::Declaration {
            name: Id::new(name),
            value: analyze_expression(&render_number_array(values)),
        });
    }

    let consumer = Node::new(Id::new(consumer_tag))
        .with_attribute(
            Id::new("values"),
            AttrValue::Expression(analyze_expression(names[0])),
        )
        .with_attribute(
            Id::new("weights"),
            AttrValue::Expression(analyze_expression(names[1])),
        )
        .with_attribute(
            Id::new("accents"),
            AttrValue::Expression(analyze_expression(names[2])),
        );
    group.push_child(Child::Element(consumer));
    group
}

fn render_number_array(values: &[f64]) -> String {
    let rendered: Vec<String> = values
        .iter()
        .map(|v| scena_core::document::format_number(*v))
        .collect();
    format!("[{}]", rendered.join(", "))
}

fn style_object(entries: &[(&str, AttrValue)]) -> AttrValue {
    let mut map = indexmap::IndexMap::new();
    for (key, value) in entries {
        map.insert(Id::normalized(key), value.clone());
    }
    AttrValue::Object(map)
}

fn scaled(count: usize, for_max: usize) -> u8 {
    (count.min(for_max) * 25 / for_max) as u8
}

fn count_large_collections(doc: &Document) -> usize {
    let mut count = 0;
    doc.for_each_expression(&mut |expr| {
        count += array_literals(expr.text())
            .iter()
            .filter(|len| **len >= LARGE_COLLECTION_MIN_LEN)
            .count();
    });
    count
}

/// Lengths of every array literal in expression text.
fn array_literals(text: &str) -> Vec<usize> {
    let chars: Vec<char> = text.chars().collect();
    let mut lengths = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '"' {
            i = skip_string(&chars, i);
            continue;
        }
        if chars[i] == '[' {
            let mut depth = 0usize;
            let mut elements = 1usize;
            let mut any_content = false;
            let mut j = i;
            while j < chars.len() {
                match chars[j] {
                    '"' => {
                        j = skip_string(&chars, j);
                        any_content = true;
                        continue;
                    }
                    '[' | '(' | '{' => depth += 1,
                    ')' | '}' => depth = depth.saturating_sub(1),
                    ']' => {
                        depth = depth.saturating_sub(1);
                        if depth == 0 {
                            break;
                        }
                    }
                    ',' if depth == 1 => elements += 1,
                    c if !c.is_whitespace() => any_content = true,
                    _ => {}
                }
                j += 1;
            }
            if any_content {
                lengths.push(elements);
            }
            i += 1;
            continue;
        }
        i += 1;
    }
    lengths
}

fn count_meaningful_numerics(doc: &Document) -> usize {
    let mut count = 0;
    let mut count_value = |value: f64| {
        if value != 0.0 && value.abs() != 1.0 {
            count += 1;
        }
    };

    let mut numbers: Vec<f64> = Vec::new();
    doc.for_each_node(&mut |_, node| {
        for value in node.attributes().values() {
            collect_numbers(value, &mut numbers);
        }
    });
    doc.for_each_expression(&mut |expr| {
        numbers.extend(numeric_literals(expr.text()));
    });
    for value in numbers {
        count_value(value);
    }
    count
}

fn collect_numbers(value: &AttrValue, out: &mut Vec<f64>) {
    match value {
        AttrValue::Number(n) => out.push(*n),
        AttrValue::Object(map) => {
            for nested in map.values() {
                collect_numbers(nested, out);
            }
        }
        _ => {}
    }
}

/// Numeric literal tokens in expression text.
fn numeric_literals(text: &str) -> Vec<f64> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '"' {
            i = skip_string(&chars, i);
        } else if c.is_ascii_alphabetic() || c == '_' {
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
        } else if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let token: String = chars[start..i].iter().collect();
            if let Ok(value) = token.parse::<f64>() {
                out.push(value);
            }
        } else {
            i += 1;
        }
    }
    out
}

fn skip_string(chars: &[char], start: usize) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '"' => return i + 1,
            _ => i += 1,
        }
    }
    i
}

fn detect_layering(doc: &Document) -> (bool, bool) {
    let mut has_background = false;
    let mut has_foreground = false;
    doc.for_each_node(&mut |_, node| {
        let tag = node.tag().to_string().to_ascii_lowercase();
        let class = node.class_attr().unwrap_or_default().to_ascii_lowercase();
        if tag.contains("background")
            || tag.contains("backdrop")
            || class.contains("background")
            || class.contains("backdrop")
        {
            has_background = true;
        }
        if tag.contains("overlay")
            || tag.contains("foreground")
            || class.contains("overlay")
            || class.contains("foreground")
        {
            has_foreground = true;
        }
    });
    (has_background, has_foreground)
}

fn count_custom_components(doc: &Document) -> usize {
    let mut seen: Vec<Id> = Vec::new();
    doc.for_each_node(&mut |_, node| {
        let tag = node.tag();
        let name = tag.to_string().to_ascii_lowercase();
        if !BUILTIN_TAGS.contains(&name.as_str()) && !seen.contains(&tag) {
            seen.push(tag);
        }
    });
    seen.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_document_scores_basic() {
        // Zero large collections, three numeric literals, no background
        // layer, one custom component.
        let doc = scena_parser::parse(
            "<composition><widget a={7} b={12} c={3}/></composition>",
        )
        .unwrap();
        let breakdown = score(&doc);
        assert_eq!(breakdown.collections, 0);
        assert_eq!(breakdown.numeric_density, 1);
        assert_eq!(breakdown.layering, 0);
        assert_eq!(breakdown.components, 6);
        assert!(breakdown.total() <= 10);
        assert_eq!(breakdown.band(), RichnessBand::Basic);
    }

    #[test]
    fn test_band_thresholds() {
        assert_eq!(RichnessBand::from_score(0), RichnessBand::Basic);
        assert_eq!(RichnessBand::from_score(39), RichnessBand::Basic);
        assert_eq!(RichnessBand::from_score(40), RichnessBand::Moderate);
        assert_eq!(RichnessBand::from_score(60), RichnessBand::Rich);
        assert_eq!(RichnessBand::from_score(80), RichnessBand::Premium);
        assert_eq!(RichnessBand::from_score(100), RichnessBand::Premium);
    }

    #[test]
    fn test_large_collections_counted() {
        let doc = scena_parser::parse(
            "<composition>{let a = [2, 3, 5, 8, 13]}{let b = [2, 3]}</composition>",
        )
        .unwrap();
        assert_eq!(count_large_collections(&doc), 1);
    }

    #[test]
    fn test_layering_detection() {
        let doc = scena_parser::parse(
            r#"<composition><background/><group class="overlay top"/></composition>"#,
        )
        .unwrap();
        assert_eq!(detect_layering(&doc), (true, true));
        assert_eq!(score(&doc).layering, 25);
    }

    #[test]
    fn test_meaningful_numerics_exclude_zero_and_one() {
        let doc = scena_parser::parse(
            "<composition>{let xs = [0, 1, 1, 7, 12]}<clip a={0} b={5}/></composition>",
        )
        .unwrap();
        assert_eq!(count_meaningful_numerics(&doc), 3);
    }

    #[test]
    fn test_augment_injects_background_and_rescores_above_forty() {
        let mut doc = scena_parser::parse(
            "<composition><widget a={7} b={12} c={3}/></composition>",
        )
        .unwrap();
        let before = score(&doc).total();
        assert!(before < 40);

        let changes = augment(&mut doc, None);
        assert!(changes.iter().any(|c| c.contains("background")));

        let after = score(&doc).total();
        assert!(after >= 40, "augmented score {after} should be at least 40");

        // The injected background is the first child.
        assert_eq!(doc.root().elements().next().unwrap().tag(), "background");
    }

    #[test]
    fn test_augment_is_domain_keyed() {
        let mut doc = scena_parser::parse(
            "<composition><widget a={7}/></composition>",
        )
        .unwrap();
        augment(&mut doc, Some("sales chart"));
        let text = crate::generate::generate(&doc);
        assert!(text.contains("bar-chart"));
        assert!(text.contains("{let series ="));
    }

    #[test]
    fn test_augment_keeps_document_parseable() {
        let mut doc = scena_parser::parse("<composition><widget/></composition>").unwrap();
        augment(&mut doc, None);
        let text = crate::generate::generate(&doc);
        let reparsed = scena_parser::parse(&text).expect("augmented document parses");
        assert_eq!(crate::generate::generate(&reparsed), text);
    }
}
