//! The selector engine: criteria-based queries over the document tree.
//!
//! A [`Criteria`] is a conjunction over tag name, id attribute, class
//! attribute, attribute presence, and descendant text content. Identity is
//! never derived from tree position. Results follow document (pre-order)
//! order, and repeated queries over the same tree return identical ordered
//! results.

use serde::{Deserialize, Serialize};

use scena_core::document::{Child, Document, Node};

/// Path of child-vector indices from the root to a node.
///
/// The empty path addresses the root itself.
pub(crate) type NodePath = Vec<usize>;

/// The selection DSL: a conjunction of optional predicates.
///
/// An empty criteria set matches nothing, by contract.
///
/// # Examples
///
/// ```
/// use scena::select::Criteria;
///
/// let criteria = Criteria::new().tag("background").class("layer");
/// assert!(!criteria.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Criteria {
    /// Exact tag-name match.
    pub tag: Option<String>,
    /// Exact match on the id-like attribute.
    pub id: Option<String>,
    /// Token or substring match on the class-like attribute.
    pub class: Option<String>,
    /// Substring match against concatenated descendant text.
    pub text_contains: Option<String>,
    /// Names of attributes that must be present.
    pub required_attrs: Vec<String>,
    /// Restrict the result to the nth structural match.
    pub index: Option<usize>,
}

impl Criteria {
    /// Create an empty criteria set (matches nothing).
    pub fn new() -> Self {
        Self::default()
    }

    /// Require an exact tag name.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Require an exact id attribute value.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Require a class token or substring.
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    /// Require a substring of the concatenated descendant text.
    pub fn text_contains(mut self, text: impl Into<String>) -> Self {
        self.text_contains = Some(text.into());
        self
    }

    /// Require the presence of a named attribute.
    pub fn required_attr(mut self, name: impl Into<String>) -> Self {
        self.required_attrs.push(name.into());
        self
    }

    /// Restrict to the nth structural match.
    pub fn index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// `true` when no predicate is set.
    pub fn is_empty(&self) -> bool {
        self.tag.is_none()
            && self.id.is_none()
            && self.class.is_none()
            && self.text_contains.is_none()
            && self.required_attrs.is_empty()
    }

    /// Whether a node satisfies every set predicate.
    pub fn matches(&self, node: &Node) -> bool {
        if self.is_empty() {
            return false;
        }
        if let Some(tag) = &self.tag {
            if node.tag() != tag.as_str() {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if node.id_attr() != Some(id.as_str()) {
                return false;
            }
        }
        if let Some(class) = &self.class {
            let Some(value) = node.class_attr() else {
                return false;
            };
            let token_match = value.split_whitespace().any(|token| token == class);
            if !token_match && !value.contains(class.as_str()) {
                return false;
            }
        }
        if let Some(text) = &self.text_contains {
            if !node.text_content().contains(text.as_str()) {
                return false;
            }
        }
        for name in &self.required_attrs {
            if node.attribute(name).is_none() {
                return false;
            }
        }
        true
    }
}

/// Select every node matching the criteria, in document order.
pub fn select<'d>(doc: &'d Document, criteria: &Criteria) -> Vec<&'d Node> {
    if criteria.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    collect(doc.root(), criteria, &mut out);
    apply_index(out, criteria.index)
}

/// Select by trying single-predicate strategies in a fixed fallback order:
/// id, then class, then tag, then text content.
///
/// The first strategy producing a non-empty result wins. The order is part
/// of the contract; callers rely on it for deterministic behavior.
pub fn select_fallback<'d>(doc: &'d Document, criteria: &Criteria) -> Vec<&'d Node> {
    let strategies = [
        criteria.id.clone().map(|id| Criteria::new().id(id)),
        criteria.class.clone().map(|class| Criteria::new().class(class)),
        criteria.tag.clone().map(|tag| Criteria::new().tag(tag)),
        criteria
            .text_contains
            .clone()
            .map(|text| Criteria::new().text_contains(text)),
    ];
    for strategy in strategies.into_iter().flatten() {
        let found = select(doc, &strategy);
        if !found.is_empty() {
            return apply_index(found, criteria.index);
        }
    }
    Vec::new()
}

/// Paths of every matching node, in document order.
pub(crate) fn matching_paths(doc: &Document, criteria: &Criteria) -> Vec<NodePath> {
    if criteria.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut path = Vec::new();
    collect_paths(doc.root(), criteria, &mut path, &mut out);
    match criteria.index {
        Some(index) => out.into_iter().skip(index).take(1).collect(),
        None => out,
    }
}

/// Resolve a path to its node, mutably.
pub(crate) fn node_at_path_mut<'d>(doc: &'d mut Document, path: &[usize]) -> Option<&'d mut Node> {
    let mut node = doc.root_mut();
    for &index in path {
        match node.children_mut().get_mut(index) {
            Some(Child::Element(element)) => node = element,
            _ => return None,
        }
    }
    Some(node)
}

fn apply_index(found: Vec<&Node>, index: Option<usize>) -> Vec<&Node> {
    match index {
        Some(index) => found.into_iter().skip(index).take(1).collect(),
        None => found,
    }
}

fn collect<'d>(node: &'d Node, criteria: &Criteria, out: &mut Vec<&'d Node>) {
    if criteria.matches(node) {
        out.push(node);
    }
    for child in node.elements() {
        collect(child, criteria, out);
    }
}

fn collect_paths(
    node: &Node,
    criteria: &Criteria,
    path: &mut NodePath,
    out: &mut Vec<NodePath>,
) {
    if criteria.matches(node) {
        out.push(path.clone());
    }
    for (index, child) in node.children().iter().enumerate() {
        if let Child::Element(element) = child {
            path.push(index);
            collect_paths(element, criteria, path, out);
            path.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        scena_parser::parse(
            r#"
            <composition>
              <background id="bg" class="layer base"><title>Opening</title></background>
              <group class="content">
                <title class="headline">Launch day</title>
                <title class="headline sub">Details</title>
              </group>
              <overlay id="fg" class="layer top"/>
            </composition>
            "#,
        )
        .expect("sample document parses")
    }

    #[test]
    fn test_empty_criteria_matches_nothing() {
        let doc = sample();
        assert!(select(&doc, &Criteria::new()).is_empty());
    }

    #[test]
    fn test_select_by_tag_in_document_order() {
        let doc = sample();
        let titles = select(&doc, &Criteria::new().tag("title"));
        assert_eq!(titles.len(), 3);
        assert_eq!(titles[0].text_content(), "Opening");
        assert_eq!(titles[1].text_content(), "Launch day");
        assert_eq!(titles[2].text_content(), "Details");
    }

    #[test]
    fn test_select_by_id_is_exact() {
        let doc = sample();
        let found = select(&doc, &Criteria::new().id("bg"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tag(), "background");
        assert!(select(&doc, &Criteria::new().id("b")).is_empty());
    }

    #[test]
    fn test_select_by_class_token_and_substring() {
        let doc = sample();
        // Token match
        assert_eq!(select(&doc, &Criteria::new().class("layer")).len(), 2);
        // Substring match
        assert_eq!(select(&doc, &Criteria::new().class("head")).len(), 2);
    }

    #[test]
    fn test_select_conjunction() {
        let doc = sample();
        let found = select(&doc, &Criteria::new().tag("title").class("sub"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text_content(), "Details");
    }

    #[test]
    fn test_select_by_text_content() {
        let doc = sample();
        let found = select(&doc, &Criteria::new().text_contains("Launch"));
        // Ancestors containing the text match too, in document order
        assert_eq!(found[found.len() - 1].tag(), "title");
        assert_eq!(found[0].tag(), "composition");
    }

    #[test]
    fn test_select_with_index() {
        let doc = sample();
        let found = select(&doc, &Criteria::new().tag("title").index(1));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text_content(), "Launch day");
    }

    #[test]
    fn test_required_attrs() {
        let doc = sample();
        let found = select(&doc, &Criteria::new().tag("overlay").required_attr("id"));
        assert_eq!(found.len(), 1);
        assert!(
            select(&doc, &Criteria::new().tag("overlay").required_attr("missing")).is_empty()
        );
    }

    #[test]
    fn test_fallback_order_prefers_id() {
        let doc = sample();
        // Both id and tag are set; id resolves first even though the tag
        // would match a different node set.
        let criteria = Criteria::new().id("fg").tag("title");
        let found = select_fallback(&doc, &criteria);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tag(), "overlay");
    }

    #[test]
    fn test_fallback_moves_past_empty_strategies() {
        let doc = sample();
        let criteria = Criteria::new().id("nope").class("nope").tag("group");
        let found = select_fallback(&doc, &criteria);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tag(), "group");
    }

    #[test]
    fn test_matching_paths_resolve() {
        let mut doc = sample();
        let paths = matching_paths(&doc, &Criteria::new().tag("title"));
        assert_eq!(paths.len(), 3);
        for path in &paths {
            let node = node_at_path_mut(&mut doc, path).expect("path resolves");
            assert_eq!(node.tag(), "title");
        }
    }

    mod proptest_tests {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn select_is_deterministic(tag in "[a-z]{1,8}") {
                let doc = sample();
                let criteria = Criteria::new().tag(tag);
                let first: Vec<String> =
                    select(&doc, &criteria).iter().map(|n| n.text_content()).collect();
                let second: Vec<String> =
                    select(&doc, &criteria).iter().map(|n| n.text_content()).collect();
                prop_assert_eq!(first, second);
            }
        }
    }
}
