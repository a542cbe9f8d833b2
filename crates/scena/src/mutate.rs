//! The mutation engine: pure tree-in, tree-out edit operations.
//!
//! Every operation takes a selector, applies the edit through the typed
//! tree (never through text substitution), and returns a
//! [`MutationReport`] describing what changed. A selector matching nothing
//! yields a [`MutationOutcome::NotFound`] result, not an error; a selector
//! matching several nodes mutates **all** of them and reports a warning
//! with the match count, to support bulk edits.

use log::debug;
use serde::{Deserialize, Serialize};

use scena_core::{
    document::{AttrValue, Child, Document, Node},
    identifier::Id,
};

use crate::select::{Criteria, matching_paths, node_at_path_mut};

/// Whether a mutation found anything to edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationOutcome {
    /// The edit was applied to `count` nodes.
    Applied { count: usize },
    /// The selector matched nothing; the tree is unchanged.
    NotFound,
}

/// The result of one mutation operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationReport {
    /// Whether and how widely the edit applied.
    pub outcome: MutationOutcome,
    /// Human-readable descriptions of each change.
    pub changes: Vec<String>,
    /// Advisories, including the multi-match warning.
    pub warnings: Vec<String>,
}

impl MutationReport {
    fn not_found(criteria: &Criteria) -> Self {
        Self {
            outcome: MutationOutcome::NotFound,
            changes: Vec::new(),
            warnings: vec![format!("no element matches selector {criteria:?}")],
        }
    }

    fn applied(count: usize, changes: Vec<String>, mut warnings: Vec<String>) -> Self {
        if count > 1 {
            warnings.push(format!("{count} elements matched; mutated all of them"));
        }
        Self {
            outcome: MutationOutcome::Applied { count },
            changes,
            warnings,
        }
    }

    /// `true` when the edit applied to at least one node.
    pub fn is_applied(&self) -> bool {
        matches!(self.outcome, MutationOutcome::Applied { .. })
    }
}

/// Where to insert a new child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertPosition {
    Start,
    End,
    At(usize),
}

/// Replace or append an attribute on every matching node.
pub fn set_attribute(
    doc: &mut Document,
    criteria: &Criteria,
    name: &str,
    value: AttrValue,
) -> MutationReport {
    let paths = matching_paths(doc, criteria);
    if paths.is_empty() {
        return MutationReport::not_found(criteria);
    }
    let mut changes = Vec::new();
    for path in &paths {
        if let Some(node) = node_at_path_mut(doc, path) {
            node.set_attribute(Id::new(name), value.clone());
            changes.push(format!("set attribute `{name}` on <{}>", node.tag()));
        }
    }
    debug!(attr = name, count = paths.len(); "Applied set_attribute");
    MutationReport::applied(paths.len(), changes, Vec::new())
}

/// Merge style properties into every matching node.
///
/// Existing keys are replaced in place, new keys are appended, and
/// unrelated existing properties are never dropped. Keys are normalized to
/// the style key space.
pub fn merge_style(
    doc: &mut Document,
    criteria: &Criteria,
    updates: &[(String, AttrValue)],
) -> MutationReport {
    let paths = matching_paths(doc, criteria);
    if paths.is_empty() {
        return MutationReport::not_found(criteria);
    }
    let mut changes = Vec::new();
    for path in &paths {
        if let Some(node) = node_at_path_mut(doc, path) {
            let tag = node.tag();
            let style = match node.attributes_mut().entry(Id::new(scena_core::document::STYLE_ATTR)) {
                indexmap::map::Entry::Occupied(entry) => entry.into_mut(),
                indexmap::map::Entry::Vacant(entry) => {
                    entry.insert(AttrValue::Object(indexmap::IndexMap::new()))
                }
            };
            if !matches!(style, AttrValue::Object(_)) {
                // A non-object style attribute is rebuilt as an object.
                *style = AttrValue::Object(indexmap::IndexMap::new());
            }
            if let AttrValue::Object(map) = style {
                for (key, value) in updates {
                    map.insert(Id::normalized(key), value.clone());
                    changes.push(format!("merged style `{key}` on <{tag}>"));
                }
            }
        }
    }
    MutationReport::applied(paths.len(), changes, Vec::new())
}

/// Replace the direct text of every matching node.
///
/// All direct text-run children are removed; a non-empty replacement is
/// prepended as a single new text run.
pub fn set_text(doc: &mut Document, criteria: &Criteria, text: &str) -> MutationReport {
    let paths = matching_paths(doc, criteria);
    if paths.is_empty() {
        return MutationReport::not_found(criteria);
    }
    let mut changes = Vec::new();
    for path in &paths {
        if let Some(node) = node_at_path_mut(doc, path) {
            node.children_mut().retain(|child| !matches!(child, Child::Text(_)));
            if !text.is_empty() {
                node.children_mut().insert(0, Child::Text(text.to_string()));
            }
            changes.push(format!("replaced text of <{}>", node.tag()));
        }
    }
    MutationReport::applied(paths.len(), changes, Vec::new())
}

/// Insert a child node into every matching parent.
pub fn insert_child(
    doc: &mut Document,
    criteria: &Criteria,
    new_node: Node,
    position: InsertPosition,
) -> MutationReport {
    let paths = matching_paths(doc, criteria);
    if paths.is_empty() {
        return MutationReport::not_found(criteria);
    }
    let mut changes = Vec::new();
    for path in &paths {
        if let Some(parent) = node_at_path_mut(doc, path) {
            let len = parent.children().len();
            let at = match position {
                InsertPosition::Start => 0,
                InsertPosition::End => len,
                InsertPosition::At(index) => index.min(len),
            };
            changes.push(format!(
                "inserted <{}> into <{}> at position {at}",
                new_node.tag(),
                parent.tag()
            ));
            parent.children_mut().insert(at, Child::Element(new_node.clone()));
        }
    }
    MutationReport::applied(paths.len(), changes, Vec::new())
}

/// Remove a matching node from its parent.
///
/// With `index`, only the nth structural match is removed; otherwise the
/// first. The root element cannot be removed.
pub fn remove_child(
    doc: &mut Document,
    criteria: &Criteria,
    index: Option<usize>,
) -> MutationReport {
    let paths = matching_paths(doc, criteria);
    let Some(path) = paths.get(index.unwrap_or(0)) else {
        return MutationReport::not_found(criteria);
    };
    let Some((&child_index, parent_path)) = path.split_last() else {
        return MutationReport {
            outcome: MutationOutcome::NotFound,
            changes: Vec::new(),
            warnings: vec!["the root element cannot be removed".to_string()],
        };
    };
    let Some(parent) = node_at_path_mut(doc, parent_path) else {
        return MutationReport::not_found(criteria);
    };
    let removed = parent.children_mut().remove(child_index);
    let description = match &removed {
        Child::Element(node) => format!("removed <{}> from <{}>", node.tag(), parent.tag()),
        _ => format!("removed child {child_index} from <{}>", parent.tag()),
    };
    MutationReport::applied(1, vec![description], Vec::new())
}

/// Replace the first matching node with a new one.
pub fn replace_child(doc: &mut Document, criteria: &Criteria, new_node: Node) -> MutationReport {
    let paths = matching_paths(doc, criteria);
    let Some(path) = paths.first() else {
        return MutationReport::not_found(criteria);
    };
    let description;
    if let Some((&child_index, parent_path)) = path.split_last() {
        let Some(parent) = node_at_path_mut(doc, parent_path) else {
            return MutationReport::not_found(criteria);
        };
        description = format!("replaced child of <{}> with <{}>", parent.tag(), new_node.tag());
        parent.children_mut()[child_index] = Child::Element(new_node);
    } else {
        description = format!("replaced the root element with <{}>", new_node.tag());
        *doc.root_mut() = new_node;
    }
    MutationReport::applied(1, vec![description], Vec::new())
}

/// Build a node from a flat parameter map.
///
/// The attribute variant is inferred from each value's runtime type; a
/// boolean `true` regenerates as a valueless flag attribute.
pub fn synthesize_node(
    tag: &str,
    props: Vec<(String, AttrValue)>,
    children: Vec<Child>,
) -> Node {
    let mut node = Node::new(Id::new(tag));
    for (name, value) in props {
        node.set_attribute(Id::new(&name), value);
    }
    for child in children {
        node.push_child(child);
    }
    node
}

/// Thresholds for the targeted-edit-versus-replacement heuristic.
///
/// The cutoffs are tunable, not load-bearing; only the behavior contract
/// (attempt a targeted edit, fall back to full replacement on structural
/// mismatch) is fixed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdatePolicy {
    /// Maximum allowed difference in element counts.
    pub max_component_delta: usize,
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        Self {
            max_component_delta: 2,
        }
    }
}

/// How an updated document should be applied over the original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePlan {
    /// The structures are close enough for targeted edits.
    Targeted,
    /// The structures diverge; replace the document wholesale.
    FullReplacement,
}

/// Decide between a targeted edit and a full replacement by comparing
/// structural similarity of the old and new documents.
pub fn plan_update(original: &Document, updated: &Document, policy: &UpdatePolicy) -> UpdatePlan {
    if original.root().tag() != updated.root().tag() {
        return UpdatePlan::FullReplacement;
    }
    let delta = original.node_count().abs_diff(updated.node_count());
    if delta > policy.max_component_delta {
        return UpdatePlan::FullReplacement;
    }
    // Every direct child tag of the original root must survive in the
    // update, as a multiset.
    let mut updated_tags: Vec<Id> = updated.root().elements().map(Node::tag).collect();
    for tag in original.root().elements().map(Node::tag) {
        match updated_tags.iter().position(|t| *t == tag) {
            Some(found) => {
                updated_tags.swap_remove(found);
            }
            None => return UpdatePlan::FullReplacement,
        }
    }
    UpdatePlan::Targeted
}
