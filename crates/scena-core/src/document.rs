//! The composition document tree model.
//!
//! A [`Document`] owns exactly one root [`Node`]. Nodes carry an interned
//! tag, insertion-ordered attributes, and an ordered child sequence of
//! nested elements, literal text runs, expression containers, and
//! declarations. Attribute order affects regenerated text but not
//! semantics; child order is the stable structural position used for
//! deterministic re-serialization.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::identifier::Id;

/// Conventional name of the style attribute.
pub const STYLE_ATTR: &str = "style";
/// Conventional name of the id-like attribute used for selection.
pub const ID_ATTR: &str = "id";
/// Conventional name of the class-like attribute used for selection.
pub const CLASS_ATTR: &str = "class";

/// Format a numeric literal the way the generator emits it.
///
/// Integral values print without a fractional part (`40`, not `40.0`).
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// A composition document: the root of one element tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    root: Node,
}

impl Document {
    /// Create a document from its single root node.
    pub fn new(root: Node) -> Self {
        Self { root }
    }

    /// Borrow the root node.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Mutably borrow the root node.
    pub fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    /// Visit every element node in document (pre-order) order.
    ///
    /// The callback receives each node's pre-order ordinal, starting at 0
    /// for the root.
    pub fn for_each_node(&self, f: &mut impl FnMut(usize, &Node)) {
        fn walk(node: &Node, next: &mut usize, f: &mut impl FnMut(usize, &Node)) {
            f(*next, node);
            *next += 1;
            for child in node.children() {
                if let Child::Element(element) = child {
                    walk(element, next, f);
                }
            }
        }
        let mut next = 0;
        walk(&self.root, &mut next, f);
    }

    /// Total number of element nodes in the document.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.for_each_node(&mut |_, _| count += 1);
        count
    }

    /// Visit every expression container in the document, including
    /// attribute values, object-literal values, declarations, and
    /// expression children, in document order.
    pub fn for_each_expression(&self, f: &mut impl FnMut(&Expression)) {
        fn walk_value(value: &AttrValue, f: &mut impl FnMut(&Expression)) {
            match value {
                AttrValue::Expression(expr) => f(expr),
                AttrValue::Object(map) => {
                    for nested in map.values() {
                        walk_value(nested, f);
                    }
                }
                _ => {}
            }
        }
        fn walk(node: &Node, f: &mut impl FnMut(&Expression)) {
            for value in node.attributes().values() {
                walk_value(value, f);
            }
            for child in node.children() {
                match child {
                    Child::Element(element) => walk(element, f),
                    Child::Expression(expr) => f(expr),
                    Child::Declaration { value, .. } => f(value),
                    Child::Text(_) => {}
                }
            }
        }
        walk(&self.root, f);
    }
}

/// One entry in a node's ordered child sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Child {
    /// A nested element.
    Element(Node),
    /// A literal text run.
    Text(String),
    /// An inline expression container `{expr}`.
    Expression(Expression),
    /// A declaration `{let name = expr}` binding `name` in the enclosing
    /// element's subtree.
    Declaration {
        name: Id,
        value: Expression,
    },
}

/// An element of the composition tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    tag: Id,
    attributes: IndexMap<Id, AttrValue>,
    children: Vec<Child>,
}

impl Node {
    /// Create an element with the given tag and no attributes or children.
    pub fn new(tag: impl Into<Id>) -> Self {
        Self {
            tag: tag.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// The element's tag.
    pub fn tag(&self) -> Id {
        self.tag
    }

    /// The insertion-ordered attribute map.
    pub fn attributes(&self) -> &IndexMap<Id, AttrValue> {
        &self.attributes
    }

    /// Mutable access to the attribute map.
    pub fn attributes_mut(&mut self) -> &mut IndexMap<Id, AttrValue> {
        &mut self.attributes
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(&Id::new(name))
    }

    /// Replace an existing attribute or append a new one.
    ///
    /// Replacement keeps the attribute's original position; appends go to
    /// the end of the map, matching regenerated text order.
    pub fn set_attribute(&mut self, name: impl Into<Id>, value: AttrValue) {
        self.attributes.insert(name.into(), value);
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, name: impl Into<Id>, value: AttrValue) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// The ordered child sequence.
    pub fn children(&self) -> &[Child] {
        &self.children
    }

    /// Mutable access to the child sequence.
    pub fn children_mut(&mut self) -> &mut Vec<Child> {
        &mut self.children
    }

    /// Append a child.
    pub fn push_child(&mut self, child: Child) {
        self.children.push(child);
    }

    /// Builder-style child appender.
    pub fn with_child(mut self, child: Child) -> Self {
        self.push_child(child);
        self
    }

    /// The element's id-like attribute, when present as a string literal.
    pub fn id_attr(&self) -> Option<&str> {
        self.attribute(ID_ATTR).and_then(AttrValue::as_str)
    }

    /// The element's class-like attribute, when present as a string literal.
    pub fn class_attr(&self) -> Option<&str> {
        self.attribute(CLASS_ATTR).and_then(AttrValue::as_str)
    }

    /// The style object, when present.
    pub fn style(&self) -> Option<&IndexMap<Id, AttrValue>> {
        match self.attribute(STYLE_ATTR) {
            Some(AttrValue::Object(map)) => Some(map),
            _ => None,
        }
    }

    /// Concatenated text content of this subtree, in document order,
    /// separated by single spaces.
    pub fn text_content(&self) -> String {
        let mut parts = Vec::new();
        fn collect(node: &Node, parts: &mut Vec<String>) {
            for child in node.children() {
                match child {
                    Child::Text(text) => {
                        let trimmed = text.trim();
                        if !trimmed.is_empty() {
                            parts.push(trimmed.to_string());
                        }
                    }
                    Child::Element(element) => collect(element, parts),
                    _ => {}
                }
            }
        }
        collect(self, &mut parts);
        parts.join(" ")
    }

    /// Direct element children.
    pub fn elements(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().filter_map(|child| match child {
            Child::Element(element) => Some(element),
            _ => None,
        })
    }
}

/// A typed attribute value, decided once at construction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    /// A quoted string literal.
    Str(String),
    /// A numeric literal.
    Number(f64),
    /// A boolean literal; `true` serializes as a valueless flag attribute.
    Bool(bool),
    /// An object literal with normalized (lower-cased) keys.
    Object(IndexMap<Id, AttrValue>),
    /// An opaque expression container.
    Expression(Expression),
}

impl AttrValue {
    /// Borrow the string literal, if this value is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get the numeric literal, if this value is one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the boolean literal, if this value is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow the object literal, if this value is one.
    pub fn as_object(&self) -> Option<&IndexMap<Id, AttrValue>> {
        match self {
            AttrValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Borrow the expression container, if this value is one.
    pub fn as_expression(&self) -> Option<&Expression> {
        match self {
            AttrValue::Expression(expr) => Some(expr),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Number(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Number(value as f64)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

/// An opaque embedded expression plus its derived analysis.
///
/// The referenced-identifier set feeds reference-completeness validation;
/// the call signature, when the whole expression is a single recognized
/// call, feeds timing validation and transition rewriting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    text: String,
    referenced: Vec<Id>,
    call: Option<CallSignature>,
}

impl Expression {
    /// Create an expression with no derived analysis.
    pub fn opaque(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            referenced: Vec::new(),
            call: None,
        }
    }

    /// Create an expression with a derived identifier set and optional
    /// parsed call signature.
    pub fn with_analysis(
        text: impl Into<String>,
        referenced: Vec<Id>,
        call: Option<CallSignature>,
    ) -> Self {
        Self {
            text: text.into(),
            referenced,
            call,
        }
    }

    /// The raw expression text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Identifiers referenced by this expression, in first-occurrence order.
    pub fn referenced(&self) -> &[Id] {
        &self.referenced
    }

    /// The parsed call signature, when the expression is a single
    /// recognized call.
    pub fn call(&self) -> Option<&CallSignature> {
        self.call.as_ref()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// A parsed call signature: a (possibly dotted) function name plus ordered
/// arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSignature {
    name: String,
    args: Vec<CallArg>,
}

impl CallSignature {
    /// Create a call signature.
    pub fn new(name: impl Into<String>, args: Vec<CallArg>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// The full (possibly dotted) callee name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The final segment of the callee name (`push` for `items.push`).
    pub fn base_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// The ordered arguments.
    pub fn args(&self) -> &[CallArg] {
        &self.args
    }

    /// Mutable access to the arguments, for structural rewrites.
    pub fn args_mut(&mut self) -> &mut Vec<CallArg> {
        &mut self.args
    }

    /// Re-render the call as expression text.
    pub fn render(&self) -> String {
        let args: Vec<String> = self.args.iter().map(CallArg::render).collect();
        format!("{}({})", self.name, args.join(", "))
    }
}

/// One argument of a recognized call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CallArg {
    /// A numeric literal.
    Number(f64),
    /// An array of numeric literals, e.g. an input or output range.
    NumberList(Vec<f64>),
    /// An object literal, stored as ordered key/raw-value-text pairs.
    Object(Vec<(Id, String)>),
    /// Any other argument, kept verbatim.
    Raw(String),
}

impl CallArg {
    /// Re-render the argument as expression text.
    pub fn render(&self) -> String {
        match self {
            CallArg::Number(n) => format_number(*n),
            CallArg::NumberList(values) => {
                let rendered: Vec<String> = values.iter().map(|v| format_number(*v)).collect();
                format!("[{}]", rendered.join(", "))
            }
            CallArg::Object(pairs) => {
                let rendered: Vec<String> = pairs
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key, value))
                    .collect();
                format!("{{ {} }}", rendered.join(", "))
            }
            CallArg::Raw(text) => text.clone(),
        }
    }
}
