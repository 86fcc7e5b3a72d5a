//! Virtual nodes
//!
//! A render function produces a tree of [`VNode`]s describing the desired DOM.
//! Trees are handed to the patch collaborator behind an `Rc` and are never
//! mutated afterwards; every render produces a fresh tree.

use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;

use crate::constructor::ConstructorId;
use crate::options::{Listener, StateMap};

/// Static attribute map of an element node
pub type Attrs = IndexMap<String, String>;

/// A node in a virtual tree
#[derive(Clone, Debug)]
pub enum VNode {
    Element(VElement),
    Text(String),
    /// Placeholder for "nothing rendered here"
    Comment(String),
    /// A child component occurrence, instantiated by the patch collaborator
    Component(VComponent),
}

/// An element node
#[derive(Clone, Debug, Default)]
pub struct VElement {
    pub tag: String,
    pub attrs: Attrs,
    pub children: Vec<VNode>,
}

/// A component placeholder node
#[derive(Clone)]
pub struct VComponent {
    /// Tag the component was referenced by in the parent's render output
    pub tag: String,
    pub ctor: ConstructorId,
    pub props: StateMap,
    pub listeners: IndexMap<String, Listener>,
    /// Content passed between the component's tags (its default slot)
    pub children: Vec<VNode>,
}

impl fmt::Debug for VComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VComponent")
            .field("tag", &self.tag)
            .field("ctor", &self.ctor)
            .field("props", &self.props)
            .field("listeners", &self.listeners.keys().collect::<Vec<_>>())
            .field("children", &self.children)
            .finish()
    }
}

impl VNode {
    /// Create an element node
    pub fn element(tag: impl Into<String>) -> Self {
        VNode::Element(VElement {
            tag: tag.into(),
            ..Default::default()
        })
    }

    /// Create a text node
    pub fn text(text: impl Into<String>) -> Self {
        VNode::Text(text.into())
    }

    /// Create an empty placeholder node
    pub fn empty() -> Self {
        VNode::Comment(String::new())
    }

    /// Create a component placeholder node
    pub fn component(tag: impl Into<String>, ctor: ConstructorId) -> Self {
        VNode::Component(VComponent {
            tag: tag.into(),
            ctor,
            props: StateMap::new(),
            listeners: IndexMap::new(),
            children: Vec::new(),
        })
    }

    /// Set an attribute (elements) or a prop (components)
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        match &mut self {
            VNode::Element(el) => {
                el.attrs.insert(name.into(), value.into());
            }
            VNode::Component(c) => {
                c.props.insert(name.into(), Value::String(value.into()));
            }
            _ => {}
        }
        self
    }

    /// Set a prop value on a component node
    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        if let VNode::Component(c) = &mut self {
            c.props.insert(name.into(), value.into());
        }
        self
    }

    /// Append a child node
    pub fn child(mut self, child: VNode) -> Self {
        match &mut self {
            VNode::Element(el) => el.children.push(child),
            VNode::Component(c) => c.children.push(child),
            _ => {}
        }
        self
    }

    /// Append several child nodes
    pub fn children(mut self, children: impl IntoIterator<Item = VNode>) -> Self {
        for child in children {
            self = self.child(child);
        }
        self
    }

    /// Tag of element and component nodes
    pub fn tag(&self) -> Option<&str> {
        match self {
            VNode::Element(el) => Some(&el.tag),
            VNode::Component(c) => Some(&c.tag),
            _ => None,
        }
    }

    /// Concatenated text content of the subtree (component subtrees excluded)
    pub fn text_content(&self) -> String {
        match self {
            VNode::Text(t) => t.clone(),
            VNode::Element(el) => el.children.iter().map(VNode::text_content).collect(),
            VNode::Comment(_) | VNode::Component(_) => String::new(),
        }
    }
}

/// Render a value the way interpolation displays it
///
/// Strings render without quotes, `null` renders as the empty string, and
/// arrays / objects render as pretty-printed JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string_pretty(value).unwrap_or_default()
        }
    }
}
