//! In-memory document
//!
//! An arena of element / text / comment nodes rooted at an
//! `<html><head></head><body></body></html>` skeleton.

use html_escape::{encode_double_quoted_attribute, encode_text};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use vireo_core::{CompileError, Host, InstanceId, NodeId, PatchError};

use crate::compiler::parser::{self, is_void, ParseOptions};

#[derive(Clone, Debug)]
enum NodeKind {
    Element { tag: String, attrs: IndexMap<String, String> },
    Text(String),
    Comment(String),
}

#[derive(Clone, Debug)]
struct DomNode {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// In-memory host document
pub struct Document {
    nodes: SlotMap<NodeId, DomNode>,
    owners: FxHashMap<NodeId, InstanceId>,
    html: NodeId,
    head: NodeId,
    body: NodeId,
}

impl Document {
    pub fn new() -> Self {
        let mut document = Self {
            nodes: SlotMap::with_key(),
            owners: FxHashMap::default(),
            html: NodeId::default(),
            head: NodeId::default(),
            body: NodeId::default(),
        };
        document.html = document.insert(element_kind("html"));
        document.head = document.insert(element_kind("head"));
        document.body = document.insert(element_kind("body"));
        document.link(document.html, document.head);
        document.link(document.html, document.body);
        document
    }

    /// Document whose `<body>` holds `markup`
    pub fn with_body(markup: &str) -> Result<Self, CompileError> {
        let mut document = Self::new();
        let body = document.body;
        document.append_markup(body, markup)?;
        Ok(document)
    }

    pub fn html(&self) -> NodeId {
        self.html
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Parse `markup` and append the resulting nodes to `parent`
    pub fn append_markup(&mut self, parent: NodeId, markup: &str) -> Result<Vec<NodeId>, CompileError> {
        let nodes = parser::parse(
            markup,
            ParseOptions {
                decode_newlines: true,
                comments: true,
            },
        )
        .map_err(|errors| CompileError { errors })?;

        let mut appended = Vec::with_capacity(nodes.len());
        for node in &nodes {
            let id = self.build(node);
            self.link(parent, id);
            appended.push(id);
        }
        Ok(appended)
    }

    fn build(&mut self, node: &parser::Node) -> NodeId {
        match node {
            parser::Node::Element(element) => {
                let id = self.insert(NodeKind::Element {
                    tag: element.tag.clone(),
                    attrs: element.attrs.iter().cloned().collect(),
                });
                for child in &element.children {
                    let child = self.build(child);
                    self.link(id, child);
                }
                id
            }
            parser::Node::Text(text) => self.insert(NodeKind::Text(text.clone())),
            parser::Node::Comment(text) => self.insert(NodeKind::Comment(text.clone())),
        }
    }

    fn insert(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.insert(DomNode {
            kind,
            parent: None,
            children: Vec::new(),
        })
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(child);
        }
    }

    fn unlink(&mut self, node: NodeId) {
        let Some(parent) = self.nodes.get_mut(node).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(parent) = self.nodes.get_mut(parent) {
            parent.children.retain(|child| *child != node);
        }
    }

    fn drop_subtree(&mut self, node: NodeId) {
        let Some(removed) = self.nodes.remove(node) else {
            return;
        };
        self.owners.remove(&node);
        for child in removed.children {
            self.drop_subtree(child);
        }
    }

    /// Number of live nodes, detached ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Value of attribute `name` on element `node`
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes.get(node)?.kind {
            NodeKind::Element { attrs, .. } => attrs.get(name).map(String::as_str),
            _ => None,
        }
    }

    /// Concatenated text of the subtree
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let Some(dom) = self.nodes.get(node) else {
            return;
        };
        match &dom.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Comment(_) => {}
            NodeKind::Element { .. } => {
                for child in &dom.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Document-order walk below `from`
    fn find(&self, from: NodeId, predicate: &dyn Fn(&DomNode) -> bool) -> Option<NodeId> {
        let node = self.nodes.get(from)?;
        if predicate(node) {
            return Some(from);
        }
        node.children.iter().find_map(|child| self.find(*child, predicate))
    }

    fn serialize(&self, node: NodeId, out: &mut String) {
        let Some(dom) = self.nodes.get(node) else {
            return;
        };
        match &dom.kind {
            NodeKind::Text(text) => out.push_str(&encode_text(text)),
            NodeKind::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeKind::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&encode_double_quoted_attribute(value));
                    out.push('"');
                }
                out.push('>');
                if is_void(tag) {
                    return;
                }
                for child in &dom.children {
                    self.serialize(*child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

fn element_kind(tag: &str) -> NodeKind {
    NodeKind::Element {
        tag: tag.to_string(),
        attrs: IndexMap::new(),
    }
}

impl Host for Document {
    fn query(&self, selector: &str) -> Option<NodeId> {
        let selector = selector.trim();
        if let Some(id) = selector.strip_prefix('#') {
            return self.find(self.html, &|node| {
                matches!(&node.kind, NodeKind::Element { attrs, .. } if attrs.get("id").map(String::as_str) == Some(id))
            });
        }
        if let Some(class) = selector.strip_prefix('.') {
            return self.find(self.html, &|node| {
                matches!(&node.kind, NodeKind::Element { attrs, .. }
                    if attrs.get("class").is_some_and(|classes| classes.split_whitespace().any(|c| c == class)))
            });
        }
        self.find(self.html, &|node| {
            matches!(&node.kind, NodeKind::Element { tag, .. } if tag.eq_ignore_ascii_case(selector))
        })
    }

    fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    fn is_element(&self, node: NodeId) -> bool {
        matches!(self.nodes.get(node).map(|n| &n.kind), Some(NodeKind::Element { .. }))
    }

    fn is_document_root(&self, node: NodeId) -> bool {
        node == self.html || node == self.body
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        match &self.nodes.get(node)?.kind {
            NodeKind::Element { tag, .. } => Some(tag.to_ascii_lowercase()),
            _ => None,
        }
    }

    fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        if let Some(dom) = self.nodes.get(node) {
            for child in &dom.children {
                self.serialize(*child, &mut out);
            }
        }
        out
    }

    fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.serialize(node, &mut out);
        out
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        self.insert(element_kind(tag))
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        self.insert(NodeKind::Text(text.to_string()))
    }

    fn create_comment(&mut self, text: &str) -> NodeId {
        self.insert(NodeKind::Comment(text.to_string()))
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(NodeKind::Element { attrs, .. }) = self.nodes.get_mut(node).map(|n| &mut n.kind) {
            attrs.insert(name.to_string(), value.to_string());
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(NodeKind::Element { attrs, .. }) = self.nodes.get_mut(node).map(|n| &mut n.kind) {
            attrs.shift_remove(name);
        }
    }

    fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        match self.nodes.get(node).map(|n| &n.kind) {
            Some(NodeKind::Element { attrs, .. }) => attrs.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            _ => Vec::new(),
        }
    }

    fn text(&self, node: NodeId) -> Option<String> {
        match &self.nodes.get(node)?.kind {
            NodeKind::Text(text) | NodeKind::Comment(text) => Some(text.clone()),
            NodeKind::Element { .. } => None,
        }
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        match self.nodes.get_mut(node).map(|n| &mut n.kind) {
            Some(NodeKind::Text(current)) | Some(NodeKind::Comment(current)) => {
                *current = text.to_string();
            }
            _ => {}
        }
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), PatchError> {
        if !self.nodes.contains_key(parent) || !self.nodes.contains_key(child) {
            return Err(PatchError::MissingNode);
        }
        self.unlink(child);
        self.link(parent, child);
        Ok(())
    }

    fn replace(&mut self, old: NodeId, new: NodeId) -> Result<(), PatchError> {
        if !self.nodes.contains_key(old) || !self.nodes.contains_key(new) {
            return Err(PatchError::MissingNode);
        }
        if old == new {
            return Ok(());
        }
        self.unlink(new);
        if let Some(parent) = self.nodes.get(old).and_then(|n| n.parent) {
            if let Some(parent_node) = self.nodes.get_mut(parent) {
                if let Some(slot) = parent_node.children.iter_mut().find(|child| **child == old) {
                    *slot = new;
                }
            }
            if let Some(node) = self.nodes.get_mut(new) {
                node.parent = Some(parent);
            }
            if let Some(node) = self.nodes.get_mut(old) {
                node.parent = None;
            }
        }
        self.drop_subtree(old);
        Ok(())
    }

    fn remove(&mut self, node: NodeId) {
        self.unlink(node);
        self.drop_subtree(node);
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node)?.parent
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes.get(node).map(|n| n.children.clone()).unwrap_or_default()
    }

    fn set_owner(&mut self, node: NodeId, owner: Option<InstanceId>) {
        match owner {
            Some(owner) if self.nodes.contains_key(node) => {
                self.owners.insert(node, owner);
            }
            _ => {
                self.owners.remove(&node);
            }
        }
    }

    fn owner(&self, node: NodeId) -> Option<InstanceId> {
        self.owners.get(&node).copied()
    }
}
