//! Collaborator interfaces
//!
//! The runtime drives three collaborators it does not implement itself:
//!
//! - [`Host`]: the document being rendered into
//! - [`Patch`]: commits a virtual tree to the host
//! - [`TemplateCompiler`]: turns template text into render functions
//!
//! `vireo_web` provides an implementation of each.

use std::fmt;

use slotmap::new_key_type;

use crate::error::{CompileError, PatchError};
use crate::instance::InstanceId;
use crate::options::RenderFn;
use crate::vnode::{VComponent, VNode};

new_key_type! {
    /// Handle of a node in the host document
    pub struct NodeId;
}

/// Host document
pub trait Host {
    /// Find an element by selector (`#id` or a tag name)
    fn query(&self, selector: &str) -> Option<NodeId>;

    fn contains(&self, node: NodeId) -> bool;

    fn is_element(&self, node: NodeId) -> bool;

    /// Whether `node` is the document's `<html>` or `<body>` element
    fn is_document_root(&self, node: NodeId) -> bool;

    /// Lowercase tag name of an element
    fn tag_name(&self, node: NodeId) -> Option<String>;

    /// Serialized content of `node`
    fn inner_html(&self, node: NodeId) -> String;

    /// Serialized `node` including itself
    fn outer_html(&self, node: NodeId) -> String;

    fn create_element(&mut self, tag: &str) -> NodeId;

    fn create_text(&mut self, text: &str) -> NodeId;

    fn create_comment(&mut self, text: &str) -> NodeId;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);

    fn remove_attribute(&mut self, node: NodeId, name: &str);

    fn attributes(&self, node: NodeId) -> Vec<(String, String)>;

    /// Text of a text or comment node
    fn text(&self, node: NodeId) -> Option<String>;

    fn set_text(&mut self, node: NodeId, text: &str);

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), PatchError>;

    /// Put `new` where `old` is and drop `old` (and its subtree)
    fn replace(&mut self, old: NodeId, new: NodeId) -> Result<(), PatchError>;

    /// Detach and drop `node` with its subtree
    fn remove(&mut self, node: NodeId);

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Tag `node` as the root element of `owner`
    fn set_owner(&mut self, node: NodeId, owner: Option<InstanceId>);

    fn owner(&self, node: NodeId) -> Option<InstanceId>;
}

/// What a patch starts from
#[derive(Clone, Copy)]
pub enum PatchBase<'a> {
    /// Nothing: build a fresh detached tree
    Detached,
    /// First render onto an existing element, which the new tree replaces
    Replace(NodeId),
    /// Re-render: the previous tree and the root node it was committed to
    Tree { vnode: &'a VNode, root: NodeId },
}

impl fmt::Debug for PatchBase<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchBase::Detached => f.write_str("Detached"),
            PatchBase::Replace(node) => f.debug_tuple("Replace").field(node).finish(),
            PatchBase::Tree { root, .. } => f.debug_struct("Tree").field("root", root).finish_non_exhaustive(),
        }
    }
}

/// Runtime services offered to the patch algorithm
pub trait PatchContext {
    fn host(&mut self) -> &mut dyn Host;

    /// Instantiate and mount a child component; returns its root node
    fn create_component(&mut self, vnode: &VComponent) -> Result<NodeId, PatchError>;

    /// Push new props / listeners / children into the child rooted at `node`
    ///
    /// Returns the node the child is currently rooted at.
    fn update_component(&mut self, node: NodeId, vnode: &VComponent) -> Result<NodeId, PatchError>;

    /// Destroy the child rooted at `node`
    fn destroy_component(&mut self, node: NodeId);
}

/// Patch collaborator
pub trait Patch {
    /// Commit `next` against `base`; returns the committed root node
    fn patch(&self, ctx: &mut dyn PatchContext, base: PatchBase<'_>, next: &VNode) -> Result<NodeId, PatchError>;
}

/// Options handed to the compiler for one compilation
pub struct CompileOptions<'a> {
    /// Receives compile-time warnings
    pub warn: &'a dyn Fn(&str),
    /// Decode `&#10;` in attribute values
    pub decode_newlines: bool,
    /// Interpolation delimiters, `{{` `}}` when absent
    pub delimiters: Option<&'a (String, String)>,
}

impl fmt::Debug for CompileOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileOptions")
            .field("decode_newlines", &self.decode_newlines)
            .field("delimiters", &self.delimiters)
            .finish_non_exhaustive()
    }
}

/// Output of a compilation
#[derive(Clone)]
pub struct CompiledTemplate {
    pub render: RenderFn,
    /// Render functions of hoisted static subtrees
    pub static_render_fns: Vec<RenderFn>,
}

impl fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledTemplate")
            .field("static_render_fns", &self.static_render_fns.len())
            .finish_non_exhaustive()
    }
}

/// Template compiler collaborator
pub trait TemplateCompiler {
    fn compile(&self, template: &str, options: &CompileOptions<'_>) -> Result<CompiledTemplate, CompileError>;
}
