//! Collaborators for unit tests that never touch a document

use crate::diagnostics::RecordingSink;
use crate::error::PatchError;
use crate::host::{Host, NodeId, Patch, PatchBase, PatchContext};
use crate::instance::InstanceId;
use crate::runtime::Runtime;
use crate::vnode::VNode;

/// Host with no nodes
pub(crate) struct NullHost;

impl Host for NullHost {
    fn query(&self, _: &str) -> Option<NodeId> {
        None
    }
    fn contains(&self, _: NodeId) -> bool {
        false
    }
    fn is_element(&self, _: NodeId) -> bool {
        false
    }
    fn is_document_root(&self, _: NodeId) -> bool {
        false
    }
    fn tag_name(&self, _: NodeId) -> Option<String> {
        None
    }
    fn inner_html(&self, _: NodeId) -> String {
        String::new()
    }
    fn outer_html(&self, _: NodeId) -> String {
        String::new()
    }
    fn create_element(&mut self, _: &str) -> NodeId {
        NodeId::default()
    }
    fn create_text(&mut self, _: &str) -> NodeId {
        NodeId::default()
    }
    fn create_comment(&mut self, _: &str) -> NodeId {
        NodeId::default()
    }
    fn set_attribute(&mut self, _: NodeId, _: &str, _: &str) {}
    fn remove_attribute(&mut self, _: NodeId, _: &str) {}
    fn attributes(&self, _: NodeId) -> Vec<(String, String)> {
        Vec::new()
    }
    fn text(&self, _: NodeId) -> Option<String> {
        None
    }
    fn set_text(&mut self, _: NodeId, _: &str) {}
    fn append_child(&mut self, _: NodeId, _: NodeId) -> Result<(), PatchError> {
        Ok(())
    }
    fn replace(&mut self, _: NodeId, _: NodeId) -> Result<(), PatchError> {
        Ok(())
    }
    fn remove(&mut self, _: NodeId) {}
    fn parent(&self, _: NodeId) -> Option<NodeId> {
        None
    }
    fn children(&self, _: NodeId) -> Vec<NodeId> {
        Vec::new()
    }
    fn set_owner(&mut self, _: NodeId, _: Option<InstanceId>) {}
    fn owner(&self, _: NodeId) -> Option<InstanceId> {
        None
    }
}

/// Patch that commits nothing
pub(crate) struct NullPatch;

impl Patch for NullPatch {
    fn patch(&self, _: &mut dyn PatchContext, _: PatchBase<'_>, _: &VNode) -> Result<NodeId, PatchError> {
        Ok(NodeId::default())
    }
}

/// Patch that fails every commit
pub(crate) struct RejectingPatch;

impl Patch for RejectingPatch {
    fn patch(&self, _: &mut dyn PatchContext, _: PatchBase<'_>, _: &VNode) -> Result<NodeId, PatchError> {
        Err(PatchError::Detached)
    }
}

/// Runtime over the null collaborators, reporting into the returned sink
pub(crate) fn runtime() -> (Runtime, RecordingSink) {
    runtime_with_patch(NullPatch)
}

pub(crate) fn runtime_with_patch(patch: impl Patch + 'static) -> (Runtime, RecordingSink) {
    let sink = RecordingSink::new();
    let runtime = Runtime::builder()
        .host(NullHost)
        .patch(patch)
        .diagnostics(sink.clone())
        .build()
        .expect("null collaborators are complete");
    (runtime, sink)
}
