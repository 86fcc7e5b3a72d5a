//! Reference patch
//!
//! Same-tag elements are patched in place (attributes, then children by
//! index); anything else is rebuilt and swapped in. Component placeholders are
//! handed to the [`PatchContext`], which owns child instances.

use tracing::{trace, warn};
use vireo_core::{NodeId, Patch, PatchBase, PatchContext, PatchError, VElement, VNode};

/// Index-based tree patcher
#[derive(Clone, Copy, Debug, Default)]
pub struct DomPatch;

impl Patch for DomPatch {
    fn patch(&self, ctx: &mut dyn PatchContext, base: PatchBase<'_>, next: &VNode) -> Result<NodeId, PatchError> {
        trace!("DomPatch::patch: {:?}", base);
        match base {
            PatchBase::Detached => create(ctx, next),
            PatchBase::Replace(old) => {
                let node = create(ctx, next)?;
                ctx.host().replace(old, node)?;
                Ok(node)
            }
            PatchBase::Tree { vnode, root } => patch_node(ctx, vnode, root, next),
        }
    }
}

/// Build host nodes for `vnode`
fn create(ctx: &mut dyn PatchContext, vnode: &VNode) -> Result<NodeId, PatchError> {
    match vnode {
        VNode::Element(el) => {
            let node = ctx.host().create_element(&el.tag);
            for (name, value) in &el.attrs {
                ctx.host().set_attribute(node, name, value);
            }
            for child in &el.children {
                let child = create(ctx, child)?;
                ctx.host().append_child(node, child)?;
            }
            Ok(node)
        }
        VNode::Text(text) => Ok(ctx.host().create_text(text)),
        VNode::Comment(text) => Ok(ctx.host().create_comment(text)),
        VNode::Component(component) => match ctx.create_component(component) {
            Ok(node) => Ok(node),
            Err(err) => {
                warn!("DomPatch: {}", err);
                Ok(ctx.host().create_comment(""))
            }
        },
    }
}

fn patch_node(ctx: &mut dyn PatchContext, old: &VNode, node: NodeId, next: &VNode) -> Result<NodeId, PatchError> {
    if !ctx.host().contains(node) {
        return Err(PatchError::MissingNode);
    }
    match (old, next) {
        (VNode::Element(old_el), VNode::Element(next_el)) if old_el.tag == next_el.tag => {
            patch_attrs(ctx, old_el, node, next_el);
            patch_children(ctx, old_el, node, next_el)?;
            Ok(node)
        }
        (VNode::Text(a), VNode::Text(b)) | (VNode::Comment(a), VNode::Comment(b)) => {
            if a != b {
                ctx.host().set_text(node, b);
            }
            Ok(node)
        }
        (VNode::Component(a), VNode::Component(b)) if a.ctor == b.ctor && ctx.host().owner(node).is_some() => {
            ctx.update_component(node, b)
        }
        _ => {
            let replacement = create(ctx, next)?;
            destroy_components(ctx, old, node);
            ctx.host().replace(node, replacement)?;
            Ok(replacement)
        }
    }
}

fn patch_attrs(ctx: &mut dyn PatchContext, old: &VElement, node: NodeId, next: &VElement) {
    let host = ctx.host();
    for name in old.attrs.keys() {
        if !next.attrs.contains_key(name) {
            host.remove_attribute(node, name);
        }
    }
    for (name, value) in &next.attrs {
        if old.attrs.get(name) != Some(value) {
            host.set_attribute(node, name, value);
        }
    }
}

fn patch_children(ctx: &mut dyn PatchContext, old: &VElement, node: NodeId, next: &VElement) -> Result<(), PatchError> {
    let dom_children = ctx.host().children(node);
    let len = old.children.len().max(next.children.len());
    for index in 0..len {
        match (old.children.get(index), next.children.get(index)) {
            (Some(old_child), Some(next_child)) => {
                let child = *dom_children.get(index).ok_or(PatchError::MissingNode)?;
                patch_node(ctx, old_child, child, next_child)?;
            }
            (None, Some(next_child)) => {
                let child = create(ctx, next_child)?;
                ctx.host().append_child(node, child)?;
            }
            (Some(old_child), None) => {
                if let Some(child) = dom_children.get(index).copied() {
                    destroy_components(ctx, old_child, child);
                    ctx.host().remove(child);
                }
            }
            (None, None) => {}
        }
    }
    Ok(())
}

/// Tear down child instances rooted anywhere in the old subtree at `node`
fn destroy_components(ctx: &mut dyn PatchContext, old: &VNode, node: NodeId) {
    match old {
        VNode::Component(_) => ctx.destroy_component(node),
        VNode::Element(el) => {
            let children = ctx.host().children(node);
            for (child_vnode, child) in el.children.iter().zip(children) {
                destroy_components(ctx, child_vnode, child);
            }
        }
        VNode::Text(_) | VNode::Comment(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use vireo_core::{Host, VComponent};

    /// Context without component support
    struct DocumentOnly(Document);

    impl PatchContext for DocumentOnly {
        fn host(&mut self) -> &mut dyn Host {
            &mut self.0
        }

        fn create_component(&mut self, vnode: &VComponent) -> Result<NodeId, PatchError> {
            Err(PatchError::ComponentMount(vnode.tag.clone()))
        }

        fn update_component(&mut self, node: NodeId, _vnode: &VComponent) -> Result<NodeId, PatchError> {
            Ok(node)
        }

        fn destroy_component(&mut self, _node: NodeId) {}
    }

    fn list(items: &[&str]) -> VNode {
        VNode::element("ul")
            .attr("class", "list")
            .children(items.iter().map(|item| VNode::element("li").child(VNode::text(*item))))
    }

    #[test]
    fn test_patch_in_place() {
        let mut ctx = DocumentOnly(Document::new());
        let first = list(&["a", "b"]);
        let root = DomPatch.patch(&mut ctx, PatchBase::Detached, &first).unwrap();
        let items = ctx.0.children(root);

        let second = list(&["a", "c", "d"]);
        let same = DomPatch
            .patch(&mut ctx, PatchBase::Tree { vnode: &first, root }, &second)
            .unwrap();

        assert_eq!(same, root);
        assert_eq!(ctx.0.children(root)[..2], items[..]);
        assert_eq!(ctx.0.outer_html(root), "<ul class=\"list\"><li>a</li><li>c</li><li>d</li></ul>");

        let third = VNode::element("ul").child(VNode::element("li").child(VNode::text("z")));
        DomPatch
            .patch(&mut ctx, PatchBase::Tree { vnode: &second, root }, &third)
            .unwrap();
        assert_eq!(ctx.0.outer_html(root), "<ul><li>z</li></ul>");
    }

    #[test]
    fn test_tag_change_replaces() {
        let mut ctx = DocumentOnly(Document::new());
        let body = ctx.0.body();
        let first = VNode::element("p").child(VNode::text("x"));
        let root = DomPatch.patch(&mut ctx, PatchBase::Detached, &first).unwrap();
        ctx.0.append_child(body, root).unwrap();

        let next = VNode::element("section").child(VNode::text("x"));
        let new_root = DomPatch
            .patch(&mut ctx, PatchBase::Tree { vnode: &first, root }, &next)
            .unwrap();

        assert_ne!(new_root, root);
        assert!(!ctx.0.contains(root));
        assert_eq!(ctx.0.inner_html(body), "<section>x</section>");
    }

    #[test]
    fn test_replace_mount_point() {
        let mut ctx = DocumentOnly(Document::with_body("<div id=\"app\"></div>").unwrap());
        let app = ctx.0.query("#app").unwrap();
        let root = DomPatch
            .patch(&mut ctx, PatchBase::Replace(app), &VNode::element("main"))
            .unwrap();
        assert_eq!(ctx.0.parent(root), Some(ctx.0.body()));
        assert_eq!(ctx.0.inner_html(ctx.0.body()), "<main></main>");
    }

    #[test]
    fn test_failed_component_leaves_placeholder() {
        let mut ctx = DocumentOnly(Document::new());
        let ctor = slotmap::SlotMap::<vireo_core::ConstructorId, ()>::with_key().insert(());
        let tree = VNode::element("div").child(VNode::component("my-widget", ctor));
        let root = DomPatch.patch(&mut ctx, PatchBase::Detached, &tree).unwrap();
        assert_eq!(ctx.0.outer_html(root), "<div><!----></div>");
    }

    #[test]
    fn test_stale_root_is_an_error() {
        let mut ctx = DocumentOnly(Document::new());
        let first = VNode::element("p");
        let root = DomPatch.patch(&mut ctx, PatchBase::Detached, &first).unwrap();
        ctx.0.remove(root);
        let err = DomPatch
            .patch(&mut ctx, PatchBase::Tree { vnode: &first, root }, &first)
            .unwrap_err();
        assert_eq!(err, PatchError::MissingNode);
    }
}
