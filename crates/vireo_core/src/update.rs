//! Update dispatch and child components
//!
//! Re-renders are driven by [`Runtime::flush`]; this module holds what runs for
//! one queued instance plus the parent → child plumbing the patch collaborator
//! reaches through [`crate::PatchContext`].

use std::rc::Rc;

use tracing::{debug, trace};

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::PatchError;
use crate::host::{NodeId, PatchBase};
use crate::instance::{InstanceId, InternalOptions};
use crate::lifecycle::LifecycleState;
use crate::options::HookName;
use crate::runtime::{PatchSession, Runtime};
use crate::vnode::{VComponent, VNode};

impl Runtime {
    /// `beforeUpdate`, render, patch against the previous tree, `updated`
    ///
    /// A failed render keeps the previous tree on screen.
    pub(crate) fn run_update(&mut self, id: InstanceId) {
        let Some(instance) = self.instances.get(id) else {
            return;
        };
        if !instance.is_mounted || instance.is_being_destroyed {
            return;
        }
        trace!("Runtime::run_update: uid {}", instance.uid);

        self.transition(id, LifecycleState::BeforeUpdate);
        self.call_hook(id, &HookName::BEFORE_UPDATE);
        if !self.contains(id) {
            return;
        }

        if let Some(next) = self.render(id) {
            self.commit(id, next);
        }

        self.transition(id, LifecycleState::Updated);
        self.call_hook(id, &HookName::UPDATED);
    }

    /// Patch `next` against the current tree of `id` and store it
    fn commit(&mut self, id: InstanceId, next: VNode) {
        let Some(instance) = self.instances.get(id) else {
            return;
        };
        let prev = instance.vnode.clone();
        let old_root = instance.el;

        let patch = self.patch.clone();
        let result = {
            let base = match (&prev, old_root) {
                (Some(prev), Some(root)) if self.host.contains(root) => PatchBase::Tree { vnode: prev.as_ref(), root },
                _ => PatchBase::Detached,
            };
            patch.patch(&mut PatchSession::new(self, id), base, &next)
        };

        match result {
            Ok(new_root) => {
                if let Some(instance) = self.instances.get_mut(id) {
                    instance.vnode = Some(Rc::new(next));
                    instance.el = Some(new_root);
                }
                if old_root != Some(new_root) {
                    self.host.set_owner(new_root, Some(id));
                    if let Some(old_root) = old_root {
                        self.propagate_root(id, old_root, new_root);
                    }
                }
            }
            Err(err) => {
                self.report_for(id, Diagnostic::new(DiagnosticKind::PatchFailure, err.to_string()));
            }
        }
    }

    /// Ancestors rooted at the same node as `id` follow it to `new_root`
    fn propagate_root(&mut self, id: InstanceId, old_root: NodeId, new_root: NodeId) {
        let mut outermost = id;
        let mut current = self.instances.get(id).and_then(|instance| instance.parent);
        while let Some(ancestor) = current {
            let Some(instance) = self.instances.get_mut(ancestor) else {
                break;
            };
            if instance.el != Some(old_root) {
                break;
            }
            instance.el = Some(new_root);
            outermost = ancestor;
            current = instance.parent;
        }
        self.host.set_owner(new_root, Some(outermost));
    }

    /// Instantiate and mount the component a parent render asked for
    pub(crate) fn create_child_component(&mut self, parent: InstanceId, vnode: &VComponent) -> Result<NodeId, PatchError> {
        let internal = InternalOptions {
            parent: Some(parent),
            props_data: Some(vnode.props.clone()),
            parent_vnode: Some(Rc::new(VNode::Component(vnode.clone()))),
            parent_listeners: (!vnode.listeners.is_empty()).then(|| vnode.listeners.clone()),
            render_children: vnode.children.clone(),
            component_tag: Some(vnode.tag.clone()),
            render: None,
        };
        let child = self
            .create_internal(vnode.ctor, internal)
            .map_err(|_| PatchError::ComponentMount(vnode.tag.clone()))?;

        self.mount(child, None);
        let el = self.instances.get(child).and_then(|instance| instance.el);
        match el {
            Some(el) => {
                debug!("Runtime::create_child_component: <{}> mounted", vnode.tag);
                Ok(el)
            }
            None => {
                self.destroy(child);
                Err(PatchError::ComponentMount(vnode.tag.clone()))
            }
        }
    }

    /// Push a parent's re-rendered component vnode into the existing child
    ///
    /// Changed props are written through [`Runtime::set_state`], so the child
    /// re-renders in the same flush, after its parent. Parent listeners are
    /// replaced. Slot content always forces a child re-render.
    pub(crate) fn update_from_parent(&mut self, child: InstanceId, vnode: &VComponent) {
        let Some(instance) = self.instances.get_mut(child) else {
            return;
        };
        let had_children = !instance.options.render_children.is_empty();

        for listener_id in std::mem::take(&mut instance.parent_listener_ids) {
            instance.events.off(None, Some(listener_id));
        }
        for (event, listener) in &vnode.listeners {
            let listener_id = instance.events.on(event.clone(), listener.clone());
            instance.parent_listener_ids.push(listener_id);
        }

        let options = Rc::make_mut(&mut instance.options);
        options.parent_vnode = Some(Rc::new(VNode::Component(vnode.clone())));
        options.props_data = Some(vnode.props.clone());
        options.render_children = vnode.children.clone();
        let props: Vec<String> = options
            .props
            .keys()
            .filter(|key| vnode.props.contains_key(*key))
            .cloned()
            .collect();

        for key in props {
            if let Some(value) = vnode.props.get(&key) {
                self.set_state(child, &key, value.clone());
            }
        }

        if had_children || !vnode.children.is_empty() {
            self.queue_update(child);
        }
    }
}
