//! Mount / compile pipeline
//!
//! Resolution order for what to render:
//!
//! 1. an explicit render function (no compilation)
//! 2. a `#id` template: inner content of the referenced element, memoized
//! 3. any other template string, as-is
//! 4. a template element: its inner content
//! 5. no template: the outer content of the mount target
//!
//! Anything else is rejected with a diagnostic and the instance stays unmounted.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::host::{CompileOptions, NodeId, PatchBase};
use crate::instance::{guarded, InstanceId};
use crate::lifecycle::LifecycleState;
use crate::options::{HookName, MountTarget, Template};
use crate::runtime::{PatchSession, Runtime};
use crate::vm::RenderScope;
use crate::vnode::VNode;

impl Runtime {
    /// Mount `id` onto `target` (or its `el` option, or detached when neither)
    ///
    /// Mounting twice reports a diagnostic and changes nothing.
    pub fn mount(&mut self, id: InstanceId, target: Option<MountTarget>) {
        let Some(instance) = self.instances.get(id) else {
            return;
        };
        if instance.is_mounted {
            if self.config.warn_on_remount {
                self.report_for(
                    id,
                    Diagnostic::new(DiagnosticKind::AlreadyMounted, "instance is already mounted"),
                );
            }
            return;
        }
        if !instance.lifecycle.is_in(LifecycleState::RenderInitialized) {
            debug!(
                "Runtime::mount: uid {} cannot mount from {:?}",
                instance.uid,
                instance.lifecycle.current()
            );
            return;
        }
        let options = instance.options.clone();

        let el = match target.or_else(|| options.el.clone()) {
            Some(target) => match self.resolve_target(&target) {
                Some(el) => Some(el),
                None => {
                    self.report_for(
                        id,
                        Diagnostic::new(
                            DiagnosticKind::MountTargetNotFound,
                            format!("cannot find element: {}", describe_target(&target)),
                        ),
                    );
                    return;
                }
            },
            None => None,
        };

        if let Some(el) = el {
            if self.host.is_document_root(el) {
                self.report_for(
                    id,
                    Diagnostic::new(
                        DiagnosticKind::InvalidMountTarget,
                        "do not mount onto <html> or <body>; mount to a normal element instead",
                    ),
                );
                return;
            }
        }

        if options.render.is_none() && !self.compile_for(id, el) {
            return;
        }

        self.mount_component(id, el);
    }

    fn resolve_target(&self, target: &MountTarget) -> Option<NodeId> {
        match target {
            MountTarget::Selector(selector) => self.host.query(selector),
            MountTarget::Node(node) => self.host.contains(*node).then_some(*node),
        }
    }

    /// Obtain template text and install the compiled render function
    fn compile_for(&mut self, id: InstanceId, el: Option<NodeId>) -> bool {
        let Some(template) = self.template_text(id, el) else {
            return false;
        };
        let Some(compiler) = self.compiler.clone() else {
            self.report_for(
                id,
                Diagnostic::new(
                    DiagnosticKind::CompileFailure,
                    "templates are not available without a compiler; provide a render function",
                ),
            );
            return false;
        };
        let Some(options) = self.instances.get(id).map(|instance| instance.options.clone()) else {
            return false;
        };

        let warnings = RefCell::new(Vec::new());
        let warn = |message: &str| warnings.borrow_mut().push(message.to_string());
        let delimiters = options.delimiters.clone().or_else(|| self.config.delimiters.clone());
        let result = compiler.compile(
            &template,
            &CompileOptions {
                warn: &warn,
                decode_newlines: self.config.decode_newlines,
                delimiters: delimiters.as_ref(),
            },
        );

        for warning in warnings.into_inner() {
            self.report_for(id, Diagnostic::new(DiagnosticKind::CompileFailure, warning));
        }

        match result {
            Ok(compiled) => {
                if let Some(instance) = self.instances.get_mut(id) {
                    let options = Rc::make_mut(&mut instance.options);
                    options.render = Some(compiled.render);
                    options.static_render_fns = compiled.static_render_fns;
                    instance.static_trees = vec![None; options.static_render_fns.len()];
                }
                true
            }
            Err(err) => {
                self.report_for(id, Diagnostic::new(DiagnosticKind::CompileFailure, err.to_string()));
                false
            }
        }
    }

    fn template_text(&mut self, id: InstanceId, el: Option<NodeId>) -> Option<String> {
        let template = self.instances.get(id)?.options.template.clone();
        match template {
            Some(Template::Source(source)) if source.starts_with('#') => {
                let found = self.lookup_template(&source);
                if found.is_none() {
                    self.report_for(
                        id,
                        Diagnostic::new(
                            DiagnosticKind::TemplateNotFound,
                            format!("template element not found or is empty: {}", source),
                        ),
                    );
                }
                found
            }
            Some(Template::Source(source)) => Some(source),
            Some(Template::Element(node)) => {
                if self.host.contains(node) && self.host.is_element(node) {
                    Some(self.host.inner_html(node))
                } else {
                    self.report_for(
                        id,
                        Diagnostic::new(DiagnosticKind::InvalidTemplate, "invalid template option: not an element"),
                    );
                    None
                }
            }
            None => match el {
                Some(el) => Some(self.host.outer_html(el)),
                None => {
                    self.report_for(
                        id,
                        Diagnostic::new(
                            DiagnosticKind::MissingRenderSource,
                            "failed to mount component: template or render function not defined",
                        ),
                    );
                    None
                }
            },
        }
    }

    /// Inner content of the element a `#id` template names; empty counts as missing
    fn lookup_template(&mut self, selector: &str) -> Option<String> {
        if let Some(cached) = self.template_lookups.get(selector) {
            return cached.clone();
        }
        let found = self
            .host
            .query(selector)
            .map(|node| self.host.inner_html(node))
            .filter(|html| !html.is_empty());
        self.template_lookups.insert(selector.to_string(), found.clone());
        found
    }

    /// `beforeMount`, first render and patch, `mounted`
    pub(crate) fn mount_component(&mut self, id: InstanceId, el: Option<NodeId>) {
        self.transition(id, LifecycleState::BeforeMount);
        self.call_hook(id, &HookName::BEFORE_MOUNT);
        if !self.contains(id) {
            return;
        }

        let vnode = self.render(id).unwrap_or_else(VNode::empty);
        let base = match el {
            Some(el) => PatchBase::Replace(el),
            None => PatchBase::Detached,
        };
        let existing = self.instances.get(id).map_or(0, |instance| instance.children.len());
        let patch = self.patch.clone();
        let result = patch.patch(&mut PatchSession::new(self, id), base, &vnode);

        let root = match result {
            Ok(root) => root,
            Err(err) => {
                self.report_for(id, Diagnostic::new(DiagnosticKind::PatchFailure, err.to_string()));
                self.abort_mount(id, existing);
                return;
            }
        };
        self.host.set_owner(root, Some(id));
        let Some(instance) = self.instances.get_mut(id) else {
            return;
        };
        instance.vnode = Some(Rc::new(vnode));
        instance.el = Some(root);
        instance.is_mounted = true;
        debug!("Runtime::mount: uid {} mounted", instance.uid);

        self.transition(id, LifecycleState::Mounted);
        self.call_hook(id, &HookName::MOUNTED);
    }

    /// Undo a first patch that failed: children created by it are destroyed
    /// and the instance stays unmounted in `BeforeMount`
    fn abort_mount(&mut self, id: InstanceId, existing: usize) {
        let created: Vec<InstanceId> = match self.instances.get(id) {
            Some(instance) => instance.children.iter().skip(existing).copied().collect(),
            None => return,
        };
        for child in created {
            self.destroy(child);
        }
        self.reactive.clear_dependencies(id);
        if let Some(instance) = self.instances.get_mut(id) {
            instance.vnode = None;
            debug!("Runtime::mount: uid {} left unmounted after a failed patch", instance.uid);
        }
    }

    /// Run the render function of `id`; `None` when it failed or is missing
    pub(crate) fn render(&mut self, id: InstanceId) -> Option<VNode> {
        let render = self.instances.get(id)?.options.render.clone()?;
        self.reactive.clear_dependencies(id);
        let result = guarded(|| {
            let mut scope = RenderScope::new(self, id, true);
            render(&mut scope)
        });
        match result {
            Ok(vnode) => Some(vnode),
            Err(message) => {
                self.report_for(
                    id,
                    Diagnostic::new(DiagnosticKind::RenderFailure, format!("error in render: {}", message))
                        .with_phase("render"),
                );
                None
            }
        }
    }
}

fn describe_target(target: &MountTarget) -> String {
    match target {
        MountTarget::Selector(selector) => selector.clone(),
        MountTarget::Node(node) => format!("{:?}", node),
    }
}
