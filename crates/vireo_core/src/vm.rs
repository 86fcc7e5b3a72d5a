//! Instance receivers
//!
//! [`Vm`] is the explicit receiver passed to hooks, methods, watchers and
//! listeners. [`RenderScope`] is the receiver of render functions and computed
//! getters; state reads through it are recorded as render dependencies.

use std::rc::Rc;

use serde_json::Value;

use crate::constructor::ConstructorId;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::events::ListenerId;
use crate::host::NodeId;
use crate::instance::{guarded, InstanceId};
use crate::lifecycle::LifecycleState;
use crate::options::{ComponentOptions, MountTarget, StateMap};
use crate::runtime::Runtime;
use crate::vnode::{VElement, VNode};

/// Receiver bound to one instance
pub struct Vm<'a> {
    runtime: &'a mut Runtime,
    id: InstanceId,
}

impl<'a> Vm<'a> {
    pub(crate) fn new(runtime: &'a mut Runtime, id: InstanceId) -> Self {
        Self { runtime, id }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn uid(&self) -> Option<u64> {
        self.runtime.instances.get(self.id).map(|instance| instance.uid)
    }

    /// Whether the instance still exists
    pub fn is_alive(&self) -> bool {
        self.runtime.contains(self.id)
    }

    /// Read a state key (`null` when absent)
    pub fn get(&self, key: &str) -> Value {
        self.runtime.state(self.id, key).cloned().unwrap_or(Value::Null)
    }

    /// All state of the instance
    pub fn data(&self) -> StateMap {
        self.runtime
            .instances
            .get(self.id)
            .map(|instance| instance.state.clone())
            .unwrap_or_default()
    }

    /// Write a state key
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.runtime.set_state(self.id, key, value.into());
    }

    /// Call a method
    pub fn call(&mut self, method: &str, args: &[Value]) -> anyhow::Result<Value> {
        let found = self
            .runtime
            .instances
            .get(self.id)
            .and_then(|instance| instance.options.methods.get(method).cloned());
        let Some(found) = found else {
            self.runtime.report_for(
                self.id,
                Diagnostic::new(DiagnosticKind::UnknownMethod, format!("method \"{}\" is not defined", method)),
            );
            anyhow::bail!("method `{}` is not defined", method);
        };
        found(self, args)
    }

    /// Evaluate a computed property (reads are not tracked)
    pub fn computed(&mut self, name: &str) -> Option<Value> {
        let getter = self
            .runtime
            .instances
            .get(self.id)?
            .options
            .computed
            .get(name)
            .cloned()?;
        let mut scope = RenderScope::new(self.runtime, self.id, false);
        Some(getter(&mut scope))
    }

    pub fn emit(&mut self, event: &str, args: &[Value]) {
        self.runtime.emit(self.id, event, args);
    }

    pub fn on<F>(&mut self, event: &str, listener: F) -> Option<ListenerId>
    where
        F: Fn(&mut Vm<'_>, &[Value]) -> anyhow::Result<()> + 'static,
    {
        let instance = self.runtime.instances.get_mut(self.id)?;
        Some(instance.events.on(event, Rc::new(listener)))
    }

    pub fn once<F>(&mut self, event: &str, listener: F) -> Option<ListenerId>
    where
        F: Fn(&mut Vm<'_>, &[Value]) -> anyhow::Result<()> + 'static,
    {
        let instance = self.runtime.instances.get_mut(self.id)?;
        Some(instance.events.once(event, Rc::new(listener)))
    }

    /// Remove listeners; see [`crate::EventRegistry::off`]
    pub fn off(&mut self, event: Option<&str>, id: Option<ListenerId>) {
        if let Some(instance) = self.runtime.instances.get_mut(self.id) {
            instance.events.off(event, id);
        }
    }

    /// Queue a re-render regardless of dependencies
    pub fn force_update(&mut self) {
        self.runtime.queue_update(self.id);
    }

    pub fn next_tick(&mut self, callback: impl FnOnce(&mut Runtime) + 'static) {
        self.runtime.next_tick(callback);
    }

    pub fn mount(&mut self, target: Option<MountTarget>) {
        self.runtime.mount(self.id, target);
    }

    pub fn destroy(&mut self) {
        self.runtime.destroy(self.id);
    }

    pub fn parent(&self) -> Option<InstanceId> {
        self.runtime.instances.get(self.id)?.parent
    }

    /// Root of the instance tree (the instance itself for a root)
    pub fn root(&self) -> InstanceId {
        self.runtime
            .instances
            .get(self.id)
            .and_then(|instance| instance.root)
            .unwrap_or(self.id)
    }

    pub fn children(&self) -> Vec<InstanceId> {
        self.runtime
            .instances
            .get(self.id)
            .map(|instance| instance.children.clone())
            .unwrap_or_default()
    }

    pub fn el(&self) -> Option<NodeId> {
        self.runtime.instances.get(self.id)?.el
    }

    pub fn lifecycle(&self) -> Option<LifecycleState> {
        Some(self.runtime.instances.get(self.id)?.lifecycle.current())
    }

    pub fn options(&self) -> Option<Rc<ComponentOptions>> {
        Some(self.runtime.instances.get(self.id)?.options.clone())
    }

    pub fn runtime(&mut self) -> &mut Runtime {
        self.runtime
    }

    /// Receiver for another instance
    pub fn with(&mut self, other: InstanceId) -> Vm<'_> {
        Vm::new(self.runtime, other)
    }
}

/// Receiver of render functions and computed getters
pub struct RenderScope<'a> {
    runtime: &'a mut Runtime,
    id: InstanceId,
    track: bool,
}

impl<'a> RenderScope<'a> {
    pub(crate) fn new(runtime: &'a mut Runtime, id: InstanceId, track: bool) -> Self {
        Self { runtime, id, track }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Read a state key or computed property
    ///
    /// State reads are recorded as dependencies of the current render.
    /// Unknown names are reported and read as `null`.
    pub fn get(&mut self, key: &str) -> Value {
        let Some(instance) = self.runtime.instances.get(self.id) else {
            return Value::Null;
        };
        if let Some(value) = instance.state.get(key).cloned() {
            if self.track {
                self.runtime.reactive.depend(self.id, self.id, key);
            }
            return value;
        }
        if let Some(getter) = instance.options.computed.get(key).cloned() {
            return getter(self);
        }
        self.runtime.report_for(
            self.id,
            Diagnostic::new(
                DiagnosticKind::UnknownProperty,
                format!("property \"{}\" is not defined on the instance but referenced during render", key),
            ),
        );
        Value::Null
    }

    /// Read a dotted path such as `user.name` or `items.0`
    pub fn path(&mut self, path: &str) -> Value {
        let mut segments = path.split('.');
        let Some(first) = segments.next() else {
            return Value::Null;
        };
        let mut value = self.get(first);
        for segment in segments {
            value = match value {
                Value::Object(map) => map.get(segment).cloned().unwrap_or(Value::Null),
                Value::Array(mut items) => match segment.parse::<usize>() {
                    Ok(index) if index < items.len() => items.swap_remove(index),
                    _ => Value::Null,
                },
                _ => Value::Null,
            };
        }
        value
    }

    /// Apply a filter registered on the instance (or globally)
    pub fn filter(&mut self, name: &str, value: &Value) -> Value {
        let filter = self
            .runtime
            .instances
            .get(self.id)
            .and_then(|instance| instance.options.filters.resolve(name).cloned());
        match filter {
            Some(filter) => filter(value),
            None => {
                self.runtime.report_for(
                    self.id,
                    Diagnostic::new(DiagnosticKind::UnknownFilter, format!("failed to resolve filter: {}", name)),
                );
                value.clone()
            }
        }
    }

    /// Apply a directive to a rendered element
    pub fn directive(&mut self, name: &str, element: &mut VElement, value: &Value) {
        let directive = self
            .runtime
            .instances
            .get(self.id)
            .and_then(|instance| instance.options.directives.resolve(name).cloned());
        match directive {
            Some(directive) => directive(element, value),
            None => self.runtime.report_for(
                self.id,
                Diagnostic::new(
                    DiagnosticKind::UnknownDirective,
                    format!("failed to resolve directive: {}", name),
                ),
            ),
        }
    }

    /// Constructor registered for a component tag
    pub fn component(&self, tag: &str) -> Option<ConstructorId> {
        self.runtime
            .instances
            .get(self.id)
            .and_then(|instance| instance.options.components.resolve(tag).copied())
    }

    /// Render hoisted static subtree `index`, once per instance
    pub fn static_tree(&mut self, index: usize) -> VNode {
        let Some(instance) = self.runtime.instances.get(self.id) else {
            return VNode::empty();
        };
        if let Some(Some(cached)) = instance.static_trees.get(index) {
            return cached.clone();
        }
        let Some(render) = instance.options.static_render_fns.get(index).cloned() else {
            return VNode::empty();
        };
        let tree = match guarded(|| render(self)) {
            Ok(tree) => tree,
            Err(message) => {
                self.runtime.report_for(
                    self.id,
                    Diagnostic::new(DiagnosticKind::RenderFailure, message).with_phase("render"),
                );
                return VNode::empty();
            }
        };
        if let Some(slot) = self
            .runtime
            .instances
            .get_mut(self.id)
            .and_then(|instance| instance.static_trees.get_mut(index))
        {
            *slot = Some(tree.clone());
        }
        tree
    }

    /// Content the parent placed between this component's tags
    pub fn render_children(&self) -> Vec<VNode> {
        self.runtime
            .instances
            .get(self.id)
            .map(|instance| instance.options.render_children.clone())
            .unwrap_or_default()
    }

    /// Report a render-time problem against this instance
    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.runtime.report_for(self.id, diagnostic);
    }

    /// Receiver for event listeners created during render
    pub fn runtime(&mut self) -> &mut Runtime {
        self.runtime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state;
    use crate::testing::runtime;
    use serde_json::json;

    #[test]
    fn test_methods_and_computed() {
        let (mut runtime, sink) = runtime();
        let id = runtime
            .create(
                runtime.root(),
                ComponentOptions::new()
                    .data(|_| Ok(state! { "first" => "Ada", "last" => "Lovelace" }))
                    .computed("full", |scope| {
                        json!(format!("{} {}", scope.get("first").as_str().unwrap_or(""), scope.get("last").as_str().unwrap_or("")))
                    })
                    .method("rename", |vm, args| {
                        vm.set("first", args[0].clone());
                        Ok(vm.computed("full").unwrap_or_default())
                    }),
            )
            .unwrap();

        let full = runtime.with_vm(id, |vm| vm.call("rename", &[json!("Grace")])).unwrap();
        assert_eq!(full, json!("Grace Lovelace"));

        let missing = runtime.with_vm(id, |vm| vm.call("nope", &[]));
        assert!(missing.is_err());
        assert_eq!(sink.count(DiagnosticKind::UnknownMethod), 1);
    }

    #[test]
    fn test_watchers_run_on_flush() {
        let (mut runtime, _) = runtime();
        let id = runtime
            .create(
                runtime.root(),
                ComponentOptions::new()
                    .data(|_| Ok(state! { "count" => 0, "log" => "" }))
                    .watch("count", |vm, new, old| {
                        let entry = format!("{}->{}", old, new);
                        vm.set("log", entry);
                        Ok(())
                    }),
            )
            .unwrap();

        runtime.with_vm(id, |vm| {
            vm.set("count", 1);
            vm.set("count", 2);
        });
        assert_eq!(runtime.state(id, "log"), Some(&json!("")));

        runtime.flush();
        assert_eq!(runtime.state(id, "log"), Some(&json!("0->2")));
    }

    #[test]
    fn test_next_tick_runs_after_flush() {
        let (mut runtime, _) = runtime();
        let id = runtime
            .create(runtime.root(), ComponentOptions::new().data(|_| Ok(state! { "n" => 0 })))
            .unwrap();

        runtime.with_vm(id, |vm| {
            vm.next_tick(move |runtime| runtime.set_state(id, "n", json!(5)));
        });
        assert_eq!(runtime.state(id, "n"), Some(&json!(0)));
        runtime.flush();
        assert_eq!(runtime.state(id, "n"), Some(&json!(5)));
        assert!(!runtime.has_pending());
    }

    #[test]
    fn test_path_reads_nested_values() {
        let (mut runtime, sink) = runtime();
        let id = runtime
            .create(
                runtime.root(),
                ComponentOptions::new().data(|_| Ok(state! { "user" => json!({ "tags": ["a", "b"] }) })),
            )
            .unwrap();

        let mut scope = RenderScope::new(&mut runtime, id, false);
        assert_eq!(scope.path("user.tags.1"), json!("b"));
        assert_eq!(scope.path("user.missing"), Value::Null);
        assert_eq!(scope.get("nothing"), Value::Null);
        assert_eq!(sink.count(DiagnosticKind::UnknownProperty), 1);
    }
}
