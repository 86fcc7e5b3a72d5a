//! Instance records and the creation / teardown path
//!
//! Creation walks the lifecycle in order:
//!
//! 1. resolve options (full merge, or the internal fast path)
//! 2. link into the parent / child tree
//! 3. attach parent-supplied listeners
//! 4. `beforeCreate`
//! 5. props, data, reactive registration
//! 6. `created`
//! 7. mount, when a mount target is known

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde_json::Value;
use slotmap::new_key_type;
use tracing::{debug, error};

use crate::constructor::ConstructorId;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::VireoError;
use crate::events::{EventRegistry, ListenerId};
use crate::host::NodeId;
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::merge::merge_options;
use crate::options::{ComponentOptions, HookName, Listener, RenderFn, StateMap};
use crate::runtime::Runtime;
use crate::vm::Vm;
use crate::vnode::VNode;

new_key_type! {
    /// Handle of a live instance
    pub struct InstanceId;
}

static NEXT_UID: AtomicU64 = AtomicU64::new(0);

/// A component instance
pub struct Instance {
    pub(crate) uid: u64,
    pub(crate) ctor: ConstructorId,
    pub(crate) is_internal: bool,
    pub(crate) options: Rc<ComponentOptions>,
    pub(crate) lifecycle: Lifecycle,
    /// Nearest non-abstract ancestor
    pub(crate) parent: Option<InstanceId>,
    /// Instance whose render produced this one
    pub(crate) context: Option<InstanceId>,
    pub(crate) root: Option<InstanceId>,
    pub(crate) children: Vec<InstanceId>,
    pub(crate) events: EventRegistry,
    pub(crate) parent_listener_ids: Vec<ListenerId>,
    pub(crate) state: StateMap,
    pub(crate) vnode: Option<Rc<VNode>>,
    pub(crate) el: Option<NodeId>,
    /// Rendered hoisted subtrees, by static render fn index
    pub(crate) static_trees: Vec<Option<VNode>>,
    pub(crate) is_mounted: bool,
    pub(crate) is_being_destroyed: bool,
}

impl Instance {
    fn new(ctor: ConstructorId, is_internal: bool, options: Rc<ComponentOptions>) -> Self {
        Self {
            uid: NEXT_UID.fetch_add(1, Ordering::Relaxed),
            ctor,
            is_internal,
            options,
            lifecycle: Lifecycle::new(),
            parent: None,
            context: None,
            root: None,
            children: Vec::new(),
            events: EventRegistry::new(),
            parent_listener_ids: Vec::new(),
            state: StateMap::new(),
            vnode: None,
            el: None,
            static_trees: Vec::new(),
            is_mounted: false,
            is_being_destroyed: false,
        }
    }

    /// Process-unique, increasing with creation order
    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn ctor(&self) -> ConstructorId {
        self.ctor
    }

    /// Created by the runtime for a component placeholder
    pub fn is_internal(&self) -> bool {
        self.is_internal
    }

    pub fn options(&self) -> &Rc<ComponentOptions> {
        &self.options
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn parent(&self) -> Option<InstanceId> {
        self.parent
    }

    /// Root of the instance tree; `None` for a root instance
    pub fn root(&self) -> Option<InstanceId> {
        self.root
    }

    pub fn children(&self) -> &[InstanceId] {
        &self.children
    }

    pub fn data(&self) -> &StateMap {
        &self.state
    }

    pub fn vnode(&self) -> Option<&Rc<VNode>> {
        self.vnode.as_ref()
    }

    /// Root host node once mounted
    pub fn el(&self) -> Option<NodeId> {
        self.el
    }

    pub fn is_mounted(&self) -> bool {
        self.is_mounted
    }

    pub fn is_being_destroyed(&self) -> bool {
        self.is_being_destroyed
    }

    pub fn is_abstract(&self) -> bool {
        self.options.is_abstract.unwrap_or(false)
    }
}

/// Fields a parent supplies when the runtime instantiates a child component
///
/// These are the only fields copied onto the constructor's resolved options;
/// no merge runs for internal instances.
#[derive(Default)]
pub struct InternalOptions {
    pub parent: Option<InstanceId>,
    pub props_data: Option<StateMap>,
    pub parent_vnode: Option<Rc<VNode>>,
    pub parent_listeners: Option<IndexMap<String, Listener>>,
    pub render_children: Vec<VNode>,
    pub component_tag: Option<String>,
    /// Render function override with its static render fns
    pub render: Option<(RenderFn, Vec<RenderFn>)>,
}

impl InternalOptions {
    /// Copy the fields onto a clone of `base`
    pub fn apply(self, base: &ComponentOptions) -> ComponentOptions {
        let InternalOptions {
            parent,
            props_data,
            parent_vnode,
            parent_listeners,
            render_children,
            component_tag,
            render,
        } = self;

        let mut options = base.clone();
        options.parent = parent;
        options.props_data = props_data;
        options.parent_vnode = parent_vnode;
        options.parent_listeners = parent_listeners;
        options.render_children = render_children;
        options.component_tag = component_tag;
        if let Some((render, static_render_fns)) = render {
            options.render = Some(render);
            options.static_render_fns = static_render_fns;
        }
        options
    }
}

/// Run a user callback, turning errors and panics into a message
pub(crate) fn guarded<T>(f: impl FnOnce() -> anyhow::Result<T>) -> Result<T, String> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(format!("{:#}", err)),
        Err(panic) => Err(panic_message(panic.as_ref())),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}

impl Runtime {
    /// Create an instance of `ctor`, merging `options` over the constructor's
    ///
    /// An unknown constructor handle is reported and the root constructor is
    /// used instead. Fails only when state initialization fails, in which case
    /// `created` never runs and the instance is discarded.
    pub fn create(&mut self, ctor: ConstructorId, options: ComponentOptions) -> Result<InstanceId, VireoError> {
        let ctor = self.checked_ctor(ctor);
        let resolved = self.resolve_options(ctor);
        let merged = merge_options(&resolved, &options, &self.strategies);
        self.init_instance(ctor, Rc::new(merged), false)
    }

    /// Create an instance on the internal fast path
    pub fn create_internal(&mut self, ctor: ConstructorId, internal: InternalOptions) -> Result<InstanceId, VireoError> {
        let ctor = self.checked_ctor(ctor);
        let resolved = self.resolve_options(ctor);
        let options = internal.apply(&resolved);
        self.init_instance(ctor, Rc::new(options), true)
    }

    fn init_instance(
        &mut self,
        ctor: ConstructorId,
        options: Rc<ComponentOptions>,
        is_internal: bool,
    ) -> Result<InstanceId, VireoError> {
        let mut instance = Instance::new(ctor, is_internal, options);
        let uid = instance.uid;
        let id = self.instances.insert(instance);
        debug!("Runtime::create: uid {} (internal: {})", uid, is_internal);
        self.transition(id, LifecycleState::OptionsResolved);

        self.init_lifecycle(id);
        self.init_events(id);

        self.transition(id, LifecycleState::BeforeCreate);
        self.call_hook(id, &HookName::BEFORE_CREATE);

        if let Err(message) = self.init_state(id) {
            self.report_for(
                id,
                Diagnostic::new(DiagnosticKind::StateInitFailure, message.clone()),
            );
            self.discard(id);
            return Err(VireoError::StateInit { uid, message });
        }
        self.transition(id, LifecycleState::StateInitialized);

        self.transition(id, LifecycleState::Created);
        self.call_hook(id, &HookName::CREATED);

        if !self.transition(id, LifecycleState::RenderInitialized) {
            // Destroyed from inside `created`
            return Ok(id);
        }
        self.init_render(id);

        let target = self.instances.get(id).and_then(|instance| instance.options.el.clone());
        if let Some(target) = target {
            self.mount(id, Some(target));
        }
        Ok(id)
    }

    fn init_lifecycle(&mut self, id: InstanceId) {
        let Some(instance) = self.instances.get(id) else {
            return;
        };
        let context = instance.options.parent;
        let is_abstract = instance.is_abstract();

        let mut parent = context.filter(|parent| self.instances.contains_key(*parent));
        if !is_abstract {
            while let Some(candidate) = parent {
                match self.instances.get(candidate) {
                    Some(p) if p.is_abstract() && p.parent.is_some() => parent = p.parent,
                    _ => break,
                }
            }
        }
        let root = parent.map(|p| self.instances.get(p).and_then(|p| p.root).unwrap_or(p));

        if let Some(parent) = parent {
            if !is_abstract {
                if let Some(p) = self.instances.get_mut(parent) {
                    p.children.push(id);
                }
            }
        }
        if let Some(instance) = self.instances.get_mut(id) {
            instance.parent = parent;
            instance.context = context;
            instance.root = root;
        }
        self.transition(id, LifecycleState::LifecycleInitialized);
    }

    fn init_events(&mut self, id: InstanceId) {
        if let Some(instance) = self.instances.get_mut(id) {
            if let Some(listeners) = instance.options.parent_listeners.clone() {
                for (event, listener) in listeners {
                    let listener_id = instance.events.on(event, listener);
                    instance.parent_listener_ids.push(listener_id);
                }
            }
        }
        self.transition(id, LifecycleState::EventsInitialized);
    }

    /// Props, then data, then reactive registration
    fn init_state(&mut self, id: InstanceId) -> Result<(), String> {
        let Some(instance) = self.instances.get(id) else {
            return Err("instance was discarded before state initialization".to_string());
        };
        let options = instance.options.clone();

        let mut state = StateMap::new();
        for (key, def) in &options.props {
            let passed = options.props_data.as_ref().and_then(|data| data.get(key));
            let value = match (passed, &def.default) {
                (Some(value), _) => value.clone(),
                (None, Some(default)) => default.clone(),
                (None, None) => {
                    if def.required {
                        self.report_for(
                            id,
                            Diagnostic::new(DiagnosticKind::MissingProp, format!("missing required prop: \"{}\"", key)),
                        );
                    }
                    Value::Null
                }
            };
            state.insert(key.clone(), value);
        }

        if let Some(data) = &options.data {
            let props = state.clone();
            let data = guarded(|| data(&props))?;
            for (key, value) in data {
                if state.contains_key(&key) {
                    debug!("Runtime::init_state: data key {} is already declared as a prop", key);
                    continue;
                }
                state.insert(key, value);
            }
        }

        let keys: Vec<String> = state.keys().cloned().collect();
        self.reactive.observe(id, &keys).map_err(|err| err.to_string())?;

        if let Some(instance) = self.instances.get_mut(id) {
            instance.state = state;
        }
        Ok(())
    }

    fn init_render(&mut self, id: InstanceId) {
        if let Some(instance) = self.instances.get_mut(id) {
            instance.static_trees = vec![None; instance.options.static_render_fns.len()];
        }
    }

    /// Remove an instance that never finished creation
    fn discard(&mut self, id: InstanceId) {
        if let Some(instance) = self.instances.remove(id) {
            if let Some(parent) = instance.parent.and_then(|p| self.instances.get_mut(p)) {
                parent.children.retain(|child| *child != id);
            }
        }
        self.reactive.release(id);
    }

    /// Advance the lifecycle of `id`; false when the instance is gone or the
    /// transition is not permitted
    pub(crate) fn transition(&mut self, id: InstanceId, to: LifecycleState) -> bool {
        let Some(instance) = self.instances.get_mut(id) else {
            return false;
        };
        match instance.lifecycle.advance(to) {
            Ok(()) => true,
            Err(err) => {
                error!("Runtime::transition: uid {}: {}", instance.uid, err);
                false
            }
        }
    }

    /// Invoke every callable registered for `name`, in order
    ///
    /// A failing callable is reported and the remaining ones still run.
    /// Listeners of the `hook:<name>` event are notified afterwards.
    pub fn call_hook(&mut self, id: InstanceId, name: &HookName) {
        let Some(instance) = self.instances.get(id) else {
            return;
        };
        let hooks: Vec<_> = instance.options.hooks_for(name).to_vec();

        for hook in hooks {
            if !self.instances.contains_key(id) {
                return;
            }
            let result = guarded(|| {
                let mut vm = Vm::new(self, id);
                hook(&mut vm)
            });
            if let Err(message) = result {
                self.report_for(
                    id,
                    Diagnostic::new(DiagnosticKind::HookFailure, format!("error in {} hook: {}", name, message))
                        .with_phase(name.as_str()),
                );
            }
        }

        let event = format!("hook:{}", name);
        if self
            .instances
            .get(id)
            .is_some_and(|instance| instance.events.has_listeners(&event))
        {
            self.emit(id, &event, &[]);
        }
    }

    /// Call the listeners of `event` on `id` with `args`
    pub fn emit(&mut self, id: InstanceId, event: &str, args: &[Value]) {
        let Some(instance) = self.instances.get_mut(id) else {
            return;
        };
        let listeners = instance.events.take_for_emit(event);
        for listener in listeners {
            if !self.instances.contains_key(id) {
                return;
            }
            let result = guarded(|| {
                let mut vm = Vm::new(self, id);
                listener(&mut vm, args)
            });
            if let Err(message) = result {
                self.report_for(
                    id,
                    Diagnostic::new(
                        DiagnosticKind::ListenerFailure,
                        format!("error in event handler for \"{}\": {}", event, message),
                    )
                    .with_phase(event),
                );
            }
        }
    }

    /// Tear an instance down
    ///
    /// Runs `beforeDestroy`, detaches from the parent, destroys children,
    /// releases reactive state and pending updates, runs `destroyed`, drops
    /// listeners and removes the record. Repeated calls are no-ops.
    pub fn destroy(&mut self, id: InstanceId) {
        let Some(instance) = self.instances.get(id) else {
            return;
        };
        if instance.is_being_destroyed || !instance.lifecycle.can_advance_to(LifecycleState::BeforeDestroy) {
            return;
        }
        let uid = instance.uid;
        debug!("Runtime::destroy: uid {}", uid);

        self.transition(id, LifecycleState::BeforeDestroy);
        self.call_hook(id, &HookName::BEFORE_DESTROY);

        let Some(instance) = self.instances.get_mut(id) else {
            return;
        };
        instance.is_being_destroyed = true;
        let parent = instance.parent;
        let mut children = std::mem::take(&mut instance.children);

        if let Some(parent) = parent.and_then(|p| self.instances.get_mut(p)) {
            if !parent.is_being_destroyed {
                parent.children.retain(|child| *child != id);
            }
        }

        // Abstract descendants are not in `children`; find them by link
        for (other, candidate) in &self.instances {
            if (candidate.parent == Some(id) || candidate.context == Some(id)) && !children.contains(&other) {
                children.push(other);
            }
        }
        for child in children {
            self.destroy(child);
        }

        self.reactive.release(id);
        self.scheduler.cancel(uid);

        self.transition(id, LifecycleState::TornDown);
        let el = self.instances.get_mut(id).and_then(|instance| {
            instance.vnode = None;
            instance.is_mounted = false;
            instance.el
        });
        if let Some(el) = el {
            if self.host.contains(el) && self.host.owner(el) == Some(id) {
                self.host.set_owner(el, None);
            }
        }

        self.transition(id, LifecycleState::Destroyed);
        self.call_hook(id, &HookName::DESTROYED);

        if let Some(mut instance) = self.instances.remove(id) {
            instance.events.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state;
    use crate::testing::runtime;
    use std::cell::RefCell;

    type Log = Rc<RefCell<Vec<String>>>;

    fn logging(log: &Log, label: &'static str) -> impl Fn(&mut Vm<'_>) -> anyhow::Result<()> {
        let log = log.clone();
        move |_| {
            log.borrow_mut().push(label.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_uids_increase() {
        let (mut runtime, _) = runtime();
        let a = runtime.create(runtime.root(), ComponentOptions::new()).unwrap();
        let b = runtime.create(runtime.root(), ComponentOptions::new()).unwrap();
        assert!(runtime.instance(a).unwrap().uid() < runtime.instance(b).unwrap().uid());
    }

    #[test]
    fn test_history_starts_at_options_resolved() {
        let (mut runtime, _) = runtime();
        let id = runtime.create(runtime.root(), ComponentOptions::new()).unwrap();
        let history = runtime.instance(id).unwrap().lifecycle().history().to_vec();
        assert_eq!(history[0], (LifecycleState::Constructing, LifecycleState::OptionsResolved));
        assert_eq!(
            history.last(),
            Some(&(LifecycleState::Created, LifecycleState::RenderInitialized))
        );
    }

    #[test]
    fn test_creation_phases_in_order() {
        let (mut runtime, _) = runtime();
        let log: Log = Rc::default();
        let seen = log.clone();

        let id = runtime
            .create(
                runtime.root(),
                ComponentOptions::new()
                    .data(|_| Ok(state! { "count" => 1 }))
                    .hook(HookName::BEFORE_CREATE, move |vm| {
                        // State is not wired yet
                        seen.borrow_mut().push(format!("beforeCreate:{}", vm.get("count")));
                        Ok(())
                    })
                    .hook(HookName::CREATED, logging(&log, "created")),
            )
            .unwrap();

        assert_eq!(*log.borrow(), vec!["beforeCreate:null", "created"]);
        let instance = runtime.instance(id).unwrap();
        assert_eq!(instance.lifecycle().current(), LifecycleState::RenderInitialized);
        assert_eq!(instance.data()["count"], serde_json::json!(1));
        assert!(!instance.is_internal());
    }

    #[test]
    fn test_failing_hook_is_isolated() {
        let (mut runtime, sink) = runtime();
        let log: Log = Rc::default();

        runtime
            .create(
                runtime.root(),
                ComponentOptions::new()
                    .hook(HookName::CREATED, |_| anyhow::bail!("first failed"))
                    .hook(HookName::CREATED, |_| panic!("second panicked"))
                    .hook(HookName::CREATED, logging(&log, "third")),
            )
            .unwrap();

        assert_eq!(*log.borrow(), vec!["third"]);
        assert_eq!(sink.count(DiagnosticKind::HookFailure), 2);
        let first = &sink.records()[0];
        assert_eq!(first.phase.as_deref(), Some("created"));
        assert!(first.message.contains("first failed"));
    }

    #[test]
    fn test_state_init_failure_skips_created() {
        let (mut runtime, sink) = runtime();
        let log: Log = Rc::default();

        let result = runtime.create(
            runtime.root(),
            ComponentOptions::new()
                .data(|_| anyhow::bail!("bad data"))
                .hook(HookName::CREATED, logging(&log, "created")),
        );

        assert!(matches!(result, Err(VireoError::StateInit { .. })));
        assert!(log.borrow().is_empty());
        assert_eq!(sink.count(DiagnosticKind::StateInitFailure), 1);
        assert_eq!(runtime.instance_count(), 0);
    }

    #[test]
    fn test_props_from_parent_data_and_defaults() {
        let (mut runtime, sink) = runtime();
        let ctor = runtime.extend(
            runtime.root(),
            ComponentOptions::new()
                .prop("title", crate::PropDef::with_default("untitled"))
                .prop("size", crate::PropDef::with_default(1))
                .prop("owner", crate::PropDef::required())
                .data(|props| Ok(state! { "doubled" => props["size"].as_i64().unwrap_or(0) * 2 })),
        );

        let id = runtime
            .create_internal(
                ctor,
                InternalOptions {
                    props_data: Some(state! { "size" => 4 }),
                    ..Default::default()
                },
            )
            .unwrap();

        let data = runtime.instance(id).unwrap().data();
        assert_eq!(data["title"], serde_json::json!("untitled"));
        assert_eq!(data["size"], serde_json::json!(4));
        assert_eq!(data["doubled"], serde_json::json!(8));
        assert_eq!(data["owner"], Value::Null);
        assert_eq!(sink.count(DiagnosticKind::MissingProp), 1);
    }

    #[test]
    fn test_internal_fast_path_copies_fixed_fields() {
        let (mut runtime, _) = runtime();
        let ctor = runtime.extend(runtime.root(), ComponentOptions::new().name("Leaf").extra("kept", true));
        let parent = runtime.create(runtime.root(), ComponentOptions::new()).unwrap();
        let render: RenderFn = Rc::new(|_| Ok(VNode::text("override")));

        let id = runtime
            .create_internal(
                ctor,
                InternalOptions {
                    parent: Some(parent),
                    component_tag: Some("leaf".into()),
                    render_children: vec![VNode::text("slot")],
                    render: Some((render.clone(), Vec::new())),
                    ..Default::default()
                },
            )
            .unwrap();

        let instance = runtime.instance(id).unwrap();
        assert!(instance.is_internal());
        assert_eq!(instance.parent(), Some(parent));
        let options = instance.options();
        assert_eq!(options.component_tag.as_deref(), Some("leaf"));
        assert_eq!(options.render_children.len(), 1);
        assert!(Rc::ptr_eq(options.render.as_ref().unwrap(), &render));
        assert_eq!(options.extra["kept"], serde_json::json!(true));
        assert_eq!(runtime.instance(parent).unwrap().children(), &[id]);
    }

    #[test]
    fn test_abstract_parent_is_skipped() {
        let (mut runtime, _) = runtime();
        let root = runtime.create(runtime.root(), ComponentOptions::new()).unwrap();
        let wrapper = runtime
            .create(runtime.root(), ComponentOptions::new().abstract_component().parent(root))
            .unwrap();
        let inner = runtime
            .create(runtime.root(), ComponentOptions::new().parent(wrapper))
            .unwrap();

        assert_eq!(runtime.instance(inner).unwrap().parent(), Some(root));
        assert_eq!(runtime.instance(inner).unwrap().root(), Some(root));
        assert_eq!(runtime.instance(root).unwrap().children(), &[inner]);
        assert_eq!(runtime.instance(wrapper).unwrap().parent(), Some(root));
    }

    #[test]
    fn test_destroy_is_idempotent_and_recursive() {
        let (mut runtime, _) = runtime();
        let log: Log = Rc::default();
        let parent = runtime
            .create(
                runtime.root(),
                ComponentOptions::new()
                    .hook(HookName::BEFORE_DESTROY, logging(&log, "parent:beforeDestroy"))
                    .hook(HookName::DESTROYED, logging(&log, "parent:destroyed")),
            )
            .unwrap();
        let child = runtime
            .create(
                runtime.root(),
                ComponentOptions::new()
                    .parent(parent)
                    .hook(HookName::DESTROYED, logging(&log, "child:destroyed")),
            )
            .unwrap();

        runtime.destroy(parent);
        runtime.destroy(parent);

        assert_eq!(
            *log.borrow(),
            vec!["parent:beforeDestroy", "child:destroyed", "parent:destroyed"]
        );
        assert!(!runtime.contains(parent));
        assert!(!runtime.contains(child));
    }

    #[test]
    fn test_events_and_hook_events() {
        let (mut runtime, sink) = runtime();
        let log: Log = Rc::default();
        let id = runtime.create(runtime.root(), ComponentOptions::new()).unwrap();

        let seen = log.clone();
        runtime.with_vm(id, |vm| {
            vm.on("ping", move |_, args| {
                seen.borrow_mut().push(format!("ping:{}", args[0]));
                Ok(())
            });
            vm.on("ping", |_, _| anyhow::bail!("listener failed"));
        });
        let seen = log.clone();
        runtime.with_vm(id, |vm| {
            vm.once("hook:beforeDestroy", move |_, _| {
                seen.borrow_mut().push("hook event".into());
                Ok(())
            });
        });

        runtime.emit(id, "ping", &[serde_json::json!(1)]);
        runtime.destroy(id);

        assert_eq!(*log.borrow(), vec!["ping:1", "hook event"]);
        assert_eq!(sink.count(DiagnosticKind::ListenerFailure), 1);
    }

    #[test]
    fn test_unknown_constructor_falls_back_to_root() {
        let (mut runtime, sink) = runtime();
        let stale = ConstructorId::default();
        let id = runtime.create(stale, ComponentOptions::new()).unwrap();

        assert_eq!(runtime.instance(id).unwrap().ctor(), runtime.root());
        assert_eq!(sink.count(DiagnosticKind::ConstructionMisuse), 1);
    }
}
