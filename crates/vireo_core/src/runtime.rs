//! Runtime
//!
//! [`Runtime`] owns every constructor and instance, the collaborators, the
//! update queue and the diagnostic channel. Instances are addressed by
//! [`InstanceId`]; user code reaches them through [`Vm`] receivers handed to
//! hooks, methods, watchers and listeners.

use std::fmt;
use std::path::Path;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde_json::Value;
use slotmap::SlotMap;
use tracing::{debug, trace};

use crate::config::RuntimeConfig;
use crate::constructor::{ConstructorId, ConstructorRegistry};
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Diagnostics, InstanceTrace, TracingSink};
use crate::error::{CompileError, PatchError, VireoError};
use crate::host::{CompileOptions, CompiledTemplate, Host, NodeId, Patch, PatchContext, TemplateCompiler};
use crate::instance::{Instance, InstanceId};
use crate::merge::{merge_options, MergeStrategies};
use crate::options::{ComponentOptions, DirectiveFn, Filter, StateMap};
use crate::reactive::{DependencyGraph, ReactiveSystem};
use crate::scheduler::Scheduler;
use crate::vm::Vm;
use crate::vnode::{VComponent, VElement};

/// Callback run once the pending update queue has been flushed
pub type TickCallback = Box<dyn FnOnce(&mut Runtime)>;

/// Names that cannot be used as component names
const RESERVED_TAGS: &[&str] = &[
    "slot", "component", "html", "body", "head", "div", "span", "p", "a", "ul", "ol", "li",
    "img", "input", "button", "form", "table", "template", "script", "style",
];

/// The component runtime
pub struct Runtime {
    pub(crate) config: RuntimeConfig,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) constructors: ConstructorRegistry,
    pub(crate) strategies: MergeStrategies,
    pub(crate) instances: SlotMap<InstanceId, Instance>,
    pub(crate) scheduler: Scheduler,
    pub(crate) reactive: Box<dyn ReactiveSystem>,
    pub(crate) host: Box<dyn Host>,
    pub(crate) patch: Rc<dyn Patch>,
    /// Absent in runtime-only setups, where every component needs a render function
    pub(crate) compiler: Option<Rc<dyn TemplateCompiler>>,
    /// `#id` template references resolved so far
    pub(crate) template_lookups: FxHashMap<String, Option<String>>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config)
            .field("constructors", &self.constructors.len())
            .field("instances", &self.instances.len())
            .field("queued", &self.scheduler.len())
            .field("has_compiler", &self.compiler.is_some())
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The root constructor every other constructor descends from
    pub fn root(&self) -> ConstructorId {
        self.constructors.root()
    }

    pub fn constructors(&self) -> &ConstructorRegistry {
        &self.constructors
    }

    pub fn host(&self) -> &dyn Host {
        self.host.as_ref()
    }

    pub fn host_mut(&mut self) -> &mut dyn Host {
        self.host.as_mut()
    }

    pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(id)
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.instances.contains_key(id)
    }

    /// Number of live instances
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Read a state key of an instance
    pub fn state(&self, id: InstanceId, key: &str) -> Option<&Value> {
        self.instances.get(id)?.state.get(key)
    }

    /// Run `f` with a [`Vm`] receiver for `id`
    pub fn with_vm<R>(&mut self, id: InstanceId, f: impl FnOnce(&mut Vm<'_>) -> R) -> R {
        let mut vm = Vm::new(self, id);
        f(&mut vm)
    }

    // =========================================================================
    // Global API
    // =========================================================================

    /// Effective options of a constructor
    pub fn resolve_options(&mut self, ctor: ConstructorId) -> Rc<ComponentOptions> {
        let ctor = self.checked_ctor(ctor);
        self.constructors
            .resolve(ctor, &self.strategies)
            .or_else(|| self.constructors.own_options(self.constructors.root()))
            .unwrap_or_default()
    }

    /// Define a subclass of `super_ctor`
    pub fn extend(&mut self, super_ctor: ConstructorId, options: ComponentOptions) -> ConstructorId {
        let super_ctor = self.checked_ctor(super_ctor);
        if let Some(name) = &options.name {
            self.validate_component_name(name);
        }
        match self.constructors.extend(super_ctor, options, &self.strategies) {
            Some(id) => id,
            None => super_ctor,
        }
    }

    /// Merge `options` into the own options of `ctor`
    ///
    /// Every descendant of `ctor` observes the change on its next resolution.
    pub fn mixin(&mut self, ctor: ConstructorId, options: ComponentOptions) {
        let ctor = self.checked_ctor(ctor);
        let Some(own) = self.constructors.own_options(ctor) else {
            return;
        };
        let merged = merge_options(&own, &options, &self.strategies);
        self.constructors.set_own_options(ctor, Rc::new(merged));
        debug!("Runtime::mixin: options of {:?} replaced", ctor);
    }

    /// Define a component from options and register it globally under `name`
    pub fn component(&mut self, name: &str, options: ComponentOptions) -> ConstructorId {
        let options = if options.name.is_none() { options.name(name) } else { options };
        let ctor = self.extend(self.root(), options);
        self.register_component(name, ctor);
        ctor
    }

    /// Register an existing constructor globally under `name`
    pub fn register_component(&mut self, name: &str, ctor: ConstructorId) {
        self.validate_component_name(name);
        let name = name.to_string();
        self.update_root_options(|options| {
            Rc::make_mut(&mut options.components).insert(name, ctor);
        });
    }

    /// Register a directive globally
    pub fn directive<F>(&mut self, name: &str, directive: F)
    where
        F: Fn(&mut VElement, &Value) + 'static,
    {
        let directive: DirectiveFn = Rc::new(directive);
        let name = name.to_string();
        self.update_root_options(|options| {
            Rc::make_mut(&mut options.directives).insert(name, directive);
        });
    }

    /// Register a filter globally
    pub fn filter<F>(&mut self, name: &str, filter: F)
    where
        F: Fn(&Value) -> Value + 'static,
    {
        let filter: Filter = Rc::new(filter);
        let name = name.to_string();
        self.update_root_options(|options| {
            Rc::make_mut(&mut options.filters).insert(name, filter);
        });
    }

    /// Register a merge strategy for an `extra` option key
    pub fn set_merge_strategy<F>(&mut self, key: &str, strategy: F)
    where
        F: Fn(Option<&Value>, Option<&Value>) -> Option<Value> + 'static,
    {
        self.strategies.insert(key, strategy);
    }

    /// Compile a template with the configured compiler
    pub fn compile(&self, template: &str) -> Result<CompiledTemplate, CompileError> {
        let compiler = self
            .compiler
            .as_ref()
            .ok_or_else(|| CompileError::new("no template compiler is available"))?;
        let warn = |message: &str| {
            self.diagnostics
                .report(Diagnostic::new(DiagnosticKind::CompileFailure, message));
        };
        compiler.compile(
            template,
            &CompileOptions {
                warn: &warn,
                decode_newlines: self.config.decode_newlines,
                delimiters: self.config.delimiters.as_ref(),
            },
        )
    }

    fn update_root_options(&mut self, edit: impl FnOnce(&mut ComponentOptions)) {
        let root = self.root();
        let Some(own) = self.constructors.own_options(root) else {
            return;
        };
        let mut options = (*own).clone();
        edit(&mut options);
        self.constructors.set_own_options(root, Rc::new(options));
    }

    /// Map a possibly stale constructor handle to a usable one
    pub(crate) fn checked_ctor(&self, ctor: ConstructorId) -> ConstructorId {
        if self.constructors.contains(ctor) {
            return ctor;
        }
        self.report(Diagnostic::new(
            DiagnosticKind::ConstructionMisuse,
            "unknown constructor handle; falling back to the root constructor",
        ));
        self.constructors.root()
    }

    fn validate_component_name(&self, name: &str) {
        let mut chars = name.chars();
        let well_formed = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-');
        if !well_formed {
            self.report(Diagnostic::new(
                DiagnosticKind::InvalidComponentName,
                format!("invalid component name `{}`: must start with a letter and contain only letters, digits, `-` and `_`", name),
            ));
        } else if RESERVED_TAGS.contains(&name) {
            self.report(Diagnostic::new(
                DiagnosticKind::InvalidComponentName,
                format!("do not use built-in or reserved HTML elements as component name: {}", name),
            ));
        }
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    pub(crate) fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics.report(diagnostic);
    }

    /// Report a diagnostic about `id`
    pub(crate) fn report_for(&self, id: InstanceId, diagnostic: Diagnostic) {
        let diagnostic = match self.trace(id) {
            Some(trace) => diagnostic.with_instance(trace),
            None => diagnostic,
        };
        self.diagnostics.report(diagnostic);
    }

    pub(crate) fn trace(&self, id: InstanceId) -> Option<InstanceTrace> {
        let instance = self.instances.get(id)?;
        Some(InstanceTrace {
            uid: instance.uid,
            name: instance.options.name.clone(),
            tag: instance.options.component_tag.clone(),
        })
    }

    // =========================================================================
    // State and scheduling
    // =========================================================================

    /// Write a state key
    ///
    /// Writing an equal value is a no-op. Otherwise watchers of the key and
    /// every instance whose last render read it are queued.
    pub fn set_state(&mut self, id: InstanceId, key: &str, value: Value) {
        let Some(instance) = self.instances.get_mut(id) else {
            return;
        };
        if instance.is_being_destroyed {
            return;
        }
        let old = instance.state.get(key).cloned();
        if old.as_ref() == Some(&value) {
            return;
        }
        instance.state.insert(key.to_string(), value);
        let uid = instance.uid;
        let watched = instance.options.watch.contains_key(key);

        if old.is_none() {
            if let Err(err) = self.reactive.observe(id, &[key.to_string()]) {
                debug!("Runtime::set_state: {} is not observable: {}", key, err);
            }
        }
        if watched {
            self.scheduler.queue_watch(uid, id, key, old.unwrap_or(Value::Null));
        }
        for watcher in self.reactive.notify(id, key) {
            self.queue_update(watcher);
        }
    }

    /// Queue a re-render of `id`
    pub(crate) fn queue_update(&mut self, id: InstanceId) {
        if let Some(instance) = self.instances.get(id) {
            if self.scheduler.queue_render(instance.uid, id) {
                trace!("Runtime::queue_update: uid {} queued", instance.uid);
            }
        }
    }

    /// Run `callback` after the next flush of the update queue
    ///
    /// A failing callback is reported as `NextTickFailure`; later callbacks
    /// and flushes still run.
    pub fn next_tick(&mut self, callback: impl FnOnce(&mut Runtime) + 'static) {
        self.scheduler.push_tick(Box::new(callback));
    }

    /// Whether updates or tick callbacks are pending
    pub fn has_pending(&self) -> bool {
        !self.scheduler.is_empty()
    }

    /// Drain the update queue
    ///
    /// Jobs run in uid order (parents before children). For each instance the
    /// pending watchers run first, then at most one re-render. Tick callbacks
    /// run once the queue is empty; anything they queue is drained too.
    /// Calling `flush` from inside a flush is a no-op.
    pub fn flush(&mut self) {
        if self.scheduler.is_flushing() {
            return;
        }
        self.scheduler.set_flushing(true);
        let mut runs: FxHashMap<u64, u32> = FxHashMap::default();

        loop {
            while let Some((uid, mut job)) = self.scheduler.pop() {
                if !self.instances.contains_key(job.id) {
                    continue;
                }
                let count = runs.entry(uid).or_insert(0);
                *count += 1;
                if *count > self.config.max_update_count {
                    self.report_for(
                        job.id,
                        Diagnostic::new(
                            DiagnosticKind::InfiniteUpdateLoop,
                            format!(
                                "you may have an infinite update loop: instance re-queued more than {} times in one flush",
                                self.config.max_update_count
                            ),
                        ),
                    );
                    continue;
                }

                // Watchers may write more watched keys of the same instance
                while !job.watched.is_empty() {
                    let watched = std::mem::take(&mut job.watched);
                    for (key, old) in watched {
                        self.run_watcher(job.id, &key, old);
                    }
                    if let Some(again) = self.scheduler.take(uid) {
                        job.absorb(again);
                    }
                }

                if job.render {
                    self.run_update(job.id);
                }
            }

            let ticks = self.scheduler.take_ticks();
            if ticks.is_empty() {
                break;
            }
            for tick in ticks {
                let result = crate::instance::guarded(|| {
                    tick(self);
                    Ok(())
                });
                if let Err(message) = result {
                    self.report(
                        Diagnostic::new(DiagnosticKind::NextTickFailure, message).with_phase("nextTick"),
                    );
                }
            }
        }

        self.scheduler.set_flushing(false);
    }

    fn run_watcher(&mut self, id: InstanceId, key: &str, old: Value) {
        let Some(instance) = self.instances.get(id) else {
            return;
        };
        let Some(watcher) = instance.options.watch.get(key).cloned() else {
            return;
        };
        let new = instance.state.get(key).cloned().unwrap_or(Value::Null);
        if new == old {
            return;
        }
        let result = crate::instance::guarded(|| {
            let mut vm = Vm::new(self, id);
            watcher(&mut vm, &new, &old)
        });
        if let Err(message) = result {
            self.report_for(
                id,
                Diagnostic::new(DiagnosticKind::WatcherFailure, message).with_phase(format!("watch:{}", key)),
            );
        }
    }
}

// =========================================================================
// Patch context
// =========================================================================

/// [`PatchContext`] handed to the patch collaborator while rendering `owner`
pub(crate) struct PatchSession<'a> {
    runtime: &'a mut Runtime,
    owner: InstanceId,
}

impl<'a> PatchSession<'a> {
    pub(crate) fn new(runtime: &'a mut Runtime, owner: InstanceId) -> Self {
        Self { runtime, owner }
    }
}

impl PatchContext for PatchSession<'_> {
    fn host(&mut self) -> &mut dyn Host {
        self.runtime.host.as_mut()
    }

    fn create_component(&mut self, vnode: &VComponent) -> Result<NodeId, PatchError> {
        self.runtime.create_child_component(self.owner, vnode)
    }

    fn update_component(&mut self, node: NodeId, vnode: &VComponent) -> Result<NodeId, PatchError> {
        let child = self.runtime.host.owner(node).ok_or(PatchError::MissingNode)?;
        self.runtime.update_from_parent(child, vnode);
        Ok(self
            .runtime
            .instances
            .get(child)
            .and_then(|instance| instance.el)
            .unwrap_or(node))
    }

    fn destroy_component(&mut self, node: NodeId) {
        if let Some(child) = self.runtime.host.owner(node) {
            self.runtime.destroy(child);
        }
    }
}

// =========================================================================
// Builder
// =========================================================================

/// Builder for [`Runtime`]
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    host: Option<Box<dyn Host>>,
    patch: Option<Rc<dyn Patch>>,
    compiler: Option<Rc<dyn TemplateCompiler>>,
    reactive: Option<Box<dyn ReactiveSystem>>,
    sink: Option<Rc<dyn DiagnosticSink>>,
    root_options: ComponentOptions,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            host: None,
            patch: None,
            compiler: None,
            reactive: None,
            sink: None,
            root_options: ComponentOptions::new(),
        }
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the configuration from a TOML file
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Result<Self, VireoError> {
        self.config = RuntimeConfig::load(path)?;
        Ok(self)
    }

    pub fn host(mut self, host: impl Host + 'static) -> Self {
        self.host = Some(Box::new(host));
        self
    }

    pub fn patch(mut self, patch: impl Patch + 'static) -> Self {
        self.patch = Some(Rc::new(patch));
        self
    }

    pub fn compiler(mut self, compiler: impl TemplateCompiler + 'static) -> Self {
        self.compiler = Some(Rc::new(compiler));
        self
    }

    pub fn reactive(mut self, reactive: impl ReactiveSystem + 'static) -> Self {
        self.reactive = Some(Box::new(reactive));
        self
    }

    /// Diagnostic sink (defaults to [`TracingSink`])
    pub fn diagnostics(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Some(Rc::new(sink));
        self
    }

    /// Options declared by the root constructor
    pub fn root_options(mut self, options: ComponentOptions) -> Self {
        self.root_options = options;
        self
    }

    pub fn build(self) -> Result<Runtime, VireoError> {
        let host = self.host.ok_or(VireoError::MissingCollaborator("host"))?;
        let patch = self.patch.ok_or(VireoError::MissingCollaborator("patch"))?;
        let sink = self.sink.unwrap_or_else(|| Rc::new(TracingSink));
        let diagnostics = Diagnostics::new(sink, self.config.is_silent());

        debug!(
            "RuntimeBuilder::build: compiler={}, silent={}",
            self.compiler.is_some(),
            self.config.is_silent()
        );

        Ok(Runtime {
            config: self.config,
            diagnostics,
            constructors: ConstructorRegistry::new(self.root_options),
            strategies: MergeStrategies::new(),
            instances: SlotMap::with_key(),
            scheduler: Scheduler::new(),
            reactive: self.reactive.unwrap_or_else(|| Box::new(DependencyGraph::new())),
            host,
            patch,
            compiler: self.compiler,
            template_lookups: FxHashMap::default(),
        })
    }
}

/// Convenience for building a [`StateMap`] from JSON
pub fn state_from_json(value: Value) -> StateMap {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        _ => StateMap::new(),
    }
}
