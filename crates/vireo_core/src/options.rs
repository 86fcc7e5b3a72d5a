//! Component option bags
//!
//! [`ComponentOptions`] is the merged configuration describing a constructor's
//! or an instance's behavior: lifecycle hooks, state initializers, member maps,
//! asset registries and render artifacts.
//!
//! All callables are stored behind `Rc` so that option bags can be cloned and
//! merged cheaply; a merged bag shares its callables with its inputs.

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde_json::Value;
use smallvec::SmallVec;

use crate::constructor::ConstructorId;
use crate::host::NodeId;
use crate::instance::InstanceId;
use crate::vm::{RenderScope, Vm};
use crate::vnode::{VElement, VNode};

/// Reactive state of an instance (props and data), in declaration order
pub type StateMap = IndexMap<String, Value>;

/// A lifecycle hook callable; the instance is passed as explicit receiver
pub type Hook = Rc<dyn Fn(&mut Vm<'_>) -> anyhow::Result<()>>;

/// Hooks registered for one phase, in merge order
pub type HookList = SmallVec<[Hook; 2]>;

/// Data initializer; receives the resolved props
pub type DataFn = Rc<dyn Fn(&StateMap) -> anyhow::Result<StateMap>>;

/// Instance method
pub type Method = Rc<dyn Fn(&mut Vm<'_>, &[Value]) -> anyhow::Result<Value>>;

/// Computed property getter; reads performed through the scope are tracked
pub type Computed = Rc<dyn Fn(&mut RenderScope<'_>) -> Value>;

/// Watch callback, called with `(new, old)`
pub type Watcher = Rc<dyn Fn(&mut Vm<'_>, &Value, &Value) -> anyhow::Result<()>>;

/// Event listener, called with the emitted arguments
pub type Listener = Rc<dyn Fn(&mut Vm<'_>, &[Value]) -> anyhow::Result<()>>;

/// Render function producing the instance's virtual tree
pub type RenderFn = Rc<dyn Fn(&mut RenderScope<'_>) -> anyhow::Result<VNode>>;

/// Directive applied to a rendered element with its bound value
pub type DirectiveFn = Rc<dyn Fn(&mut VElement, &Value)>;

/// Value filter used by template pipes
pub type Filter = Rc<dyn Fn(&Value) -> Value>;

// =========================================================================
// Hook names
// =========================================================================

/// Name of a lifecycle hook phase
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct HookName(Cow<'static, str>);

impl HookName {
    pub const BEFORE_CREATE: HookName = HookName(Cow::Borrowed("beforeCreate"));
    pub const CREATED: HookName = HookName(Cow::Borrowed("created"));
    pub const BEFORE_MOUNT: HookName = HookName(Cow::Borrowed("beforeMount"));
    pub const MOUNTED: HookName = HookName(Cow::Borrowed("mounted"));
    pub const BEFORE_UPDATE: HookName = HookName(Cow::Borrowed("beforeUpdate"));
    pub const UPDATED: HookName = HookName(Cow::Borrowed("updated"));
    pub const BEFORE_DESTROY: HookName = HookName(Cow::Borrowed("beforeDestroy"));
    pub const DESTROYED: HookName = HookName(Cow::Borrowed("destroyed"));

    /// The built-in lifecycle phases in the order they fire
    pub const LIFECYCLE: [HookName; 8] = [
        Self::BEFORE_CREATE,
        Self::CREATED,
        Self::BEFORE_MOUNT,
        Self::MOUNTED,
        Self::BEFORE_UPDATE,
        Self::UPDATED,
        Self::BEFORE_DESTROY,
        Self::DESTROYED,
    ];

    /// A custom hook phase, dispatched with [`crate::Runtime::call_hook`]
    pub fn custom(name: impl Into<String>) -> Self {
        HookName(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HookName({})", self.0)
    }
}

impl From<&str> for HookName {
    fn from(name: &str) -> Self {
        HookName::LIFECYCLE
            .iter()
            .find(|hook| hook.as_str() == name)
            .cloned()
            .unwrap_or_else(|| HookName::custom(name))
    }
}

// =========================================================================
// Registries
// =========================================================================

/// Layered asset registry (components, directives, filters)
///
/// Own entries shadow the entries of the parent layer; lookups fall back to
/// the parent when a name is absent. Adding an entry never touches the parent.
pub struct Registry<T> {
    entries: FxHashMap<String, T>,
    parent: Option<Rc<Registry<T>>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: FxHashMap::default(),
            parent: None,
        }
    }
}

impl<T: Clone> Clone for Registry<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            parent: self.parent.clone(),
        }
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a layer over `parent` holding every entry visible through `child`
    ///
    /// `child`'s own layers are flattened, nearest layer winning, so a child
    /// that is itself layered keeps all of its entries.
    pub fn layered(parent: Rc<Registry<T>>, child: &Registry<T>) -> Self
    where
        T: Clone,
    {
        let mut layers = vec![child];
        while let Some(next) = layers.last().and_then(|layer| layer.parent.as_deref()) {
            layers.push(next);
        }

        let mut entries = FxHashMap::default();
        for layer in layers.into_iter().rev() {
            for (name, value) in &layer.entries {
                entries.insert(name.clone(), value.clone());
            }
        }
        Self {
            entries,
            parent: Some(parent),
        }
    }

    /// Insert an own entry, shadowing any same-named parent entry
    pub fn insert(&mut self, name: impl Into<String>, value: T) {
        self.entries.insert(name.into(), value);
    }

    /// Look up a name in this layer, then in the parent layers
    pub fn get(&self, name: &str) -> Option<&T> {
        let mut layer = self;
        loop {
            if let Some(value) = layer.entries.get(name) {
                return Some(value);
            }
            layer = layer.parent.as_deref()?;
        }
    }

    /// Look up a name in this layer only
    pub fn get_own(&self, name: &str) -> Option<&T> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Resolve an asset id, trying the id as written, then its camelCase and
    /// PascalCase forms (`my-widget` → `myWidget` → `MyWidget`)
    pub fn resolve(&self, id: &str) -> Option<&T> {
        if let Some(value) = self.get(id) {
            return Some(value);
        }
        let camel = camelize(id);
        if let Some(value) = self.get(&camel) {
            return Some(value);
        }
        self.get(&capitalize(&camel))
    }

    /// Names of the own entries of this layer
    pub fn own_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn parent(&self) -> Option<&Rc<Registry<T>>> {
        self.parent.as_ref()
    }
}

impl<T> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.own_names().collect();
        names.sort_unstable();
        f.debug_struct("Registry")
            .field("own", &names)
            .field("layered", &self.parent.is_some())
            .finish()
    }
}

fn camelize(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    let mut upper = false;
    for c in id.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn capitalize(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// =========================================================================
// Templates and mount targets
// =========================================================================

/// Template source of a component
#[derive(Clone, Debug, PartialEq)]
pub enum Template {
    /// Template text, or `#id` referring to an element whose content is the template
    Source(String),
    /// An element whose inner content is the template
    Element(NodeId),
}

impl From<&str> for Template {
    fn from(source: &str) -> Self {
        Template::Source(source.to_string())
    }
}

impl From<String> for Template {
    fn from(source: String) -> Self {
        Template::Source(source)
    }
}

/// Element an instance is mounted onto
#[derive(Clone, Debug, PartialEq)]
pub enum MountTarget {
    Selector(String),
    Node(NodeId),
}

impl From<&str> for MountTarget {
    fn from(selector: &str) -> Self {
        MountTarget::Selector(selector.to_string())
    }
}

impl From<NodeId> for MountTarget {
    fn from(node: NodeId) -> Self {
        MountTarget::Node(node)
    }
}

/// Declared prop
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropDef {
    pub default: Option<Value>,
    pub required: bool,
}

impl PropDef {
    pub fn with_default(value: impl Into<Value>) -> Self {
        Self {
            default: Some(value.into()),
            required: false,
        }
    }

    pub fn required() -> Self {
        Self {
            default: None,
            required: true,
        }
    }
}

// =========================================================================
// Option bag
// =========================================================================

/// A component option bag
#[derive(Clone, Default)]
pub struct ComponentOptions {
    pub name: Option<String>,
    pub hooks: IndexMap<HookName, HookList>,
    pub data: Option<DataFn>,
    pub props: IndexMap<String, PropDef>,
    pub methods: IndexMap<String, Method>,
    pub computed: IndexMap<String, Computed>,
    pub watch: IndexMap<String, Watcher>,
    pub components: Rc<Registry<ConstructorId>>,
    pub directives: Rc<Registry<DirectiveFn>>,
    pub filters: Rc<Registry<Filter>>,
    pub render: Option<RenderFn>,
    pub static_render_fns: Vec<RenderFn>,
    pub template: Option<Template>,
    pub el: Option<MountTarget>,
    pub delimiters: Option<(String, String)>,
    pub is_abstract: Option<bool>,
    /// Option bags merged in before this one
    pub mixins: Vec<Rc<ComponentOptions>>,
    /// Option bag this one extends, merged in before the mixins
    pub extends: Option<Rc<ComponentOptions>>,
    /// Keys the runtime does not interpret
    pub extra: IndexMap<String, Value>,

    // Fields assigned when a component is instantiated by the runtime
    pub parent: Option<InstanceId>,
    pub props_data: Option<StateMap>,
    pub parent_vnode: Option<Rc<VNode>>,
    pub parent_listeners: Option<IndexMap<String, Listener>>,
    pub render_children: Vec<VNode>,
    pub component_tag: Option<String>,
}

impl ComponentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Append a hook to a phase
    pub fn hook<F>(mut self, name: HookName, hook: F) -> Self
    where
        F: Fn(&mut Vm<'_>) -> anyhow::Result<()> + 'static,
    {
        self.hooks.entry(name).or_default().push(Rc::new(hook));
        self
    }

    pub fn data<F>(mut self, data: F) -> Self
    where
        F: Fn(&StateMap) -> anyhow::Result<StateMap> + 'static,
    {
        self.data = Some(Rc::new(data));
        self
    }

    pub fn prop(mut self, name: impl Into<String>, def: PropDef) -> Self {
        self.props.insert(name.into(), def);
        self
    }

    pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&mut Vm<'_>, &[Value]) -> anyhow::Result<Value> + 'static,
    {
        self.methods.insert(name.into(), Rc::new(method));
        self
    }

    pub fn computed<F>(mut self, name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&mut RenderScope<'_>) -> Value + 'static,
    {
        self.computed.insert(name.into(), Rc::new(getter));
        self
    }

    pub fn watch<F>(mut self, key: impl Into<String>, watcher: F) -> Self
    where
        F: Fn(&mut Vm<'_>, &Value, &Value) -> anyhow::Result<()> + 'static,
    {
        self.watch.insert(key.into(), Rc::new(watcher));
        self
    }

    pub fn component(mut self, name: impl Into<String>, ctor: ConstructorId) -> Self {
        Rc::make_mut(&mut self.components).insert(name, ctor);
        self
    }

    pub fn directive<F>(mut self, name: impl Into<String>, directive: F) -> Self
    where
        F: Fn(&mut VElement, &Value) + 'static,
    {
        Rc::make_mut(&mut self.directives).insert(name, Rc::new(directive) as DirectiveFn);
        self
    }

    pub fn filter<F>(mut self, name: impl Into<String>, filter: F) -> Self
    where
        F: Fn(&Value) -> Value + 'static,
    {
        Rc::make_mut(&mut self.filters).insert(name, Rc::new(filter) as Filter);
        self
    }

    pub fn render<F>(mut self, render: F) -> Self
    where
        F: Fn(&mut RenderScope<'_>) -> anyhow::Result<VNode> + 'static,
    {
        self.render = Some(Rc::new(render));
        self
    }

    pub fn template(mut self, template: impl Into<Template>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn el(mut self, target: impl Into<MountTarget>) -> Self {
        self.el = Some(target.into());
        self
    }

    pub fn delimiters(mut self, open: impl Into<String>, close: impl Into<String>) -> Self {
        self.delimiters = Some((open.into(), close.into()));
        self
    }

    pub fn abstract_component(mut self) -> Self {
        self.is_abstract = Some(true);
        self
    }

    pub fn mixin(mut self, mixin: ComponentOptions) -> Self {
        self.mixins.push(Rc::new(mixin));
        self
    }

    pub fn extends(mut self, base: ComponentOptions) -> Self {
        self.extends = Some(Rc::new(base));
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn parent(mut self, parent: InstanceId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn props_data(mut self, props: StateMap) -> Self {
        self.props_data = Some(props);
        self
    }

    /// Hooks registered for a phase, in invocation order
    pub fn hooks_for(&self, name: &HookName) -> &[Hook] {
        self.hooks.get(name).map(|hooks| hooks.as_slice()).unwrap_or(&[])
    }
}

impl fmt::Debug for ComponentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hooks: Vec<(String, usize)> = self
            .hooks
            .iter()
            .map(|(name, list)| (name.to_string(), list.len()))
            .collect();
        f.debug_struct("ComponentOptions")
            .field("name", &self.name)
            .field("hooks", &hooks)
            .field("props", &self.props.keys().collect::<Vec<_>>())
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("computed", &self.computed.keys().collect::<Vec<_>>())
            .field("watch", &self.watch.keys().collect::<Vec<_>>())
            .field("components", &self.components)
            .field("has_render", &self.render.is_some())
            .field("template", &self.template)
            .field("el", &self.el)
            .field("extra", &self.extra)
            .finish_non_exhaustive()
    }
}
