//! Option merging
//!
//! Combines a parent option bag with a child option bag, one strategy per key
//! class:
//!
//! | Key class | Strategy |
//! |-----------|----------|
//! | lifecycle hooks | parent hooks, then child hooks |
//! | components / directives / filters | new layer over the parent registry |
//! | data | child initializer wins, else parent |
//! | props / methods / computed / watch | union, child member replaces same-named parent member |
//! | everything else | child value wins if present, else parent |
//!
//! Merging never mutates its inputs.

use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::options::{ComponentOptions, HookList, Registry};

/// Strategy for merging an unrecognized (`extra`) key: `(parent, child) -> merged`
pub type MergeStrategy = Rc<dyn Fn(Option<&Value>, Option<&Value>) -> Option<Value>>;

/// User-registered strategies for `extra` keys
#[derive(Clone, Default)]
pub struct MergeStrategies {
    custom: FxHashMap<String, MergeStrategy>,
}

impl MergeStrategies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy for an `extra` key
    pub fn insert<F>(&mut self, key: impl Into<String>, strategy: F)
    where
        F: Fn(Option<&Value>, Option<&Value>) -> Option<Value> + 'static,
    {
        self.custom.insert(key.into(), Rc::new(strategy));
    }

    pub fn get(&self, key: &str) -> Option<&MergeStrategy> {
        self.custom.get(key)
    }

    fn merge_extra(&self, key: &str, parent: Option<&Value>, child: Option<&Value>) -> Option<Value> {
        match self.custom.get(key) {
            Some(strategy) => strategy(parent, child),
            None => child.or(parent).cloned(),
        }
    }
}

/// Merge two option bags into a new one
///
/// The child's `extends` and `mixins` are folded into the parent first, so
/// their hooks run before the child's own hooks.
pub fn merge_options(
    parent: &ComponentOptions,
    child: &ComponentOptions,
    strategies: &MergeStrategies,
) -> ComponentOptions {
    if child.extends.is_some() || !child.mixins.is_empty() {
        let mut base = match &child.extends {
            Some(extends) => merge_options(parent, extends, strategies),
            None => parent.clone(),
        };
        for mixin in &child.mixins {
            base = merge_options(&base, mixin, strategies);
        }
        return merge_fields(&base, child, strategies);
    }
    merge_fields(parent, child, strategies)
}

fn merge_fields(
    parent: &ComponentOptions,
    child: &ComponentOptions,
    strategies: &MergeStrategies,
) -> ComponentOptions {
    // Render artifacts travel together
    let (render, static_render_fns) = match &child.render {
        Some(render) => (Some(render.clone()), child.static_render_fns.clone()),
        None => (parent.render.clone(), parent.static_render_fns.clone()),
    };

    ComponentOptions {
        name: child.name.clone().or_else(|| parent.name.clone()),
        hooks: merge_hooks(&parent.hooks, &child.hooks),
        data: child.data.clone().or_else(|| parent.data.clone()),
        props: merge_members(&parent.props, &child.props),
        methods: merge_members(&parent.methods, &child.methods),
        computed: merge_members(&parent.computed, &child.computed),
        watch: merge_members(&parent.watch, &child.watch),
        components: Rc::new(Registry::layered(parent.components.clone(), &child.components)),
        directives: Rc::new(Registry::layered(parent.directives.clone(), &child.directives)),
        filters: Rc::new(Registry::layered(parent.filters.clone(), &child.filters)),
        render,
        static_render_fns,
        template: child.template.clone().or_else(|| parent.template.clone()),
        el: child.el.clone().or_else(|| parent.el.clone()),
        delimiters: child.delimiters.clone().or_else(|| parent.delimiters.clone()),
        is_abstract: child.is_abstract.or(parent.is_abstract),
        // Already folded in
        mixins: Vec::new(),
        extends: None,
        extra: merge_extra(&parent.extra, &child.extra, strategies),
        parent: child.parent.or(parent.parent),
        props_data: child.props_data.clone().or_else(|| parent.props_data.clone()),
        parent_vnode: child.parent_vnode.clone().or_else(|| parent.parent_vnode.clone()),
        parent_listeners: child
            .parent_listeners
            .clone()
            .or_else(|| parent.parent_listeners.clone()),
        render_children: if child.render_children.is_empty() {
            parent.render_children.clone()
        } else {
            child.render_children.clone()
        },
        component_tag: child.component_tag.clone().or_else(|| parent.component_tag.clone()),
    }
}

fn merge_hooks<K>(parent: &IndexMap<K, HookList>, child: &IndexMap<K, HookList>) -> IndexMap<K, HookList>
where
    K: Clone + Eq + std::hash::Hash,
{
    let mut merged = parent.clone();
    for (name, hooks) in child {
        merged
            .entry(name.clone())
            .or_default()
            .extend(hooks.iter().cloned());
    }
    merged
}

fn merge_members<V: Clone>(parent: &IndexMap<String, V>, child: &IndexMap<String, V>) -> IndexMap<String, V> {
    let mut merged = parent.clone();
    for (name, member) in child {
        merged.insert(name.clone(), member.clone());
    }
    merged
}

fn merge_extra(
    parent: &IndexMap<String, Value>,
    child: &IndexMap<String, Value>,
    strategies: &MergeStrategies,
) -> IndexMap<String, Value> {
    let mut merged = IndexMap::new();
    for key in parent.keys().chain(child.keys()) {
        if merged.contains_key(key) {
            continue;
        }
        if let Some(value) = strategies.merge_extra(key, parent.get(key), child.get(key)) {
            merged.insert(key.clone(), value);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{HookName, PropDef};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_hooks_concatenate_parent_first() {
        let parent = ComponentOptions::new()
            .hook(HookName::CREATED, |_| Ok(()))
            .hook(HookName::MOUNTED, |_| Ok(()));
        let child = ComponentOptions::new()
            .hook(HookName::CREATED, |_| Ok(()))
            .hook(HookName::custom("activated"), |_| Ok(()));

        let merged = merge_options(&parent, &child, &MergeStrategies::new());

        let created = merged.hooks_for(&HookName::CREATED);
        assert_eq!(created.len(), 2);
        assert!(Rc::ptr_eq(&created[0], &parent.hooks_for(&HookName::CREATED)[0]));
        assert!(Rc::ptr_eq(&created[1], &child.hooks_for(&HookName::CREATED)[0]));
        assert_eq!(merged.hooks_for(&HookName::MOUNTED).len(), 1);
        assert_eq!(merged.hooks_for(&HookName::custom("activated")).len(), 1);

        // Inputs untouched
        assert_eq!(parent.hooks_for(&HookName::CREATED).len(), 1);
        assert_eq!(child.hooks_for(&HookName::CREATED).len(), 1);
    }

    #[test]
    fn test_members_child_replaces_same_name() {
        let parent = ComponentOptions::new()
            .prop("size", PropDef::with_default(1))
            .prop("label", PropDef::with_default("parent"))
            .method("greet", |_, _| Ok(json!("parent")));
        let child = ComponentOptions::new()
            .prop("label", PropDef::with_default("child"))
            .method("greet", |_, _| Ok(json!("child")));

        let merged = merge_options(&parent, &child, &MergeStrategies::new());

        assert_eq!(merged.props.len(), 2);
        assert_eq!(merged.props["size"].default, Some(json!(1)));
        assert_eq!(merged.props["label"].default, Some(json!("child")));
        assert!(Rc::ptr_eq(&merged.methods["greet"], &child.methods["greet"]));
    }

    #[test]
    fn test_data_child_wins_outright() {
        let parent = ComponentOptions::new().data(|_| Ok(crate::state! { "a" => 1 }));
        let child = ComponentOptions::new().data(|_| Ok(crate::state! { "b" => 2 }));

        let merged = merge_options(&parent, &child, &MergeStrategies::new());
        assert!(Rc::ptr_eq(merged.data.as_ref().unwrap(), child.data.as_ref().unwrap()));

        let merged = merge_options(&parent, &ComponentOptions::new(), &MergeStrategies::new());
        assert!(Rc::ptr_eq(merged.data.as_ref().unwrap(), parent.data.as_ref().unwrap()));
    }

    #[test]
    fn test_registries_layer_over_parent() {
        let parent = ComponentOptions::new().filter("upper", |v| v.clone());
        let child = ComponentOptions::new().filter("lower", |v| v.clone());

        let merged = merge_options(&parent, &child, &MergeStrategies::new());

        assert!(merged.filters.get("upper").is_some());
        assert!(merged.filters.get("lower").is_some());
        assert!(merged.filters.get_own("upper").is_none());
        assert!(parent.filters.get("lower").is_none());
    }

    #[test]
    fn test_extra_default_and_custom_strategy() {
        let parent = ComponentOptions::new().extra("theme", "dark").extra("tags", json!(["a"]));
        let child = ComponentOptions::new().extra("tags", json!(["b"]));

        let merged = merge_options(&parent, &child, &MergeStrategies::new());
        assert_eq!(merged.extra["theme"], json!("dark"));
        assert_eq!(merged.extra["tags"], json!(["b"]));

        let mut strategies = MergeStrategies::new();
        strategies.insert("tags", |parent, child| {
            let mut all = Vec::new();
            for side in [parent, child].into_iter().flatten() {
                if let Value::Array(items) = side {
                    all.extend(items.iter().cloned());
                }
            }
            Some(Value::Array(all))
        });
        let merged = merge_options(&parent, &child, &strategies);
        assert_eq!(merged.extra["tags"], json!(["a", "b"]));
    }

    #[test]
    fn test_mixins_merge_before_child() {
        let mixin = ComponentOptions::new()
            .hook(HookName::CREATED, |_| Ok(()))
            .extra("from", "mixin");
        let child = ComponentOptions::new()
            .mixin(mixin.clone())
            .hook(HookName::CREATED, |_| Ok(()));

        let merged = merge_options(&ComponentOptions::new(), &child, &MergeStrategies::new());
        let created = merged.hooks_for(&HookName::CREATED);
        assert_eq!(created.len(), 2);
        assert!(Rc::ptr_eq(&created[0], &mixin.hooks_for(&HookName::CREATED)[0]));
        assert_eq!(merged.extra["from"], json!("mixin"));
        assert!(merged.mixins.is_empty());
    }

    #[test]
    fn test_render_and_static_fns_travel_together() {
        let parent = ComponentOptions::new().render(|_| Ok(crate::VNode::text("parent")));
        let child = ComponentOptions::new();

        let merged = merge_options(&parent, &child, &MergeStrategies::new());
        assert!(merged.render.is_some());
        assert!(merged.static_render_fns.is_empty());
    }
}
