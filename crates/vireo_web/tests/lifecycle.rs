//! Integration tests for instance creation, hooks, inheritance and teardown

mod common;

use std::rc::Rc;

use common::{body_html, log, record_hooks, setup};
use pretty_assertions::assert_eq;
use vireo_core::{state, ComponentOptions, DiagnosticKind, HookName, LifecycleState};

#[test]
fn test_hooks_fire_in_lifecycle_order() {
    let (mut runtime, sink) = setup(r#"<div id="app"></div>"#);
    let log = log();

    let options = ComponentOptions::new()
        .template("<div>{{ n }}</div>")
        .data(|_| Ok(state! { "n" => 0 }))
        .el("#app");
    let id = runtime
        .create(runtime.root(), record_hooks(options, "app", &log))
        .unwrap();

    assert_eq!(
        *log.borrow(),
        vec!["app:beforeCreate", "app:created", "app:beforeMount", "app:mounted"]
    );
    assert_eq!(body_html(&runtime), "<div>0</div>");

    runtime.with_vm(id, |vm| vm.set("n", 1));
    runtime.flush();
    assert_eq!(body_html(&runtime), "<div>1</div>");

    runtime.destroy(id);
    assert_eq!(
        log.borrow()[4..].to_vec(),
        vec!["app:beforeUpdate", "app:updated", "app:beforeDestroy", "app:destroyed"]
    );
    assert!(!runtime.contains(id));
    assert!(sink.is_empty());
}

#[test]
fn test_failing_hook_does_not_stop_the_others() {
    let (mut runtime, sink) = setup("");
    let log = log();
    let seen = log.clone();

    let id = runtime
        .create(
            runtime.root(),
            ComponentOptions::new()
                .hook(HookName::CREATED, |_| Err(anyhow::anyhow!("boom")))
                .hook(HookName::CREATED, move |_| {
                    seen.borrow_mut().push("second".to_string());
                    Ok(())
                }),
        )
        .unwrap();

    assert_eq!(*log.borrow(), vec!["second"]);
    assert_eq!(sink.count(DiagnosticKind::HookFailure), 1);
    assert_eq!(
        runtime.instance(id).unwrap().lifecycle().current(),
        LifecycleState::RenderInitialized
    );
    let failure = &sink.records()[0];
    assert_eq!(failure.phase.as_deref(), Some("created"));
    assert!(failure.message.contains("boom"));
}

#[test]
fn test_failing_before_create_does_not_block_created() {
    let (mut runtime, sink) = setup("");
    let log = log();
    let after_failure = log.clone();
    let created = log.clone();

    let id = runtime
        .create(
            runtime.root(),
            ComponentOptions::new()
                .data(|_| Ok(state! { "ready" => true }))
                .hook(HookName::BEFORE_CREATE, |_| Err(anyhow::anyhow!("not yet")))
                .hook(HookName::BEFORE_CREATE, move |_| {
                    after_failure.borrow_mut().push("beforeCreate".to_string());
                    Ok(())
                })
                .hook(HookName::CREATED, move |vm| {
                    created.borrow_mut().push(format!("created:{}", vm.get("ready")));
                    Ok(())
                }),
        )
        .unwrap();

    assert_eq!(*log.borrow(), vec!["beforeCreate", "created:true"]);
    assert_eq!(sink.count(DiagnosticKind::HookFailure), 1);
    assert_eq!(sink.records()[0].phase.as_deref(), Some("beforeCreate"));
    assert_eq!(
        runtime.instance(id).unwrap().lifecycle().current(),
        LifecycleState::RenderInitialized
    );
}

#[test]
fn test_inheritance_chain_and_invalidation() {
    let (mut runtime, _) = setup("");
    let log = log();

    let hook = |label: &'static str| {
        let log = log.clone();
        move |_: &mut vireo_core::Vm<'_>| {
            log.borrow_mut().push(label.to_string());
            Ok::<(), anyhow::Error>(())
        }
    };

    let a = runtime.extend(runtime.root(), ComponentOptions::new().hook(HookName::CREATED, hook("A")));
    let b = runtime.extend(a, ComponentOptions::new().hook(HookName::CREATED, hook("B")));
    let c = runtime.extend(b, ComponentOptions::new().hook(HookName::CREATED, hook("C")));

    let first = runtime.resolve_options(c);
    assert!(Rc::ptr_eq(&first, &runtime.resolve_options(c)));

    runtime.create(c, ComponentOptions::new()).unwrap();
    assert_eq!(*log.borrow(), vec!["A", "B", "C"]);

    runtime.mixin(a, ComponentOptions::new().hook(HookName::CREATED, hook("A2")));
    let second = runtime.resolve_options(c);
    assert!(!Rc::ptr_eq(&first, &second));

    log.borrow_mut().clear();
    runtime.create(c, ComponentOptions::new()).unwrap();
    assert_eq!(*log.borrow(), vec!["A", "A2", "B", "C"]);
}

#[test]
fn test_mixin_on_subclass_keeps_its_assets() {
    let (mut runtime, _) = setup("");
    let sub = runtime.extend(
        runtime.root(),
        ComponentOptions::new().filter("own", |value| value.clone()),
    );
    assert!(runtime.resolve_options(sub).filters.get("own").is_some());

    runtime.mixin(sub, ComponentOptions::new().filter("mixed", |value| value.clone()));
    let resolved = runtime.resolve_options(sub);
    assert!(resolved.filters.get("own").is_some());
    assert!(resolved.filters.get("mixed").is_some());
    assert!(resolved.filters.get("upper").is_some());

    runtime.mixin(sub, ComponentOptions::new().filter("third", |value| value.clone()));
    let resolved = runtime.resolve_options(sub);
    for name in ["own", "mixed", "third", "upper"] {
        assert!(resolved.filters.get(name).is_some(), "missing filter {}", name);
    }
}

#[test]
fn test_destroy_tears_down_children_once() {
    let (mut runtime, _) = setup(r#"<div id="app"></div>"#);
    let log = log();

    let child = record_hooks(ComponentOptions::new().template("<span>child</span>"), "child", &log);
    runtime.component("child-item", child);

    let parent = runtime
        .create(
            runtime.root(),
            ComponentOptions::new()
                .template("<div><child-item></child-item><child-item></child-item></div>")
                .el("#app"),
        )
        .unwrap();
    assert_eq!(runtime.instance(parent).unwrap().children().len(), 2);
    assert_eq!(runtime.instance_count(), 3);

    log.borrow_mut().clear();
    runtime.destroy(parent);
    runtime.destroy(parent);

    assert_eq!(runtime.instance_count(), 0);
    assert_eq!(
        *log.borrow(),
        vec![
            "child:beforeDestroy",
            "child:destroyed",
            "child:beforeDestroy",
            "child:destroyed"
        ]
    );
}

#[test]
fn test_state_init_failure_skips_created() {
    let (mut runtime, sink) = setup("");
    let log = log();
    let options = record_hooks(
        ComponentOptions::new().data(|_| Err(anyhow::anyhow!("bad data"))),
        "app",
        &log,
    );

    let result = runtime.create(runtime.root(), options);
    assert!(result.is_err());
    assert_eq!(*log.borrow(), vec!["app:beforeCreate"]);
    assert_eq!(sink.count(DiagnosticKind::StateInitFailure), 1);
    assert_eq!(runtime.instance_count(), 0);
}
