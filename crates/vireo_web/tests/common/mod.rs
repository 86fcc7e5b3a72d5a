//! Shared setup for the integration tests

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use vireo_core::{ComponentOptions, HookName, Runtime, RuntimeConfig, RecordingSink};
use vireo_web::{web_runtime_with, Document};

/// Full runtime over a document whose body holds `markup`
pub fn setup(markup: &str) -> (Runtime, RecordingSink) {
    setup_with(markup, RuntimeConfig::default())
}

pub fn setup_with(markup: &str, config: RuntimeConfig) -> (Runtime, RecordingSink) {
    let sink = RecordingSink::new();
    let document = Document::with_body(markup).unwrap();
    let runtime = web_runtime_with(document, config)
        .diagnostics(sink.clone())
        .build()
        .unwrap();
    (runtime, sink)
}

pub fn body_html(runtime: &Runtime) -> String {
    let body = runtime.host().query("body").unwrap();
    runtime.host().inner_html(body)
}

/// Shared log written by hooks
pub type Log = Rc<RefCell<Vec<String>>>;

pub fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

/// Add a hook for every lifecycle phase that records `label:phase`
pub fn record_hooks(options: ComponentOptions, label: &str, log: &Log) -> ComponentOptions {
    HookName::LIFECYCLE.iter().fold(options, |options, hook| {
        let log = log.clone();
        let entry = format!("{}:{}", label, hook);
        options.hook(hook.clone(), move |_| {
            log.borrow_mut().push(entry.clone());
            Ok(())
        })
    })
}
