//! Vireo Core Runtime
//!
//! This crate provides the component instantiation and update pipeline for the
//! Vireo UI runtime:
//!
//! - **Option Merging**: per-key strategies combining option bags (hooks accumulate,
//!   registries layer, members shadow)
//! - **Constructor Resolution**: inheritance chains with lazily invalidated caches
//! - **Lifecycle Control**: a strict state machine with hook dispatch and failure isolation
//! - **Mount Pipeline**: render function / template / element resolution and compilation
//! - **Update Scheduling**: batched, deduplicated re-renders flushed on demand
//!
//! The reactive system, the patch algorithm, the template compiler and the host
//! document are collaborators reached through the traits in [`host`] and [`reactive`].
//! `vireo_web` provides implementations of all of them.
//!
//! # Example
//!
//! ```ignore
//! use vireo_core::{ComponentOptions, HookName, Runtime};
//!
//! let mut runtime = Runtime::builder()
//!     .host(document)
//!     .patch(DomPatch)
//!     .compiler(WebCompiler::new(64))
//!     .build()?;
//!
//! let app = runtime.create(
//!     runtime.root(),
//!     ComponentOptions::new()
//!         .template("<div>{{ count }}</div>")
//!         .data(|_| Ok(state! { "count" => 0 }))
//!         .hook(HookName::MOUNTED, |vm| {
//!             vm.set("count", 1);
//!             Ok(())
//!         })
//!         .el("#app"),
//! )?;
//!
//! runtime.flush();
//! ```

pub mod config;
pub mod constructor;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod host;
pub mod instance;
pub mod lifecycle;
pub mod merge;
pub mod mount;
pub mod options;
pub mod reactive;
pub mod runtime;
pub mod scheduler;
pub mod update;
pub mod vm;
pub mod vnode;

#[cfg(test)]
mod testing;

pub use config::RuntimeConfig;
pub use constructor::{ConstructorId, ConstructorRegistry};
pub use diagnostics::{
    Diagnostic, DiagnosticKind, DiagnosticSink, InstanceTrace, RecordingSink, Severity,
    TracingSink,
};
pub use error::{CompileError, ConfigError, PatchError, ReactiveError, VireoError};
pub use events::{EventRegistry, ListenerId};
pub use host::{
    CompileOptions, CompiledTemplate, Host, NodeId, Patch, PatchBase, PatchContext,
    TemplateCompiler,
};
pub use instance::{Instance, InstanceId, InternalOptions};
pub use lifecycle::{Lifecycle, LifecycleState};
pub use merge::{merge_options, MergeStrategies, MergeStrategy};
pub use options::{
    ComponentOptions, Computed, DataFn, DirectiveFn, Filter, Hook, HookList, HookName, Listener,
    Method, MountTarget, PropDef, Registry, RenderFn, StateMap, Template, Watcher,
};
pub use reactive::{DependencyGraph, ReactiveSystem};
pub use runtime::{Runtime, RuntimeBuilder, TickCallback};
pub use scheduler::Scheduler;
pub use vm::{RenderScope, Vm};
pub use vnode::{display_value, VComponent, VElement, VNode};

/// Dynamic value type used for state, props and event payloads
pub use serde_json::Value;

/// Build a [`StateMap`] from `key => value` pairs.
///
/// ```ignore
/// let state = state! { "a" => 1, "label" => "hello" };
/// ```
#[macro_export]
macro_rules! state {
    () => {
        $crate::StateMap::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::StateMap::new();
        $(
            map.insert(::std::string::String::from($key), $crate::Value::from($value));
        )+
        map
    }};
}
