//! Diagnostic channel
//!
//! Recoverable failures (hook errors, compile errors, bad mount targets) never
//! propagate to the caller. They are reported to a runtime-wide
//! [`DiagnosticSink`] and execution continues.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{error, warn};

/// What went wrong
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Unknown or stale constructor handle
    ConstructionMisuse,
    HookFailure,
    ListenerFailure,
    WatcherFailure,
    MethodFailure,
    RenderFailure,
    /// `#id` template reference matched nothing
    TemplateNotFound,
    InvalidTemplate,
    CompileFailure,
    MountTargetNotFound,
    /// Mount target is the document's `<html>` or `<body>`
    InvalidMountTarget,
    /// Neither a render function, a template nor a mount target
    MissingRenderSource,
    AlreadyMounted,
    StateInitFailure,
    InvalidComponentName,
    UnknownProperty,
    UnknownMethod,
    UnknownFilter,
    UnknownDirective,
    /// Custom element tag with no registered component
    UnknownElement,
    InfiniteUpdateLoop,
    NextTickFailure,
    PatchFailure,
    MissingProp,
}

impl DiagnosticKind {
    /// Default severity of this kind
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticKind::HookFailure
            | DiagnosticKind::ListenerFailure
            | DiagnosticKind::WatcherFailure
            | DiagnosticKind::MethodFailure
            | DiagnosticKind::RenderFailure
            | DiagnosticKind::StateInitFailure
            | DiagnosticKind::PatchFailure
            | DiagnosticKind::NextTickFailure
            | DiagnosticKind::InfiniteUpdateLoop => Severity::Error,
            _ => Severity::Warning,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// Identifies the instance a diagnostic is about
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstanceTrace {
    pub uid: u64,
    pub name: Option<String>,
    /// Tag the instance was rendered under by its parent
    pub tag: Option<String>,
}

impl fmt::Display for InstanceTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, &self.tag) {
            (Some(name), _) => write!(f, "<{}> (uid {})", name, self.uid),
            (None, Some(tag)) => write!(f, "<{}> (uid {})", tag, self.uid),
            (None, None) => write!(f, "<anonymous> (uid {})", self.uid),
        }
    }
}

/// A reported problem
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    pub instance: Option<InstanceTrace>,
    /// Hook phase, event name or watched key the failure occurred in
    pub phase: Option<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            message: message.into(),
            instance: None,
            phase: None,
        }
    }

    pub fn with_instance(mut self, instance: InstanceTrace) -> Self {
        self.instance = Some(instance);
        self
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(phase) = &self.phase {
            write!(f, "[{}] ", phase)?;
        }
        f.write_str(&self.message)?;
        if let Some(instance) = &self.instance {
            write!(f, "\n  found in {}", instance)?;
        }
        Ok(())
    }
}

/// Receiver of runtime diagnostics
///
/// Implementations must not panic; the runtime calls them from inside hook
/// dispatch and mount.
pub trait DiagnosticSink {
    fn report(&self, diagnostic: &Diagnostic);
}

/// Forwards diagnostics to `tracing`
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => warn!(kind = ?diagnostic.kind, "{}", diagnostic),
            Severity::Error => error!(kind = ?diagnostic.kind, "{}", diagnostic),
        }
    }
}

/// Keeps every diagnostic in memory; clones share the same buffer
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    records: Rc<RefCell<Vec<Diagnostic>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the diagnostics reported so far
    pub fn records(&self) -> Vec<Diagnostic> {
        self.records.borrow().clone()
    }

    /// Number of reported diagnostics of `kind`
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.records.borrow().iter().filter(|d| d.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        self.records.borrow_mut().push(diagnostic.clone());
    }
}

/// Runtime handle on the configured sink
#[derive(Clone)]
pub(crate) struct Diagnostics {
    sink: Rc<dyn DiagnosticSink>,
    silent: bool,
}

impl Diagnostics {
    pub(crate) fn new(sink: Rc<dyn DiagnosticSink>, silent: bool) -> Self {
        Self { sink, silent }
    }

    pub(crate) fn report(&self, diagnostic: Diagnostic) {
        if self.silent {
            return;
        }
        self.sink.report(&diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_shares_buffer() {
        let sink = RecordingSink::new();
        let diagnostics = Diagnostics::new(Rc::new(sink.clone()), false);

        diagnostics.report(Diagnostic::new(DiagnosticKind::AlreadyMounted, "already mounted"));
        diagnostics.report(Diagnostic::new(DiagnosticKind::HookFailure, "boom"));

        assert_eq!(sink.count(DiagnosticKind::AlreadyMounted), 1);
        assert_eq!(sink.records()[1].severity, Severity::Error);
    }

    #[test]
    fn test_silent_drops_everything() {
        let sink = RecordingSink::new();
        let diagnostics = Diagnostics::new(Rc::new(sink.clone()), true);
        diagnostics.report(Diagnostic::new(DiagnosticKind::HookFailure, "boom"));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_display_includes_context() {
        let diagnostic = Diagnostic::new(DiagnosticKind::HookFailure, "boom")
            .with_phase("created")
            .with_instance(InstanceTrace {
                uid: 3,
                name: Some("TodoItem".into()),
                tag: None,
            });
        assert_eq!(diagnostic.to_string(), "[created] boom\n  found in <TodoItem> (uid 3)");
    }
}
