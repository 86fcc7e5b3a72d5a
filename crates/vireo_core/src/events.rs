//! Instance event registry
//!
//! Per-instance `name -> listeners` map behind `on` / `once` / `off` / `emit`.
//! Listeners supplied by a parent component are registered here too, tagged
//! so they can be replaced when the parent re-renders.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::options::Listener;

/// Handle of a registered listener, used to remove it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

struct Registered {
    id: ListenerId,
    listener: Listener,
    once: bool,
}

/// Event listeners of one instance
#[derive(Default)]
pub struct EventRegistry {
    listeners: FxHashMap<String, SmallVec<[Registered; 2]>>,
    next_id: u64,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for `event`
    pub fn on(&mut self, event: impl Into<String>, listener: Listener) -> ListenerId {
        self.register(event.into(), listener, false)
    }

    /// Register a listener that is removed after its first call
    pub fn once(&mut self, event: impl Into<String>, listener: Listener) -> ListenerId {
        self.register(event.into(), listener, true)
    }

    fn register(&mut self, event: String, listener: Listener, once: bool) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.entry(event).or_default().push(Registered { id, listener, once });
        id
    }

    /// Remove listeners
    ///
    /// - no event, no id: every listener
    /// - event only: every listener of that event
    /// - id: that listener (within `event` when given)
    pub fn off(&mut self, event: Option<&str>, id: Option<ListenerId>) {
        match (event, id) {
            (None, None) => self.listeners.clear(),
            (Some(event), None) => {
                self.listeners.remove(event);
            }
            (Some(event), Some(id)) => {
                if let Some(list) = self.listeners.get_mut(event) {
                    list.retain(|registered| registered.id != id);
                }
            }
            (None, Some(id)) => {
                for list in self.listeners.values_mut() {
                    list.retain(|registered| registered.id != id);
                }
            }
        }
        self.listeners.retain(|_, list| !list.is_empty());
    }

    /// Listeners to invoke for one emission, in registration order
    ///
    /// `once` listeners are removed before the caller invokes them, so a
    /// listener that re-emits the same event does not run twice.
    pub fn take_for_emit(&mut self, event: &str) -> SmallVec<[Listener; 2]> {
        let Some(list) = self.listeners.get_mut(event) else {
            return SmallVec::new();
        };
        let listeners = list.iter().map(|registered| registered.listener.clone()).collect();
        list.retain(|registered| !registered.once);
        if list.is_empty() {
            self.listeners.remove(event);
        }
        listeners
    }

    pub fn has_listeners(&self, event: &str) -> bool {
        self.listeners.get(event).is_some_and(|list| !list.is_empty())
    }

    /// Number of listeners registered for `event`
    pub fn count(&self, event: &str) -> usize {
        self.listeners.get(event).map_or(0, |list| list.len())
    }

    /// Drop every listener
    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn noop() -> Listener {
        Rc::new(|_, _| Ok(()))
    }

    #[test]
    fn test_once_listener_removed_on_emit() {
        let mut events = EventRegistry::new();
        events.on("save", noop());
        events.once("save", noop());

        assert_eq!(events.take_for_emit("save").len(), 2);
        assert_eq!(events.take_for_emit("save").len(), 1);
        assert_eq!(events.count("save"), 1);
    }

    #[test]
    fn test_off_variants() {
        let mut events = EventRegistry::new();
        let a = events.on("a", noop());
        events.on("a", noop());
        events.on("b", noop());

        events.off(Some("a"), Some(a));
        assert_eq!(events.count("a"), 1);

        events.off(Some("a"), None);
        assert!(!events.has_listeners("a"));
        assert!(events.has_listeners("b"));

        events.off(None, None);
        assert!(!events.has_listeners("b"));
    }

    #[test]
    fn test_off_by_id_without_event() {
        let mut events = EventRegistry::new();
        let id = events.on("x", noop());
        events.off(None, Some(id));
        assert_eq!(events.count("x"), 0);
        assert!(events.take_for_emit("x").is_empty());
    }
}
