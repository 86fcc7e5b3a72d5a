//! Reactive dependency tracking
//!
//! The runtime owns instance state; the reactive system only records which
//! instances read which `(owner, key)` pairs during render and answers "who
//! depends on this key" when a key is written.

use indexmap::IndexSet;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::error::ReactiveError;
use crate::instance::InstanceId;

/// Reactive collaborator interface
pub trait ReactiveSystem {
    /// Make `keys` of `owner` observable
    fn observe(&mut self, owner: InstanceId, keys: &[String]) -> Result<(), ReactiveError>;

    /// Record that `watcher` read `key` of `owner`
    fn depend(&mut self, watcher: InstanceId, owner: InstanceId, key: &str);

    /// `key` of `owner` was written; returns the dependents to re-render
    fn notify(&mut self, owner: InstanceId, key: &str) -> SmallVec<[InstanceId; 4]>;

    /// Forget what `watcher` read (called before each re-render)
    fn clear_dependencies(&mut self, watcher: InstanceId);

    /// Drop everything related to `owner` (teardown)
    fn release(&mut self, owner: InstanceId);
}

/// Default [`ReactiveSystem`]: a bidirectional dependency graph
#[derive(Default)]
pub struct DependencyGraph {
    observed: FxHashMap<InstanceId, IndexSet<String>>,
    /// (owner, key) -> watchers that read it
    subscribers: FxHashMap<(InstanceId, String), IndexSet<InstanceId>>,
    /// watcher -> (owner, key) pairs it read
    reads: FxHashMap<InstanceId, IndexSet<(InstanceId, String)>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_observed(&self, owner: InstanceId, key: &str) -> bool {
        self.observed.get(&owner).is_some_and(|keys| keys.contains(key))
    }

    /// Number of `(owner, key)` pairs `watcher` currently depends on
    pub fn dependency_count(&self, watcher: InstanceId) -> usize {
        self.reads.get(&watcher).map_or(0, |reads| reads.len())
    }
}

impl ReactiveSystem for DependencyGraph {
    fn observe(&mut self, owner: InstanceId, keys: &[String]) -> Result<(), ReactiveError> {
        if let Some(key) = keys.iter().find(|key| key.starts_with('$') || key.starts_with('_')) {
            return Err(ReactiveError::ReservedKey(key.clone()));
        }
        self.observed.entry(owner).or_default().extend(keys.iter().cloned());
        Ok(())
    }

    fn depend(&mut self, watcher: InstanceId, owner: InstanceId, key: &str) {
        if !self.is_observed(owner, key) {
            return;
        }
        self.subscribers
            .entry((owner, key.to_string()))
            .or_default()
            .insert(watcher);
        self.reads
            .entry(watcher)
            .or_default()
            .insert((owner, key.to_string()));
    }

    fn notify(&mut self, owner: InstanceId, key: &str) -> SmallVec<[InstanceId; 4]> {
        self.subscribers
            .get(&(owner, key.to_string()))
            .map(|watchers| watchers.iter().copied().collect())
            .unwrap_or_default()
    }

    fn clear_dependencies(&mut self, watcher: InstanceId) {
        let Some(reads) = self.reads.remove(&watcher) else {
            return;
        };
        for read in reads {
            if let Some(watchers) = self.subscribers.get_mut(&read) {
                watchers.shift_remove(&watcher);
                if watchers.is_empty() {
                    self.subscribers.remove(&read);
                }
            }
        }
    }

    fn release(&mut self, owner: InstanceId) {
        self.clear_dependencies(owner);
        self.observed.remove(&owner);
        self.subscribers.retain(|(key_owner, _), watchers| {
            watchers.shift_remove(&owner);
            *key_owner != owner && !watchers.is_empty()
        });
    }
}
