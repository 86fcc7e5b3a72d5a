//! Deferred update queue
//!
//! State writes do not re-render immediately. Affected instances are queued,
//! one job per instance, and the queue is drained by [`crate::Runtime::flush`].
//! Jobs are keyed by instance uid, so draining always runs parents before
//! their children.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde_json::Value;

use crate::instance::InstanceId;
use crate::runtime::TickCallback;

/// Pending work for one instance
#[derive(Debug)]
pub struct Job {
    pub id: InstanceId,
    /// Re-render requested
    pub render: bool,
    /// Watched keys written since the last run, with their value before the
    /// first write
    pub watched: IndexMap<String, Value>,
}

impl Job {
    fn new(id: InstanceId) -> Self {
        Self {
            id,
            render: false,
            watched: IndexMap::new(),
        }
    }

    /// Fold a later job for the same instance into this one
    pub fn absorb(&mut self, other: Job) {
        self.render |= other.render;
        for (key, old) in other.watched {
            self.watched.entry(key).or_insert(old);
        }
    }
}

/// Update queue plus next-tick callbacks
#[derive(Default)]
pub struct Scheduler {
    jobs: BTreeMap<u64, Job>,
    ticks: Vec<TickCallback>,
    flushing: bool,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a re-render; returns false when one was already pending
    pub fn queue_render(&mut self, uid: u64, id: InstanceId) -> bool {
        let job = self.jobs.entry(uid).or_insert_with(|| Job::new(id));
        !std::mem::replace(&mut job.render, true)
    }

    /// Record a write to a watched key; the oldest pending old value is kept
    pub fn queue_watch(&mut self, uid: u64, id: InstanceId, key: &str, old: Value) {
        let job = self.jobs.entry(uid).or_insert_with(|| Job::new(id));
        job.watched.entry(key.to_string()).or_insert(old);
    }

    /// Remove the lowest-uid job
    pub fn pop(&mut self) -> Option<(u64, Job)> {
        self.jobs.pop_first()
    }

    /// Remove the pending job of `uid`
    pub fn take(&mut self, uid: u64) -> Option<Job> {
        self.jobs.remove(&uid)
    }

    /// Drop pending work for `uid`
    pub fn cancel(&mut self, uid: u64) -> bool {
        self.jobs.remove(&uid).is_some()
    }

    pub fn is_queued(&self, uid: u64) -> bool {
        self.jobs.contains_key(&uid)
    }

    pub fn has_render(&self, uid: u64) -> bool {
        self.jobs.get(&uid).is_some_and(|job| job.render)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty() && self.ticks.is_empty()
    }

    pub fn push_tick(&mut self, callback: TickCallback) {
        self.ticks.push(callback);
    }

    pub fn take_ticks(&mut self) -> Vec<TickCallback> {
        std::mem::take(&mut self.ticks)
    }

    pub fn is_flushing(&self) -> bool {
        self.flushing
    }

    pub(crate) fn set_flushing(&mut self, flushing: bool) {
        self.flushing = flushing;
    }
}
