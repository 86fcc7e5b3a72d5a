//! Constructor records and option resolution
//!
//! A constructor is the reusable "class-level" definition instances are created
//! from. Records live in an arena and are never mutated in place: changing a
//! constructor's options (for example through [`crate::Runtime::mixin`])
//! installs a new `Rc<ComponentOptions>`, which is what descendants observe as
//! "the super's options changed".
//!
//! Resolution is lazy. Every subclass caches the effective options it computed
//! together with the identity of the super options it merged against; a read
//! that sees a different identity re-merges. Edits to an ancestor therefore
//! cascade to every descendant on its next resolution without any push-based
//! invalidation.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use tracing::{debug, trace};

use crate::merge::{merge_options, MergeStrategies};
use crate::options::ComponentOptions;

new_key_type! {
    /// Unique identifier for a constructor record
    pub struct ConstructorId;
}

/// A component "class"
#[derive(Clone, Debug)]
pub struct ConstructorRecord {
    /// Sequential constructor id (the root constructor is 0)
    pub cid: u32,
    /// Options declared when the constructor was defined
    pub own: Rc<ComponentOptions>,
    pub super_ctor: Option<ConstructorId>,
}

/// Memoized resolution of one constructor
struct ResolvedEntry {
    /// Super options the effective options were merged against
    super_options: Rc<ComponentOptions>,
    /// Own options at merge time
    own: Rc<ComponentOptions>,
    effective: Rc<ComponentOptions>,
}

/// Arena of constructor records plus the resolver memo table
pub struct ConstructorRegistry {
    records: SlotMap<ConstructorId, ConstructorRecord>,
    cache: FxHashMap<ConstructorId, ResolvedEntry>,
    root: ConstructorId,
    next_cid: u32,
}

impl ConstructorRegistry {
    /// Create a registry whose root constructor declares `root_options`
    pub fn new(root_options: ComponentOptions) -> Self {
        let mut records = SlotMap::with_key();
        let root = records.insert(ConstructorRecord {
            cid: 0,
            own: Rc::new(root_options),
            super_ctor: None,
        });
        Self {
            records,
            cache: FxHashMap::default(),
            root,
            next_cid: 1,
        }
    }

    /// The root constructor
    pub fn root(&self) -> ConstructorId {
        self.root
    }

    pub fn contains(&self, id: ConstructorId) -> bool {
        self.records.contains_key(id)
    }

    pub fn get(&self, id: ConstructorId) -> Option<&ConstructorRecord> {
        self.records.get(id)
    }

    /// Super constructor of `id`
    pub fn super_of(&self, id: ConstructorId) -> Option<ConstructorId> {
        self.records.get(id).and_then(|record| record.super_ctor)
    }

    /// Options declared by the constructor itself
    pub fn own_options(&self, id: ConstructorId) -> Option<Rc<ComponentOptions>> {
        self.records.get(id).map(|record| record.own.clone())
    }

    /// Replace a constructor's own options
    ///
    /// Descendants pick up the change on their next resolution.
    pub fn set_own_options(&mut self, id: ConstructorId, options: Rc<ComponentOptions>) -> bool {
        match self.records.get_mut(id) {
            Some(record) => {
                record.own = options;
                true
            }
            None => false,
        }
    }

    /// Define a subclass of `super_ctor`
    ///
    /// The new constructor is resolved immediately so that its cache is primed.
    pub fn extend(
        &mut self,
        super_ctor: ConstructorId,
        options: ComponentOptions,
        strategies: &MergeStrategies,
    ) -> Option<ConstructorId> {
        if !self.records.contains_key(super_ctor) {
            return None;
        }
        let cid = self.next_cid;
        self.next_cid += 1;
        let id = self.records.insert(ConstructorRecord {
            cid,
            own: Rc::new(options),
            super_ctor: Some(super_ctor),
        });
        self.resolve(id, strategies);
        debug!("ConstructorRegistry::extend: cid {} extends {:?}", cid, super_ctor);
        Some(id)
    }

    /// Effective options of a constructor
    pub fn resolve(&mut self, id: ConstructorId, strategies: &MergeStrategies) -> Option<Rc<ComponentOptions>> {
        let record = self.records.get(id)?;
        let own = record.own.clone();
        let Some(super_ctor) = record.super_ctor else {
            return Some(own);
        };
        let cid = record.cid;

        let super_options = self.resolve(super_ctor, strategies)?;

        if let Some(entry) = self.cache.get(&id) {
            if Rc::ptr_eq(&entry.super_options, &super_options) && Rc::ptr_eq(&entry.own, &own) {
                trace!("ConstructorRegistry::resolve: cache hit for cid {}", cid);
                return Some(entry.effective.clone());
            }
            debug!("ConstructorRegistry::resolve: options changed above cid {}, re-merging", cid);
        }

        let mut merged = merge_options(&super_options, &own, strategies);
        // A named constructor can refer to itself from its own template
        if let Some(name) = merged.name.clone() {
            Rc::make_mut(&mut merged.components).insert(name, id);
        }
        let effective = Rc::new(merged);

        self.cache.insert(
            id,
            ResolvedEntry {
                super_options,
                own,
                effective: effective.clone(),
            },
        );
        Some(effective)
    }

    /// Ancestors of `id`, nearest first
    pub fn ancestors(&self, id: ConstructorId) -> Vec<ConstructorId> {
        let mut chain = Vec::new();
        let mut current = self.super_of(id);
        while let Some(ctor) = current {
            chain.push(ctor);
            current = self.super_of(ctor);
        }
        chain
    }

    /// Number of constructors (including the root)
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
