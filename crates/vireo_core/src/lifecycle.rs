//! Instance lifecycle state machine
//!
//! Every instance walks the same strictly ordered path:
//!
//! ```text
//! Constructing → OptionsResolved → LifecycleInitialized → EventsInitialized
//!   → BeforeCreate → StateInitialized → Created → RenderInitialized
//!   → [BeforeMount → Mounted] → (BeforeUpdate → Updated)*
//!   → BeforeDestroy → TornDown → Destroyed
//! ```
//!
//! Teardown may begin from any state at or after `Created`. Everything else
//! only moves to its immediate successor.

use smallvec::SmallVec;
use thiserror::Error;

use crate::options::HookName;

/// Lifecycle position of an instance
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    Constructing,
    OptionsResolved,
    LifecycleInitialized,
    EventsInitialized,
    BeforeCreate,
    StateInitialized,
    Created,
    /// Resting state of a created but unmounted instance
    RenderInitialized,
    BeforeMount,
    Mounted,
    BeforeUpdate,
    Updated,
    BeforeDestroy,
    TornDown,
    Destroyed,
}

impl LifecycleState {
    /// Hook phase fired on entering this state, if any
    pub fn hook(self) -> Option<HookName> {
        match self {
            LifecycleState::BeforeCreate => Some(HookName::BEFORE_CREATE),
            LifecycleState::Created => Some(HookName::CREATED),
            LifecycleState::BeforeMount => Some(HookName::BEFORE_MOUNT),
            LifecycleState::Mounted => Some(HookName::MOUNTED),
            LifecycleState::BeforeUpdate => Some(HookName::BEFORE_UPDATE),
            LifecycleState::Updated => Some(HookName::UPDATED),
            LifecycleState::BeforeDestroy => Some(HookName::BEFORE_DESTROY),
            LifecycleState::Destroyed => Some(HookName::DESTROYED),
            _ => None,
        }
    }

    /// Whether the instance has a committed DOM tree in this state
    pub fn is_mounted(self) -> bool {
        matches!(
            self,
            LifecycleState::Mounted | LifecycleState::BeforeUpdate | LifecycleState::Updated
        )
    }

    /// Whether teardown has started
    pub fn is_destroying(self) -> bool {
        self >= LifecycleState::BeforeDestroy
    }

    fn successor(self) -> Option<LifecycleState> {
        use LifecycleState::*;
        Some(match self {
            Constructing => OptionsResolved,
            OptionsResolved => LifecycleInitialized,
            LifecycleInitialized => EventsInitialized,
            EventsInitialized => BeforeCreate,
            BeforeCreate => StateInitialized,
            StateInitialized => Created,
            Created => RenderInitialized,
            RenderInitialized => BeforeMount,
            BeforeMount => Mounted,
            Mounted => BeforeUpdate,
            BeforeUpdate => Updated,
            Updated => BeforeUpdate,
            BeforeDestroy => TornDown,
            TornDown => Destroyed,
            Destroyed => return None,
        })
    }
}

/// Rejected lifecycle transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid lifecycle transition {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: LifecycleState,
    pub to: LifecycleState,
}

/// Lifecycle state machine of one instance
#[derive(Clone, Debug)]
pub struct Lifecycle {
    current: LifecycleState,
    /// Transitions taken, oldest first (update cycles included)
    history: SmallVec<[(LifecycleState, LifecycleState); 16]>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            current: LifecycleState::Constructing,
            history: SmallVec::new(),
        }
    }

    /// Current state
    pub fn current(&self) -> LifecycleState {
        self.current
    }

    pub fn is_in(&self, state: LifecycleState) -> bool {
        self.current == state
    }

    /// Transition history
    pub fn history(&self) -> &[(LifecycleState, LifecycleState)] {
        &self.history
    }

    /// Check whether `to` is reachable in one step from the current state
    pub fn can_advance_to(&self, to: LifecycleState) -> bool {
        if to == LifecycleState::BeforeDestroy {
            return self.current >= LifecycleState::Created && !self.current.is_destroying();
        }
        self.current.successor() == Some(to)
    }

    /// Move to `to`, rejecting anything but the permitted next step
    pub fn advance(&mut self, to: LifecycleState) -> Result<(), InvalidTransition> {
        if !self.can_advance_to(to) {
            return Err(InvalidTransition {
                from: self.current,
                to,
            });
        }
        tracing::trace!("Lifecycle: {:?} -> {:?}", self.current, to);
        self.history.push((self.current, to));
        self.current = to;
        Ok(())
    }

    /// Advance through each state in turn, stopping at the first rejection
    pub fn advance_through(&mut self, states: &[LifecycleState]) -> Result<(), InvalidTransition> {
        states.iter().try_for_each(|state| self.advance(*state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleState::*;

    #[test]
    fn test_initialization_path() {
        let mut lifecycle = Lifecycle::new();
        lifecycle
            .advance_through(&[
                OptionsResolved,
                LifecycleInitialized,
                EventsInitialized,
                BeforeCreate,
                StateInitialized,
                Created,
                RenderInitialized,
            ])
            .unwrap();

        assert!(lifecycle.is_in(RenderInitialized));
        assert_eq!(lifecycle.history().len(), 7);
        assert_eq!(lifecycle.history()[0], (Constructing, OptionsResolved));
    }

    #[test]
    fn test_no_skipping() {
        let mut lifecycle = Lifecycle::new();
        let err = lifecycle.advance(BeforeCreate).unwrap_err();
        assert_eq!(
            err,
            InvalidTransition {
                from: Constructing,
                to: BeforeCreate
            }
        );
        assert!(lifecycle.is_in(Constructing));
        assert!(lifecycle.history().is_empty());
    }

    #[test]
    fn test_update_cycles_repeat() {
        let mut lifecycle = Lifecycle::new();
        lifecycle
            .advance_through(&[
                OptionsResolved,
                LifecycleInitialized,
                EventsInitialized,
                BeforeCreate,
                StateInitialized,
                Created,
                RenderInitialized,
                BeforeMount,
                Mounted,
                BeforeUpdate,
                Updated,
                BeforeUpdate,
                Updated,
            ])
            .unwrap();
        assert!(lifecycle.current().is_mounted());
        assert!(!lifecycle.can_advance_to(Mounted));
    }

    #[test]
    fn test_teardown_from_any_created_state() {
        let mut unmounted = Lifecycle::new();
        unmounted
            .advance_through(&[
                OptionsResolved,
                LifecycleInitialized,
                EventsInitialized,
                BeforeCreate,
                StateInitialized,
                Created,
                RenderInitialized,
            ])
            .unwrap();
        unmounted.advance_through(&[BeforeDestroy, TornDown, Destroyed]).unwrap();
        assert!(unmounted.is_in(Destroyed));

        // Terminal
        assert!(!unmounted.can_advance_to(BeforeDestroy));
        assert!(unmounted.advance(BeforeUpdate).is_err());

        let mut early = Lifecycle::new();
        early.advance(OptionsResolved).unwrap();
        assert!(!early.can_advance_to(BeforeDestroy));
    }

    #[test]
    fn test_state_hooks() {
        assert_eq!(Created.hook(), Some(HookName::CREATED));
        assert_eq!(Destroyed.hook(), Some(HookName::DESTROYED));
        assert_eq!(StateInitialized.hook(), None);
        assert!(TornDown.is_destroying());
        assert!(!Updated.is_destroying());
    }
}
