//! Back-reference from a module to the machine it is attached to.

use super::ModuleError;
use crate::core::State;
use crate::machine::{StateMachine, WeakMachine};
use std::sync::{Mutex, PoisonError};

/// Tracks the single machine a module is linked to.
///
/// The link is set while the module sits in a machine's registry and cleared
/// when it leaves. Linking again before unlinking is a violation, which the
/// machine resolves by detaching the module from the second machine. The
/// reference is weak, so a linked module never keeps its machine alive.
///
/// # Example
///
/// ```rust
/// use gearshift::core::State;
/// use gearshift::machine::StateMachine;
/// use gearshift::module::{Module, ModuleError, ModuleLink};
/// use gearshift::sequence::DirectSequence;
/// use std::sync::Arc;
///
/// #[derive(Clone, PartialEq, Debug)]
/// enum Mode { Idle, Busy }
///
/// impl State for Mode {
///     fn name(&self) -> &str {
///         match self {
///             Self::Idle => "Idle",
///             Self::Busy => "Busy",
///         }
///     }
/// }
///
/// #[derive(Default)]
/// struct Watchdog {
///     link: ModuleLink<Mode>,
/// }
///
/// impl Module<Mode> for Watchdog {
///     fn on_linked(&self, machine: &StateMachine<Mode>) -> Result<(), ModuleError> {
///         self.link.link(machine, "Watchdog")
///     }
///
///     fn on_unlinked(&self, machine: &StateMachine<Mode>) {
///         self.link.unlink(machine);
///     }
/// }
///
/// let first = StateMachine::new(Mode::Idle, DirectSequence);
/// let second = StateMachine::new(Mode::Idle, DirectSequence);
/// let watchdog = Arc::new(Watchdog::default());
///
/// first.add_module(Arc::clone(&watchdog)).unwrap();
/// assert!(second.add_module(Arc::clone(&watchdog)).is_err());
/// assert!(!second.has_module::<Watchdog>());
/// assert!(watchdog.link.is_linked_to(&first));
/// ```
pub struct ModuleLink<S: State> {
    machine: Mutex<Option<WeakMachine<S>>>,
}

impl<S: State> ModuleLink<S> {
    pub fn new() -> Self {
        Self {
            machine: Mutex::new(None),
        }
    }

    /// Record `machine` as the owner. Fails if already linked to a machine
    /// that is still alive, including `machine` itself.
    pub fn link(&self, machine: &StateMachine<S>, module: &str) -> Result<(), ModuleError> {
        let mut slot = self.machine.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(WeakMachine::is_alive) {
            return Err(ModuleError::AlreadyLinked {
                module: module.to_string(),
            });
        }
        *slot = Some(machine.downgrade());
        Ok(())
    }

    /// Clear the link if it points at `machine`. Returns whether it did.
    pub fn unlink(&self, machine: &StateMachine<S>) -> bool {
        let mut slot = self.machine.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(owner) if owner.points_to(machine) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_linked(&self) -> bool {
        self.machine().is_some()
    }

    pub fn is_linked_to(&self, machine: &StateMachine<S>) -> bool {
        self.machine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|owner| owner.points_to(machine))
    }

    /// The owning machine, if linked and still alive.
    pub fn machine(&self) -> Option<StateMachine<S>> {
        self.machine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(WeakMachine::upgrade)
    }
}

impl<S: State> Default for ModuleLink<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::DirectSequence;

    #[derive(Clone, PartialEq, Debug)]
    enum Mode {
        Idle,
    }

    impl State for Mode {
        fn name(&self) -> &str {
            "Idle"
        }
    }

    fn machine() -> StateMachine<Mode> {
        StateMachine::new(Mode::Idle, DirectSequence)
    }

    #[test]
    fn link_then_unlink() {
        let owner = machine();
        let link = ModuleLink::new();

        link.link(&owner, "watchdog").unwrap();
        assert!(link.is_linked());
        assert!(link.is_linked_to(&owner));

        assert!(link.unlink(&owner));
        assert!(!link.is_linked());
    }

    #[test]
    fn second_link_is_rejected() {
        let owner = machine();
        let other = machine();
        let link = ModuleLink::new();

        link.link(&owner, "watchdog").unwrap();

        assert_eq!(
            link.link(&other, "watchdog"),
            Err(ModuleError::AlreadyLinked {
                module: "watchdog".to_string()
            })
        );
        assert_eq!(
            link.link(&owner, "watchdog"),
            Err(ModuleError::AlreadyLinked {
                module: "watchdog".to_string()
            })
        );
        assert!(link.is_linked_to(&owner));
    }

    #[test]
    fn unlink_from_foreign_machine_keeps_owner() {
        let owner = machine();
        let other = machine();
        let link = ModuleLink::new();
        link.link(&owner, "watchdog").unwrap();

        assert!(!link.unlink(&other));
        assert!(link.is_linked_to(&owner));
    }

    #[test]
    fn dropped_machine_releases_link() {
        let link = ModuleLink::new();
        {
            let owner = machine();
            link.link(&owner, "watchdog").unwrap();
        }

        assert!(!link.is_linked());
        link.link(&machine(), "watchdog").unwrap();
    }
}
