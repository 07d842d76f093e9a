//! Pluggable machine modules.
//!
//! A module observes a machine's lifecycle and may veto it. `allow_*` hooks
//! run before anything changes and may refuse; `on_*` hooks run after the
//! change has committed and cannot undo it. Hooks are called synchronously
//! from `run`, `stop`, `change_state` and the registry operations, without
//! the machine's internal lock held, so they may query the machine.
//!
//! At most one module of each concrete type is attached to a machine.
//! Modules that keep a reference back to their machine embed a
//! [`ModuleLink`].

mod link;

pub use link::ModuleLink;

use crate::core::State;
use crate::machine::StateMachine;
use thiserror::Error;

/// Linkage violations reported by [`Module::on_linked`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModuleError {
    #[error("Module '{module}' is already linked to a machine")]
    AlreadyLinked { module: String },
}

/// Hooks a machine calls on its attached modules.
///
/// Every hook has a permissive default, so a module implements only what it
/// cares about. Hooks take `&self`; modules with mutable bookkeeping use
/// interior mutability.
///
/// # Example
///
/// ```rust
/// use gearshift::core::State;
/// use gearshift::module::Module;
///
/// #[derive(Clone, PartialEq, Debug)]
/// enum Door { Open, Closed, Locked }
///
/// impl State for Door {
///     fn name(&self) -> &str {
///         match self {
///             Self::Open => "Open",
///             Self::Closed => "Closed",
///             Self::Locked => "Locked",
///         }
///     }
/// }
///
/// /// Refuses to lock while the door is open.
/// struct LockSafety;
///
/// impl Module<Door> for LockSafety {
///     fn allow_change_state(&self, candidate: &Door) -> bool {
///         !matches!(candidate, Door::Locked)
///     }
/// }
/// ```
pub trait Module<S: State>: Send + Sync + 'static {
    /// Name used in diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Veto attaching to `machine`.
    fn allow_link_to(&self, _machine: &StateMachine<S>) -> bool {
        true
    }

    /// Called once the module is in `machine`'s registry. An error means
    /// the module cannot be linked; the machine logs it and detaches the
    /// module again.
    fn on_linked(&self, _machine: &StateMachine<S>) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Called after the module left `machine`'s registry.
    fn on_unlinked(&self, _machine: &StateMachine<S>) {}

    fn allow_run_machine(&self) -> bool {
        true
    }

    fn on_machine_ran(&self) {}

    fn allow_stop_machine(&self) -> bool {
        true
    }

    fn on_machine_stopped(&self) {}

    /// Veto moving to `candidate`.
    fn allow_change_state(&self, _candidate: &S) -> bool {
        true
    }

    /// Called after `state` became current.
    fn on_state_changed(&self, _state: &S) {}
}
