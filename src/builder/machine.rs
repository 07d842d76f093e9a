//! Builder for configuring state machines.

use crate::builder::error::BuildError;
use crate::checkpoint::Snapshot;
use crate::core::State;
use crate::machine::{MachineError, StateMachine, DEFAULT_EVENT_CAPACITY};
use crate::module::Module;
use crate::sequence::{DirectSequence, Sequence};
use std::sync::Arc;
use tracing::{debug, warn};

type Attach<S> = Box<dyn FnOnce(&StateMachine<S>) -> Result<(), MachineError> + Send>;

/// Builder for constructing state machines with a fluent API.
///
/// # Example
///
/// ```rust
/// use gearshift::builder::{simple_transition, MachineBuilder};
/// use gearshift::sequence::RuleSequence;
/// use gearshift::state_enum;
///
/// state_enum! {
///     enum Conn {
///         Disconnected,
///         Connecting,
///         Connected,
///     }
/// }
///
/// let machine = MachineBuilder::new()
///     .initial(Conn::Disconnected)
///     .label("uplink")
///     .sequence(
///         RuleSequence::new()
///             .with_rule(simple_transition(Conn::Disconnected, Conn::Connecting))
///             .with_rule(simple_transition(Conn::Connecting, Conn::Connected)),
///     )
///     .build()
///     .unwrap();
///
/// assert_eq!(machine.label(), "uplink");
/// assert!(!machine.is_running());
/// ```
pub struct MachineBuilder<S: State> {
    initial: Option<S>,
    sequence: Option<Box<dyn Sequence<S>>>,
    label: Option<String>,
    event_capacity: usize,
    modules: Vec<Attach<S>>,
    resumed_modules: Option<Vec<String>>,
}

impl<S: State> MachineBuilder<S> {
    pub fn new() -> Self {
        Self {
            initial: None,
            sequence: None,
            label: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            modules: Vec::new(),
            resumed_modules: None,
        }
    }

    /// Set the initial state (required unless resuming).
    pub fn initial(mut self, state: S) -> Self {
        self.initial = Some(state);
        self
    }

    /// Set the transition sequence. Defaults to [`DirectSequence`].
    pub fn sequence<Q>(mut self, sequence: Q) -> Self
    where
        Q: Sequence<S> + 'static,
    {
        self.sequence = Some(Box::new(sequence));
        self
    }

    /// Name the machine in diagnostics. Defaults to its id.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Size of the state-changed channel. Slow subscribers lag once more
    /// changes than this are pending.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Attach a module at build time. Modules attach in the order given.
    pub fn module<M: Module<S>>(mut self, module: Arc<M>) -> Self {
        self.modules
            .push(Box::new(move |machine: &StateMachine<S>| machine.add_module(module)));
        self
    }

    /// Start from a snapshot's state. The label carries over unless one is
    /// set explicitly; the machine is built stopped either way.
    ///
    /// The modules configured on the builder must match the snapshot's
    /// module names in order, otherwise `build` fails with
    /// [`BuildError::ModuleMismatch`].
    pub fn resume(mut self, snapshot: Snapshot<S>) -> Result<Self, BuildError> {
        snapshot.validate()?;
        if snapshot.running {
            debug!(
                label = %snapshot.label,
                state = snapshot.current_state.name(),
                "Resuming a running snapshot; the machine starts stopped"
            );
        }
        if self.label.is_none() {
            self.label = Some(snapshot.label);
        }
        self.initial = Some(snapshot.current_state);
        self.resumed_modules = Some(snapshot.modules);
        Ok(self)
    }

    /// Build the machine, attaching configured modules.
    ///
    /// If any module fails to attach, the ones already attached are
    /// detached again before the error is returned.
    pub fn build(self) -> Result<StateMachine<S>, BuildError> {
        let initial = self.initial.ok_or(BuildError::MissingInitialState)?;
        if self.event_capacity == 0 {
            return Err(BuildError::ZeroEventCapacity);
        }

        let sequence = self
            .sequence
            .unwrap_or_else(|| Box::new(DirectSequence));
        let machine =
            StateMachine::from_parts(initial, sequence, self.label, self.event_capacity);

        for attach in self.modules {
            if let Err(error) = attach(&machine) {
                machine.detach_all();
                return Err(error.into());
            }
        }

        if let Some(expected) = self.resumed_modules {
            let found = machine.module_names();
            if found != expected {
                warn!(
                    machine = %machine.label(),
                    ?expected,
                    ?found,
                    "Configured modules differ from the snapshot"
                );
                machine.detach_all();
                return Err(BuildError::ModuleMismatch { expected, found });
            }
        }

        Ok(machine)
    }
}

impl<S: State> Default for MachineBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::CHECKPOINT_VERSION;
    use crate::module::{ModuleError, ModuleLink};
    use std::sync::atomic::{AtomicBool, Ordering};
    use serde::{Deserialize, Serialize};

    #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
    enum TestState {
        Initial,
        Processing,
    }

    impl State for TestState {
        fn name(&self) -> &str {
            match self {
                Self::Initial => "Initial",
                Self::Processing => "Processing",
            }
        }
    }

    struct Audit;
    impl Module<TestState> for Audit {}

    #[test]
    fn builder_validates_required_fields() {
        let result = MachineBuilder::<TestState>::new().build();

        assert!(matches!(result, Err(BuildError::MissingInitialState)));
    }

    #[test]
    fn builder_rejects_zero_capacity() {
        let result = MachineBuilder::new()
            .initial(TestState::Initial)
            .event_capacity(0)
            .build();

        assert!(matches!(result, Err(BuildError::ZeroEventCapacity)));
    }

    #[test]
    fn builder_attaches_modules() {
        let machine = MachineBuilder::new()
            .initial(TestState::Initial)
            .module(Arc::new(Audit))
            .build()
            .unwrap();

        assert!(machine.has_module::<Audit>());
        assert!(!machine.is_running());
    }

    #[test]
    fn duplicate_module_fails_build() {
        let result = MachineBuilder::new()
            .initial(TestState::Initial)
            .module(Arc::new(Audit))
            .module(Arc::new(Audit))
            .build();

        assert!(matches!(
            result,
            Err(BuildError::Module(MachineError::DuplicateModule { .. }))
        ));
    }

    #[test]
    fn resume_takes_state_and_label_from_snapshot() {
        let original = MachineBuilder::new()
            .initial(TestState::Processing)
            .label("worker")
            .build()
            .unwrap();
        let snapshot = original.snapshot();

        let resumed = MachineBuilder::new()
            .resume(snapshot)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(resumed.current_state(), TestState::Processing);
        assert_eq!(resumed.label(), "worker");
        assert_ne!(resumed.id(), original.id());
    }

    #[test]
    fn resume_rejects_future_versions() {
        let machine = MachineBuilder::new()
            .initial(TestState::Initial)
            .build()
            .unwrap();
        let mut snapshot = machine.snapshot();
        snapshot.version = CHECKPOINT_VERSION + 1;

        let result = MachineBuilder::new().resume(snapshot);

        assert!(matches!(result, Err(BuildError::Snapshot(_))));
    }

    /// Keeps a link and remembers whether it was ever told to unlink.
    #[derive(Default)]
    struct Tracked {
        link: ModuleLink<TestState>,
        unlinked: AtomicBool,
    }

    impl Module<TestState> for Tracked {
        fn name(&self) -> &str {
            "tracked"
        }

        fn on_linked(&self, machine: &StateMachine<TestState>) -> Result<(), ModuleError> {
            self.link.link(machine, "tracked")
        }

        fn on_unlinked(&self, machine: &StateMachine<TestState>) {
            if self.link.unlink(machine) {
                self.unlinked.store(true, Ordering::SeqCst);
            }
        }
    }

    struct Refusing;
    impl Module<TestState> for Refusing {
        fn allow_link_to(&self, _machine: &StateMachine<TestState>) -> bool {
            false
        }
    }

    #[test]
    fn failed_build_detaches_earlier_modules() {
        let tracked = Arc::new(Tracked::default());
        let witness = MachineBuilder::new()
            .initial(TestState::Initial)
            .build()
            .unwrap();

        let result = MachineBuilder::new()
            .initial(TestState::Initial)
            .module(Arc::clone(&tracked))
            .module(Arc::new(Refusing))
            .build();

        assert!(matches!(
            result,
            Err(BuildError::Module(MachineError::LinkRefused { .. }))
        ));
        assert!(tracked.unlinked.load(Ordering::SeqCst));
        assert!(!tracked.link.is_linked());
        // Free to join another machine right away.
        witness.add_module(Arc::clone(&tracked)).unwrap();
        assert!(tracked.link.is_linked_to(&witness));
    }

    #[test]
    fn resume_requires_matching_modules() {
        let original = MachineBuilder::new()
            .initial(TestState::Processing)
            .module(Arc::new(Tracked::default()))
            .build()
            .unwrap();
        let snapshot = original.snapshot();
        let tracked = Arc::new(Tracked::default());

        let result = MachineBuilder::new()
            .resume(snapshot.clone())
            .unwrap()
            .module(Arc::new(Audit))
            .build();

        match result {
            Err(BuildError::ModuleMismatch { expected, found }) => {
                assert_eq!(expected, vec!["tracked".to_string()]);
                assert_eq!(found, vec![std::any::type_name::<Audit>().to_string()]);
            }
            other => panic!("expected module mismatch, got {other:?}"),
        }

        let resumed = MachineBuilder::new()
            .resume(snapshot)
            .unwrap()
            .module(Arc::clone(&tracked))
            .build()
            .unwrap();
        assert!(tracked.link.is_linked_to(&resumed));
        assert!(!resumed.is_running());
    }
}
